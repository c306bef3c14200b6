//! Data types shared across the registry.

mod installation;
mod lockfile;
mod profile;

pub use installation::{
    is_remote_path, GameBranch, InstallType, Installation, InstallationList, InstallationRecord,
    LocationType,
};
pub use lockfile::{LockFile, LockedMod};
pub use profile::{Profile, ProfileMod, ProfileSet};
