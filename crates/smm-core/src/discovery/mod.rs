//! Installation discovery.
//!
//! Discovery runs in two phases. The local pass inspects on-disk
//! installations synchronously and must finish before startup completes.
//! The remote pass runs as a background task. The registry stays usable with
//! only local results present.

mod local;
mod remote;

use serde::Serialize;

pub use local::{inspect_local, run_local_pass};
pub use remote::{spawn_remote_pass, OfflineRemoteSource, RemoteInstallSource};

/// A single installation that failed discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallFindError {
    pub path: String,
    pub reason: String,
}

impl std::fmt::Display for InstallFindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}
