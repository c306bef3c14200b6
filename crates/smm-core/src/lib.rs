//! SMM Core - Headless installation registry for Satisfactory Mod Manager.
//!
//! This crate tracks the game installations known to the mod manager,
//! discovers their metadata, and serializes every state-mutating action so
//! that at most one runs at a time. It can be used programmatically without
//! any RPC layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use smm_core::InstallationRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> smm_core::Result<()> {
//!     let registry = Arc::new(
//!         InstallationRegistry::builder("/path/to/ficsit")
//!             .auto_create_dirs(true)
//!             .build()
//!             .await?,
//!     );
//!     registry.init().await?;
//!
//!     for path in registry.get_installations().await {
//!         println!("Found installation {}", path);
//!     }
//!
//!     registry.add_custom_installation("/games/SatisfactoryDedicatedServer").await?;
//!     registry.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod config;
pub mod custom_install;
pub mod discovery;
pub mod error;
pub mod events;
pub mod launch;
pub mod metadata;
pub mod models;
pub mod mods;
pub mod persistence;
pub mod registry;
pub mod watcher;

// Re-export commonly used types
pub use actions::{ActionKind, ActionSerializer, CurrentAction, ProgressEvent, TaskUpdate};
pub use custom_install::{CustomInstallationResolver, CustomResolution};
pub use discovery::{InstallFindError, OfflineRemoteSource, RemoteInstallSource};
pub use error::{ErrorKind, Result, SmmError};
pub use events::{BroadcastEventSink, EventSink, RegistryEvent};
pub use launch::LaunchCommand;
pub use metadata::{InstallState, InstallationMetadata, MetadataStore};
pub use models::{
    GameBranch, InstallType, Installation, InstallationList, InstallationRecord, LocationType,
    LockFile, Profile, ProfileMod, ProfileSet,
};
pub use mods::{LockFileResolver, ModResolver};
pub use persistence::{JsonRegistryStore, RegistryStore};
pub use registry::{InstallationRegistry, RegistryBuilder};
pub use watcher::{ProcessEnumerator, ProcessWatcher, SysinfoProcessEnumerator};
