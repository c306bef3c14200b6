//! Builder for configuring an [`InstallationRegistry`].

use super::{InstallationRegistry, RegistryState};
use crate::actions::ActionSerializer;
use crate::config::{DiscoveryConfig, WatcherConfig};
use crate::custom_install::CustomInstallationResolver;
use crate::discovery::{OfflineRemoteSource, RemoteInstallSource};
use crate::events::{BroadcastEventSink, EventSink};
use crate::metadata::MetadataStore;
use crate::mods::{LockFileResolver, ModResolver};
use crate::persistence::{JsonRegistryStore, RegistryStore};
use crate::watcher::{ProcessEnumerator, SysinfoProcessEnumerator};
use crate::{Result, SmmError};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Builder for configuring registry construction.
///
/// Every collaborator has a default: JSON files in the data directory,
/// lockfiles on disk, an offline remote source, a broadcast event sink and
/// the `sysinfo` process table.
///
/// # Example
///
/// ```rust,ignore
/// use smm_core::InstallationRegistry;
///
/// let registry = InstallationRegistry::builder("./ficsit")
///     .auto_create_dirs(true)
///     .build()
///     .await?;
/// registry.init().await?;
/// ```
pub struct RegistryBuilder {
    data_dir: PathBuf,
    auto_create_dirs: bool,
    store: Option<Arc<dyn RegistryStore>>,
    mod_resolver: Option<Arc<dyn ModResolver>>,
    remote_source: Option<Arc<dyn RemoteInstallSource>>,
    events: Option<Arc<dyn EventSink>>,
    process_enumerator: Option<Arc<dyn ProcessEnumerator>>,
    watcher_interval: Duration,
    max_walk_depth: usize,
}

impl RegistryBuilder {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            auto_create_dirs: false,
            store: None,
            mod_resolver: None,
            remote_source: None,
            events: None,
            process_enumerator: None,
            watcher_interval: WatcherConfig::POLL_INTERVAL,
            max_walk_depth: DiscoveryConfig::MAX_WALK_DEPTH,
        }
    }

    /// Create the data directory if it doesn't exist.
    ///
    /// Default: `false` (the directory must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn RegistryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_mod_resolver(mut self, resolver: Arc<dyn ModResolver>) -> Self {
        self.mod_resolver = Some(resolver);
        self
    }

    pub fn with_remote_source(mut self, source: Arc<dyn RemoteInstallSource>) -> Self {
        self.remote_source = Some(source);
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_process_enumerator(mut self, enumerator: Arc<dyn ProcessEnumerator>) -> Self {
        self.process_enumerator = Some(enumerator);
        self
    }

    /// Default: [`WatcherConfig::POLL_INTERVAL`]
    pub fn with_watcher_interval(mut self, interval: Duration) -> Self {
        self.watcher_interval = interval;
        self
    }

    /// Default: [`DiscoveryConfig::MAX_WALK_DEPTH`]
    pub fn with_max_walk_depth(mut self, depth: usize) -> Self {
        self.max_walk_depth = depth;
        self
    }

    pub async fn build(self) -> Result<InstallationRegistry> {
        if !self.data_dir.exists() {
            if self.auto_create_dirs {
                std::fs::create_dir_all(&self.data_dir).map_err(|e| SmmError::Io {
                    message: format!(
                        "Failed to create data directory: {}",
                        self.data_dir.display()
                    ),
                    path: Some(self.data_dir.clone()),
                    source: Some(e),
                })?;
            } else {
                return Err(SmmError::Config {
                    message: format!("Data directory does not exist: {}", self.data_dir.display()),
                });
            }
        }

        let events = self
            .events
            .unwrap_or_else(|| Arc::new(BroadcastEventSink::default()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(JsonRegistryStore::new(&self.data_dir)));

        Ok(InstallationRegistry {
            metadata: Arc::new(MetadataStore::new()),
            state: RwLock::new(RegistryState::default()),
            serializer: ActionSerializer::new(Arc::clone(&events)),
            find_errors: RwLock::new(Vec::new()),
            store,
            mod_resolver: self
                .mod_resolver
                .unwrap_or_else(|| Arc::new(LockFileResolver::new())),
            remote_source: self
                .remote_source
                .unwrap_or_else(|| Arc::new(OfflineRemoteSource)),
            process_enumerator: self
                .process_enumerator
                .unwrap_or_else(|| Arc::new(SysinfoProcessEnumerator::new())),
            custom_resolver: CustomInstallationResolver::new().with_max_depth(self.max_walk_depth),
            game_running: Arc::new(AtomicBool::new(false)),
            watcher_interval: self.watcher_interval,
            tasks: Mutex::new(Vec::new()),
            initialized: AtomicBool::new(false),
            events,
            data_dir: self.data_dir,
        })
    }
}
