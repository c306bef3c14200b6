//! The installation registry.
//!
//! [`InstallationRegistry`] is constructed explicitly through
//! [`RegistryBuilder`] and driven by `init()` / `shutdown()`. It owns:
//!
//! - the shared [`MetadataStore`], written by discovery and actions
//! - the installation list and profile set, only mutated inside serialized actions
//! - supervised background tasks (remote discovery, process watcher)
//!
//! After every mutation that can affect validity the selection is re-checked:
//! it is either empty or points at a valid installation, falling back to the
//! first valid installation in list order.

mod actions;
mod builder;
mod queries;

pub use builder::RegistryBuilder;

use crate::actions::{ActionKind, ActionSerializer};
use crate::custom_install::CustomInstallationResolver;
use crate::discovery::{run_local_pass, spawn_remote_pass, InstallFindError, RemoteInstallSource};
use crate::events::{EventSink, RegistryEvent};
use crate::metadata::{InstallationMetadata, MetadataStore};
use crate::models::{InstallationList, LocationType, ProfileSet};
use crate::mods::ModResolver;
use crate::persistence::RegistryStore;
use crate::watcher::{ProcessEnumerator, ProcessWatcher};
use crate::{Result, SmmError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Installation list and profiles.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    pub(crate) list: InstallationList,
    pub(crate) profiles: ProfileSet,
}

/// Registry of game installations with serialized mutations.
pub struct InstallationRegistry {
    data_dir: PathBuf,
    metadata: Arc<MetadataStore>,
    state: RwLock<RegistryState>,
    serializer: ActionSerializer,
    find_errors: RwLock<Vec<InstallFindError>>,
    events: Arc<dyn EventSink>,
    store: Arc<dyn RegistryStore>,
    mod_resolver: Arc<dyn ModResolver>,
    remote_source: Arc<dyn RemoteInstallSource>,
    process_enumerator: Arc<dyn ProcessEnumerator>,
    custom_resolver: CustomInstallationResolver,
    game_running: Arc<AtomicBool>,
    watcher_interval: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl InstallationRegistry {
    pub fn builder(data_dir: impl Into<PathBuf>) -> RegistryBuilder {
        RegistryBuilder::new(data_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.metadata
    }

    /// Load persisted state and run discovery.
    ///
    /// The local pass completes before this returns. The remote pass keeps
    /// running in the background. Calling `init` twice is a no-op.
    pub async fn init(&self) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("Registry already initialized");
            return Ok(());
        }

        let list = self.store.load_installations()?;
        let profiles = self.store.load_profiles()?;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.list = list;
        state.profiles = profiles;

        for path in state.list.paths() {
            self.metadata.store(path, InstallationMetadata::unknown());
        }

        let records = state.list.installations.clone();
        let metadata = Arc::clone(&self.metadata);
        let resolver = self.custom_resolver.clone();
        let errors =
            tokio::task::spawn_blocking(move || run_local_pass(&records, &metadata, &resolver))
                .await
                .map_err(|e| SmmError::Other(format!("Local discovery panicked: {}", e)))?;
        if !errors.is_empty() {
            warn!("{} installations failed discovery", errors.len());
        }
        *self.find_errors.write().await = errors;

        let remote = spawn_remote_pass(
            Self::remote_paths(state),
            Arc::clone(&self.remote_source),
            Arc::clone(&self.metadata),
            Arc::clone(&self.events),
        );
        self.tasks.lock().await.push(remote);

        let mut dirty = self.fix_selection(state);

        let fallback = state.profiles.fallback_profile();
        for record in state.list.installations.iter_mut() {
            if record.profile != fallback && !state.profiles.contains(&record.profile) {
                error!(
                    path = %record.path,
                    profile = %record.profile,
                    "Profile missing, using {}",
                    fallback
                );
                record.profile = fallback.clone();
                dirty = true;
            }
        }

        if dirty {
            self.save_logged(&state.list);
        }

        self.emit_globals(state);
        self.emit_mods_change(state).await;

        info!(
            "Registry initialized with {} installations, selected: {:?}",
            state.list.installations.len(),
            state.list.selected_installation
        );
        Ok(())
    }

    /// Spawn the process watcher. Its handle is owned by the registry.
    pub async fn start_process_watcher(&self) {
        let watcher = Arc::new(
            ProcessWatcher::new(
                Arc::clone(&self.process_enumerator),
                Arc::clone(&self.events),
                Arc::clone(&self.game_running),
            )
            .with_interval(self.watcher_interval),
        );
        self.tasks.lock().await.push(watcher.start());
    }

    /// Abort background tasks. Safe to call more than once.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
        info!("Registry shut down");
    }

    /// Re-check the selection invariant as a serialized action.
    pub async fn ensure_selected_installation_is_valid(self: &Arc<Self>) -> Result<()> {
        let this = Arc::clone(self);
        self.serializer
            .submit(ActionKind::ValidateSelection, "selection", move |_ctx| async move {
                let mut guard = this.state.write().await;
                let state = &mut *guard;
                if this.fix_selection(state) {
                    this.save_logged(&state.list);
                    this.emit_globals(state);
                    this.emit_mods_change(state).await;
                }
                Ok(())
            })
            .await
    }

    /// Point the selection at a valid installation. Returns true if it changed.
    fn fix_selection(&self, state: &mut RegistryState) -> bool {
        let current = state.list.selected_installation.clone();
        if !current.is_empty()
            && state.list.contains(&current)
            && self.metadata.is_valid_install(&current)
        {
            return false;
        }

        let fallback = state
            .list
            .paths()
            .find(|path| self.metadata.is_valid_install(path))
            .map(String::from)
            .unwrap_or_default();
        if fallback == current {
            return false;
        }

        warn!(
            previous = %current,
            selected = %fallback,
            "Selected installation is not valid, falling back"
        );
        state.list.selected_installation = fallback;
        true
    }

    /// Save the list, logging failures instead of returning them.
    fn save_logged(&self, list: &InstallationList) {
        if let Err(e) = self.store.save_installations(list) {
            error!(error = %e, "Failed to save installations");
        }
    }

    fn valid_paths(&self, state: &RegistryState) -> Vec<String> {
        state
            .list
            .paths()
            .filter(|path| self.metadata.is_valid_install(path))
            .map(String::from)
            .collect()
    }

    fn remote_paths(state: &RegistryState) -> Vec<String> {
        state
            .list
            .installations
            .iter()
            .filter(|record| record.is_remote())
            .map(|record| record.path.clone())
            .collect()
    }

    /// Local installations sharing the selected profile, grouped by mod target.
    fn profile_targets(&self, state: &RegistryState) -> BTreeMap<String, Vec<String>> {
        let mut targets: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let Some(selected) = state.list.selected() else {
            return targets;
        };

        for record in state
            .list
            .installations
            .iter()
            .filter(|record| record.profile == selected.profile)
        {
            if !self.metadata.is_valid_install(&record.path) {
                continue;
            }
            let Some(info) = self.metadata.load(&record.path).and_then(|m| m.info) else {
                continue;
            };
            if info.location != LocationType::Local {
                continue;
            }
            targets
                .entry(info.target_name().to_string())
                .or_default()
                .push(record.path.clone());
        }
        targets
    }

    /// Announce installations, metadata, remotes, profiles and selection.
    fn emit_globals(&self, state: &RegistryState) {
        self.events
            .publish(RegistryEvent::Installations(self.valid_paths(state)));
        self.events
            .publish(RegistryEvent::InstallationsMetadata(self.metadata.snapshot()));
        self.events
            .publish(RegistryEvent::RemoteServers(Self::remote_paths(state)));
        self.events
            .publish(RegistryEvent::Profiles(state.profiles.names()));

        match state.list.selected() {
            Some(selected) => {
                self.events.publish(RegistryEvent::SelectedInstallation(
                    selected.path.clone(),
                ));
                self.events
                    .publish(RegistryEvent::SelectedProfile(selected.profile.clone()));
                self.events
                    .publish(RegistryEvent::ModsEnabled(!selected.vanilla));
                self.events.publish(RegistryEvent::SelectedProfileTargets(
                    self.profile_targets(state),
                ));
            }
            None => {
                self.events
                    .publish(RegistryEvent::SelectedInstallation(String::new()));
                self.events.publish(RegistryEvent::ModsEnabled(true));
            }
        }
    }

    /// Announce the selected installation's lockfile and profile mods.
    async fn emit_mods_change(&self, state: &RegistryState) {
        let (lockfile_mods, manifest_mods) = match state.list.selected() {
            Some(selected) => {
                let lockfile = match self.mod_resolver.lock_file(selected).await {
                    Ok(lockfile) => lockfile,
                    Err(e) => {
                        error!(error = %e, "Failed to read lockfile");
                        return;
                    }
                };
                let manifest = state
                    .profiles
                    .get(&selected.profile)
                    .map(|profile| profile.mods.clone())
                    .unwrap_or_default();
                (
                    lockfile.map(|l| l.versions()).unwrap_or_default(),
                    manifest,
                )
            }
            None => Default::default(),
        };
        self.events
            .publish(RegistryEvent::LockfileMods(lockfile_mods));
        self.events
            .publish(RegistryEvent::ManifestMods(manifest_mods));
    }
}
