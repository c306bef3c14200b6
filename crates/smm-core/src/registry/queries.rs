//! Read-only registry queries.

use super::InstallationRegistry;
use crate::actions::CurrentAction;
use crate::discovery::InstallFindError;
use crate::launch::LaunchCommand;
use crate::metadata::InstallationMetadata;
use crate::models::{InstallationRecord, LockFile, ProfileMod};
use crate::{Result, SmmError};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use tracing::error;

impl InstallationRegistry {
    /// Valid installation paths in list order.
    pub async fn get_installations(&self) -> Vec<String> {
        let state = self.state.read().await;
        self.valid_paths(&state)
    }

    pub fn get_installations_metadata(&self) -> BTreeMap<String, InstallationMetadata> {
        self.metadata.snapshot()
    }

    pub async fn get_current_installation_metadata(&self) -> Option<InstallationMetadata> {
        let state = self.state.read().await;
        let selected = state.list.selected()?;
        self.metadata.load(&selected.path)
    }

    /// Paths that failed local discovery.
    pub async fn get_invalid_installs(&self) -> Vec<String> {
        self.find_errors
            .read()
            .await
            .iter()
            .map(|e| e.path.clone())
            .collect()
    }

    pub async fn get_find_errors(&self) -> Vec<InstallFindError> {
        self.find_errors.read().await.clone()
    }

    pub async fn get_remote_installations(&self) -> Vec<String> {
        let state = self.state.read().await;
        Self::remote_paths(&state)
    }

    pub async fn get_installation(&self, path: &str) -> Option<InstallationRecord> {
        self.state.read().await.list.get(path).cloned()
    }

    pub async fn get_selected_install(&self) -> Option<InstallationRecord> {
        self.state.read().await.list.selected().cloned()
    }

    /// True when nothing is selected or the selection is not vanilla.
    pub async fn get_mods_enabled(&self) -> bool {
        self.state
            .read()
            .await
            .list
            .selected()
            .map_or(true, |selected| !selected.vanilla)
    }

    pub async fn get_profiles(&self) -> Vec<String> {
        self.state.read().await.profiles.names()
    }

    pub async fn get_selected_install_profile_mods(&self) -> BTreeMap<String, ProfileMod> {
        let state = self.state.read().await;
        state
            .list
            .selected()
            .and_then(|selected| state.profiles.get(&selected.profile))
            .map(|profile| profile.mods.clone())
            .unwrap_or_default()
    }

    pub async fn get_selected_install_lockfile(&self) -> Result<Option<LockFile>> {
        let Some(selected) = self.get_selected_install().await else {
            return Ok(None);
        };
        self.mod_resolver.lock_file(&selected).await
    }

    /// Locked mod reference to resolved version for the selection.
    pub async fn get_selected_install_lockfile_mods(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .get_selected_install_lockfile()
            .await?
            .map(|lockfile| lockfile.versions())
            .unwrap_or_default())
    }

    /// Target name to paths of valid installations sharing the selected profile.
    pub async fn selected_profile_targets(&self) -> BTreeMap<String, Vec<String>> {
        let state = self.state.read().await;
        self.profile_targets(&state)
    }

    pub fn is_valid_install(&self, path: &str) -> bool {
        self.metadata.is_valid_install(path)
    }

    pub fn is_game_running(&self) -> bool {
        self.game_running.load(Ordering::SeqCst)
    }

    pub fn current_action(&self) -> Option<CurrentAction> {
        self.serializer.current_action()
    }

    /// Build the launch command for the selection without running it.
    pub async fn launch_command(&self) -> Result<LaunchCommand> {
        let selected = self
            .get_selected_install()
            .await
            .ok_or(SmmError::NoInstallationSelected)?;
        let info = self
            .metadata
            .load(&selected.path)
            .and_then(|metadata| metadata.info)
            .ok_or_else(|| SmmError::LaunchFailed {
                message: format!("No metadata for {}", selected.path),
            })?;
        LaunchCommand::for_installation(&info)
    }

    /// Start the selected installation.
    pub async fn launch_game(&self) -> Result<LaunchCommand> {
        let command = self.launch_command().await.map_err(|e| {
            error!(error = %e, "Cannot launch game");
            e
        })?;
        command.spawn()?;
        Ok(command)
    }
}
