//! Serialized mutations of the registry.

use super::InstallationRegistry;
use crate::actions::{ActionContext, ActionKind, TaskUpdate};
use crate::custom_install::CustomResolution;
use crate::metadata::InstallationMetadata;
use crate::models::{Installation, InstallationRecord};
use crate::{Result, SmmError};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

impl InstallationRegistry {
    /// Select an installation.
    ///
    /// Fails if the path is not valid or has no record. Selecting the current
    /// selection does nothing.
    pub async fn select_install(self: &Arc<Self>, path: &str) -> Result<()> {
        let path = path.to_string();
        let this = Arc::clone(self);
        self.serializer
            .submit(ActionKind::SelectInstall, path.clone(), move |ctx| async move {
                ctx.record_install(&path);
                if !this.metadata.is_valid_install(&path) {
                    return Err(SmmError::InvalidInstallation { path });
                }

                let mut guard = this.state.write().await;
                let state = &mut *guard;
                if state.list.selected_installation == path {
                    return Ok(());
                }
                if !state.list.contains(&path) {
                    return Err(SmmError::InstallationNotFound { path });
                }

                state.list.selected_installation = path;
                this.save_logged(&state.list);
                this.emit_globals(state);
                this.emit_mods_change(state).await;
                info!("Selected installation");
                Ok(())
            })
            .await
    }

    /// Enable or disable mods on the selected installation.
    ///
    /// The flag is flipped, persisted and announced first. Re-applying the
    /// profile happens afterwards; its failure is returned but the flag stays.
    pub async fn set_mods_enabled(self: &Arc<Self>, enabled: bool) -> Result<()> {
        let this = Arc::clone(self);
        self.serializer
            .submit(ActionKind::ToggleMods, enabled.to_string(), move |ctx| async move {
                let mut guard = this.state.write().await;
                let state = &mut *guard;
                let record = state
                    .list
                    .selected_mut()
                    .ok_or(SmmError::NoInstallationSelected)?;
                ctx.record_install(&record.path);
                record.vanilla = !enabled;
                let record = record.clone();

                this.save_logged(&state.list);
                this.emit_globals(state);
                let profile = state.profiles.get(&record.profile).cloned();
                drop(guard);

                this.mod_resolver
                    .apply(&record, profile.as_ref(), &ctx.progress)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to apply mods after toggling");
                        e
                    })?;

                let guard = this.state.read().await;
                this.emit_mods_change(&guard).await;
                info!(enabled, "Mods toggled");
                Ok(())
            })
            .await
    }

    /// Assign a profile to the selected installation and apply it.
    ///
    /// Same best-effort policy as [`set_mods_enabled`](Self::set_mods_enabled).
    pub async fn select_profile(self: &Arc<Self>, name: &str) -> Result<()> {
        let name = name.to_string();
        let this = Arc::clone(self);
        self.serializer
            .submit(ActionKind::SelectProfile, name.clone(), move |ctx| async move {
                let mut guard = this.state.write().await;
                let state = &mut *guard;
                let record = state
                    .list
                    .selected_mut()
                    .ok_or(SmmError::NoInstallationSelected)?;
                ctx.record_install(&record.path);
                if !state.profiles.contains(&name) {
                    return Err(SmmError::ProfileNotFound { name });
                }
                if record.profile == name {
                    return Ok(());
                }
                record.profile = name.clone();
                let record = record.clone();

                this.save_logged(&state.list);
                this.emit_globals(state);
                this.emit_mods_change(state).await;
                let profile = state.profiles.get(&name).cloned();
                drop(guard);

                this.mod_resolver
                    .apply(&record, profile.as_ref(), &ctx.progress)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to apply profile");
                        e
                    })?;
                info!(profile = %name, "Profile selected");
                Ok(())
            })
            .await
    }

    /// Resolve a user-supplied directory and register it.
    ///
    /// A directory without a recognizable executable is still admitted; the
    /// returned resolution carries a warning in that case.
    pub async fn add_custom_installation(
        self: &Arc<Self>,
        path: impl AsRef<Path>,
    ) -> Result<CustomResolution> {
        let install_path = path.as_ref().to_path_buf();
        let item = install_path.to_string_lossy().into_owned();
        let this = Arc::clone(self);
        self.serializer
            .submit(ActionKind::AddInstallation, item, move |ctx| async move {
                ctx.progress
                    .report(TaskUpdate::indeterminate("Inspecting installation"));

                let resolver = this.custom_resolver.clone();
                let resolution =
                    tokio::task::spawn_blocking(move || resolver.resolve(&install_path))
                        .await
                        .map_err(|e| {
                            SmmError::Other(format!("Installation resolver panicked: {}", e))
                        })??;
                if let Some(warning) = &resolution.warning {
                    warn!("{}", warning);
                }

                this.register(&ctx, resolution.installation.clone()).await?;
                ctx.progress.report(TaskUpdate::new("Installation added", 1.0));
                Ok(resolution)
            })
            .await
    }

    /// Register an installation from explicit parameters.
    pub async fn add_installation(self: &Arc<Self>, installation: Installation) -> Result<()> {
        if installation.path.trim().is_empty() {
            return Err(SmmError::Validation {
                field: "path".to_string(),
                message: "installation path must not be empty".to_string(),
            });
        }
        let this = Arc::clone(self);
        self.serializer
            .submit(
                ActionKind::AddInstallation,
                installation.path.clone(),
                move |ctx| async move { this.register(&ctx, installation).await },
            )
            .await
    }

    /// Add the record, persist, then store its metadata as valid.
    ///
    /// A failed save removes the record again and leaves no metadata behind.
    async fn register(&self, ctx: &ActionContext, installation: Installation) -> Result<()> {
        let path = installation.path.clone();
        ctx.record_install(&path);

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.list.contains(&path) {
            return Err(SmmError::InstallationExists { path });
        }

        let record = InstallationRecord::new(path.clone(), state.profiles.fallback_profile())
            .with_launcher(installation.launcher.clone());
        state.list.add(record);
        if let Err(e) = self.store.save_installations(&state.list) {
            state.list.remove(&path);
            error!(error = %e, "Failed to save new installation");
            return Err(e);
        }

        self.metadata
            .store(path.clone(), InstallationMetadata::valid(installation));

        let selection_changed = self.fix_selection(state);
        if selection_changed {
            self.save_logged(&state.list);
        }
        self.emit_globals(state);
        if selection_changed {
            self.emit_mods_change(state).await;
        }
        info!("Added installation {}", path);
        Ok(())
    }

    /// Remove one installation and its metadata.
    pub async fn remove_installation(self: &Arc<Self>, path: &str) -> Result<()> {
        let path = path.to_string();
        let this = Arc::clone(self);
        self.serializer
            .submit(ActionKind::RemoveInstallation, path.clone(), move |ctx| async move {
                ctx.record_install(&path);
                let mut guard = this.state.write().await;
                let state = &mut *guard;
                let previous_selection = state.list.selected_installation.clone();
                let (index, record) = state
                    .list
                    .remove(&path)
                    .ok_or_else(|| SmmError::InstallationNotFound { path: path.clone() })?;

                let metadata = this.metadata.remove(&path);
                let selection_changed = this.fix_selection(state);
                if let Err(e) = this.store.save_installations(&state.list) {
                    state.list.installations.insert(index, record);
                    state.list.selected_installation = previous_selection;
                    if let Some(metadata) = metadata {
                        this.metadata.store(path.clone(), metadata);
                    }
                    error!(error = %e, "Failed to save after removing installation");
                    return Err(e);
                }
                this.find_errors.write().await.retain(|e| e.path != path);

                this.emit_globals(state);
                if selection_changed {
                    this.emit_mods_change(state).await;
                }
                info!("Removed installation {}", path);
                Ok(())
            })
            .await
    }

    /// Forget every installation. Irreversible.
    pub async fn clear_installations(self: &Arc<Self>) -> Result<()> {
        let this = Arc::clone(self);
        self.serializer
            .submit(ActionKind::ClearInstallations, "all", move |_ctx| async move {
                let mut guard = this.state.write().await;
                let state = &mut *guard;
                let cleared = std::mem::take(&mut state.list).installations.len();
                this.metadata.clear();
                this.find_errors.write().await.clear();

                let saved = this.store.save_installations(&state.list);
                this.emit_globals(state);
                this.emit_mods_change(state).await;
                if let Err(e) = saved {
                    error!(error = %e, "Failed to save cleared installations");
                    return Err(e);
                }
                info!("Cleared {} installations", cleared);
                Ok(())
            })
            .await
    }
}
