//! Mod resolver boundary.
//!
//! Dependency resolution itself lives outside this crate. The registry only
//! needs two things from it: the lockfile of an installation and a way to
//! re-apply a profile to disk.

use crate::actions::{ProgressSink, TaskUpdate};
use crate::config::PathsConfig;
use crate::metadata::atomic_read_json;
use crate::models::{InstallationRecord, LockFile, Profile};
use crate::{Result, SmmError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// External resolver consumed by the registry.
#[async_trait]
pub trait ModResolver: Send + Sync {
    /// Lockfile of `install`, or `None` if nothing has been resolved yet.
    async fn lock_file(&self, install: &InstallationRecord) -> Result<Option<LockFile>>;

    /// Bring the mods on disk in line with `profile` and the vanilla flag.
    async fn apply(
        &self,
        install: &InstallationRecord,
        profile: Option<&Profile>,
        progress: &ProgressSink,
    ) -> Result<()>;
}

/// Resolver that reads lockfiles written by the mod installer.
///
/// `apply` checks that every enabled profile mod is pinned by the lockfile
/// and reports one progress step per locked mod.
#[derive(Debug, Clone, Default)]
pub struct LockFileResolver;

impl LockFileResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn lockfile_path(install_path: &Path) -> PathBuf {
        install_path.join(PathsConfig::LOCKFILE_RELATIVE_PATH)
    }

    fn read(install: &InstallationRecord) -> Result<Option<LockFile>> {
        if install.is_remote() {
            return Ok(None);
        }
        let path = Self::lockfile_path(Path::new(&install.path));
        atomic_read_json::<LockFile>(&path).map_err(|e| SmmError::Resolver {
            message: format!("Failed to read lockfile for {}: {}", install.path, e),
        })
    }
}

#[async_trait]
impl ModResolver for LockFileResolver {
    async fn lock_file(&self, install: &InstallationRecord) -> Result<Option<LockFile>> {
        Self::read(install)
    }

    async fn apply(
        &self,
        install: &InstallationRecord,
        profile: Option<&Profile>,
        progress: &ProgressSink,
    ) -> Result<()> {
        if install.vanilla {
            progress.report(TaskUpdate::new("Mods disabled", 1.0));
            return Ok(());
        }
        if install.is_remote() {
            progress.report(TaskUpdate::indeterminate("Remote installation, nothing to apply"));
            return Ok(());
        }

        let lockfile = Self::read(install)?.unwrap_or_default();
        if let Some(profile) = profile {
            let unresolved: Vec<&str> = profile
                .mods
                .iter()
                .filter(|(reference, m)| m.enabled && !lockfile.mods.contains_key(*reference))
                .map(|(reference, _)| reference.as_str())
                .collect();
            if !unresolved.is_empty() {
                return Err(SmmError::Resolver {
                    message: format!(
                        "Profile {} has unresolved mods: {}",
                        profile.name,
                        unresolved.join(", ")
                    ),
                });
            }
        }

        let total = lockfile.mods.len().max(1) as f64;
        for (index, (reference, locked)) in lockfile.mods.iter().enumerate() {
            progress.report(TaskUpdate::new(
                format!("{reference} {}", locked.version),
                (index + 1) as f64 / total,
            ));
        }
        debug!(
            "Applied {} locked mods to {}",
            lockfile.mods.len(),
            install.path
        );
        Ok(())
    }
}
