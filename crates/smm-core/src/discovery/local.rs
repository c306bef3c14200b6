//! Synchronous on-disk inspection of local installations.

use super::InstallFindError;
use crate::config::DiscoveryConfig;
use crate::custom_install::{infer_install_type, read_game_version, CustomInstallationResolver};
use crate::metadata::{InstallationMetadata, MetadataStore};
use crate::models::{GameBranch, InstallType, Installation, InstallationRecord, LocationType};
use std::path::Path;
use tracing::{debug, warn};

/// Inspect every local record and store its metadata.
///
/// A failing record is marked `Invalid` and reported; it never stops the
/// others from being inspected.
pub fn run_local_pass(
    records: &[InstallationRecord],
    store: &MetadataStore,
    resolver: &CustomInstallationResolver,
) -> Vec<InstallFindError> {
    let mut errors = Vec::new();

    for record in records.iter().filter(|r| !r.is_remote()) {
        match inspect_local(record, resolver) {
            Ok(installation) => {
                debug!("Local installation {} is valid", record.path);
                store.store(record.path.clone(), InstallationMetadata::valid(installation));
            }
            Err(reason) => {
                warn!(path = %record.path, %reason, "Local installation is invalid");
                let info = record.is_custom().then(|| custom_placeholder(record));
                store.store(record.path.clone(), InstallationMetadata::invalid(info));
                errors.push(InstallFindError {
                    path: record.path.clone(),
                    reason,
                });
            }
        }
    }

    errors
}

/// Snapshot kept for a custom record that failed inspection, so the custom
/// tag still reaches the validity check.
fn custom_placeholder(record: &InstallationRecord) -> Installation {
    Installation {
        path: record.path.clone(),
        launch_path: vec![record.path.clone()],
        install_type: InstallType::WindowsClient,
        branch: GameBranch::Stable,
        version: 0,
        launcher: DiscoveryConfig::CUSTOM_LAUNCHER.to_string(),
        location: LocationType::Local,
    }
}

/// Inspect one local record.
///
/// Custom records are re-resolved with the custom resolver. Other records
/// need an existing directory containing a recognizable game executable.
pub fn inspect_local(
    record: &InstallationRecord,
    resolver: &CustomInstallationResolver,
) -> std::result::Result<Installation, String> {
    let install_path = Path::new(&record.path);

    if record.is_custom() {
        return resolver
            .resolve(install_path)
            .map(|resolution| resolution.installation)
            .map_err(|e| e.to_string());
    }

    if !install_path.is_dir() {
        return Err(format!("Installation directory not found: {}", record.path));
    }

    let executable = resolver
        .find_executable(install_path)
        .ok_or_else(|| format!("Game executable not found in {}", record.path))?;

    Ok(Installation {
        path: record.path.clone(),
        launch_path: vec![executable.to_string_lossy().into_owned()],
        install_type: infer_install_type(&executable),
        branch: GameBranch::Stable,
        version: read_game_version(install_path),
        launcher: record
            .launcher
            .clone()
            .unwrap_or_else(|| DiscoveryConfig::DEFAULT_LAUNCHER.to_string()),
        location: LocationType::Local,
    })
}
