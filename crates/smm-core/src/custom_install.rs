//! Heuristic resolution of user-supplied installation directories.
//!
//! Resolution order:
//! 1. the fixed candidate list in [`GameConfig::CUSTOM_EXECUTABLE_PATHS`], first hit wins
//! 2. a bounded walk for a case-insensitive allow-listed file name
//! 3. the directory itself as the launch target, with a warning
//!
//! Only a missing directory is an error.

use crate::config::{DiscoveryConfig, GameConfig};
use crate::models::{GameBranch, InstallType, Installation, LocationType};
use crate::{Result, SmmError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Result of resolving a custom installation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomResolution {
    pub installation: Installation,
    /// Executable found on disk, if any.
    pub executable: Option<PathBuf>,
    /// Set when no executable was found and the directory was admitted anyway.
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GameVersionFile {
    #[serde(rename = "Changelist", default)]
    changelist: i64,
}

/// Synthesizes [`Installation`]s for directories automatic discovery can't handle.
#[derive(Debug, Clone)]
pub struct CustomInstallationResolver {
    max_depth: usize,
}

impl Default for CustomInstallationResolver {
    fn default() -> Self {
        Self {
            max_depth: DiscoveryConfig::MAX_WALK_DEPTH,
        }
    }
}

impl CustomInstallationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn resolve(&self, install_path: &Path) -> Result<CustomResolution> {
        if !install_path.exists() {
            return Err(SmmError::PathNotFound(install_path.to_path_buf()));
        }

        let path = install_path.to_string_lossy().into_owned();
        let executable = self.find_executable(install_path);

        let (launch_path, install_type, version, warning) = match &executable {
            Some(exe) => {
                debug!("Resolved custom installation {} to {}", path, exe.display());
                (
                    vec![exe.to_string_lossy().into_owned()],
                    infer_install_type(exe),
                    read_game_version(install_path),
                    None,
                )
            }
            None => {
                warn!(install_path = %path, "Could not find the game executable");
                (
                    vec![path.clone()],
                    InstallType::WindowsClient,
                    0,
                    Some(format!(
                        "Could not find the game executable in {}; launching will use the directory itself",
                        path
                    )),
                )
            }
        };

        Ok(CustomResolution {
            installation: Installation {
                path,
                launch_path,
                install_type,
                branch: GameBranch::Stable,
                version,
                launcher: DiscoveryConfig::CUSTOM_LAUNCHER.to_string(),
                location: LocationType::Local,
            },
            executable,
            warning,
        })
    }

    /// Locate the game executable under `install_path`.
    pub fn find_executable(&self, install_path: &Path) -> Option<PathBuf> {
        known_executable(install_path).or_else(|| self.walk_for_executable(install_path))
    }

    fn walk_for_executable(&self, install_path: &Path) -> Option<PathBuf> {
        WalkDir::new(install_path)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            // Unreadable entries are skipped, not fatal.
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry.file_type().is_file()
                    && GameConfig::WALK_ALLOW_LIST
                        .contains(&entry.file_name().to_string_lossy().to_lowercase().as_str())
            })
            .map(walkdir::DirEntry::into_path)
    }
}

fn known_executable(install_path: &Path) -> Option<PathBuf> {
    GameConfig::CUSTOM_EXECUTABLE_PATHS
        .iter()
        .map(|relative| install_path.join(relative))
        .find(|candidate| candidate.is_file())
}

/// Server if the executable name or path mentions "server", client otherwise.
pub fn infer_install_type(executable: &Path) -> InstallType {
    let full = executable.to_string_lossy().to_lowercase();
    if !full.contains("server") {
        return InstallType::WindowsClient;
    }
    let is_windows_binary = executable
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"));
    if is_windows_binary {
        InstallType::WindowsServer
    } else {
        InstallType::LinuxServer
    }
}

/// Build changelist from the first sidecar version file with a positive value.
pub fn read_game_version(install_path: &Path) -> i64 {
    GameConfig::VERSION_SIDECARS
        .iter()
        .map(|relative| install_path.join(relative))
        .filter_map(|sidecar| {
            let contents = std::fs::read_to_string(&sidecar).ok()?;
            match serde_json::from_str::<GameVersionFile>(&contents) {
                Ok(parsed) => Some(parsed.changelist),
                Err(e) => {
                    debug!("Ignoring unreadable version file {}: {}", sidecar.display(), e);
                    None
                }
            }
        })
        .find(|changelist| *changelist > 0)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_missing_directory_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = CustomInstallationResolver::new().resolve(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(SmmError::PathNotFound(_))));
    }

    #[test]
    fn test_candidate_order_prefers_root_executable() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "Binaries/Win64/FactoryGame.exe");
        let root_exe = touch(temp_dir.path(), "FactoryGame.exe");

        let resolution = CustomInstallationResolver::new()
            .resolve(temp_dir.path())
            .unwrap();
        assert_eq!(resolution.executable, Some(root_exe));
    }

    #[test]
    fn test_walk_matches_case_insensitively() {
        let temp_dir = TempDir::new().unwrap();
        let exe = touch(temp_dir.path(), "Game/Deep/FACTORYGAMESTEAM-WIN64-SHIPPING.EXE");

        let resolution = CustomInstallationResolver::new()
            .resolve(temp_dir.path())
            .unwrap();
        assert_eq!(resolution.executable, Some(exe));
        assert_eq!(resolution.installation.install_type, InstallType::WindowsClient);
        assert!(resolution.warning.is_none());
    }

    #[test]
    fn test_walk_respects_depth_bound() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a/b/c/FactoryGame.exe");

        let shallow = CustomInstallationResolver::new().with_max_depth(2);
        assert!(shallow.find_executable(temp_dir.path()).is_none());

        let deep = CustomInstallationResolver::new().with_max_depth(4);
        assert!(deep.find_executable(temp_dir.path()).is_some());
    }

    #[test]
    fn test_walk_ignores_unrelated_executables() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "tools/UnrealPak.exe");

        let resolution = CustomInstallationResolver::new()
            .resolve(temp_dir.path())
            .unwrap();
        assert!(resolution.executable.is_none());
        assert!(resolution.warning.is_some());
    }

    #[test]
    fn test_linux_server_script() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "FactoryServer.sh");

        let resolution = CustomInstallationResolver::new()
            .resolve(temp_dir.path())
            .unwrap();
        assert_eq!(resolution.installation.install_type, InstallType::LinuxServer);
    }

    #[test]
    fn test_version_sidecar_order_and_positive_changelist() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "FactoryGame.exe");
        fs::create_dir_all(root.join("Engine/Binaries/Win64")).unwrap();
        fs::write(
            root.join("Engine/Binaries/Win64/FactoryGame-Win64-Shipping.version"),
            r#"{"MajorVersion":5,"Changelist":0}"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("Engine/Build")).unwrap();
        fs::write(
            root.join("Engine/Build/Build.version"),
            r#"{"Changelist":365306,"BranchName":"++FactoryGame+rel-main-1.0"}"#,
        )
        .unwrap();

        let resolution = CustomInstallationResolver::new().resolve(root).unwrap();
        assert_eq!(resolution.installation.version, 365306);
    }

    #[test]
    fn test_unparsable_sidecar_yields_zero() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("Engine/Build")).unwrap();
        fs::write(root.join("Engine/Build/Build.version"), "not json").unwrap();
        assert_eq!(read_game_version(root), 0);
    }

    #[test]
    fn test_no_version_without_executable() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("Engine/Build")).unwrap();
        fs::write(root.join("Engine/Build/Build.version"), r#"{"Changelist":42}"#).unwrap();

        let resolution = CustomInstallationResolver::new().resolve(root).unwrap();
        assert_eq!(resolution.installation.version, 0);
    }
}
