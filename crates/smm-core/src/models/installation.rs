//! Installation snapshots and the persisted installation list.

use crate::config::DiscoveryConfig;
use serde::{Deserialize, Serialize};

/// Client or server variant of a game installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallType {
    WindowsClient,
    WindowsServer,
    LinuxServer,
}

impl InstallType {
    /// Mod target this installation consumes.
    pub fn target_name(&self) -> &'static str {
        match self {
            InstallType::WindowsClient => "Windows",
            InstallType::WindowsServer => "WindowsServer",
            InstallType::LinuxServer => "LinuxServer",
        }
    }

    pub fn is_server(&self) -> bool {
        !matches!(self, InstallType::WindowsClient)
    }
}

/// Release channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameBranch {
    #[default]
    Stable,
    Experimental,
}

/// Whether an installation lives on this machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    #[default]
    Local,
    Remote,
}

/// A discovered or manually registered game installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub path: String,
    /// Command line used to start the game.
    pub launch_path: Vec<String>,
    #[serde(rename = "type")]
    pub install_type: InstallType,
    pub branch: GameBranch,
    /// Build changelist, 0 when unknown.
    pub version: i64,
    /// Discovery mechanism that produced this installation.
    pub launcher: String,
    pub location: LocationType,
}

impl Installation {
    pub fn is_custom(&self) -> bool {
        self.launcher == DiscoveryConfig::CUSTOM_LAUNCHER
    }

    pub fn target_name(&self) -> &'static str {
        self.install_type.target_name()
    }
}

/// Returns true if the path is handled by the remote discovery pass.
pub fn is_remote_path(path: &str) -> bool {
    path.contains(DiscoveryConfig::REMOTE_MARKER)
}

/// A persisted entry of the installation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub path: String,
    pub profile: String,
    /// Mods disabled for this installation.
    #[serde(default)]
    pub vanilla: bool,
    /// Launcher tag recorded when the installation was registered.
    #[serde(default)]
    pub launcher: Option<String>,
}

impl InstallationRecord {
    pub fn new(path: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            profile: profile.into(),
            vanilla: false,
            launcher: None,
        }
    }

    pub fn with_launcher(mut self, launcher: impl Into<String>) -> Self {
        self.launcher = Some(launcher.into());
        self
    }

    pub fn is_custom(&self) -> bool {
        self.launcher.as_deref() == Some(DiscoveryConfig::CUSTOM_LAUNCHER)
    }

    pub fn is_remote(&self) -> bool {
        is_remote_path(&self.path)
    }
}

/// The ordered installation list plus the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationList {
    #[serde(default)]
    pub installations: Vec<InstallationRecord>,
    /// Empty when nothing is selected.
    #[serde(default)]
    pub selected_installation: String,
}

impl InstallationList {
    pub fn get(&self, path: &str) -> Option<&InstallationRecord> {
        self.installations.iter().find(|i| i.path == path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut InstallationRecord> {
        self.installations.iter_mut().find(|i| i.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn add(&mut self, record: InstallationRecord) {
        self.installations.push(record);
    }

    /// Remove a record, returning it and its former index.
    pub fn remove(&mut self, path: &str) -> Option<(usize, InstallationRecord)> {
        let index = self.installations.iter().position(|i| i.path == path)?;
        Some((index, self.installations.remove(index)))
    }

    pub fn selected(&self) -> Option<&InstallationRecord> {
        if self.selected_installation.is_empty() {
            return None;
        }
        self.get(&self.selected_installation)
    }

    pub fn selected_mut(&mut self) -> Option<&mut InstallationRecord> {
        if self.selected_installation.is_empty() {
            return None;
        }
        let selected = self.selected_installation.clone();
        self.get_mut(&selected)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.installations.iter().map(|i| i.path.as_str())
    }
}
