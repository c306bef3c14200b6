//! Centralized configuration for the installation registry.
//!
//! This module provides constants for discovery, the process watcher, data
//! file locations and the game's on-disk layout.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Satisfactory Mod Manager";
    /// Directory name under the platform data dir.
    pub const DATA_DIR_NAME: &'static str = "ficsit";
    pub const STEAM_APP_ID: u32 = 1895860;
}

/// Process watcher configuration.
pub struct WatcherConfig;

impl WatcherConfig {
    pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
}

/// Discovery and custom installation configuration.
pub struct DiscoveryConfig;

impl DiscoveryConfig {
    /// Launcher tag of installations added through the custom resolver.
    pub const CUSTOM_LAUNCHER: &'static str = "Custom";
    /// Launcher tag for local records registered without one.
    pub const DEFAULT_LAUNCHER: &'static str = "Local";
    /// Paths containing this marker are served by the remote pass.
    pub const REMOTE_MARKER: &'static str = "://";
    /// Depth bound for the custom installation directory walk.
    pub const MAX_WALK_DEPTH: usize = 6;
    pub const DEFAULT_PROFILE: &'static str = "Default";
}

/// Data file names and install-relative locations.
pub struct PathsConfig;

impl PathsConfig {
    pub const INSTALLATIONS_FILENAME: &'static str = "installations.json";
    pub const PROFILES_FILENAME: &'static str = "profiles.json";
    /// Lockfile location relative to an installation root.
    pub const LOCKFILE_RELATIVE_PATH: &'static str = "FactoryGame/Mods/.smm/lock.json";
}

/// Game executable layout.
pub struct GameConfig;

impl GameConfig {
    /// Process names that mean the game is running.
    pub const RUNNING_EXECUTABLES: &'static [&'static str] = &[
        "FactoryGame-Win64-Shipping",
        "FactoryGame-Win64-Shipping.exe",
        "FactoryGameSteam-Win64-Shipping",
        "FactoryGameSteam-Win64-Shipping.exe",
        "FactoryGameEGS-Win64-Shipping",
        "FactoryGameEGS-Win64-Shipping.exe",
    ];

    /// Executable sub-paths tried in order for a custom installation.
    pub const CUSTOM_EXECUTABLE_PATHS: &'static [&'static str] = &[
        "FactoryGame.exe",
        "Binaries/Win64/FactoryGame.exe",
        "Engine/Binaries/Win64/FactoryGame.exe",
        "FactoryGameSteam.exe",
        "FactoryGameEGS.exe",
        "Binaries/Win64/FactoryGameSteam.exe",
        "Binaries/Win64/FactoryGameEGS.exe",
        "FactoryGame/Binaries/Win64/FactoryGame.exe",
        "FactoryGame/Binaries/Win64/FactoryGame-Win64-Shipping.exe",
    ];

    /// Lowercase file names accepted by the directory walk.
    pub const WALK_ALLOW_LIST: &'static [&'static str] = &[
        "factorygame.exe",
        "factorygamesteam.exe",
        "factorygameegs.exe",
        "factorygame-win64-shipping.exe",
        "factorygamesteam-win64-shipping.exe",
        "factorygameegs-win64-shipping.exe",
        "factorygameserver.exe",
        "factoryserver.exe",
        "factoryserver.sh",
    ];

    /// Version sidecar files, relative to the installation root, in lookup order.
    pub const VERSION_SIDECARS: &'static [&'static str] = &[
        "Engine/Binaries/Win64/FactoryGame-Win64-Shipping.version",
        "Engine/Binaries/Win64/FactoryGameSteam-Win64-Shipping.version",
        "Engine/Binaries/Win64/FactoryGameEGS-Win64-Shipping.version",
        "FactoryGame/Engine/Binaries/Win64/FactoryGame-Win64-Shipping.version",
        "FactoryGame/Engine/Binaries/Win64/FactoryGameSteam-Win64-Shipping.version",
        "FactoryGame/Engine/Binaries/Win64/FactoryGameEGS-Win64-Shipping.version",
        "Engine/Build/Build.version",
    ];

    /// Executables tried when launching a custom installation.
    pub const LAUNCH_CANDIDATES: &'static [&'static str] = &[
        "FactoryGame/Binaries/Win64/FactoryGame-Win64-Shipping.exe",
        "FactoryGame/Binaries/Win64/FactoryGame.exe",
        "FactoryGame.exe",
        "FactoryGameSteam.exe",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_allow_list_is_lowercase() {
        for name in GameConfig::WALK_ALLOW_LIST {
            assert_eq!(*name, name.to_lowercase());
        }
    }

    #[test]
    fn test_poll_interval_is_reasonable() {
        assert!(WatcherConfig::POLL_INTERVAL >= Duration::from_secs(1));
        assert!(DiscoveryConfig::MAX_WALK_DEPTH > 0);
    }
}
