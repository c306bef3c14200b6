//! Mod profiles.

use crate::config::DiscoveryConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A mod entry inside a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMod {
    /// Version constraint.
    pub version: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// A named set of mods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub mods: BTreeMap<String, ProfileMod>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mods: BTreeMap::new(),
        }
    }
}

/// All known profiles keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSet {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl ProfileSet {
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Sorted profile names.
    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    /// Profile assigned to installations whose own profile is unusable.
    ///
    /// Prefers `Default`, then the alphabetically first profile.
    pub fn fallback_profile(&self) -> String {
        if self.contains(DiscoveryConfig::DEFAULT_PROFILE) {
            return DiscoveryConfig::DEFAULT_PROFILE.to_string();
        }
        self.profiles
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| DiscoveryConfig::DEFAULT_PROFILE.to_string())
    }
}
