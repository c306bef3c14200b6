//! Resolver lockfile contents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A mod pinned by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedMod {
    pub version: String,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Mapping of mod reference to its resolved version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    #[serde(default)]
    pub mods: BTreeMap<String, LockedMod>,
}

impl LockFile {
    /// Mod reference to resolved version.
    pub fn versions(&self) -> BTreeMap<String, String> {
        self.mods
            .iter()
            .map(|(reference, locked)| (reference.clone(), locked.version.clone()))
            .collect()
    }
}
