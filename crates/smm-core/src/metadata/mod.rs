//! Installation metadata cache and JSON persistence helpers.
//!
//! [`MetadataStore`] is the one piece of registry state shared without the
//! action lock. Foreground actions, the local discovery pass and the remote
//! discovery task all write to it concurrently. Foreground writes replace the
//! whole entry and resolve as last-writer-wins. Background results only
//! resolve entries still marked `Unknown`, so they never resurrect a removed
//! path or overwrite a newer foreground write.

pub mod atomic;

use crate::models::Installation;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use atomic::{atomic_read_json, atomic_write_json};

/// Discovery outcome for an installation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallState {
    Unknown,
    Valid,
    Invalid,
}

/// Discovery state plus the last discovered snapshot for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationMetadata {
    pub state: InstallState,
    pub info: Option<Installation>,
}

impl InstallationMetadata {
    pub fn unknown() -> Self {
        Self {
            state: InstallState::Unknown,
            info: None,
        }
    }

    pub fn valid(info: Installation) -> Self {
        Self {
            state: InstallState::Valid,
            info: Some(info),
        }
    }

    pub fn invalid(info: Option<Installation>) -> Self {
        Self {
            state: InstallState::Invalid,
            info,
        }
    }

    /// Custom installations are valid whatever their stored state.
    pub fn is_valid(&self) -> bool {
        if self.info.as_ref().is_some_and(Installation::is_custom) {
            return true;
        }
        self.state != InstallState::Invalid
    }
}

/// Concurrent map from installation path to its metadata.
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: DashMap<String, InstallationMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `path`.
    pub fn store(&self, path: impl Into<String>, metadata: InstallationMetadata) {
        self.entries.insert(path.into(), metadata);
    }

    /// Replace the entry for `path` only if it is still `Unknown`.
    ///
    /// Returns false when the path is absent or already resolved.
    pub fn resolve_pending(&self, path: &str, metadata: InstallationMetadata) -> bool {
        match self.entries.get_mut(path) {
            Some(mut entry) if entry.state == InstallState::Unknown => {
                *entry = metadata;
                true
            }
            _ => false,
        }
    }

    pub fn load(&self, path: &str) -> Option<InstallationMetadata> {
        self.entries.get(path).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, path: &str) -> Option<InstallationMetadata> {
        self.entries.remove(path).map(|(_, metadata)| metadata)
    }

    /// Visit a point-in-time copy of every entry.
    ///
    /// The visitor runs after the copy is taken, so it never holds a shard
    /// lock and cannot observe its own writes.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&str, &InstallationMetadata),
    {
        for (path, metadata) in self.snapshot() {
            visit(&path, &metadata);
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, InstallationMetadata> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validity predicate used for selection.
    ///
    /// Missing paths are invalid. Custom installations are always valid.
    /// Otherwise anything not marked `Invalid` is valid, including paths whose
    /// discovery has not finished yet.
    pub fn is_valid_install(&self, path: &str) -> bool {
        self.entries
            .get(path)
            .is_some_and(|entry| entry.value().is_valid())
    }
}
