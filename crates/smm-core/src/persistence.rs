//! Persistence of the installation list and profile set.

use crate::config::PathsConfig;
use crate::metadata::{atomic_read_json, atomic_write_json};
use crate::models::{InstallationList, ProfileSet};
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load/save contract for registry documents.
pub trait RegistryStore: Send + Sync {
    fn load_installations(&self) -> Result<InstallationList>;

    fn save_installations(&self, list: &InstallationList) -> Result<()>;

    fn load_profiles(&self) -> Result<ProfileSet>;
}

/// Stores registry documents as JSON files in a data directory.
#[derive(Debug, Clone)]
pub struct JsonRegistryStore {
    data_dir: PathBuf,
}

impl JsonRegistryStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn installations_path(&self) -> PathBuf {
        self.data_dir.join(PathsConfig::INSTALLATIONS_FILENAME)
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.data_dir.join(PathsConfig::PROFILES_FILENAME)
    }
}

impl RegistryStore for JsonRegistryStore {
    fn load_installations(&self) -> Result<InstallationList> {
        let path = self.installations_path();
        let list = atomic_read_json::<InstallationList>(&path)?.unwrap_or_default();
        debug!(
            "Loaded {} installations from {}",
            list.installations.len(),
            path.display()
        );
        Ok(list)
    }

    fn save_installations(&self, list: &InstallationList) -> Result<()> {
        atomic_write_json(&self.installations_path(), list, true)
    }

    fn load_profiles(&self) -> Result<ProfileSet> {
        Ok(atomic_read_json::<ProfileSet>(&self.profiles_path())?.unwrap_or_default())
    }
}
