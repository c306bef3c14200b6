//! Atomic file operations for safe JSON persistence.
//!
//! Writes go to a temp file with a unique PID+TID suffix, are synced to disk,
//! optionally back up the previous file and finally rename over the target.

use crate::{Result, SmmError};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::process;
use std::thread;
use tracing::{debug, warn};

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SmmError::Io {
                message: format!("Failed to read {}", path.display()),
                path: Some(path.to_path_buf()),
                source: Some(e),
            })
        }
    };

    let data: T = serde_json::from_str(&contents).map_err(|e| SmmError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Write data to a JSON file atomically, keeping a `.bak` copy when asked.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T, keep_backup: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| SmmError::io_with_path(e, parent))?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.{}.tmp", process::id(), thread_id()));

    let serialized = serde_json::to_string_pretty(data).map_err(|e| SmmError::Json {
        message: format!("Failed to serialize {}: {}", path.display(), e),
        source: Some(e),
    })?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| SmmError::Io {
                message: format!("Failed to create temp file {}", temp_path.display()),
                path: Some(temp_path.clone()),
                source: Some(e),
            })?;

        file.write_all(serialized.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| SmmError::Io {
                message: format!("Failed to write temp file {}", temp_path.display()),
                path: Some(temp_path.clone()),
                source: Some(e),
            })?;
    }

    if keep_backup && path.exists() {
        let backup_path = path.with_extension("json.bak");
        if let Err(e) = fs::copy(path, &backup_path) {
            warn!("Failed to create backup {}: {}", backup_path.display(), e);
        }
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(SmmError::Io {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        });
    }

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InstallationList, InstallationRecord};
    use tempfile::TempDir;

    fn sample_list(selected: &str) -> InstallationList {
        let mut list = InstallationList::default();
        list.add(InstallationRecord::new("/games/a", "Default"));
        list.add(InstallationRecord::new("/games/b", "Default"));
        list.selected_installation = selected.to_string();
        list
    }

    #[test]
    fn test_atomic_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("installations.json");

        let list = sample_list("/games/a");
        atomic_write_json(&path, &list, false).unwrap();

        let read: Option<InstallationList> = atomic_read_json(&path).unwrap();
        assert_eq!(read, Some(list));
    }

    #[test]
    fn test_atomic_write_creates_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("installations.json");

        let first = sample_list("/games/a");
        let second = sample_list("/games/b");
        atomic_write_json(&path, &first, true).unwrap();
        atomic_write_json(&path, &second, true).unwrap();

        let backup: Option<InstallationList> =
            atomic_read_json(&path.with_extension("json.bak")).unwrap();
        assert_eq!(backup, Some(first));

        let current: Option<InstallationList> = atomic_read_json(&path).unwrap();
        assert_eq!(current, Some(second));
    }

    #[test]
    fn test_atomic_read_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let result: Option<InstallationList> =
            atomic_read_json(&temp_dir.path().join("missing.json")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_atomic_read_corrupt_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("installations.json");
        fs::write(&path, "{ not json").unwrap();

        let result: Result<Option<InstallationList>> = atomic_read_json(&path);
        assert!(matches!(result, Err(SmmError::Json { .. })));
    }

    #[test]
    fn test_atomic_write_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("profiles.json");

        atomic_write_json(&path, &sample_list(""), false).unwrap();
        assert!(path.exists());
    }
}
