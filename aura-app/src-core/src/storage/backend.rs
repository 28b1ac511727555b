//! Raw storage media for the secure store.
//!
//! A backend is a flat string-to-string map that can fail. It knows nothing
//! about namespacing or encoding; [`SecureStore`](super::SecureStore) layers
//! those on top.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, error, info, warn};

use super::StoreError;

/// A synchronous, fallible key-value medium.
pub trait StorageBackend: Send + Sync {
    /// Read a raw value. `Ok(None)` means the key was never written.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a raw value, replacing any previous one.
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("storage lock poisoned".into())
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local backend. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// File backend
// ============================================================================

/// Backend persisted as a single JSON object in the data directory.
///
/// The whole map is loaded at open and rewritten atomically after every
/// mutation (write to a temp file, then rename). On Unix the file is
/// restricted to the owner.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Store file name inside the data directory.
    pub const FILE_NAME: &'static str = "secure-store.json";

    /// Name given to a store file that could not be loaded.
    pub const CORRUPT_FILE_NAME: &'static str = "secure-store.json.corrupt";

    /// Open (or create) the store file inside `data_dir`.
    ///
    /// A store file that cannot be read or parsed is moved aside to
    /// [`CORRUPT_FILE_NAME`](Self::CORRUPT_FILE_NAME) and the store starts
    /// empty, so the app falls back to first-run state instead of failing.
    ///
    /// # Errors
    /// Returns an error only if the directory cannot be created.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(Self::FILE_NAME);

        let entries = if path.exists() {
            match Self::load(&path) {
                Ok(entries) => entries,
                Err(e) => {
                    error!("Secure store at {:?} is unreadable, starting empty: {}", path, e);
                    let aside = data_dir.join(Self::CORRUPT_FILE_NAME);
                    if let Err(e) = std::fs::rename(&path, &aside) {
                        warn!("Could not move unreadable store aside: {}", e);
                    }
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        info!("Opened secure store at {:?} ({} entries)", path, entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn load(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;

        // Write atomically (write to temp file, then rename)
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        debug!("Persisted {} store entries", entries.len());
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        let previous = entries.insert(key.to_string(), value.to_string());

        // Keep memory consistent with disk if the write does not land
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_remove_absent_is_ok() {
        let backend = MemoryBackend::new();
        assert!(backend.remove("missing").is_ok());
        assert_eq!(backend.read("missing").unwrap(), None);
    }

    #[test]
    fn test_file_backend_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let backend = FileBackend::open(dir.path()).unwrap();
        backend.write("aura_secure_app_pin", "NDMyMQ==").unwrap();
        backend.write("aura_secure_user_theme", "ZW1lcmFsZA==").unwrap();
        backend.remove("aura_secure_user_theme").unwrap();
        drop(backend);

        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(
            reopened.read("aura_secure_app_pin").unwrap().as_deref(),
            Some("NDMyMQ==")
        );
        assert_eq!(reopened.read("aura_secure_user_theme").unwrap(), None);
    }

    #[test]
    fn test_file_backend_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.write("k", "v").unwrap();

        assert!(backend.path().exists());
        assert!(!backend.path().with_extension("json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_backend_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.write("k", "v").unwrap();

        let mode = std::fs::metadata(backend.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_backend_moves_corrupted_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FileBackend::FILE_NAME), "{not json").unwrap();

        let backend = FileBackend::open(dir.path()).unwrap();
        assert_eq!(backend.read("aura_secure_app_pin").unwrap(), None);

        let aside = dir.path().join(FileBackend::CORRUPT_FILE_NAME);
        assert_eq!(std::fs::read_to_string(aside).unwrap(), "{not json");

        // The fresh store is writable and persists normally
        backend.write("k", "v").unwrap();
        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.read("k").unwrap().as_deref(), Some("v"));
    }
}
