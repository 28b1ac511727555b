//! Namespaced, obfuscating store over a raw backend.

use async_trait::async_trait;
use data_encoding::BASE64;
use tracing::{debug, error, warn};

use super::{StorageBackend, StoreError};

/// Prefix applied to every key so the app's entries cannot collide with
/// unrelated data sharing the same medium.
pub const SECURE_PREFIX: &str = "aura_secure_";

/// Best-effort key-value persistence used by the lock screen and host flows.
///
/// Implementations never surface failures: a read that cannot be served is
/// reported as absent, and a write or delete that fails is logged and
/// dropped. Callers must not assume a write landed.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store `value` under `key`.
    async fn set(&self, key: &str, value: &str);

    /// Fetch the value under `key`, or `None` if it was never set or cannot
    /// be read back.
    async fn get(&self, key: &str) -> Option<String>;

    /// Remove `key`. Removing an absent key is a no-op.
    async fn delete(&self, key: &str);
}

/// Encode a value for storage (UTF-8 bytes, standard base64).
///
/// This only keeps values from being human-readable in the raw medium. It
/// is NOT encryption and offers no confidentiality.
pub fn encode_value(value: &str) -> String {
    BASE64.encode(value.as_bytes())
}

/// Reverse [`encode_value`].
///
/// # Errors
/// Returns [`StoreError::Decode`] if the input is not base64 or does not
/// decode to UTF-8.
pub fn decode_value(encoded: &str) -> Result<String, StoreError> {
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

/// [`CredentialStore`] over any [`StorageBackend`].
///
/// Keys are namespaced with [`SECURE_PREFIX`] and values pass through
/// [`encode_value`]. The encoding is obfuscation only; a PIN stored here is
/// recoverable by anyone who can read the medium.
#[derive(Debug)]
pub struct SecureStore<B> {
    backend: B,
}

impl<B: StorageBackend> SecureStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The raw medium, for inspection.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", SECURE_PREFIX, key)
    }

    fn try_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.backend.read(&Self::namespaced(key))? {
            Some(encoded) => decode_value(&encoded).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<B: StorageBackend> CredentialStore for SecureStore<B> {
    async fn set(&self, key: &str, value: &str) {
        let encoded = encode_value(value);
        match self.backend.write(&Self::namespaced(key), &encoded) {
            Ok(()) => debug!("Stored key {}", key),
            Err(e) => error!("Failed to save {} to secure store: {}", key, e),
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to read {} from secure store: {}", key, e);
                None
            }
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.backend.remove(&Self::namespaced(key)) {
            warn!("Failed to delete {} from secure store: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    /// Backend whose medium is gone.
    struct BrokenBackend;

    impl StorageBackend for BrokenBackend {
        fn read(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("medium offline".into()))
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("medium offline".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("medium offline".into()))
        }
    }

    #[tokio::test]
    async fn test_set_then_get_returns_original() {
        let store = SecureStore::new(MemoryBackend::new());
        for value in ["4321", "", "1700000000000", "Alimentação 🍔", "line\nbreak"] {
            store.set("app_pin", value).await;
            assert_eq!(store.get("app_pin").await.as_deref(), Some(value));
        }
    }

    #[tokio::test]
    async fn test_values_are_namespaced_and_encoded() {
        let store = SecureStore::new(MemoryBackend::new());
        store.set("app_pin", "4321").await;

        assert_eq!(store.backend().read("app_pin").unwrap(), None);
        let raw = store.backend().read("aura_secure_app_pin").unwrap().unwrap();
        assert_ne!(raw, "4321");
        assert_eq!(raw, "NDMyMQ==");
    }

    #[tokio::test]
    async fn test_get_absent_key() {
        let store = SecureStore::new(MemoryBackend::new());
        assert_eq!(store.get("lockout_until").await, None);
    }

    #[tokio::test]
    async fn test_delete_never_set_key() {
        let store = SecureStore::new(MemoryBackend::new());
        store.delete("failed_attempts").await;
        assert_eq!(store.get("failed_attempts").await, None);
    }

    #[tokio::test]
    async fn test_delete_removes_value() {
        let store = SecureStore::new(MemoryBackend::new());
        store.set("failed_attempts", "2").await;
        store.delete("failed_attempts").await;
        assert_eq!(store.get("failed_attempts").await, None);
    }

    #[tokio::test]
    async fn test_undecodable_value_reads_as_absent() {
        let store = SecureStore::new(MemoryBackend::new());
        store
            .backend()
            .write("aura_secure_app_pin", "%%% not base64 %%%")
            .unwrap();
        assert_eq!(store.get("app_pin").await, None);

        // Valid base64, invalid UTF-8
        store
            .backend()
            .write("aura_secure_app_pin", &BASE64.encode(&[0xff, 0xfe]))
            .unwrap();
        assert_eq!(store.get("app_pin").await, None);
    }

    #[tokio::test]
    async fn test_backend_failures_are_swallowed() {
        let store = SecureStore::new(BrokenBackend);
        store.set("app_pin", "4321").await;
        assert_eq!(store.get("app_pin").await, None);
        store.delete("app_pin").await;
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_value("***"), Err(StoreError::Decode(_))));
        assert_eq!(decode_value(&encode_value("9999")).unwrap(), "9999");
    }
}
