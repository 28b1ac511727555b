//! Obfuscated key-value persistence.
//!
//! Everything the lock screen and the host app remember between sessions
//! goes through a [`CredentialStore`]. Values are base64-encoded before they
//! reach the backing medium so they are not trivially readable there; this
//! is obfuscation, not encryption.

mod backend;
mod error;
pub mod keys;
mod preferences;
mod secure;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use error::StoreError;
pub use preferences::{load_preferences, Preferences, Theme};
pub use secure::{decode_value, encode_value, CredentialStore, SecureStore, SECURE_PREFIX};
