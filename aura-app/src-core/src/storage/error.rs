use thiserror::Error;

/// Failures of the backing medium.
///
/// These never cross the [`CredentialStore`](super::CredentialStore) trait:
/// the store logs them and degrades to "absent" on read and "best effort" on
/// write. Backends and their direct callers still see them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored value could not be decoded: {0}")]
    Decode(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
