//! Lock state and authentication mode types.

use serde::{Deserialize, Serialize};

/// Whether the host may show protected content.
///
/// - `NotSetup` → `Unlocked` (after first-run setup)
/// - `Unlocked` → `Locked` (when the app goes to background or the user locks)
/// - `Locked` → `Unlocked` (after biometric or PIN success)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LockStatus {
    /// No PIN has been created yet (first-time user)
    #[default]
    NotSetup,
    /// Configured, waiting for authentication
    Locked,
    /// Content is visible
    Unlocked,
}

/// Credential the guard is currently asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Platform biometric check (fingerprint, face)
    Biometric,
    /// 4-digit PIN typed on the keypad
    Pin,
}

/// Access guard state.
///
/// `Unlocked` is terminal until the host calls
/// [`AccessGuard::relock`](super::AccessGuard::relock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    Biometric,
    PinEntry,
    Locked,
    Unlocked,
}

impl GuardState {
    /// Mode shown to the user, if the guard is accepting a credential.
    pub fn auth_mode(&self) -> Option<AuthMode> {
        match self {
            Self::Biometric => Some(AuthMode::Biometric),
            Self::PinEntry => Some(AuthMode::Pin),
            Self::Locked | Self::Unlocked => None,
        }
    }
}

impl std::fmt::Display for LockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSetup => write!(f, "NotSetup"),
            Self::Locked => write!(f, "Locked"),
            Self::Unlocked => write!(f, "Unlocked"),
        }
    }
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Biometric => write!(f, "biometric"),
            Self::Pin => write!(f, "pin"),
        }
    }
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Biometric => write!(f, "biometric"),
            Self::PinEntry => write!(f, "pin_entry"),
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
        }
    }
}
