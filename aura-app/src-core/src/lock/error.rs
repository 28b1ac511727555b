//! Errors raised by the lock-related host flows.
//!
//! Credential mismatches, lockouts and a missing biometric sensor are NOT
//! errors; the access guard reports those as
//! [`GuardOutcome`](super::GuardOutcome)s. These variants cover setup and
//! PIN change validation, where the UI needs a message to show.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// A new PIN is not exactly 4 digits.
    #[error("PIN must have 4 digits")]
    InvalidPinFormat,

    /// The current PIN given to the PIN change flow is wrong.
    #[error("Current PIN incorrect")]
    IncorrectPin,

    /// New PIN and its confirmation differ.
    #[error("PINs do not match")]
    PinMismatch,

    /// Setup received a salary that is not a positive amount.
    #[error("Salary must be a positive amount")]
    InvalidSalary,

    /// The app has not been set up yet.
    #[error("App not set up")]
    NotSetup,

    /// Setup was requested on an app that is already configured.
    #[error("App already set up")]
    AlreadySetup,

    /// The operation needs unlocked access.
    #[error("Access is locked")]
    Locked,
}

/// Result type alias for lock flows.
pub type LockResult<T> = std::result::Result<T, LockError>;

// ============================================================================
// Serialization for a UI bridge
// ============================================================================

impl serde::Serialize for LockError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("LockError", 2)?;

        let code = match self {
            LockError::InvalidPinFormat => "INVALID_PIN_FORMAT",
            LockError::IncorrectPin => "INCORRECT_PIN",
            LockError::PinMismatch => "PIN_MISMATCH",
            LockError::InvalidSalary => "INVALID_SALARY",
            LockError::NotSetup => "NOT_SETUP",
            LockError::AlreadySetup => "ALREADY_SETUP",
            LockError::Locked => "LOCKED",
        };

        state.serialize_field("code", code)?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
