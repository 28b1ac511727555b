//! Lock screen: the access guard and everything it depends on.
//!
//! The [`AccessGuard`] decides whether protected content may be shown. It
//! starts in biometric mode, falls back to a 4-digit PIN, counts failed PIN
//! submissions and, after [`MAX_ATTEMPTS`] of them, refuses all input until
//! a timed lockout expires.

pub mod auth;
pub mod biometric;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod pin;
pub mod pin_change;
pub mod ticker;

pub use auth::{AuthMode, GuardState, LockStatus};
pub use biometric::{BiometricAuthenticator, BiometricError, SimulatedBiometric};
pub use clock::{Clock, SystemClock};
pub use config::{GuardConfig, LOCKOUT_DURATION, MAX_ATTEMPTS, PIN_LENGTH, RECOVERY_PIN};
pub use error::{LockError, LockResult};
pub use guard::{AccessGuard, GuardEvent, GuardOutcome};
pub use pin::{is_valid_pin, pin_matches, PinBuffer};
pub use pin_change::{PinChange, PinChangeProgress, PinChangeStep};
pub use ticker::LockoutTicker;
