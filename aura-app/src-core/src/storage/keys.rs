//! The persisted key space.
//!
//! Keys are stored under [`SECURE_PREFIX`](super::SECURE_PREFIX) by the
//! store; callers always use the bare names below.

/// 4-digit access PIN. Written by setup and PIN change.
pub const APP_PIN: &str = "app_pin";

/// Consecutive PIN failures. Written by the access guard.
pub const FAILED_ATTEMPTS: &str = "failed_attempts";

/// Lockout expiry as epoch milliseconds. Written by the access guard.
pub const LOCKOUT_UNTIL: &str = "lockout_until";

pub const USER_SALARY: &str = "user_salary";
pub const USER_THEME: &str = "user_theme";
pub const IS_CONFIGURED: &str = "is_configured";
pub const AUTO_THEME: &str = "auto_theme";

/// Every key the application writes, in the order a data reset removes them.
pub const ALL_KEYS: [&str; 7] = [
    USER_SALARY,
    USER_THEME,
    IS_CONFIGURED,
    APP_PIN,
    FAILED_ATTEMPTS,
    LOCKOUT_UNTIL,
    AUTO_THEME,
];
