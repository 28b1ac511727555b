//! Access guard tuning.

use std::time::Duration;

/// Failed PIN submissions that trigger a lockout.
pub const MAX_ATTEMPTS: u32 = 3;

/// How long a lockout lasts.
pub const LOCKOUT_DURATION: Duration = Duration::from_millis(30_000);

/// Digits in an access PIN.
pub const PIN_LENGTH: usize = 4;

/// Fixed PIN accepted in place of the stored one, unless disabled through
/// [`GuardConfig::recovery_pin`].
pub const RECOVERY_PIN: &str = "1234";

/// Timings and policy for an [`AccessGuard`](super::AccessGuard).
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub max_attempts: u32,
    pub lockout_duration: Duration,
    /// Pause before switching to the keypad when no biometric sensor exists.
    pub fallback_delay: Duration,
    /// How long a rejected PIN stays on screen (shaking) before it is cleared.
    pub shake_delay: Duration,
    /// Pause between a PIN match and revealing content.
    pub reveal_delay: Duration,
    /// Lockout countdown period.
    pub tick_interval: Duration,
    /// Extra PIN always accepted. `None` disables it.
    pub recovery_pin: Option<String>,
    /// Whether a rejected biometric check counts as a failed attempt.
    /// Off by default: only PIN rejections count toward the lockout.
    pub count_biometric_failures: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            lockout_duration: LOCKOUT_DURATION,
            fallback_delay: Duration::from_millis(800),
            shake_delay: Duration::from_millis(500),
            reveal_delay: Duration::from_millis(200),
            tick_interval: Duration::from_secs(1),
            recovery_pin: Some(RECOVERY_PIN.to_string()),
            count_biometric_failures: false,
        }
    }
}

impl GuardConfig {
    /// Same config with the recovery PIN disabled.
    pub fn without_recovery_pin(mut self) -> Self {
        self.recovery_pin = None;
        self
    }

    pub(crate) fn lockout_millis(&self) -> i64 {
        i64::try_from(self.lockout_duration.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.lockout_millis(), 30_000);
        assert_eq!(config.recovery_pin.as_deref(), Some("1234"));
        assert!(!config.count_biometric_failures);
        assert_eq!(config.without_recovery_pin().recovery_pin, None);
    }
}
