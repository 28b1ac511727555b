//! Platform biometric check.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ways a biometric check can fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum BiometricError {
    /// No sensor, or the platform API is missing.
    #[error("Biometric authentication not available: {0}")]
    NotAvailable(String),

    /// The sensor did not recognise the user.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No biometrics enrolled on the device.
    #[error("No biometrics enrolled on this device")]
    NoBiometricsEnrolled,

    /// User dismissed the prompt.
    #[error("User cancelled authentication")]
    UserCancelled,
}

/// Platform biometric capability, as consumed by the access guard.
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    /// Whether a sensor is present. `false` is a normal fallback trigger, not an error.
    fn is_available(&self) -> bool;

    /// Run one biometric check.
    async fn authenticate(&self) -> Result<(), BiometricError>;
}

/// Stand-in sensor: waits a fixed latency, then reports a fixed result
/// (success unless built with [`failing`](Self::failing)).
///
/// Built unavailable, it behaves like a device without a sensor.
#[derive(Debug, Clone)]
pub struct SimulatedBiometric {
    available: bool,
    latency: Duration,
    outcome: Result<(), BiometricError>,
}

impl SimulatedBiometric {
    /// Round-trip time of the simulated sensor.
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1200);

    pub fn new() -> Self {
        Self {
            available: true,
            latency: Self::DEFAULT_LATENCY,
            outcome: Ok(()),
        }
    }

    /// A sensor that is present but answers every check with `error`.
    pub fn failing(error: BiometricError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::new()
        }
    }

    /// A device without a biometric sensor.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            latency: Duration::ZERO,
            outcome: Err(BiometricError::NotAvailable("no sensor".into())),
        }
    }
}

impl Default for SimulatedBiometric {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BiometricAuthenticator for SimulatedBiometric {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn authenticate(&self) -> Result<(), BiometricError> {
        if self.available {
            debug!("Simulating biometric check ({:?})", self.latency);
            tokio::time::sleep(self.latency).await;
        }
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_sensor_succeeds_after_latency() {
        let sensor = SimulatedBiometric::new();
        assert!(sensor.is_available());

        let start = tokio::time::Instant::now();
        sensor.authenticate().await.unwrap();
        assert!(start.elapsed() >= SimulatedBiometric::DEFAULT_LATENCY);
    }

    #[tokio::test]
    async fn test_unavailable_sensor() {
        let sensor = SimulatedBiometric::unavailable();
        assert!(!sensor.is_available());
        assert!(matches!(
            sensor.authenticate().await,
            Err(BiometricError::NotAvailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_sensor_reports_its_error() {
        let sensor = SimulatedBiometric::failing(BiometricError::NoBiometricsEnrolled);
        assert!(sensor.is_available());
        assert_eq!(
            sensor.authenticate().await,
            Err(BiometricError::NoBiometricsEnrolled)
        );
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&BiometricError::UserCancelled).unwrap();
        assert_eq!(json, r#"{"type":"UserCancelled"}"#);
    }
}
