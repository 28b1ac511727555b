//! First-run setup and full data reset.

use tracing::info;

use crate::lock::{is_valid_pin, LockError, LockResult};
use crate::storage::keys::{ALL_KEYS, APP_PIN, IS_CONFIGURED, USER_SALARY};
use crate::storage::CredentialStore;

/// Record the monthly salary and the access PIN, and mark the app
/// configured.
///
/// # Errors
/// - [`LockError::InvalidSalary`] if `salary` is not a finite amount above 0.
/// - [`LockError::InvalidPinFormat`] if `pin` is not exactly 4 digits.
///
/// Nothing is written when validation fails.
pub async fn setup_account(store: &dyn CredentialStore, salary: f64, pin: &str) -> LockResult<()> {
    if !salary.is_finite() || salary <= 0.0 {
        return Err(LockError::InvalidSalary);
    }
    if !is_valid_pin(pin) {
        return Err(LockError::InvalidPinFormat);
    }

    store.set(USER_SALARY, &salary.to_string()).await;
    store.set(APP_PIN, pin).await;
    store.set(IS_CONFIGURED, "true").await;

    info!("Account configured");
    Ok(())
}

/// Delete every persisted key, returning the app to its first-run state.
pub async fn reset_account(store: &dyn CredentialStore) {
    for key in ALL_KEYS {
        store.delete(key).await;
    }
    info!("All app data removed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keys::{AUTO_THEME, FAILED_ATTEMPTS, LOCKOUT_UNTIL, USER_THEME};
    use crate::storage::{load_preferences, MemoryBackend, SecureStore};

    #[tokio::test]
    async fn test_setup_writes_configuration() {
        let store = SecureStore::new(MemoryBackend::new());
        setup_account(&store, 5250.5, "4321").await.unwrap();

        assert_eq!(store.get(APP_PIN).await.as_deref(), Some("4321"));
        assert_eq!(store.get(IS_CONFIGURED).await.as_deref(), Some("true"));

        let prefs = load_preferences(&store).await;
        assert_eq!(prefs.salary, Some(5250.5));
        assert!(prefs.configured);
    }

    #[tokio::test]
    async fn test_setup_rejects_bad_salary() {
        let store = SecureStore::new(MemoryBackend::new());
        for salary in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                setup_account(&store, salary, "4321").await,
                Err(LockError::InvalidSalary)
            );
        }
        assert_eq!(store.get(APP_PIN).await, None);
        assert_eq!(store.get(IS_CONFIGURED).await, None);
    }

    #[tokio::test]
    async fn test_setup_rejects_bad_pin() {
        let store = SecureStore::new(MemoryBackend::new());
        assert_eq!(
            setup_account(&store, 3000.0, "12a4").await,
            Err(LockError::InvalidPinFormat)
        );
        assert_eq!(store.get(USER_SALARY).await, None);
    }

    #[tokio::test]
    async fn test_reset_removes_every_key() {
        let store = SecureStore::new(MemoryBackend::new());
        setup_account(&store, 3000.0, "4321").await.unwrap();
        store.set(USER_THEME, "emerald").await;
        store.set(AUTO_THEME, "true").await;
        store.set(FAILED_ATTEMPTS, "2").await;
        store.set(LOCKOUT_UNTIL, "1700000030000").await;

        reset_account(&store).await;

        for key in ALL_KEYS {
            assert_eq!(store.get(key).await, None, "{} survived reset", key);
        }
        assert!(!load_preferences(&store).await.configured);
    }
}
