use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::account::{reset_account, setup_account};
use crate::error::Result;
use crate::lock::{
    AccessGuard, BiometricAuthenticator, Clock, GuardConfig, GuardOutcome, GuardState, LockError,
    LockStatus, PinChange, SystemClock,
};
use crate::storage::{load_preferences, CredentialStore, FileBackend, Preferences, SecureStore, Theme};

/// Point-in-time view of the session for a UI bridge.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: LockStatus,
    pub guard_state: GuardState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub lockout_until: Option<i64>,
    pub time_left: u64,
    pub theme: Theme,
    pub auto_theme: bool,
    pub salary: Option<f64>,
}

/// Host-side session: owns the store, the access guard and the preferences,
/// and derives the lock status from them.
///
/// Protected content may be shown only while [`status`](Self::status) is
/// [`LockStatus::Unlocked`].
pub struct AppSession {
    store: Arc<dyn CredentialStore>,
    guard: AccessGuard,
    preferences: Preferences,
}

impl AppSession {
    pub async fn open(
        store: Arc<dyn CredentialStore>,
        biometric: Arc<dyn BiometricAuthenticator>,
        clock: Arc<dyn Clock>,
        config: GuardConfig,
    ) -> Self {
        let preferences = load_preferences(store.as_ref()).await;
        let guard = AccessGuard::new(store.clone(), biometric, clock, config).await;
        debug!(
            "Session opened (configured: {}, guard: {})",
            preferences.configured,
            guard.state()
        );
        Self {
            store,
            guard,
            preferences,
        }
    }

    /// Open a session backed by the store file in `data_dir`, on the wall
    /// clock.
    pub async fn open_in(
        data_dir: impl AsRef<Path>,
        biometric: Arc<dyn BiometricAuthenticator>,
        config: GuardConfig,
    ) -> Result<Self> {
        let backend = FileBackend::open(data_dir)?;
        let store: Arc<dyn CredentialStore> = Arc::new(SecureStore::new(backend));
        Ok(Self::open(store, biometric, Arc::new(SystemClock), config).await)
    }

    pub fn status(&self) -> LockStatus {
        if !self.preferences.configured {
            LockStatus::NotSetup
        } else if self.guard.is_unlocked() {
            LockStatus::Unlocked
        } else {
            LockStatus::Locked
        }
    }

    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut AccessGuard {
        &mut self.guard
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn snapshot(&self, system_prefers_dark: bool) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            guard_state: self.guard.state(),
            attempts: self.guard.attempts(),
            max_attempts: self.guard.config().max_attempts,
            lockout_until: self.guard.lockout_until(),
            time_left: self.guard.time_left(),
            theme: self.preferences.effective_theme(system_prefers_dark),
            auto_theme: self.preferences.auto_theme,
            salary: self.preferences.salary,
        }
    }

    /// Wait for the next lockout countdown tick and apply it. `None` when
    /// the guard is not counting down.
    ///
    /// Hosts that show the countdown pump this while the guard is locked
    /// out; see [`AccessGuard`] for what happens when nobody does.
    pub async fn next_tick(&mut self) -> Option<GuardOutcome> {
        self.guard.next_tick().await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// First-run setup. On success the session is unlocked.
    pub async fn setup(&mut self, salary: f64, pin: &str) -> Result<()> {
        if self.preferences.configured {
            return Err(LockError::AlreadySetup.into());
        }
        setup_account(self.store.as_ref(), salary, pin).await?;
        self.preferences = load_preferences(self.store.as_ref()).await;
        self.guard.admit();
        Ok(())
    }

    /// The host went to background (`hidden`) or came back.
    ///
    /// Going to background while unlocked locks the session.
    pub async fn on_visibility_change(&mut self, hidden: bool) {
        if hidden && self.status() == LockStatus::Unlocked {
            debug!("App hidden, locking");
            self.guard.relock().await;
        }
    }

    /// Lock on demand. No-op unless unlocked.
    pub async fn lock(&mut self) {
        if self.status() == LockStatus::Unlocked {
            self.guard.relock().await;
        }
    }

    fn require_unlocked(&self) -> Result<()> {
        match self.status() {
            LockStatus::Unlocked => Ok(()),
            LockStatus::NotSetup => Err(LockError::NotSetup.into()),
            LockStatus::Locked => Err(LockError::Locked.into()),
        }
    }

    /// Start a PIN change. Requires an unlocked session.
    pub fn begin_pin_change(&self) -> Result<PinChange> {
        self.require_unlocked()?;
        Ok(PinChange::new(
            self.store.clone(),
            self.guard.config().recovery_pin.clone(),
        ))
    }

    /// Erase all app data. Requires an unlocked session; afterwards the
    /// session is back at [`LockStatus::NotSetup`].
    pub async fn reset(&mut self) -> Result<()> {
        self.require_unlocked()?;
        reset_account(self.store.as_ref()).await;
        self.preferences = load_preferences(self.store.as_ref()).await;
        self.guard.relock().await;
        info!("Session reset to first run");
        Ok(())
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    pub async fn toggle_theme(&mut self) -> Theme {
        self.preferences.toggle_theme(self.store.as_ref()).await
    }

    pub async fn set_auto_theme(&mut self, enabled: bool) {
        self.preferences
            .set_auto_theme(self.store.as_ref(), enabled)
            .await;
    }
}
