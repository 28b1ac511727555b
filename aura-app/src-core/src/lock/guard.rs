//! The access guard state machine.
//!
//! ```text
//!             choose PIN / sensor absent / check fails
//!   Biometric ─────────────────────────────────────────▶ PinEntry
//!       │    ◀─────────────────────────────────────────    │  │
//!       │               choose biometric                   │  │ wrong PIN × MAX_ATTEMPTS
//!       │ check ok                              PIN ok     │  ▼
//!       └──────────────▶ Unlocked ◀────────────────────────┘ Locked
//!                                                             │ tick past lockout_until
//!   Biometric ◀───────────────────────────────────────────────┘
//! ```
//!
//! The guard owns its in-memory attempt counter and lockout window and
//! mirrors both into the [`CredentialStore`] on every change. Store failures
//! are swallowed by the store; the in-memory values stay authoritative for
//! the session.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::auth::{AuthMode, GuardState};
use super::biometric::BiometricAuthenticator;
use super::clock::Clock;
use super::config::GuardConfig;
use super::pin::{is_valid_pin, pin_matches, PinBuffer};
use super::ticker::LockoutTicker;
use crate::storage::keys::{APP_PIN, FAILED_ATTEMPTS, LOCKOUT_UNTIL};
use crate::storage::CredentialStore;

/// Notifications for the host. `Unlocked` is sent exactly once per unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GuardEvent {
    Unlocked { method: AuthMode },
    ModeChanged { mode: AuthMode },
    AttemptFailed { attempts: u32, max_attempts: u32 },
    LockedOut { until_ms: i64 },
    Countdown { seconds_left: u64 },
    LockoutExpired,
}

/// Result of feeding one input to the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Input not applicable in the current state; nothing changed.
    Ignored,
    /// A digit was added; more are needed.
    DigitAccepted { entered: usize },
    /// A digit was removed.
    DigitRemoved { entered: usize },
    /// The credential was accepted.
    Unlocked,
    /// Wrong PIN; `remaining` submissions left before lockout.
    Rejected { attempts: u32, remaining: u32 },
    /// The guard switched mode without unlocking (user choice, missing
    /// sensor, or a failed biometric check).
    ModeChanged(AuthMode),
    /// Too many failures; input is refused until `until_ms`.
    LockedOut { until_ms: i64, seconds_left: u64 },
    /// Still locked out.
    Countdown { seconds_left: u64 },
    /// The lockout ended; the guard is back in biometric mode.
    LockoutExpired,
}

/// Capacity of the host event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Sets a flag for as long as it lives; clears it on drop, including when
/// the owning future is cancelled mid-await.
struct Pending<'a>(&'a mut bool);

impl<'a> Pending<'a> {
    fn raise(flag: &'a mut bool) -> Self {
        *flag = true;
        Self(flag)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Visual rejection in progress. Dropping it ends the shake and clears the
/// entered digits.
struct Shake<'a> {
    shaking: &'a mut bool,
    pin: &'a mut PinBuffer,
}

impl<'a> Shake<'a> {
    fn start(shaking: &'a mut bool, pin: &'a mut PinBuffer) -> Self {
        *shaking = true;
        Self { shaking, pin }
    }
}

impl Drop for Shake<'_> {
    fn drop(&mut self) {
        *self.shaking = false;
        self.pin.clear();
    }
}

/// Seconds left until `until_ms`, rounded up.
fn seconds_until(until_ms: i64, now_ms: i64) -> u64 {
    let remaining = until_ms.saturating_sub(now_ms);
    if remaining <= 0 {
        0
    } else {
        (remaining as u64).div_ceil(1000)
    }
}

/// Gate in front of the protected content.
///
/// The lockout countdown is pulled, not pushed: the host awaits
/// [`next_tick`](Self::next_tick) (or [`wait_out_lockout`](Self::wait_out_lockout))
/// to receive countdown updates. Without that, the lockout still ends on the
/// first async input after `lockout_until`, or on an explicit
/// [`expire_lockout_if_due`](Self::expire_lockout_if_due). The synchronous
/// inputs ([`choose_pin`](Self::choose_pin), [`backspace`](Self::backspace))
/// never end a lockout.
///
/// All inputs take `&mut self`, so two credential checks can never be in
/// flight at once. A pending biometric check or shake delay is just an
/// awaited future: dropping it abandons the step without unlocking.
pub struct AccessGuard {
    store: Arc<dyn CredentialStore>,
    biometric: Arc<dyn BiometricAuthenticator>,
    clock: Arc<dyn Clock>,
    config: GuardConfig,
    events: broadcast::Sender<GuardEvent>,

    state: GuardState,
    attempts: u32,
    lockout_until: Option<i64>,
    time_left: u64,
    pin: PinBuffer,
    authenticating: bool,
    shaking: bool,
    ticker: Option<LockoutTicker>,
}

impl AccessGuard {
    /// Build a guard and rehydrate attempt and lockout state from `store`.
    ///
    /// Starts in [`GuardState::Locked`] when the store holds an unexpired
    /// lockout, otherwise in [`GuardState::Biometric`]. The host triggers the
    /// biometric check with [`authenticate_biometric`](Self::authenticate_biometric)
    /// whenever the guard is in biometric mode.
    pub async fn new(
        store: Arc<dyn CredentialStore>,
        biometric: Arc<dyn BiometricAuthenticator>,
        clock: Arc<dyn Clock>,
        config: GuardConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let mut guard = Self {
            store,
            biometric,
            clock,
            config,
            events,
            state: GuardState::Biometric,
            attempts: 0,
            lockout_until: None,
            time_left: 0,
            pin: PinBuffer::new(),
            authenticating: false,
            shaking: false,
            ticker: None,
        };
        guard.rehydrate().await;
        guard
    }

    /// Receive host notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GuardEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GuardState::Unlocked
    }

    /// A biometric check or PIN validation is pending.
    pub fn is_authenticating(&self) -> bool {
        self.authenticating
    }

    /// A rejected PIN is being shown before it is cleared.
    pub fn is_shaking(&self) -> bool {
        self.shaking
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn lockout_until(&self) -> Option<i64> {
        self.lockout_until
    }

    /// Remaining lockout seconds as last computed (0 when not locked out).
    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    /// Digits currently entered.
    pub fn entered_digits(&self) -> usize {
        self.pin.len()
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Whether a countdown task is alive.
    pub fn has_ticker(&self) -> bool {
        self.ticker.as_ref().is_some_and(LockoutTicker::is_running)
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Run the biometric check. Only acts in biometric mode.
    ///
    /// Without a sensor the guard waits the fallback delay and switches to
    /// PIN entry. A failed check also switches to PIN entry and, unless
    /// [`GuardConfig::count_biometric_failures`] is set, does not count as a
    /// failed attempt.
    pub async fn authenticate_biometric(&mut self) -> GuardOutcome {
        self.expire_lockout_if_due().await;
        if self.state != GuardState::Biometric {
            return GuardOutcome::Ignored;
        }

        if !self.biometric.is_available() {
            debug!("No biometric capability, falling back to PIN");
            tokio::time::sleep(self.config.fallback_delay).await;
            return self.switch_mode(AuthMode::Pin);
        }

        let biometric = Arc::clone(&self.biometric);
        let result = {
            let _pending = Pending::raise(&mut self.authenticating);
            biometric.authenticate().await
        };

        match result {
            Ok(()) => self.complete_unlock(AuthMode::Biometric).await,
            Err(e) => {
                warn!("Biometric check failed: {}", e);
                let outcome = self.switch_mode(AuthMode::Pin);
                if self.config.count_biometric_failures {
                    return self.register_failure().await;
                }
                outcome
            }
        }
    }

    /// User asks for the keypad.
    pub fn choose_pin(&mut self) -> GuardOutcome {
        if self.state != GuardState::Biometric {
            return GuardOutcome::Ignored;
        }
        self.switch_mode(AuthMode::Pin)
    }

    /// User asks for the sensor. Entering biometric mode triggers the check.
    pub async fn choose_biometric(&mut self) -> GuardOutcome {
        self.expire_lockout_if_due().await;
        if self.state != GuardState::PinEntry {
            return GuardOutcome::Ignored;
        }
        self.switch_mode(AuthMode::Biometric);
        self.authenticate_biometric().await
    }

    /// Enter one keypad digit. The fourth digit submits the PIN.
    pub async fn press_digit(&mut self, digit: char) -> GuardOutcome {
        self.expire_lockout_if_due().await;
        if self.state != GuardState::PinEntry || !self.pin.push(digit) {
            return GuardOutcome::Ignored;
        }
        if !self.pin.is_full() {
            return GuardOutcome::DigitAccepted {
                entered: self.pin.len(),
            };
        }
        self.evaluate_pin().await
    }

    /// Remove the last entered digit.
    pub fn backspace(&mut self) -> GuardOutcome {
        if self.state != GuardState::PinEntry || self.pin.is_empty() {
            return GuardOutcome::Ignored;
        }
        self.pin.pop();
        GuardOutcome::DigitRemoved {
            entered: self.pin.len(),
        }
    }

    /// Submit a whole PIN at once.
    ///
    /// Anything that is not exactly [`PIN_LENGTH`](super::PIN_LENGTH) ASCII
    /// digits is [`Ignored`](GuardOutcome::Ignored) without touching the
    /// buffer or the attempt counter. Digits already on the keypad are
    /// discarded first.
    pub async fn enter_pin(&mut self, pin: &str) -> GuardOutcome {
        self.expire_lockout_if_due().await;
        if self.state != GuardState::PinEntry || !is_valid_pin(pin) {
            return GuardOutcome::Ignored;
        }
        self.pin.clear();

        let mut outcome = GuardOutcome::Ignored;
        for digit in pin.chars() {
            outcome = self.press_digit(digit).await;
            if !matches!(outcome, GuardOutcome::DigitAccepted { .. }) {
                break;
            }
        }
        outcome
    }

    // =========================================================================
    // Lockout countdown
    // =========================================================================

    /// Process one countdown tick.
    ///
    /// Updates [`time_left`](Self::time_left) while the lockout lasts; once
    /// the clock passes `lockout_until` the attempt counter is reset, both
    /// lockout keys are deleted and the guard returns to biometric mode.
    pub async fn tick(&mut self) -> GuardOutcome {
        let Some(until) = self.lockout_until else {
            return GuardOutcome::Ignored;
        };
        if self.state != GuardState::Locked {
            return GuardOutcome::Ignored;
        }

        let now = self.clock.now_ms();
        self.time_left = seconds_until(until, now);

        if now < until {
            debug!("Lockout: {}s left", self.time_left);
            self.emit(GuardEvent::Countdown {
                seconds_left: self.time_left,
            });
            return GuardOutcome::Countdown {
                seconds_left: self.time_left,
            };
        }

        self.clear_lockout().await;
        self.state = GuardState::Biometric;
        info!("Lockout expired");
        self.emit(GuardEvent::LockoutExpired);
        GuardOutcome::LockoutExpired
    }

    /// End the lockout now if the clock has already passed `lockout_until`.
    ///
    /// Returns [`GuardOutcome::LockoutExpired`] when it did, otherwise
    /// [`GuardOutcome::Ignored`]. The async inputs call this first, so a
    /// host that stopped pumping ticks still sees the lockout end on the
    /// next credential input.
    pub async fn expire_lockout_if_due(&mut self) -> GuardOutcome {
        let due = self.state == GuardState::Locked
            && self
                .lockout_until
                .is_some_and(|until| self.clock.now_ms() >= until);
        if !due {
            return GuardOutcome::Ignored;
        }
        self.tick().await
    }

    /// Wait for the next countdown tick and process it.
    ///
    /// Returns `None` when no countdown is running.
    pub async fn next_tick(&mut self) -> Option<GuardOutcome> {
        self.ticker.as_mut()?.next().await?;
        Some(self.tick().await)
    }

    /// Drive the countdown until the lockout ends.
    pub async fn wait_out_lockout(&mut self) -> GuardOutcome {
        let mut last = GuardOutcome::Ignored;
        while self.state == GuardState::Locked {
            match self.next_tick().await {
                Some(outcome) => last = outcome,
                None => break,
            }
        }
        last
    }

    // =========================================================================
    // Host entry points
    // =========================================================================

    /// Re-lock, e.g. when the app goes to background.
    ///
    /// Discards any entered digits and rehydrates from the store, so an
    /// active lockout is honoured.
    pub async fn relock(&mut self) {
        info!("Re-locking access guard");
        self.rehydrate().await;
    }

    /// Open the gate without a credential check. Used right after first-run
    /// setup, where the user has just chosen the PIN. Sends no event.
    pub(crate) fn admit(&mut self) {
        self.ticker = None;
        self.pin.clear();
        self.state = GuardState::Unlocked;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn rehydrate(&mut self) {
        self.ticker = None;
        self.pin.clear();
        self.authenticating = false;
        self.shaking = false;
        self.time_left = 0;
        self.lockout_until = None;

        self.attempts = self
            .store
            .get(FAILED_ATTEMPTS)
            .await
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(0)
            .min(self.config.max_attempts);

        let stored_until = self
            .store
            .get(LOCKOUT_UNTIL)
            .await
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        let now = self.clock.now_ms();
        match stored_until {
            Some(until) if until > now => {
                info!("Lockout still active ({}s left)", seconds_until(until, now));
                self.enter_locked(until, now);
            }
            Some(_) => {
                debug!("Stored lockout already expired, clearing");
                self.clear_lockout().await;
                self.state = GuardState::Biometric;
            }
            None => self.state = GuardState::Biometric,
        }
    }

    async fn evaluate_pin(&mut self) -> GuardOutcome {
        let matched = {
            let _pending = Pending::raise(&mut self.authenticating);
            let stored = self.store.get(APP_PIN).await;
            pin_matches(
                self.pin.as_str(),
                stored.as_deref(),
                self.config.recovery_pin.as_deref(),
            )
        };

        if matched {
            self.pin.clear();
            tokio::time::sleep(self.config.reveal_delay).await;
            return self.complete_unlock(AuthMode::Pin).await;
        }

        let outcome = self.register_failure().await;
        {
            let _shake = Shake::start(&mut self.shaking, &mut self.pin);
            tokio::time::sleep(self.config.shake_delay).await;
        }
        outcome
    }

    async fn register_failure(&mut self) -> GuardOutcome {
        let max = self.config.max_attempts;
        self.attempts = (self.attempts + 1).min(max);
        self.store
            .set(FAILED_ATTEMPTS, &self.attempts.to_string())
            .await;

        warn!("Failed attempt {} of {}", self.attempts, max);
        self.emit(GuardEvent::AttemptFailed {
            attempts: self.attempts,
            max_attempts: max,
        });

        if self.attempts < max {
            return GuardOutcome::Rejected {
                attempts: self.attempts,
                remaining: max - self.attempts,
            };
        }

        let now = self.clock.now_ms();
        let until = now.saturating_add(self.config.lockout_millis());
        self.enter_locked(until, now);
        self.store.set(LOCKOUT_UNTIL, &until.to_string()).await;

        info!("Too many attempts, locked out for {}s", self.time_left);
        self.emit(GuardEvent::LockedOut { until_ms: until });
        GuardOutcome::LockedOut {
            until_ms: until,
            seconds_left: self.time_left,
        }
    }

    fn enter_locked(&mut self, until: i64, now: i64) {
        self.state = GuardState::Locked;
        self.lockout_until = Some(until);
        self.time_left = seconds_until(until, now);
        self.ticker = Some(LockoutTicker::start(self.config.tick_interval));
    }

    async fn clear_lockout(&mut self) {
        self.ticker = None;
        self.lockout_until = None;
        self.time_left = 0;
        self.attempts = 0;
        self.store.delete(FAILED_ATTEMPTS).await;
        self.store.delete(LOCKOUT_UNTIL).await;
    }

    async fn complete_unlock(&mut self, method: AuthMode) -> GuardOutcome {
        self.store.delete(FAILED_ATTEMPTS).await;
        self.attempts = 0;
        self.ticker = None;
        self.state = GuardState::Unlocked;

        info!("Unlocked via {}", method);
        self.emit(GuardEvent::Unlocked { method });
        GuardOutcome::Unlocked
    }

    fn switch_mode(&mut self, mode: AuthMode) -> GuardOutcome {
        self.pin.clear();
        self.state = match mode {
            AuthMode::Biometric => GuardState::Biometric,
            AuthMode::Pin => GuardState::PinEntry,
        };
        debug!("Switched to {} mode", mode);
        self.emit(GuardEvent::ModeChanged { mode });
        GuardOutcome::ModeChanged(mode)
    }

    fn emit(&self, event: GuardEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard")
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("lockout_until", &self.lockout_until)
            .field("time_left", &self.time_left)
            .field("pin", &self.pin)
            .field("authenticating", &self.authenticating)
            .finish()
    }
}
