//! Three-step PIN change: current PIN, new PIN, confirmation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::error::{LockError, LockResult};
use super::pin::{is_valid_pin, pin_matches};
use crate::storage::keys::APP_PIN;
use crate::storage::CredentialStore;

/// What the flow is waiting for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinChangeStep {
    #[default]
    Old,
    New,
    Confirm,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinChangeProgress {
    NeedNew,
    NeedConfirm,
    /// The new PIN was written; the flow is back at [`PinChangeStep::Old`].
    Changed,
}

/// Change the stored PIN from an unlocked session.
///
/// A wrong current PIN does not count toward the guard's lockout. The
/// recovery PIN, when enabled, is accepted as the current PIN.
pub struct PinChange {
    store: Arc<dyn CredentialStore>,
    recovery_pin: Option<String>,
    step: PinChangeStep,
    new_pin: Zeroizing<String>,
}

impl PinChange {
    pub fn new(store: Arc<dyn CredentialStore>, recovery_pin: Option<String>) -> Self {
        Self {
            store,
            recovery_pin,
            step: PinChangeStep::Old,
            new_pin: Zeroizing::new(String::new()),
        }
    }

    pub fn step(&self) -> PinChangeStep {
        self.step
    }

    /// Abandon the flow and forget the pending new PIN.
    pub fn cancel(&mut self) {
        self.new_pin = Zeroizing::new(String::new());
        self.step = PinChangeStep::Old;
    }

    /// Feed the input for the current step.
    ///
    /// # Errors
    /// - [`LockError::IncorrectPin`] at the old step; the flow stays there.
    /// - [`LockError::InvalidPinFormat`] at the new step; the flow stays there.
    /// - [`LockError::PinMismatch`] at the confirm step; the flow stays there
    ///   and the store is untouched.
    pub async fn submit(&mut self, input: &str) -> LockResult<PinChangeProgress> {
        match self.step {
            PinChangeStep::Old => {
                let stored = self.store.get(APP_PIN).await;
                if !pin_matches(input, stored.as_deref(), self.recovery_pin.as_deref()) {
                    warn!("PIN change: current PIN rejected");
                    return Err(LockError::IncorrectPin);
                }
                self.step = PinChangeStep::New;
                Ok(PinChangeProgress::NeedNew)
            }
            PinChangeStep::New => {
                if !is_valid_pin(input) {
                    return Err(LockError::InvalidPinFormat);
                }
                self.new_pin = Zeroizing::new(input.to_string());
                self.step = PinChangeStep::Confirm;
                Ok(PinChangeProgress::NeedConfirm)
            }
            PinChangeStep::Confirm => {
                if input != self.new_pin.as_str() {
                    return Err(LockError::PinMismatch);
                }
                self.store.set(APP_PIN, &self.new_pin).await;
                self.cancel();
                info!("Access PIN changed");
                Ok(PinChangeProgress::Changed)
            }
        }
    }
}

impl std::fmt::Debug for PinChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinChange")
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}
