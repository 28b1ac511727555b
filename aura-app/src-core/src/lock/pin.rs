//! PIN entry buffer and comparison.

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::config::PIN_LENGTH;

/// Digits typed so far on the keypad, at most [`PIN_LENGTH`].
///
/// The buffer is wiped when cleared and when dropped.
#[derive(Default, Clone, Zeroize, ZeroizeOnDrop)]
pub struct PinBuffer {
    digits: String,
}

impl PinBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a digit. Returns `false` (and changes nothing) for non-digits
    /// or when the buffer is already full.
    pub fn push(&mut self, digit: char) -> bool {
        if !digit.is_ascii_digit() || self.is_full() {
            return false;
        }
        self.digits.push(digit);
        true
    }

    /// Remove the last digit, if any.
    pub fn pop(&mut self) {
        self.digits.pop();
    }

    pub fn clear(&mut self) {
        self.digits.zeroize();
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.digits.len() >= PIN_LENGTH
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }
}

impl std::fmt::Debug for PinBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the digits
        f.debug_struct("PinBuffer")
            .field("len", &self.digits.len())
            .finish()
    }
}

/// Whether `pin` has the shape of an access PIN (exactly 4 ASCII digits).
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

fn ct_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

/// Whether `entered` matches the stored PIN or the recovery PIN.
///
/// A missing stored PIN matches nothing; only the recovery PIN (when
/// enabled) can succeed then.
pub fn pin_matches(entered: &str, stored: Option<&str>, recovery: Option<&str>) -> bool {
    let stored_ok = stored.is_some_and(|s| ct_eq(entered, s));
    let recovery_ok = recovery.is_some_and(|r| ct_eq(entered, r));
    stored_ok | recovery_ok
}
