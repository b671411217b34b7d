//! Authentication Guard
//!
//! Gatekeeper in front of every debit and every credential-protected
//! provisioning operation.

use crate::aggregate::Instrument;
use crate::domain::DomainError;

use super::Pin;

/// Stateless credential and status checks
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationGuard;

impl AuthenticationGuard {
    /// Compare a supplied PIN against the instrument's stored credential
    pub fn verify<I: Instrument + ?Sized>(instrument: &I, pin: &Pin) -> bool {
        instrument.credential().matches(pin.as_str())
    }

    /// Authorize a debit against `instrument`.
    ///
    /// Blocked instruments fail before the PIN is looked at, so a blocked
    /// card never leaks whether a guessed PIN was right.
    pub fn authorize_debit<I: Instrument + ?Sized>(
        instrument: &I,
        pin: &Pin,
    ) -> Result<(), DomainError> {
        let instrument_ref = instrument.instrument_ref();

        if instrument.is_blocked() {
            tracing::warn!(instrument = %instrument_ref, "Debit rejected: instrument is blocked");
            return Err(DomainError::Blocked {
                instrument: instrument_ref,
            });
        }
        Self::authenticate(instrument, pin)
    }

    /// Check the PIN only, regardless of status
    pub fn authenticate<I: Instrument + ?Sized>(
        instrument: &I,
        pin: &Pin,
    ) -> Result<(), DomainError> {
        if !Self::verify(instrument, pin) {
            let instrument_ref = instrument.instrument_ref();
            tracing::warn!(instrument = %instrument_ref, "Credential mismatch");
            return Err(DomainError::CredentialMismatch {
                instrument: instrument_ref,
            });
        }
        Ok(())
    }
}
