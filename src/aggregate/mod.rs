//! Aggregate module
//!
//! Persisted records: customers and the three value-holding instruments.
//! Records reference each other by number only.

pub mod account;
pub mod card;
pub mod customer;

pub use account::Account;
pub use card::{CreditCard, DebitCard};
pub use customer::Customer;

use crate::credential::CredentialHash;
use crate::domain::{DomainError, InstrumentRef, InstrumentStatus};

/// Behaviour shared by every instrument: a credential, a status, and an
/// identity usable in transaction rows.
pub trait Instrument {
    /// Reference used in transaction rows and errors
    fn instrument_ref(&self) -> InstrumentRef;

    /// Stored credential (PIN digest)
    fn credential(&self) -> &CredentialHash;

    /// Replace the stored credential
    fn set_credential(&mut self, credential: CredentialHash);

    fn status(&self) -> InstrumentStatus;

    fn set_status(&mut self, status: InstrumentStatus);

    fn is_blocked(&self) -> bool {
        self.status() == InstrumentStatus::Blocked
    }

    /// ACTIVE -> BLOCKED
    fn block(&mut self) -> Result<(), DomainError> {
        if self.is_blocked() {
            return Err(DomainError::Validation(format!(
                "{} is already blocked",
                self.instrument_ref()
            )));
        }
        self.set_status(InstrumentStatus::Blocked);
        Ok(())
    }

    /// BLOCKED -> ACTIVE
    fn unblock(&mut self) -> Result<(), DomainError> {
        if !self.is_blocked() {
            return Err(DomainError::Validation(format!(
                "{} is not blocked",
                self.instrument_ref()
            )));
        }
        self.set_status(InstrumentStatus::Active);
        Ok(())
    }
}
