//! Account Aggregate
//!
//! Account holds a customer's balance. Only the ledger engine calls
//! `deposit` / `withdraw`; everything else treats the balance as read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credential::CredentialHash;
use crate::domain::{
    AccountNumber, AccountType, Amount, Balance, CustomerId, DomainError, InstrumentRef,
    InstrumentStatus,
};

use super::Instrument;

/// Account Aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account number
    number: AccountNumber,

    /// Owner customer
    customer_id: CustomerId,

    account_type: AccountType,

    /// Current balance, never negative
    balance: Balance,

    /// PIN digest
    pin: CredentialHash,

    status: InstrumentStatus,

    created_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with a zero balance
    pub fn open(
        number: AccountNumber,
        customer_id: CustomerId,
        account_type: AccountType,
        pin: CredentialHash,
    ) -> Self {
        Self {
            number,
            customer_id,
            account_type,
            balance: Balance::zero(),
            pin,
            status: InstrumentStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Remove `amount` from the balance.
    ///
    /// Fails without touching the balance when funds are insufficient.
    pub fn withdraw(&mut self, amount: &Amount) -> Result<(), DomainError> {
        if !self.balance.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_balance(
                amount.value(),
                self.balance.value(),
            ));
        }
        self.balance = self.balance.debit(amount)?;
        Ok(())
    }

    /// Add `amount` to the balance
    pub fn deposit(&mut self, amount: &Amount) -> Result<(), DomainError> {
        self.balance = self.balance.credit(amount)?;
        Ok(())
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn number(&self) -> AccountNumber {
        self.number
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Instrument for Account {
    fn instrument_ref(&self) -> InstrumentRef {
        InstrumentRef::Account(self.number)
    }

    fn credential(&self) -> &CredentialHash {
        &self.pin
    }

    fn set_credential(&mut self, credential: CredentialHash) {
        self.pin = credential;
    }

    fn status(&self) -> InstrumentStatus {
        self.status
    }

    fn set_status(&mut self, status: InstrumentStatus) {
        self.status = status;
    }
}
