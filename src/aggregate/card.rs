//! Card Aggregates
//!
//! Debit cards spend from their linked account; credit cards spend from
//! their own credit line (`available_limit <= card_limit`).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::credential::CredentialHash;
use crate::domain::{
    AccountNumber, Amount, Balance, CardNumber, DomainError, InstrumentRef, InstrumentStatus,
};

use super::Instrument;

/// Debit card linked to exactly one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebitCard {
    number: CardNumber,
    account_number: AccountNumber,
    holder_name: String,
    pin: CredentialHash,
    cvv: CredentialHash,
    status: InstrumentStatus,
    expires_on: NaiveDate,
    issued_at: DateTime<Utc>,
}

impl DebitCard {
    /// Issue an active card
    pub fn issue(
        number: CardNumber,
        account_number: AccountNumber,
        holder_name: String,
        pin: CredentialHash,
        cvv: CredentialHash,
        expires_on: NaiveDate,
    ) -> Self {
        Self {
            number,
            account_number,
            holder_name,
            pin,
            cvv,
            status: InstrumentStatus::Active,
            expires_on,
            issued_at: Utc::now(),
        }
    }

    pub fn number(&self) -> CardNumber {
        self.number
    }

    /// The account this card spends from
    pub fn account_number(&self) -> AccountNumber {
        self.account_number
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn cvv(&self) -> &CredentialHash {
        &self.cvv
    }

    pub fn expires_on(&self) -> NaiveDate {
        self.expires_on
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }
}

impl Instrument for DebitCard {
    fn instrument_ref(&self) -> InstrumentRef {
        InstrumentRef::DebitCard(self.number)
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

/// Credit card with its own credit line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCard {
    number: CardNumber,
    account_number: AccountNumber,
    holder_name: String,
    pin: CredentialHash,
    cvv: CredentialHash,
    status: InstrumentStatus,
    expires_on: NaiveDate,
    issued_at: DateTime<Utc>,
    card_limit: Amount,
    /// Unspent part of the credit line, 0 <= available_limit <= card_limit
    available_limit: Balance,
}

impl CreditCard {
    /// Issue an active card with the whole limit available
    pub fn issue(
        number: CardNumber,
        account_number: AccountNumber,
        holder_name: String,
        pin: CredentialHash,
        cvv: CredentialHash,
        expires_on: NaiveDate,
        card_limit: Amount,
    ) -> Self {
        Self {
            number,
            account_number,
            holder_name,
            pin,
            cvv,
            status: InstrumentStatus::Active,
            expires_on,
            issued_at: Utc::now(),
            card_limit,
            available_limit: Balance::from(card_limit),
        }
    }

    /// Spend `amount` from the credit line
    pub fn charge(&mut self, amount: &Amount) -> Result<(), DomainError> {
        if !self.available_limit.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_limit(
                amount.value(),
                self.available_limit.value(),
            ));
        }
        self.available_limit = self.available_limit.debit(amount)?;
        Ok(())
    }

    /// Pay back `amount` of the used credit line.
    ///
    /// A repayment larger than the outstanding amount is rejected so that
    /// `available_limit` never exceeds `card_limit`.
    pub fn repay(&mut self, amount: &Amount) -> Result<(), DomainError> {
        let outstanding = self.outstanding();
        if amount.value() > outstanding {
            return Err(DomainError::RepaymentExceedsOutstanding {
                requested: amount.value(),
                outstanding,
            });
        }
        self.available_limit = self.available_limit.credit(amount)?;
        Ok(())
    }

    /// Used part of the credit line
    pub fn outstanding(&self) -> Decimal {
        self.card_limit.value() - self.available_limit.value()
    }

    pub fn number(&self) -> CardNumber {
        self.number
    }

    pub fn account_number(&self) -> AccountNumber {
        self.account_number
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn cvv(&self) -> &CredentialHash {
        &self.cvv
    }

    pub fn expires_on(&self) -> NaiveDate {
        self.expires_on
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn card_limit(&self) -> &Amount {
        &self.card_limit
    }

    pub fn available_limit(&self) -> &Balance {
        &self.available_limit
    }
}

impl Instrument for CreditCard {
    fn instrument_ref(&self) -> InstrumentRef {
        InstrumentRef::CreditCard(self.number)
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
