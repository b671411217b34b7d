//! Command definitions
//!
//! Commands represent intentions to move money. Amounts and PINs arrive
//! as strings and are validated before any record is touched.

use serde::{Deserialize, Serialize};

use crate::domain::{AccountNumber, CardNumber, InstrumentRef, TransactionKind};

// =========================================================================
// TransferDirection
// =========================================================================

/// The four supported transfer directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum TransferDirection {
    /// Spend from a debit card's linked account into another account
    DebitCardToAccount {
        card: CardNumber,
        account: AccountNumber,
    },
    /// Draw on a credit line into an account
    CreditCardToAccount {
        card: CardNumber,
        account: AccountNumber,
    },
    /// Repay a credit card from an account
    AccountToCreditCard {
        account: AccountNumber,
        card: CardNumber,
    },
    AccountToAccount {
        from: AccountNumber,
        to: AccountNumber,
    },
}

impl TransferDirection {
    /// Instrument whose credential authorizes the transfer
    pub fn source(&self) -> InstrumentRef {
        match *self {
            TransferDirection::DebitCardToAccount { card, .. } => InstrumentRef::DebitCard(card),
            TransferDirection::CreditCardToAccount { card, .. } => InstrumentRef::CreditCard(card),
            TransferDirection::AccountToCreditCard { account, .. } => {
                InstrumentRef::Account(account)
            }
            TransferDirection::AccountToAccount { from, .. } => InstrumentRef::Account(from),
        }
    }

    /// Instrument receiving the funds
    pub fn target(&self) -> InstrumentRef {
        match *self {
            TransferDirection::DebitCardToAccount { account, .. }
            | TransferDirection::CreditCardToAccount { account, .. } => {
                InstrumentRef::Account(account)
            }
            TransferDirection::AccountToCreditCard { card, .. } => InstrumentRef::CreditCard(card),
            TransferDirection::AccountToAccount { to, .. } => InstrumentRef::Account(to),
        }
    }

    /// Transaction tag recorded for this direction
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransferDirection::DebitCardToAccount { .. } => TransactionKind::DebitCardTransfer,
            TransferDirection::CreditCardToAccount { .. } => TransactionKind::CreditCardTransfer,
            TransferDirection::AccountToCreditCard { .. } => TransactionKind::CreditCardRepayment,
            TransferDirection::AccountToAccount { .. } => TransactionKind::FundTransfer,
        }
    }
}

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move money between two instruments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    #[serde(flatten)]
    pub direction: TransferDirection,
    /// Amount to transfer (as string for precise decimal)
    pub amount: String,
    /// PIN of the source instrument
    pub pin: String,
}

impl TransferCommand {
    pub fn new(direction: TransferDirection, amount: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            direction,
            amount: amount.into(),
            pin: pin.into(),
        }
    }
}

// =========================================================================
// DepositCommand / WithdrawCommand
// =========================================================================

/// Command to credit an account from outside the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCommand {
    pub account: AccountNumber,
    pub amount: String,
}

impl DepositCommand {
    pub fn new(account: AccountNumber, amount: impl Into<String>) -> Self {
        Self {
            account,
            amount: amount.into(),
        }
    }
}

/// Command to take money out of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub account: AccountNumber,
    pub amount: String,
    pub pin: String,
}

impl WithdrawCommand {
    pub fn new(account: AccountNumber, amount: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            account,
            amount: amount.into(),
            pin: pin.into(),
        }
    }
}
