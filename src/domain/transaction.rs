//! Transaction log records
//!
//! A transaction is an immutable fact: it is staged as a [`NewTransaction`]
//! inside a unit of work and receives its id only when the store commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Amount, InstrumentRef};

/// Monotonic transaction id, assigned at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    /// Money added to an account from outside the ledger
    Credit,
    /// Money withdrawn from an account
    Debit,
    /// Account to account
    FundTransfer,
    /// Debit card (funded by its linked account) to account
    DebitCardTransfer,
    /// Credit card line to account
    CreditCardTransfer,
    /// Account to credit card, restoring available limit
    CreditCardRepayment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "CREDIT",
            TransactionKind::Debit => "DEBIT",
            TransactionKind::FundTransfer => "FUND_TRANSFER",
            TransactionKind::DebitCardTransfer => "DEBIT_CARD_TRANSFER",
            TransactionKind::CreditCardTransfer => "CREDIT_CARD_TRANSFER",
            TransactionKind::CreditCardRepayment => "CREDIT_CARD_REPAYMENT",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed, immutable transaction log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    amount: Amount,
    kind: TransactionKind,
    /// The originating instrument (exactly one)
    source: InstrumentRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    counterparty: Option<InstrumentRef>,
    created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn amount(&self) -> &Amount {
        &self.amount
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn source(&self) -> InstrumentRef {
        self.source
    }

    pub fn counterparty(&self) -> Option<InstrumentRef> {
        self.counterparty
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// True if the instrument originated or received this movement
    pub fn involves(&self, instrument: InstrumentRef) -> bool {
        self.source == instrument || self.counterparty == Some(instrument)
    }
}

/// A transaction staged in a unit of work, not yet numbered.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub amount: Amount,
    pub kind: TransactionKind,
    pub source: InstrumentRef,
    pub counterparty: Option<InstrumentRef>,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn new(
        amount: Amount,
        kind: TransactionKind,
        source: InstrumentRef,
        counterparty: Option<InstrumentRef>,
    ) -> Self {
        Self {
            amount,
            kind,
            source,
            counterparty,
            created_at: Utc::now(),
        }
    }

    /// Number the staged row. Only the store calls this, at commit.
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            amount: self.amount,
            kind: self.kind,
            source: self.source,
            counterparty: self.counterparty,
            created_at: self.created_at,
        }
    }
}
