//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use super::{AmountError, InstrumentRef};

/// What ran short on a debit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsSource {
    Balance,
    CreditLimit,
}

impl fmt::Display for FundsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundsSource::Balance => write!(f, "balance"),
            FundsSource::CreditLimit => write!(f, "available credit limit"),
        }
    }
}

/// Business rule violations surfaced by the ledger and provisioning.
///
/// Every variant is a typed failure the presentation layer maps to a stable
/// outward signal; none of them is ever swallowed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Record absent from the store (or deleted)
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Duplicate account type per customer, duplicate card kind per account
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Zero, negative, over-precise or oversized amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed input or an illegal state transition
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Supplied PIN does not match the stored credential
    #[error("Credential mismatch for {instrument}")]
    CredentialMismatch { instrument: InstrumentRef },

    /// Instrument is blocked and cannot be debited
    #[error("{instrument} is blocked")]
    Blocked { instrument: InstrumentRef },

    /// Not enough balance or available credit limit
    #[error("Insufficient {funds}: required {required}, available {available}")]
    InsufficientFunds {
        funds: FundsSource,
        required: Decimal,
        available: Decimal,
    },

    /// Repayment would push a credit card above its limit
    #[error("Repayment of {requested} exceeds outstanding amount {outstanding}")]
    RepaymentExceedsOutstanding {
        requested: Decimal,
        outstanding: Decimal,
    },

    /// Source and target are the same instrument
    #[error("Cannot transfer to the same instrument")]
    SelfTransfer,

    /// Optimistic concurrency retries exhausted
    #[error("Concurrent modification detected: {0}")]
    ConcurrencyConflict(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn insufficient_balance(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            funds: FundsSource::Balance,
            required,
            available,
        }
    }

    pub fn insufficient_limit(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            funds: FundsSource::CreditLimit,
            required,
            available,
        }
    }

    /// Check if this is a conflict error (retry may help)
    pub fn is_conflict_error(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

impl From<AmountError> for DomainError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}
