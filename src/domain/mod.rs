//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod context;
pub mod error;
pub mod instrument;
pub mod transaction;

pub use amount::{Amount, AmountError, Balance};
pub use context::OperationContext;
pub use error::{DomainError, FundsSource};
pub use instrument::{
    AccountNumber, AccountType, CardKind, CardNumber, CustomerId, InstrumentRef, InstrumentStatus,
};
pub use transaction::{NewTransaction, Transaction, TransactionId, TransactionKind};
