//! Ledger module
//!
//! Transfers, deposits and withdrawals over the instrument store.

pub mod commands;
mod engine;
mod locks;


pub use commands::{DepositCommand, TransferCommand, TransferDirection, WithdrawCommand};
pub use engine::{LedgerEngine, LedgerSettings};
pub use locks::{InstrumentLocks, LockSet};
