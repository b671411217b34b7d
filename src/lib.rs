//! banking_core Library
//!
//! Re-exports modules for integration testing and external use.

pub mod aggregate;
pub mod api;
pub mod credential;
pub mod domain;
pub mod ledger;
pub mod notify;
pub mod provisioning;
pub mod store;

pub mod config;
mod error;

pub use config::{Config, ConfigError, LogFormat};
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{Amount, AmountError, Balance, DomainError, OperationContext};
