//! Provisioning module
//!
//! Lifecycle of customers, accounts and cards.

mod allocator;
pub mod commands;
mod service;

pub use allocator::NumberAllocator;
pub use commands::{
    ChangePinCommand, CreateCustomerCommand, IssueCardCommand, OpenAccountCommand,
    SetBlockedCommand, UpdateCustomerCommand,
};
pub use service::{IssuedCard, ProvisioningService, ProvisioningSettings};
