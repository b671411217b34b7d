//! Instrument identifiers
//!
//! Plain value types naming accounts, cards and customers. Records refer to
//! each other only through these values, never through back-pointers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Keep only the last four digits of a displayed number.
fn mask_digits(value: u64) -> String {
    let digits = value.to_string();
    let tail = &digits[digits.len().saturating_sub(4)..];
    format!("**{}", tail)
}

/// Customer-facing account number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(u64);

impl AccountNumber {
    /// Smallest number handed out by the allocator (11 digits)
    pub const MIN: u64 = 10_000_000_000;
    /// Largest number handed out by the allocator
    pub const MAX: u64 = 99_999_999_999;

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Masked form used in customer notifications
    pub fn masked(&self) -> String {
        mask_digits(self.0)
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Card number, shared by debit and credit cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardNumber(u64);

impl CardNumber {
    /// Smallest number handed out by the allocator (16 digits)
    pub const MIN: u64 = 1000_0000_0000_0000;
    /// Largest number handed out by the allocator
    pub const MAX: u64 = 9999_9999_9999_9999;

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn masked(&self) -> String {
        mask_digits(self.0)
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Customer identity (owner of accounts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of account a customer may hold (at most one of each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Savings,
    Current,
    Salary,
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountType::Savings => write!(f, "SAVINGS"),
            AccountType::Current => write!(f, "CURRENT"),
            AccountType::Salary => write!(f, "SALARY"),
        }
    }
}

/// Kind of card an account may hold (at most one of each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Debit,
    Credit,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardKind::Debit => write!(f, "debit"),
            CardKind::Credit => write!(f, "credit"),
        }
    }
}

/// Lifecycle status shared by every instrument.
///
/// Deletion is terminal and modelled by removal from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentStatus {
    #[default]
    Active,
    /// Rejects debits, still accepts incoming credits
    Blocked,
}

/// Reference to exactly one value-holding instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "number", rename_all = "snake_case")]
pub enum InstrumentRef {
    Account(AccountNumber),
    DebitCard(CardNumber),
    CreditCard(CardNumber),
}

impl InstrumentRef {
    pub fn card(kind: CardKind, number: CardNumber) -> Self {
        match kind {
            CardKind::Debit => InstrumentRef::DebitCard(number),
            CardKind::Credit => InstrumentRef::CreditCard(number),
        }
    }

    pub fn masked(&self) -> String {
        match self {
            InstrumentRef::Account(number) => number.masked(),
            InstrumentRef::DebitCard(number) | InstrumentRef::CreditCard(number) => {
                number.masked()
            }
        }
    }

    /// Human-readable instrument kind
    pub fn kind_name(&self) -> &'static str {
        match self {
            InstrumentRef::Account(_) => "account",
            InstrumentRef::DebitCard(_) => "debit card",
            InstrumentRef::CreditCard(_) => "credit card",
        }
    }
}

impl fmt::Display for InstrumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentRef::Account(number) => write!(f, "account {}", number),
            InstrumentRef::DebitCard(number) => write!(f, "debit card {}", number.masked()),
            InstrumentRef::CreditCard(number) => write!(f, "credit card {}", number.masked()),
        }
    }
}
