//! Instrument Store module
//!
//! Canonical persisted state of customers, accounts and cards, plus the
//! append-only transaction log. All writes go through a [`UnitOfWork`]
//! whose [`ChangeSet`] is committed atomically with optimistic version
//! checks.

mod error;
mod memory;
mod unit_of_work;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use unit_of_work::UnitOfWork;

use std::fmt;

use crate::aggregate::{Account, CreditCard, Customer, DebitCard, Instrument};
use crate::domain::{
    AccountNumber, CardKind, CardNumber, CustomerId, InstrumentRef, NewTransaction, Transaction,
    TransactionId,
};

// =========================================================================
// Keys and records
// =========================================================================

/// Primary key of a stored record. Ordering fixes the lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Customer(CustomerId),
    Account(AccountNumber),
    DebitCard(CardNumber),
    CreditCard(CardNumber),
}

impl RecordKey {
    /// Entity name used in not-found errors
    pub fn entity(&self) -> &'static str {
        match self {
            RecordKey::Customer(_) => "Customer",
            RecordKey::Account(_) => "Account",
            RecordKey::DebitCard(_) => "Debit card",
            RecordKey::CreditCard(_) => "Credit card",
        }
    }

    /// Identifier shown to clients; card numbers are masked
    pub fn id(&self) -> String {
        match self {
            RecordKey::Customer(id) => id.to_string(),
            RecordKey::Account(number) => number.to_string(),
            RecordKey::DebitCard(number) | RecordKey::CreditCard(number) => number.masked(),
        }
    }
}

impl From<InstrumentRef> for RecordKey {
    fn from(instrument: InstrumentRef) -> Self {
        match instrument {
            InstrumentRef::Account(number) => RecordKey::Account(number),
            InstrumentRef::DebitCard(number) => RecordKey::DebitCard(number),
            InstrumentRef::CreditCard(number) => RecordKey::CreditCard(number),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Customer(id) => write!(f, "customer {}", id),
            RecordKey::Account(number) => write!(f, "account {}", number),
            RecordKey::DebitCard(number) => write!(f, "debit card {}", number.masked()),
            RecordKey::CreditCard(number) => write!(f, "credit card {}", number.masked()),
        }
    }
}

/// Any stored record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Customer(Customer),
    Account(Account),
    DebitCard(DebitCard),
    CreditCard(CreditCard),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Customer(customer) => RecordKey::Customer(customer.id()),
            Record::Account(account) => RecordKey::Account(account.number()),
            Record::DebitCard(card) => RecordKey::DebitCard(card.number()),
            Record::CreditCard(card) => RecordKey::CreditCard(card.number()),
        }
    }

    /// Instrument view of the record (customers are not instruments)
    pub fn as_instrument_mut(&mut self) -> Option<&mut dyn Instrument> {
        match self {
            Record::Customer(_) => None,
            Record::Account(account) => Some(account),
            Record::DebitCard(card) => Some(card),
            Record::CreditCard(card) => Some(card),
        }
    }

    /// Account the record belongs to, for cards
    pub fn linked_account(&self) -> Option<AccountNumber> {
        match self {
            Record::DebitCard(card) => Some(card.account_number()),
            Record::CreditCard(card) => Some(card.account_number()),
            Record::Customer(_) | Record::Account(_) => None,
        }
    }

    pub fn card_kind(&self) -> Option<CardKind> {
        match self {
            Record::DebitCard(_) => Some(CardKind::Debit),
            Record::CreditCard(_) => Some(CardKind::Credit),
            Record::Customer(_) | Record::Account(_) => None,
        }
    }

    pub fn into_customer(self) -> Option<Customer> {
        match self {
            Record::Customer(customer) => Some(customer),
            _ => None,
        }
    }

    pub fn into_account(self) -> Option<Account> {
        match self {
            Record::Account(account) => Some(account),
            _ => None,
        }
    }

    pub fn into_debit_card(self) -> Option<DebitCard> {
        match self {
            Record::DebitCard(card) => Some(card),
            _ => None,
        }
    }

    pub fn into_credit_card(self) -> Option<CreditCard> {
        match self {
            Record::CreditCard(card) => Some(card),
            _ => None,
        }
    }
}

impl From<Customer> for Record {
    fn from(customer: Customer) -> Self {
        Record::Customer(customer)
    }
}

impl From<Account> for Record {
    fn from(account: Account) -> Self {
        Record::Account(account)
    }
}

impl From<DebitCard> for Record {
    fn from(card: DebitCard) -> Self {
        Record::DebitCard(card)
    }
}

impl From<CreditCard> for Record {
    fn from(card: CreditCard) -> Self {
        Record::CreditCard(card)
    }
}

/// A record together with its stored version
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub record: T,
    pub version: i64,
}

// =========================================================================
// Change sets
// =========================================================================

/// One staged write
#[derive(Debug, Clone)]
pub enum Change {
    /// Insert or replace. `expected_version: None` means the key must be absent.
    Put {
        record: Record,
        expected_version: Option<i64>,
    },
    /// Remove an existing record at `expected_version`
    Delete {
        key: RecordKey,
        expected_version: i64,
    },
    /// Write nothing, but fail unless the key is still at the version read
    Verify {
        key: RecordKey,
        expected_version: Option<i64>,
    },
}

impl Change {
    pub fn key(&self) -> RecordKey {
        match self {
            Change::Put { record, .. } => record.key(),
            Change::Delete { key, .. } | Change::Verify { key, .. } => *key,
        }
    }
}

/// Everything a unit of work wants to write, applied all or nothing
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub changes: Vec<Change>,
    pub transactions: Vec<NewTransaction>,
}

impl ChangeSet {
    /// True when committing would write nothing
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self
                .changes
                .iter()
                .all(|change| matches!(change, Change::Verify { .. }))
    }
}

// =========================================================================
// Store trait
// =========================================================================

/// Persistence collaborator for records and the transaction log
pub trait InstrumentStore: Send + Sync {
    /// Load a record with its version
    fn find(&self, key: &RecordKey) -> Result<Option<Versioned<Record>>, StoreError>;

    fn exists(&self, key: &RecordKey) -> Result<bool, StoreError> {
        Ok(self.find(key)?.is_some())
    }

    /// Accounts owned by a customer
    fn accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>, StoreError>;

    /// Cards linked to an account (at most one of each kind)
    fn cards_by_account(&self, account: AccountNumber) -> Result<Vec<Record>, StoreError>;

    fn all_customers(&self) -> Result<Vec<Customer>, StoreError>;

    fn all_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Every card of one kind, as records
    fn all_cards(&self, kind: CardKind) -> Result<Vec<Record>, StoreError>;

    fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Transactions in which any of the instruments is source or
    /// counterparty, oldest first
    fn transactions_involving(
        &self,
        instruments: &[InstrumentRef],
    ) -> Result<Vec<Transaction>, StoreError>;

    fn transactions_for(&self, instrument: InstrumentRef) -> Result<Vec<Transaction>, StoreError> {
        self.transactions_involving(&[instrument])
    }

    fn all_transactions(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Atomically apply a change set, returning the numbered transactions
    fn commit(&self, change_set: ChangeSet) -> Result<Vec<Transaction>, StoreError>;
}
