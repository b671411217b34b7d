//! In-memory Instrument Store
//!
//! Ordered record map and append-only transaction vector behind one
//! `RwLock`. A commit holds the write lock for validation and apply, so a
//! change set is observed entirely or not at all.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::aggregate::{Account, Customer};
use crate::domain::{
    AccountNumber, CardKind, CustomerId, InstrumentRef, Transaction, TransactionId,
};

use super::{Change, ChangeSet, InstrumentStore, Record, RecordKey, StoreError, Versioned};

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<RecordKey, Versioned<Record>>,
    transactions: Vec<Transaction>,
    last_transaction_id: u64,
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

/// Reject the change set if any expected version is stale
fn validate(state: &State, changes: &[Change]) -> Result<(), StoreError> {
    for change in changes {
        let key = change.key();
        let actual = state.records.get(&key).map(|v| v.version);
        let expected = match change {
            Change::Put {
                expected_version, ..
            }
            | Change::Verify {
                expected_version, ..
            } => *expected_version,
            Change::Delete {
                expected_version, ..
            } => Some(*expected_version),
        };

        if actual != expected {
            return Err(StoreError::ConcurrencyConflict {
                key,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

impl InstrumentStore for InMemoryStore {
    fn find(&self, key: &RecordKey) -> Result<Option<Versioned<Record>>, StoreError> {
        Ok(self.read()?.records.get(key).cloned())
    }

    fn accounts_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>, StoreError> {
        let state = self.read()?;
        let accounts = state
            .records
            .values()
            .filter_map(|v| match &v.record {
                Record::Account(account) if account.customer_id() == customer_id => {
                    Some(account.clone())
                }
                _ => None,
            })
            .collect();
        Ok(accounts)
    }

    fn cards_by_account(&self, account: AccountNumber) -> Result<Vec<Record>, StoreError> {
        let state = self.read()?;
        let cards = state
            .records
            .values()
            .filter(|v| v.record.linked_account() == Some(account))
            .map(|v| v.record.clone())
            .collect();
        Ok(cards)
    }

    fn all_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let state = self.read()?;
        Ok(state
            .records
            .values()
            .filter_map(|v| match &v.record {
                Record::Customer(customer) => Some(customer.clone()),
                _ => None,
            })
            .collect())
    }

    fn all_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let state = self.read()?;
        Ok(state
            .records
            .values()
            .filter_map(|v| match &v.record {
                Record::Account(account) => Some(account.clone()),
                _ => None,
            })
            .collect())
    }

    fn all_cards(&self, kind: CardKind) -> Result<Vec<Record>, StoreError> {
        let state = self.read()?;
        Ok(state
            .records
            .values()
            .filter(|v| v.record.card_kind() == Some(kind))
            .map(|v| v.record.clone())
            .collect())
    }

    fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let state = self.read()?;
        // Ids are assigned in append order starting at 1
        let found = id
            .value()
            .checked_sub(1)
            .and_then(|index| state.transactions.get(index as usize))
            .filter(|tx| tx.id() == id)
            .cloned();
        Ok(found)
    }

    fn transactions_involving(
        &self,
        instruments: &[InstrumentRef],
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.read()?;
        Ok(state
            .transactions
            .iter()
            .filter(|tx| instruments.iter().any(|instrument| tx.involves(*instrument)))
            .cloned()
            .collect())
    }

    fn all_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.read()?.transactions.clone())
    }

    fn commit(&self, change_set: ChangeSet) -> Result<Vec<Transaction>, StoreError> {
        let mut state = self.write()?;

        validate(&state, &change_set.changes)?;

        for change in change_set.changes {
            match change {
                Change::Put {
                    record,
                    expected_version,
                } => {
                    let version = expected_version.map_or(1, |v| v + 1);
                    state.records.insert(record.key(), Versioned { record, version });
                }
                Change::Delete { key, .. } => {
                    state.records.remove(&key);
                }
                Change::Verify { .. } => {}
            }
        }

        let mut committed = Vec::with_capacity(change_set.transactions.len());
        for new_transaction in change_set.transactions {
            state.last_transaction_id += 1;
            let transaction =
                new_transaction.into_transaction(TransactionId::new(state.last_transaction_id));
            state.transactions.push(transaction.clone());
            committed.push(transaction);
        }

        Ok(committed)
    }
}
