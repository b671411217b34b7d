//! Unit of Work
//!
//! Tracks the version of every record read, stages writes, and commits
//! them as one change set. Records read but not written are verified at
//! commit too, so a decision taken on a stale read never lands. Dropping a
//! unit of work without committing discards everything staged.

use std::collections::BTreeMap;

use crate::aggregate::{Account, CreditCard, Customer, DebitCard};
use crate::domain::{AccountNumber, CardNumber, CustomerId, NewTransaction, Transaction};

use super::{Change, ChangeSet, InstrumentStore, Record, RecordKey, StoreError};

pub struct UnitOfWork<'a> {
    store: &'a dyn InstrumentStore,
    /// Version observed on first read; `None` when the key was absent
    read_versions: BTreeMap<RecordKey, Option<i64>>,
    /// `Some` is a pending save, `None` a pending delete
    staged: BTreeMap<RecordKey, Option<Record>>,
    transactions: Vec<NewTransaction>,
}

impl<'a> UnitOfWork<'a> {
    pub fn begin(store: &'a dyn InstrumentStore) -> Self {
        Self {
            store,
            read_versions: BTreeMap::new(),
            staged: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    /// Read a record, seeing this unit's own staged writes first
    pub fn find(&mut self, key: &RecordKey) -> Result<Option<Record>, StoreError> {
        if let Some(staged) = self.staged.get(key) {
            return Ok(staged.clone());
        }

        let found = self.store.find(key)?;
        self.read_versions
            .entry(*key)
            .or_insert_with(|| found.as_ref().map(|v| v.version));
        Ok(found.map(|v| v.record))
    }

    /// Read a record that must exist
    pub fn load(&mut self, key: &RecordKey) -> Result<Record, StoreError> {
        self.find(key)?.ok_or(StoreError::NotFound(*key))
    }

    pub fn exists(&mut self, key: &RecordKey) -> Result<bool, StoreError> {
        Ok(self.find(key)?.is_some())
    }

    pub fn load_customer(&mut self, id: CustomerId) -> Result<Customer, StoreError> {
        let key = RecordKey::Customer(id);
        self.load(&key)?
            .into_customer()
            .ok_or(StoreError::TypeMismatch(key))
    }

    pub fn load_account(&mut self, number: AccountNumber) -> Result<Account, StoreError> {
        let key = RecordKey::Account(number);
        self.load(&key)?
            .into_account()
            .ok_or(StoreError::TypeMismatch(key))
    }

    pub fn load_debit_card(&mut self, number: CardNumber) -> Result<DebitCard, StoreError> {
        let key = RecordKey::DebitCard(number);
        self.load(&key)?
            .into_debit_card()
            .ok_or(StoreError::TypeMismatch(key))
    }

    pub fn load_credit_card(&mut self, number: CardNumber) -> Result<CreditCard, StoreError> {
        let key = RecordKey::CreditCard(number);
        self.load(&key)?
            .into_credit_card()
            .ok_or(StoreError::TypeMismatch(key))
    }

    /// Stage an upsert.
    ///
    /// Records never read by this unit are treated as inserts and fail the
    /// commit if the key already exists.
    pub fn save(&mut self, record: impl Into<Record>) {
        let record = record.into();
        self.staged.insert(record.key(), Some(record));
    }

    /// Stage a delete of an existing record
    pub fn delete(&mut self, key: RecordKey) -> Result<(), StoreError> {
        self.load(&key)?;
        self.staged.insert(key, None);
        Ok(())
    }

    /// Stage a transaction log row
    pub fn append(&mut self, transaction: NewTransaction) {
        self.transactions.push(transaction);
    }

    /// Apply every staged write atomically
    pub fn commit(self) -> Result<Vec<Transaction>, StoreError> {
        let change_set = self.change_set()?;
        if change_set.is_empty() {
            return Ok(Vec::new());
        }
        self.store.commit(change_set)
    }

    fn change_set(&self) -> Result<ChangeSet, StoreError> {
        let mut changes = Vec::with_capacity(self.read_versions.len() + self.staged.len());

        for (key, expected_version) in &self.read_versions {
            if !self.staged.contains_key(key) {
                changes.push(Change::Verify {
                    key: *key,
                    expected_version: *expected_version,
                });
            }
        }

        for (key, staged) in &self.staged {
            let read_version = self.read_versions.get(key).copied().flatten();
            let change = match staged {
                Some(record) => Change::Put {
                    record: record.clone(),
                    expected_version: read_version,
                },
                None => Change::Delete {
                    key: *key,
                    // delete() always loads first
                    expected_version: read_version.ok_or(StoreError::NotFound(*key))?,
                },
            };
            changes.push(change);
        }

        Ok(ChangeSet {
            changes,
            transactions: self.transactions.clone(),
        })
    }
}
