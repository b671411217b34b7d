//! Instrument locks
//!
//! Serializes writers touching the same record. Every operation acquires
//! all of its locks up front, in key order, so two transfers over the same
//! pair of instruments can never deadlock. The ledger and provisioning
//! share one table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::DomainError;
use crate::error::AppResult;
use crate::store::RecordKey;

type Slot = Arc<AsyncMutex<()>>;

/// Per-instrument async mutex table
#[derive(Debug, Default)]
pub struct InstrumentLocks {
    slots: Mutex<HashMap<RecordKey, Slot>>,
}

/// Held locks, released on drop
#[derive(Debug)]
pub struct LockSet {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl InstrumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every key, in sorted order, waiting as needed
    pub async fn acquire(&self, keys: &[RecordKey]) -> LockSet {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let slots = self.slots_for(&keys);
        let mut guards = Vec::with_capacity(slots.len());
        for slot in slots {
            guards.push(slot.lock_owned().await);
        }

        LockSet { _guards: guards }
    }

    /// Run `attempt` under the locks for `keys`, retrying optimistic
    /// conflicts up to `max_retries` attempts in total. Locks are released
    /// while backing off (linear: `backoff` x attempt).
    pub async fn run<T, F>(
        &self,
        keys: &[RecordKey],
        max_retries: u32,
        backoff: Duration,
        mut attempt: F,
    ) -> AppResult<T>
    where
        F: FnMut() -> AppResult<T>,
    {
        let max_retries = max_retries.max(1);

        for n in 0..max_retries {
            let result = {
                let _locks = self.acquire(keys).await;
                attempt()
            };

            match result {
                Err(e) if e.is_conflict() && n < max_retries - 1 => {
                    tracing::warn!(
                        "Concurrency conflict, retrying (attempt {}/{}): {}",
                        n + 1,
                        max_retries,
                        e
                    );
                    tokio::time::sleep(backoff * (n + 1)).await;
                }
                other => return other,
            }
        }

        Err(DomainError::ConcurrencyConflict("retries exhausted".to_string()).into())
    }

    fn slots_for(&self, keys: &[RecordKey]) -> Vec<Slot> {
        let mut table = self.table();
        // Drop slots nobody holds or waits on
        table.retain(|_, slot| Arc::strong_count(slot) > 1);

        keys.iter()
            .map(|key| Arc::clone(table.entry(*key).or_default()))
            .collect()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<RecordKey, Slot>> {
        // The table only maps keys to slots, so a panic mid-update cannot
        // leave it inconsistent
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
