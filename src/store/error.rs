//! Store Errors
//!
//! Error types for instrument store operations.

use super::RecordKey;

/// Errors that can occur in the instrument store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Optimistic concurrency conflict.
    ///
    /// A version of `None` means the record is (or was expected to be) absent.
    #[error("Concurrency conflict for {key}: expected version {expected:?}, found {actual:?}")]
    ConcurrencyConflict {
        key: RecordKey,
        expected: Option<i64>,
        actual: Option<i64>,
    },

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(RecordKey),

    /// Record stored under a key holds a different record type
    #[error("Record type mismatch for {0}")]
    TypeMismatch(RecordKey),

    /// A writer panicked while holding the store lock
    #[error("Store lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountNumber;

    use crate::domain::CardNumber;

    #[test]
    fn test_error_messages_name_the_record() {
        let err = StoreError::ConcurrencyConflict {
            key: RecordKey::Account(AccountNumber::new(111)),
            expected: Some(2),
            actual: Some(3),
        };
        assert!(err.to_string().contains("account 111"));
        assert!(err.to_string().contains("expected version Some(2)"));

        let missing = StoreError::NotFound(RecordKey::CreditCard(CardNumber::new(
            5100_0000_0000_0042,
        )));
        assert_eq!(missing.to_string(), "Record not found: credit card **0042");
    }
}
