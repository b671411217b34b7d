//! Number allocation
//!
//! Draws random instrument numbers and accepts only ones not already in
//! use. The existence check is recorded in the unit of work, so a number
//! taken by a concurrent commit fails this commit instead of colliding.

use rand::Rng;

use crate::domain::{AccountNumber, CardNumber};
use crate::error::{AppError, AppResult};
use crate::store::{RecordKey, UnitOfWork};

#[derive(Debug, Clone, Copy)]
pub struct NumberAllocator {
    attempts: u32,
}

impl NumberAllocator {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    pub fn account_number(&self, uow: &mut UnitOfWork<'_>) -> AppResult<AccountNumber> {
        self.draw("account", AccountNumber::MIN, AccountNumber::MAX, |value| {
            let number = AccountNumber::new(value);
            Ok((!uow.exists(&RecordKey::Account(number))?).then_some(number))
        })
    }

    /// Card numbers are unique across debit and credit cards
    pub fn card_number(&self, uow: &mut UnitOfWork<'_>) -> AppResult<CardNumber> {
        self.draw("card", CardNumber::MIN, CardNumber::MAX, |value| {
            let number = CardNumber::new(value);
            let taken = uow.exists(&RecordKey::DebitCard(number))?
                || uow.exists(&RecordKey::CreditCard(number))?;
            Ok((!taken).then_some(number))
        })
    }

    fn draw<T, F>(&self, what: &str, min: u64, max: u64, mut accept: F) -> AppResult<T>
    where
        F: FnMut(u64) -> AppResult<Option<T>>,
    {
        let mut rng = rand::thread_rng();
        for _ in 0..self.attempts {
            if let Some(number) = accept(rng.gen_range(min..=max))? {
                return Ok(number);
            }
            tracing::debug!("Drew a taken {} number, retrying", what);
        }

        Err(AppError::Internal(format!(
            "No free {} number after {} attempts",
            what, self.attempts
        )))
    }
}

impl Default for NumberAllocator {
    fn default() -> Self {
        Self::new(16)
    }
}
