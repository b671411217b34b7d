//! Provisioning Service
//!
//! Creates customers, accounts and cards; blocks, re-keys and deletes
//! instruments. Never touches balances or limits beyond their initial
//! values. Every write runs under the ledger's instrument locks and is
//! retried on optimistic conflicts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Months, NaiveDate, Utc};

use crate::aggregate::{Account, CreditCard, Customer, DebitCard};
use crate::credential::{generate_cvv, AuthenticationGuard, CredentialHash, Pin};
use crate::domain::{
    AccountNumber, Amount, CardKind, CardNumber, CustomerId, DomainError, InstrumentRef,
    InstrumentStatus,
};
use crate::error::{AppError, AppResult};
use crate::ledger::InstrumentLocks;
use crate::store::{InstrumentStore, Record, RecordKey, UnitOfWork};

use super::allocator::NumberAllocator;
use super::commands::{
    ChangePinCommand, CreateCustomerCommand, IssueCardCommand, OpenAccountCommand,
    SetBlockedCommand, UpdateCustomerCommand,
};

#[derive(Debug, Clone, Copy)]
pub struct ProvisioningSettings {
    /// Card expiry, in whole years from the issue date
    pub card_validity_years: u32,
    /// Random draws before number allocation gives up
    pub allocation_attempts: u32,
    /// Total attempts per write on concurrency conflicts
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number
    pub retry_backoff: Duration,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            card_validity_years: 5,
            allocation_attempts: 16,
            max_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// A freshly issued card with its CVV.
///
/// The CVV is only ever available here; the card stores its hash.
#[derive(Debug, Clone)]
pub struct IssuedCard<C> {
    pub card: C,
    pub cvv: String,
}

struct NewCard {
    number: CardNumber,
    pin: CredentialHash,
    cvv: String,
    expires_on: NaiveDate,
}

pub struct ProvisioningService {
    store: Arc<dyn InstrumentStore>,
    locks: Arc<InstrumentLocks>,
    allocator: NumberAllocator,
    settings: ProvisioningSettings,
}

impl ProvisioningService {
    /// `locks` must be the table the ledger engine transfers under
    pub fn new(
        store: Arc<dyn InstrumentStore>,
        locks: Arc<InstrumentLocks>,
        settings: ProvisioningSettings,
    ) -> Self {
        Self {
            store,
            locks,
            allocator: NumberAllocator::new(settings.allocation_attempts),
            settings,
        }
    }

    // =========================================================================
    // Customers
    // =========================================================================

    pub async fn create_customer(&self, command: CreateCustomerCommand) -> AppResult<Customer> {
        let customer = Customer::register(&command.full_name, &command.email)?;

        self.write(&[RecordKey::Customer(customer.id())], |uow| {
            uow.save(customer.clone());
            Ok(())
        })
        .await?;

        tracing::info!(customer_id = %customer.id(), "Customer created");
        Ok(customer)
    }

    pub async fn update_customer(&self, command: UpdateCustomerCommand) -> AppResult<Customer> {
        let id = command.customer_id;

        let customer = self
            .write(&[RecordKey::Customer(id)], |uow| {
                let mut customer = uow.load_customer(id)?;
                customer.update(command.full_name.as_deref(), command.email.as_deref())?;
                uow.save(customer.clone());
                Ok(customer)
            })
            .await?;

        tracing::info!(customer_id = %id, "Customer updated");
        Ok(customer)
    }

    /// Remove a customer who no longer holds any account
    pub async fn delete_customer(&self, id: CustomerId) -> AppResult<()> {
        self.write(&[RecordKey::Customer(id)], |uow| {
            uow.load_customer(id)?;
            let held = self.store.accounts_by_customer(id)?.len();
            if held > 0 {
                return Err(DomainError::Validation(format!(
                    "Customer {} still holds {} account(s)",
                    id, held
                ))
                .into());
            }
            uow.delete(RecordKey::Customer(id))?;
            Ok(())
        })
        .await?;

        tracing::info!(customer_id = %id, "Customer deleted");
        Ok(())
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Open an account with a zero balance. A customer holds at most one
    /// account of each type.
    pub async fn open_account(&self, command: OpenAccountCommand) -> AppResult<Account> {
        let pin = Pin::parse(&command.pin)?;

        let account = self
            .write(&[RecordKey::Customer(command.customer_id)], |uow| {
                let customer = uow.load_customer(command.customer_id)?;

                let duplicate = self
                    .store
                    .accounts_by_customer(customer.id())?
                    .iter()
                    .any(|account| account.account_type() == command.account_type);
                if duplicate {
                    return Err(DomainError::AlreadyExists(format!(
                        "Customer {} already holds a {} account",
                        customer.id(),
                        command.account_type
                    ))
                    .into());
                }

                let number = self.allocator.account_number(uow)?;
                let account = Account::open(
                    number,
                    customer.id(),
                    command.account_type,
                    CredentialHash::for_pin(&pin),
                );

                uow.save(account.clone());
                // Re-saving the owner makes concurrent openings for it conflict
                uow.save(customer);
                Ok(account)
            })
            .await?;

        tracing::info!(
            account = %account.number(),
            customer_id = %command.customer_id,
            account_type = %command.account_type,
            "Account opened"
        );
        Ok(account)
    }

    pub async fn issue_debit_card(
        &self,
        command: IssueCardCommand,
    ) -> AppResult<IssuedCard<DebitCard>> {
        let issued = self
            .write(&[RecordKey::Account(command.account)], |uow| {
                let (account, new_card) = self.prepare_card(uow, &command, CardKind::Debit)?;

                let card = DebitCard::issue(
                    new_card.number,
                    account.number(),
                    command.holder_name.trim().to_string(),
                    new_card.pin,
                    CredentialHash::derive(&new_card.cvv),
                    new_card.expires_on,
                );

                uow.save(card.clone());
                // Re-saving the account makes concurrent issuance for it conflict
                uow.save(account);
                Ok(IssuedCard {
                    card,
                    cvv: new_card.cvv,
                })
            })
            .await?;

        tracing::info!(
            card = %issued.card.number().masked(),
            account = %issued.card.account_number(),
            "Debit card issued"
        );
        Ok(issued)
    }

    pub async fn issue_credit_card(
        &self,
        command: IssueCardCommand,
    ) -> AppResult<IssuedCard<CreditCard>> {
        let card_limit: Amount = command
            .card_limit
            .as_deref()
            .ok_or_else(|| AppError::InvalidRequest("card_limit is required".to_string()))?
            .parse()?;

        let issued = self
            .write(&[RecordKey::Account(command.account)], |uow| {
                let (account, new_card) = self.prepare_card(uow, &command, CardKind::Credit)?;

                let card = CreditCard::issue(
                    new_card.number,
                    account.number(),
                    command.holder_name.trim().to_string(),
                    new_card.pin,
                    CredentialHash::derive(&new_card.cvv),
                    new_card.expires_on,
                    card_limit,
                );

                uow.save(card.clone());
                uow.save(account);
                Ok(IssuedCard {
                    card,
                    cvv: new_card.cvv,
                })
            })
            .await?;

        tracing::info!(
            card = %issued.card.number().masked(),
            account = %issued.card.account_number(),
            card_limit = %card_limit,
            "Credit card issued"
        );
        Ok(issued)
    }

    /// Shared validation and allocation for both card kinds
    fn prepare_card(
        &self,
        uow: &mut UnitOfWork<'_>,
        command: &IssueCardCommand,
        kind: CardKind,
    ) -> AppResult<(Account, NewCard)> {
        if command.holder_name.trim().is_empty() {
            return Err(DomainError::Validation("Card holder name is required".to_string()).into());
        }
        let pin = Pin::parse(&command.pin)?;

        let account = uow.load_account(command.account)?;
        if self.find_card_for_account(account.number(), kind)?.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "Account {} already holds a {} card",
                account.number(),
                kind
            ))
            .into());
        }

        let number = self.allocator.card_number(uow)?;
        let expires_on = self.expiry_date()?;

        Ok((
            account,
            NewCard {
                number,
                pin: CredentialHash::for_pin(&pin),
                cvv: generate_cvv(),
                expires_on,
            },
        ))
    }

    fn expiry_date(&self) -> AppResult<NaiveDate> {
        let months = Months::new(self.settings.card_validity_years.saturating_mul(12));
        Utc::now()
            .date_naive()
            .checked_add_months(months)
            .ok_or_else(|| AppError::Internal("Card expiry date out of range".to_string()))
    }

    // =========================================================================
    // Instrument state
    // =========================================================================

    /// Block or unblock an instrument. The instrument's PIN is required and
    /// is checked regardless of the current status.
    pub async fn set_blocked(&self, command: SetBlockedCommand) -> AppResult<InstrumentStatus> {
        let pin = Pin::parse(&command.pin)?;
        let key = RecordKey::from(command.instrument);

        let status = self
            .write(&[key], |uow| {
                let mut record = uow.load(&key)?;
                let instrument = instrument_mut(&mut record)?;

                AuthenticationGuard::authenticate(&*instrument, &pin)?;
                if command.blocked {
                    instrument.block()?;
                } else {
                    instrument.unblock()?;
                }
                let status = instrument.status();

                uow.save(record);
                Ok(status)
            })
            .await?;

        tracing::info!(instrument = %command.instrument, status = ?status, "Instrument status changed");
        Ok(status)
    }

    pub async fn change_pin(&self, command: ChangePinCommand) -> AppResult<()> {
        let old_pin = Pin::parse(&command.old_pin)?;
        let new_pin = Pin::parse(&command.new_pin)?;
        let key = RecordKey::from(command.instrument);

        self.write(&[key], |uow| {
            let mut record = uow.load(&key)?;
            let instrument = instrument_mut(&mut record)?;

            AuthenticationGuard::authenticate(&*instrument, &old_pin)?;
            instrument.set_credential(CredentialHash::for_pin(&new_pin));

            uow.save(record);
            Ok(())
        })
        .await?;

        tracing::info!(instrument = %command.instrument, "PIN changed");
        Ok(())
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Delete an account and, in the same unit of work, its cards.
    /// Transaction history is kept.
    pub async fn delete_account(&self, number: AccountNumber) -> AppResult<()> {
        // Card issuance locks the account, so this list cannot grow while
        // the locks are held
        let mut keys = vec![RecordKey::Account(number)];
        keys.extend(self.store.cards_by_account(number)?.iter().map(Record::key));

        let cards_deleted = self
            .write(&keys, |uow| {
                uow.load_account(number)?;

                let cards = self.store.cards_by_account(number)?;
                for card in &cards {
                    uow.delete(card.key())?;
                }
                uow.delete(RecordKey::Account(number))?;
                Ok(cards.len())
            })
            .await?;

        tracing::info!(account = %number, cards_deleted, "Account deleted");
        Ok(())
    }

    pub async fn delete_card(&self, kind: CardKind, number: CardNumber) -> AppResult<()> {
        let key = card_key(kind, number);

        self.write(&[key], |uow| Ok(uow.delete(key)?)).await?;

        tracing::info!(card = %key, "Card deleted");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn customer(&self, id: CustomerId) -> AppResult<Customer> {
        Ok(self.begin().load_customer(id)?)
    }

    pub fn customers(&self) -> AppResult<Vec<Customer>> {
        Ok(self.store.all_customers()?)
    }

    /// Whether a customer is registered under the e-mail address
    /// (case-insensitive)
    pub fn customer_exists(&self, email: &str) -> AppResult<bool> {
        let email = email.trim();
        Ok(self
            .store
            .all_customers()?
            .iter()
            .any(|customer| customer.email().eq_ignore_ascii_case(email)))
    }

    pub fn account(&self, number: AccountNumber) -> AppResult<Account> {
        Ok(self.begin().load_account(number)?)
    }

    pub fn accounts(&self) -> AppResult<Vec<Account>> {
        Ok(self.store.all_accounts()?)
    }

    pub fn accounts_for_customer(&self, id: CustomerId) -> AppResult<Vec<Account>> {
        self.customer(id)?;
        Ok(self.store.accounts_by_customer(id)?)
    }

    pub fn debit_card(&self, number: CardNumber) -> AppResult<DebitCard> {
        Ok(self.begin().load_debit_card(number)?)
    }

    pub fn debit_cards(&self) -> AppResult<Vec<DebitCard>> {
        Ok(self
            .store
            .all_cards(CardKind::Debit)?
            .into_iter()
            .filter_map(Record::into_debit_card)
            .collect())
    }

    pub fn credit_card(&self, number: CardNumber) -> AppResult<CreditCard> {
        Ok(self.begin().load_credit_card(number)?)
    }

    pub fn credit_cards(&self) -> AppResult<Vec<CreditCard>> {
        Ok(self
            .store
            .all_cards(CardKind::Credit)?
            .into_iter()
            .filter_map(Record::into_credit_card)
            .collect())
    }

    /// The account's card of the given kind
    pub fn card_for_account(&self, number: AccountNumber, kind: CardKind) -> AppResult<Record> {
        self.account(number)?;
        self.find_card_for_account(number, kind)?.ok_or_else(|| {
            DomainError::not_found("Card", format!("{} card of account {}", kind, number)).into()
        })
    }

    pub fn debit_card_for_account(&self, number: AccountNumber) -> AppResult<DebitCard> {
        self.card_for_account(number, CardKind::Debit)?
            .into_debit_card()
            .ok_or_else(|| AppError::Internal("Card index returned a non-debit card".to_string()))
    }

    pub fn credit_card_for_account(&self, number: AccountNumber) -> AppResult<CreditCard> {
        self.card_for_account(number, CardKind::Credit)?
            .into_credit_card()
            .ok_or_else(|| AppError::Internal("Card index returned a non-credit card".to_string()))
    }

    fn find_card_for_account(
        &self,
        number: AccountNumber,
        kind: CardKind,
    ) -> AppResult<Option<Record>> {
        let card = self
            .store
            .cards_by_account(number)?
            .into_iter()
            .find(|card| card.card_kind() == Some(kind));
        Ok(card)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Stage `operation` in a fresh unit of work and commit it under the
    /// locks for `keys`, retrying optimistic conflicts.
    async fn write<T, F>(&self, keys: &[RecordKey], mut operation: F) -> AppResult<T>
    where
        F: FnMut(&mut UnitOfWork<'_>) -> AppResult<T>,
    {
        self.locks
            .run(
                keys,
                self.settings.max_retries,
                self.settings.retry_backoff,
                || {
                    let mut uow = self.begin();
                    let value = operation(&mut uow)?;
                    uow.commit()?;
                    Ok(value)
                },
            )
            .await
    }

    fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork::begin(self.store.as_ref())
    }
}

impl std::fmt::Debug for ProvisioningService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn card_key(kind: CardKind, number: CardNumber) -> RecordKey {
    RecordKey::from(InstrumentRef::card(kind, number))
}

fn instrument_mut(record: &mut Record) -> AppResult<&mut dyn crate::aggregate::Instrument> {
    let key = record.key();
    record
        .as_instrument_mut()
        .ok_or_else(|| AppError::InvalidRequest(format!("{} is not an instrument", key)))
}
