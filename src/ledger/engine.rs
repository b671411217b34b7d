//! Ledger Engine
//!
//! The only component that mutates balances and credit limits. Each
//! operation validates every precondition, stages the movement and its
//! transaction row in one unit of work, and commits all of it or nothing.

use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::Instrument;
use crate::credential::{AuthenticationGuard, Pin};
use crate::domain::{
    AccountNumber, Amount, DomainError, InstrumentRef, NewTransaction,
    OperationContext, Transaction, TransactionId, TransactionKind,
};
use crate::error::{AppError, AppResult};
use crate::notify::{Notification, NotificationDispatcher, NotificationKind};
use crate::store::{InstrumentStore, RecordKey, UnitOfWork};

use super::commands::{DepositCommand, TransferCommand, TransferDirection, WithdrawCommand};
use super::locks::InstrumentLocks;

/// Retry policy for optimistic conflicts
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// Total attempts per operation
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number
    pub retry_backoff: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

pub struct LedgerEngine {
    store: Arc<dyn InstrumentStore>,
    locks: Arc<InstrumentLocks>,
    notifier: NotificationDispatcher,
    settings: LedgerSettings,
}

impl std::fmt::Debug for LedgerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl LedgerEngine {
    /// `locks` must be the table provisioning writes under
    pub fn new(
        store: Arc<dyn InstrumentStore>,
        locks: Arc<InstrumentLocks>,
        notifier: NotificationDispatcher,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            locks,
            notifier,
            settings,
        }
    }

    // =========================================================================
    // Money movement
    // =========================================================================

    /// Move money between two instruments
    pub async fn transfer(
        &self,
        command: TransferCommand,
        context: &OperationContext,
    ) -> AppResult<Transaction> {
        let amount: Amount = command.amount.parse()?;
        let pin = Pin::parse(&command.pin)?;
        let direction = command.direction;

        let keys = self.lock_keys(&direction)?;
        let transaction = self
            .execute(keys, |uow| stage_transfer(uow, direction, amount, &pin))
            .await?;

        tracing::info!(
            transaction_id = %transaction.id(),
            kind = %transaction.kind(),
            source = %direction.source(),
            target = %direction.target(),
            amount = %amount,
            correlation_id = ?context.correlation_id,
            initiated_by = ?context.initiated_by,
            "Transfer committed"
        );

        self.notify_parties(&transaction);
        Ok(transaction)
    }

    /// Credit an account from outside the ledger. No credential; blocked
    /// accounts still accept credits.
    pub async fn deposit(
        &self,
        command: DepositCommand,
        context: &OperationContext,
    ) -> AppResult<Transaction> {
        let amount: Amount = command.amount.parse()?;
        let number = command.account;

        let transaction = self
            .execute(vec![RecordKey::Account(number)], |uow| {
                let mut account = uow.load_account(number)?;
                account.deposit(&amount)?;
                uow.save(account);
                Ok(NewTransaction::new(
                    amount,
                    TransactionKind::Credit,
                    InstrumentRef::Account(number),
                    None,
                ))
            })
            .await?;

        tracing::info!(
            transaction_id = %transaction.id(),
            account = %number,
            amount = %amount,
            correlation_id = ?context.correlation_id,
            "Deposit committed"
        );

        self.notify_parties(&transaction);
        Ok(transaction)
    }

    /// Take money out of an account
    pub async fn withdraw(
        &self,
        command: WithdrawCommand,
        context: &OperationContext,
    ) -> AppResult<Transaction> {
        let amount: Amount = command.amount.parse()?;
        let pin = Pin::parse(&command.pin)?;
        let number = command.account;

        let transaction = self
            .execute(vec![RecordKey::Account(number)], |uow| {
                let mut account = uow.load_account(number)?;
                AuthenticationGuard::authorize_debit(&account, &pin)?;
                account.withdraw(&amount)?;
                uow.save(account);
                Ok(NewTransaction::new(
                    amount,
                    TransactionKind::Debit,
                    InstrumentRef::Account(number),
                    None,
                ))
            })
            .await?;

        tracing::info!(
            transaction_id = %transaction.id(),
            account = %number,
            amount = %amount,
            correlation_id = ?context.correlation_id,
            "Withdrawal committed"
        );

        self.notify_parties(&transaction);
        Ok(transaction)
    }

    // =========================================================================
    // Transaction log reads
    // =========================================================================

    pub fn transaction(&self, id: TransactionId) -> AppResult<Transaction> {
        self.store
            .find_transaction(id)?
            .ok_or_else(|| DomainError::not_found("Transaction", id).into())
    }

    /// Rows where the instrument is source or counterparty, including rows
    /// of instruments that have since been deleted
    pub fn transactions_for(&self, instrument: InstrumentRef) -> AppResult<Vec<Transaction>> {
        Ok(self.store.transactions_for(instrument)?)
    }

    /// Rows that moved the account's balance: its own rows plus those of
    /// its current debit card. Credit card rows move the card's limit and
    /// stay on the card's own history. Once a card is deleted its rows are
    /// only reachable through the card number.
    pub fn account_statement(&self, number: AccountNumber) -> AppResult<Vec<Transaction>> {
        let mut instruments = vec![InstrumentRef::Account(number)];
        instruments.extend(
            self.store
                .cards_by_account(number)?
                .iter()
                .filter_map(|card| match card.key() {
                    RecordKey::DebitCard(card) => Some(InstrumentRef::DebitCard(card)),
                    _ => None,
                }),
        );
        Ok(self.store.transactions_involving(&instruments)?)
    }

    pub fn all_transactions(&self) -> AppResult<Vec<Transaction>> {
        Ok(self.store.all_transactions()?)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run `stage` in a fresh unit of work under the instrument locks,
    /// retrying optimistic conflicts with linear backoff.
    async fn execute<F>(&self, keys: Vec<RecordKey>, stage: F) -> AppResult<Transaction>
    where
        F: Fn(&mut UnitOfWork<'_>) -> AppResult<NewTransaction> + Send + Sync,
    {
        self.locks
            .run(
                &keys,
                self.settings.max_retries,
                self.settings.retry_backoff,
                || self.try_execute(&stage),
            )
            .await
    }

    fn try_execute<F>(&self, stage: &F) -> AppResult<Transaction>
    where
        F: Fn(&mut UnitOfWork<'_>) -> AppResult<NewTransaction>,
    {
        let mut uow = UnitOfWork::begin(self.store.as_ref());
        let row = stage(&mut uow)?;
        uow.append(row);

        uow.commit()?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("Commit returned no transaction".to_string()))
    }

    /// Every record a transfer will write, so the locks cover it.
    ///
    /// A debit card spends from its linked account, which is resolved here.
    /// Card-to-account links never change, so the lookup cannot go stale.
    fn lock_keys(&self, direction: &TransferDirection) -> AppResult<Vec<RecordKey>> {
        let source = RecordKey::from(direction.source());
        let target = RecordKey::from(direction.target());

        let mut keys = vec![source, target];
        if let TransferDirection::DebitCardToAccount { card, .. } = direction {
            let linked = self
                .store
                .find(&source)?
                .and_then(|found| found.record.linked_account())
                .ok_or_else(|| DomainError::not_found("Debit card", card.masked()))?;
            keys.push(RecordKey::Account(linked));
        }
        Ok(keys)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Queue a debited alert for the source and a credited alert for the
    /// counterparty. Runs after commit, outside the locks.
    fn notify_parties(&self, transaction: &Transaction) {
        let parties = match transaction.kind() {
            TransactionKind::Credit => vec![(transaction.source(), NotificationKind::Credited)],
            TransactionKind::Debit => vec![(transaction.source(), NotificationKind::Debited)],
            _ => {
                let mut parties = vec![(transaction.source(), NotificationKind::Debited)];
                if let Some(counterparty) = transaction.counterparty() {
                    parties.push((counterparty, NotificationKind::Credited));
                }
                parties
            }
        };

        for (instrument, kind) in parties {
            match self.owner_address(instrument) {
                Ok(address) => self.notifier.notify(Notification {
                    address,
                    kind,
                    amount: *transaction.amount(),
                    masked_instrument: instrument.masked(),
                    transaction_id: transaction.id(),
                }),
                Err(e) => tracing::warn!(
                    transaction_id = %transaction.id(),
                    instrument = %instrument,
                    error = %e,
                    "Could not resolve notification address"
                ),
            }
        }
    }

    /// E-mail of the customer owning `instrument` (via the linked account for cards)
    fn owner_address(&self, instrument: InstrumentRef) -> AppResult<String> {
        let mut uow = UnitOfWork::begin(self.store.as_ref());
        let account_number = match instrument {
            InstrumentRef::Account(number) => number,
            InstrumentRef::DebitCard(number) => uow.load_debit_card(number)?.account_number(),
            InstrumentRef::CreditCard(number) => uow.load_credit_card(number)?.account_number(),
        };
        let account = uow.load_account(account_number)?;
        let customer = uow.load_customer(account.customer_id())?;
        Ok(customer.email().to_string())
    }
}

// =========================================================================
// Staging per direction
// =========================================================================

/// Validate and stage one transfer. Nothing is staged unless every check
/// has passed.
fn stage_transfer(
    uow: &mut UnitOfWork<'_>,
    direction: TransferDirection,
    amount: Amount,
    pin: &Pin,
) -> AppResult<NewTransaction> {
    match direction {
        TransferDirection::DebitCardToAccount { card, account } => {
            let card = uow.load_debit_card(card)?;
            AuthenticationGuard::authorize_debit(&card, pin)?;

            let mut funding = uow.load_account(card.account_number())?;
            ensure_not_blocked(&funding)?;
            if funding.number() == account {
                return Err(DomainError::SelfTransfer.into());
            }

            let mut target = uow.load_account(account)?;
            funding.withdraw(&amount)?;
            target.deposit(&amount)?;
            uow.save(funding);
            uow.save(target);
        }
        TransferDirection::CreditCardToAccount { card, account } => {
            let mut card = uow.load_credit_card(card)?;
            AuthenticationGuard::authorize_debit(&card, pin)?;

            let mut target = uow.load_account(account)?;
            card.charge(&amount)?;
            target.deposit(&amount)?;
            uow.save(card);
            uow.save(target);
        }
        TransferDirection::AccountToCreditCard { account, card } => {
            let mut source = uow.load_account(account)?;
            AuthenticationGuard::authorize_debit(&source, pin)?;

            let mut card = uow.load_credit_card(card)?;
            // Both checks run before either record changes
            card.repay(&amount)?;
            source.withdraw(&amount)?;
            uow.save(source);
            uow.save(card);
        }
        TransferDirection::AccountToAccount { from, to } => {
            if from == to {
                return Err(DomainError::SelfTransfer.into());
            }
            let mut source = uow.load_account(from)?;
            AuthenticationGuard::authorize_debit(&source, pin)?;

            let mut target = uow.load_account(to)?;
            source.withdraw(&amount)?;
            target.deposit(&amount)?;
            uow.save(source);
            uow.save(target);
        }
    }

    Ok(NewTransaction::new(
        amount,
        direction.kind(),
        direction.source(),
        Some(direction.target()),
    ))
}

fn ensure_not_blocked(instrument: &dyn Instrument) -> Result<(), DomainError> {
    if instrument.is_blocked() {
        let instrument = instrument.instrument_ref();
        tracing::warn!(instrument = %instrument, "Debit rejected: funding account is blocked");
        return Err(DomainError::Blocked { instrument });
    }
    Ok(())
}
