//! Load Testing Tool
//!
//! Drives concurrent account-to-account transfers against an in-process
//! ledger and checks that the total balance is conserved.
//!
//! Run with: cargo run --bin load_test --release -- --transfers 10000 --tasks 16

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use rust_decimal::Decimal;

use banking_core::domain::{AccountNumber, AccountType, OperationContext};
use banking_core::ledger::{
    DepositCommand, InstrumentLocks, LedgerEngine, LedgerSettings, TransferCommand,
    TransferDirection,
};
use banking_core::notify::{LogNotifier, NotificationDispatcher};
use banking_core::provisioning::{
    CreateCustomerCommand, OpenAccountCommand, ProvisioningService, ProvisioningSettings,
};
use banking_core::store::{InMemoryStore, InstrumentStore};

const ACCOUNTS: usize = 8;
const PIN: &str = "1234";
const OPENING_BALANCE: &str = "1000.00";

fn arg(args: &[String], name: &str, default: usize) -> usize {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let transfer_count = arg(&args, "--transfers", 1000);
    let task_count = arg(&args, "--tasks", 8).max(1);

    println!(
        "Load Test - {} transfers across {} accounts on {} tasks",
        transfer_count, ACCOUNTS, task_count
    );

    let store: Arc<dyn InstrumentStore> = Arc::new(InMemoryStore::new());
    let (notifier, notifications) = NotificationDispatcher::spawn(Arc::new(LogNotifier), 4096);
    let settings = LedgerSettings {
        max_retries: 10,
        ..LedgerSettings::default()
    };
    let locks = Arc::new(InstrumentLocks::new());
    let ledger = Arc::new(LedgerEngine::new(store.clone(), locks.clone(), notifier, settings));
    let provisioning = ProvisioningService::new(store, locks, ProvisioningSettings::default());
    let context = OperationContext::new();

    let mut accounts: Vec<AccountNumber> = Vec::with_capacity(ACCOUNTS);
    for i in 0..ACCOUNTS {
        let customer = provisioning
            .create_customer(CreateCustomerCommand::new(
                format!("Load Customer {}", i),
                format!("load{}@example.com", i),
            ))
            .await?;
        let account = provisioning
            .open_account(OpenAccountCommand::new(customer.id(), AccountType::Current, PIN))
            .await?;
        ledger
            .deposit(DepositCommand::new(account.number(), OPENING_BALANCE), &context)
            .await?;
        accounts.push(account.number());
    }

    let total_before = total_balance(&provisioning, &accounts)?;
    let accounts = Arc::new(accounts);
    let start = Instant::now();

    let mut tasks = Vec::with_capacity(task_count);
    for task in 0..task_count {
        let ledger = ledger.clone();
        let accounts = accounts.clone();
        let share = transfer_count / task_count + usize::from(task < transfer_count % task_count);

        tasks.push(tokio::spawn(async move {
            let context = OperationContext::new();
            let (mut succeeded, mut rejected) = (0u64, 0u64);

            for _ in 0..share {
                let (from, to, amount) = {
                    let mut rng = rand::thread_rng();
                    let from = rng.gen_range(0..accounts.len());
                    let offset = rng.gen_range(1..accounts.len());
                    let cents: i64 = rng.gen_range(1..=50_000);
                    (
                        accounts[from],
                        accounts[(from + offset) % accounts.len()],
                        Decimal::new(cents, 2),
                    )
                };

                let command = TransferCommand::new(
                    TransferDirection::AccountToAccount { from, to },
                    amount.to_string(),
                    PIN,
                );
                match ledger.transfer(command, &context).await {
                    Ok(_) => succeeded += 1,
                    Err(_) => rejected += 1,
                }
            }

            (succeeded, rejected)
        }));
    }

    let (mut succeeded, mut rejected) = (0u64, 0u64);
    for task in tasks {
        let (ok, failed) = task.await?;
        succeeded += ok;
        rejected += failed;
    }

    let elapsed = start.elapsed();
    let total_after = total_balance(&provisioning, &accounts)?;
    let rows = ledger.all_transactions()?.len();

    println!("\n=== Load Test Results ===");
    println!("Total transfers: {}", transfer_count);
    println!("Committed: {}", succeeded);
    println!("Rejected: {}", rejected);
    println!("Transaction rows: {}", rows);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!(
        "Rate: {:.0} transfers/sec",
        transfer_count as f64 / elapsed.as_secs_f64()
    );
    println!("Total before: {}", total_before);
    println!("Total after: {}", total_after);

    drop(ledger);
    notifications.await?;

    if total_before != total_after {
        anyhow::bail!("balance not conserved: {} != {}", total_before, total_after);
    }
    if rows as u64 != succeeded + ACCOUNTS as u64 {
        anyhow::bail!("expected one transaction row per committed operation");
    }

    Ok(())
}

fn total_balance(
    provisioning: &ProvisioningService,
    accounts: &[AccountNumber],
) -> anyhow::Result<Decimal> {
    let mut total = Decimal::ZERO;
    for number in accounts {
        total += provisioning.account(*number)?.balance().value();
    }
    Ok(total)
}
