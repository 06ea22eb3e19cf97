//! End-to-end transfer demo against the in-memory backends
//!
//! Seeds a few accounts, runs one transfer that completes and one that
//! gets rolled back, then sweeps the log.
//!
//! Run with: cargo run --example transfer

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tandem_account::{AccountRecord, AccountStore, Item, MemoryAccountStore};
use tandem_common::{CancellationToken, TransferRequest};
use tandem_coordinator::Coordinator;
use tandem_log::MemoryTransactionLog;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let token = CancellationToken::new();
    let log = Arc::new(MemoryTransactionLog::new());
    let accounts = Arc::new(MemoryAccountStore::new());

    for account_id in ["account1", "account2", "account3", "account4"] {
        accounts
            .put(
                &token,
                AccountRecord::new(account_id)
                    .with_resource(Item::new("item1", 100))
                    .with_resource(Item::new("item2", 100)),
            )
            .await?;
    }
    println!("seeded four accounts with 100 of item1 and item2 each");

    let coordinator = Coordinator::new(Arc::clone(&log), Arc::clone(&accounts));

    // A transfer that completes
    let request = TransferRequest::new(
        "account1",
        "account2",
        json!({"id": "item1", "amount": 10}),
    );
    let response = coordinator
        .start_transaction(&token, request, Vec::new())
        .await?;
    println!(
        "transfer {} committed at {}",
        response.transaction_id, response.last_modified
    );

    // A transfer that fails the balance precondition and is rolled back
    let overdraft = TransferRequest::new(
        "account3",
        "account4",
        json!({"id": "item1", "amount": 1000}),
    );
    match coordinator
        .start_transaction(&token, overdraft, Vec::new())
        .await
    {
        Ok(_) => println!("overdraft unexpectedly succeeded"),
        Err(err) => println!("overdraft rejected: {}", err),
    }

    // Sweep anything that has been sitting incomplete for ten seconds
    coordinator
        .recover_transactions(&token, Utc::now() - Duration::seconds(10))
        .await?;
    println!("recovery sweep finished");

    for account_id in ["account1", "account2", "account3", "account4"] {
        let account = accounts.get(&token, account_id).await?;
        println!(
            "{}: item1={} pending={}",
            account_id,
            account.resources["item1"].amount,
            account.pending_transactions.len()
        );
    }

    Ok(())
}
