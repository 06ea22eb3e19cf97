//! End-to-end transfer scenarios against the in-memory backends

use serde_json::json;
use std::sync::Arc;
use tandem_account::{AccountError, AccountRecord, AccountStore, Item, MemoryAccountStore};
use tandem_common::{CancellationToken, TransactionState, TransferRequest};
use tandem_coordinator::{Callback, Coordinator, CoordinatorError};
use tandem_log::{MemoryTransactionLog, TransactionLog};

type TestCoordinator = Coordinator<MemoryTransactionLog, MemoryAccountStore>;

async fn setup(
    balances: &[(&str, i64)],
) -> (
    TestCoordinator,
    Arc<MemoryTransactionLog>,
    Arc<MemoryAccountStore>,
) {
    let log = Arc::new(MemoryTransactionLog::new());
    let accounts = Arc::new(MemoryAccountStore::new());
    let token = CancellationToken::new();

    for (account_id, balance) in balances {
        accounts
            .put(
                &token,
                AccountRecord::new(*account_id).with_resource(Item::new("gold", *balance)),
            )
            .await
            .unwrap();
    }

    (
        Coordinator::new(Arc::clone(&log), Arc::clone(&accounts)),
        log,
        accounts,
    )
}

fn transfer(source: &str, destination: &str, amount: i64) -> TransferRequest {
    TransferRequest::new(source, destination, json!({"id": "gold", "amount": amount}))
}

async fn balance(accounts: &MemoryAccountStore, account_id: &str) -> i64 {
    let token = CancellationToken::new();
    accounts.get(&token, account_id).await.unwrap().resources["gold"].amount
}

async fn pending_count(accounts: &MemoryAccountStore, account_id: &str) -> usize {
    let token = CancellationToken::new();
    accounts
        .get(&token, account_id)
        .await
        .unwrap()
        .pending_transactions
        .len()
}

#[tokio::test]
async fn test_happy_path() {
    let (coordinator, log, accounts) = setup(&[("a1", 30), ("a2", 30)]).await;
    let token = CancellationToken::new();

    let response = coordinator
        .start_transaction(&token, transfer("a1", "a2", 10), Vec::new())
        .await
        .unwrap();

    assert_eq!(balance(&accounts, "a1").await, 20);
    assert_eq!(balance(&accounts, "a2").await, 40);
    assert_eq!(pending_count(&accounts, "a1").await, 0);
    assert_eq!(pending_count(&accounts, "a2").await, 0);

    let record = log.get(&token, response.transaction_id).await.unwrap();
    assert_eq!(record.state, TransactionState::Done);
    assert_eq!(record.reference, "a1:a2");
    assert_eq!(response.last_modified, record.last_modified.timestamp());
}

#[tokio::test]
async fn test_insufficient_balance_rolls_back() {
    let (coordinator, log, accounts) = setup(&[("a1", 5), ("a2", 30)]).await;
    let token = CancellationToken::new();

    let err = coordinator
        .start_transaction(&token, transfer("a1", "a2", 10), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Account(AccountError::InsufficientBalance { .. })
    ));

    // Nothing stuck: balances intact and the record is terminal
    assert_eq!(balance(&accounts, "a1").await, 5);
    assert_eq!(balance(&accounts, "a2").await, 30);
    let cancelled = log
        .scan_by_state(&token, TransactionState::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
}

#[tokio::test]
async fn test_callback_failure_cancels() {
    let (coordinator, log, accounts) = setup(&[("a1", 30), ("a2", 30)]).await;
    let token = CancellationToken::new();

    let callback: Callback = Box::new(|| Err("fraud screen rejected the transfer".into()));
    let err = coordinator
        .start_transaction(&token, transfer("a1", "a2", 10), vec![callback])
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Callback(_)));

    assert_eq!(balance(&accounts, "a1").await, 30);
    assert_eq!(balance(&accounts, "a2").await, 30);
    assert_eq!(pending_count(&accounts, "a1").await, 0);
    assert_eq!(pending_count(&accounts, "a2").await, 0);
    let cancelled = log
        .scan_by_state(&token, TransactionState::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
}

#[tokio::test]
async fn test_payload_mismatch_strands_in_canceling() {
    let (coordinator, log, accounts) = setup(&[("a1", 30), ("a2", 30)]).await;
    let token = CancellationToken::new();

    let bad = TransferRequest::new("a1", "a2", json!("ten gold pieces"));
    let err = coordinator
        .start_transaction(&token, bad, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Account(AccountError::PayloadType(_))
    ));

    // Rollback cannot interpret the payload either, so the record stays
    // in Canceling; no balance ever moved
    assert_eq!(balance(&accounts, "a1").await, 30);
    assert_eq!(balance(&accounts, "a2").await, 30);
    let canceling = log
        .scan_by_state(&token, TransactionState::Canceling)
        .await
        .unwrap();
    assert_eq!(canceling.len(), 1);
}

#[tokio::test]
async fn test_get_transactions_prefix_queries() {
    let (coordinator, _log, _accounts) = setup(&[("a1", 30), ("a2", 30), ("a3", 30)]).await;
    let token = CancellationToken::new();

    coordinator
        .start_transaction(&token, transfer("a1", "a2", 5), Vec::new())
        .await
        .unwrap();
    coordinator
        .start_transaction(&token, transfer("a1", "a3", 5), Vec::new())
        .await
        .unwrap();

    let all_from_a1 = coordinator
        .get_transactions(&token, TransactionState::Done, "a1:")
        .await
        .unwrap();
    assert_eq!(all_from_a1.len(), 2);

    let to_a3 = coordinator
        .get_transactions(&token, TransactionState::Done, "a1:a3")
        .await
        .unwrap();
    assert_eq!(to_a3.len(), 1);
    assert_eq!(to_a3[0].destination, "a3");

    let none = coordinator
        .get_transactions(&token, TransactionState::Done, "b")
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_cancelled_caller_leaves_no_trace() {
    let (coordinator, log, accounts) = setup(&[("a1", 30), ("a2", 30)]).await;
    let token = CancellationToken::new();
    token.cancel();

    let err = coordinator
        .start_transaction(&token, transfer("a1", "a2", 10), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Cancelled));

    let live = CancellationToken::new();
    assert!(
        log.scan_by_state(&live, TransactionState::Pending)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(balance(&accounts, "a1").await, 30);
    assert_eq!(balance(&accounts, "a2").await, 30);
}
