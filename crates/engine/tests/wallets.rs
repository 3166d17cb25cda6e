use sea_orm::{Database, DatabaseConnection};

use engine::{BalanceKind, Engine, EngineError, TransactionKind, TransactionStatus};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn funded_wallet(engine: &Engine, owner: &str, amount_minor: i64) {
    engine.open_wallet(owner).await.unwrap();
    let tx_id = engine.deposit(owner, amount_minor, None).await.unwrap();
    engine.confirm_deposit(tx_id).await.unwrap();
}

#[tokio::test]
async fn one_wallet_per_account() {
    let (engine, _db) = engine_with_db().await;
    engine.open_wallet("alice").await.unwrap();

    let err = engine.open_wallet("alice").await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidOperation("wallet already opened for this account".to_string())
    );
}

#[tokio::test]
async fn deposit_confirm_credits_exactly_once() {
    let (engine, _db) = engine_with_db().await;
    engine.open_wallet("alice").await.unwrap();

    let tx_id = engine
        .deposit("alice", 600_000, Some("top up"))
        .await
        .unwrap();

    // Nothing moves until the gateway confirms.
    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.available_minor, 0);

    engine.confirm_deposit(tx_id).await.unwrap();
    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.available_minor, 600_000);

    // A retried callback finds a settled row and fails instead of
    // double-crediting.
    let err = engine.confirm_deposit(tx_id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("deposit not pending".to_string())
    );
    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.available_minor, 600_000);
}

#[tokio::test]
async fn failed_deposit_never_credits() {
    let (engine, _db) = engine_with_db().await;
    engine.open_wallet("alice").await.unwrap();

    let tx_id = engine.deposit("alice", 600_000, None).await.unwrap();
    engine.fail_deposit(tx_id).await.unwrap();

    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.available_minor, 0);

    let txs = engine.transactions_for_wallet("alice", 10).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].status, TransactionStatus::Failed);

    let err = engine.confirm_deposit(tx_id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("deposit not pending".to_string())
    );
}

#[tokio::test]
async fn withdrawal_debits_only_on_approval() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 600_000).await;

    let tx_id = engine
        .request_withdrawal("alice", 200_000, Some("rent"))
        .await
        .unwrap();

    // The request only records the intent.
    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.available_minor, 600_000);

    engine.approve_withdrawal("staff", tx_id).await.unwrap();
    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.available_minor, 400_000);

    let err = engine.approve_withdrawal("staff", tx_id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("withdrawal not pending".to_string())
    );
}

#[tokio::test]
async fn withdrawal_request_rejects_overdraft() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 100_000).await;

    let err = engine
        .request_withdrawal("alice", 200_000, None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds("alice".to_string()));

    let txs = engine.transactions_for_wallet("alice", 10).await.unwrap();
    assert_eq!(txs.len(), 1); // only the funding deposit
}

#[tokio::test]
async fn cancelled_withdrawal_moves_nothing() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 600_000).await;

    let tx_id = engine
        .request_withdrawal("alice", 200_000, None)
        .await
        .unwrap();
    engine.cancel_withdrawal("staff", tx_id).await.unwrap();

    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.available_minor, 600_000);

    let err = engine.approve_withdrawal("staff", tx_id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("withdrawal not pending".to_string())
    );
}

#[tokio::test]
async fn pay_order_locks_funds_and_records_the_order() {
    let (engine, _db) = engine_with_db().await;
    let shop_id = engine.create_shop("alice", "Atelier Blanc").await.unwrap();
    let order_id = engine.create_order(shop_id, 450_000).await.unwrap();
    funded_wallet(&engine, "bea", 600_000).await;

    engine.pay_order("bea", order_id, 450_000).await.unwrap();

    let wallet = engine.wallet("bea").await.unwrap();
    assert_eq!(wallet.available_minor, 150_000);
    assert_eq!(wallet.locked_minor, 450_000);

    let txs = engine.transactions_for_wallet("bea", 10).await.unwrap();
    let payment = txs
        .iter()
        .find(|tx| tx.kind == TransactionKind::Payment)
        .unwrap();
    assert_eq!(payment.status, TransactionStatus::Completed);
    assert_eq!(payment.from_balance, BalanceKind::Available);
    assert_eq!(payment.to_balance, BalanceKind::Locked);
    assert_eq!(payment.order_id, Some(order_id));
}

#[tokio::test]
async fn pay_order_rejects_overdraft_and_closed_orders() {
    let (engine, _db) = engine_with_db().await;
    let shop_id = engine.create_shop("alice", "Atelier Blanc").await.unwrap();
    let order_id = engine.create_order(shop_id, 450_000).await.unwrap();
    funded_wallet(&engine, "bea", 100_000).await;

    let err = engine.pay_order("bea", order_id, 450_000).await.unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds("bea".to_string()));
    let wallet = engine.wallet("bea").await.unwrap();
    assert_eq!(wallet.available_minor, 100_000);
    assert_eq!(wallet.locked_minor, 0);

    engine.cancel_order("alice", order_id).await.unwrap();
    let err = engine.pay_order("bea", order_id, 50_000).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidState("order already closed".to_string())
    );
}

#[tokio::test]
async fn ledger_explains_the_balance_pair() {
    let (engine, _db) = engine_with_db().await;
    let shop_id = engine.create_shop("alice", "Atelier Blanc").await.unwrap();
    let order_id = engine.create_order(shop_id, 300_000).await.unwrap();

    funded_wallet(&engine, "bea", 1_000_000).await;
    engine.deposit("bea", 50_000, None).await.unwrap(); // stays pending
    let withdrawal = engine
        .request_withdrawal("bea", 200_000, None)
        .await
        .unwrap();
    engine.approve_withdrawal("staff", withdrawal).await.unwrap();
    engine.pay_order("bea", order_id, 300_000).await.unwrap();

    let wallet = engine.wallet("bea").await.unwrap();
    assert_eq!(wallet.available_minor, 500_000);
    assert_eq!(wallet.locked_minor, 300_000);

    // Replay COMPLETED rows: they must reproduce the stored balances.
    let txs = engine.transactions_for_wallet("bea", 50).await.unwrap();
    let mut available = 0i64;
    let mut locked = 0i64;
    for tx in txs
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Completed)
    {
        match tx.kind {
            TransactionKind::Deposit => available += tx.amount_minor,
            TransactionKind::Withdraw => available -= tx.amount_minor,
            _ => {
                if tx.from_balance == BalanceKind::Available
                    && tx.to_balance == BalanceKind::Locked
                {
                    available -= tx.amount_minor;
                    locked += tx.amount_minor;
                }
            }
        }
    }
    assert_eq!(available, wallet.available_minor);
    assert_eq!(locked, wallet.locked_minor);
}

#[tokio::test]
async fn non_positive_amounts_never_reach_the_ledger() {
    let (engine, _db) = engine_with_db().await;
    engine.open_wallet("alice").await.unwrap();

    assert!(engine.deposit("alice", 0, None).await.is_err());
    assert!(engine.request_withdrawal("alice", -5, None).await.is_err());

    let txs = engine.transactions_for_wallet("alice", 10).await.unwrap();
    assert!(txs.is_empty());
}
