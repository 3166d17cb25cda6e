//! Wallet operations and the ledger invariant.
//!
//! Every balance change here pairs with exactly one new transaction row;
//! there is no bare "set balance" path. Deposits and withdrawals are
//! two-phase (a PENDING intent, settled by the gateway callback or a staff
//! decision); order payments settle immediately as an available→locked
//! movement on the payer's wallet.

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    BalanceKind, EngineError, ResultEngine, Transaction, TransactionKind, TransactionStatus,
    Wallet, orders, orders::OrderStatus, transactions, util::ensure_positive_amount,
    util::parse_uuid, wallets,
};

use super::{Engine, normalize_optional_text, with_tx};

/// Label used for the platform-side of deposits confirmed by the gateway.
const GATEWAY_LABEL: &str = "payment_gateway";
/// Label used for the payout side of withdrawals.
const PAYOUT_LABEL: &str = "payout";
/// Label used for funds committed to the platform (orders, memberships).
pub(super) const PLATFORM_LABEL: &str = "platform";

impl Engine {
    /// Open a wallet for an account. One wallet per account.
    pub async fn open_wallet(&self, owner_user_id: &str) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let exists = wallets::Entity::find()
                .filter(wallets::Column::OwnerUserId.eq(owner_user_id.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::InvalidOperation(
                    "wallet already opened for this account".to_string(),
                ));
            }

            let wallet = Wallet::new(owner_user_id.to_string());
            let wallet_id = wallet.id;
            let active: wallets::ActiveModel = (&wallet).into();
            active.insert(&db_tx).await?;
            Ok(wallet_id)
        })
    }

    /// Return a wallet snapshot from DB.
    pub async fn wallet(&self, owner_user_id: &str) -> ResultEngine<Wallet> {
        with_tx!(self, |db_tx| {
            let model = self.require_wallet_for_owner(&db_tx, owner_user_id).await?;
            Wallet::try_from(model)
        })
    }

    /// Record a deposit intent. The gateway confirms (or fails) it later;
    /// no balance moves until then.
    pub async fn deposit(
        &self,
        user_id: &str,
        amount_minor: i64,
        note: Option<&str>,
    ) -> ResultEngine<Uuid> {
        ensure_positive_amount(amount_minor, "deposit amount_minor")?;
        let note = normalize_optional_text(note);
        with_tx!(self, |db_tx| {
            let wallet = self.require_wallet_for_owner(&db_tx, user_id).await?;
            let tx = Transaction::new(
                parse_uuid(&wallet.id, "wallet")?,
                GATEWAY_LABEL.to_string(),
                user_id.to_string(),
                BalanceKind::Available,
                BalanceKind::Available,
                TransactionKind::Deposit,
                TransactionStatus::Pending,
                amount_minor,
                note,
                Utc::now(),
            )?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok(tx.id)
        })
    }

    /// Gateway callback: settle a pending deposit and credit the wallet.
    ///
    /// The PENDING guard makes the credit happen exactly once; a retried
    /// callback finds a COMPLETED row and fails instead of double-crediting.
    pub async fn confirm_deposit(&self, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, transaction_id).await?;
            require_pending(&tx, TransactionKind::Deposit, "deposit")?;

            let wallet = require_wallet_by_id(&db_tx, &tx.wallet_id).await?;
            let active = wallets::ActiveModel {
                id: ActiveValue::Set(wallet.id),
                available_minor: ActiveValue::Set(wallet.available_minor + tx.amount_minor),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            set_transaction_status(&db_tx, &tx.id, TransactionStatus::Completed).await?;
            Ok(())
        })
    }

    /// Gateway callback: mark a pending deposit as failed. No credit.
    pub async fn fail_deposit(&self, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, transaction_id).await?;
            require_pending(&tx, TransactionKind::Deposit, "deposit")?;
            set_transaction_status(&db_tx, &tx.id, TransactionStatus::Failed).await?;
            Ok(())
        })
    }

    /// Record a withdrawal intent. OTP verification happens upstream; funds
    /// stay in place until staff approve.
    pub async fn request_withdrawal(
        &self,
        user_id: &str,
        amount_minor: i64,
        note: Option<&str>,
    ) -> ResultEngine<Uuid> {
        ensure_positive_amount(amount_minor, "withdrawal amount_minor")?;
        let note = normalize_optional_text(note);
        with_tx!(self, |db_tx| {
            let model = self.require_wallet_for_owner(&db_tx, user_id).await?;
            let wallet = Wallet::try_from(model)?;
            // Preview only; the debit happens at approval time.
            wallet.debit_available(amount_minor)?;

            let tx = Transaction::new(
                wallet.id,
                user_id.to_string(),
                PAYOUT_LABEL.to_string(),
                BalanceKind::Available,
                BalanceKind::Available,
                TransactionKind::Withdraw,
                TransactionStatus::Pending,
                amount_minor,
                note,
                Utc::now(),
            )?;
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok(tx.id)
        })
    }

    /// Staff approval: debit the available balance and settle the request.
    pub async fn approve_withdrawal(
        &self,
        staff_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, transaction_id).await?;
            require_pending(&tx, TransactionKind::Withdraw, "withdrawal")?;

            let model = require_wallet_by_id(&db_tx, &tx.wallet_id).await?;
            let wallet = Wallet::try_from(model)?;
            let new_available = wallet.debit_available(tx.amount_minor)?;
            let active = wallets::ActiveModel {
                id: ActiveValue::Set(wallet.id.to_string()),
                available_minor: ActiveValue::Set(new_available),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            set_transaction_status(&db_tx, &tx.id, TransactionStatus::Completed).await?;
            tracing::info!(staff_id, transaction_id = %tx.id, "withdrawal approved");
            Ok(())
        })
    }

    /// Staff rejection: close the request without moving funds.
    pub async fn cancel_withdrawal(
        &self,
        staff_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let tx = self.require_transaction(&db_tx, transaction_id).await?;
            require_pending(&tx, TransactionKind::Withdraw, "withdrawal")?;
            set_transaction_status(&db_tx, &tx.id, TransactionStatus::Cancelled).await?;
            tracing::info!(staff_id, transaction_id = %tx.id, "withdrawal cancelled");
            Ok(())
        })
    }

    /// Pay for an order: an immediate available→locked movement on the
    /// payer's wallet, settled in the same transaction that records it.
    pub async fn pay_order(
        &self,
        user_id: &str,
        order_id: Uuid,
        amount_minor: i64,
    ) -> ResultEngine<Uuid> {
        ensure_positive_amount(amount_minor, "payment amount_minor")?;
        with_tx!(self, |db_tx| {
            let order = orders::Entity::find_by_id(order_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("order not exists".to_string()))?;
            if OrderStatus::try_from(order.status.as_str())?.is_terminal() {
                return Err(EngineError::InvalidState("order already closed".to_string()));
            }

            let wallet = self.require_wallet_for_owner(&db_tx, user_id).await?;
            move_available_to_locked(&db_tx, &wallet, amount_minor).await?;

            let mut tx = Transaction::new(
                parse_uuid(&wallet.id, "wallet")?,
                user_id.to_string(),
                PLATFORM_LABEL.to_string(),
                BalanceKind::Available,
                BalanceKind::Locked,
                TransactionKind::Payment,
                TransactionStatus::Completed,
                amount_minor,
                None,
                Utc::now(),
            )?;
            tx.order_id = Some(order_id);
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok(tx.id)
        })
    }

    /// Recent ledger rows for a wallet, newest first.
    pub async fn transactions_for_wallet(
        &self,
        owner_user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, |db_tx| {
            let wallet = self.require_wallet_for_owner(&db_tx, owner_user_id).await?;
            let models = transactions::Entity::find()
                .filter(transactions::Column::WalletId.eq(wallet.id))
                .order_by_desc(transactions::Column::CreatedAt)
                .limit(limit)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                out.push(Transaction::try_from(model)?);
            }
            Ok(out)
        })
    }
}

/// Reserve funds on a wallet: debit available, credit locked.
pub(super) async fn move_available_to_locked(
    db: &DatabaseTransaction,
    wallet: &wallets::Model,
    amount_minor: i64,
) -> ResultEngine<()> {
    let snapshot = Wallet::try_from(wallet.clone())?;
    let new_available = snapshot.debit_available(amount_minor)?;
    let active = wallets::ActiveModel {
        id: ActiveValue::Set(wallet.id.clone()),
        available_minor: ActiveValue::Set(new_available),
        locked_minor: ActiveValue::Set(snapshot.locked_minor + amount_minor),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}

fn require_pending(
    tx: &transactions::Model,
    kind: TransactionKind,
    label: &str,
) -> ResultEngine<()> {
    if TransactionKind::try_from(tx.kind.as_str())? != kind
        || TransactionStatus::try_from(tx.status.as_str())? != TransactionStatus::Pending
    {
        return Err(EngineError::InvalidState(format!("{label} not pending")));
    }
    Ok(())
}

async fn require_wallet_by_id(
    db: &DatabaseTransaction,
    wallet_id: &str,
) -> ResultEngine<wallets::Model> {
    wallets::Entity::find_by_id(wallet_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("wallet not exists".to_string()))
}

async fn set_transaction_status(
    db: &DatabaseTransaction,
    transaction_id: &str,
    status: TransactionStatus,
) -> ResultEngine<()> {
    let active = transactions::ActiveModel {
        id: ActiveValue::Set(transaction_id.to_string()),
        status: ActiveValue::Set(status.as_str().to_string()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}
