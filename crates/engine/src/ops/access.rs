//! Ownership lookups shared by the operation modules.
//!
//! Every mutation resolves the acting user to their shop and re-reads the
//! target rows inside the surrounding transaction, so ownership checks and
//! status guards see the same snapshot the write will act on.

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, memberships, memberships::MembershipStatus, orders,
    orders::OrderStatus, shops, subscriptions, transactions, wallets,
};

use super::Engine;

impl Engine {
    pub(super) async fn require_shop_for_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<shops::Model> {
        shops::Entity::find()
            .filter(shops::Column::OwnerUserId.eq(user_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("shop not exists".to_string()))
    }

    pub(super) async fn require_order_for_shop(
        &self,
        db: &DatabaseTransaction,
        shop_id: &str,
        order_id: Uuid,
    ) -> ResultEngine<orders::Model> {
        orders::Entity::find_by_id(order_id.to_string())
            .filter(orders::Column::ShopId.eq(shop_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("order not owned by this shop".to_string()))
    }

    /// Same as [`require_order_for_shop`] but restricted to orders still open
    /// for fulfillment work (PENDING or IN_PROCESS).
    ///
    /// [`require_order_for_shop`]: Engine::require_order_for_shop
    pub(super) async fn require_open_order_for_shop(
        &self,
        db: &DatabaseTransaction,
        shop_id: &str,
        order_id: Uuid,
    ) -> ResultEngine<orders::Model> {
        orders::Entity::find_by_id(order_id.to_string())
            .filter(orders::Column::ShopId.eq(shop_id.to_string()))
            .filter(orders::Column::Status.is_in([
                OrderStatus::Pending.as_str(),
                OrderStatus::InProcess.as_str(),
            ]))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("order not owned by this shop".to_string()))
    }

    pub(super) async fn require_wallet_for_owner(
        &self,
        db: &DatabaseTransaction,
        owner_user_id: &str,
    ) -> ResultEngine<wallets::Model> {
        wallets::Entity::find()
            .filter(wallets::Column::OwnerUserId.eq(owner_user_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("wallet not exists".to_string()))
    }

    pub(super) async fn require_transaction(
        &self,
        db: &DatabaseTransaction,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("transaction not exists".to_string()))
    }

    pub(super) async fn require_subscription(
        &self,
        db: &DatabaseTransaction,
        subscription_id: Uuid,
    ) -> ResultEngine<subscriptions::Model> {
        subscriptions::Entity::find_by_id(subscription_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("subscription not exists".to_string()))
    }

    pub(super) async fn active_membership_for_shop(
        &self,
        db: &DatabaseTransaction,
        shop_id: &str,
    ) -> ResultEngine<Option<memberships::Model>> {
        memberships::Entity::find()
            .filter(memberships::Column::ShopId.eq(shop_id.to_string()))
            .filter(memberships::Column::Status.eq(MembershipStatus::Active.as_str()))
            .one(db)
            .await
            .map_err(Into::into)
    }
}
