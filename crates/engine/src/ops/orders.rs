//! Shop and order lifecycle operations.
//!
//! The order status is the top of the fulfillment cascade: acceptance moves
//! it to IN_PROCESS, the progression engine completes it when the last
//! milestone closes (see `fulfillment`), and cancellation closes it together
//! with everything still open underneath it.

use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Order, ResultEngine, milestones, milestones::ProgressStatus, orders,
    orders::OrderStatus, shops, tasks, util::ensure_positive_amount,
};

use super::{Engine, normalize_required_name, with_tx};

impl Engine {
    /// Register a shop for an external account. One shop per account.
    pub async fn create_shop(&self, owner_user_id: &str, name: &str) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "shop")?;
        with_tx!(self, |db_tx| {
            let exists = shops::Entity::find()
                .filter(shops::Column::OwnerUserId.eq(owner_user_id.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::InvalidOperation(
                    "shop already registered for this account".to_string(),
                ));
            }

            let shop_id = Uuid::new_v4();
            let active = shops::ActiveModel {
                id: ActiveValue::Set(shop_id.to_string()),
                owner_user_id: ActiveValue::Set(owner_user_id.to_string()),
                name: ActiveValue::Set(name),
            };
            active.insert(&db_tx).await?;
            Ok(shop_id)
        })
    }

    /// Record a new order against a shop. Intake happens upstream; the
    /// engine only needs the shop and the agreed amount.
    pub async fn create_order(&self, shop_id: Uuid, amount_minor: i64) -> ResultEngine<Uuid> {
        ensure_positive_amount(amount_minor, "order amount_minor")?;
        with_tx!(self, |db_tx| {
            let shop = shops::Entity::find_by_id(shop_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("shop not exists".to_string()))?;

            let order_id = Uuid::new_v4();
            let active = orders::ActiveModel {
                id: ActiveValue::Set(order_id.to_string()),
                shop_id: ActiveValue::Set(shop.id),
                status: ActiveValue::Set(OrderStatus::Pending.as_str().to_string()),
                amount_minor: ActiveValue::Set(amount_minor),
                created_at: ActiveValue::Set(Utc::now()),
            };
            active.insert(&db_tx).await?;
            Ok(order_id)
        })
    }

    /// Shop accepts the order and fulfillment starts.
    pub async fn accept_order(&self, user_id: &str, order_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let order = self.require_order_for_shop(&db_tx, &shop.id, order_id).await?;

            let status = OrderStatus::try_from(order.status.as_str())?;
            status.validate_transition(OrderStatus::InProcess)?;

            set_order_status(&db_tx, &order.id, OrderStatus::InProcess).await?;
            Ok(())
        })
    }

    /// Cancel an order from any non-terminal state, closing every milestone
    /// and task still open underneath it.
    pub async fn cancel_order(&self, user_id: &str, order_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let order = self.require_order_for_shop(&db_tx, &shop.id, order_id).await?;

            let status = OrderStatus::try_from(order.status.as_str())?;
            status.validate_transition(OrderStatus::Cancelled)?;

            let milestone_models = milestones::Entity::find()
                .filter(milestones::Column::OrderId.eq(order.id.clone()))
                .all(&db_tx)
                .await?;
            for milestone in &milestone_models {
                let milestone_status = ProgressStatus::try_from(milestone.status.as_str())?;
                if !milestone_status.is_terminal() {
                    let active = milestones::ActiveModel {
                        id: ActiveValue::Set(milestone.id.clone()),
                        status: ActiveValue::Set(ProgressStatus::Cancelled.as_str().to_string()),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;
                }

                let task_models = tasks::Entity::find()
                    .filter(tasks::Column::MilestoneId.eq(milestone.id.clone()))
                    .all(&db_tx)
                    .await?;
                for task in task_models {
                    let task_status = ProgressStatus::try_from(task.status.as_str())?;
                    if !task_status.is_terminal() {
                        let active = tasks::ActiveModel {
                            id: ActiveValue::Set(task.id),
                            status: ActiveValue::Set(
                                ProgressStatus::Cancelled.as_str().to_string(),
                            ),
                            ..Default::default()
                        };
                        active.update(&db_tx).await?;
                    }
                }
            }

            set_order_status(&db_tx, &order.id, OrderStatus::Cancelled).await?;
            tracing::info!(order_id = %order.id, "order cancelled");
            Ok(())
        })
    }

    /// Return an order snapshot, scoped to the caller's shop.
    pub async fn order(&self, user_id: &str, order_id: Uuid) -> ResultEngine<Order> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let model = self.require_order_for_shop(&db_tx, &shop.id, order_id).await?;
            Order::try_from(model)
        })
    }
}

pub(super) async fn set_order_status(
    db: &sea_orm::DatabaseTransaction,
    order_id: &str,
    status: OrderStatus,
) -> ResultEngine<()> {
    let active = orders::ActiveModel {
        id: ActiveValue::Set(order_id.to_string()),
        status: ActiveValue::Set(status.as_str().to_string()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}
