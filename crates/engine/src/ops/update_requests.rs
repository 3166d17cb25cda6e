//! Price-adjustment requests and the stale-request sweep.
//!
//! An accepted request folds its surcharge into the order amount in the same
//! transaction that closes it, so the amount can never absorb a surcharge
//! twice. The sweep is the time-driven arm of the same state machine: it
//! rejects pending requests older than a fixed age.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, UpdateRequest, orders, update_requests,
    update_requests::UpdateRequestStatus, util::ensure_positive_amount, util::parse_uuid,
};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// File a surcharge request against an open order of the caller's shop.
    pub async fn create_update_request(
        &self,
        user_id: &str,
        order_id: Uuid,
        surcharge_minor: i64,
        note: Option<&str>,
    ) -> ResultEngine<Uuid> {
        ensure_positive_amount(surcharge_minor, "surcharge_minor")?;
        let note = normalize_optional_text(note);
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let order = self
                .require_open_order_for_shop(&db_tx, &shop.id, order_id)
                .await?;

            let request_id = Uuid::new_v4();
            let active = update_requests::ActiveModel {
                id: ActiveValue::Set(request_id.to_string()),
                order_id: ActiveValue::Set(order.id),
                surcharge_minor: ActiveValue::Set(surcharge_minor),
                note: ActiveValue::Set(note),
                status: ActiveValue::Set(UpdateRequestStatus::Pending.as_str().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            };
            active.insert(&db_tx).await?;
            Ok(request_id)
        })
    }

    /// Accept a pending request: fold the surcharge into the order amount
    /// and close the request, atomically.
    pub async fn accept_update_request(
        &self,
        user_id: &str,
        request_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let request = require_update_request(&db_tx, request_id).await?;
            let order = self
                .require_order_for_shop(&db_tx, &shop.id, parse_uuid(&request.order_id, "order")?)
                .await?;

            require_request_pending(&request)?;

            let order_active = orders::ActiveModel {
                id: ActiveValue::Set(order.id),
                amount_minor: ActiveValue::Set(order.amount_minor + request.surcharge_minor),
                ..Default::default()
            };
            order_active.update(&db_tx).await?;

            set_request_status(&db_tx, &request.id, UpdateRequestStatus::Accepted).await?;
            Ok(())
        })
    }

    /// Reject a pending request. The order amount stays untouched.
    pub async fn reject_update_request(
        &self,
        user_id: &str,
        request_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let request = require_update_request(&db_tx, request_id).await?;
            self.require_order_for_shop(&db_tx, &shop.id, parse_uuid(&request.order_id, "order")?)
                .await?;

            require_request_pending(&request)?;
            set_request_status(&db_tx, &request.id, UpdateRequestStatus::Rejected).await?;
            Ok(())
        })
    }

    /// Auto-reject pending requests older than `max_age`.
    ///
    /// Runs on a fixed interval from the app binary; returns the number of
    /// requests swept.
    pub async fn sweep_stale_update_requests(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> ResultEngine<u64> {
        let cutoff = now - max_age;
        with_tx!(self, |db_tx| {
            let stale = update_requests::Entity::find()
                .filter(
                    update_requests::Column::Status.eq(UpdateRequestStatus::Pending.as_str()),
                )
                .filter(update_requests::Column::CreatedAt.lt(cutoff))
                .all(&db_tx)
                .await?;

            let mut swept = 0u64;
            for request in stale {
                set_request_status(&db_tx, &request.id, UpdateRequestStatus::Rejected).await?;
                swept += 1;
            }
            if swept > 0 {
                tracing::info!(swept, "rejected stale update requests");
            }
            Ok(swept)
        })
    }

    /// Snapshot of a single update request, scoped to the caller's shop.
    pub async fn update_request(
        &self,
        user_id: &str,
        request_id: Uuid,
    ) -> ResultEngine<UpdateRequest> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let request = require_update_request(&db_tx, request_id).await?;
            self.require_order_for_shop(&db_tx, &shop.id, parse_uuid(&request.order_id, "order")?)
                .await?;
            UpdateRequest::try_from(request)
        })
    }
}

async fn require_update_request(
    db: &DatabaseTransaction,
    request_id: Uuid,
) -> ResultEngine<update_requests::Model> {
    update_requests::Entity::find_by_id(request_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("update request not exists".to_string()))
}

fn require_request_pending(request: &update_requests::Model) -> ResultEngine<()> {
    if UpdateRequestStatus::try_from(request.status.as_str())? != UpdateRequestStatus::Pending {
        return Err(EngineError::InvalidState(
            "update request not pending".to_string(),
        ));
    }
    Ok(())
}

async fn set_request_status(
    db: &DatabaseTransaction,
    request_id: &str,
    status: UpdateRequestStatus,
) -> ResultEngine<()> {
    let active = update_requests::ActiveModel {
        id: ActiveValue::Set(request_id.to_string()),
        status: ActiveValue::Set(status.as_str().to_string()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}
