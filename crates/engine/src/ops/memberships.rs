//! Membership purchase reconciliation.
//!
//! A purchase compares the shop's active tier against the requested one:
//! downgrades and equivalent tiers are refused, upgrades require an explicit
//! `force` confirmation before the cheaper membership is replaced mid-term.
//! The wallet debit, the ledger row and the membership activation commit as
//! one unit; any failure rolls all of it back.

use chrono::{Duration, Utc};
use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    BalanceKind, EngineError, Membership, ResultEngine, Transaction, TransactionKind,
    TransactionStatus, memberships, memberships::MembershipStatus, subscriptions, transactions,
    util::ensure_positive_amount, util::parse_uuid,
};

use super::{
    Engine, normalize_required_name,
    wallets::{PLATFORM_LABEL, move_available_to_locked},
    with_tx,
};

impl Engine {
    /// Register a priced subscription tier.
    pub async fn create_subscription(
        &self,
        name: &str,
        amount_minor: i64,
        duration_days: i32,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "subscription")?;
        ensure_positive_amount(amount_minor, "subscription amount_minor")?;
        if duration_days <= 0 {
            return Err(EngineError::InvalidAmount(
                "duration_days must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let subscription_id = Uuid::new_v4();
            let active = subscriptions::ActiveModel {
                id: ActiveValue::Set(subscription_id.to_string()),
                name: ActiveValue::Set(name),
                amount_minor: ActiveValue::Set(amount_minor),
                duration_days: ActiveValue::Set(duration_days),
            };
            active.insert(&db_tx).await?;
            Ok(subscription_id)
        })
    }

    /// Purchase a subscription tier for the caller's shop.
    ///
    /// `force` is the explicit confirmation that a cheaper active membership
    /// may be replaced mid-term; without it the purchase stops with
    /// [`EngineError::ConfirmationRequired`].
    pub async fn purchase_membership(
        &self,
        user_id: &str,
        subscription_id: Uuid,
        force: bool,
    ) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let subscription = self.require_subscription(&db_tx, subscription_id).await?;

            let now = Utc::now();
            if let Some(current) = self.active_membership_for_shop(&db_tx, &shop.id).await? {
                let current_subscription = subscriptions::Entity::find_by_id(
                    current.subscription_id.clone(),
                )
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("subscription not exists".to_string()))?;

                if current_subscription.amount_minor > subscription.amount_minor {
                    return Err(EngineError::InvalidOperation(
                        "cannot downgrade an active membership".to_string(),
                    ));
                }
                if current_subscription.amount_minor == subscription.amount_minor {
                    return Err(EngineError::InvalidOperation(
                        "equivalent tier already active".to_string(),
                    ));
                }
                if !force {
                    return Err(EngineError::ConfirmationRequired(
                        "a cheaper plan is active; confirm to replace it".to_string(),
                    ));
                }

                let deactivate = memberships::ActiveModel {
                    id: ActiveValue::Set(current.id.clone()),
                    status: ActiveValue::Set(MembershipStatus::Inactive.as_str().to_string()),
                    end_date: ActiveValue::Set(now),
                    ..Default::default()
                };
                deactivate.update(&db_tx).await?;
            }

            let end_date = now + Duration::days(i64::from(subscription.duration_days));

            let wallet = self.require_wallet_for_owner(&db_tx, user_id).await?;
            move_available_to_locked(&db_tx, &wallet, subscription.amount_minor).await?;

            let membership_id = Uuid::new_v4();
            let active = memberships::ActiveModel {
                id: ActiveValue::Set(membership_id.to_string()),
                shop_id: ActiveValue::Set(shop.id.clone()),
                subscription_id: ActiveValue::Set(subscription.id),
                start_date: ActiveValue::Set(now),
                end_date: ActiveValue::Set(end_date),
                status: ActiveValue::Set(MembershipStatus::Active.as_str().to_string()),
            };
            active.insert(&db_tx).await?;

            let mut tx = Transaction::new(
                parse_uuid(&wallet.id, "wallet")?,
                user_id.to_string(),
                PLATFORM_LABEL.to_string(),
                BalanceKind::Available,
                BalanceKind::Locked,
                TransactionKind::Transfer,
                TransactionStatus::Completed,
                subscription.amount_minor,
                None,
                now,
            )?;
            tx.membership_id = Some(membership_id);
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;

            tracing::info!(shop_id = %shop.id, membership_id = %membership_id, "membership activated");
            Ok(membership_id)
        })
    }

    /// Deactivate the caller's active membership. No refund is issued.
    pub async fn cancel_membership(&self, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let current = self
                .active_membership_for_shop(&db_tx, &shop.id)
                .await?
                .ok_or_else(|| EngineError::NotFound("active membership not exists".to_string()))?;

            let active = memberships::ActiveModel {
                id: ActiveValue::Set(current.id),
                status: ActiveValue::Set(MembershipStatus::Inactive.as_str().to_string()),
                end_date: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// The caller's active membership, if any.
    pub async fn active_membership(&self, user_id: &str) -> ResultEngine<Option<Membership>> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let model = self.active_membership_for_shop(&db_tx, &shop.id).await?;
            model.map(Membership::try_from).transpose()
        })
    }
}
