//! Order records and the top-level status machine.
//!
//! An order only moves forward: `Pending → InProcess → Completed`, or to
//! `Cancelled` from any non-terminal state. It never regresses.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProcess,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProcess => "in_process",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Check a status change against the forward-only machine.
    pub fn validate_transition(self, next: OrderStatus) -> ResultEngine<()> {
        let allowed = match (self, next) {
            (Self::Pending, Self::InProcess) => true,
            (Self::InProcess, Self::Completed) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(EngineError::InvalidState(format!(
                "order cannot move from {} to {}",
                self.as_str(),
                next.as_str()
            )));
        }
        Ok(())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_process" => Ok(Self::InProcess),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidState(format!(
                "invalid order status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub status: OrderStatus,
    pub amount_minor: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub shop_id: String,
    pub status: String,
    pub amount_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shops::Entity",
        from = "Column::ShopId",
        to = "super::shops::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Shops,
    #[sea_orm(has_many = "super::milestones::Entity")]
    Milestones,
}

impl Related<super::shops::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shops.def()
    }
}

impl Related<super::milestones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Milestones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Order {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "order")?,
            shop_id: parse_uuid(&model.shop_id, "shop")?,
            status: OrderStatus::try_from(model.status.as_str())?,
            amount_minor: model.amount_minor,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_forward_only() {
        assert!(OrderStatus::Pending
            .validate_transition(OrderStatus::InProcess)
            .is_ok());
        assert!(OrderStatus::InProcess
            .validate_transition(OrderStatus::Completed)
            .is_ok());
        assert!(OrderStatus::Pending
            .validate_transition(OrderStatus::Completed)
            .is_err());
        assert!(OrderStatus::Completed
            .validate_transition(OrderStatus::InProcess)
            .is_err());
    }

    #[test]
    fn cancels_from_any_non_terminal_state() {
        assert!(OrderStatus::Pending
            .validate_transition(OrderStatus::Cancelled)
            .is_ok());
        assert!(OrderStatus::InProcess
            .validate_transition(OrderStatus::Cancelled)
            .is_ok());
        assert!(OrderStatus::Completed
            .validate_transition(OrderStatus::Cancelled)
            .is_err());
        assert!(OrderStatus::Cancelled
            .validate_transition(OrderStatus::Cancelled)
            .is_err());
    }
}
