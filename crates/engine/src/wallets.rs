//! The module contains the `Wallet` struct and its implementation.
//!
//! A wallet keeps two balances in minor units: `available_minor` (free to
//! spend or withdraw) and `locked_minor` (committed to an in-flight order or
//! membership). Both are non-negative at all times, and business logic never
//! writes them without appending a matching ledger row.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Stable identifier, generated once and persisted so the wallet can be
    /// referenced from the ledger.
    pub id: Uuid,
    pub owner_user_id: String,
    pub available_minor: i64,
    pub locked_minor: i64,
}

impl Wallet {
    pub fn new(owner_user_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_user_id,
            available_minor: 0,
            locked_minor: 0,
        }
    }

    /// Resulting available balance after a debit, or `InsufficientFunds`.
    pub fn debit_available(&self, amount_minor: i64) -> ResultEngine<i64> {
        if self.available_minor < amount_minor {
            return Err(EngineError::InsufficientFunds(
                self.owner_user_id.clone(),
            ));
        }
        Ok(self.available_minor - amount_minor)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_user_id: String,
    pub available_minor: i64,
    pub locked_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_user_id: ActiveValue::Set(value.owner_user_id.clone()),
            available_minor: ActiveValue::Set(value.available_minor),
            locked_minor: ActiveValue::Set(value.locked_minor),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "wallet")?,
            owner_user_id: model.owner_user_id,
            available_minor: model.available_minor,
            locked_minor: model.locked_minor,
        })
    }
}
