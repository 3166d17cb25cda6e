use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, milestones::ProgressStatus, util::parse_uuid};

/// A unit of work within a milestone, ordered by `idx`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub milestone_id: Uuid,
    /// 1-based position within the milestone, assigned at creation time.
    pub idx: i32,
    pub name: String,
    pub status: ProgressStatus,
    pub due_date: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub milestone_id: String,
    pub idx: i32,
    pub name: String,
    pub status: String,
    pub due_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::milestones::Entity",
        from = "Column::MilestoneId",
        to = "super::milestones::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Milestones,
}

impl Related<super::milestones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Milestones.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Task {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "task")?,
            milestone_id: parse_uuid(&model.milestone_id, "milestone")?,
            idx: model.idx,
            name: model.name,
            status: ProgressStatus::try_from(model.status.as_str())?,
            due_date: model.due_date,
        })
    }
}
