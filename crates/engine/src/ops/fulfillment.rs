//! Milestone and task progression.
//!
//! Progression is purely index-driven and forward-only: completing a task
//! activates the next task by `idx`; completing the last task closes the
//! milestone and opens the next one; closing the last milestone completes
//! the order. There is no skip and no reopen, so advancement is a single
//! deterministic path even when indices are sparse.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, Milestone, ResultEngine, Task, milestones, milestones::ProgressStatus,
    orders::OrderStatus, tasks, util::parse_uuid,
};

use super::{Engine, normalize_required_name, orders::set_order_status, with_tx};

#[derive(Clone, Debug)]
pub struct NewTask {
    pub name: String,
    pub due_date: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewMilestone {
    pub order_id: Uuid,
    pub name: String,
    pub due_date: DateTime<Utc>,
    pub tasks: Vec<NewTask>,
}

/// Metadata corrections for a closed milestone.
#[derive(Clone, Debug, Default)]
pub struct MilestonePatch {
    pub name: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Engine {
    /// Append a milestone to an order the caller's shop owns.
    ///
    /// The first milestone of an order starts IN_PROGRESS (and so does its
    /// first task); every later one waits for the progression engine.
    pub async fn create_milestone(&self, user_id: &str, new: NewMilestone) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&new.name, "milestone")?;
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let order = self
                .require_open_order_for_shop(&db_tx, &shop.id, new.order_id)
                .await?;

            let existing = milestones::Entity::find()
                .filter(milestones::Column::OrderId.eq(order.id.clone()))
                .count(&db_tx)
                .await?;
            let idx = existing as i32 + 1;
            let status = if idx == 1 {
                ProgressStatus::InProgress
            } else {
                ProgressStatus::Pending
            };

            let milestone_id = Uuid::new_v4();
            let active = milestones::ActiveModel {
                id: ActiveValue::Set(milestone_id.to_string()),
                order_id: ActiveValue::Set(order.id),
                idx: ActiveValue::Set(idx),
                name: ActiveValue::Set(name),
                status: ActiveValue::Set(status.as_str().to_string()),
                due_date: ActiveValue::Set(new.due_date),
            };
            active.insert(&db_tx).await?;

            for (offset, task) in new.tasks.iter().enumerate() {
                let task_name = normalize_required_name(&task.name, "task")?;
                let task_idx = offset as i32 + 1;
                let task_status = if status == ProgressStatus::InProgress && task_idx == 1 {
                    ProgressStatus::InProgress
                } else {
                    ProgressStatus::Pending
                };
                let active = tasks::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    milestone_id: ActiveValue::Set(milestone_id.to_string()),
                    idx: ActiveValue::Set(task_idx),
                    name: ActiveValue::Set(task_name),
                    status: ActiveValue::Set(task_status.as_str().to_string()),
                    due_date: ActiveValue::Set(task.due_date),
                };
                active.insert(&db_tx).await?;
            }

            Ok(milestone_id)
        })
    }

    /// Append a task to a milestone of an order the caller's shop owns.
    ///
    /// The new task starts IN_PROGRESS only when the milestone is active and
    /// every existing task is already closed; otherwise it queues as PENDING.
    pub async fn create_task(
        &self,
        user_id: &str,
        milestone_id: Uuid,
        new: NewTask,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&new.name, "task")?;
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let milestone = require_milestone(&db_tx, milestone_id).await?;
            self.require_open_order_for_shop(&db_tx, &shop.id, parse_uuid(&milestone.order_id, "order")?)
                .await?;

            let milestone_status = ProgressStatus::try_from(milestone.status.as_str())?;
            if milestone_status.is_terminal() {
                return Err(EngineError::InvalidState(
                    "milestone already closed".to_string(),
                ));
            }

            let existing = tasks::Entity::find()
                .filter(tasks::Column::MilestoneId.eq(milestone.id.clone()))
                .all(&db_tx)
                .await?;
            let idx = existing.len() as i32 + 1;

            let mut all_closed = true;
            for task in &existing {
                if !ProgressStatus::try_from(task.status.as_str())?.is_terminal() {
                    all_closed = false;
                }
            }
            let status = if milestone_status == ProgressStatus::InProgress && all_closed {
                ProgressStatus::InProgress
            } else {
                ProgressStatus::Pending
            };

            let task_id = Uuid::new_v4();
            let active = tasks::ActiveModel {
                id: ActiveValue::Set(task_id.to_string()),
                milestone_id: ActiveValue::Set(milestone.id),
                idx: ActiveValue::Set(idx),
                name: ActiveValue::Set(name),
                status: ActiveValue::Set(status.as_str().to_string()),
                due_date: ActiveValue::Set(new.due_date),
            };
            active.insert(&db_tx).await?;
            Ok(task_id)
        })
    }

    /// Complete the active task of a milestone and advance the cascade.
    ///
    /// Exactly one of three things happens downstream: the next task by
    /// `idx` becomes active, or the milestone closes and the next milestone
    /// opens (activating its first task), or the order completes.
    pub async fn complete_task(
        &self,
        user_id: &str,
        milestone_id: Uuid,
        task_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let milestone = milestones::Entity::find_by_id(milestone_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::InvalidState("task not found".to_string()))?;
            let order = self
                .require_order_for_shop(&db_tx, &shop.id, parse_uuid(&milestone.order_id, "order")?)
                .await?;

            let order_status = OrderStatus::try_from(order.status.as_str())?;
            if order_status != OrderStatus::InProcess {
                return Err(EngineError::InvalidState(
                    "order not in process".to_string(),
                ));
            }

            let task = tasks::Entity::find_by_id(task_id.to_string())
                .filter(tasks::Column::MilestoneId.eq(milestone.id.clone()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::InvalidState("task not found".to_string()))?;
            let task_status = ProgressStatus::try_from(task.status.as_str())?;
            if task_status != ProgressStatus::InProgress {
                return Err(EngineError::InvalidState(
                    "task not in progress".to_string(),
                ));
            }

            set_task_status(&db_tx, &task.id, ProgressStatus::Completed).await?;

            // Smallest strictly-greater idx wins, so advancement stays
            // deterministic even with sparse indices.
            let next_task = tasks::Entity::find()
                .filter(tasks::Column::MilestoneId.eq(milestone.id.clone()))
                .filter(tasks::Column::Idx.gt(task.idx))
                .order_by_asc(tasks::Column::Idx)
                .one(&db_tx)
                .await?;

            match next_task {
                Some(next) => {
                    ProgressStatus::try_from(next.status.as_str())?
                        .validate_transition(ProgressStatus::InProgress)?;
                    set_task_status(&db_tx, &next.id, ProgressStatus::InProgress).await?;
                }
                None => {
                    ProgressStatus::try_from(milestone.status.as_str())?
                        .validate_transition(ProgressStatus::Completed)?;
                    set_milestone_status(&db_tx, &milestone.id, ProgressStatus::Completed).await?;

                    let next_milestone = milestones::Entity::find()
                        .filter(milestones::Column::OrderId.eq(order.id.clone()))
                        .filter(milestones::Column::Idx.gt(milestone.idx))
                        .order_by_asc(milestones::Column::Idx)
                        .one(&db_tx)
                        .await?;

                    match next_milestone {
                        Some(next) => {
                            ProgressStatus::try_from(next.status.as_str())?
                                .validate_transition(ProgressStatus::InProgress)?;
                            set_milestone_status(&db_tx, &next.id, ProgressStatus::InProgress)
                                .await?;

                            let first_task = tasks::Entity::find()
                                .filter(tasks::Column::MilestoneId.eq(next.id.clone()))
                                .order_by_asc(tasks::Column::Idx)
                                .one(&db_tx)
                                .await?;
                            if let Some(first) = first_task {
                                ProgressStatus::try_from(first.status.as_str())?
                                    .validate_transition(ProgressStatus::InProgress)?;
                                set_task_status(&db_tx, &first.id, ProgressStatus::InProgress)
                                    .await?;
                            }
                        }
                        None => {
                            order_status.validate_transition(OrderStatus::Completed)?;
                            set_order_status(&db_tx, &order.id, OrderStatus::Completed).await?;
                            tracing::info!(order_id = %order.id, "order fulfillment completed");
                        }
                    }
                }
            }

            Ok(())
        })
    }

    /// Correct name/due date on a closed milestone.
    ///
    /// Open milestones are the progression engine's to mutate; metadata
    /// edits are only allowed once the milestone is COMPLETED or CANCELLED.
    pub async fn update_milestone(
        &self,
        user_id: &str,
        milestone_id: Uuid,
        patch: MilestonePatch,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let milestone = require_milestone(&db_tx, milestone_id).await?;
            self.require_order_for_shop(&db_tx, &shop.id, parse_uuid(&milestone.order_id, "order")?)
                .await?;

            let status = ProgressStatus::try_from(milestone.status.as_str())?;
            if !status.is_terminal() {
                return Err(EngineError::InvalidState(
                    "milestone not closed".to_string(),
                ));
            }

            let mut active = milestones::ActiveModel {
                id: ActiveValue::Set(milestone.id),
                ..Default::default()
            };
            if let Some(name) = patch.name.as_deref() {
                active.name = ActiveValue::Set(normalize_required_name(name, "milestone")?);
            }
            if let Some(due_date) = patch.due_date {
                active.due_date = ActiveValue::Set(due_date);
            }
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Milestones of an order, ordered by idx.
    pub async fn milestones_for_order(
        &self,
        user_id: &str,
        order_id: Uuid,
    ) -> ResultEngine<Vec<Milestone>> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let order = self.require_order_for_shop(&db_tx, &shop.id, order_id).await?;

            let models = milestones::Entity::find()
                .filter(milestones::Column::OrderId.eq(order.id))
                .order_by_asc(milestones::Column::Idx)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                out.push(Milestone::try_from(model)?);
            }
            Ok(out)
        })
    }

    /// Tasks of a milestone, ordered by idx.
    pub async fn tasks_for_milestone(
        &self,
        user_id: &str,
        milestone_id: Uuid,
    ) -> ResultEngine<Vec<Task>> {
        with_tx!(self, |db_tx| {
            let shop = self.require_shop_for_user(&db_tx, user_id).await?;
            let milestone = require_milestone(&db_tx, milestone_id).await?;
            self.require_order_for_shop(&db_tx, &shop.id, parse_uuid(&milestone.order_id, "order")?)
                .await?;

            let models = tasks::Entity::find()
                .filter(tasks::Column::MilestoneId.eq(milestone.id))
                .order_by_asc(tasks::Column::Idx)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                out.push(Task::try_from(model)?);
            }
            Ok(out)
        })
    }
}

async fn require_milestone(
    db: &DatabaseTransaction,
    milestone_id: Uuid,
) -> ResultEngine<milestones::Model> {
    milestones::Entity::find_by_id(milestone_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound("milestone not exists".to_string()))
}

async fn set_task_status(
    db: &DatabaseTransaction,
    task_id: &str,
    status: ProgressStatus,
) -> ResultEngine<()> {
    let active = tasks::ActiveModel {
        id: ActiveValue::Set(task_id.to_string()),
        status: ActiveValue::Set(status.as_str().to_string()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}

async fn set_milestone_status(
    db: &DatabaseTransaction,
    milestone_id: &str,
    status: ProgressStatus,
) -> ResultEngine<()> {
    let active = milestones::ActiveModel {
        id: ActiveValue::Set(milestone_id.to_string()),
        status: ActiveValue::Set(status.as_str().to_string()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}
