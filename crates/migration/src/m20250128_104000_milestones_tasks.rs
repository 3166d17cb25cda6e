use sea_orm_migration::prelude::*;

use crate::m20250114_091500_shops_orders::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Milestones {
    Table,
    Id,
    OrderId,
    Idx,
    Name,
    Status,
    DueDate,
}

#[derive(Iden)]
pub enum Tasks {
    Table,
    Id,
    MilestoneId,
    Idx,
    Name,
    Status,
    DueDate,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Milestones::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Milestones::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Milestones::OrderId).string().not_null())
                    .col(ColumnDef::new(Milestones::Idx).integer().not_null())
                    .col(ColumnDef::new(Milestones::Name).string().not_null())
                    .col(ColumnDef::new(Milestones::Status).string().not_null())
                    .col(ColumnDef::new(Milestones::DueDate).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-milestones-order_id")
                            .from(Milestones::Table, Milestones::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-milestones-order_id-idx")
                    .table(Milestones::Table)
                    .col(Milestones::OrderId)
                    .col(Milestones::Idx)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tasks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Tasks::MilestoneId).string().not_null())
                    .col(ColumnDef::new(Tasks::Idx).integer().not_null())
                    .col(ColumnDef::new(Tasks::Name).string().not_null())
                    .col(ColumnDef::new(Tasks::Status).string().not_null())
                    .col(ColumnDef::new(Tasks::DueDate).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-tasks-milestone_id")
                            .from(Tasks::Table, Tasks::MilestoneId)
                            .to(Milestones::Table, Milestones::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tasks-milestone_id-idx")
                    .table(Tasks::Table)
                    .col(Tasks::MilestoneId)
                    .col(Tasks::Idx)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Milestones::Table).to_owned())
            .await?;
        Ok(())
    }
}
