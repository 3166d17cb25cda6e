use sea_orm_migration::prelude::*;

use crate::m20250114_091500_shops_orders::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum UpdateRequests {
    Table,
    Id,
    OrderId,
    SurchargeMinor,
    Note,
    Status,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UpdateRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UpdateRequests::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UpdateRequests::OrderId).string().not_null())
                    .col(
                        ColumnDef::new(UpdateRequests::SurchargeMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UpdateRequests::Note).string())
                    .col(ColumnDef::new(UpdateRequests::Status).string().not_null())
                    .col(
                        ColumnDef::new(UpdateRequests::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-update_requests-order_id")
                            .from(UpdateRequests::Table, UpdateRequests::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-update_requests-status-created_at")
                    .table(UpdateRequests::Table)
                    .col(UpdateRequests::Status)
                    .col(UpdateRequests::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UpdateRequests::Table).to_owned())
            .await?;
        Ok(())
    }
}
