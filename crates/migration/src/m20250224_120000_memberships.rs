use sea_orm_migration::prelude::*;

use crate::m20250114_091500_shops_orders::Shops;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Subscriptions {
    Table,
    Id,
    Name,
    AmountMinor,
    DurationDays,
}

#[derive(Iden)]
pub enum Memberships {
    Table,
    Id,
    ShopId,
    SubscriptionId,
    StartDate,
    EndDate,
    Status,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::Name).string().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::DurationDays)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Memberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Memberships::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Memberships::ShopId).string().not_null())
                    .col(
                        ColumnDef::new(Memberships::SubscriptionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Memberships::StartDate).timestamp().not_null())
                    .col(ColumnDef::new(Memberships::EndDate).timestamp().not_null())
                    .col(ColumnDef::new(Memberships::Status).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-memberships-shop_id")
                            .from(Memberships::Table, Memberships::ShopId)
                            .to(Shops::Table, Shops::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-memberships-subscription_id")
                            .from(Memberships::Table, Memberships::SubscriptionId)
                            .to(Subscriptions::Table, Subscriptions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-memberships-shop_id-status")
                    .table(Memberships::Table)
                    .col(Memberships::ShopId)
                    .col(Memberships::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Memberships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        Ok(())
    }
}
