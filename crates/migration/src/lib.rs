pub use sea_orm_migration::prelude::*;

mod m20250114_091500_shops_orders;
mod m20250128_104000_milestones_tasks;
mod m20250210_083000_wallets;
mod m20250224_120000_memberships;
mod m20250305_140000_transactions;
mod m20250401_093000_update_requests;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250114_091500_shops_orders::Migration),
            Box::new(m20250128_104000_milestones_tasks::Migration),
            Box::new(m20250210_083000_wallets::Migration),
            Box::new(m20250224_120000_memberships::Migration),
            Box::new(m20250305_140000_transactions::Migration),
            Box::new(m20250401_093000_update_requests::Migration),
        ]
    }
}
