use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "atelia={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let database = settings.database.unwrap_or(Database::Memory);
    let db = parse_database(&database).await?;
    let engine = Arc::new(engine::Engine::builder().database(db).build().await?);

    let sweep = settings.sweep;
    {
        let engine = engine.clone();
        tasks.spawn(async move {
            let period = std::time::Duration::from_secs(sweep.interval_hours * 3600);
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let max_age = chrono::Duration::days(sweep.max_age_days);
                if let Err(err) = engine
                    .sweep_stale_update_requests(chrono::Utc::now(), max_age)
                    .await
                {
                    tracing::error!("stale update-request sweep failed: {err}");
                }
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
