use std::sync::Arc;

use engine::{ChannelNotifier, Notification};
use migration::{Migrator, MigratorTrait};
use settings::Database;
use tokio::sync::mpsc::UnboundedReceiver;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "settlement={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let Some(server) = settings.server else {
        tracing::warn!("no server settings found, nothing to run");
        return Ok(());
    };

    let (notifier, notifications) = ChannelNotifier::new();
    tasks.spawn(deliver_notifications(notifications));

    tasks.spawn(async move {
        tracing::info!("Found server settings...");
        let db = match parse_database(&server.database).await {
            Ok(db) => db,
            Err(err) => {
                tracing::error!("failed to initialize database: {err}");
                return;
            }
        };

        let engine = match engine::Engine::builder()
            .database(db.clone())
            .notifier(Arc::new(notifier))
            .build()
            .await
        {
            Ok(engine) => engine,
            Err(err) => {
                tracing::error!("failed to build engine from database: {err}");
                return;
            }
        };
        let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
        let addr = format!("{}:{}", bind, server.port);
        server::run(engine, db, &addr).await;
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

/// Drain engine notifications. Delivery to users (mail, push) plugs in here;
/// for now each one is logged.
async fn deliver_notifications(mut notifications: UnboundedReceiver<Notification>) {
    while let Some(notification) = notifications.recv().await {
        tracing::info!(
            kind = ?notification.kind,
            recipient = %notification.recipient,
            request_id = %notification.payload.request_id,
            debt_id = %notification.payload.debt_id,
            "delivering notification"
        );
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(engine::Engine::connect_options(url)).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
