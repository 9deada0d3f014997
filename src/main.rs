use std::sync::Arc;

use dotenvy::dotenv;
use ledger_buddy::{
    config::{self, database},
    errors::Result,
    scheduler,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!("Configuration loaded.");

    // 4. Connect and make sure every table exists
    let database_url = database::resolve_database_url(app_config.database.url.as_deref());
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Run the daily jobs until shutdown
    let db = Arc::new(db);
    let handles = if app_config.scheduler.enabled {
        scheduler::start_daily_jobs(&db, &app_config.scheduler)
    } else {
        info!("Scheduler disabled by configuration.");
        Vec::new()
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping scheduler.");
    for handle in handles {
        handle.abort();
        // Cancelled tasks release their connection handle once awaited
        handle.await.ok();
    }
    if let Ok(db) = Arc::try_unwrap(db) {
        db.close().await?;
    }

    Ok(())
}
