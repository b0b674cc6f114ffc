use dotenvy::dotenv;
use finance_tracker::{
    api::{self, AppState},
    config::{self, database},
    core::catalog,
    errors::Result,
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
    let app_config = config::load_app_configuration()?;

    // 4. Connect and create missing tables
    let db = database::create_connection(&app_config.database)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed bucket reference data
    catalog::seed_buckets(&db, &app_config.buckets)
        .await
        .inspect(|created| info!("Seeded {} new bucket(s).", created))
        .inspect_err(|e| error!("Failed to seed buckets: {}", e))?;

    // 6. Serve the API
    let state = AppState::new(db, app_config.auth.password_cost);
    api::run_server(&app_config.server, state).await
}
