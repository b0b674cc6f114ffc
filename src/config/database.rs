//! Database configuration module.
//!
//! This module handles the pooled database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL. Each query
//! borrows a pooled connection only for its own duration.

use crate::config::settings::DatabaseSettings;
use crate::entities::{Bucket, Category, Income, Location, Transaction, User};
use crate::errors::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::time::Duration;
use tracing::info;

/// How long a caller waits for a free pooled connection before the request fails.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the connection pool described by `settings`.
pub async fn create_connection(settings: &DatabaseSettings) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(
        "Connected to database (pool size {}..={})",
        settings.min_connections, settings.max_connections
    );
    Ok(db)
}

/// Creates all tables that do not exist yet, parents before children so foreign keys resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Bucket).await?;
    create_table(db, &schema, Category).await?;
    create_table(db, &schema, Location).await?;
    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, Income).await?;

    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}
