//! Embedded schema migrations.
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary and
//! applied by [`Database::new`](crate::Database::new) unless the config
//! turns it off. Applied versions are tracked in `_sqlx_migrations`, so
//! reopening an existing store is a no-op. Schema changes go in a new
//! `NNN_description.sql` file; applied files are never edited.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Tables the store expects after migrating.
pub const STORE_TABLES: [&str; 7] = [
    "businesses",
    "products",
    "customers",
    "orders",
    "order_items",
    "stock_movements",
    "settings",
];

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying store migrations");
    MIGRATOR.run(pool).await?;
    info!("Store schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;
    Ok((MIGRATOR.migrations.len(), applied.max(0) as usize))
}

/// Store tables missing from the connected database.
pub async fn missing_tables(pool: &SqlitePool) -> DbResult<Vec<&'static str>> {
    let present: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;

    Ok(STORE_TABLES
        .into_iter()
        .filter(|table| !present.iter().any(|name| name == table))
        .collect())
}
