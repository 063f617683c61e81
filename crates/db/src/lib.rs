use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

mod events;
mod fallback;
mod memory;
pub mod seed;
mod sqlite;
mod store;

pub use events::{NotificationBus, Subscription};
pub use fallback::FallbackStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::Store;

pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    // Every connection to `sqlite::memory:` opens its own database, so the
    // pool must keep exactly one alive.
    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new()
    };

    let pool = pool_options.connect_with(options).await?;
    info!("Connected to database: {database_url}");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Migrations applied");
    Ok(())
}

/// A migrated in-memory SQLite store, mostly for tests and demos.
pub async fn open_in_memory(bus: NotificationBus) -> Result<SqliteStore> {
    let pool = connect("sqlite::memory:").await?;
    migrate(&pool).await?;
    Ok(SqliteStore::new(pool, bus))
}
