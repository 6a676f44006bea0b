mod migrations;
mod models;
mod queries;

pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::info;

/// Listing pages run one needs-attention lookup per topic concurrently, so
/// the pool is sized for a page of readers next to the single writer.
const MAX_CONNECTIONS: u32 = 8;

/// Resolve toggles serialize on the SQLite writer lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Forum store backed by one SQLite file.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the forum database at `path` and bring its schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, a migration fails, or
    /// the file was written by a newer schema than this build understands.
    pub async fn new(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open forum database: {}", path.display()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        let found = migrations::get_schema_version(&self.pool).await.unwrap_or(0);
        if found > migrations::LATEST_VERSION {
            bail!(
                "Database schema v{found} is newer than supported v{}",
                migrations::LATEST_VERSION
            );
        }

        migrations::run(&self.pool).await?;
        info!(
            from = found,
            to = migrations::LATEST_VERSION,
            "Database schema up to date"
        );
        Ok(())
    }

    /// Current schema version.
    pub async fn schema_version(&self) -> Result<i32> {
        migrations::get_schema_version(&self.pool).await
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for in-flight queries and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
