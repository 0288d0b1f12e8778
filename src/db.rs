//! Connection pool for the index database.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::time::Duration;

use crate::config::{Config, DbConfig};

/// Opens the index database described by `[db]`, creating the file and its
/// parent directory when missing. The journal runs in WAL mode so searches
/// keep reading while the synchronizer writes.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db = &config.db;
    if let Some(parent) = db.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(db.max_connections)
        .connect_with(connect_options(db))
        .await
        .with_context(|| format!("Failed to open index database {}", db.path.display()))?;

    tracing::debug!(
        path = %db.path.display(),
        max_connections = db.max_connections,
        "connected to index database"
    );
    Ok(pool)
}

fn connect_options(db: &DbConfig) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(&db.path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(db.busy_timeout_ms))
}
