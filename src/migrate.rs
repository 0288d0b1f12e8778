//! Index schema.
//!
//! Three tables back the index:
//!
//! - `search_index`: one row per [`IndexRecord`](crate::models::IndexRecord).
//! - `search_fts`: FTS5 over `(title, content)`, rowid = record id.
//! - `record_terms`: one row per (record, taxonomy, term) membership.
//!
//! `schema_meta` records the schema version so later releases can upgrade
//! in place.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub const SCHEMA_VERSION: &str = "2";

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Creates every table and index. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_index (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            object INTEGER NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL DEFAULT '',
            post_date INTEGER NOT NULL,
            parent INTEGER NOT NULL DEFAULT 0,
            categories TEXT NOT NULL DEFAULT ',',
            tags TEXT NOT NULL DEFAULT ',',
            author TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL CHECK (type IN ('document', 'page', 'annotation')),
            protected INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Documents and pages share a key space, annotations have their own.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_search_index_object ON search_index(object, (type = 'annotation'))",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS record_terms (
            record_id INTEGER NOT NULL,
            taxonomy TEXT NOT NULL CHECK (taxonomy IN ('category', 'tag')),
            term_id INTEGER NOT NULL,
            PRIMARY KEY (record_id, taxonomy, term_id),
            FOREIGN KEY (record_id) REFERENCES search_index(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='search_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query("CREATE VIRTUAL TABLE search_fts USING fts5(title, content)")
            .execute(pool)
            .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_search_index_post_date ON search_index(post_date)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_record_terms_term ON record_terms(taxonomy, term_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO schema_meta (key, value) VALUES ('schema_version', ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await?;

    tracing::debug!(version = SCHEMA_VERSION, "index schema ready");
    Ok(())
}
