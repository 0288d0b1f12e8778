//! Index statistics.
//!
//! A quick summary of what is indexed: records per type, how many are
//! hidden from search, and the schema version. Used by `sift stats`.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::index::SearchIndex;

/// Run the stats command: query the index and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let schema_version: Option<String> =
        sqlx::query_scalar("SELECT value FROM schema_meta WHERE key = 'schema_version'")
            .fetch_optional(&pool)
            .await?;

    let index = SearchIndex::new(pool);
    let stats = index.stats().await?;
    index.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("sift index stats");
    println!("================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!(
        "  Schema:      {}",
        schema_version.as_deref().unwrap_or("(not initialized)")
    );
    println!();
    println!("  {:<14} {:>8}", "TYPE", "RECORDS");
    println!("  {}", "-".repeat(23));
    println!("  {:<14} {:>8}", "documents", stats.documents);
    println!("  {:<14} {:>8}", "pages", stats.pages);
    println!("  {:<14} {:>8}", "annotations", stats.annotations);
    println!("  {}", "-".repeat(23));
    println!("  {:<14} {:>8}", "total", stats.total());
    println!(
        "  Protected:   {} / {} ({}%)",
        stats.protected,
        stats.total(),
        if stats.total() > 0 {
            (stats.protected * 100) / stats.total()
        } else {
            0
        }
    );
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
