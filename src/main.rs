//! # sift CLI
//!
//! The `sift` binary maintains the search index and queries it.
//!
//! ## Usage
//!
//! ```bash
//! sift --config ./config/sift.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sift init` | Create the index schema (and fill it when a snapshot is configured) |
//! | `sift rebuild` | Clear the index and regenerate it from the content snapshot |
//! | `sift event <kind> <id>` | Apply one lifecycle event |
//! | `sift search "<query>"` | Search the index |
//! | `sift get <object-id>` | Show one index record |
//! | `sift stats` | Record counts per type |
//! | `sift serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! sift init
//! sift event content_upserted 42
//! sift event annotation_edited 7 --status spam
//! sift search "alpine trails" --category 12 --sort date --asc
//! sift search hiking --type page --start-year 2020 --page 2
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sift::config::{self, Config};
use sift::content::MemoryContentStore;
use sift::flags::RawParams;
use sift::index::SearchIndex;
use sift::sync::{LifecycleEvent, SyncOutcome, Synchronizer};
use sift::{db, get, migrate, search, server, stats};

/// sift: a denormalized full-text index over documents, pages and
/// annotations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/sift.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "sift",
    about = "sift: keyword search over documents, pages and annotations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sift.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the index schema. Idempotent.
    ///
    /// When `[content].snapshot` is set, the index is also rebuilt from it.
    Init,

    /// Clear the index and regenerate every record from the content snapshot.
    Rebuild,

    /// Apply one lifecycle event against the content snapshot.
    ///
    /// Kinds: content_deleted, content_upserted, annotation_created,
    /// annotation_edited, annotation_deleted.
    Event {
        kind: String,

        /// Object id of the document, page or annotation.
        id: i64,

        /// Reported annotation status (annotation_edited only).
        #[arg(long)]
        status: Option<String>,
    },

    /// Search the index.
    Search {
        query: String,

        /// Restrict to record types: document, page, annotation. Repeatable.
        #[arg(long = "type")]
        types: Vec<String>,

        /// Category id. Repeatable; any match counts.
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Tag id. Repeatable; any match counts.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Author name substring.
        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        start_year: Option<String>,
        #[arg(long)]
        start_month: Option<String>,
        #[arg(long)]
        start_day: Option<String>,
        #[arg(long)]
        end_year: Option<String>,
        #[arg(long)]
        end_month: Option<String>,
        #[arg(long)]
        end_day: Option<String>,

        /// relevance, date or alpha.
        #[arg(long, default_value = "relevance")]
        sort: String,

        /// Ascending order (descending by default).
        #[arg(long)]
        asc: bool,

        #[arg(long, default_value = "1")]
        page: String,
    },

    /// Show the index record for an object.
    Get {
        object_id: i64,

        /// Look up an annotation instead of a document or page.
        #[arg(long)]
        annotation: bool,
    },

    /// Show record counts per type.
    Stats,

    /// Start the HTTP server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sift=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Index initialized successfully.");
            if cfg.content.snapshot.is_some() {
                run_rebuild(&cfg).await?;
            }
        }
        Commands::Rebuild => {
            run_rebuild(&cfg).await?;
        }
        Commands::Event { kind, id, status } => {
            let event = LifecycleEvent::from_parts(&kind, id, status.as_deref())?;
            run_event(&cfg, event).await?;
        }
        Commands::Search {
            query,
            types,
            categories,
            tags,
            author,
            start_year,
            start_month,
            start_day,
            end_year,
            end_month,
            end_day,
            sort,
            asc,
            page,
        } => {
            let mut params = RawParams::new();
            params.push("s", query);
            for t in types {
                params.push("types", t);
            }
            for c in categories {
                params.push("cats", c);
            }
            for t in tags {
                params.push("tags", t);
            }
            let dates = [
                ("startYear", start_year),
                ("startMonth", start_month),
                ("startDay", start_day),
                ("endYear", end_year),
                ("endMonth", end_month),
                ("endDay", end_day),
            ];
            for (key, value) in dates.into_iter().chain([("author", author)]) {
                if let Some(value) = value {
                    params.push(key, value);
                }
            }
            params.push("sort", sort);
            params.push("sorttype", if asc { "ASC" } else { "DESC" });
            params.push("pg", page);

            search::run_search(&cfg, &params).await?;
        }
        Commands::Get {
            object_id,
            annotation,
        } => {
            get::run_get(&cfg, object_id, annotation).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Opens the index and a synchronizer over the configured content snapshot.
async fn open_synchronizer(cfg: &Config) -> anyhow::Result<Synchronizer> {
    let content = MemoryContentStore::load(cfg.snapshot_path()?)?;
    let pool = db::connect(cfg).await?;
    migrate::apply_schema(&pool).await?;
    Ok(Synchronizer::new(Arc::new(content), SearchIndex::new(pool)))
}

async fn run_rebuild(cfg: &Config) -> anyhow::Result<()> {
    let sync = open_synchronizer(cfg).await?;
    let report = sync.rebuild().await;
    sync.index().close().await;
    let report = report?;

    println!("rebuild");
    println!("  documents:   {}", report.documents);
    println!("  pages:       {}", report.pages);
    println!("  annotations: {}", report.annotations);
    println!("  skipped:     {}", report.skipped);
    println!("  elapsed:     {} ms", report.elapsed.as_millis());
    println!("ok");
    Ok(())
}

async fn run_event(cfg: &Config, event: LifecycleEvent) -> anyhow::Result<()> {
    let sync = open_synchronizer(cfg).await?;
    let outcome = sync.apply(event).await;
    sync.index().close().await;

    match outcome? {
        SyncOutcome::Indexed(upserted) => println!("indexed record {}", upserted.id()),
        SyncOutcome::Removed(0) => println!("nothing to remove"),
        SyncOutcome::Removed(n) => println!("removed {} record(s)", n),
        SyncOutcome::Skipped => println!("skipped: not a searchable kind"),
    }
    Ok(())
}
