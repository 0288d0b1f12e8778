//! # sift
//!
//! A denormalized full-text search index over documents, pages and reader
//! annotations.
//!
//! The host application owns the content. sift keeps one searchable record
//! per item in SQLite (FTS5), follows content changes through typed
//! lifecycle events, and answers keyword queries with category, tag,
//! author, date and type filters, sorting and pagination.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  events  ┌──────────────┐   ┌──────────────┐
//! │ Content Store│─────────▶│ Synchronizer │──▶│    SQLite    │
//! │  (snapshot)  │◀─────────│  + Rebuilder │   │ index + FTS5 │
//! └──────────────┘  re-read └──────────────┘   └──────┬───────┘
//!                                                     │
//!                   ┌──────────┐   ┌──────────┐       │
//!    params ───────▶│  Flags   │──▶│  Query   │───────┘
//!                   └──────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sift init                         # create schema, index the snapshot
//! sift event content_upserted 42    # follow one change
//! sift search "alpine trails" --category 12
//! sift serve                        # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Index record and content model types |
//! | [`error`] | Library error types |
//! | [`content`] | Content store trait and in-memory snapshot store |
//! | [`codec`] | Content item → index record mapping, term-set encoding |
//! | [`index`] | SQLite index store |
//! | [`sync`] | Lifecycle events and the synchronizer |
//! | [`rebuild`] | Full index regeneration |
//! | [`flags`] | Search request normalization |
//! | [`query`] | Parameterized search query builder |
//! | [`search`] | Search execution and result formatting |
//! | [`server`] | HTTP API |
//! | [`get`] | Single record lookup |
//! | [`stats`] | Index statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod codec;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod flags;
pub mod get;
pub mod index;
pub mod migrate;
pub mod models;
pub mod query;
pub mod rebuild;
pub mod search;
pub mod server;
pub mod stats;
pub mod sync;
