//! HTTP API.
//!
//! Serves search over the index and accepts lifecycle events from the host
//! application. Events are queued on the synchronizer's channel and applied
//! in the background by its single consumer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search` | Search; flat query parameters (`s`, `cats[]`, `pg`, ...) |
//! | `POST` | `/events` | Enqueue a lifecycle event, `202 Accepted` |
//! | `POST` | `/rebuild` | Regenerate the whole index from the content snapshot |
//! | `GET`  | `/records/{type}/{object}` | One index record |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "unknown record type: post" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `unavailable` (503),
//! `internal` (500).
//!
//! The content store is a [`MemoryContentStore`] loaded from
//! `[content].snapshot`. It is reloaded before each accepted event and each
//! rebuild so the index follows the latest export.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::content::{ContentSnapshot, ContentStore, MemoryContentStore};
use crate::db;
use crate::error::IndexError;
use crate::flags::{RawParams, SearchFlags};
use crate::index::SearchIndex;
use crate::migrate;
use crate::models::{IndexRecord, RecordType};
use crate::search::{search, SearchHit};
use crate::sync::{LifecycleEvent, Reindexed, Synchronizer};

const EVENT_BUFFER: usize = 1024;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    index: SearchIndex,
    content: Arc<MemoryContentStore>,
    sync: Arc<Synchronizer>,
    events: mpsc::Sender<LifecycleEvent>,
}

impl AppState {
    /// Reloads the content snapshot, if one is configured.
    fn refresh_content(&self) -> Result<(), AppError> {
        if let Some(path) = &self.config.content.snapshot {
            let snapshot = ContentSnapshot::load(path)
                .map_err(|e| unavailable(format!("{:#}", e)))?;
            self.content.replace(snapshot);
        }
        Ok(())
    }
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let pool = db::connect(&config).await?;
    migrate::apply_schema(&pool).await?;
    let index = SearchIndex::new(pool);

    let content = Arc::new(match &config.content.snapshot {
        Some(path) => MemoryContentStore::load(path)?,
        None => MemoryContentStore::new(),
    });
    let store: Arc<dyn ContentStore> = content.clone();
    let sync = Arc::new(Synchronizer::new(store, index.clone()));
    tokio::spawn(log_notifications(sync.subscribe()));
    let (events, _consumer) = sync.clone().spawn(EVENT_BUFFER);

    let state = AppState {
        config,
        index,
        content,
        sync,
        events,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/search", get(handle_search))
        .route("/events", post(handle_event))
        .route("/rebuild", post(handle_rebuild))
        .route("/records/{record_type}/{object_id}", get(handle_get_record))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("sift server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_notifications(mut rx: broadcast::Receiver<Reindexed>) {
    loop {
        match rx.recv().await {
            Ok(event) => tracing::info!(?event, "index updated"),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "notification log lagged")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        code: "unavailable".to_string(),
        message: message.into(),
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        let message = err.to_string();
        match err {
            IndexError::Validation(_) => bad_request(message),
            IndexError::NotFound { .. } => not_found(message),
            IndexError::StoreUnavailable(_) | IndexError::ContentUnavailable(_) => {
                unavailable(message)
            }
            IndexError::RebuildInterrupted { .. } => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal".to_string(),
                message,
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /search ============

#[derive(Serialize)]
struct SearchBody {
    total_count: i64,
    current_page: i64,
    page_count: i64,
    no_results: bool,
    records: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchBody>, AppError> {
    let params: RawParams = pairs.into_iter().collect();
    let flags = SearchFlags::from_params(&params);
    let response = search(&state.index, &flags, state.config.search.page_size).await?;

    Ok(Json(SearchBody {
        total_count: response.total_count,
        current_page: response.current_page,
        page_count: response.page_count,
        no_results: response.no_results,
        records: response.hits(state.config.search.excerpt_chars),
    }))
}

// ============ POST /events ============

#[derive(Serialize)]
struct Accepted {
    accepted: LifecycleEvent,
}

async fn handle_event(
    State(state): State<AppState>,
    Json(event): Json<LifecycleEvent>,
) -> Result<(StatusCode, Json<Accepted>), AppError> {
    state.refresh_content()?;
    state
        .events
        .send(event.clone())
        .await
        .map_err(|_| unavailable("event consumer has stopped"))?;
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted: event })))
}

// ============ POST /rebuild ============

#[derive(Serialize)]
struct RebuildBody {
    documents: usize,
    pages: usize,
    annotations: usize,
    skipped: usize,
    elapsed_ms: u64,
}

async fn handle_rebuild(State(state): State<AppState>) -> Result<Json<RebuildBody>, AppError> {
    state.refresh_content()?;
    let report = state.sync.rebuild().await?;
    Ok(Json(RebuildBody {
        documents: report.documents,
        pages: report.pages,
        annotations: report.annotations,
        skipped: report.skipped,
        elapsed_ms: report.elapsed.as_millis() as u64,
    }))
}

// ============ GET /records/{type}/{object} ============

async fn handle_get_record(
    State(state): State<AppState>,
    Path((record_type, object_id)): Path<(String, i64)>,
) -> Result<Json<IndexRecord>, AppError> {
    let record_type = RecordType::parse(&record_type)
        .ok_or_else(|| bad_request(format!("unknown record type: {}", record_type)))?;
    let record = state
        .index
        .get(object_id, record_type)
        .await?
        .ok_or_else(|| AppError::from(IndexError::not_found(record_type, object_id)))?;
    Ok(Json(record))
}
