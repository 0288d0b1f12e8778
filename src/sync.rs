//! Incremental index maintenance.
//!
//! Content mutations arrive as typed [`LifecycleEvent`]s. A single
//! [`Synchronizer`] consumes them in order from a `tokio::sync::mpsc`
//! channel, re-reads the affected item from the [`ContentStore`], and
//! replaces or removes its index record. Every successful mutation is
//! announced as a [`Reindexed`] notification on a broadcast channel.
//!
//! The content store always wins: an upsert for an item that no longer
//! exists removes its record instead.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::codec::{derive_annotation_record, derive_record, TermSnapshot};
use crate::content::ContentStore;
use crate::error::{ContentError, IndexError, IndexResult};
use crate::index::{SearchIndex, Upserted};
use crate::models::{AnnotationStatus, ContentItem, IndexRecord, RecordType};
use crate::rebuild::{rebuild_all, RebuildReport};

const NOTIFY_CAPACITY: usize = 256;

/// A change in the content store that the index must follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A document or page was deleted.
    ContentDeleted { id: i64 },
    /// A document or page was created, edited or changed status.
    ContentUpserted { id: i64 },
    AnnotationCreated { id: i64 },
    AnnotationEdited {
        id: i64,
        #[serde(default)]
        status: Option<AnnotationStatus>,
    },
    AnnotationDeleted { id: i64 },
}

impl LifecycleEvent {
    pub const KINDS: [&'static str; 5] = [
        "content_deleted",
        "content_upserted",
        "annotation_created",
        "annotation_edited",
        "annotation_deleted",
    ];

    /// Builds an event from its kind name, as typed on the command line.
    pub fn from_parts(kind: &str, id: i64, status: Option<&str>) -> IndexResult<Self> {
        let status = match status {
            Some(s) => Some(AnnotationStatus::parse(s).ok_or_else(|| {
                IndexError::Validation(format!("unknown annotation status: {}", s))
            })?),
            None => None,
        };

        match kind {
            "content_deleted" => Ok(LifecycleEvent::ContentDeleted { id }),
            "content_upserted" => Ok(LifecycleEvent::ContentUpserted { id }),
            "annotation_created" => Ok(LifecycleEvent::AnnotationCreated { id }),
            "annotation_edited" => Ok(LifecycleEvent::AnnotationEdited { id, status }),
            "annotation_deleted" => Ok(LifecycleEvent::AnnotationDeleted { id }),
            _ => Err(IndexError::Validation(format!(
                "unknown event kind '{}'. Available: {}",
                kind,
                Self::KINDS.join(", ")
            ))),
        }
    }
}

/// Broadcast after the index changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reindexed {
    Upserted {
        object_id: i64,
        record_type: RecordType,
        id: i64,
    },
    Removed {
        object_id: i64,
        record_type: RecordType,
    },
    Rebuilt {
        records: usize,
    },
}

/// What applying one event did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Indexed(Upserted),
    /// Number of records removed, `0` when nothing was indexed.
    Removed(u64),
    /// The item is of a kind that is never indexed.
    Skipped,
}

/// Display name for an item's author. Unknown authors index as "".
pub(crate) async fn resolve_author(
    content: &dyn ContentStore,
    author_id: Option<i64>,
) -> IndexResult<String> {
    let Some(author_id) = author_id else {
        return Ok(String::new());
    };
    match content.get_author_name(author_id).await {
        Ok(name) => Ok(name),
        Err(ContentError::NotFound { .. }) => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn resolve_terms(
    content: &dyn ContentStore,
    object_id: i64,
) -> IndexResult<TermSnapshot> {
    let associations = content.get_term_associations(object_id).await?;
    Ok(TermSnapshot::from_associations(&associations))
}

/// Derives the record for a document or page, or `None` for kinds that are
/// never indexed.
pub(crate) async fn resolve_record(
    content: &dyn ContentStore,
    item: &ContentItem,
) -> IndexResult<Option<IndexRecord>> {
    if item.kind.record_type().is_none() {
        return Ok(None);
    }
    let author = resolve_author(content, item.author_id).await?;
    let terms = resolve_terms(content, item.id).await?;
    derive_record(item, &author, &terms).map(Some)
}

pub struct Synchronizer {
    content: Arc<dyn ContentStore>,
    index: SearchIndex,
    notifier: broadcast::Sender<Reindexed>,
}

impl Synchronizer {
    pub fn new(content: Arc<dyn ContentStore>, index: SearchIndex) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            content,
            index,
            notifier,
        }
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Reindexed> {
        self.notifier.subscribe()
    }

    fn notify(&self, event: Reindexed) {
        // Err only means nobody is listening.
        let _ = self.notifier.send(event);
    }

    /// Removes the record of a deleted document/page or annotation.
    pub async fn on_content_deleted(
        &self,
        object_id: i64,
        record_type: RecordType,
    ) -> IndexResult<SyncOutcome> {
        let removed = self.index.delete(object_id, record_type).await?;
        if removed > 0 {
            tracing::debug!(object_id, %record_type, "removed index record");
            self.notify(Reindexed::Removed {
                object_id,
                record_type,
            });
        }
        Ok(SyncOutcome::Removed(removed))
    }

    /// Re-derives the record for a document or page.
    pub async fn on_content_upserted(&self, object_id: i64) -> IndexResult<SyncOutcome> {
        let item = match self.content.get_content_item(object_id).await {
            Ok(item) => item,
            Err(ContentError::NotFound { .. }) => {
                tracing::debug!(object_id, "content vanished, removing record");
                return self.on_content_deleted(object_id, RecordType::Document).await;
            }
            Err(e) => return Err(e.into()),
        };

        match resolve_record(self.content.as_ref(), &item).await? {
            Some(record) => self.store(record).await,
            None => {
                tracing::debug!(object_id, kind = ?item.kind, "skipping non-searchable content");
                Ok(SyncOutcome::Skipped)
            }
        }
    }

    /// Re-derives the record for an annotation, inheriting the parent
    /// document's categories and tags.
    pub async fn on_annotation_upserted(&self, annotation_id: i64) -> IndexResult<SyncOutcome> {
        let annotation = match self.content.get_annotation(annotation_id).await {
            Ok(annotation) => annotation,
            Err(ContentError::NotFound { .. }) => {
                tracing::debug!(annotation_id, "annotation vanished, removing record");
                return self.on_annotation_deleted(annotation_id).await;
            }
            Err(e) => return Err(e.into()),
        };

        let parent_terms = resolve_terms(self.content.as_ref(), annotation.parent_id).await?;
        let record = derive_annotation_record(&annotation, &parent_terms)?;
        self.store(record).await
    }

    /// Same as [`on_annotation_upserted`](Self::on_annotation_upserted); the
    /// reported status is only logged since the stored annotation wins.
    pub async fn on_annotation_edited(
        &self,
        annotation_id: i64,
        status: Option<AnnotationStatus>,
    ) -> IndexResult<SyncOutcome> {
        tracing::debug!(annotation_id, ?status, "annotation edited");
        self.on_annotation_upserted(annotation_id).await
    }

    pub async fn on_annotation_deleted(&self, annotation_id: i64) -> IndexResult<SyncOutcome> {
        self.on_content_deleted(annotation_id, RecordType::Annotation)
            .await
    }

    async fn store(&self, record: IndexRecord) -> IndexResult<SyncOutcome> {
        let upserted = self.index.upsert(&record).await?;
        tracing::debug!(
            object_id = record.object_id,
            record_type = %record.record_type,
            id = upserted.id(),
            "indexed record"
        );
        self.notify(Reindexed::Upserted {
            object_id: record.object_id,
            record_type: record.record_type,
            id: upserted.id(),
        });
        Ok(SyncOutcome::Indexed(upserted))
    }

    pub async fn apply(&self, event: LifecycleEvent) -> IndexResult<SyncOutcome> {
        match event {
            LifecycleEvent::ContentDeleted { id } => {
                self.on_content_deleted(id, RecordType::Document).await
            }
            LifecycleEvent::ContentUpserted { id } => self.on_content_upserted(id).await,
            LifecycleEvent::AnnotationCreated { id } => self.on_annotation_upserted(id).await,
            LifecycleEvent::AnnotationEdited { id, status } => {
                self.on_annotation_edited(id, status).await
            }
            LifecycleEvent::AnnotationDeleted { id } => self.on_annotation_deleted(id).await,
        }
    }

    /// Clears and regenerates the whole index.
    pub async fn rebuild(&self) -> IndexResult<RebuildReport> {
        let report = rebuild_all(self.content.as_ref(), &self.index).await?;
        self.notify(Reindexed::Rebuilt {
            records: report.total(),
        });
        Ok(report)
    }

    /// Applies events until every sender is dropped. A failed event is
    /// logged and the loop moves on to the next one.
    pub async fn run(&self, mut events: mpsc::Receiver<LifecycleEvent>) {
        while let Some(event) = events.recv().await {
            match self.apply(event.clone()).await {
                Ok(outcome) => tracing::debug!(?event, ?outcome, "applied event"),
                Err(e) => tracing::warn!(?event, error = %e, "failed to apply event"),
            }
        }
        tracing::debug!("event channel closed");
    }

    /// Starts the consumer loop on its own task.
    pub fn spawn(
        self: Arc<Self>,
        buffer: usize,
    ) -> (mpsc::Sender<LifecycleEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer);
        let handle = tokio::spawn(async move { self.run(rx).await });
        (tx, handle)
    }
}
