//! Full index regeneration.
//!
//! [`rebuild_all`] empties the index and re-derives every record from the
//! content store: documents and pages first, then annotations. It is not
//! transactional. An item that cannot become a valid record is logged and
//! counted as skipped. A store failure after the clear leaves a partial
//! index and reports [`IndexError::RebuildInterrupted`]; running it again
//! is safe.

use std::time::{Duration, Instant};

use crate::codec::derive_annotation_record;
use crate::content::ContentStore;
use crate::error::{IndexError, IndexResult};
use crate::index::SearchIndex;
use crate::models::RecordType;
use crate::sync::{resolve_record, resolve_terms};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub documents: usize,
    pub pages: usize,
    pub annotations: usize,
    /// Kinds that are never indexed, plus items rejected as invalid.
    pub skipped: usize,
    pub elapsed: Duration,
}

impl RebuildReport {
    /// Records written.
    pub fn total(&self) -> usize {
        self.documents + self.pages + self.annotations
    }
}

pub async fn rebuild_all(
    content: &dyn ContentStore,
    index: &SearchIndex,
) -> IndexResult<RebuildReport> {
    let started = Instant::now();
    index.clear().await?;
    tracing::info!("index cleared, rebuilding");

    let mut report = RebuildReport::default();
    if let Err(e) = fill(content, index, &mut report).await {
        tracing::warn!(indexed = report.total(), error = %e, "rebuild interrupted");
        return Err(IndexError::RebuildInterrupted {
            indexed: report.total(),
            source: Box::new(e),
        });
    }

    report.elapsed = started.elapsed();
    tracing::info!(
        documents = report.documents,
        pages = report.pages,
        annotations = report.annotations,
        skipped = report.skipped,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "rebuild complete"
    );
    Ok(report)
}

async fn fill(
    content: &dyn ContentStore,
    index: &SearchIndex,
    report: &mut RebuildReport,
) -> IndexResult<()> {
    for item in content.list_all_content_items().await? {
        let record = match resolve_record(content, &item).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                report.skipped += 1;
                continue;
            }
            Err(IndexError::Validation(reason)) => {
                tracing::warn!(object_id = item.id, %reason, "content item skipped");
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        index.upsert(&record).await?;
        match record.record_type {
            RecordType::Page => report.pages += 1,
            _ => report.documents += 1,
        }
    }
    tracing::info!(
        documents = report.documents,
        pages = report.pages,
        "content items indexed"
    );

    for annotation in content.list_all_annotations().await? {
        let parent_terms = resolve_terms(content, annotation.parent_id).await?;
        let record = match derive_annotation_record(&annotation, &parent_terms) {
            Ok(record) => record,
            Err(IndexError::Validation(reason)) => {
                tracing::warn!(annotation_id = annotation.id, %reason, "annotation skipped");
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        index.upsert(&record).await?;
        report.annotations += 1;
    }
    Ok(())
}
