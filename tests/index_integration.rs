//! Integration tests for the synchronizer, rebuilder and search executor.
//!
//! Each test gets its own SQLite file in a temp directory and an in-memory
//! content store it mutates directly, then drives the index through the
//! public library API.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sift::config::Config;
use sift::content::{ContentStore, MemoryContentStore};
use sift::error::{ContentError, IndexError};
use sift::flags::{RawParams, SearchFlags};
use sift::index::{SearchIndex, Upserted};
use sift::models::{
    Annotation, AnnotationStatus, ContentItem, ContentKind, IndexRecord, PublishStatus,
    RecordType, Taxonomy, TermAssociation,
};
use sift::rebuild::rebuild_all;
use sift::search::{search, SearchResponse};
use sift::sync::{LifecycleEvent, Reindexed, SyncOutcome, Synchronizer};
use sift::{db, migrate};
use std::sync::Arc;
use tempfile::TempDir;

// ─── Fixtures ───────────────────────────────────────────────────────

fn test_config(tmp: &TempDir) -> Config {
    let config_content = format!(
        r#"
[db]
path = "{}/data/sift.sqlite"

[search]
page_size = 10
"#,
        tmp.path().display()
    );
    toml::from_str(&config_content).unwrap()
}

fn at(date: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn document(id: i64, title: &str, body: &str, date: &str) -> ContentItem {
    ContentItem {
        id,
        kind: ContentKind::Document,
        title: title.to_string(),
        body: body.to_string(),
        published_at: at(date),
        author_id: Some(1),
        status: PublishStatus::Publish,
        password: None,
    }
}

fn page(id: i64, title: &str, body: &str, date: &str) -> ContentItem {
    ContentItem {
        kind: ContentKind::Page,
        ..document(id, title, body, date)
    }
}

fn annotation(id: i64, parent_id: i64, body: &str) -> Annotation {
    Annotation {
        id,
        parent_id,
        author_name: "Reader".to_string(),
        body: body.to_string(),
        created_at: at("2021-05-02"),
        status: AnnotationStatus::Approved,
    }
}

fn term(object_id: i64, term_id: i64, taxonomy: Taxonomy) -> TermAssociation {
    TermAssociation {
        object_id,
        term_id,
        taxonomy,
    }
}

struct Harness {
    _tmp: TempDir,
    content: Arc<MemoryContentStore>,
    sync: Synchronizer,
}

impl Harness {
    async fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let cfg = test_config(&tmp);
        migrate::run_migrations(&cfg).await.unwrap();
        let pool = db::connect(&cfg).await.unwrap();

        let content = Arc::new(MemoryContentStore::new());
        content.put_author(1, "Ana Lopez");
        let sync = Synchronizer::new(content.clone(), SearchIndex::new(pool));

        Harness {
            _tmp: tmp,
            content,
            sync,
        }
    }

    fn index(&self) -> &SearchIndex {
        self.sync.index()
    }

    async fn put_document(&self, item: ContentItem) -> SyncOutcome {
        let id = item.id;
        self.content.put_item(item);
        self.sync.on_content_upserted(id).await.unwrap()
    }

    async fn put_annotation(&self, annotation: Annotation) -> SyncOutcome {
        let id = annotation.id;
        self.content.put_annotation(annotation);
        self.sync.on_annotation_upserted(id).await.unwrap()
    }

    async fn find(&self, pairs: &[(&str, &str)]) -> SearchResponse {
        let params: RawParams = pairs.iter().copied().collect();
        search(self.index(), &SearchFlags::from_params(&params), 10)
            .await
            .unwrap()
    }
}

fn objects(response: &SearchResponse) -> Vec<i64> {
    response.records.iter().map(|r| r.object_id).collect()
}

async fn is_protected(h: &Harness, id: i64) -> bool {
    h.index()
        .get(id, RecordType::Document)
        .await
        .unwrap()
        .unwrap()
        .protected
}

fn without_ids(records: Vec<IndexRecord>) -> Vec<IndexRecord> {
    records
        .into_iter()
        .map(|r| IndexRecord { id: None, ..r })
        .collect()
}

// ─── Synchronizer ───────────────────────────────────────────────────

#[tokio::test]
async fn test_protected_flag_follows_status_and_password() {
    let h = Harness::new().await;

    h.put_document(document(1, "Open", "body", "2021-01-01")).await;
    h.put_document(ContentItem {
        status: PublishStatus::Draft,
        ..document(2, "Draft", "body", "2021-01-01")
    })
    .await;
    h.put_document(ContentItem {
        password: Some("secret".to_string()),
        ..document(3, "Locked", "body", "2021-01-01")
    })
    .await;
    h.put_document(ContentItem {
        password: Some(String::new()),
        ..document(4, "Empty password", "body", "2021-01-01")
    })
    .await;

    assert!(!is_protected(&h, 1).await);
    assert!(is_protected(&h, 2).await);
    assert!(is_protected(&h, 3).await);
    assert!(!is_protected(&h, 4).await);

    // Publishing the draft clears the flag.
    h.put_document(document(2, "Draft", "body", "2021-01-01")).await;
    assert!(!is_protected(&h, 2).await);
}

#[tokio::test]
async fn test_record_denormalizes_author_and_terms() {
    let h = Harness::new().await;
    h.content.set_terms(
        1,
        vec![
            term(1, 12, Taxonomy::Category),
            term(1, 3, Taxonomy::Category),
            term(1, 8, Taxonomy::Tag),
        ],
    );
    h.put_document(document(1, "Alpine Trails", "Above the tree line", "2021-05-01"))
        .await;

    let record = h.index().get(1, RecordType::Document).await.unwrap().unwrap();
    assert_eq!(record.author, "Ana Lopez");
    assert_eq!(record.categories, ",3,12,");
    assert_eq!(record.tags, ",8,");
    assert_eq!(record.parent_id, 0);
    assert_eq!(record.post_date, at("2021-05-01"));
    assert!(record.has_category(12));
    assert!(!record.has_category(1));
}

#[tokio::test]
async fn test_unknown_author_indexes_empty_name() {
    let h = Harness::new().await;
    h.put_document(ContentItem {
        author_id: Some(99),
        ..document(1, "Orphan", "body", "2021-01-01")
    })
    .await;

    let record = h.index().get(1, RecordType::Document).await.unwrap().unwrap();
    assert_eq!(record.author, "");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let h = Harness::new().await;
    h.put_document(document(1, "Gone soon", "body", "2021-01-01")).await;
    h.put_document(document(2, "Stays", "body", "2021-01-01")).await;

    let first = h
        .sync
        .on_content_deleted(1, RecordType::Document)
        .await
        .unwrap();
    let after_once = h.index().all_records().await.unwrap();
    let second = h
        .sync
        .on_content_deleted(1, RecordType::Document)
        .await
        .unwrap();
    let after_twice = h.index().all_records().await.unwrap();

    assert_eq!(first, SyncOutcome::Removed(1));
    assert_eq!(second, SyncOutcome::Removed(0));
    assert_eq!(after_once, after_twice);
    assert_eq!(after_twice.len(), 1);
    assert_eq!(after_twice[0].object_id, 2);
}

#[tokio::test]
async fn test_deleting_document_keeps_annotation_with_same_object_id() {
    let h = Harness::new().await;
    h.put_document(document(5, "Doc five", "body", "2021-01-01")).await;
    h.put_document(document(1, "Parent", "body", "2021-01-01")).await;
    h.put_annotation(annotation(5, 1, "Annotation five")).await;

    h.sync
        .on_content_deleted(5, RecordType::Document)
        .await
        .unwrap();

    assert!(h.index().get(5, RecordType::Document).await.unwrap().is_none());
    assert!(h.index().get(5, RecordType::Annotation).await.unwrap().is_some());
}

#[tokio::test]
async fn test_vanished_content_is_removed_on_upsert() {
    let h = Harness::new().await;
    h.put_document(document(1, "Short lived", "body", "2021-01-01")).await;

    h.content.remove_item(1);
    let outcome = h.sync.on_content_upserted(1).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Removed(1));
    assert!(h.index().get(1, RecordType::Document).await.unwrap().is_none());

    h.put_annotation(annotation(7, 1, "orphaned note")).await;
    h.content.remove_annotation(7);
    let outcome = h.sync.on_annotation_upserted(7).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Removed(1));
}

#[tokio::test]
async fn test_page_converted_to_document_keeps_surrogate_id() {
    let h = Harness::new().await;
    let SyncOutcome::Indexed(Upserted::Inserted(id)) =
        h.put_document(page(1, "About", "body", "2021-01-01")).await
    else {
        panic!("page should have been inserted");
    };

    let outcome = h
        .put_document(document(1, "About", "body", "2021-01-01"))
        .await;
    assert_eq!(outcome, SyncOutcome::Indexed(Upserted::Replaced(id)));

    let records = h.index().all_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, Some(id));
    assert_eq!(records[0].record_type, RecordType::Document);
}

#[tokio::test]
async fn test_revisions_and_attachments_are_skipped() {
    let h = Harness::new().await;
    let outcome = h
        .put_document(ContentItem {
            kind: ContentKind::Revision,
            ..document(1, "Old draft", "body", "2021-01-01")
        })
        .await;
    assert_eq!(outcome, SyncOutcome::Skipped);

    let outcome = h
        .put_document(ContentItem {
            kind: ContentKind::Attachment,
            ..document(2, "photo.jpg", "", "2021-01-01")
        })
        .await;
    assert_eq!(outcome, SyncOutcome::Skipped);
    assert!(h.index().all_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_annotation_inherits_parent_terms_and_status() {
    let h = Harness::new().await;
    h.content.set_terms(
        1,
        vec![term(1, 3, Taxonomy::Category), term(1, 8, Taxonomy::Tag)],
    );
    h.put_document(document(1, "Parent", "body", "2021-01-01")).await;
    h.put_annotation(annotation(20, 1, "Great granite slabs")).await;
    h.put_annotation(Annotation {
        status: AnnotationStatus::Spam,
        ..annotation(21, 1, "granite cheap pills")
    })
    .await;

    let record = h
        .index()
        .get(20, RecordType::Annotation)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.title, "");
    assert_eq!(record.parent_id, 1);
    assert_eq!(record.categories, ",3,");
    assert_eq!(record.tags, ",8,");
    assert_eq!(record.author, "Reader");
    assert!(!record.protected);

    let spam = h
        .index()
        .get(21, RecordType::Annotation)
        .await
        .unwrap()
        .unwrap();
    assert!(spam.protected);

    let found = h
        .find(&[("s", "granite"), ("cats", "3"), ("types", "comments")])
        .await;
    assert_eq!(objects(&found), vec![20]);
}

#[tokio::test]
async fn test_annotation_edit_rereads_store_status() {
    let h = Harness::new().await;
    h.put_document(document(1, "Parent", "body", "2021-01-01")).await;
    h.put_annotation(annotation(20, 1, "nice")).await;

    // The event claims approval but the store says pending; the store wins.
    h.content.put_annotation(Annotation {
        status: AnnotationStatus::Pending,
        ..annotation(20, 1, "nice")
    });
    h.sync
        .on_annotation_edited(20, Some(AnnotationStatus::Approved))
        .await
        .unwrap();

    let record = h
        .index()
        .get(20, RecordType::Annotation)
        .await
        .unwrap()
        .unwrap();
    assert!(record.protected);
}

#[tokio::test]
async fn test_invalid_record_is_rejected_without_partial_write() {
    let h = Harness::new().await;
    h.put_document(document(1, "Parent", "body", "2021-01-01")).await;
    h.content.put_annotation(annotation(30, 0, "no parent"));

    let err = h.sync.on_annotation_upserted(30).await.unwrap_err();
    assert!(matches!(err, IndexError::Validation(_)));
    assert_eq!(h.index().all_records().await.unwrap().len(), 1);
}

// ─── Event channel ──────────────────────────────────────────────────

#[tokio::test]
async fn test_channel_consumer_applies_events_in_order() {
    let h = Harness::new().await;
    h.content
        .put_item(document(1, "Alpine Trails", "Above the tree line", "2021-05-01"));
    h.content.put_annotation(annotation(2, 1, "Lovely"));
    h.content.put_annotation(annotation(3, 0, "broken"));

    let sync = Arc::new(h.sync);
    let mut notifications = sync.subscribe();
    let (events, consumer) = sync.clone().spawn(16);

    for event in [
        LifecycleEvent::ContentUpserted { id: 1 },
        LifecycleEvent::AnnotationCreated { id: 3 },
        LifecycleEvent::AnnotationCreated { id: 2 },
        LifecycleEvent::ContentDeleted { id: 1 },
        LifecycleEvent::ContentDeleted { id: 1 },
    ] {
        events.send(event).await.unwrap();
    }
    drop(events);
    consumer.await.unwrap();

    // The failing event is skipped and the no-op delete is silent.
    let first = notifications.recv().await.unwrap();
    assert!(matches!(
        first,
        Reindexed::Upserted {
            object_id: 1,
            record_type: RecordType::Document,
            ..
        }
    ));
    let second = notifications.recv().await.unwrap();
    assert!(matches!(
        second,
        Reindexed::Upserted {
            object_id: 2,
            record_type: RecordType::Annotation,
            ..
        }
    ));
    assert_eq!(
        notifications.recv().await.unwrap(),
        Reindexed::Removed {
            object_id: 1,
            record_type: RecordType::Document
        }
    );
    assert!(notifications.try_recv().is_err());

    let records = sync.index().all_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_type, RecordType::Annotation);
}

// ─── Rebuild ────────────────────────────────────────────────────────

async fn seed(h: &Harness) {
    h.content.put_item(document(1, "Alpine Trails", "Above the tree line", "2021-05-01"));
    h.content.put_item(page(2, "About", "Who we are", "2020-01-01"));
    h.content.put_item(ContentItem {
        kind: ContentKind::Revision,
        ..document(3, "Alpine Trails v1", "draft", "2021-04-01")
    });
    h.content.put_annotation(annotation(10, 1, "Lovely trail"));
    h.content.set_terms(1, vec![term(1, 12, Taxonomy::Category)]);
}

#[tokio::test]
async fn test_rebuild_twice_is_identical() {
    let h = Harness::new().await;
    seed(&h).await;

    let first = h.sync.rebuild().await.unwrap();
    let records_first = without_ids(h.index().all_records().await.unwrap());
    let second = h.sync.rebuild().await.unwrap();
    let records_second = without_ids(h.index().all_records().await.unwrap());

    assert_eq!(first.documents, 1);
    assert_eq!(first.pages, 1);
    assert_eq!(first.annotations, 1);
    assert_eq!(first.skipped, 1);
    assert_eq!(first.total(), second.total());
    assert_eq!(records_first, records_second);
    assert_eq!(records_first.len(), 3);
}

#[tokio::test]
async fn test_rebuild_drops_stale_records() {
    let h = Harness::new().await;
    h.put_document(document(50, "Stale", "left over", "2019-01-01")).await;
    seed(&h).await;
    h.content.remove_item(50);

    h.sync.rebuild().await.unwrap();
    assert!(h.index().get(50, RecordType::Document).await.unwrap().is_none());
    assert_eq!(h.index().stats().await.unwrap().total(), 3);
}

#[tokio::test]
async fn test_rebuild_skips_invalid_items_and_finishes() {
    let h = Harness::new().await;
    seed(&h).await;
    h.content.put_annotation(annotation(11, 0, "orphaned note"));
    h.content.put_item(document(4, "Bad terms", "negative term", "2021-03-01"));
    h.content.set_terms(4, vec![term(4, -7, Taxonomy::Tag)]);

    let report = h.sync.rebuild().await.unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.pages, 1);
    assert_eq!(report.annotations, 1);
    assert_eq!(report.skipped, 3);

    assert!(h.index().get(1, RecordType::Document).await.unwrap().is_some());
    assert!(h.index().get(10, RecordType::Annotation).await.unwrap().is_some());
    assert!(h.index().get(4, RecordType::Document).await.unwrap().is_none());
    assert!(h.index().get(11, RecordType::Annotation).await.unwrap().is_none());

    // Still completes on the next run.
    assert_eq!(h.sync.rebuild().await.unwrap().total(), 3);
}

/// Content store whose annotation listing is down.
struct FlakyStore {
    inner: MemoryContentStore,
}

#[async_trait]
impl ContentStore for FlakyStore {
    async fn get_content_item(&self, id: i64) -> Result<ContentItem, ContentError> {
        self.inner.get_content_item(id).await
    }

    async fn get_annotation(&self, _id: i64) -> Result<Annotation, ContentError> {
        Err(ContentError::Unavailable("connection refused".to_string()))
    }

    async fn get_author_name(&self, author_id: i64) -> Result<String, ContentError> {
        self.inner.get_author_name(author_id).await
    }

    async fn get_term_associations(
        &self,
        object_id: i64,
    ) -> Result<Vec<TermAssociation>, ContentError> {
        self.inner.get_term_associations(object_id).await
    }

    async fn list_all_content_items(&self) -> Result<Vec<ContentItem>, ContentError> {
        self.inner.list_all_content_items().await
    }

    async fn list_all_annotations(&self) -> Result<Vec<Annotation>, ContentError> {
        Err(ContentError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_rebuild_failure_after_clear_is_interrupted() {
    let h = Harness::new().await;
    let flaky = FlakyStore {
        inner: MemoryContentStore::new(),
    };
    flaky.inner.put_item(document(1, "One", "body", "2021-01-01"));
    flaky.inner.put_item(document(2, "Two", "body", "2021-01-01"));

    let err = rebuild_all(&flaky, h.index()).await.unwrap_err();
    match err {
        IndexError::RebuildInterrupted { indexed, source } => {
            assert_eq!(indexed, 2);
            assert!(matches!(*source, IndexError::ContentUnavailable(_)));
        }
        other => panic!("expected RebuildInterrupted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unavailable_store_leaves_index_untouched() {
    let h = Harness::new().await;
    h.put_document(document(1, "Parent", "body", "2021-01-01")).await;
    h.put_annotation(annotation(20, 1, "note")).await;

    let flaky: Arc<dyn ContentStore> = Arc::new(FlakyStore {
        inner: MemoryContentStore::new(),
    });
    let sync = Synchronizer::new(flaky, h.index().clone());
    let err = sync.on_annotation_upserted(20).await.unwrap_err();

    assert!(matches!(err, IndexError::ContentUnavailable(_)));
    assert!(h.index().get(20, RecordType::Annotation).await.unwrap().is_some());
}

#[tokio::test]
async fn test_out_of_range_post_date_is_rejected_on_read() {
    let h = Harness::new().await;
    h.put_document(document(1, "Alpine", "alpine", "2021-01-01")).await;
    sqlx::query("UPDATE search_index SET post_date = ? WHERE object = ?")
        .bind(i64::MAX)
        .bind(1_i64)
        .execute(h.index().pool())
        .await
        .unwrap();

    let err = h.index().get(1, RecordType::Document).await.unwrap_err();
    assert!(matches!(err, IndexError::Validation(_)));
}

// ─── Search ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_alpine_end_to_end() {
    let h = Harness::new().await;
    h.put_document(document(1, "Alpine Trails", "Routes above the tree line", "2021-05-01"))
        .await;
    h.put_document(ContentItem {
        password: Some("members".to_string()),
        ..page(2, "Alpine huts", "Members only alpine huts", "2021-05-01")
    })
    .await;
    h.put_annotation(annotation(3, 1, "Best alpine walk ever")).await;

    let response = h
        .find(&[("s", "alpine"), ("types[]", "posts"), ("types[]", "pages")])
        .await;
    assert_eq!(response.total_count, 1);
    assert_eq!(objects(&response), vec![1]);
    assert_eq!(response.records[0].record_type, RecordType::Document);
    assert!(!response.no_results);

    // Without a type restriction the annotation shows up too.
    let everything = h.find(&[("s", "alpine")]).await;
    assert_eq!(everything.total_count, 2);
}

#[tokio::test]
async fn test_type_filter() {
    let h = Harness::new().await;
    h.put_document(document(1, "Granite", "granite wall", "2021-01-01")).await;
    h.put_document(page(2, "Granite page", "granite info", "2021-01-01")).await;
    h.put_annotation(annotation(3, 1, "granite is hard")).await;

    let documents = h.find(&[("s", "granite"), ("types", "posts")]).await;
    assert!(documents
        .records
        .iter()
        .all(|r| r.record_type == RecordType::Document));
    assert_eq!(documents.total_count, 1);

    let all = h.find(&[("s", "granite")]).await;
    let mut kinds: Vec<RecordType> = all.records.iter().map(|r| r.record_type).collect();
    kinds.sort();
    assert_eq!(
        kinds,
        vec![RecordType::Document, RecordType::Page, RecordType::Annotation]
    );
}

#[tokio::test]
async fn test_pagination() {
    let h = Harness::new().await;
    for i in 1..=25 {
        let date = format!("2021-01-{:02}", i);
        h.put_document(document(i, &format!("Ridge {}", i), "ridge walk", &date))
            .await;
    }

    let page3 = h
        .find(&[("s", "ridge"), ("sort", "date"), ("sorttype", "ASC"), ("pg", "3")])
        .await;
    assert_eq!(page3.total_count, 25);
    assert_eq!(page3.page_count, 3);
    assert_eq!(page3.current_page, 3);
    assert_eq!(objects(&page3), vec![21, 22, 23, 24, 25]);

    let page4 = h.find(&[("s", "ridge"), ("pg", "4")]).await;
    assert_eq!(page4.total_count, 25);
    assert!(page4.records.is_empty());
    assert!(!page4.no_results);

    let page1 = h.find(&[("s", "ridge"), ("sort", "date")]).await;
    assert_eq!(objects(&page1)[0], 25);
    assert_eq!(page1.records.len(), 10);
}

#[tokio::test]
async fn test_huge_page_number_is_past_the_end() {
    let h = Harness::new().await;
    for i in 1..=3 {
        h.put_document(document(i, "Ridge", "ridge walk", "2021-01-01")).await;
    }

    let far = h.find(&[("s", "ridge"), ("pg", "9223372036854775807")]).await;
    assert_eq!(far.total_count, 3);
    assert_eq!(far.current_page, i64::MAX);
    assert_eq!(far.page_count, 1);
    assert!(far.records.is_empty());
    assert!(!far.no_results);
}

#[tokio::test]
async fn test_category_membership_is_exact() {
    let h = Harness::new().await;
    for (id, cat) in [(1, 1), (2, 12), (3, 123)] {
        h.content
            .set_terms(id, vec![term(id, cat, Taxonomy::Category)]);
        h.put_document(document(id, "Summit", "summit push", "2021-01-01"))
            .await;
    }

    let twelve = h.find(&[("s", "summit"), ("cats", "12")]).await;
    assert_eq!(objects(&twelve), vec![2]);

    let mut either = objects(&h.find(&[("s", "summit"), ("cats", "1"), ("cats", "123")]).await);
    either.sort();
    assert_eq!(either, vec![1, 3]);
}

#[tokio::test]
async fn test_tag_and_category_filters_combine() {
    let h = Harness::new().await;
    h.content.set_terms(
        1,
        vec![term(1, 4, Taxonomy::Category), term(1, 9, Taxonomy::Tag)],
    );
    h.content.set_terms(2, vec![term(2, 4, Taxonomy::Category)]);
    h.put_document(document(1, "Couloir", "couloir", "2021-01-01")).await;
    h.put_document(document(2, "Couloir two", "couloir", "2021-01-01")).await;

    let both = h.find(&[("s", "couloir"), ("cats", "4"), ("tags", "9")]).await;
    assert_eq!(objects(&both), vec![1]);
}

#[tokio::test]
async fn test_date_bounds_are_independent_components() {
    let h = Harness::new().await;
    h.put_document(document(1, "Early", "scree", "2020-06-15")).await;
    h.put_document(document(2, "Late", "scree", "2021-02-10")).await;

    let from_2021 = h.find(&[("s", "scree"), ("startYear", "2021")]).await;
    assert_eq!(objects(&from_2021), vec![2]);

    // A month bound without a year applies to month-of-year in every year.
    let from_may = h.find(&[("s", "scree"), ("startMonth", "5")]).await;
    assert_eq!(objects(&from_may), vec![1]);

    let until_2020 = h.find(&[("s", "scree"), ("endYear", "2020")]).await;
    assert_eq!(objects(&until_2020), vec![1]);

    let until_march = h.find(&[("s", "scree"), ("endMonth", "3")]).await;
    assert_eq!(objects(&until_march), vec![2]);

    // Day bounds compare day-of-month only.
    let from_12th = h.find(&[("s", "scree"), ("startDay", "12")]).await;
    assert_eq!(objects(&from_12th), vec![1]);

    let until_12th = h.find(&[("s", "scree"), ("endDay", "12")]).await;
    assert_eq!(objects(&until_12th), vec![2]);

    let mut feb_to_june = objects(
        &h.find(&[("s", "scree"), ("startMonth", "2"), ("endMonth", "6")])
            .await,
    );
    feb_to_june.sort();
    assert_eq!(feb_to_june, vec![1, 2]);

    let none = h
        .find(&[("s", "scree"), ("startDay", "11"), ("endDay", "14")])
        .await;
    assert!(none.no_results);
}

#[tokio::test]
async fn test_relevance_ranks_records_matching_more_terms_first() {
    let h = Harness::new().await;
    h.put_document(document(1, "Kit", "crampon and rope on the glacier", "2021-01-01"))
        .await;
    h.put_document(document(2, "Kit", "crampon and axe on the glacier", "2021-01-01"))
        .await;
    h.put_document(document(3, "Kit", "tent and stove in the valley", "2021-01-01"))
        .await;

    let response = h.find(&[("s", "crampon axe")]).await;
    assert_eq!(objects(&response), vec![2, 1]);

    // Direction does not apply to relevance.
    let ascending = h.find(&[("s", "crampon axe"), ("sorttype", "ASC")]).await;
    assert_eq!(objects(&ascending), vec![2, 1]);
}

#[tokio::test]
async fn test_author_filter_is_substring_with_literal_wildcards() {
    let h = Harness::new().await;
    h.put_document(document(1, "Mine", "moraine", "2021-01-01")).await;

    assert_eq!(h.find(&[("s", "moraine"), ("authors", "lop")]).await.total_count, 1);
    assert_eq!(h.find(&[("s", "moraine"), ("authors", "%")]).await.total_count, 0);
    assert_eq!(h.find(&[("s", "moraine"), ("authors", "Bob")]).await.total_count, 0);
}

#[tokio::test]
async fn test_terms_are_or_combined_and_sorted_alpha() {
    let h = Harness::new().await;
    h.put_document(document(1, "bivouac", "bivouac night", "2021-01-01")).await;
    h.put_document(document(2, "Arete", "arete traverse", "2021-01-01")).await;
    h.put_document(document(3, "Cornice", "nothing related", "2021-01-01")).await;

    let response = h
        .find(&[("s", "bivouac arete"), ("sort", "alpha"), ("sorttype", "ASC")])
        .await;
    assert_eq!(objects(&response), vec![2, 1]);
}

#[tokio::test]
async fn test_no_results_is_success() {
    let h = Harness::new().await;
    h.put_document(document(1, "Alpine", "alpine", "2021-01-01")).await;

    let missing = h.find(&[("s", "glacier")]).await;
    assert!(missing.no_results);
    assert_eq!(missing.total_count, 0);
    assert_eq!(missing.page_count, 1);

    let empty = h.find(&[("s", "   ")]).await;
    assert!(empty.no_results);

    let hostile = h.find(&[("s", "\"alpine\" OR title:* NOT ) (")]).await;
    assert_eq!(hostile.total_count, 1);
}
