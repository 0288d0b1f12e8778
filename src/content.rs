//! Content store abstraction.
//!
//! The hosting application owns documents, pages, annotations, authors and
//! taxonomy terms. The [`ContentStore`] trait is the only way the indexer
//! reads them, so any backend (a CMS database, an HTTP API, a fixture) can
//! be plugged in.
//!
//! [`MemoryContentStore`] is the in-process implementation used by the CLI,
//! the HTTP server and the tests. It is filled from a JSON snapshot
//! ([`ContentSnapshot`]) exported by the host.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ContentError;
use crate::models::{Annotation, Author, ContentItem, TermAssociation};

/// Read access to the system of record.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_content_item`](ContentStore::get_content_item) | One document, page or variant by id |
/// | [`get_annotation`](ContentStore::get_annotation) | One annotation by id |
/// | [`get_author_name`](ContentStore::get_author_name) | Display name of an author |
/// | [`get_term_associations`](ContentStore::get_term_associations) | Category/tag memberships of an object |
/// | [`list_all_content_items`](ContentStore::list_all_content_items) | Every content item, any kind |
/// | [`list_all_annotations`](ContentStore::list_all_annotations) | Every annotation |
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_content_item(&self, id: i64) -> Result<ContentItem, ContentError>;

    async fn get_annotation(&self, id: i64) -> Result<Annotation, ContentError>;

    async fn get_author_name(&self, author_id: i64) -> Result<String, ContentError>;

    async fn get_term_associations(
        &self,
        object_id: i64,
    ) -> Result<Vec<TermAssociation>, ContentError>;

    async fn list_all_content_items(&self) -> Result<Vec<ContentItem>, ContentError>;

    async fn list_all_annotations(&self) -> Result<Vec<Annotation>, ContentError>;
}

/// Serialized export of a content store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSnapshot {
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub terms: Vec<TermAssociation>,
}

impl ContentSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content snapshot: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse content snapshot: {}", path.display()))
    }
}

#[derive(Default)]
struct Contents {
    // Vec keeps insertion order so listings are deterministic.
    items: Vec<ContentItem>,
    annotations: Vec<Annotation>,
    authors: HashMap<i64, String>,
    terms: HashMap<i64, Vec<TermAssociation>>,
}

impl From<ContentSnapshot> for Contents {
    fn from(snapshot: ContentSnapshot) -> Self {
        let mut terms: HashMap<i64, Vec<TermAssociation>> = HashMap::new();
        for assoc in snapshot.terms {
            terms.entry(assoc.object_id).or_default().push(assoc);
        }
        Contents {
            items: snapshot.items,
            annotations: snapshot.annotations,
            authors: snapshot
                .authors
                .into_iter()
                .map(|a| (a.id, a.display_name))
                .collect(),
            terms,
        }
    }
}

/// In-memory content store.
pub struct MemoryContentStore {
    inner: RwLock<Contents>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Contents::default()),
        }
    }

    pub fn from_snapshot(snapshot: ContentSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot.into()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_snapshot(ContentSnapshot::load(path)?))
    }

    /// Swaps the whole contents, e.g. after the host re-exported its snapshot.
    pub fn replace(&self, snapshot: ContentSnapshot) {
        *self.write() = snapshot.into();
    }

    pub fn put_item(&self, item: ContentItem) {
        let mut inner = self.write();
        inner.items.retain(|i| i.id != item.id);
        inner.items.push(item);
    }

    pub fn remove_item(&self, id: i64) {
        self.write().items.retain(|i| i.id != id);
    }

    pub fn put_annotation(&self, annotation: Annotation) {
        let mut inner = self.write();
        inner.annotations.retain(|a| a.id != annotation.id);
        inner.annotations.push(annotation);
    }

    pub fn remove_annotation(&self, id: i64) {
        self.write().annotations.retain(|a| a.id != id);
    }

    pub fn put_author(&self, id: i64, display_name: &str) {
        self.write().authors.insert(id, display_name.to_string());
    }

    /// Replaces every term association of `object_id`.
    pub fn set_terms(&self, object_id: i64, terms: Vec<TermAssociation>) {
        self.write().terms.insert(object_id, terms);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Contents> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Contents> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn get_content_item(&self, id: i64) -> Result<ContentItem, ContentError> {
        self.read()
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or(ContentError::NotFound { kind: "content", id })
    }

    async fn get_annotation(&self, id: i64) -> Result<Annotation, ContentError> {
        self.read()
            .annotations
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(ContentError::NotFound { kind: "annotation", id })
    }

    async fn get_author_name(&self, author_id: i64) -> Result<String, ContentError> {
        self.read()
            .authors
            .get(&author_id)
            .cloned()
            .ok_or(ContentError::NotFound {
                kind: "author",
                id: author_id,
            })
    }

    async fn get_term_associations(
        &self,
        object_id: i64,
    ) -> Result<Vec<TermAssociation>, ContentError> {
        Ok(self.read().terms.get(&object_id).cloned().unwrap_or_default())
    }

    async fn list_all_content_items(&self) -> Result<Vec<ContentItem>, ContentError> {
        Ok(self.read().items.clone())
    }

    async fn list_all_annotations(&self) -> Result<Vec<Annotation>, ContentError> {
        Ok(self.read().annotations.clone())
    }
}
