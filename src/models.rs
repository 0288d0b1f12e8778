//! Core data models.
//!
//! Two groups of types live here: the content model handed to us by the
//! hosting application ([`ContentItem`], [`Annotation`], [`TermAssociation`],
//! [`Author`]) and the denormalized [`IndexRecord`] that the search index
//! stores and returns.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::codec::term_set_contains;

/// The kind of an index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Document,
    Page,
    Annotation,
}

impl RecordType {
    pub const ALL: [RecordType; 3] = [
        RecordType::Document,
        RecordType::Page,
        RecordType::Annotation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Document => "document",
            RecordType::Page => "page",
            RecordType::Annotation => "annotation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "document" => Some(RecordType::Document),
            "page" => Some(RecordType::Page),
            "annotation" => Some(RecordType::Annotation),
            _ => None,
        }
    }

    /// Documents and pages share one key space: a page turned into a
    /// document keeps its record.
    pub fn is_annotation(&self) -> bool {
        matches!(self, RecordType::Annotation)
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One denormalized, searchable row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    /// Surrogate key, `None` until the store assigns one.
    pub id: Option<i64>,
    pub object_id: i64,
    pub title: String,
    pub content: String,
    pub post_date: NaiveDateTime,
    /// Parent document of an annotation, `0` otherwise.
    pub parent_id: i64,
    /// Delimiter-encoded category ids, e.g. `,3,12,`.
    pub categories: String,
    /// Delimiter-encoded tag ids.
    pub tags: String,
    pub author: String,
    pub record_type: RecordType,
    pub protected: bool,
}

impl IndexRecord {
    pub fn has_category(&self, term_id: i64) -> bool {
        term_set_contains(&self.categories, term_id)
    }

    pub fn has_tag(&self, term_id: i64) -> bool {
        term_set_contains(&self.tags, term_id)
    }
}

// ============ Content model ============

/// Kind of a content item in the hosting application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Document,
    Page,
    /// Snapshot of an earlier version of a document or page.
    Revision,
    Attachment,
}

impl ContentKind {
    /// Maps searchable kinds to their record type; revisions and attachments
    /// are never indexed.
    pub fn record_type(&self) -> Option<RecordType> {
        match self {
            ContentKind::Document => Some(RecordType::Document),
            ContentKind::Page => Some(RecordType::Page),
            ContentKind::Revision | ContentKind::Attachment => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Publish,
    Draft,
    Pending,
    Private,
    Future,
    Trash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    Approved,
    Pending,
    Spam,
    Trash,
}

impl AnnotationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" | "approve" | "1" => Some(AnnotationStatus::Approved),
            "pending" | "hold" | "0" => Some(AnnotationStatus::Pending),
            "spam" => Some(AnnotationStatus::Spam),
            "trash" => Some(AnnotationStatus::Trash),
            _ => None,
        }
    }
}

/// A document, page or non-searchable variant held by the content store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub kind: ContentKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub published_at: NaiveDateTime,
    #[serde(default)]
    pub author_id: Option<i64>,
    pub status: PublishStatus,
    #[serde(default)]
    pub password: Option<String>,
}

/// A reader annotation attached to a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: i64,
    pub parent_id: i64,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub body: String,
    pub created_at: NaiveDateTime,
    pub status: AnnotationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Taxonomy {
    Category,
    /// Any non-category taxonomy counts as a tag.
    #[serde(other)]
    Tag,
}

/// Membership of a content item in a taxonomy term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermAssociation {
    pub object_id: i64,
    pub term_id: i64,
    pub taxonomy: Taxonomy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub display_name: String,
}
