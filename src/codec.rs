//! Mapping between content items and [`IndexRecord`]s.
//!
//! Category and tag sets are stored on the record as a delimiter-wrapped
//! string (`,3,12,`). Every encoded set starts and ends with the delimiter,
//! including the empty set (`,`), so membership of `id` is exactly a
//! substring test for `,id,`. The search path queries the `record_terms`
//! join table instead; the encoded form is what records carry around.
//!
//! Everything here is pure: callers resolve authors and term associations
//! before deriving a record.

use std::collections::BTreeSet;

use crate::error::{IndexError, IndexResult};
use crate::models::{
    Annotation, AnnotationStatus, ContentItem, IndexRecord, PublishStatus, Taxonomy,
    TermAssociation,
};

pub const TERM_DELIMITER: char = ',';

/// Encodes a set of term ids, sorted and de-duplicated.
pub fn encode_term_set<I>(ids: I) -> String
where
    I: IntoIterator<Item = i64>,
{
    let ids: BTreeSet<i64> = ids.into_iter().collect();
    let mut out = String::from(TERM_DELIMITER);
    for id in ids {
        out.push_str(&id.to_string());
        out.push(TERM_DELIMITER);
    }
    out
}

pub fn term_set_contains(encoded: &str, id: i64) -> bool {
    encoded.contains(&format!("{d}{id}{d}", d = TERM_DELIMITER))
}

/// Decodes an encoded term set back into ids.
pub fn decode_term_set(encoded: &str) -> IndexResult<Vec<i64>> {
    if !encoded.starts_with(TERM_DELIMITER) || !encoded.ends_with(TERM_DELIMITER) {
        return Err(IndexError::Validation(format!(
            "term set must be wrapped in '{}': {:?}",
            TERM_DELIMITER, encoded
        )));
    }
    encoded
        .split(TERM_DELIMITER)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| IndexError::Validation(format!("non-numeric term id: {:?}", s)))
        })
        .collect()
}

/// Category and tag ids resolved for one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermSnapshot {
    pub categories: BTreeSet<i64>,
    pub tags: BTreeSet<i64>,
}

impl TermSnapshot {
    pub fn from_associations(associations: &[TermAssociation]) -> Self {
        let mut snapshot = TermSnapshot::default();
        for assoc in associations {
            match assoc.taxonomy {
                Taxonomy::Category => snapshot.categories.insert(assoc.term_id),
                Taxonomy::Tag => snapshot.tags.insert(assoc.term_id),
            };
        }
        snapshot
    }

    fn validate(&self) -> IndexResult<()> {
        if let Some(bad) = self.categories.iter().chain(&self.tags).find(|id| **id < 0) {
            return Err(IndexError::Validation(format!("negative term id: {}", bad)));
        }
        Ok(())
    }
}

fn validate_id(what: &str, id: i64) -> IndexResult<()> {
    if id <= 0 {
        return Err(IndexError::Validation(format!("{} id must be positive, got {}", what, id)));
    }
    Ok(())
}

/// Derives the record for a document or page.
///
/// Fails with [`IndexError::Validation`] for non-searchable kinds, bad ids
/// or negative term ids. The record is protected unless the item is
/// published without a password.
pub fn derive_record(
    item: &ContentItem,
    author_name: &str,
    terms: &TermSnapshot,
) -> IndexResult<IndexRecord> {
    validate_id("content", item.id)?;
    terms.validate()?;

    let record_type = item.kind.record_type().ok_or_else(|| {
        IndexError::Validation(format!("content {} is not a searchable kind", item.id))
    })?;

    let has_password = item.password.as_deref().is_some_and(|p| !p.is_empty());
    let protected = item.status != PublishStatus::Publish || has_password;

    Ok(IndexRecord {
        id: None,
        object_id: item.id,
        title: item.title.clone(),
        content: item.body.clone(),
        post_date: item.published_at,
        parent_id: 0,
        categories: encode_term_set(terms.categories.iter().copied()),
        tags: encode_term_set(terms.tags.iter().copied()),
        author: author_name.to_string(),
        record_type,
        protected,
    })
}

/// Derives the record for an annotation. Categories and tags come from the
/// parent document, not the annotation.
pub fn derive_annotation_record(
    annotation: &Annotation,
    parent_terms: &TermSnapshot,
) -> IndexResult<IndexRecord> {
    validate_id("annotation", annotation.id)?;
    validate_id("parent", annotation.parent_id)?;
    parent_terms.validate()?;

    Ok(IndexRecord {
        id: None,
        object_id: annotation.id,
        title: String::new(),
        content: annotation.body.clone(),
        post_date: annotation.created_at,
        parent_id: annotation.parent_id,
        categories: encode_term_set(parent_terms.categories.iter().copied()),
        tags: encode_term_set(parent_terms.tags.iter().copied()),
        author: annotation.author_name.clone(),
        record_type: crate::models::RecordType::Annotation,
        protected: annotation.status != AnnotationStatus::Approved,
    })
}
