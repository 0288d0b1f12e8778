//! Search execution and result formatting.
//!
//! [`search`] turns normalized [`SearchFlags`] into a [`SearchQuery`], runs
//! its count and page statements against the [`SearchIndex`] and packages
//! the answer as a [`SearchResponse`]. [`run_search`] is the `sift search`
//! entry point that prints the response.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::db;
use crate::error::IndexResult;
use crate::flags::{RawParams, SearchFlags};
use crate::index::SearchIndex;
use crate::models::{IndexRecord, RecordType};
use crate::query::SearchQuery;

/// One page of matches plus the totals needed to paginate.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub total_count: i64,
    pub records: Vec<IndexRecord>,
    pub current_page: i64,
    pub page_count: i64,
    pub no_results: bool,
}

impl SearchResponse {
    fn empty(current_page: i64) -> Self {
        Self {
            total_count: 0,
            records: Vec::new(),
            current_page,
            page_count: 1,
            no_results: true,
        }
    }

    /// Records paired with their display excerpt.
    pub fn hits(&self, excerpt_chars: usize) -> Vec<SearchHit> {
        self.records
            .iter()
            .map(|record| SearchHit {
                excerpt: excerpt(&record.content, excerpt_chars),
                record: record.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub record: IndexRecord,
    pub excerpt: String,
}

/// Number of pages for `total` matches; never less than one.
pub fn page_count(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 1;
    }
    (total + page_size - 1) / page_size
}

pub async fn search(
    index: &SearchIndex,
    flags: &SearchFlags,
    page_size: i64,
) -> IndexResult<SearchResponse> {
    if flags.match_expression().is_empty() {
        tracing::debug!(query = flags.query_string(), "no searchable terms");
        return Ok(SearchResponse::empty(flags.page()));
    }

    let query = SearchQuery::from_flags(flags, page_size);
    let total_count = index.count(&query).await?;
    let records = if total_count > query.window().offset() {
        index.fetch_page(&query).await?
    } else {
        Vec::new()
    };

    tracing::debug!(
        query = flags.query_string(),
        total_count,
        page = flags.page(),
        returned = records.len(),
        "search executed"
    );

    Ok(SearchResponse {
        total_count,
        records,
        current_page: flags.page(),
        page_count: page_count(total_count, page_size),
        no_results: total_count == 0,
    })
}

/// Plain-text summary of a record body: markup stripped, cut to at most
/// `chars` characters at a word boundary, with `...` appended when cut.
pub fn excerpt(content: &str, chars: usize) -> String {
    let text = strip_tags(content);
    let text = text.trim();
    if text.chars().count() <= chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(chars).collect();
    let cut = match cut.rfind(' ') {
        Some(pos) => &cut[..pos],
        None => "",
    };
    format!("{}...", cut.trim_end())
}

fn strip_tags(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

pub async fn run_search(config: &Config, params: &RawParams) -> Result<()> {
    let flags = SearchFlags::from_params(params);
    if flags.match_expression().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let index = SearchIndex::new(pool);
    let response = search(&index, &flags, config.search.page_size).await;
    index.close().await;
    let response = response?;

    if response.no_results {
        println!("No results.");
        return Ok(());
    }

    let first = (response.current_page - 1).saturating_mul(config.search.page_size);
    for (i, hit) in response.hits(config.search.excerpt_chars).iter().enumerate() {
        let record = &hit.record;
        let title = match record.record_type {
            RecordType::Annotation => format!("(annotation on {})", record.parent_id),
            _ if record.title.is_empty() => "(untitled)".to_string(),
            _ => record.title.clone(),
        };

        println!(
            "{}. [{}] {}",
            first.saturating_add(i as i64 + 1),
            record.record_type,
            title
        );
        println!("    posted: {}", record.post_date.format("%Y-%m-%d"));
        if !record.author.is_empty() {
            println!("    author: {}", record.author);
        }
        println!("    excerpt: \"{}\"", hit.excerpt.replace('\n', " "));
        println!("    object: {}", record.object_id);
        println!();
    }

    println!(
        "page {} of {} ({} results)",
        response.current_page, response.page_count, response.total_count
    );
    Ok(())
}
