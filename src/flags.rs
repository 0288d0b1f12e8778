//! Search request normalization.
//!
//! Turns untrusted request parameters ([`RawParams`]) into an immutable
//! [`SearchFlags`] value. Nothing here fails: a malformed value is logged
//! and replaced by its default.
//!
//! Free text leaves this module only in escaped form:
//! [`SearchFlags::match_expression`] is a valid FTS5 expression whatever
//! the input, and [`SearchFlags::author_pattern`] is a `LIKE` pattern with
//! wildcards escaped for `ESCAPE '\'`.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::RecordType;

/// Ordered multimap of raw request parameters.
///
/// Keys are accepted with or without a trailing `[]`, so both
/// `types=posts&types=pages` and `types[]=posts&types[]=pages` work.
#[derive(Debug, Clone, Default)]
pub struct RawParams {
    pairs: Vec<(String, String)>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let key = key.strip_suffix("[]").map(str::to_string).unwrap_or(key);
        self.pairs.push((key, value.into()));
    }

    /// First value for any of `keys`.
    pub fn get(&self, keys: &[&str]) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| keys.contains(&k.as_str()))
            .map(|(_, v)| v.as_str())
    }

    /// Every value for any of `keys`, in request order.
    pub fn get_all(&self, keys: &[&str]) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| keys.contains(&k.as_str()))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = RawParams::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Relevance,
    Date,
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One edge of a date range. Each present component narrows that edge on
/// its own granularity; see [`crate::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DateBound {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl DateBound {
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none()
    }
}

/// Normalized, read-only search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchFlags {
    query_string: String,
    terms: Vec<String>,
    match_expression: String,
    start: DateBound,
    end: DateBound,
    author: Option<String>,
    author_pattern: Option<String>,
    categories: Vec<i64>,
    tags: Vec<i64>,
    types: BTreeSet<RecordType>,
    sort: SortKey,
    direction: SortDirection,
    page: i64,
}

impl SearchFlags {
    /// Normalizes raw parameters. Never fails.
    pub fn from_params(params: &RawParams) -> Self {
        let query_string = params.get(&["s", "q"]).unwrap_or("").trim().to_string();
        let terms = tokenize(&query_string);
        let match_expression = fts_expression(&terms);

        let author = params
            .get(&["author", "authors"])
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);
        let author_pattern = author.as_deref().map(like_pattern);

        let flags = SearchFlags {
            query_string,
            terms,
            match_expression,
            start: date_bound(params, "start"),
            end: date_bound(params, "end"),
            author,
            author_pattern,
            categories: term_ids(params, &["cats", "categories"]),
            tags: term_ids(params, &["tags"]),
            types: record_types(params),
            sort: sort_key(params.get(&["sort"])),
            direction: sort_direction(params.get(&["sorttype", "order"])),
            page: page_number(params.get(&["pg", "page"])),
        };
        tracing::debug!(?flags, "normalized search flags");
        flags
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// FTS5 expression: every term quoted, OR-joined. Empty when no term
    /// can match.
    pub fn match_expression(&self) -> &str {
        &self.match_expression
    }

    pub fn start(&self) -> DateBound {
        self.start
    }

    pub fn end(&self) -> DateBound {
        self.end
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// `%author%` with `%`, `_` and `\` escaped.
    pub fn author_pattern(&self) -> Option<&str> {
        self.author_pattern.as_deref()
    }

    pub fn categories(&self) -> &[i64] {
        &self.categories
    }

    pub fn tags(&self) -> &[i64] {
        &self.tags
    }

    pub fn types(&self) -> &BTreeSet<RecordType> {
        &self.types
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn page(&self) -> i64 {
        self.page
    }
}

// ============ Tokenizing ============

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == '+'
}

fn trim_term(raw: &str) -> &str {
    raw.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace())
}

/// Splits a query into terms. A double-quoted run is one term (an
/// unterminated quote runs to the end); everything else splits on
/// whitespace, `,` and `+`.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut rest = query;

    while let Some(c) = rest.chars().next() {
        if c == '"' {
            let body = &rest[1..];
            let (phrase, next) = match body.find('"') {
                Some(end) => (&body[..end], &body[end + 1..]),
                None => (body, ""),
            };
            terms.push(trim_term(phrase).to_string());
            rest = next;
        } else if is_separator(c) {
            rest = &rest[c.len_utf8()..];
        } else {
            let end = rest
                .find(|ch: char| is_separator(ch) || ch == '"')
                .unwrap_or(rest.len());
            terms.push(trim_term(&rest[..end]).to_string());
            rest = &rest[end..];
        }
    }

    terms.retain(|t| !t.is_empty());
    terms
}

/// Quotes each term as an FTS5 string so operators and column filters in
/// user input are matched literally. Terms without a letter or digit cannot
/// match any token and are left out.
fn fts_expression(terms: &[String]) -> String {
    terms
        .iter()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn like_pattern(author: &str) -> String {
    let mut escaped = String::with_capacity(author.len() + 2);
    escaped.push('%');
    for c in author.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ============ Coercion ============

fn positive_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v > 0)
}

fn date_bound(params: &RawParams, edge: &str) -> DateBound {
    let component = |name: &str, max: i64| {
        let key = format!("{}{}", edge, name);
        let raw = params.get(&[key.as_str()]);
        let value = positive_int(raw);
        match value {
            Some(v) if v <= max => Some(v),
            Some(v) => {
                tracing::debug!(key = %key, value = v, "date component out of range, ignoring");
                None
            }
            None => {
                if raw.is_some_and(|r| !r.trim().is_empty()) {
                    tracing::debug!(key = %key, raw = ?raw, "non-numeric date component, ignoring");
                }
                None
            }
        }
    };

    DateBound {
        year: component("Year", 9999).map(|v| v as i32),
        month: component("Month", 12).map(|v| v as u32),
        day: component("Day", 31).map(|v| v as u32),
    }
}

fn term_ids(params: &RawParams, keys: &[&str]) -> Vec<i64> {
    let ids: BTreeSet<i64> = params
        .get_all(keys)
        .into_iter()
        .filter_map(|raw| {
            let id = positive_int(Some(raw));
            if id.is_none() {
                tracing::debug!(raw, "dropping invalid term id");
            }
            id
        })
        .collect();
    ids.into_iter().collect()
}

fn record_types(params: &RawParams) -> BTreeSet<RecordType> {
    params
        .get_all(&["types", "type"])
        .into_iter()
        .filter_map(|raw| match raw.trim() {
            "posts" | "post" | "documents" | "document" => Some(RecordType::Document),
            "pages" | "page" => Some(RecordType::Page),
            "comments" | "comment" | "annotations" | "annotation" => Some(RecordType::Annotation),
            other => {
                tracing::debug!(value = other, "unknown content type, ignoring");
                None
            }
        })
        .collect()
}

fn sort_key(raw: Option<&str>) -> SortKey {
    match raw {
        Some("date") => SortKey::Date,
        Some("alpha") => SortKey::Alpha,
        _ => SortKey::Relevance,
    }
}

fn sort_direction(raw: Option<&str>) -> SortDirection {
    match raw {
        Some("ASC") | Some("ascending") => SortDirection::Ascending,
        _ => SortDirection::Descending,
    }
}

fn page_number(raw: Option<&str>) -> i64 {
    positive_int(raw).unwrap_or(1)
}
