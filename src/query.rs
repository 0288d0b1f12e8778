//! Query building.
//!
//! A [`SearchQuery`] is an immutable list of typed [`Filter`] clauses plus an
//! ordering and a page window. It compiles into two [`CompiledQuery`] values
//! sharing one predicate: a count and a page of records. User input only
//! ever travels as bound parameters ([`Bind`]); the SQL text is assembled
//! from fixed fragments.
//!
//! Date bounds are independent inequalities on the year, month and day of
//! `post_date`. A `start.month` bound without a year therefore constrains
//! month-of-year across every year.

use crate::flags::{DateBound, SearchFlags, SortDirection, SortKey};
use crate::models::RecordType;

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Int(i64),
    Text(String),
}

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub binds: Vec<Bind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Comparison {
    fn sql(&self) -> &'static str {
        match self {
            Comparison::AtLeast => ">=",
            Comparison::AtMost => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl DatePart {
    fn strftime(&self) -> &'static str {
        match self {
            DatePart::Year => "%Y",
            DatePart::Month => "%m",
            DatePart::Day => "%d",
        }
    }
}

/// One clause of the search predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Escaped FTS5 expression over title and content.
    TextMatch(String),
    /// `protected = 0`.
    Visible,
    Posted(DatePart, Comparison, i64),
    /// Escaped `LIKE` pattern.
    AuthorLike(String),
    /// Member of any of these categories.
    InCategories(Vec<i64>),
    /// Carries any of these tags.
    HasTags(Vec<i64>),
    TypeIn(Vec<RecordType>),
}

impl Filter {
    fn compile(&self, sql: &mut String, binds: &mut Vec<Bind>) {
        match self {
            Filter::TextMatch(expr) => {
                sql.push_str("search_fts MATCH ?");
                binds.push(Bind::Text(expr.clone()));
            }
            Filter::Visible => sql.push_str("r.protected = 0"),
            Filter::Posted(part, cmp, value) => {
                sql.push_str(&format!(
                    "CAST(strftime('{}', r.post_date, 'unixepoch') AS INTEGER) {} ?",
                    part.strftime(),
                    cmp.sql()
                ));
                binds.push(Bind::Int(*value));
            }
            Filter::AuthorLike(pattern) => {
                sql.push_str("r.author LIKE ? ESCAPE '\\'");
                binds.push(Bind::Text(pattern.clone()));
            }
            Filter::InCategories(ids) => compile_membership("category", ids, sql, binds),
            Filter::HasTags(ids) => compile_membership("tag", ids, sql, binds),
            Filter::TypeIn(types) => {
                sql.push_str(&format!("r.type IN ({})", placeholders(types.len())));
                binds.extend(types.iter().map(|t| Bind::Text(t.as_str().to_string())));
            }
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn compile_membership(taxonomy: &str, ids: &[i64], sql: &mut String, binds: &mut Vec<Bind>) {
    sql.push_str(&format!(
        "EXISTS (SELECT 1 FROM record_terms t WHERE t.record_id = r.id AND t.taxonomy = '{}' AND t.term_id IN ({}))",
        taxonomy,
        placeholders(ids.len())
    ));
    binds.extend(ids.iter().map(|id| Bind::Int(*id)));
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Ordering {
    fn sql(&self) -> String {
        let dir = self.direction.sql();
        match self.key {
            // bm25 rank: lower is better, so best matches come first.
            SortKey::Relevance => "search_fts.rank, r.id".to_string(),
            SortKey::Date => format!("r.post_date {dir}, r.id {dir}"),
            SortKey::Alpha => format!("r.title COLLATE NOCASE {dir}, r.id {dir}"),
        }
    }
}

/// `LIMIT`/`OFFSET` for one result page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub page: i64,
    pub page_size: i64,
}

impl Window {
    /// Rows skipped before this page. Saturates for page numbers far past
    /// the end, which then simply select nothing.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.page_size)
    }
}

pub const RECORD_COLUMNS: &str = "r.id, r.object, r.title, r.content, r.post_date, r.parent, \
     r.categories, r.tags, r.author, r.type, r.protected";

const FROM_CLAUSE: &str = "FROM search_fts JOIN search_index r ON r.id = search_fts.rowid";

/// Immutable predicate, ordering and window.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    filters: Vec<Filter>,
    ordering: Ordering,
    window: Window,
}

impl SearchQuery {
    /// Builds the query for a normalized request.
    pub fn from_flags(flags: &SearchFlags, page_size: i64) -> Self {
        let mut filters = vec![
            Filter::TextMatch(flags.match_expression().to_string()),
            Filter::Visible,
        ];

        push_date_filters(&mut filters, flags.start(), Comparison::AtLeast);
        push_date_filters(&mut filters, flags.end(), Comparison::AtMost);

        if let Some(pattern) = flags.author_pattern() {
            filters.push(Filter::AuthorLike(pattern.to_string()));
        }
        if !flags.categories().is_empty() {
            filters.push(Filter::InCategories(flags.categories().to_vec()));
        }
        if !flags.tags().is_empty() {
            filters.push(Filter::HasTags(flags.tags().to_vec()));
        }

        // All three or none means no restriction.
        let types = flags.types();
        if !types.is_empty() && types.len() < RecordType::ALL.len() {
            filters.push(Filter::TypeIn(types.iter().copied().collect()));
        }

        SearchQuery {
            filters,
            ordering: Ordering {
                key: flags.sort(),
                direction: flags.direction(),
            },
            window: Window {
                page: flags.page(),
                page_size,
            },
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    pub fn window(&self) -> Window {
        self.window
    }

    fn predicate(&self) -> (String, Vec<Bind>) {
        let mut sql = String::new();
        let mut binds = Vec::new();
        for (i, filter) in self.filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            filter.compile(&mut sql, &mut binds);
        }
        (sql, binds)
    }

    /// `SELECT COUNT(*)` over the predicate.
    pub fn count(&self) -> CompiledQuery {
        let (predicate, binds) = self.predicate();
        CompiledQuery {
            sql: format!("SELECT COUNT(*) {FROM_CLAUSE}{predicate}"),
            binds,
        }
    }

    /// One ordered page of records.
    pub fn select(&self) -> CompiledQuery {
        let (predicate, mut binds) = self.predicate();
        binds.push(Bind::Int(self.window.page_size));
        binds.push(Bind::Int(self.window.offset()));
        CompiledQuery {
            sql: format!(
                "SELECT {RECORD_COLUMNS} {FROM_CLAUSE}{predicate} ORDER BY {} LIMIT ? OFFSET ?",
                self.ordering.sql()
            ),
            binds,
        }
    }
}

fn push_date_filters(filters: &mut Vec<Filter>, bound: DateBound, cmp: Comparison) {
    if let Some(year) = bound.year {
        filters.push(Filter::Posted(DatePart::Year, cmp, i64::from(year)));
    }
    if let Some(month) = bound.month {
        filters.push(Filter::Posted(DatePart::Month, cmp, i64::from(month)));
    }
    if let Some(day) = bound.day {
        filters.push(Filter::Posted(DatePart::Day, cmp, i64::from(day)));
    }
}
