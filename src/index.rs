//! SQLite-backed search index.
//!
//! [`SearchIndex`] owns every statement that touches the index tables
//! (`search_index`, `search_fts`, `record_terms`). Each mutation runs in one
//! transaction, so a failed upsert or delete leaves the previous state
//! intact.

use chrono::{DateTime, NaiveDateTime};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::codec::decode_term_set;
use crate::error::{IndexError, IndexResult};
use crate::models::{IndexRecord, RecordType};
use crate::query::{Bind, CompiledQuery, SearchQuery, RECORD_COLUMNS};

/// Outcome of [`SearchIndex::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted(i64),
    Replaced(i64),
}

impl Upserted {
    pub fn id(&self) -> i64 {
        match self {
            Upserted::Inserted(id) | Upserted::Replaced(id) => *id,
        }
    }
}

/// Record counts for `sift stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: i64,
    pub pages: i64,
    pub annotations: i64,
    pub protected: i64,
}

impl IndexStats {
    pub fn total(&self) -> i64 {
        self.documents + self.pages + self.annotations
    }
}

/// Handle to the index tables. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct SearchIndex {
    pool: SqlitePool,
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    binds: &'q [Bind],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for bind in binds {
        query = match bind {
            Bind::Int(v) => query.bind(*v),
            Bind::Text(v) => query.bind(v.as_str()),
        };
    }
    query
}

/// The `WHERE` fragment selecting a record's key family.
fn family_clause(record_type: RecordType) -> &'static str {
    if record_type.is_annotation() {
        "object = ? AND type = 'annotation'"
    } else {
        "object = ? AND type IN ('document', 'page')"
    }
}

fn timestamp(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

fn from_timestamp(ts: i64) -> IndexResult<NaiveDateTime> {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| IndexError::Validation(format!("post_date out of range in index: {}", ts)))
}

fn record_from_row(row: &SqliteRow) -> IndexResult<IndexRecord> {
    let type_str: String = row.try_get("type")?;
    let record_type = RecordType::parse(&type_str)
        .ok_or_else(|| IndexError::Validation(format!("unknown record type in index: {}", type_str)))?;
    let protected: i64 = row.try_get("protected")?;

    Ok(IndexRecord {
        id: Some(row.try_get("id")?),
        object_id: row.try_get("object")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        post_date: from_timestamp(row.try_get("post_date")?)?,
        parent_id: row.try_get("parent")?,
        categories: row.try_get("categories")?,
        tags: row.try_get("tags")?,
        author: row.try_get("author")?,
        record_type,
        protected: protected != 0,
    })
}

impl SearchIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Surrogate id of the record for `object_id` in `record_type`'s family.
    pub async fn find_id(&self, object_id: i64, record_type: RecordType) -> IndexResult<Option<i64>> {
        let sql = format!("SELECT id FROM search_index WHERE {}", family_clause(record_type));
        let id: Option<i64> = sqlx::query_scalar(&sql)
            .bind(object_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn get(&self, object_id: i64, record_type: RecordType) -> IndexResult<Option<IndexRecord>> {
        let sql = format!(
            "SELECT {} FROM search_index r WHERE r.{}",
            RECORD_COLUMNS,
            family_clause(record_type).replace(" AND type", " AND r.type")
        );
        let row = sqlx::query(&sql)
            .bind(object_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    /// Replaces the existing record for the object (keeping its id) or
    /// inserts a new one.
    pub async fn upsert(&self, record: &IndexRecord) -> IndexResult<Upserted> {
        let categories = decode_term_set(&record.categories)?;
        let tags = decode_term_set(&record.tags)?;

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT id FROM search_index WHERE {}", family_clause(record.record_type));
        let existing: Option<i64> = sqlx::query_scalar(&sql)
            .bind(record.object_id)
            .fetch_optional(&mut *tx)
            .await?;

        let outcome = match existing {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE search_index SET
                        title = ?, content = ?, post_date = ?, parent = ?,
                        categories = ?, tags = ?, author = ?, type = ?, protected = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&record.title)
                .bind(&record.content)
                .bind(timestamp(&record.post_date))
                .bind(record.parent_id)
                .bind(&record.categories)
                .bind(&record.tags)
                .bind(&record.author)
                .bind(record.record_type.as_str())
                .bind(record.protected as i64)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                delete_dependents(&mut tx, id).await?;
                Upserted::Replaced(id)
            }
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO search_index (object, title, content, post_date, parent,
                                              categories, tags, author, type, protected)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(record.object_id)
                .bind(&record.title)
                .bind(&record.content)
                .bind(timestamp(&record.post_date))
                .bind(record.parent_id)
                .bind(&record.categories)
                .bind(&record.tags)
                .bind(&record.author)
                .bind(record.record_type.as_str())
                .bind(record.protected as i64)
                .execute(&mut *tx)
                .await?;
                Upserted::Inserted(result.last_insert_rowid())
            }
        };

        let id = outcome.id();
        sqlx::query("INSERT INTO search_fts (rowid, title, content) VALUES (?, ?, ?)")
            .bind(id)
            .bind(&record.title)
            .bind(&record.content)
            .execute(&mut *tx)
            .await?;

        for (taxonomy, ids) in [("category", &categories), ("tag", &tags)] {
            for term_id in ids {
                sqlx::query("INSERT INTO record_terms (record_id, taxonomy, term_id) VALUES (?, ?, ?)")
                    .bind(id)
                    .bind(taxonomy)
                    .bind(*term_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Removes the record for the object, returning how many rows went.
    /// Removing something that is not indexed is a no-op.
    pub async fn delete(&self, object_id: i64, record_type: RecordType) -> IndexResult<u64> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT id FROM search_index WHERE {}", family_clause(record_type));
        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(object_id)
            .fetch_all(&mut *tx)
            .await?;

        for id in &ids {
            delete_dependents(&mut tx, *id).await?;
            sqlx::query("DELETE FROM search_index WHERE id = ?")
                .bind(*id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(ids.len() as u64)
    }

    /// Empties every index table.
    pub async fn clear(&self) -> IndexResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM record_terms").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM search_fts").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM search_index").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Every record, ordered by type then object id.
    pub async fn all_records(&self) -> IndexResult<Vec<IndexRecord>> {
        let sql = format!(
            "SELECT {} FROM search_index r ORDER BY r.type, r.object",
            RECORD_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    pub async fn stats(&self) -> IndexResult<IndexStats> {
        let rows = sqlx::query(
            "SELECT type, COUNT(*) AS n, SUM(protected) AS p FROM search_index GROUP BY type",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = IndexStats::default();
        for row in &rows {
            let kind: String = row.try_get("type")?;
            let n: i64 = row.try_get("n")?;
            let p: Option<i64> = row.try_get("p")?;
            match RecordType::parse(&kind) {
                Some(RecordType::Document) => stats.documents = n,
                Some(RecordType::Page) => stats.pages = n,
                Some(RecordType::Annotation) => stats.annotations = n,
                None => continue,
            }
            stats.protected += p.unwrap_or(0);
        }
        Ok(stats)
    }

    /// Runs the count query of `query`.
    pub async fn count(&self, query: &SearchQuery) -> IndexResult<i64> {
        let compiled = query.count();
        let row = bind_all(sqlx::query(&compiled.sql), &compiled.binds)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Runs the page query of `query`.
    pub async fn fetch_page(&self, query: &SearchQuery) -> IndexResult<Vec<IndexRecord>> {
        let compiled: CompiledQuery = query.select();
        let rows = bind_all(sqlx::query(&compiled.sql), &compiled.binds)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }
}

async fn delete_dependents(tx: &mut Transaction<'_, Sqlite>, id: i64) -> IndexResult<()> {
    sqlx::query("DELETE FROM search_fts WHERE rowid = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM record_terms WHERE record_id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
