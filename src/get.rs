//! Record retrieval by object id.
//!
//! Used by the `sift get` CLI command. The HTTP server answers
//! `GET /records/{type}/{object}` from [`SearchIndex::get`] directly.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::db;
use crate::index::SearchIndex;
use crate::models::RecordType;

/// CLI entry point: looks up the record and prints it to stdout.
pub async fn run_get(config: &Config, object_id: i64, annotation: bool) -> Result<()> {
    let record_type = if annotation {
        RecordType::Annotation
    } else {
        RecordType::Document
    };

    let pool = db::connect(config).await?;
    let index = SearchIndex::new(pool);
    let record = index.get(object_id, record_type).await;
    index.close().await;

    let Some(record) = record? else {
        bail!("{} {} is not indexed", record_type, object_id);
    };

    println!("--- Record ---");
    println!("id:          {}", record.id.unwrap_or_default());
    println!("object:      {}", record.object_id);
    println!("type:        {}", record.record_type);
    if !record.title.is_empty() {
        println!("title:       {}", record.title);
    }
    if record.parent_id != 0 {
        println!("parent:      {}", record.parent_id);
    }
    if !record.author.is_empty() {
        println!("author:      {}", record.author);
    }
    println!("post_date:   {}", record.post_date.format("%Y-%m-%dT%H:%M:%SZ"));
    println!("categories:  {}", record.categories);
    println!("tags:        {}", record.tags);
    println!("protected:   {}", record.protected);
    println!();

    println!("--- Content ---");
    println!("{}", record.content);

    Ok(())
}
