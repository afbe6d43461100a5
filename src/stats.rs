//! Vector index statistics.
//!
//! Quick summary of what has been ingested: entry counts, embedding models
//! present and a per-source breakdown. Used by `shiprag stats` to confirm an
//! ingestion run did what was expected.

use std::path::Path;

use anyhow::Result;
use sqlx::Row;

use crate::context::AppContext;
use crate::db;
use crate::migrate;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub size_bytes: u64,
    pub entries: i64,
    /// `(model, entries)`, most used first.
    pub models: Vec<(String, i64)>,
    pub sources: Vec<SourceStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceStats {
    pub source: String,
    pub entries: i64,
    pub last_ingested_ts: i64,
}

/// Read statistics from the index at `path`, or `None` if it was never
/// created.
pub async fn collect_stats(path: &Path) -> Result<Option<IndexStats>> {
    if !path.exists() {
        return Ok(None);
    }

    let pool = db::connect(path).await?;
    migrate::run_migrations(&pool).await?;

    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
        .fetch_one(&pool)
        .await?;

    let models = sqlx::query(
        "SELECT model, COUNT(*) AS n FROM entries GROUP BY model ORDER BY n DESC, model ASC",
    )
    .fetch_all(&pool)
    .await?
    .iter()
    .map(|row| (row.get("model"), row.get("n")))
    .collect();

    let sources = sqlx::query(
        r#"
        SELECT source, COUNT(*) AS n, MAX(created_at) AS last_ts
        FROM entries
        GROUP BY source
        ORDER BY n DESC, source ASC
        "#,
    )
    .fetch_all(&pool)
    .await?
    .iter()
    .map(|row| SourceStats {
        source: row.get("source"),
        entries: row.get("n"),
        last_ingested_ts: row.get("last_ts"),
    })
    .collect();

    pool.close().await;

    let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    Ok(Some(IndexStats {
        size_bytes,
        entries,
        models,
        sources,
    }))
}

/// Run the stats command: read the index and print a summary.
pub async fn run_stats(ctx: &AppContext) -> Result<()> {
    let path = ctx.index_path();

    println!("Ship RAG — Index Stats");
    println!("======================");
    println!();
    println!("  Index:       {}", path.display());

    let stats = match collect_stats(&path).await? {
        Some(stats) => stats,
        None => {
            println!("  Status:      not created (run `shiprag ingest`)");
            println!();
            return Ok(());
        }
    };

    println!("  Size:        {}", format_bytes(stats.size_bytes));
    println!();
    println!("  Entries:     {}", stats.entries);
    for (model, n) in &stats.models {
        println!("  Model:       {} ({} entries)", model, n);
    }

    if !stats.sources.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<48} {:>8}   {}", "SOURCE", "ENTRIES", "LAST INGEST");
        println!("  {}", "-".repeat(76));

        for s in &stats.sources {
            println!(
                "  {:<48} {:>8}   {}",
                s.source,
                s.entries,
                format_ts_relative(s.last_ingested_ts)
            );
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{SqliteIndex, VectorIndex};
    use crate::models::{Chunk, Metadata, SOURCE_KEY};

    fn chunk(source: &str) -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.into(), serde_json::json!(source));
        Chunk {
            text: "text".into(),
            metadata,
            hash: String::new(),
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_format_ts_relative() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 7200), "2 hours ago");
        assert_eq!(format_ts_relative(0), "1970-01-01 00:00");
    }

    #[tokio::test]
    async fn test_collect_stats_missing_index() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        assert!(collect_stats(&path).await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_collect_stats_per_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        let index = SqliteIndex::new(&path, "all-minilm-l6-v2");
        index
            .add(
                &[chunk("a.pdf"), chunk("a.pdf"), chunk("b.pdf")],
                &[vec![1.0], vec![1.0], vec![1.0]],
            )
            .await
            .unwrap();
        index.close().await;

        let stats = collect_stats(&path).await.unwrap().unwrap();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.models, vec![("all-minilm-l6-v2".to_string(), 3)]);
        assert_eq!(stats.sources.len(), 2);
        assert_eq!(stats.sources[0].source, "a.pdf");
        assert_eq!(stats.sources[0].entries, 2);
        assert!(stats.size_bytes > 0);
    }
}
