//! SQLite-backed [`VectorIndex`].
//!
//! One row per entry in the `entries` table (see [`crate::migrate`]),
//! vectors stored as little-endian f32 BLOBs. The database file and schema
//! are created on first use, not when the index value is constructed.
//!
//! Queries only consider entries written by the same embedding model, since
//! vectors from different models are not comparable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tokio::sync::OnceCell;
use tracing::debug;

use super::{top_k, validate_batch, VectorIndex};
use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::migrate;
use crate::models::{Chunk, Metadata, ScoredChunk};

pub struct SqliteIndex {
    path: PathBuf,
    model: String,
    pool: OnceCell<SqlitePool>,
}

impl SqliteIndex {
    /// Describe an index at `path` holding vectors from `model`. Nothing is
    /// opened until the first operation.
    pub fn new(path: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            model: model.into(),
            pool: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                debug!(path = %self.path.display(), "opening vector index");
                let pool = db::connect(&self.path).await?;
                migrate::run_migrations(&pool).await?;
                Ok::<_, anyhow::Error>(pool)
            })
            .await
    }

    /// Close the pool if it was opened.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        validate_batch(chunks, embeddings)?;
        let pool = self.pool().await?;
        let now = chrono::Utc::now().timestamp();

        let mut tx = pool.begin().await?;
        for (chunk, vector) in chunks.iter().zip(embeddings) {
            let metadata_json = serde_json::to_string(&chunk.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO entries (id, source, text, hash, metadata_json, model, dims, embedding, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(chunk.source().unwrap_or_default())
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(&metadata_json)
            .bind(&self.model)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit()
            .await
            .context("Failed to commit index batch")?;

        Ok(chunks.len())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let pool = self.pool().await?;
        let rows = sqlx::query(
            "SELECT id, text, metadata_json, embedding FROM entries WHERE model = ? ORDER BY seq ASC",
        )
        .bind(&self.model)
        .fetch_all(pool)
        .await?;

        let scored = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let metadata_json: String = row.get("metadata_json");
                let metadata: Metadata = serde_json::from_str(&metadata_json).with_context(|| {
                    let id: String = row.get("id");
                    format!("Corrupt metadata_json for entry {}", id)
                })?;
                Ok(ScoredChunk {
                    text: row.get("text"),
                    metadata,
                    score: cosine_similarity(vector, &blob_to_vec(&blob)),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(top_k(scored, k))
    }

    async fn count(&self) -> Result<usize> {
        let pool = self.pool().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(pool)
            .await?;
        Ok(count as usize)
    }

    async fn source_counts(&self) -> Result<Vec<(String, usize)>> {
        let pool = self.pool().await?;
        let rows = sqlx::query(
            "SELECT source, COUNT(*) AS entries FROM entries GROUP BY source ORDER BY source ASC",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let source: String = row.get("source");
                let entries: i64 = row.get("entries");
                (source, entries as usize)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SOURCE_KEY;

    fn chunk(text: &str, source: &str) -> Chunk {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.into(), serde_json::json!(source));
        metadata.insert("page".into(), serde_json::json!(2));
        Chunk {
            text: text.into(),
            metadata,
            hash: "h".into(),
        }
    }

    #[tokio::test]
    async fn test_not_created_until_first_use() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("vs").join("index.sqlite");
        let index = SqliteIndex::new(&path, "m");
        assert!(!path.exists());
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(path.exists());
        index.close().await;
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let index = SqliteIndex::new(&path, "m");
        index
            .add(
                &[chunk("E-101 overheat threshold", "a.pdf"), chunk("E-202 low pressure", "b.pdf")],
                &[vec![1.0, 0.0], vec![0.0, 1.0]],
            )
            .await
            .unwrap();
        index.close().await;

        let reopened = SqliteIndex::new(&path, "m");
        assert_eq!(reopened.count().await.unwrap(), 2);
        let hits = reopened.query(&[0.9, 0.1], 1).await.unwrap();
        assert_eq!(hits[0].text, "E-101 overheat threshold");
        assert_eq!(hits[0].source(), "a.pdf");
        assert_eq!(hits[0].metadata["page"], serde_json::json!(2));
        reopened.close().await;
    }

    #[tokio::test]
    async fn test_query_ignores_other_models() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");

        let old = SqliteIndex::new(&path, "old-model");
        old.add(&[chunk("stale", "a.pdf")], &[vec![1.0]]).await.unwrap();
        old.close().await;

        let current = SqliteIndex::new(&path, "new-model");
        assert!(current.query(&[1.0], 3).await.unwrap().is_empty());
        assert_eq!(current.count().await.unwrap(), 1);
        current.close().await;
    }

    #[tokio::test]
    async fn test_rejected_batch_leaves_index_untouched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let index = SqliteIndex::new(tmp.path().join("index.sqlite"), "m");
        let mut orphan = chunk("x", "a.pdf");
        orphan.metadata.remove(SOURCE_KEY);

        assert!(index
            .add(&[chunk("ok", "a.pdf"), orphan], &[vec![1.0], vec![1.0]])
            .await
            .is_err());
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.source_counts().await.unwrap().is_empty());
        index.close().await;
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let index = SqliteIndex::new(tmp.path().join("index.sqlite"), "m");
        index.add(&[chunk("E-101", "a.pdf")], &[vec![1.0]]).await.unwrap();

        sqlx::query("UPDATE entries SET metadata_json = '{not json'")
            .execute(index.pool().await.unwrap())
            .await
            .unwrap();

        let err = index.query(&[1.0], 3).await.unwrap_err();
        assert!(err.to_string().contains("Corrupt metadata_json"), "{}", err);
        index.close().await;
    }
}
