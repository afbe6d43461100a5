//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the seam between the pipelines and storage.
//! Two implementations are provided:
//!
//! | Type | Backing | Used by |
//! |------|---------|---------|
//! | [`SqliteIndex`] | `index.sqlite` under `paths.vector_store_dir` | the CLI |
//! | [`InMemoryIndex`] | `RwLock<Vec<_>>` | tests |
//!
//! Entries are append-only: this system never updates or deletes them, and
//! ingesting the same manual twice stores its chunks twice.
//!
//! Queries are brute-force cosine similarity, most similar first. Equal
//! scores keep insertion order.

mod memory;
mod sqlite;

pub use memory::InMemoryIndex;
pub use sqlite::SqliteIndex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{Chunk, ScoredChunk};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append one entry per `(chunk, embedding)` pair and return the number
    /// written. The whole batch is rejected, before anything is written, if
    /// the lengths differ or any chunk lacks a `source`.
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize>;

    /// The `k` entries most similar to `vector`.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    /// Total number of stored entries.
    async fn count(&self) -> Result<usize>;

    /// Entry count per source file, sorted by source.
    async fn source_counts(&self) -> Result<Vec<(String, usize)>>;
}

/// Check an `add` batch before any write.
pub(crate) fn validate_batch(chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
    if chunks.len() != embeddings.len() {
        bail!(
            "Index batch mismatch: {} chunks but {} embeddings",
            chunks.len(),
            embeddings.len()
        );
    }
    if let Some(pos) = chunks.iter().position(|c| c.source().is_none()) {
        bail!(
            "Chunk {} has no 'source' metadata; refusing to write batch",
            pos
        );
    }
    Ok(())
}

/// Sort descending by score (stable, so ties keep insertion order) and keep
/// the first `k`.
pub(crate) fn top_k(mut scored: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
    scored
}
