//! In-memory [`VectorIndex`] for tests.
//!
//! Entries live in a `Vec` behind `std::sync::RwLock`; nothing is persisted.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{top_k, validate_batch, VectorIndex};
use crate::embedding::cosine_similarity;
use crate::models::{Chunk, ScoredChunk};

struct StoredEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Default)]
pub struct InMemoryIndex {
    entries: RwLock<Vec<StoredEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory index lock poisoned")
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
        validate_batch(chunks, embeddings)?;
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.extend(chunks.iter().zip(embeddings).map(|(chunk, vector)| StoredEntry {
            chunk: chunk.clone(),
            vector: vector.clone(),
        }));
        Ok(chunks.len())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let entries = self.entries.read().map_err(poisoned)?;
        let scored = entries
            .iter()
            .map(|entry| ScoredChunk {
                text: entry.chunk.text.clone(),
                metadata: entry.chunk.metadata.clone(),
                score: cosine_similarity(vector, &entry.vector),
            })
            .collect();
        Ok(top_k(scored, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }

    async fn source_counts(&self) -> Result<Vec<(String, usize)>> {
        let entries = self.entries.read().map_err(poisoned)?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in entries.iter() {
            let source = entry.chunk.source().unwrap_or("Unknown").to_string();
            *counts.entry(source).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}
