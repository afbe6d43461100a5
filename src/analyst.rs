//! Retrieval-augmented alarm analysis.
//!
//! # Pipeline
//!
//! ```text
//! AlarmQuery
//!   → "Alarm {code}: {question}"
//!   → embed → top-K chunks from the index
//!   → context (chunk texts joined by a blank line)
//!   → prompt (context + sensor snapshot + code + question)
//!   → LLM
//!   → answer text, or the fallback message on any failure
//! ```
//!
//! [`RagAnalyst::analyze`] never returns an error: the operator always gets
//! text back. Failures are logged with their cause.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::context::AppContext;
use crate::embedding::{self, EmbeddingProvider};
use crate::index::{SqliteIndex, VectorIndex};
use crate::llm::{GenerationError, LlmClient, OllamaClient};
use crate::models::{AlarmQuery, ScoredChunk};
use crate::prompt::{render_prompt, FALLBACK_MESSAGE};

/// Characters of each retrieved chunk shown in the debug trace.
const PREVIEW_CHARS: usize = 100;

pub struct RagAnalyst {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl RagAnalyst {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            top_k: top_k.max(1),
        }
    }

    /// Wire the production collaborators: configured embedder, the persisted
    /// SQLite index (opened on first query) and the Ollama client.
    pub fn from_context(ctx: &AppContext) -> Result<Self> {
        let config = &ctx.config;
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::from(embedding::create_provider(&config.embedding, &config.paths.models_dir)?);
        let index = Arc::new(SqliteIndex::new(ctx.index_path(), embedder.model_name()));
        let llm = Arc::new(OllamaClient::new(&config.llm)?);

        info!(
            llm = %config.llm.model,
            temperature = config.llm.temperature,
            embedder = embedder.model_name(),
            "analyst ready"
        );

        Ok(Self::new(embedder, index, llm, config.retrieval.top_k))
    }

    /// The `top_k` chunks most relevant to `query`.
    pub async fn retrieve(&self, query: &AlarmQuery) -> Result<Vec<ScoredChunk>> {
        let vector = embedding::embed_query(self.embedder.as_ref(), &query.retrieval_query()).await?;
        self.index.query(&vector, self.top_k).await
    }

    /// Analyse one alarm. Returns the model's answer verbatim, or
    /// [`FALLBACK_MESSAGE`] if retrieval or generation fails.
    pub async fn analyze(&self, query: &AlarmQuery) -> String {
        let started = Instant::now();
        info!(
            "Starting analysis for {} with sensors {}",
            query.alarm_code, query.sensors
        );

        let docs = match self.retrieve(query).await {
            Ok(docs) => docs,
            Err(e) => {
                error!("Retrieval failed for {}: {:#}", query.alarm_code, e);
                return FALLBACK_MESSAGE.to_string();
            }
        };

        debug!("Retrieved {} documents", docs.len());
        for (i, doc) in docs.iter().enumerate() {
            let preview: String = doc.text.chars().take(PREVIEW_CHARS).collect();
            debug!(
                "Doc {} (Source: {}, score {:.3}): {}...",
                i + 1,
                doc.source(),
                doc.score,
                preview
            );
        }

        let context = docs
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = render_prompt(&context, query);
        debug!("Final prompt:\n{}", prompt);

        let answer = match self.llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => fallback_for(&e),
        };
        debug!("Response:\n{}", answer);

        info!(
            "Analysis completed in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        answer
    }
}

fn fallback_for(err: &GenerationError) -> String {
    error!("Error during analysis: {}", err);
    FALLBACK_MESSAGE.to_string()
}
