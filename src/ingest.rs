//! Ingestion pipeline orchestration.
//!
//! Coordinates the batch flow: discover PDFs → load (per strategy) →
//! split into chunks → embed → one append to the vector index.
//!
//! A file that fails to load is logged and skipped; the run continues with
//! the remaining files. A missing manuals directory aborts the run before
//! anything is written. The alarms directory is optional.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::chunk::TextSplitter;
use crate::context::AppContext;
use crate::embedding::{self, EmbeddingProvider};
use crate::index::{SqliteIndex, VectorIndex};
use crate::loader::{DocumentLoader, ParsingStrategy};
use crate::models::Chunk;

/// How an ingestion run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Chunks were embedded and appended to the index.
    Indexed,
    /// No file produced any chunk; the index was not touched.
    NoChunks,
    /// The manuals directory does not exist; nothing was loaded or written.
    MissingManualsDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub strategy: ParsingStrategy,
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub chunks: usize,
    pub entries_written: usize,
    pub outcome: IngestOutcome,
}

/// Loaded and split content, not yet embedded.
#[derive(Debug)]
pub struct Collection {
    pub strategy: ParsingStrategy,
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub chunks: Vec<Chunk>,
    manuals_missing: bool,
}

impl Collection {
    /// Whether writing this collection would touch the index.
    pub fn needs_indexing(&self) -> bool {
        !self.manuals_missing && !self.chunks.is_empty()
    }

    fn report(&self, outcome: IngestOutcome, entries_written: usize) -> IngestReport {
        IngestReport {
            strategy: self.strategy,
            files_found: self.files_found,
            files_loaded: self.files_loaded,
            files_skipped: self.files_skipped,
            chunks: self.chunks.len(),
            entries_written,
            outcome,
        }
    }

    /// Report for a collection that will not be written.
    pub fn unwritten_report(&self) -> IngestReport {
        let outcome = if self.manuals_missing {
            IngestOutcome::MissingManualsDir
        } else if self.chunks.is_empty() {
            IngestOutcome::NoChunks
        } else {
            IngestOutcome::Indexed
        };
        self.report(outcome, 0)
    }
}

pub struct IngestPipeline {
    manuals_dir: PathBuf,
    alarms_dir: PathBuf,
    loader: DocumentLoader,
    splitter: TextSplitter,
    batch_size: usize,
}

impl IngestPipeline {
    pub fn new(
        manuals_dir: impl Into<PathBuf>,
        alarms_dir: impl Into<PathBuf>,
        loader: DocumentLoader,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            manuals_dir: manuals_dir.into(),
            alarms_dir: alarms_dir.into(),
            loader,
            splitter,
            batch_size: 64,
        }
    }

    pub fn from_context(ctx: &AppContext) -> Result<Self> {
        let chunking = &ctx.config.chunking;
        let splitter = TextSplitter::new(chunking.chunk_size, chunking.chunk_overlap)?;
        Ok(Self::new(
            ctx.manuals_dir(),
            ctx.alarms_dir(),
            DocumentLoader::probe(),
            splitter,
        )
        .with_batch_size(ctx.config.embedding.batch_size))
    }

    /// Texts per embedding request.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Full run: collect, embed, append once.
    pub async fn run(
        &self,
        strategy: ParsingStrategy,
        embedder: &dyn EmbeddingProvider,
        index: &dyn VectorIndex,
    ) -> Result<IngestReport> {
        let collection = self.collect(strategy)?;
        self.write(collection, embedder, index).await
    }

    /// Discover, load and split every PDF. Never touches the index.
    pub fn collect(&self, strategy: ParsingStrategy) -> Result<Collection> {
        info!("Starting ingestion with strategy: {}", strategy);

        let mut collection = Collection {
            strategy,
            files_found: 0,
            files_loaded: 0,
            files_skipped: 0,
            chunks: Vec::new(),
            manuals_missing: false,
        };

        if !self.manuals_dir.is_dir() {
            error!(
                "Manuals directory not found: {}",
                self.manuals_dir.display()
            );
            collection.manuals_missing = true;
            return Ok(collection);
        }

        let mut files = find_pdfs(&self.manuals_dir)?;
        info!(
            "Found {} PDF files in {}",
            files.len(),
            self.manuals_dir.display()
        );

        if self.alarms_dir.is_dir() {
            let alarm_files = find_pdfs(&self.alarms_dir)?;
            info!(
                "Found {} PDF files in {}",
                alarm_files.len(),
                self.alarms_dir.display()
            );
            files.extend(alarm_files);
        }

        collection.files_found = files.len();

        for file in &files {
            info!("Processing {}", file.display());
            match self.loader.load(file, strategy) {
                Ok(docs) => {
                    let chunks = self.splitter.split_documents(&docs);
                    info!("Created {} chunks from {}", chunks.len(), file.display());
                    collection.files_loaded += 1;
                    collection.chunks.extend(chunks);
                }
                Err(e) => {
                    error!("Failed to process {}: {}", file.display(), e);
                    collection.files_skipped += 1;
                }
            }
        }

        if collection.chunks.is_empty() {
            info!("No documents processed.");
        }

        Ok(collection)
    }

    /// Embed a collection and append it to `index` in a single call.
    pub async fn write(
        &self,
        collection: Collection,
        embedder: &dyn EmbeddingProvider,
        index: &dyn VectorIndex,
    ) -> Result<IngestReport> {
        if !collection.needs_indexing() {
            return Ok(collection.unwritten_report());
        }

        let texts: Vec<String> = collection.chunks.iter().map(|c| c.text.clone()).collect();
        info!(
            "Embedding {} chunks with {}",
            texts.len(),
            embedder.model_name()
        );
        let vectors = embedding::embed_batched(embedder, &texts, self.batch_size)
            .await
            .context("Failed to embed chunks")?;

        info!("Saving vector store...");
        let written = index
            .add(&collection.chunks, &vectors)
            .await
            .context("Failed to write vector index")?;
        info!("Ingestion complete. Stored {} chunks.", written);

        Ok(collection.report(IngestOutcome::Indexed, written))
    }
}

/// PDF files directly inside `dir` (extension matched case-insensitively),
/// sorted by path.
pub fn find_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let matcher = pdf_matcher()?;
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn pdf_matcher() -> Result<GlobMatcher> {
    Ok(GlobBuilder::new("*.pdf")
        .case_insensitive(true)
        .build()?
        .compile_matcher())
}

/// `shiprag ingest`: run the pipeline against the configured directories
/// and the persisted index, then print a summary.
pub async fn run_ingest(ctx: &AppContext, strategy: ParsingStrategy, dry_run: bool) -> Result<()> {
    let pipeline = IngestPipeline::from_context(ctx)?;
    let collection = pipeline.collect(strategy)?;

    if dry_run {
        let report = collection.unwritten_report();
        println!("ingest {} (dry-run)", strategy);
        print_counts(&report);
        if report.outcome == IngestOutcome::MissingManualsDir {
            println!("  manuals directory not found: {}", ctx.manuals_dir().display());
        }
        return Ok(());
    }

    let report = if collection.needs_indexing() {
        let embedder = embedding::create_provider(&ctx.config.embedding, &ctx.config.paths.models_dir)?;
        let index = SqliteIndex::new(ctx.index_path(), embedder.model_name());
        let report = pipeline.write(collection, embedder.as_ref(), &index).await?;
        let total = index.count().await?;
        index.close().await;
        println!("ingest {}", strategy);
        print_counts(&report);
        println!("  entries written: {}", report.entries_written);
        println!("  index entries: {}", total);
        report
    } else {
        let report = collection.unwritten_report();
        println!("ingest {}", strategy);
        print_counts(&report);
        report
    };

    match report.outcome {
        IngestOutcome::Indexed => println!("ok"),
        IngestOutcome::NoChunks => println!("no chunks produced; index unchanged"),
        IngestOutcome::MissingManualsDir => println!(
            "manuals directory not found: {}",
            ctx.manuals_dir().display()
        ),
    }
    Ok(())
}

fn print_counts(report: &IngestReport) {
    println!("  files found: {}", report.files_found);
    println!("  files loaded: {}", report.files_loaded);
    println!("  files skipped: {}", report.files_skipped);
    println!("  chunks: {}", report.chunks);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_pdfs_filters_sorts_and_ignores_subdirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b_manual.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("A_MANUAL.PDF"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested").join("c.pdf"), b"x").unwrap();

        let names: Vec<String> = find_pdfs(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A_MANUAL.PDF", "b_manual.pdf"]);
    }

    #[test]
    fn test_missing_manuals_dir_collects_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pipeline = IngestPipeline::new(
            tmp.path().join("missing"),
            tmp.path().join("alarms"),
            DocumentLoader::probe(),
            TextSplitter::new(500, 100).unwrap(),
        );
        let collection = pipeline.collect(ParsingStrategy::TableHeavy).unwrap();
        assert!(!collection.needs_indexing());
        assert_eq!(
            collection.unwritten_report().outcome,
            IngestOutcome::MissingManualsDir
        );
    }

    #[test]
    fn test_empty_manuals_dir_is_no_chunks() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pipeline = IngestPipeline::new(
            tmp.path(),
            tmp.path().join("alarms"),
            DocumentLoader::probe(),
            TextSplitter::new(500, 100).unwrap(),
        );
        let report = pipeline
            .collect(ParsingStrategy::FastText)
            .unwrap()
            .unwritten_report();
        assert_eq!(report.files_found, 0);
        assert_eq!(report.outcome, IngestOutcome::NoChunks);
    }
}
