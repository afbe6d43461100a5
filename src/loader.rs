//! Strategy-driven PDF document loader.
//!
//! [`DocumentLoader`] maps each [`ParsingStrategy`] to a [`PdfBackend`]
//! through a static lookup table. The table is probed once when the loader
//! is built: a backend that is not available in this build is replaced by
//! the fast-text backend, with a warning, so ingestion never fails because
//! of a missing backend.
//!
//! Every page becomes one [`Document`] carrying `source`, `file_path`,
//! `page` (0-based), `total_pages`, `strategy` and `parser` metadata.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};

use crate::error::{ConfigError, LoadError};
use crate::extract::{FastTextBackend, PdfBackend, TableBackend};
use crate::models::{Document, Metadata, SOURCE_KEY};

/// How a PDF should be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParsingStrategy {
    /// Plain text, optimised for speed on simply laid out documents.
    FastText,
    /// Keeps data tables (limits, set points) as delimited rows.
    #[default]
    TableHeavy,
    /// Markdown rendering for mixed layouts.
    LayoutComplex,
}

impl ParsingStrategy {
    pub const ALL: [ParsingStrategy; 3] = [
        ParsingStrategy::FastText,
        ParsingStrategy::TableHeavy,
        ParsingStrategy::LayoutComplex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParsingStrategy::FastText => "fast_text",
            ParsingStrategy::TableHeavy => "table_heavy",
            ParsingStrategy::LayoutComplex => "layout",
        }
    }
}

impl fmt::Display for ParsingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParsingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParsingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.to_string()))
    }
}

/// One row of the backend table: the strategy and a probe that returns the
/// backend when it is usable in this build.
struct BackendEntry {
    strategy: ParsingStrategy,
    probe: fn() -> Option<Box<dyn PdfBackend>>,
}

const BACKENDS: &[BackendEntry] = &[
    BackendEntry {
        strategy: ParsingStrategy::FastText,
        probe: probe_fast_text,
    },
    BackendEntry {
        strategy: ParsingStrategy::TableHeavy,
        probe: probe_table,
    },
    BackendEntry {
        strategy: ParsingStrategy::LayoutComplex,
        probe: probe_layout,
    },
];

fn probe_fast_text() -> Option<Box<dyn PdfBackend>> {
    Some(Box::new(FastTextBackend))
}

fn probe_table() -> Option<Box<dyn PdfBackend>> {
    Some(Box::new(TableBackend))
}

#[cfg(feature = "layout-markdown")]
fn probe_layout() -> Option<Box<dyn PdfBackend>> {
    Some(Box::new(crate::extract::LayoutBackend))
}

#[cfg(not(feature = "layout-markdown"))]
fn probe_layout() -> Option<Box<dyn PdfBackend>> {
    None
}

pub struct DocumentLoader {
    backends: HashMap<ParsingStrategy, Arc<dyn PdfBackend>>,
    /// Strategy actually served for each requested strategy.
    resolved: HashMap<ParsingStrategy, ParsingStrategy>,
}

impl DocumentLoader {
    /// Build the loader from the built-in backend table.
    pub fn probe() -> Self {
        Self::from_table(BACKENDS)
    }

    fn from_table(table: &[BackendEntry]) -> Self {
        let mut backends: HashMap<ParsingStrategy, Arc<dyn PdfBackend>> = HashMap::new();
        for entry in table {
            if let Some(backend) = (entry.probe)() {
                backends.insert(entry.strategy, Arc::from(backend));
            }
        }

        let mut resolved = HashMap::new();
        for strategy in ParsingStrategy::ALL {
            if backends.contains_key(&strategy) {
                resolved.insert(strategy, strategy);
            } else {
                warn!(
                    "Parsing backend for '{}' is not available in this build, falling back to '{}'",
                    strategy,
                    ParsingStrategy::FastText
                );
                resolved.insert(strategy, ParsingStrategy::FastText);
            }
        }

        Self { backends, resolved }
    }

    /// Install `backend` for `strategy`, replacing whatever the probe chose.
    pub fn with_backend(mut self, strategy: ParsingStrategy, backend: impl PdfBackend + 'static) -> Self {
        self.backends.insert(strategy, Arc::new(backend));
        self.resolved.insert(strategy, strategy);
        self
    }

    /// The strategy whose backend serves requests for `strategy`.
    pub fn resolve(&self, strategy: ParsingStrategy) -> ParsingStrategy {
        self.resolved
            .get(&strategy)
            .copied()
            .unwrap_or(ParsingStrategy::FastText)
    }

    /// Name of the backend serving `strategy`, if any.
    pub fn backend_name(&self, strategy: ParsingStrategy) -> Option<&'static str> {
        self.backends
            .get(&self.resolve(strategy))
            .map(|backend| backend.name())
    }

    /// Load one PDF as a sequence of page documents.
    ///
    /// Fails with [`LoadError::NotFound`] before any parsing when `path` is
    /// not an existing file.
    pub fn load(&self, path: &Path, strategy: ParsingStrategy) -> Result<Vec<Document>, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }

        let backend = self
            .backends
            .get(&self.resolve(strategy))
            .cloned()
            .ok_or_else(|| LoadError::Parse {
                backend: "none",
                path: path.to_path_buf(),
                message: format!("no parsing backend registered for '{}'", strategy),
            })?;

        info!(
            "Loading {} using strategy: {} ({})",
            path.display(),
            strategy,
            backend.name()
        );

        match parse_pages(path, strategy, backend.as_ref()) {
            Ok(docs) => {
                info!(
                    "Successfully loaded {} document pages from {}",
                    docs.len(),
                    path.display()
                );
                Ok(docs)
            }
            Err(e) => {
                error!("Error loading document {}: {}", path.display(), e);
                Err(e)
            }
        }
    }
}

fn parse_pages(
    path: &Path,
    strategy: ParsingStrategy,
    backend: &dyn PdfBackend,
) -> Result<Vec<Document>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let pages = backend
        .extract_pages(&bytes)
        .map_err(|message| LoadError::Parse {
            backend: backend.name(),
            path: path.to_path_buf(),
            message,
        })?;

    let source = path.display().to_string();
    let total_pages = pages.len();

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(page, text)| {
            let mut metadata = Metadata::new();
            metadata.insert(SOURCE_KEY.to_string(), json!(source));
            metadata.insert("file_path".to_string(), json!(source));
            metadata.insert("page".to_string(), json!(page));
            metadata.insert("total_pages".to_string(), json!(total_pages));
            metadata.insert("strategy".to_string(), json!(strategy.as_str()));
            metadata.insert("parser".to_string(), json!(backend.name()));
            Document::new(text, metadata)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubBackend {
        name: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl StubBackend {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl PdfBackend for StubBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                format!("{} page one", self.name),
                format!("{} page two", self.name),
            ])
        }
    }

    struct FailingBackend;

    impl PdfBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, String> {
            Err("corrupt xref table".to_string())
        }
    }

    fn stub_loader() -> DocumentLoader {
        DocumentLoader::probe()
            .with_backend(ParsingStrategy::FastText, StubBackend::new("stub-fast"))
            .with_backend(ParsingStrategy::TableHeavy, StubBackend::new("stub-table"))
            .with_backend(ParsingStrategy::LayoutComplex, StubBackend::new("stub-layout"))
    }

    fn temp_pdf() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4 placeholder").unwrap();
        file
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(ParsingStrategy::FastText.as_str(), "fast_text");
        assert_eq!(ParsingStrategy::TableHeavy.as_str(), "table_heavy");
        assert_eq!(ParsingStrategy::LayoutComplex.as_str(), "layout");
        assert_eq!(ParsingStrategy::default(), ParsingStrategy::TableHeavy);
    }

    #[test]
    fn test_strategy_from_str() {
        for strategy in ParsingStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<ParsingStrategy>(), Ok(strategy));
        }
        assert_eq!(
            "ocr".parse::<ParsingStrategy>(),
            Err(ConfigError::UnknownStrategy("ocr".into()))
        );
    }

    #[test]
    fn test_dispatches_each_strategy_to_its_backend() {
        let loader = stub_loader();
        let file = temp_pdf();
        for (strategy, expected) in [
            (ParsingStrategy::FastText, "stub-fast"),
            (ParsingStrategy::TableHeavy, "stub-table"),
            (ParsingStrategy::LayoutComplex, "stub-layout"),
        ] {
            let docs = loader.load(file.path(), strategy).unwrap();
            assert_eq!(docs.len(), 2);
            assert_eq!(docs[0].metadata["parser"], json!(expected));
            assert_eq!(docs[0].metadata["strategy"], json!(strategy.as_str()));
            assert_eq!(docs[1].metadata["page"], json!(1));
            assert_eq!(docs[1].metadata["total_pages"], json!(2));
            assert_eq!(docs[0].source(), Some(file.path().display().to_string().as_str()));
        }
    }

    #[test]
    fn test_missing_file_is_not_found_before_parsing() {
        let stub = StubBackend::new("stub");
        let calls = stub.calls.clone();
        let loader = DocumentLoader::probe().with_backend(ParsingStrategy::FastText, stub);

        for strategy in ParsingStrategy::ALL {
            let err = loader
                .load(Path::new("non_existent_file.pdf"), strategy)
                .unwrap_err();
            assert!(matches!(err, LoadError::NotFound(_)), "got {:?}", err);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = stub_loader()
            .load(dir.path(), ParsingStrategy::FastText)
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn test_backend_failure_is_wrapped() {
        let loader = DocumentLoader::probe().with_backend(ParsingStrategy::TableHeavy, FailingBackend);
        let file = temp_pdf();
        let err = loader.load(file.path(), ParsingStrategy::TableHeavy).unwrap_err();
        match err {
            LoadError::Parse { backend, message, .. } => {
                assert_eq!(backend, "failing");
                assert!(message.contains("corrupt xref"));
            }
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_layout_falls_back_to_fast_text_when_unavailable() {
        fn unavailable() -> Option<Box<dyn PdfBackend>> {
            None
        }
        let table = [
            BackendEntry {
                strategy: ParsingStrategy::FastText,
                probe: probe_fast_text,
            },
            BackendEntry {
                strategy: ParsingStrategy::LayoutComplex,
                probe: unavailable,
            },
        ];
        let loader = DocumentLoader::from_table(&table);
        assert_eq!(
            loader.resolve(ParsingStrategy::LayoutComplex),
            ParsingStrategy::FastText
        );
        assert_eq!(
            loader.backend_name(ParsingStrategy::LayoutComplex),
            Some("pdf-extract")
        );

        let loader = loader.with_backend(ParsingStrategy::FastText, StubBackend::new("stub-fast"));
        let file = temp_pdf();
        let docs = loader.load(file.path(), ParsingStrategy::LayoutComplex).unwrap();
        assert_eq!(docs[0].metadata["parser"], json!("stub-fast"));
        assert_eq!(docs[0].metadata["strategy"], json!("layout"));
    }

    #[test]
    fn test_probe_registers_builtin_backends() {
        let loader = DocumentLoader::probe();
        assert_eq!(loader.backend_name(ParsingStrategy::FastText), Some("pdf-extract"));
        assert_eq!(loader.backend_name(ParsingStrategy::TableHeavy), Some("lopdf-table"));
        #[cfg(feature = "layout-markdown")]
        assert_eq!(
            loader.backend_name(ParsingStrategy::LayoutComplex),
            Some("pdf-markdown")
        );
    }
}
