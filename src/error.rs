//! Typed errors at component seams.
//!
//! Orchestration code and the CLI use `anyhow`; the loader, the strategy
//! selector and the LLM client return these so callers can tell a missing
//! file from a parser failure, or a failed generation from everything else.

use std::path::PathBuf;

use thiserror::Error;

/// Failure loading one document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The path does not reference an existing file. Raised before parsing.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The parsing backend rejected the file.
    #[error("{backend} could not parse {}: {message}", path.display())]
    Parse {
        backend: &'static str,
        path: PathBuf,
        message: String,
    },
}

/// Invalid user-supplied settings, detected before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown parsing strategy '{0}': expected one of fast_text, table_heavy, layout")]
    UnknownStrategy(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_path() {
        let err = LoadError::NotFound(PathBuf::from("manuals/missing.pdf"));
        assert_eq!(err.to_string(), "file not found: manuals/missing.pdf");
    }

    #[test]
    fn unknown_strategy_lists_choices() {
        let err = ConfigError::UnknownStrategy("ocr".into());
        assert!(err.to_string().contains("fast_text, table_heavy, layout"));
    }
}
