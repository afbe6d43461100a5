//! Process-wide application context.
//!
//! Built once in `main` from the loaded [`Config`] and passed to the
//! commands. Directory creation happens here, explicitly, and nowhere else.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

/// File name of the SQLite vector index inside `paths.vector_store_dir`.
pub const INDEX_FILE: &str = "index.sqlite";

/// File name of the log file inside `paths.logs_dir`.
pub const LOG_FILE: &str = "app.log";

#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create the directories the process writes to (logs, model cache,
    /// vector store). Input directories are never created.
    pub fn prepare_dirs(&self) -> Result<()> {
        let paths = &self.config.paths;
        for dir in [&paths.logs_dir, &paths.models_dir, &paths.vector_store_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn index_path(&self) -> PathBuf {
        self.config.paths.vector_store_dir.join(INDEX_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.config.paths.logs_dir.join(LOG_FILE)
    }

    pub fn manuals_dir(&self) -> &Path {
        &self.config.paths.manuals_dir
    }

    pub fn alarms_dir(&self) -> &Path {
        &self.config.paths.alarms_dir
    }
}
