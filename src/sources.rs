use std::path::Path;

use anyhow::Result;

use crate::context::AppContext;
use crate::ingest::find_pdfs;
use crate::loader::{DocumentLoader, ParsingStrategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirStatus {
    pub name: &'static str,
    pub status: String,
    pub healthy: bool,
}

fn dir_status(name: &'static str, dir: &Path, required: bool) -> DirStatus {
    if !dir.is_dir() {
        let status = if required { "MISSING" } else { "NOT PRESENT" };
        return DirStatus {
            name,
            status: status.to_string(),
            healthy: !required,
        };
    }
    match find_pdfs(dir) {
        Ok(files) => DirStatus {
            name,
            status: format!("OK ({} pdf)", files.len()),
            healthy: true,
        },
        Err(e) => DirStatus {
            name,
            status: format!("UNREADABLE: {}", e),
            healthy: false,
        },
    }
}

/// Input directory health. The manuals directory is required, the alarms
/// directory is optional.
pub fn dir_statuses(ctx: &AppContext) -> Vec<DirStatus> {
    vec![
        dir_status("manuals", ctx.manuals_dir(), true),
        dir_status("alarms", ctx.alarms_dir(), false),
    ]
}

/// `(requested, served_by, backend)` for every parsing strategy.
pub fn backend_table(loader: &DocumentLoader) -> Vec<(ParsingStrategy, ParsingStrategy, &'static str)> {
    ParsingStrategy::ALL
        .into_iter()
        .map(|strategy| {
            (
                strategy,
                loader.resolve(strategy),
                loader.backend_name(strategy).unwrap_or("none"),
            )
        })
        .collect()
}

pub fn list_sources(ctx: &AppContext) -> Result<()> {
    println!("{:<16} {:<24} HEALTHY", "INPUT", "STATUS");
    for dir in dir_statuses(ctx) {
        println!("{:<16} {:<24} {}", dir.name, dir.status, dir.healthy);
    }

    println!();
    println!("{:<16} {:<24} SERVED BY", "STRATEGY", "BACKEND");
    let loader = DocumentLoader::probe();
    for (strategy, served_by, backend) in backend_table(&loader) {
        let note = if strategy == served_by {
            String::from("native")
        } else {
            format!("fallback to {}", served_by)
        };
        println!("{:<16} {:<24} {}", strategy.as_str(), backend, note);
    }

    let config = &ctx.config;
    println!();
    println!(
        "{:<16} {} @ {}",
        "llm",
        config.llm.model,
        config.llm.base_url
    );
    let embedding_target = match config.embedding.provider.as_str() {
        "ollama" => config
            .embedding
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string()),
        _ => config.paths.models_dir.display().to_string(),
    };
    println!(
        "{:<16} {} {} @ {}",
        "embedding",
        config.embedding.provider,
        config.embedding.model.as_deref().unwrap_or("default"),
        embedding_target
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_dir_statuses() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("engine.pdf"), b"x").unwrap();

        let mut config = Config::default();
        config.paths.manuals_dir = tmp.path().to_path_buf();
        config.paths.alarms_dir = tmp.path().join("alarms");
        let statuses = dir_statuses(&AppContext::new(config));

        assert_eq!(statuses[0].status, "OK (1 pdf)");
        assert!(statuses[0].healthy);
        assert_eq!(statuses[1].status, "NOT PRESENT");
        assert!(statuses[1].healthy);
    }

    #[test]
    fn test_missing_manuals_is_unhealthy() {
        let mut config = Config::default();
        config.paths.manuals_dir = "does/not/exist".into();
        let statuses = dir_statuses(&AppContext::new(config));
        assert_eq!(statuses[0].status, "MISSING");
        assert!(!statuses[0].healthy);
    }

    #[test]
    fn test_backend_table_covers_all_strategies() {
        let table = backend_table(&DocumentLoader::probe());
        assert_eq!(table.len(), 3);
        assert_eq!(table[0], (ParsingStrategy::FastText, ParsingStrategy::FastText, "pdf-extract"));
        assert_eq!(table[1].2, "lopdf-table");
    }
}
