//! Tracing subscriber setup.
//!
//! Two layers: a console layer on stderr (stdout is reserved for command
//! output) and an optional append-only file layer under `paths.logs_dir`.
//! The file layer always records the analyst at `debug`, which captures the
//! retrieved passages, the rendered prompt and the raw model response.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::context::AppContext;

/// Filter directive enabling the analyst's trace output.
const ANALYST_TRACE: &str = "ship_rag::analyst=debug";

/// Install the global subscriber. Call once, after [`AppContext::prepare_dirs`].
pub fn init(ctx: &AppContext) -> Result<()> {
    let level = ctx.config.logging.level.as_str();

    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid logging.level: '{}'", level))?,
    };
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = if ctx.config.logging.to_file {
        let path = ctx.log_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        let filter = EnvFilter::try_new(file_directives(level))
            .with_context(|| format!("Invalid logging.level: '{}'", level))?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(filter),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn file_directives(level: &str) -> String {
    format!("{},{}", level, ANALYST_TRACE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_filter_adds_analyst_trace() {
        assert_eq!(file_directives("warn"), "warn,ship_rag::analyst=debug");
        assert!(EnvFilter::try_new(file_directives("info")).is_ok());
    }
}
