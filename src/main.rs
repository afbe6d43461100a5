//! # Ship RAG CLI (`shiprag`)
//!
//! Ingests shipboard manuals into a local vector index and analyses alarms
//! against it with a locally hosted language model.
//!
//! ## Usage
//!
//! ```bash
//! shiprag --config ./config/shiprag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shiprag ingest` | Parse, chunk, embed and index the manuals and alarm PDFs |
//! | `shiprag analyze --code <code>` | Diagnose an alarm from manuals + sensor readings |
//! | `shiprag stats` | Show what the vector index holds |
//! | `shiprag sources` | Check input directories, parsers and endpoints |
//!
//! ## Examples
//!
//! ```bash
//! # Index everything with the table-preserving parser
//! shiprag ingest --strategy table_heavy
//!
//! # Analyse an alarm with live readings
//! shiprag analyze --code E-101 --temp 90 --pressure 120 --sensor rpm=720
//! ```

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

use ship_rag::analyst::RagAnalyst;
use ship_rag::config;
use ship_rag::context::AppContext;
use ship_rag::ingest;
use ship_rag::loader::ParsingStrategy;
use ship_rag::logging;
use ship_rag::models::{AlarmQuery, SensorSnapshot, DEFAULT_QUESTION};
use ship_rag::sources;
use ship_rag::stats;

const DEFAULT_CONFIG: &str = "./config/shiprag.toml";

/// Ship RAG — offline alarm analysis over shipboard technical manuals.
#[derive(Parser)]
#[command(
    name = "shiprag",
    about = "Ship RAG — offline alarm analysis over shipboard technical manuals",
    version,
    long_about = "Ship RAG indexes technical manuals and alarm documentation (PDF) into a local \
    vector index, then answers alarm questions by retrieving the most relevant passages and \
    asking a locally hosted language model for a diagnosis grounded in them."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/shiprag.toml`; built-in defaults are used when
    /// that file does not exist. An explicitly given file must exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the manuals and alarm documentation.
    ///
    /// Every PDF in the manuals directory (and the alarms directory, if
    /// present) is parsed, split into overlapping chunks, embedded and
    /// appended to the vector index. Files that fail to parse are logged
    /// and skipped. Running twice indexes the same content twice.
    Ingest {
        /// Parsing strategy: fast_text, table_heavy or layout.
        #[arg(long, default_value = "table_heavy", value_parser = parse_strategy)]
        strategy: ParsingStrategy,

        /// Parse and chunk only; print counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Analyse an alarm against the indexed manuals.
    Analyze {
        /// Alarm code, e.g. `E-101`.
        #[arg(long)]
        code: String,

        /// Temperature reading.
        #[arg(long, default_value_t = 25.0)]
        temp: f64,

        /// Pressure reading.
        #[arg(long, default_value_t = 101.3)]
        pressure: f64,

        /// Question for the analyst.
        #[arg(long, default_value = DEFAULT_QUESTION)]
        question: String,

        /// Additional reading as `name=value` (repeatable).
        #[arg(long = "sensor", value_parser = parse_sensor)]
        sensors: Vec<(String, f64)>,
    },

    /// Show vector index statistics.
    Stats,

    /// Show input directories, parser backends and model endpoints.
    Sources,
}

fn parse_strategy(s: &str) -> Result<ParsingStrategy, String> {
    s.parse::<ParsingStrategy>().map_err(|e| e.to_string())
}

/// Parse a `key=value` pair for `--sensor` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn parse_sensor(s: &str) -> Result<(String, f64), String> {
    let (name, value) = parse_key_val(s)?;
    if name.trim().is_empty() {
        return Err(format!("missing sensor name in '{}'", s));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid reading for '{}': '{}'", name, value))?;
    Ok((name.trim().to_string(), value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_or_default(&PathBuf::from(DEFAULT_CONFIG))?,
    };

    let ctx = AppContext::new(cfg);
    ctx.prepare_dirs()?;
    logging::init(&ctx)?;

    match command {
        Commands::Ingest { strategy, dry_run } => {
            ingest::run_ingest(&ctx, strategy, dry_run).await?;
        }
        Commands::Analyze {
            code,
            temp,
            pressure,
            question,
            sensors,
        } => {
            let mut snapshot = SensorSnapshot::new()
                .with("temperature", temp)
                .with("pressure", pressure);
            for (name, value) in sensors {
                snapshot.insert(name, value);
            }
            let query = AlarmQuery::new(code, snapshot).with_question(question);

            println!("Analyzing {} with data {}...", query.alarm_code, query.sensors);
            let analyst = RagAnalyst::from_context(&ctx)?;
            let result = analyst.analyze(&query).await;
            println!("\n=== Analysis Result ===\n");
            println!("{}", result);
        }
        Commands::Stats => {
            stats::run_stats(&ctx).await?;
        }
        Commands::Sources => {
            sources::list_sources(&ctx)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sensor() {
        assert_eq!(parse_sensor("rpm=720"), Ok(("rpm".to_string(), 720.0)));
        assert_eq!(parse_sensor(" vibration = 4.5"), Ok(("vibration".to_string(), 4.5)));
        assert!(parse_sensor("rpm").is_err());
        assert!(parse_sensor("rpm=fast").is_err());
        assert!(parse_sensor("=3").is_err());
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!(parse_strategy("layout"), Ok(ParsingStrategy::LayoutComplex));
        assert!(parse_strategy("ocr").unwrap_err().contains("unknown parsing strategy"));
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
