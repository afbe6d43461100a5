//! # Ship RAG
//!
//! Offline retrieval-augmented alarm analysis for ship engine rooms.
//!
//! Technical manuals and alarm documentation (PDF) are parsed, split into
//! overlapping chunks, embedded and stored in a local vector index. When an
//! alarm fires, the passages most relevant to the alarm code and question
//! are retrieved and handed, together with the live sensor readings, to a
//! locally hosted language model (Ollama) which writes the diagnosis.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ PDF loader  │──▶│ Chunk+Embed  │──▶│ Vector index │
//! │ 3 strategies│   │              │   │   (SQLite)   │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │ top-K
//!                   ┌──────────────┐   ┌──────▼───────┐
//!  alarm + sensors─▶│  RagAnalyst  │──▶│ Ollama LLM   │
//!                   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! shiprag ingest --strategy table_heavy
//! shiprag analyze --code E-101 --temp 90 --pressure 120
//! shiprag stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`context`] | Process-wide application context |
//! | [`logging`] | Tracing subscriber setup |
//! | [`models`] | Core data types |
//! | [`error`] | Typed errors at component seams |
//! | [`extract`] | PDF parsing backends |
//! | [`loader`] | Strategy-driven document loading |
//! | [`chunk`] | Recursive character text splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index abstraction and stores |
//! | [`ingest`] | Ingestion pipeline |
//! | [`llm`] | Language model client |
//! | [`prompt`] | Analysis prompt template |
//! | [`analyst`] | Retrieval-augmented alarm analysis |
//! | [`stats`] | Index statistics |
//! | [`sources`] | Input and backend health |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod analyst;
pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod sources;
pub mod stats;
