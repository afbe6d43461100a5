//! Core data models used throughout the alarm analyst.
//!
//! These types represent the documents, chunks, sensor readings and
//! retrieval results that flow through the ingestion and query pipelines.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata attached to documents and chunks.
///
/// Keys are loader-assigned (`source`, `page`, `parser`, ...). Values are
/// JSON so page numbers stay numeric when persisted.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Metadata key naming the originating file of a document or chunk.
pub const SOURCE_KEY: &str = "source";

/// Question used when the caller does not ask anything specific.
pub const DEFAULT_QUESTION: &str = "원인과 해결 방법을 요약해줘.";

/// A unit of loaded content, usually one PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: Metadata,
}

impl Document {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// The `source` metadata value, if present and a string.
    pub fn source(&self) -> Option<&str> {
        source_of(&self.metadata)
    }
}

/// A bounded segment of a [`Document`]'s text. The unit stored in and
/// retrieved from the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: Metadata,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

impl Chunk {
    pub fn source(&self) -> Option<&str> {
        source_of(&self.metadata)
    }
}

/// A chunk returned from a similarity query, with its cosine score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
}

impl ScoredChunk {
    pub fn source(&self) -> &str {
        source_of(&self.metadata).unwrap_or("Unknown")
    }
}

fn source_of(metadata: &Metadata) -> Option<&str> {
    metadata
        .get(SOURCE_KEY)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

/// One named sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub name: String,
    pub value: f64,
}

/// Named readings supplied with one analysis request. Insertion order is
/// kept so the prompt lists readings the way the operator entered them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    readings: Vec<SensorReading>,
}

impl SensorSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. A reading with an existing name is replaced.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.readings.iter_mut().find(|r| r.name == name) {
            Some(existing) => existing.value = value,
            None => self.readings.push(SensorReading { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.readings
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value)
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl fmt::Display for SensorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, r) in self.readings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            // Debug keeps the decimal point on whole numbers (25.0, not 25).
            write!(f, "{}: {:?}", r.name, r.value)?;
        }
        f.write_str("}")
    }
}

/// One analysis request: alarm code, live readings and the operator's question.
#[derive(Debug, Clone)]
pub struct AlarmQuery {
    pub alarm_code: String,
    pub sensors: SensorSnapshot,
    pub question: String,
}

impl AlarmQuery {
    pub fn new(alarm_code: impl Into<String>, sensors: SensorSnapshot) -> Self {
        Self {
            alarm_code: alarm_code.into(),
            sensors,
            question: DEFAULT_QUESTION.to_string(),
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = question.into();
        self
    }

    /// The string embedded for retrieval.
    pub fn retrieval_query(&self) -> String {
        format!("Alarm {}: {}", self.alarm_code, self.question)
    }
}
