//! Client for the locally hosted language model.
//!
//! [`LlmClient`] is the seam the analyst talks to; [`OllamaClient`] is the
//! production implementation, a non-streaming call to Ollama's
//! `POST /api/generate`.
//!
//! Failures are reported as [`GenerationError`] so the caller decides what
//! the user sees. The client itself never substitutes text for an error.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LlmConfig;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request never produced an HTTP response (refused, reset, timed out).
    #[error("LLM request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("LLM server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx response whose body is not a generation result.
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaClient {
    model: String,
    endpoint: String,
    temperature: f32,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, GenerationError> {
        let endpoint = format!("{}/api/generate", config.base_url.trim_end_matches('/'));
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|source| GenerationError::Transport {
            url: endpoint.clone(),
            source,
        })?;

        Ok(Self {
            model: config.model.clone(),
            endpoint,
            temperature: config.temperature,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        let transport = |source| GenerationError::Transport {
            url: self.endpoint.clone(),
            source,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_generate_response(&body)
    }
}

fn parse_generate_response(body: &str) -> Result<String, GenerationError> {
    serde_json::from_str::<GenerateResponse>(body)
        .map(|r| r.response)
        .map_err(|e| GenerationError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            model: "qwen3:14b",
            prompt: "hello",
            stream: false,
            options: GenerateOptions { temperature: 0.1 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen3:14b");
        assert_eq!(json["stream"], false);
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_parse_response_field() {
        let body = r#"{"model":"qwen3:14b","response":"냉각수 펌프를 점검하세요.","done":true}"#;
        assert_eq!(parse_generate_response(body).unwrap(), "냉각수 펌프를 점검하세요.");
    }

    #[test]
    fn test_parse_rejects_missing_response() {
        let err = parse_generate_response(r#"{"error":"model not found"}"#).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
        assert!(parse_generate_response("not json").is_err());
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let config = LlmConfig {
            base_url: "http://ship-llm:11434/".into(),
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.endpoint(), "http://ship-llm:11434/api/generate");
        assert_eq!(client.model(), "qwen3:14b");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".into(),
            timeout_secs: Some(2),
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(matches!(err, GenerationError::Transport { .. }), "got {:?}", err);
    }
}
