//! Embeddings over an OpenAI-compatible `/embeddings` endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use turf_advisor_config::EmbeddingConfig;
use turf_advisor_core::{DegradeKind, Degraded, Embedder};

use crate::RagError;

const STAGE: &str = "embedding";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

pub struct HttpEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn embed_raw(&self, text: &str) -> Result<Vec<f32>, Degraded> {
        let url = format!("{}/embeddings", self.config.endpoint.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&EmbedRequest {
            model: &self.config.model,
            input: text,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Degraded::timeout(STAGE, e.to_string())
            } else {
                Degraded::unavailable(STAGE, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let kind = if status == StatusCode::TOO_MANY_REQUESTS {
                DegradeKind::RateLimited
            } else {
                DegradeKind::Unavailable
            };
            return Err(Degraded::new(
                STAGE,
                kind,
                format!("embedding request failed: {} - {}", status, body),
            ));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Degraded::malformed(STAGE, e.to_string()))?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Degraded::malformed(STAGE, "no embedding returned"))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Degraded> {
        self.embed_raw(text).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let raw = r#"{"data":[{"embedding":[0.1,0.2,0.3],"index":0}],"model":"m"}"#;
        let parsed: EmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades() {
        let embedder = HttpEmbedder::new(EmbeddingConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            api_key: None,
            model: "test".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        let err = embedder.embed("dollar spot").await.unwrap_err();
        assert_eq!(err.stage, "embedding");
        assert_eq!(embedder.model_name(), "test");
    }
}
