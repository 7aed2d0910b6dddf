//! OpenAI-compatible chat-completion backend
//!
//! Works with OpenAI, Azure-style gateways that expose `/chat/completions`,
//! vLLM and other local servers speaking the same protocol.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header::HeaderValue, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use turf_advisor_config::LlmSettings;
use turf_advisor_core::{ChatCompletion, ChatMessage, Completion, CompletionRequest, Degraded};

use crate::prompt::estimate_tokens;
use crate::LlmError;

#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Transport retries inside one call
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for OpenAiChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            max_retries: 1,
            initial_backoff: Duration::from_millis(250),
        }
    }
}

impl From<&LlmSettings> for OpenAiChatConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            max_retries: settings.max_retries,
            ..Default::default()
        }
    }
}

pub struct OpenAiChat {
    config: OpenAiChatConfig,
    client: Client,
}

impl OpenAiChat {
    pub fn new(config: OpenAiChatConfig) -> Result<Self, LlmError> {
        let remote = !(config.endpoint.starts_with("http://localhost")
            || config.endpoint.starts_with("http://127.0.0.1"));
        if remote && config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }

        // Per-request deadlines come from CompletionRequest
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            if let Ok(val) = HeaderValue::from_str(&format!("Bearer {}", key)) {
                headers.insert(reqwest::header::AUTHORIZATION, val);
            }
        }
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers
    }

    async fn execute_request(
        &self,
        body: &ChatRequest<'_>,
        timeout: Duration,
    ) -> Result<ChatResponse, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    /// Non-streaming completion with exponential backoff on transport errors
    pub async fn generate(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let start = Instant::now();
        let body = ChatRequest::from_completion(request, false);

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            let remaining = request.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                last_error = Some(LlmError::Timeout);
                break;
            }
            if attempt > 0 {
                tracing::warn!(
                    model = %request.model,
                    "LLM request failed, retrying in {:?} (attempt {}/{})",
                    backoff,
                    attempt,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff.min(remaining)).await;
                backoff *= 2;
            }

            let remaining = request.timeout.saturating_sub(start.elapsed());
            match self.execute_request(&body, remaining.max(Duration::from_millis(1))).await {
                Ok(response) => {
                    let completion = response.into_completion(&request.model)?;
                    tracing::debug!(
                        model = %completion.model,
                        prompt_tokens = completion.prompt_tokens,
                        completion_tokens = completion.completion_tokens,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Chat completion finished"
                    );
                    return Ok(completion);
                }
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    /// Stream content deltas into `tx` as they arrive.
    ///
    /// Returns the full text once the server sends `[DONE]` or closes the
    /// stream. Token counts are estimated since streamed responses carry no
    /// usage block. A dropped receiver ends the stream early.
    pub async fn generate_stream(
        &self,
        request: &CompletionRequest,
        tx: mpsc::Sender<String>,
    ) -> Result<Completion, LlmError> {
        let body = ChatRequest::from_completion(request, true);
        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut text = String::new();
        let mut deltas = 0u32;

        'outer: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=pos).collect();
                match parse_sse_line(line.trim())? {
                    Some(SseEvent::Delta(delta)) => {
                        text.push_str(&delta);
                        deltas += 1;
                        if tx.send(delta).await.is_err() {
                            tracing::debug!("Stream receiver dropped");
                            break 'outer;
                        }
                    }
                    Some(SseEvent::Done) => break 'outer,
                    None => {}
                }
            }
        }

        Ok(Completion {
            prompt_tokens: request
                .messages
                .iter()
                .map(|m| estimate_tokens(&m.content))
                .sum::<usize>() as u32,
            completion_tokens: deltas,
            text,
            model: request.model.clone(),
        })
    }

    /// Whether the endpoint answers `/models`
    pub async fn ping(&self) -> bool {
        let url = format!("{}/models", self.config.endpoint.trim_end_matches('/'));
        match self
            .client
            .get(&url)
            .headers(self.build_headers())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(r) => r.status().is_success(),
            Err(_) => false,
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error = response.text().await.unwrap_or_default();
    // 5xx and 429 are retryable, other 4xx are not
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(LlmError::RateLimited(error));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(LlmError::ModelNotFound(error));
    }
    if status.is_server_error() {
        return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
    }
    Err(LlmError::Api(format!("{}: {}", status, error)))
}

#[async_trait]
impl ChatCompletion for OpenAiChat {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, Degraded> {
        self.generate(&request).await.map_err(Degraded::from)
    }

    async fn is_available(&self) -> bool {
        self.ping().await
    }
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Done,
}

/// Parse one server-sent-events line of a streamed chat completion
fn parse_sse_line(line: &str) -> Result<Option<SseEvent>, LlmError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    if data == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|s| !s.is_empty())
        .map(SseEvent::Delta))
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

impl<'a> ChatRequest<'a> {
    fn from_completion(request: &'a CompletionRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
            response_format: request.json_mode.then(|| ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl ChatResponse {
    fn into_completion(self, requested_model: &str) -> Result<Completion, LlmError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;
        let usage = self.usage.unwrap_or_default();
        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            model: self.model.unwrap_or_else(|| requested_model.to_string()),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local() -> OpenAiChat {
        OpenAiChat::new(OpenAiChatConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            max_retries: 1,
            initial_backoff: Duration::from_millis(1),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_remote_endpoint_requires_key() {
        let result = OpenAiChat::new(OpenAiChatConfig::default());
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_request_serialization() {
        let request = CompletionRequest::new("gpt-4o-mini", vec![ChatMessage::user("hi")]).json();
        let body = serde_json::to_value(ChatRequest::from_completion(&request, false)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");

        let plain = CompletionRequest::new("gpt-4o", vec![]);
        let body = serde_json::to_value(ChatRequest::from_completion(&plain, true)).unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "model": "gpt-4o-2024-08-06",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Use 0.2 oz."}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 6, "total_tokens": 126}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let completion = parsed.into_completion("gpt-4o").unwrap();
        assert_eq!(completion.text, "Use 0.2 oz.");
        assert_eq!(completion.prompt_tokens, 120);
        assert_eq!(completion.model, "gpt-4o-2024-08-06");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            empty.into_completion("gpt-4o"),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_sse_lines() {
        let delta = r#"data: {"choices":[{"delta":{"content":"Heri"}}]}"#;
        assert_eq!(
            parse_sse_line(delta).unwrap(),
            Some(SseEvent::Delta("Heri".to_string()))
        );
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), Some(SseEvent::Done));
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), None);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            None
        );
        assert!(parse_sse_line("data: {broken").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades() {
        let chat = local();
        let request = CompletionRequest::new("m", vec![ChatMessage::user("hi")])
            .with_timeout(Duration::from_secs(2));
        let err = chat.complete(request).await.unwrap_err();
        assert_eq!(err.stage, "llm");
        assert!(!chat.is_available().await);
    }
}
