//! Language-model backends.
//!
//! [`LanguageModel`] is the narrow seam the structurer depends on: one prompt
//! in, the model's raw reply text out. [`ChatCompletionsClient`] speaks the
//! OpenAI-compatible `/chat/completions` protocol (Groq, OpenAI, vLLM,
//! Ollama, ...).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LlmConfig;
use crate::error::LlmError;

/// One extraction request.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub user: String,
    /// Sampling temperature; near zero for deterministic extraction.
    pub temperature: f32,
}

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier for logs.
    fn name(&self) -> &str;

    /// Send one request and return the reply text.
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ChatCompletionsClient {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.into(),
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    /// Build a client from config, reading the key from `config.api_key_env`.
    pub fn from_config(config: &LlmConfig, timeout: Duration) -> Result<Self, LlmError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key, timeout)
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout)
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(LlmError::Auth),
            StatusCode::TOO_MANY_REQUESTS => return Err(LlmError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Status {
                    status: status.as_u16(),
                    body: body.chars().take(500).collect(),
                });
            }
            _ => {}
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))?;

        debug!("Model replied with {} bytes", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_determinism_and_json_mode() {
        let body = ChatRequest {
            model: "m",
            temperature: 0.0,
            max_tokens: None,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["response_format"]["type"], "json_object");
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn response_content_is_extracted() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"{\"fields\":[]}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some(r#"{"fields":[]}"#)
        );
    }

    #[test]
    fn missing_api_key_is_reported() {
        let config = LlmConfig {
            api_key_env: "FIELDLENS_TEST_UNSET_KEY_VAR".into(),
            ..LlmConfig::default()
        };
        let err = ChatCompletionsClient::from_config(&config, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::MissingApiKey(ref var) if var == "FIELDLENS_TEST_UNSET_KEY_VAR"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9/v1/chat/completions".into(),
            ..LlmConfig::default()
        };
        let client = ChatCompletionsClient::new(&config, "key", Duration::from_secs(2)).unwrap();
        let request = LlmRequest {
            system: "s".into(),
            user: "u".into(),
            temperature: 0.0,
        };
        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport(_) | LlmError::Timeout(_)));
    }
}
