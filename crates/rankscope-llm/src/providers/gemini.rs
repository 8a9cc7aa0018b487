//! Google Gemini `generateContent` backend.

use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::providers::common::{build_http_client, error_for_status};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const PROVIDER: &str = "gemini";

/// Gemini backend authenticated with an API key.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiProvider {
    /// Backend using the default flash model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    /// Backend using `model`.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(Some(DEFAULT_TIMEOUT_SECS))?,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Replace the client with one that gives up after `timeout_secs`.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self> {
        self.client = build_http_client(Some(timeout_secs))?;
        self.timeout_secs = timeout_secs;
        Ok(self)
    }

    /// Send requests to another API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Model requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn wire_request(request: &CompletionRequest) -> WireRequest {
        let text_part = |text: &str| WireContent {
            role: "user".to_string(),
            parts: vec![WirePart {
                text: text.to_string(),
            }],
        };

        WireRequest {
            contents: vec![text_part(&request.prompt)],
            system_instruction: request.system_instruction.as_deref().map(text_part),
            generation_config: WireGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: request.json_output.then_some("application/json"),
            },
        }
    }

    fn read_reply(&self, reply: WireResponse) -> Result<CompletionResponse> {
        let Some(candidate) = reply.candidates.into_iter().next() else {
            return Err(parse_error("reply has no candidates"));
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
            return Err(parse_error(format!(
                "candidate has no text (finish reason {reason})"
            )));
        }

        Ok(CompletionResponse {
            text,
            model: reply.model_version.unwrap_or_else(|| self.model.clone()),
            finish_reason: candidate.finish_reason,
        })
    }
}

fn parse_error(message: impl Into<String>) -> LlmError {
    LlmError::ParseError {
        provider: PROVIDER.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = Self::wire_request(&request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.timeout_secs,
                    }
                } else {
                    LlmError::Network(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(error_for_status(PROVIDER, response).await);
        }

        let reply: WireResponse = response
            .json()
            .await
            .map_err(|e| parse_error(format!("body is not a generateContent reply: {e}")))?;

        tracing::debug!(model = %self.model, "Gemini replied");
        self.read_reply(reply)
    }

    fn provider_id(&self) -> &str {
        PROVIDER
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WirePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}
