//! The provider seam and the single-turn request shape used for scoring.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A language-model backend able to answer one prompt.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send `request` and wait for the model's reply.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Short backend name used in logs and source ids (`"gemini"`).
    fn provider_id(&self) -> &str;
}

/// One prompt with its generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// User prompt
    pub prompt: String,

    /// Instruction sent ahead of the prompt
    pub system_instruction: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens
    pub max_output_tokens: Option<u32>,

    /// Ask for a JSON-only reply
    pub json_output: bool,
}

impl CompletionRequest {
    /// A request carrying only `prompt`.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: None,
            temperature: None,
            max_output_tokens: None,
            json_output: false,
        }
    }

    /// Set the system instruction.
    #[must_use]
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the reply length.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Request `application/json` output.
    #[must_use]
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// The model's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text, candidate parts joined by newlines
    pub text: String,

    /// Model version that answered
    pub model: String,

    /// Why generation stopped (`STOP`, `MAX_TOKENS`, ...)
    pub finish_reason: Option<String>,
}
