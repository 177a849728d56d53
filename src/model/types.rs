use serde::{Deserialize, Serialize};

use crate::{config::DecoderConfig, error::GenerationError, sampling::SamplingParams};

/// Index into the vocabulary shared by a tokenizer/scorer pair.
pub type TokenId = u32;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop_sequences: Vec::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stop_sequences<I, S>(mut self, stops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_sequences = stops.into_iter().map(Into::into).collect();
        self
    }

    /// Fills unset fields from `defaults` and checks every parameter range.
    /// Whitespace-only prompts are accepted; whether they yield tokens is up
    /// to the tokenizer.
    pub fn resolve(&self, defaults: &DecoderConfig) -> Result<GenerationParams, GenerationError> {
        if self.prompt.is_empty() {
            return Err(GenerationError::InvalidArgument(
                "prompt must not be empty".into(),
            ));
        }

        let max_tokens = self.max_tokens.unwrap_or(defaults.max_tokens);
        if max_tokens == 0 {
            return Err(GenerationError::InvalidArgument(
                "maxTokens must be greater than zero".into(),
            ));
        }

        let temperature = self.temperature.unwrap_or(defaults.temperature);
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(GenerationError::InvalidArgument(format!(
                "temperature must be a finite value >= 0, got {temperature}"
            )));
        }

        let top_p = self.top_p.unwrap_or(defaults.top_p);
        if !(top_p > 0.0 && top_p <= 1.0) {
            return Err(GenerationError::InvalidArgument(format!(
                "topP must be in (0, 1], got {top_p}"
            )));
        }

        Ok(GenerationParams {
            max_tokens,
            sampling: SamplingParams { temperature, top_p },
        })
    }
}

/// Request parameters after defaults have been applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: usize,
    pub sampling: SamplingParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Token budget exhausted.
    Length,
    /// A stop sequence appeared in the generated text.
    Stop,
    /// The backend end-of-sequence token was sampled.
    Eos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub text: String,
    pub tokens_generated: usize,
    pub prompt_tokens: usize,
    pub processing_time_ms: f64,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub name: String,
    pub backend: String,
    pub size_bytes: u64,
    pub max_context_size: usize,
    pub eos_token_id: Option<TokenId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub model: String,
    pub available_slots: usize,
    pub capacity: usize,
}
