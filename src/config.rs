use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::bail;

use crate::model::TokenId;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model_id: String,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub max_context_size: usize,
    pub eos_token_id: Option<TokenId>,
    pub max_concurrent_generations: usize,
    pub generation_timeout: Option<Duration>,
    pub sampling_seed: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Malformed
    /// numeric values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_id = lookup("MODEL_ID").unwrap_or_else(|| "distilgpt2".to_string());
        let model_path = PathBuf::from(
            lookup("MODEL_PATH").unwrap_or_else(|| "models/distilgpt2.ts".to_string()),
        );
        let tokenizer_path = PathBuf::from(
            lookup("TOKENIZER_PATH").unwrap_or_else(|| "models/tokenizer.json".to_string()),
        );

        let max_tokens = parse_var(&lookup, "MAX_TOKENS").unwrap_or(100);
        let temperature = parse_var(&lookup, "TEMPERATURE").unwrap_or(0.7);
        let top_p = parse_var(&lookup, "TOP_P").unwrap_or(0.9);
        let max_context_size = parse_var(&lookup, "MAX_CONTEXT_SIZE").unwrap_or(1024);

        // GPT-2 family end-of-text id; "none" disables EOS stopping.
        let eos_token_id = match lookup("EOS_TOKEN_ID") {
            Some(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            Some(raw) => Some(raw.trim().parse().unwrap_or(50256)),
            None => Some(50256),
        };

        let max_concurrent_generations =
            parse_var(&lookup, "MAX_CONCURRENT_GENERATIONS").unwrap_or(1);
        let generation_timeout =
            parse_var(&lookup, "GENERATION_TIMEOUT_SECS").map(Duration::from_secs);
        let sampling_seed = parse_var(&lookup, "SAMPLING_SEED");

        let config = Self {
            model_id,
            model_path,
            tokenizer_path,
            max_tokens,
            temperature,
            top_p,
            max_context_size,
            eos_token_id,
            max_concurrent_generations,
            generation_timeout,
            sampling_seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_tokens == 0 {
            bail!("MAX_TOKENS must be greater than zero");
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            bail!("TEMPERATURE must be a finite value >= 0, got {}", self.temperature);
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            bail!("TOP_P must be in (0, 1], got {}", self.top_p);
        }
        if self.max_context_size == 0 {
            bail!("MAX_CONTEXT_SIZE must be greater than zero");
        }
        if self.max_concurrent_generations == 0 {
            bail!("MAX_CONCURRENT_GENERATIONS must be greater than zero");
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Immutable settings handed to a [`crate::Decoder`]: request defaults plus
/// the backend context ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub max_context_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_tokens: 100,
            temperature: 0.7,
            top_p: 0.9,
            max_context_size: 1024,
        }
    }
}

impl From<&AppConfig> for DecoderConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            max_context_size: config.max_context_size,
        }
    }
}
