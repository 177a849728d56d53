use std::sync::Arc;

use tracing::info;

use crate::{
    config::{AppConfig, DecoderConfig},
    decoder::Decoder,
    error::LoadError,
    model::{HfTokenizer, ModelMetadata, Scorer, TorchScorer},
};

pub struct ModelArtifacts {
    pub tokenizer: Arc<HfTokenizer>,
    pub scorer: Arc<TorchScorer>,
}

impl ModelArtifacts {
    pub fn load(config: &AppConfig) -> Result<Self, LoadError> {
        if !config.tokenizer_path.exists() {
            return Err(LoadError::MissingArtifact(
                config.tokenizer_path.display().to_string(),
            ));
        }
        let tokenizer = Arc::new(
            HfTokenizer::from_file(&config.tokenizer_path)
                .map_err(|e| LoadError::Tokenizer(e.to_string()))?,
        );
        let scorer = Arc::new(TorchScorer::load(
            &config.model_path,
            config.eos_token_id,
        )?);

        info!(
            model = %config.model_id,
            vocab_size = tokenizer.vocab_size(),
            size_bytes = scorer.size_bytes(),
            "model artifacts loaded"
        );

        Ok(Self { tokenizer, scorer })
    }

    pub fn metadata(&self, config: &AppConfig) -> ModelMetadata {
        ModelMetadata {
            name: config.model_id.clone(),
            backend: self.scorer.backend_name().to_string(),
            size_bytes: self.scorer.size_bytes(),
            max_context_size: config.max_context_size,
            eos_token_id: self.scorer.eos_token(),
        }
    }

    pub fn into_decoder(self, config: &AppConfig) -> Decoder {
        let decoder_config = DecoderConfig::from(config);
        match config.sampling_seed {
            Some(seed) => Decoder::with_seed(self.tokenizer, self.scorer, decoder_config, seed),
            None => Decoder::new(self.tokenizer, self.scorer, decoder_config),
        }
    }
}
