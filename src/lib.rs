pub mod cancellation;
pub mod config;
pub mod decoder;
pub mod error;
pub mod model;
pub mod sampling;
pub mod stop;

pub use cancellation::{CancellationHandle, CancellationToken};
pub use config::{AppConfig, DecoderConfig};
pub use decoder::Decoder;
pub use error::{GenerationError, LoadError, ScorerError, TokenizerError};
pub use model::{
    FinishReason, GenerationRequest, GenerationResult, ModelRegistry, Scorer, TokenId, Tokenizer,
};
