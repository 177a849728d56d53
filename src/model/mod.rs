mod registry;
mod scorer;
mod tokenizer;
mod types;

#[cfg(feature = "tch-backend")]
mod loader;
#[cfg(feature = "tch-backend")]
mod torch;

#[cfg(feature = "tch-backend")]
pub use loader::ModelArtifacts;
pub use registry::ModelRegistry;
pub use scorer::Scorer;
pub use tokenizer::{HfTokenizer, Tokenizer};
#[cfg(feature = "tch-backend")]
pub use torch::TorchScorer;
pub use types::{
    FinishReason, GenerationParams, GenerationRequest, GenerationResult, HealthStatus,
    ModelMetadata, TokenId,
};
