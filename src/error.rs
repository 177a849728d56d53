use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("failed to load tokenizer: {0}")]
    Load(String),
    #[error("failed to encode text: {0}")]
    Encode(String),
    #[error("failed to decode tokens: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("invalid context: {0}")]
    InvalidContext(String),
    #[error("backend failure: {0}")]
    Backend(String),
    #[error("invalid scorer output: {0}")]
    InvalidOutput(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(#[source] TokenizerError),
    #[error("detokenization failed: {0}")]
    Detokenize(#[source] TokenizerError),
    #[error("model execution failed: {0}")]
    Scorer(#[from] ScorerError),
    #[error("generation cancelled")]
    Cancelled,
    #[error("inference task failed: {0}")]
    Task(String),
}

impl GenerationError {
    /// Errors caused by the request itself. Callers report these as a
    /// client error and must not retry them unchanged.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GenerationError::InvalidArgument(_) | GenerationError::Tokenizer(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model artifact missing: {0}")]
    MissingArtifact(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("scorer error: {0}")]
    Scorer(#[from] ScorerError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
