use crate::{error::ScorerError, model::TokenId};

/// Next-token scoring backend.
///
/// `next_logits` returns one score per vocabulary entry for the token that
/// follows `context`. Implementations own their model state and decide how
/// many callers may score at once; the TorchScript backend admits a
/// single forward pass at a time.
pub trait Scorer: Send + Sync {
    fn next_logits(&self, context: &[TokenId]) -> Result<Vec<f32>, ScorerError>;

    /// Backend end-of-sequence token, if the model has one.
    fn eos_token(&self) -> Option<TokenId> {
        None
    }

    fn backend_name(&self) -> &str;
}
