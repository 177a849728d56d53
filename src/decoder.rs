use std::{sync::Arc, time::Instant};

use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{debug, info, warn};

use crate::{
    cancellation::CancellationToken,
    config::DecoderConfig,
    error::{GenerationError, ScorerError},
    model::{FinishReason, GenerationRequest, GenerationResult, Scorer, TokenId, Tokenizer},
    sampling::sample_token,
    stop::StopMatcher,
};

/// Autoregressive decoding loop over a shared tokenizer/scorer pair.
///
/// One `Decoder` is built per loaded model and lives for the whole process.
/// Its random source is seeded once at construction (from OS entropy unless
/// a seed is given) and shared by all requests, so rapid successive calls
/// never reuse a per-request seed. The context never grows past
/// `max_context_size`: the step budget is clamped instead of sliding a
/// window over older tokens.
pub struct Decoder {
    tokenizer: Arc<dyn Tokenizer>,
    scorer: Arc<dyn Scorer>,
    config: DecoderConfig,
    rng: Mutex<StdRng>,
}

impl Decoder {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        scorer: Arc<dyn Scorer>,
        config: DecoderConfig,
    ) -> Self {
        Self::with_rng(tokenizer, scorer, config, StdRng::from_entropy())
    }

    pub fn with_seed(
        tokenizer: Arc<dyn Tokenizer>,
        scorer: Arc<dyn Scorer>,
        config: DecoderConfig,
        seed: u64,
    ) -> Self {
        Self::with_rng(tokenizer, scorer, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        tokenizer: Arc<dyn Tokenizer>,
        scorer: Arc<dyn Scorer>,
        config: DecoderConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            tokenizer,
            scorer,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        self.generate_cancellable(request, &CancellationToken::never())
    }

    /// Runs one generation. Blocks the calling thread for every scorer call;
    /// cancellation is observed between calls, never during one.
    pub fn generate_cancellable(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let params = request.resolve(&self.config)?;

        let prompt_tokens = self
            .tokenizer
            .encode(&request.prompt)
            .map_err(GenerationError::Tokenizer)?;
        if prompt_tokens.is_empty() {
            return Err(GenerationError::InvalidArgument(
                "prompt encoded to zero tokens".into(),
            ));
        }
        let prompt_len = prompt_tokens.len();

        let budget = params
            .max_tokens
            .min(self.config.max_context_size.saturating_sub(prompt_len));
        if budget == 0 {
            debug!(prompt_len, "no room left in context window");
            return Ok(GenerationResult {
                text: String::new(),
                tokens_generated: 0,
                prompt_tokens: prompt_len,
                processing_time_ms: elapsed_ms(start),
                finish_reason: FinishReason::Length,
            });
        }

        let stops = StopMatcher::new(&request.stop_sequences);
        let eos = self.scorer.eos_token();

        let mut context: Vec<TokenId> = Vec::with_capacity(prompt_len + budget);
        context.extend_from_slice(&prompt_tokens);
        let mut finish_reason = FinishReason::Length;
        let mut decoded: Option<String> = None;

        for step in 0..budget {
            if cancel.is_cancelled() {
                warn!(step, "generation cancelled");
                return Err(GenerationError::Cancelled);
            }

            let logits = self.scorer.next_logits(&context)?;
            if logits.is_empty() {
                return Err(ScorerError::InvalidOutput("empty logit vector".into()).into());
            }

            let token = {
                let mut rng = self.rng.lock();
                sample_token(&logits, &params.sampling, &mut *rng)
            };
            context.push(token);

            if !stops.is_empty() {
                let text = self.decode(&context[prompt_len..])?;
                if let Some(stop) = stops.find_in(&text) {
                    debug!(step, stop, "stop sequence reached");
                    decoded = Some(text);
                    finish_reason = FinishReason::Stop;
                    break;
                }
            }

            if eos == Some(token) {
                debug!(step, token, "end of sequence");
                finish_reason = FinishReason::Eos;
                break;
            }
        }

        let generated = &context[prompt_len..];
        let text = match decoded {
            Some(text) => text,
            None => self.decode(generated)?,
        };
        let tokens_generated = generated.len();
        let processing_time_ms = elapsed_ms(start);

        info!(
            backend = self.scorer.backend_name(),
            prompt_len,
            tokens_generated,
            processing_time_ms,
            ?finish_reason,
            "generation finished"
        );

        Ok(GenerationResult {
            text,
            tokens_generated,
            prompt_tokens: prompt_len,
            processing_time_ms,
            finish_reason,
        })
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String, GenerationError> {
        self.tokenizer
            .decode(tokens)
            .map_err(GenerationError::Detokenize)
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
