#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use llm_decode_service::{
    Decoder, DecoderConfig, Scorer, ScorerError, TokenId, Tokenizer, TokenizerError,
};

/// Longest-match tokenizer over a fixed list of pieces; id == index.
pub struct TableTokenizer {
    vocab: Vec<&'static str>,
}

impl TableTokenizer {
    pub fn new(vocab: &[&'static str]) -> Self {
        Self {
            vocab: vocab.to_vec(),
        }
    }
}

impl Tokenizer for TableTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, TokenizerError> {
        let mut ids = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            let (id, piece) = self
                .vocab
                .iter()
                .enumerate()
                .filter(|(_, piece)| !piece.is_empty() && rest.starts_with(**piece))
                .max_by_key(|(_, piece)| piece.len())
                .ok_or_else(|| TokenizerError::Encode(format!("no token for {rest:?}")))?;
            ids.push(id as TokenId);
            rest = &rest[piece.len()..];
        }
        Ok(ids)
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String, TokenizerError> {
        tokens
            .iter()
            .map(|&id| {
                self.vocab
                    .get(id as usize)
                    .copied()
                    .ok_or_else(|| TokenizerError::Decode(format!("unknown token id {id}")))
            })
            .collect()
    }
}

type LogitsFn = dyn Fn(&[TokenId]) -> Result<Vec<f32>, ScorerError> + Send + Sync;

/// Scorer driven by a closure over the current context; counts calls.
pub struct FnScorer {
    logits: Box<LogitsFn>,
    eos: Option<TokenId>,
    calls: AtomicUsize,
}

impl FnScorer {
    pub fn new<F>(logits: F) -> Self
    where
        F: Fn(&[TokenId]) -> Result<Vec<f32>, ScorerError> + Send + Sync + 'static,
    {
        Self {
            logits: Box::new(logits),
            eos: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_eos(mut self, eos: TokenId) -> Self {
        self.eos = Some(eos);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Scorer for FnScorer {
    fn next_logits(&self, context: &[TokenId]) -> Result<Vec<f32>, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.logits)(context)
    }

    fn eos_token(&self) -> Option<TokenId> {
        self.eos
    }

    fn backend_name(&self) -> &str {
        "scripted"
    }
}

/// Latch that holds blocked scorer calls until opened.
#[derive(Clone, Default)]
pub struct Gate {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn wait(&self) {
        let (open, cvar) = &*self.state;
        let mut open = open.lock();
        while !*open {
            cvar.wait(&mut open);
        }
    }

    pub fn open(&self) {
        let (open, cvar) = &*self.state;
        *open.lock() = true;
        cvar.notify_all();
    }
}

pub fn one_hot(vocab: usize, hot: usize) -> Vec<f32> {
    (0..vocab).map(|i| if i == hot { 10.0 } else { 0.0 }).collect()
}

pub fn decoder_with(
    vocab: &[&'static str],
    scorer: &Arc<FnScorer>,
    max_context_size: usize,
    seed: u64,
) -> Decoder {
    let config = DecoderConfig {
        max_context_size,
        ..DecoderConfig::default()
    };
    Decoder::with_seed(
        Arc::new(TableTokenizer::new(vocab)),
        scorer.clone(),
        config,
        seed,
    )
}
