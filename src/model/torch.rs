use std::{fs, path::Path};

use parking_lot::Mutex;
use tch::{CModule, Device, IValue, Kind, Tensor, no_grad};
use tracing::debug;

use crate::{
    error::{LoadError, ScorerError},
    model::{Scorer, TokenId},
};

/// TorchScript causal language model traced to take `[1, seq_len]` token ids
/// and return `[1, seq_len, vocab]` logits (optionally as the first element
/// of a tuple).
///
/// The module is held behind a mutex: concurrent decode streams are
/// serialized at the forward-pass boundary.
pub struct TorchScorer {
    module: Mutex<CModule>,
    device: Device,
    eos_token: Option<TokenId>,
    size_bytes: u64,
}

impl TorchScorer {
    pub fn load(module_path: &Path, eos_token: Option<TokenId>) -> Result<Self, LoadError> {
        if !module_path.exists() {
            return Err(LoadError::MissingArtifact(
                module_path.display().to_string(),
            ));
        }
        let size_bytes = fs::metadata(module_path)?.len();
        let device = Device::Cpu;
        let mut module = CModule::load_on_device(module_path, device)
            .map_err(|e| ScorerError::Backend(e.to_string()))?;
        module.set_eval();

        debug!(path = %module_path.display(), size_bytes, "torchscript module loaded");

        Ok(Self {
            module: Mutex::new(module),
            device,
            eos_token,
            size_bytes,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

impl Scorer for TorchScorer {
    fn next_logits(&self, context: &[TokenId]) -> Result<Vec<f32>, ScorerError> {
        if context.is_empty() {
            return Err(ScorerError::InvalidContext("context is empty".into()));
        }
        let input_ids: Vec<i64> = context.iter().map(|&id| i64::from(id)).collect();

        no_grad(|| {
            let module = self.module.lock();

            let input_tensor = Tensor::from_slice(&input_ids)
                .reshape([1, input_ids.len() as i64])
                .to(self.device);

            let output = module
                .forward_is(&[IValue::Tensor(input_tensor)])
                .map_err(|e| ScorerError::Backend(e.to_string()))?;

            let logits = match output {
                IValue::Tensor(t) => t,
                IValue::Tuple(ref tuple) if !tuple.is_empty() => match &tuple[0] {
                    IValue::Tensor(t) => t.shallow_clone(),
                    _ => {
                        return Err(ScorerError::InvalidOutput(
                            "expected tensor as first tuple element".into(),
                        ));
                    }
                },
                _ => {
                    return Err(ScorerError::InvalidOutput(
                        "unexpected model output format".into(),
                    ));
                }
            };

            // [1, seq_len, vocab] -> [vocab] for the final position
            let last = logits
                .select(1, -1)
                .squeeze()
                .to_kind(Kind::Float)
                .to_device(Device::Cpu);

            Vec::<f32>::try_from(&last).map_err(|e| ScorerError::InvalidOutput(e.to_string()))
        })
    }

    fn eos_token(&self) -> Option<TokenId> {
        self.eos_token
    }

    fn backend_name(&self) -> &str {
        "torchscript"
    }
}
