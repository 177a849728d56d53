use std::{sync::Arc, time::Duration};

use tokio::{sync::Semaphore, task, time};
use tracing::{debug, warn};

use crate::{
    cancellation::CancellationToken,
    decoder::Decoder,
    error::GenerationError,
    model::{GenerationRequest, GenerationResult, HealthStatus, ModelMetadata},
};

/// Owns the process-wide decoder for one loaded model and bounds how many
/// generations run against it at once. Requests beyond the bound wait for a
/// permit in arrival order.
pub struct ModelRegistry {
    decoder: Arc<Decoder>,
    metadata: ModelMetadata,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    timeout: Option<Duration>,
}

impl ModelRegistry {
    #[cfg(feature = "tch-backend")]
    pub fn initialize(
        config: &crate::config::AppConfig,
    ) -> Result<Self, crate::error::LoadError> {
        let artifacts = crate::model::ModelArtifacts::load(config)?;
        let metadata = artifacts.metadata(config);
        let decoder = artifacts.into_decoder(config);
        Ok(Self::new(
            decoder,
            metadata,
            config.max_concurrent_generations,
            config.generation_timeout,
        ))
    }

    pub fn new(
        decoder: Decoder,
        metadata: ModelMetadata,
        max_concurrent: usize,
        timeout: Option<Duration>,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            decoder: Arc::new(decoder),
            metadata,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            timeout,
        }
    }

    pub fn metadata(&self) -> ModelMetadata {
        self.metadata.clone()
    }

    pub fn health(&self) -> HealthStatus {
        let available_slots = self.permits.available_permits();
        HealthStatus {
            status: if available_slots > 0 { "ok" } else { "busy" },
            model: self.metadata.name.clone(),
            available_slots,
            capacity: self.max_concurrent,
        }
    }

    /// Generates with the configured timeout, which covers the wait for a
    /// slot as well as decoding. Timing out or dropping the returned future
    /// cancels the generation after its current scorer call.
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let (token, handle) = CancellationToken::new();
        let guard = handle.drop_guard();
        let generation = self.generate_cancellable(request, token);

        let result = match self.timeout {
            Some(limit) => match time::timeout(limit, generation).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "generation timed out");
                    drop(guard);
                    return Err(GenerationError::Cancelled);
                }
            },
            None => generation.await,
        };
        guard.disarm();
        result
    }

    pub async fn generate_cancellable(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<GenerationResult, GenerationError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| GenerationError::Task(format!("generation slots closed: {err}")))?;
        debug!(
            available = self.permits.available_permits(),
            "generation slot acquired"
        );

        let decoder = self.decoder.clone();
        task::spawn_blocking(move || {
            let _permit = permit;
            decoder.generate_cancellable(&request, &cancel)
        })
        .await
        .map_err(|err| GenerationError::Task(format!("inference task failed: {err}")))?
    }
}
