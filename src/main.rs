use std::env;

use anyhow::bail;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_decode_service::{AppConfig, GenerationRequest, ModelRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let prompt = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        bail!("usage: llm_decode_service <prompt>");
    }

    let config = AppConfig::from_env()?;
    tracing::info!(
        model = %config.model_id,
        path = %config.model_path.display(),
        "loading model artifacts"
    );

    let registry = ModelRegistry::initialize(&config)?;
    tracing::info!(metadata = ?registry.metadata(), "model ready");

    let request = GenerationRequest::new(prompt);
    let result = registry.generate(request).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
