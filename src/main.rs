use anyhow::Result;
use voxchat::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting voxchat voice conversation client");

    let config = Config::load()?;
    config.validate()?;

    // LocalSet for !Send futures (the recognizer holds cpal::Stream)
    let local = tokio::task::LocalSet::new();

    local
        .run_until(async move { App::new(config).run().await })
        .await
}
