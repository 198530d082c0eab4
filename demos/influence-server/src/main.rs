use std::sync::Arc;

use influence::prelude::*;
use influence_store::RedisBackend;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = ServerSettings::from_env()?;
    tracing::info!(?settings, "starting");

    match settings.redis_url.as_deref() {
        Some(url) => {
            let backend = RedisBackend::connect(url).await?;
            tracing::info!("using redis backend");
            serve(&settings, Arc::new(backend)).await
        }
        None => {
            tracing::warn!("REDIS_URL not set, state lives in this process only");
            serve(&settings, Arc::new(MemoryBackend::new())).await
        }
    }
}

async fn serve<B: KeyValueBackend>(
    settings: &ServerSettings,
    backend: Arc<B>,
) -> Result<(), Box<dyn std::error::Error>> {
    let server = InfluenceServer::builder()
        .bind(&settings.bind_address)
        .session_config(settings.session.clone())
        .build(backend)
        .await?;
    server.run().await?;
    Ok(())
}
