use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use media_worker::config::settings::AppConfig;
use media_worker::infrastructure::process::TokioProcessRunner;
use media_worker::infrastructure::queue::rabbitmq::RabbitMqService;
use media_worker::infrastructure::storage::s3::StorageService;
use media_worker::modules::media::service::MediaService;
use media_worker::state::AppState;
use media_worker::workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting media worker...");

    let config = AppConfig::new()?;
    info!("Staging jobs under {}", config.media.temp_root.display());

    let storage = StorageService::new(&config).await;
    let queue = RabbitMqService::new(&config.amqp_url).await?;
    let media = MediaService::new(
        Arc::new(storage),
        Arc::new(TokioProcessRunner),
        config.media.clone(),
    );

    let state = AppState::new(config, queue, media);
    workers::transcoder::start_transcoder_worker(state).await
}
