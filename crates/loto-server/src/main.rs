use loto_server::{LotoServerBuilder, ServerConfig, ServerError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(bind = %config.bind_addr, channel = config.room_channel_size, "starting");

    let server = LotoServerBuilder::from_config(&config).build().await?;
    server.run().await
}
