use a3zone::{TransportKind, ZoneConfig, ZoneServer};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = ZoneConfig::load_with_env(&path);
    config.validate()?;
    let kind = config.transport;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
        }
        let _ = shutdown_tx.send(true);
    });

    let builder = ZoneServer::builder().config(config);
    match kind {
        TransportKind::Tcp => builder.build_tcp().await?.run_until(shutdown_rx).await?,
        TransportKind::Websocket => builder.build_websocket().await?.run_until(shutdown_rx).await?,
    }
    Ok(())
}
