// presence-server/src/main.rs
use common::{setup_tracing, Config};
use std::net::TcpListener;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Tracing level comes from the configuration, so load it first
    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::from_plain_env(), Some(e)),
    };

    setup_tracing(&config.log_level);

    if let Some(e) = load_error {
        tracing::warn!("Failed to load configuration files: {}", e);
        tracing::info!("Falling back to environment variables only");
    }

    let listener = TcpListener::bind(&config.server_addr)?;
    tracing::info!("Starting presence server on {}", config.server_addr);
    tracing::info!(
        "Heartbeat every {}s, timeout after {}s",
        config.heartbeat.interval_secs,
        config.heartbeat.timeout_secs
    );

    presence_server::serve(config, listener)?.await
}
