use tracing::info;

use axum::Router;
use tokio::net::TcpListener;

use anyhow::anyhow;

use voxbridge::{ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    let address = config.address();

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; media streams will be refused");
    }
    if config.notify_url.is_none() {
        info!("NOTIFY_URL is not set; end-of-call reports will be dropped");
    }

    // Create application state
    let app_state = AppState::new(config);

    // Public health check route plus the media-stream WebSocket route
    let public_routes = Router::new().route(
        "/",
        axum::routing::get(voxbridge::handlers::health::health_check),
    );

    let app = public_routes
        .merge(routes::stream::create_stream_router())
        .with_state(app_state);

    info!("Starting server on {address}");

    let listener = TcpListener::bind(&address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
