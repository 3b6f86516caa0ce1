use std::net::SocketAddr;

use docgraph_server::{create_router, Config};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docgraph_server=debug,docgraph_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.api_token.is_none() {
        tracing::warn!("DOCGRAPH_API_TOKEN not set, API is unauthenticated");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = create_router(config);
    tracing::info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
