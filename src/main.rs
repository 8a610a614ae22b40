use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{self, EnvFilter};

use finboard_mcp::config::AppConfig;
use finboard_mcp::server::FinboardServer;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    let store = Arc::new(config.build_store());
    if store
        .ensure_initialized()
        .context("Failed to seed the dataset file")?
    {
        tracing::info!(path = %store.data_file().display(), "Seeded dataset from the bundled sample");
    }

    if let Some(port) = config.port {
        use rmcp::transport::streamable_http_server::{
            session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
        };

        let service = StreamableHttpService::new(
            move || Ok(FinboardServer::new(store.clone())),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig::default(),
        );

        let app = axum::Router::new()
            .nest_service("/mcp", service)
            .route("/health", axum::routing::get(|| async { "ok" }))
            .layer(CorsLayer::permissive());

        let addr = format!("0.0.0.0:{port}");
        tracing::info!("Starting finboard-mcp HTTP server on {addr}");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
    } else {
        tracing::info!("Starting finboard-mcp MCP server (stdio)");

        let server = FinboardServer::new(store);
        let service = server.serve(rmcp::transport::stdio()).await?;
        service.waiting().await?;
    }

    Ok(())
}
