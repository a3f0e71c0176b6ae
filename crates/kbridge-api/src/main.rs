//! # kbridge-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to configurable port (default 8080).
//! `KBRIDGE_BACKEND=memory` runs against in-memory repositories.

use std::sync::Arc;

use kbridge_api::state::{AppConfig, AppState, RepositoryContext};
use kbridge_client::{
    ArchivalClient, ArchivalStore, ArchiveConfig, HttpKnowledgeBase, KbApiConfig, LoggingArchive,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let context = match std::env::var("KBRIDGE_BACKEND").as_deref() {
        Ok("memory") => {
            tracing::warn!("using in-memory repositories; nothing is persisted");
            RepositoryContext::in_memory()
        }
        Ok("http") | Err(_) => http_context().map_err(|e| {
            tracing::error!("Knowledge-base client initialization failed: {e}");
            e
        })?,
        Ok(other) => return Err(format!("unknown KBRIDGE_BACKEND {other:?}").into()),
    };
    tracing::info!(?config, backend = context.kb.backend_name(), "configuration loaded");

    let port = config.port;
    let app = kbridge_api::app(AppState::with_context(context, config));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("kbridge API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn http_context() -> Result<RepositoryContext, Box<dyn std::error::Error>> {
    let kb_config = KbApiConfig::from_env()?;
    tracing::info!(?kb_config, "knowledge-base clients configured");
    let kb = Arc::new(HttpKnowledgeBase::new(&kb_config)?);

    let archive: Arc<dyn ArchivalStore> = match ArchiveConfig::from_env() {
        Ok(archive_config) => Arc::new(ArchivalClient::new(&archive_config)?),
        Err(e) => {
            tracing::warn!("Archival client not configured: {e}. Identifiers will only be logged.");
            Arc::new(LoggingArchive)
        }
    };

    Ok(RepositoryContext::new(kb, archive))
}
