//! Serving entry points.
//!
//! Two transports are supported:
//!
//! * **Streamable HTTP** — the MCP endpoint is mounted at `/mcp` on an
//!   axum router with a permissive CORS layer and a `/health` route for
//!   load balancers.
//! * **stdio** — for clients that spawn the server as a child process.
//!   Logging goes to stderr; stdout carries the protocol.
//!
//! Both build the same [`DocsService`] from config: a Bedrock Knowledge
//! Base retriever and an S3 object store, injected as trait objects.

use anyhow::Result;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::ServiceExt;

use crate::config::Config;
use crate::mcp::McpBridge;
use crate::retrieval::BedrockRetriever;
use crate::store::S3Store;
use crate::tools::DocsService;

/// Construct the dispatch service with its production collaborators.
pub fn build_service(config: &Config) -> Arc<DocsService> {
    let retriever = Arc::new(BedrockRetriever::new(config.retrieval.clone()));
    let store = Arc::new(S3Store::new(config.storage.clone()));
    Arc::new(DocsService::new(
        retriever,
        store,
        config.storage.prefix.clone(),
    ))
}

/// Start the Streamable HTTP MCP server on `[server].bind`.
///
/// Runs until the process is terminated.
pub async fn run_http(config: &Config) -> Result<()> {
    let service = build_service(config);
    let bridge = McpBridge::new(service);

    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest_service("/mcp", mcp_service)
        .route("/health", get(handle_health))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("MCP server listening on http://{}/mcp", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Serve MCP over stdio. Blocks until the client closes the transport.
pub async fn run_stdio(config: &Config) -> Result<()> {
    let service = build_service(config);
    let bridge = McpBridge::new(service);

    info!("MCP server running on stdio");
    let running = bridge.serve(stdio()).await?;
    running.waiting().await?;
    Ok(())
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check used by load balancers and monitoring tools.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
