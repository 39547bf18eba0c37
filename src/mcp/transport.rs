//! MCP transport layer for stdio and SSE.
//!
//! Provides functions to start the MCP server with different transports.

use rmcp::ServiceExt;
use rmcp::transport::io::stdio;

use super::server::CanvasAgentMcpServer;

/// Starts the MCP server with stdio transport.
///
/// The server reads JSON-RPC messages from stdin and writes responses to stdout.
/// Logs go to stderr so they never interleave with protocol messages.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a runtime error.
pub async fn serve_stdio(server: CanvasAgentMcpServer) -> anyhow::Result<()> {
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Starts the MCP server with streamable HTTP transport.
///
/// Listens on the given host and port for incoming MCP connections at `/mcp`.
/// Named `serve_sse` for CLI familiarity; the underlying transport is MCP's
/// streamable HTTP (the successor to the legacy SSE transport).
///
/// # Errors
///
/// Returns an error if the server fails to bind or encounters a runtime error.
pub async fn serve_sse(server: CanvasAgentMcpServer, host: &str, port: u16) -> anyhow::Result<()> {
    use rmcp::transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    };
    use std::sync::Arc;

    let ct = tokio_util::sync::CancellationToken::new();

    // Sessions share one orchestrator, so per-thread locking still applies.
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: ct.child_token(),
            ..Default::default()
        },
    );

    let router = axum::Router::new().nest_service("/mcp", service);
    let addr = format!("{host}:{port}");
    let tcp_listener = tokio::net::TcpListener::bind(&addr).await?;

    // stdout is reserved for command output
    #[allow(clippy::print_stderr)]
    {
        eprintln!("canvas-agent MCP server listening on http://{addr}/mcp");
    }

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            ct.cancel();
        })
        .await?;

    Ok(())
}
