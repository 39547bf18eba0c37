//! MCP server implementation for canvas-agent.
//!
//! Exposes the orchestrator as a `chat` tool and stored threads as
//! `canvas-agent://threads/{thread_id}` resources.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    AnnotateAble, CallToolResult, Content, Implementation, ListResourceTemplatesResult,
    ListResourcesResult, PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
    ReadResourceRequestParams, ReadResourceResult, ResourceContents, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler, tool, tool_handler, tool_router};
use serde_json::{Map, Value};

use crate::agent::orchestrator::{ChatOutcome, Orchestrator, RequestMetadata};

use super::params::ChatParams;

/// URI prefix for thread resources.
const THREAD_URI_PREFIX: &str = "canvas-agent://threads/";

/// Extracts the thread id from a `canvas-agent://threads/{id}` URI.
fn parse_thread_uri(uri: &str) -> Result<&str, McpError> {
    match uri.strip_prefix(THREAD_URI_PREFIX) {
        Some(id) if !id.is_empty() && !id.contains('/') => Ok(id),
        _ => Err(McpError::invalid_params(
            format!("Invalid URI: {uri}. Expected {THREAD_URI_PREFIX}{{thread_id}}"),
            None,
        )),
    }
}

/// canvas-agent MCP server.
///
/// Cloning is cheap: clones share the orchestrator, including its
/// per-thread run locks.
#[derive(Clone)]
pub struct CanvasAgentMcpServer {
    tool_router: ToolRouter<Self>,
    orchestrator: Arc<Orchestrator>,
}

#[tool_router]
impl CanvasAgentMcpServer {
    /// Runs one message through the supervisor/worker graph.
    #[tool(
        name = "chat",
        description = "Send a message to the Canvas LMS assistant. A supervisor routes it to a Canvas executor (courses, assignments, announcements, grading, modules, pages, files) or a content specialist (drafting, analysis). Messages on the same thread_id share history. Returns JSON {\"response\", \"status\"} or {\"error\"}."
    )]
    async fn chat(
        &self,
        Parameters(params): Parameters<ChatParams>,
    ) -> Result<CallToolResult, McpError> {
        let metadata: Map<String, Value> = params
            .metadata
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        let request = RequestMetadata {
            customer_id: params.customer_id,
            metadata,
        };

        let outcome = self
            .orchestrator
            .chat(&params.thread_id, &params.message, request)
            .await;

        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        Ok(match outcome {
            ChatOutcome::Success { .. } => CallToolResult::success(vec![Content::text(json)]),
            ChatOutcome::Failure { .. } => CallToolResult::error(vec![Content::text(json)]),
        })
    }
}

#[tool_handler]
impl ServerHandler for CanvasAgentMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "canvas-agent".to_string(),
                title: Some("Canvas Agent MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Canvas LMS assistant. Use the `chat` tool to ask for Canvas operations or \
                 drafted content; reuse a thread_id to continue a conversation. Browse stored \
                 conversations via canvas-agent://threads/{thread_id} resources."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let threads = self
            .orchestrator
            .checkpointer()
            .list_threads()
            .await
            .map_err(|e| McpError::internal_error(format!("Failed to list threads: {e}"), None))?;

        let resources = threads
            .into_iter()
            .map(|t| {
                let mut raw = RawResource::new(
                    format!("{THREAD_URI_PREFIX}{}", t.thread_id),
                    format!("Thread: {}", t.thread_id),
                );
                raw.description = Some(format!(
                    "{} turns, next: {}, updated {}",
                    t.turn_count,
                    t.next.map_or("-", |r| r.as_str()),
                    t.updated_at
                ));
                raw.mime_type = Some("application/json".to_string());
                raw.no_annotation()
            })
            .collect();

        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParams { uri, .. }: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let thread_id = parse_thread_uri(&uri)?;

        let state = self
            .orchestrator
            .checkpointer()
            .load(thread_id)
            .await
            .map_err(|e| McpError::internal_error(format!("Checkpoint error: {e}"), None))?
            .ok_or_else(|| {
                McpError::resource_not_found(format!("Thread not found: {thread_id}"), None)
            })?;

        let content = serde_json::to_string_pretty(&state)
            .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(content, uri.clone())],
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let thread_template = RawResourceTemplate {
            uri_template: format!("{THREAD_URI_PREFIX}{{thread_id}}"),
            name: "Conversation thread".to_string(),
            title: None,
            description: Some(
                "Returns the checkpointed conversation state (messages and next route) for a thread."
                    .to_string(),
            ),
            mime_type: Some("application/json".to_string()),
            icons: None,
        };

        Ok(ListResourceTemplatesResult {
            resource_templates: vec![thread_template.no_annotation()],
            next_cursor: None,
            meta: None,
        })
    }
}

impl CanvasAgentMcpServer {
    /// Creates a server around an orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            orchestrator,
        }
    }
}
