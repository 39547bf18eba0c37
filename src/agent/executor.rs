//! Tool executor for the Canvas executor agent.
//!
//! Resolves a tool call against the catalogue, shapes its arguments and
//! dispatches it to a [`ToolBackend`]. Failures never escape: they become
//! `"Error executing <name>: ..."` result text that the model can read.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::message::RequestContext;
use super::tool::{ToolCall, ToolResult};
use crate::canvas::args::{format_with_link, parse_arguments, prepare};
use crate::canvas::catalog::{self, Backend, CanvasTool};
use crate::error::ToolError;
use crate::observability::ObservabilitySink;

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Remote tool transport.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Invokes a remote tool and returns its text output.
    async fn call(&self, tool: &str, arguments: Value) -> Result<String, ToolError>;
}

/// Executes catalogue tool calls for one request.
#[derive(Clone)]
pub struct ToolExecutor {
    backend: Arc<dyn ToolBackend>,
    sink: Arc<dyn ObservabilitySink>,
    ctx: RequestContext,
}

impl ToolExecutor {
    /// Creates an executor bound to a request context.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ToolBackend>,
        sink: Arc<dyn ObservabilitySink>,
        ctx: RequestContext,
    ) -> Self {
        Self { backend, sink, ctx }
    }

    /// Runs one tool call. Never fails; errors are reported in the result.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let outcome = self.dispatch(call).await;

        match outcome {
            Ok(content) => {
                if call.name.contains("create") {
                    let mut metadata = Map::new();
                    metadata.insert("arguments".to_string(), json!(call.arguments));
                    metadata.insert("success".to_string(), json!(true));
                    self.sink.log_event(
                        &self.ctx,
                        &format!("tool_execution_{}", call.name),
                        metadata,
                    );
                }
                ToolResult {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    content,
                    is_error: false,
                }
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                let mut metadata = Map::new();
                metadata.insert("error".to_string(), json!(e.to_string()));
                self.sink
                    .log_event(&self.ctx, &format!("tool_error_{}", call.name), metadata);
                ToolResult {
                    tool_call_id: call.id.clone(),
                    name: call.name.clone(),
                    content: format!("Error executing {}: {e}", call.name),
                    is_error: true,
                }
            }
        }
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<String, ToolError> {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return Err(ToolError::InvalidArguments {
                tool: call.name.clone(),
                reason: format!(
                    "arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
            });
        }

        let tool = catalog::find(&call.name).ok_or_else(|| ToolError::UnknownTool {
            name: call.name.clone(),
        })?;
        let args = parse_arguments(&call.arguments).map_err(|reason| {
            ToolError::InvalidArguments {
                tool: call.name.clone(),
                reason,
            }
        })?;

        match tool.backend {
            Backend::Remote(remote) => self.call_remote(tool, remote, &args).await,
            Backend::LocalFile => read_local_file(tool, &args).await,
            Backend::Unsupported => Err(ToolError::Unsupported {
                tool: call.name.clone(),
            }),
        }
    }

    async fn call_remote(
        &self,
        tool: &CanvasTool,
        remote: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        let prepared = prepare(tool, args);
        debug!(tool = tool.name, remote, "dispatching tool call");
        let response = self.backend.call(remote, Value::Object(prepared)).await?;

        Ok(match tool.success_message(args) {
            Some(message) => format_with_link(&response, &message),
            None => response,
        })
    }
}

async fn read_local_file(tool: &CanvasTool, args: &Map<String, Value>) -> Result<String, ToolError> {
    let path = args
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.name.to_string(),
            reason: "missing 'path'".to_string(),
        })?;
    Ok(tokio::fs::read_to_string(path).await?)
}
