//! Canvas MCP tool server client.
//!
//! Speaks line-delimited JSON-RPC 2.0 over the stdio of a child process
//! (by default the `canvas-lms` MCP server in Docker). The process is
//! started on first use, kept for later calls, and discarded after any
//! transport failure so the next call starts a fresh one.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::agent::executor::ToolBackend;
use crate::error::ToolError;

/// MCP protocol revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Timeout for the `initialize` handshake.
const INIT_TIMEOUT: Duration = Duration::from_secs(30);

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Line-delimited JSON-RPC over a child's stdin/stdout.
struct StdioTransport {
    writer: ChildStdin,
    reader: BufReader<ChildStdout>,
}

impl StdioTransport {
    async fn write_line(&mut self, message: &Value) -> Result<(), ToolError> {
        let mut line = serde_json::to_string(message).map_err(|e| ToolError::Transport {
            reason: format!("failed to serialize message: {e}"),
        })?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ToolError::Transport {
                reason: format!("failed to write to stdin: {e}"),
            })?;
        self.writer.flush().await.map_err(|e| ToolError::Transport {
            reason: format!("failed to flush stdin: {e}"),
        })
    }

    /// Sends a request and reads lines until the response with the same id.
    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value, ToolError> {
        let id = next_request_id();
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let message = serde_json::to_value(&request).map_err(|e| ToolError::Transport {
            reason: format!("failed to serialize request: {e}"),
        })?;
        self.write_line(&message).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| ToolError::Transport {
                    reason: format!("failed to read from stdout: {e}"),
                })?;
            if read == 0 {
                return Err(ToolError::Transport {
                    reason: "server stdout closed (process may have exited)".to_string(),
                });
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            // Server log lines and notifications are skipped.
            let Ok(response) = serde_json::from_str::<JsonRpcResponse>(trimmed) else {
                continue;
            };
            if response.id != Some(id) {
                continue;
            }
            return extract_result(response);
        }
    }

    async fn notify(&mut self, method: &str) -> Result<(), ToolError> {
        self.write_line(&json!({ "jsonrpc": "2.0", "method": method }))
            .await
    }
}

fn extract_result(response: JsonRpcResponse) -> Result<Value, ToolError> {
    if let Some(err) = response.error {
        return Err(ToolError::Server {
            code: err.code,
            message: err.message,
        });
    }
    response.result.ok_or(ToolError::Server {
        code: -32603,
        message: "response missing both result and error".to_string(),
    })
}

/// Concatenates the text items of a `tools/call` result.
///
/// A result flagged `isError` becomes [`ToolError::Remote`].
fn call_result_text(result: &Value) -> Result<String, ToolError> {
    let text = match result.get("content").and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<String>(),
        None => result.to_string(),
    };

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return Err(ToolError::Remote { message: text });
    }
    Ok(text)
}

struct McpSession {
    transport: StdioTransport,
    _child: Child,
}

/// [`ToolBackend`] backed by a Canvas MCP server process.
pub struct McpToolBackend {
    command: Vec<String>,
    call_timeout: Duration,
    session: Mutex<Option<McpSession>>,
}

impl McpToolBackend {
    /// Creates a backend that starts `command` (program then arguments) on first use.
    #[must_use]
    pub fn new(command: Vec<String>, call_timeout: Duration) -> Self {
        Self {
            command,
            call_timeout,
            session: Mutex::new(None),
        }
    }

    async fn spawn(&self) -> Result<McpSession, ToolError> {
        let command_line = self.command.join(" ");
        let Some((program, args)) = self.command.split_first() else {
            return Err(ToolError::Spawn {
                command: command_line,
                reason: "empty command".to_string(),
            });
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Spawn {
                command: command_line.clone(),
                reason: e.to_string(),
            })?;

        let writer = child.stdin.take().ok_or_else(|| ToolError::Spawn {
            command: command_line.clone(),
            reason: "failed to capture stdin".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ToolError::Spawn {
            command: command_line.clone(),
            reason: "failed to capture stdout".to_string(),
        })?;

        let mut transport = StdioTransport {
            writer,
            reader: BufReader::new(stdout),
        };

        match tokio::time::timeout(INIT_TIMEOUT, initialize(&mut transport)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(ToolError::Initialize {
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(ToolError::Initialize {
                    reason: format!("timed out after {}s", INIT_TIMEOUT.as_secs()),
                });
            }
        }

        info!(command = %command_line, "canvas MCP server started");
        Ok(McpSession {
            transport,
            _child: child,
        })
    }
}

async fn initialize(transport: &mut StdioTransport) -> Result<(), ToolError> {
    let params = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    });
    transport.request("initialize", Some(params)).await?;
    transport.notify("notifications/initialized").await
}

#[async_trait]
impl ToolBackend for McpToolBackend {
    async fn call(&self, tool: &str, arguments: Value) -> Result<String, ToolError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.spawn().await?);
        }
        let Some(session) = guard.as_mut() else {
            return Err(ToolError::Transport {
                reason: "no active session".to_string(),
            });
        };

        debug!(tool, "calling MCP tool");
        let params = json!({ "name": tool, "arguments": arguments });
        let outcome =
            tokio::time::timeout(self.call_timeout, session.transport.request("tools/call", Some(params)))
                .await;

        match outcome {
            Ok(Ok(result)) => call_result_text(&result),
            Ok(Err(e @ ToolError::Server { .. })) => Err(e),
            Ok(Err(e)) => {
                warn!(tool, error = %e, "MCP transport failed, dropping session");
                *guard = None;
                Err(e)
            }
            Err(_) => {
                warn!(tool, "MCP call timed out, dropping session");
                *guard = None;
                Err(ToolError::Timeout {
                    tool: tool.to_string(),
                    timeout_ms: u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}
