//! Tool type definitions for function-calling.
//!
//! Provider-agnostic types for tool definitions, calls, and results. The
//! Canvas operations exposed to the executor agent are generated from the
//! catalogue in [`crate::canvas::catalog`].

use serde::{Deserialize, Serialize};

use crate::canvas::catalog::CATALOG;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match a catalogue entry).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Name of the tool that ran.
    pub name: String,
    /// Result text (JSON payload on success, `"Error executing ..."` on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// A set of tool definitions scoped to an agent role.
///
/// Only the Canvas executor carries tools; the supervisor and content
/// specialist keep the trait's empty default.
#[derive(Debug, Clone)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Tool set for the Canvas executor agent.
    #[must_use]
    pub fn canvas() -> Self {
        Self {
            definitions: CATALOG.iter().map(|tool| tool.definition()).collect(),
        }
    }
}
