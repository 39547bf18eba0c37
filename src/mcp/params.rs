//! MCP tool parameter types.
//!
//! Defines the input schemas for MCP tools using `schemars` for automatic
//! JSON Schema generation required by the MCP protocol.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_thread_id() -> String {
    "demo-1".to_string()
}

/// Parameters for the `chat` MCP tool.
///
/// Sends one message to a conversation thread and returns the final reply.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatParams {
    /// The user's message.
    pub message: String,

    /// Conversation thread identifier. Messages on the same thread share
    /// history.
    #[serde(default = "default_thread_id")]
    pub thread_id: String,

    /// End-user identifier for gateway analytics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    /// Free-form request metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_defaults() {
        let params: ChatParams = serde_json::from_str(r#"{"message": "hi"}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(params.thread_id, "demo-1");
        assert!(params.customer_id.is_none());
        assert!(params.metadata.is_none());
    }
}
