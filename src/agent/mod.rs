//! Supervisor/worker orchestration for the Canvas LMS assistant.
//!
//! A supervisor model routes each conversation turn to one of two
//! workers and decides when the run is finished. Workers hand control
//! back to the supervisor after every step.
//!
//! # Architecture
//!
//! ```text
//! User message → Orchestrator (per-thread checkpointed state)
//!   ├── SupervisorAgent (fast tier, JSON routing decision)
//!   ├── CanvasExecutorAgent
//!   │   └── agentic_loop → ToolExecutor → Canvas MCP server
//!   ├── ContentSpecialistAgent (single drafting call, scored)
//!   └── extract_final_reply → response
//! ```
//!
//! Worker model choice is driven by [`tier::classify`] on the latest user
//! message. Every model request carries an explicit
//! [`RequestContext`] for gateway attribution.

pub mod agentic_loop;
pub mod canvas_executor;
pub mod client;
pub mod config;
pub mod content_specialist;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod routing;
pub mod state;
pub mod supervisor;
#[cfg(test)]
pub mod testing;
pub mod tier;
pub mod tool;
pub mod traits;

// Re-export key types
pub use canvas_executor::CanvasExecutorAgent;
pub use client::create_provider;
pub use config::AgentConfig;
pub use content_specialist::ContentSpecialistAgent;
pub use executor::{ToolBackend, ToolExecutor};
pub use message::{ChatMessage, ChatRequest, ChatResponse, RequestContext, Role, TokenUsage};
pub use orchestrator::{ChatOutcome, Orchestrator, RequestMetadata, RunOutcome};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use routing::{DecisionSource, RoutingDecision, extract_final_reply, parse_routing};
pub use state::{ConversationState, Node, Route, Turn};
pub use supervisor::SupervisorAgent;
pub use tier::{ModelTier, classify};
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, StepReport};
