//! MCP (Model Context Protocol) server for canvas-agent.
//!
//! Exposes the orchestrator as a `chat` tool and stored conversation
//! threads as resources, so an MCP client (a chat front end, another
//! agent) can drive the Canvas assistant.
//!
//! # Feature Gate
//!
//! This module requires the `mcp` feature flag (enabled by default).
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ chat(message, thread_id, customer_id, metadata)
//! CanvasAgentMcpServer
//!   ↓
//! Orchestrator::chat()
//!   ├── SupervisorAgent ⇄ CanvasExecutorAgent / ContentSpecialistAgent
//!   └── Checkpointer (per-thread state)
//!   ↓
//! {"response", "status"} | {"error"} → MCP Client
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::ChatParams;
pub use server::CanvasAgentMcpServer;
pub use transport::{serve_sse, serve_stdio};
