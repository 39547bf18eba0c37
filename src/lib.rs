//! # canvas-agent
//!
//! Supervisor/worker multi-agent orchestration for operating a Canvas LMS.
//!
//! A supervisor model reads the recent conversation and routes each turn
//! to one of two workers:
//!
//! - the **Canvas executor**, which calls Canvas operations through an MCP
//!   tool server in a bounded tool-calling loop;
//! - the **content specialist**, which drafts and analyzes text in a
//!   single call and reports a quality score.
//!
//! Workers always hand control back to the supervisor, which ends the run
//! with `FINISH`. Conversation state is checkpointed per thread after
//! every node.
//!
//! ## Modules
//!
//! - [`agent`]: state, routing, agents, provider and orchestrator
//! - [`canvas`]: Canvas tool catalogue, argument normalization, MCP client
//! - [`checkpoint`]: per-thread state persistence
//! - [`observability`]: best-effort request-log sink
//! - [`cli`]: command-line interface
//! - `mcp`: MCP server front end (feature `mcp`)
//! - [`error`]: error types

pub mod agent;
pub mod canvas;
pub mod checkpoint;
pub mod cli;
pub mod error;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod observability;

pub use agent::{AgentConfig, ChatOutcome, Orchestrator, RequestMetadata, RunOutcome};
pub use checkpoint::{Checkpointer, MemoryCheckpointer, SqliteCheckpointer};
pub use error::{Error, Result};
