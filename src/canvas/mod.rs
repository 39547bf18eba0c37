//! Canvas LMS tool surface.
//!
//! - [`catalog`]: static table of operations exposed to the executor agent
//! - [`args`]: argument renames, defaults, id/date normalization, link formatting
//! - [`mcp`]: stdio JSON-RPC client for the Canvas MCP server

pub mod args;
pub mod catalog;
pub mod mcp;

pub use catalog::{Backend, CATALOG, CanvasTool, find};
pub use mcp::McpToolBackend;
