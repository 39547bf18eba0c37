//! Per-thread conversation checkpoints.
//!
//! The orchestrator loads a thread's [`ConversationState`] at the start of
//! a run and saves it after every node. [`SqliteCheckpointer`] is the
//! durable store; [`MemoryCheckpointer`] is the degraded fallback when the
//! database cannot be opened.

mod memory;
mod sqlite;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::agent::state::{ConversationState, Route};
use crate::error::CheckpointError;

pub use memory::MemoryCheckpointer;
pub use sqlite::SqliteCheckpointer;

/// Default checkpoint database location, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".canvas-agent/checkpoints.db";

/// One stored thread, without its transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
    /// Thread identifier.
    pub thread_id: String,
    /// Routing token at the last checkpoint.
    pub next: Option<Route>,
    /// Number of turns in the transcript.
    pub turn_count: usize,
    /// Number of checkpoints written for this thread.
    pub step: u64,
    /// RFC 3339 time of the last checkpoint.
    pub updated_at: String,
}

impl ThreadSummary {
    pub(crate) fn from_state(thread_id: &str, state: &ConversationState, step: u64, updated_at: String) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            next: state.next,
            turn_count: state.messages.len(),
            step,
            updated_at,
        }
    }
}

/// Keyed store for [`ConversationState`].
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Store name for logs.
    fn name(&self) -> &'static str;

    /// Whether state survives a restart.
    fn is_durable(&self) -> bool;

    /// Loads the latest state for a thread, if any.
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError>;

    /// Replaces the stored state for a thread.
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError>;

    /// Lists stored threads, most recently updated first.
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, CheckpointError>;

    /// Removes a thread. Returns `false` if it did not exist.
    async fn delete(&self, thread_id: &str) -> Result<bool, CheckpointError>;
}

/// Opens the `SQLite` store at `path`, falling back to memory on failure.
#[must_use]
pub fn open_checkpointer(path: &Path) -> Arc<dyn Checkpointer> {
    match SqliteCheckpointer::open(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "checkpoint database unavailable, using in-memory state"
            );
            Arc::new(MemoryCheckpointer::new())
        }
    }
}
