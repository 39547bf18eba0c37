//! In-process checkpoint store. Nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::sync::RwLock;

use super::{Checkpointer, ThreadSummary};
use crate::agent::state::ConversationState;
use crate::error::CheckpointError;

struct Entry {
    state: ConversationState,
    step: u64,
    updated_at: String,
}

/// Volatile checkpoint store.
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Entry>>,
}

impl MemoryCheckpointer {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_durable(&self) -> bool {
        false
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .map(|entry| entry.state.clone()))
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError> {
        let mut threads = self.threads.write().await;
        let step = threads.get(thread_id).map_or(0, |e| e.step) + 1;
        threads.insert(
            thread_id.to_string(),
            Entry {
                state: state.clone(),
                step,
                updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        );
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, CheckpointError> {
        let threads = self.threads.read().await;
        let mut summaries: Vec<ThreadSummary> = threads
            .iter()
            .map(|(id, entry)| {
                ThreadSummary::from_state(id, &entry.state, entry.step, entry.updated_at.clone())
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.thread_id.cmp(&b.thread_id))
        });
        Ok(summaries)
    }

    async fn delete(&self, thread_id: &str) -> Result<bool, CheckpointError> {
        Ok(self.threads.write().await.remove(thread_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::{Route, Turn};

    #[tokio::test]
    async fn test_round_trip_and_delete() {
        let store = MemoryCheckpointer::new();
        let mut state = ConversationState::new();
        state.push(Turn::user("hi"));
        state.next = Some(Route::Finish);

        store.save("a", &state).await.unwrap_or_else(|_| unreachable!());
        store.save("a", &state).await.unwrap_or_else(|_| unreachable!());
        assert_eq!(
            store.load("a").await.unwrap_or_else(|_| unreachable!()),
            Some(state)
        );

        let threads = store.list_threads().await.unwrap_or_else(|_| unreachable!());
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].step, 2);

        assert!(store.delete("a").await.unwrap_or_else(|_| unreachable!()));
        assert!(store.load("a").await.unwrap_or_else(|_| unreachable!()).is_none());
    }
}
