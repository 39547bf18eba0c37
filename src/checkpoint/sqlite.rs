//! `SQLite` checkpoint store.
//!
//! One row per thread holding the serialized state plus a few columns
//! for listing without deserializing transcripts. WAL mode is enabled so
//! `threads list` can read while a run writes.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::{Checkpointer, ThreadSummary};
use crate::agent::state::{ConversationState, Route};
use crate::error::CheckpointError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id TEXT PRIMARY KEY,
    state TEXT NOT NULL,
    next TEXT,
    turn_count INTEGER NOT NULL DEFAULT 0,
    step INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checkpoints_updated
    ON checkpoints(updated_at);
";

/// Durable checkpoint store backed by a single `SQLite` file.
///
/// Queries run on the blocking thread pool so a slow write never stalls
/// the async workers driving other threads.
pub struct SqliteCheckpointer {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointer {
    /// Opens (or creates) the database, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the directory or database cannot be
    /// created or the schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self, CheckpointError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] if the schema cannot be applied.
    pub fn in_memory() -> Result<Self, CheckpointError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CheckpointError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, CheckpointError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, CheckpointError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| CheckpointError::LockPoisoned)?;
            f(&guard)
        })
        .await?
    }
}

fn parse_route(token: Option<String>) -> Option<Route> {
    token.as_deref().and_then(Route::from_token)
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn is_durable(&self) -> bool {
        true
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, CheckpointError> {
        let thread_id = thread_id.to_string();
        let raw: Option<String> = self
            .blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT state FROM checkpoints WHERE thread_id = ?1",
                        params![thread_id],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), CheckpointError> {
        let thread_id = thread_id.to_string();
        let json = serde_json::to_string(state)?;
        let next = state.next.map(Route::as_str);
        let turn_count = i64::try_from(state.messages.len()).unwrap_or(i64::MAX);
        let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO checkpoints (thread_id, state, next, turn_count, step, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)
                 ON CONFLICT(thread_id) DO UPDATE SET
                    state = excluded.state,
                    next = excluded.next,
                    turn_count = excluded.turn_count,
                    step = checkpoints.step + 1,
                    updated_at = excluded.updated_at",
                params![thread_id, json, next, turn_count, updated_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, CheckpointError> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare(
                "SELECT thread_id, next, turn_count, step, updated_at
                 FROM checkpoints ORDER BY updated_at DESC, thread_id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ThreadSummary {
                    thread_id: row.get(0)?,
                    next: parse_route(row.get(1)?),
                    turn_count: usize::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
                    step: u64::try_from(row.get::<_, i64>(3)?).unwrap_or(0),
                    updated_at: row.get(4)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn delete(&self, thread_id: &str) -> Result<bool, CheckpointError> {
        let thread_id = thread_id.to_string();
        self.blocking(move |conn| {
            let removed = conn.execute(
                "DELETE FROM checkpoints WHERE thread_id = ?1",
                params![thread_id],
            )?;
            Ok(removed > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::Turn;
    use crate::agent::tool::ToolCall;
    use tempfile::TempDir;

    fn sample_state() -> ConversationState {
        ConversationState {
            messages: vec![
                Turn::user("Create an assignment called Essay 1 in History 101"),
                Turn::assistant(r#"{"next": "Canvas_Executor"}"#),
                Turn::Assistant {
                    text: String::new(),
                    tool_calls: vec![ToolCall {
                        id: "call_1".to_string(),
                        name: "get_canvas_courses".to_string(),
                        arguments: "{}".to_string(),
                    }],
                },
                Turn::ToolResult {
                    tool_call_id: "call_1".to_string(),
                    name: "get_canvas_courses".to_string(),
                    text: r#"[{"id": 12, "name": "History 101"}]"#.to_string(),
                },
                Turn::assistant("Assignment created. Link: https://canvas.example/a/1"),
            ],
            next: Some(Route::Supervisor),
        }
    }

    #[tokio::test]
    async fn test_round_trip_preserves_state() {
        let store = SqliteCheckpointer::in_memory().unwrap_or_else(|_| unreachable!());
        let state = sample_state();

        store
            .save("thread-1", &state)
            .await
            .unwrap_or_else(|_| unreachable!());
        let loaded = store
            .load("thread-1")
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn test_load_missing_thread() {
        let store = SqliteCheckpointer::in_memory().unwrap_or_else(|_| unreachable!());
        let loaded = store.load("nope").await.unwrap_or_else(|_| unreachable!());
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_and_counts_steps() {
        let store = SqliteCheckpointer::in_memory().unwrap_or_else(|_| unreachable!());
        let mut state = ConversationState::new();
        state.push(Turn::user("hi"));
        state.next = Some(Route::Supervisor);
        store.save("t", &state).await.unwrap_or_else(|_| unreachable!());

        state.push(Turn::assistant(r#"{"next": "FINISH"}"#));
        state.next = Some(Route::Finish);
        store.save("t", &state).await.unwrap_or_else(|_| unreachable!());

        let threads = store.list_threads().await.unwrap_or_else(|_| unreachable!());
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].thread_id, "t");
        assert_eq!(threads[0].step, 2);
        assert_eq!(threads[0].turn_count, 2);
        assert_eq!(threads[0].next, Some(Route::Finish));

        let loaded = store.load("t").await.unwrap_or_else(|_| unreachable!());
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteCheckpointer::in_memory().unwrap_or_else(|_| unreachable!());
        store
            .save("t", &sample_state())
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(store.delete("t").await.unwrap_or_else(|_| unreachable!()));
        assert!(!store.delete("t").await.unwrap_or_else(|_| unreachable!()));
        assert!(store.load("t").await.unwrap_or_else(|_| unreachable!()).is_none());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("checkpoints.db");
        let state = sample_state();

        {
            let store = SqliteCheckpointer::open(&path).unwrap_or_else(|_| unreachable!());
            store.save("t", &state).await.unwrap_or_else(|_| unreachable!());
        }

        let store = SqliteCheckpointer::open(&path).unwrap_or_else(|_| unreachable!());
        let loaded = store.load("t").await.unwrap_or_else(|_| unreachable!());
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    #[allow(clippy::await_holding_lock)]
    async fn test_contended_save_leaves_async_worker_free() {
        let store = Arc::new(SqliteCheckpointer::in_memory().unwrap_or_else(|_| unreachable!()));
        let held = store.conn.lock().unwrap_or_else(|_| unreachable!());

        let saving = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.save("t", &sample_state()).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // The single worker must still schedule other tasks while the
        // save waits on the connection lock.
        let other = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            tokio::spawn(async { 7 }),
        )
        .await;
        assert!(matches!(other, Ok(Ok(7))));

        drop(held);
        let saved = saving.await.unwrap_or_else(|_| unreachable!());
        assert!(saved.is_ok());
        assert!(store.load("t").await.unwrap_or_else(|_| unreachable!()).is_some());
    }

    #[tokio::test]
    async fn test_corrupt_state_is_a_serialization_error() {
        let store = SqliteCheckpointer::in_memory().unwrap_or_else(|_| unreachable!());
        store
            .blocking(|conn| {
                conn.execute(
                    "INSERT INTO checkpoints (thread_id, state, updated_at) VALUES ('bad', '{oops', 'x')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap_or_else(|_| unreachable!());

        let result = store.load("bad").await;
        assert!(matches!(result, Err(CheckpointError::Serialization(_))));
    }
}
