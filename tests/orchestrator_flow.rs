//! End-to-end runs of the supervisor/worker graph with scripted models.

#![allow(clippy::panic)]

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use canvas_agent::agent::message::{ChatRequest, ChatResponse, Role, TokenUsage};
use canvas_agent::agent::{
    AgentConfig, ChatOutcome, LlmProvider, Orchestrator, PromptSet, RequestMetadata, Route,
    ToolBackend, ToolCall, Turn,
};
use canvas_agent::checkpoint::{Checkpointer, SqliteCheckpointer};
use canvas_agent::error::{AgentError, ToolError};
use canvas_agent::observability::NoopSink;

/// Answers by rule instead of by script, so concurrent runs stay deterministic.
///
/// - Supervisor: routes a fresh user turn to `worker`, otherwise `FINISH`.
/// - Canvas executor: requests `get_canvas_courses`, then summarizes the result.
/// - Content specialist: drafts a fixed reply mentioning the thread.
struct RuleProvider {
    worker: &'static str,
    agents_seen: Mutex<Vec<String>>,
}

impl RuleProvider {
    fn new(worker: &'static str) -> Self {
        Self {
            worker,
            agents_seen: Mutex::new(Vec::new()),
        }
    }

    fn agents_seen(&self) -> Vec<String> {
        self.agents_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn reply(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        usage: TokenUsage {
            prompt_tokens: 3,
            completion_tokens: 2,
            total_tokens: 5,
        },
        tool_calls: Vec::new(),
        finish_reason: Some("stop".to_string()),
    }
}

#[async_trait]
impl LlmProvider for RuleProvider {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        // Give other runs a chance to interleave.
        tokio::task::yield_now().await;
        let agent = request.context.agent.clone().unwrap_or_default();
        self.agents_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(agent.clone());
        let last = request.messages.last();

        let response = match agent.as_str() {
            "Supervisor" => {
                if last.is_some_and(|m| m.role == Role::User) {
                    reply(&format!(r#"{{"next": "{}"}}"#, self.worker))
                } else {
                    reply(r#"{"next": "FINISH"}"#)
                }
            }
            "Canvas_Executor" => {
                if let Some(result) = last.filter(|m| m.role == Role::Tool) {
                    reply(&format!("Your courses: {}", result.content))
                } else {
                    ChatResponse {
                        content: String::new(),
                        usage: TokenUsage::default(),
                        tool_calls: vec![ToolCall {
                            id: "call_1".to_string(),
                            name: "get_canvas_courses".to_string(),
                            arguments: "{}".to_string(),
                        }],
                        finish_reason: Some("tool_calls".to_string()),
                    }
                }
            }
            "Content_Specialist" => reply(&format!(
                "Draft for {}: Dear students, welcome to the course.",
                request.context.thread_id.as_deref().unwrap_or("?")
            )),
            other => panic!("unexpected agent {other}"),
        };
        Ok(response)
    }
}

struct CoursesBackend {
    calls: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl ToolBackend for CoursesBackend {
    async fn call(&self, tool: &str, arguments: Value) -> Result<String, ToolError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((tool.to_string(), arguments));
        Ok(r#"[{"id": 12, "name": "History 101"}]"#.to_string())
    }
}

fn config() -> AgentConfig {
    AgentConfig::builder()
        .api_key("test")
        .build()
        .unwrap_or_else(|_| unreachable!())
}

fn orchestrator(
    provider: Arc<RuleProvider>,
    backend: Arc<CoursesBackend>,
    store: Arc<dyn Checkpointer>,
) -> Orchestrator {
    Orchestrator::with_prompts(
        provider,
        &config(),
        &PromptSet::defaults(),
        backend,
        Arc::new(NoopSink),
        store,
    )
}

fn backend() -> Arc<CoursesBackend> {
    Arc::new(CoursesBackend {
        calls: Mutex::new(Vec::new()),
    })
}

fn sqlite(dir: &TempDir) -> Arc<dyn Checkpointer> {
    Arc::new(
        SqliteCheckpointer::open(&dir.path().join("checkpoints.db"))
            .unwrap_or_else(|_| unreachable!()),
    )
}

#[tokio::test]
async fn executor_run_calls_canvas_and_persists() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let store = sqlite(&dir);
    let provider = Arc::new(RuleProvider::new("Canvas_Executor"));
    let backend = backend();
    let orch = orchestrator(provider.clone(), backend.clone(), Arc::clone(&store));

    let outcome = orch
        .run("thread-a", "List my courses", RequestMetadata::default())
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert_eq!(
        outcome.reply,
        r#"Your courses: [{"id": 12, "name": "History 101"}]"#
    );
    assert!(outcome.persisted);
    assert_eq!(
        provider.agents_seen(),
        vec!["Supervisor", "Canvas_Executor", "Canvas_Executor", "Supervisor"]
    );

    let calls = backend.calls.lock().unwrap_or_else(PoisonError::into_inner).clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "canvas_list_courses");
    assert_eq!(calls[0].1["include_ended"], Value::Bool(false));

    let stored = store
        .load("thread-a")
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    assert_eq!(stored.next, Some(Route::Finish));
    assert!(matches!(stored.messages.first(), Some(Turn::User { .. })));
    assert!(
        stored
            .messages
            .iter()
            .any(|t| matches!(t, Turn::ToolResult { name, .. } if name == "get_canvas_courses"))
    );
}

#[tokio::test]
async fn finish_first_never_invokes_a_worker() {
    struct FinishOnly;

    #[async_trait]
    impl LlmProvider for FinishOnly {
        fn name(&self) -> &'static str {
            "finish"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            assert_eq!(request.context.agent.as_deref(), Some("Supervisor"));
            Ok(reply(r#"{"next": "FINISH"}"#))
        }
    }

    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let backend = backend();
    let orch = Orchestrator::with_prompts(
        Arc::new(FinishOnly),
        &config(),
        &PromptSet::defaults(),
        backend.clone(),
        Arc::new(NoopSink),
        sqlite(&dir),
    );

    let outcome = orch
        .run("thread-b", "thanks, that's all", RequestMetadata::default())
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert_eq!(outcome.hops, 1);
    assert_eq!(outcome.reply, "Process completed.");
    let assistant_turns = outcome
        .state
        .messages
        .iter()
        .filter(|t| matches!(t, Turn::Assistant { .. }))
        .count();
    assert_eq!(assistant_turns, 1);
    assert!(
        backend
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    );
}

#[tokio::test]
async fn distinct_threads_run_concurrently_without_mixing() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let store = sqlite(&dir);
    let orch = Arc::new(orchestrator(
        Arc::new(RuleProvider::new("Content_Specialist")),
        backend(),
        Arc::clone(&store),
    ));

    let (a, b) = tokio::join!(
        orch.chat("thread-x", "Draft a welcome note", RequestMetadata::default()),
        orch.chat("thread-y", "Draft a welcome note", RequestMetadata::default()),
    );

    let ChatOutcome::Success { response: ra, .. } = a else {
        panic!("thread-x failed");
    };
    let ChatOutcome::Success { response: rb, .. } = b else {
        panic!("thread-y failed");
    };
    assert!(ra.starts_with("Draft for thread-x"));
    assert!(rb.starts_with("Draft for thread-y"));

    let threads = store.list_threads().await.unwrap_or_else(|_| unreachable!());
    assert_eq!(threads.len(), 2);
    assert!(threads.iter().all(|t| t.turn_count == 4));
}

#[tokio::test]
async fn same_thread_runs_are_serialized() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let store = sqlite(&dir);
    let orch = Arc::new(orchestrator(
        Arc::new(RuleProvider::new("Content_Specialist")),
        backend(),
        Arc::clone(&store),
    ));

    let (a, b) = tokio::join!(
        orch.run("shared", "Draft a welcome note", RequestMetadata::default()),
        orch.run("shared", "Draft a closing note", RequestMetadata::default()),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());

    let stored = store
        .load("shared")
        .await
        .unwrap_or_else(|_| unreachable!())
        .unwrap_or_else(|| unreachable!());
    let messages = &stored.messages;
    assert_eq!(messages.len(), 8);

    // Two whole runs back to back: user, route, draft, finish.
    for run in messages.chunks(4) {
        assert!(matches!(run[0], Turn::User { .. }));
        assert_eq!(run[1], Turn::assistant(r#"{"next": "Content_Specialist"}"#));
        assert!(run[2].text().starts_with("Draft for shared"));
        assert_eq!(run[3], Turn::assistant(r#"{"next": "FINISH"}"#));
    }
    assert_eq!(stored.next, Some(Route::Finish));
}

#[tokio::test]
async fn second_message_sees_first_in_history() {
    let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
    let store = sqlite(&dir);
    let orch = orchestrator(
        Arc::new(RuleProvider::new("Content_Specialist")),
        backend(),
        Arc::clone(&store),
    );

    orch.run("thread-c", "Draft a welcome note", RequestMetadata::default())
        .await
        .unwrap_or_else(|e| panic!("first run failed: {e}"));

    // A fresh orchestrator on the same database picks the thread up.
    let orch = orchestrator(
        Arc::new(RuleProvider::new("Content_Specialist")),
        backend(),
        Arc::clone(&store),
    );
    let outcome = orch
        .run("thread-c", "Make it shorter", RequestMetadata::default())
        .await
        .unwrap_or_else(|e| panic!("second run failed: {e}"));

    assert_eq!(outcome.state.messages.len(), 8);
    assert_eq!(outcome.state.messages[0], Turn::user("Draft a welcome note"));
    assert_eq!(outcome.state.messages[4], Turn::user("Make it shorter"));
}
