//! Orchestrator for the supervisor/worker state machine.
//!
//! A run appends the user's message to the thread's transcript and then
//! hands control to the node selected by `state.next` until it reaches
//! `FINISH`:
//!
//! ```text
//! Supervisor ─┬─▶ Canvas_Executor ────┐
//!             ├─▶ Content_Specialist ─┤
//!             └─▶ FINISH              │
//!     ▲                               │
//!     └───────────────────────────────┘
//! ```
//!
//! The state is checkpointed after the user turn and after every node, so
//! an interrupted run can be resumed from its last completed node.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::canvas_executor::CanvasExecutorAgent;
use super::client::create_provider;
use super::config::AgentConfig;
use super::content_specialist::ContentSpecialistAgent;
use super::executor::ToolBackend;
use super::message::{RequestContext, TokenUsage};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::routing::extract_final_reply;
use super::state::{ConversationState, Node, Route, Turn};
use super::supervisor::SupervisorAgent;
use super::traits::Agent;
use crate::canvas::McpToolBackend;
use crate::checkpoint::Checkpointer;
use crate::error::AgentError;
use crate::observability::{ObservabilitySink, create_sink};

/// Maximum byte length of a user message.
const MAX_MESSAGE_LEN: usize = 10_000;

/// Caller-supplied attribution for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// End-user identifier for analytics.
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Free-form metadata forwarded to the gateway and log sink.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Thread the run belonged to.
    pub thread_id: String,
    /// Final user-facing reply.
    pub reply: String,
    /// Node executions in this run.
    pub hops: usize,
    /// Whether the run was cut off by the hop limit.
    pub hop_limit_reached: bool,
    /// Whether every checkpoint of this run was durably written.
    pub persisted: bool,
    /// Token usage summed over the run.
    pub usage: TokenUsage,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
    /// State after the run.
    #[serde(skip)]
    pub state: ConversationState,
}

/// Caller-facing result of [`Orchestrator::chat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatOutcome {
    /// The run finished.
    Success {
        /// Final reply text.
        response: String,
        /// Same text as `response`, for clients that read `content`.
        content: String,
        /// Always `"success"`.
        status: &'static str,
    },
    /// The run failed; no partial transcript is returned.
    Failure {
        /// Error message.
        error: String,
    },
}

/// Held for the duration of a run on one thread.
struct ThreadRun<'a> {
    orchestrator: &'a Orchestrator,
    thread_id: String,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for ThreadRun<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.orchestrator.release_thread(&self.thread_id);
    }
}

/// Drives the supervisor and workers for a conversation thread.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    checkpointer: Arc<dyn Checkpointer>,
    supervisor: SupervisorAgent,
    canvas_executor: CanvasExecutorAgent,
    content_specialist: ContentSpecialistAgent,
    sink: Arc<dyn ObservabilitySink>,
    max_hops: usize,
    thread_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    /// Creates an orchestrator.
    ///
    /// Loads prompt templates from the directory specified in
    /// [`AgentConfig::prompt_dir`], falling back to compiled-in defaults.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
        backend: Arc<dyn ToolBackend>,
        sink: Arc<dyn ObservabilitySink>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, config, &prompts, backend, sink, checkpointer)
    }

    /// Creates an orchestrator with explicit prompts.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
        prompts: &PromptSet,
        backend: Arc<dyn ToolBackend>,
        sink: Arc<dyn ObservabilitySink>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        Self {
            provider,
            checkpointer,
            supervisor: SupervisorAgent::new(config, prompts.supervisor.clone()),
            canvas_executor: CanvasExecutorAgent::new(
                config,
                prompts.canvas_executor.clone(),
                backend,
                Arc::clone(&sink),
            ),
            content_specialist: ContentSpecialistAgent::new(
                config,
                prompts.content_specialist.clone(),
                Arc::clone(&sink),
            ),
            sink,
            max_hops: config.max_hops,
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wires the configured provider, the Canvas MCP backend and the
    /// request-log sink.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] for an unknown provider.
    pub fn from_config(
        config: &AgentConfig,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Result<Self, AgentError> {
        let provider = create_provider(config)?;
        let backend = Arc::new(McpToolBackend::new(
            config.mcp_command_parts(),
            config.timeout,
        ));
        Ok(Self::new(
            provider,
            config,
            backend,
            create_sink(config),
            checkpointer,
        ))
    }

    /// Waits up to `timeout` for observability deliveries still in flight.
    pub async fn flush_observability(&self, timeout: std::time::Duration) {
        self.sink.flush(timeout).await;
    }

    /// Checkpoint store used by this orchestrator.
    #[must_use]
    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    /// Runs one user message on a thread and returns the final reply.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for an empty or oversized
    /// message, and propagates model failures and tool-loop exhaustion.
    pub async fn run(
        &self,
        thread_id: &str,
        message: &str,
        request: RequestMetadata,
    ) -> Result<RunOutcome, AgentError> {
        if message.trim().is_empty() {
            return Err(AgentError::Orchestration {
                message: "Message cannot be empty".to_string(),
            });
        }
        if message.len() > MAX_MESSAGE_LEN {
            return Err(AgentError::Orchestration {
                message: format!(
                    "Message exceeds maximum length ({} bytes, max {MAX_MESSAGE_LEN})",
                    message.len()
                ),
            });
        }

        let _run = self.lock_thread(thread_id).await;

        let start = Instant::now();
        let (mut state, mut persisted) = self.load_state(thread_id).await;

        let run_start = state.messages.len();
        state.push(Turn::user(message));
        state.next = Some(Route::Supervisor);
        self.checkpoint(thread_id, &state, &mut persisted).await;

        let ctx = Self::context(thread_id, request);
        self.drive(thread_id, state, run_start, &ctx, persisted, start)
            .await
    }

    /// Continues a thread whose last run stopped before `FINISH`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] if the thread is unknown or
    /// has nothing pending, and propagates model failures.
    pub async fn resume(
        &self,
        thread_id: &str,
        request: RequestMetadata,
    ) -> Result<RunOutcome, AgentError> {
        let _run = self.lock_thread(thread_id).await;

        let start = Instant::now();
        let state = self
            .checkpointer
            .load(thread_id)
            .await
            .map_err(|e| AgentError::Orchestration {
                message: format!("failed to load thread '{thread_id}': {e}"),
            })?
            .ok_or_else(|| AgentError::Orchestration {
                message: format!("unknown thread '{thread_id}'"),
            })?;

        if !state.is_pending() {
            return Err(AgentError::Orchestration {
                message: format!("thread '{thread_id}' has no pending run"),
            });
        }

        let run_start = state
            .messages
            .iter()
            .rposition(|turn| matches!(turn, Turn::User { .. }))
            .unwrap_or(0);
        let persisted = self.checkpointer.is_durable();
        let ctx = Self::context(thread_id, request);
        self.drive(thread_id, state, run_start, &ctx, persisted, start)
            .await
    }

    /// Runs a message and folds the result into the caller-facing shape.
    pub async fn chat(
        &self,
        thread_id: &str,
        message: &str,
        request: RequestMetadata,
    ) -> ChatOutcome {
        match self.run(thread_id, message, request).await {
            Ok(outcome) => {
                info!(thread_id, hops = outcome.hops, "chat completed");
                ChatOutcome::Success {
                    content: outcome.reply.clone(),
                    response: outcome.reply,
                    status: "success",
                }
            }
            Err(e) => {
                warn!(thread_id, error = %e, "chat failed");
                ChatOutcome::Failure {
                    error: e.to_string(),
                }
            }
        }
    }

    fn context(thread_id: &str, request: RequestMetadata) -> RequestContext {
        RequestContext::for_thread(thread_id)
            .with_customer(request.customer_id)
            .with_metadata(request.metadata)
    }

    fn agent_for(&self, node: Node) -> Option<&dyn Agent> {
        match node {
            Node::Supervisor => Some(&self.supervisor),
            Node::ActionWorker => Some(&self.canvas_executor),
            Node::DraftingWorker => Some(&self.content_specialist),
            Node::Finish => None,
        }
    }

    /// Waits for exclusive use of a thread. Runs on different threads do
    /// not contend.
    async fn lock_thread(&self, thread_id: &str) -> ThreadRun<'_> {
        let lock = {
            let mut locks = self
                .thread_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(thread_id.to_string()).or_default())
        };
        ThreadRun {
            orchestrator: self,
            thread_id: thread_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Drops the thread's lock entry once nobody holds or awaits it.
    fn release_thread(&self, thread_id: &str) {
        let mut locks = self
            .thread_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(thread_id);
        }
    }

    #[cfg(test)]
    fn tracked_threads(&self) -> usize {
        self.thread_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Loads the thread, degrading to a fresh in-memory state on failure.
    async fn load_state(&self, thread_id: &str) -> (ConversationState, bool) {
        let durable = self.checkpointer.is_durable();
        match self.checkpointer.load(thread_id).await {
            Ok(Some(state)) => (state, durable),
            Ok(None) => (ConversationState::new(), durable),
            Err(e) => {
                warn!(
                    thread_id,
                    store = self.checkpointer.name(),
                    error = %e,
                    "failed to load checkpoint, starting fresh"
                );
                (ConversationState::new(), false)
            }
        }
    }

    async fn checkpoint(&self, thread_id: &str, state: &ConversationState, persisted: &mut bool) {
        if let Err(e) = self.checkpointer.save(thread_id, state).await {
            warn!(
                thread_id,
                store = self.checkpointer.name(),
                error = %e,
                "failed to save checkpoint"
            );
            *persisted = false;
        }
    }

    async fn drive(
        &self,
        thread_id: &str,
        mut state: ConversationState,
        run_start: usize,
        ctx: &RequestContext,
        mut persisted: bool,
        start: Instant,
    ) -> Result<RunOutcome, AgentError> {
        let mut hops = 0;
        let mut usage = TokenUsage::default();
        let mut hop_limit_reached = false;

        loop {
            let node = Node::from_route(state.next);
            let Some(agent) = self.agent_for(node) else {
                break;
            };

            if hops >= self.max_hops {
                warn!(
                    thread_id,
                    max_hops = self.max_hops,
                    "hop limit reached, finishing run"
                );
                state.next = Some(Route::Finish);
                hop_limit_reached = true;
                self.checkpoint(thread_id, &state, &mut persisted).await;
                break;
            }

            let report = agent
                .step(self.provider.as_ref(), &mut state, ctx)
                .await?;
            hops += 1;
            usage.accumulate(report.usage);
            debug!(
                thread_id,
                agent = report.agent,
                model = %report.model,
                next = ?state.next,
                tokens = report.usage.total_tokens,
                "node complete"
            );

            self.checkpoint(thread_id, &state, &mut persisted).await;
        }

        let reply = extract_final_reply(state.messages.get(run_start..).unwrap_or_default());
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            thread_id,
            hops,
            total_tokens = usage.total_tokens,
            elapsed_ms,
            "run finished"
        );

        Ok(RunOutcome {
            thread_id: thread_id.to_string(),
            reply,
            hops,
            hop_limit_reached,
            persisted,
            usage,
            elapsed_ms,
            state,
        })
    }
}
