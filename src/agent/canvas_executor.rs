//! Canvas executor: the tool-using action worker.

use std::sync::Arc;

use async_trait::async_trait;

use super::agentic_loop::agentic_loop;
use super::config::AgentConfig;
use super::executor::{ToolBackend, ToolExecutor};
use super::message::RequestContext;
use super::provider::LlmProvider;
use super::state::{ConversationState, Node, Route};
use super::tier::classify;
use super::tool::{ToolDefinition, ToolSet};
use super::traits::{Agent, StepReport};
use crate::error::AgentError;
use crate::observability::ObservabilitySink;

/// Action worker with access to the Canvas tool catalogue.
pub struct CanvasExecutorAgent {
    config: AgentConfig,
    system_prompt: String,
    tools: ToolSet,
    backend: Arc<dyn ToolBackend>,
    sink: Arc<dyn ObservabilitySink>,
}

impl CanvasExecutorAgent {
    /// Creates the executor agent.
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        system_prompt: String,
        backend: Arc<dyn ToolBackend>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            config: config.clone(),
            system_prompt,
            tools: ToolSet::canvas(),
            backend,
            sink,
        }
    }
}

#[async_trait]
impl Agent for CanvasExecutorAgent {
    fn name(&self) -> &'static str {
        Node::ActionWorker.agent_name()
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn model(&self, state: &ConversationState) -> String {
        classify(state.latest_user_text())
            .model(&self.config)
            .to_string()
    }

    fn max_tokens(&self) -> u32 {
        self.config.max_tokens
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        self.tools.definitions().to_vec()
    }

    async fn step(
        &self,
        provider: &dyn LlmProvider,
        state: &mut ConversationState,
        ctx: &RequestContext,
    ) -> Result<StepReport, AgentError> {
        let mut request = self.build_request(state, ctx);
        let executor = ToolExecutor::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.sink),
            request.context.clone(),
        );

        let outcome = agentic_loop(
            provider,
            &mut request,
            &executor,
            self.config.max_tool_iterations,
        )
        .await?;

        state.messages.extend(outcome.turns);
        state.next = Some(Route::Supervisor);

        Ok(StepReport {
            agent: self.name(),
            model: request.model,
            usage: outcome.usage,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::state::Turn;
    use crate::agent::testing::{MockBackend, RecordingSink, ScriptedProvider, text, tool_call};

    fn config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("k")
            .fast_model("fast-model")
            .capable_model("capable-model")
            .max_tool_iterations(3)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn agent(backend: MockBackend, sink: &Arc<RecordingSink>) -> CanvasExecutorAgent {
        CanvasExecutorAgent::new(&config(), "execute".to_string(), Arc::new(backend), sink.clone())
    }

    #[tokio::test]
    async fn test_step_appends_tool_turns_and_routes_back() {
        let sink = Arc::new(RecordingSink::default());
        let worker = agent(MockBackend::replying(r#"[{"id": 12, "name": "History 101"}]"#), &sink);
        let provider = ScriptedProvider::new(vec![
            tool_call("call_1", "get_canvas_courses", ""),
            text("History 101 has id 12."),
        ]);
        let mut state = ConversationState::new();
        state.push(Turn::user("list my courses"));
        state.push(Turn::assistant(r#"{"next": "Canvas_Executor"}"#));

        let report = worker
            .step(&provider, &mut state, &RequestContext::for_thread("t"))
            .await
            .unwrap_or_else(|e| panic!("step failed: {e}"));

        assert_eq!(state.next, Some(Route::Supervisor));
        assert_eq!(state.messages.len(), 5);
        assert!(matches!(&state.messages[3], Turn::ToolResult { tool_call_id, .. } if tool_call_id == "call_1"));
        assert_eq!(state.messages[4], Turn::assistant("History 101 has id 12."));
        assert_eq!(report.model, "fast-model");

        let requests = provider.requests();
        assert_eq!(requests[0].tools.len(), ToolSet::canvas().definitions().len());
        assert_eq!(requests[0].context.agent.as_deref(), Some("Canvas_Executor"));
    }

    #[tokio::test]
    async fn test_step_tool_failure_does_not_escape() {
        let sink = Arc::new(RecordingSink::default());
        let worker = agent(MockBackend::failing("connection refused"), &sink);
        let provider = ScriptedProvider::new(vec![
            tool_call("call_1", "create_canvas_announcement", r#"{"course_id": 1, "title": "T", "message": "M"}"#),
            text("Sorry, Canvas is unreachable right now."),
        ]);
        let mut state = ConversationState::new();
        state.push(Turn::user("post an announcement"));

        worker
            .step(&provider, &mut state, &RequestContext::for_thread("t"))
            .await
            .unwrap_or_else(|e| panic!("step failed: {e}"));

        assert!(matches!(
            &state.messages[2],
            Turn::ToolResult { text, .. }
                if text == "Error executing create_canvas_announcement: connection refused"
        ));
        assert_eq!(state.next, Some(Route::Supervisor));
        assert_eq!(sink.events(), vec!["tool_error_create_canvas_announcement"]);

        // The model saw the error text on its second call.
        let requests = provider.requests();
        assert!(requests[1]
            .messages
            .iter()
            .any(|m| m.content.starts_with("Error executing create_canvas_announcement")));
    }

    #[tokio::test]
    async fn test_step_uses_capable_tier_for_complex_request() {
        let sink = Arc::new(RecordingSink::default());
        let worker = agent(MockBackend::replying("{}"), &sink);
        let provider = ScriptedProvider::new(vec![text("Here is my analysis.")]);
        let mut state = ConversationState::new();
        state.push(Turn::user("analyze participation in the discussion"));

        let report = worker
            .step(&provider, &mut state, &RequestContext::default())
            .await
            .unwrap_or_else(|e| panic!("step failed: {e}"));

        assert_eq!(report.model, "capable-model");
    }

    #[tokio::test]
    async fn test_step_loop_exhaustion_is_an_error() {
        let sink = Arc::new(RecordingSink::default());
        let worker = agent(MockBackend::replying("[]"), &sink);
        let provider = ScriptedProvider::new(vec![
            tool_call("c1", "get_canvas_courses", ""),
            tool_call("c2", "get_canvas_courses", ""),
            tool_call("c3", "get_canvas_courses", ""),
        ]);
        let mut state = ConversationState::new();
        state.push(Turn::user("list courses"));

        let result = worker
            .step(&provider, &mut state, &RequestContext::default())
            .await;
        assert!(matches!(result, Err(AgentError::ToolLoopExceeded { max_iterations: 3 })));
        assert_eq!(state.messages.len(), 1);
    }
}
