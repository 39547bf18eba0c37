//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response or the iteration limit
//! is reached.

use tracing::debug;

use super::executor::ToolExecutor;
use super::message::{
    ChatRequest, ChatResponse, TokenUsage, assistant_tool_calls_message, tool_message,
};
use super::provider::LlmProvider;
use super::state::Turn;
use crate::error::AgentError;

/// Result of a completed tool loop.
#[derive(Debug, Clone)]
pub struct AgenticOutcome {
    /// Final model response (no tool calls).
    pub response: ChatResponse,
    /// Transcript turns produced along the way, ending with the final reply.
    pub turns: Vec<Turn>,
    /// Usage summed over every model call.
    pub usage: TokenUsage,
}

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// Every intermediate assistant tool-call turn and tool result is
/// returned in [`AgenticOutcome::turns`] so the caller can append them
/// to the conversation transcript.
///
/// # Errors
///
/// Returns [`AgentError::ToolLoopExceeded`] if the model keeps requesting
/// tools beyond `max_iterations`. Propagates any provider errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor,
    max_iterations: usize,
) -> Result<AgenticOutcome, AgentError> {
    let mut turns = Vec::new();
    let mut usage = TokenUsage::default();

    for iteration in 0..max_iterations {
        let response = provider.chat(request).await?;
        usage.accumulate(response.usage);

        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            turns.push(Turn::assistant(response.content.clone()));
            return Ok(AgenticOutcome {
                response,
                turns,
                usage,
            });
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request.messages.push(assistant_tool_calls_message(
            &response.content,
            response.tool_calls.clone(),
        ));
        turns.push(Turn::Assistant {
            text: response.content.clone(),
            tool_calls: response.tool_calls.clone(),
        });

        for call in &response.tool_calls {
            let result = executor.execute(call).await;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
            turns.push(Turn::ToolResult {
                tool_call_id: result.tool_call_id,
                name: result.name,
                text: result.content,
            });
        }
    }

    Err(AgentError::ToolLoopExceeded { max_iterations })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::message::{RequestContext, system_message, user_message};
    use crate::agent::testing::{MockBackend, RecordingSink, ScriptedProvider, text, tool_call};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test".to_string(),
            messages: vec![
                system_message("You are a test agent."),
                user_message("List my courses."),
            ],
            temperature: Some(0.0),
            max_tokens: Some(1024),
            json_mode: false,
            tools: Vec::new(),
            context: RequestContext::default(),
        }
    }

    fn executor() -> ToolExecutor {
        ToolExecutor::new(
            Arc::new(MockBackend::replying(r#"[{"id": 1}]"#)),
            Arc::new(RecordingSink::default()),
            RequestContext::default(),
        )
    }

    #[tokio::test]
    async fn test_agentic_loop_single_tool_round() {
        let provider = ScriptedProvider::new(vec![
            tool_call("call_0", "get_canvas_courses", "{}"),
            text("You have one course."),
        ]);
        let mut req = request();

        let outcome = agentic_loop(&provider, &mut req, &executor(), 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.response.content, "You have one course.");
        // system + user + assistant(tool_calls) + tool(result)
        assert_eq!(req.messages.len(), 4);
        assert_eq!(outcome.turns.len(), 3);
        assert!(matches!(
            &outcome.turns[1],
            Turn::ToolResult { name, text, .. } if name == "get_canvas_courses" && text == r#"[{"id": 1}]"#
        ));
        assert_eq!(outcome.turns[2], Turn::assistant("You have one course."));
        assert_eq!(outcome.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_agentic_loop_multiple_rounds() {
        let provider = ScriptedProvider::new(vec![
            tool_call("call_0", "get_canvas_courses", "{}"),
            tool_call("call_1", "list_modules", r#"{"course_id": 1}"#),
            tool_call("call_2", "list_quizzes", r#"{"course_id": 1}"#),
            text("Done."),
        ]);
        let mut req = request();

        let outcome = agentic_loop(&provider, &mut req, &executor(), 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.response.content, "Done.");
        // 2 initial + 3 rounds * 2 (assistant + tool)
        assert_eq!(req.messages.len(), 8);
        assert_eq!(outcome.turns.len(), 7);
    }

    #[tokio::test]
    async fn test_agentic_loop_exceeds_max() {
        let provider = ScriptedProvider::new(vec![
            tool_call("call_0", "get_canvas_courses", "{}"),
            tool_call("call_1", "get_canvas_courses", "{}"),
        ]);
        let mut req = request();

        let result = agentic_loop(&provider, &mut req, &executor(), 2).await;
        assert!(
            matches!(result, Err(AgentError::ToolLoopExceeded { max_iterations: 2 })),
            "expected ToolLoopExceeded"
        );
    }

    #[tokio::test]
    async fn test_agentic_loop_no_tools() {
        let provider = ScriptedProvider::new(vec![text("Nothing to do.")]);
        let mut req = request();

        let outcome = agentic_loop(&provider, &mut req, &executor(), 10)
            .await
            .unwrap_or_else(|e| panic!("agentic_loop failed: {e}"));

        assert_eq!(outcome.response.content, "Nothing to do.");
        assert_eq!(req.messages.len(), 2);
        assert_eq!(outcome.turns, vec![Turn::assistant("Nothing to do.")]);
    }

    #[tokio::test]
    async fn test_agentic_loop_provider_error_propagates() {
        let provider = ScriptedProvider::new(Vec::new()).then_fail("gateway down");
        let mut req = request();

        let result = agentic_loop(&provider, &mut req, &executor(), 3).await;
        assert!(matches!(result, Err(AgentError::ApiRequest { .. })));
    }
}
