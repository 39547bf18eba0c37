//! Agent trait definition.
//!
//! The supervisor and both workers implement this trait, which gives the
//! orchestrator a uniform way to run one node against the shared state.

use async_trait::async_trait;

use super::message::{ChatRequest, RequestContext, TokenUsage, system_message};
use super::provider::LlmProvider;
use super::state::{ConversationState, to_chat_messages};
use super::tool::ToolDefinition;
use crate::error::AgentError;

/// What one node step did, for logging and usage accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Agent that ran.
    pub agent: &'static str,
    /// Model used.
    pub model: String,
    /// Token usage across every model call in the step.
    pub usage: TokenUsage,
}

/// Trait implemented by the supervisor and the workers.
///
/// Each agent has a fixed system prompt and model settings. A step reads
/// the trailing context window of the state, appends the turns it
/// produced, and sets [`ConversationState::next`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and gateway attribution.
    fn name(&self) -> &'static str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Model identifier for this step.
    fn model(&self, state: &ConversationState) -> String;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Tool definitions available to this agent.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Builds the request for the current state: system prompt followed by
    /// the context window.
    fn build_request(&self, state: &ConversationState, ctx: &RequestContext) -> ChatRequest {
        let mut messages = vec![system_message(self.system_prompt())];
        messages.extend(to_chat_messages(state.window()));

        ChatRequest {
            model: self.model(state),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            tools: self.tools(),
            context: ctx.for_agent(self.name()),
        }
    }

    /// Runs one step of this node.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the model call fails or a tool loop
    /// runs out of iterations. Tool failures do not surface here.
    async fn step(
        &self,
        provider: &dyn LlmProvider,
        state: &mut ConversationState,
        ctx: &RequestContext,
    ) -> Result<StepReport, AgentError>;
}
