//! Supervisor agent: picks the next worker or finishes.

use async_trait::async_trait;
use tracing::debug;

use super::config::AgentConfig;
use super::message::RequestContext;
use super::provider::LlmProvider;
use super::routing::{RoutingDecision, parse_routing};
use super::state::{ConversationState, Node, Turn};
use super::traits::{Agent, StepReport};
use crate::error::AgentError;

/// Routing agent. Always runs on the fast tier in JSON mode.
pub struct SupervisorAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SupervisorAgent {
    /// Creates a supervisor with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.fast_model.clone(),
            max_tokens: config.max_tokens,
            system_prompt,
        }
    }

    /// Asks the model for a routing decision and records it.
    ///
    /// The raw reply is appended to the transcript as an assistant turn
    /// and `state.next` is set to the resolved route.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails. Malformed replies
    /// are not errors.
    pub async fn decide(
        &self,
        provider: &dyn LlmProvider,
        state: &mut ConversationState,
        ctx: &RequestContext,
    ) -> Result<(RoutingDecision, StepReport), AgentError> {
        let request = self.build_request(state, ctx);
        let response = provider.chat(&request).await?;

        let decision = parse_routing(&response.content);
        debug!(
            next = %decision.next,
            source = ?decision.source,
            "supervisor decision"
        );

        state.push(Turn::assistant(response.content));
        state.next = Some(decision.next);

        Ok((
            decision,
            StepReport {
                agent: self.name(),
                model: request.model,
                usage: response.usage,
            },
        ))
    }
}

#[async_trait]
impl Agent for SupervisorAgent {
    fn name(&self) -> &'static str {
        Node::Supervisor.agent_name()
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn model(&self, _state: &ConversationState) -> String {
        self.model.clone()
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    async fn step(
        &self,
        provider: &dyn LlmProvider,
        state: &mut ConversationState,
        ctx: &RequestContext,
    ) -> Result<StepReport, AgentError> {
        let (_, report) = self.decide(provider, state, ctx).await?;
        Ok(report)
    }
}
