//! Content specialist: the drafting worker (no tools).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, json};

use super::config::AgentConfig;
use super::message::RequestContext;
use super::provider::LlmProvider;
use super::state::{ConversationState, Node, Route, Turn};
use super::tier::classify;
use super::traits::{Agent, StepReport};
use crate::error::AgentError;
use crate::observability::{ObservabilitySink, ScoredExchange};

/// Metric name reported for drafted content.
pub const QUALITY_SCORE_NAME: &str = "content_quality";

/// Reply length (in characters) above which a draft scores 1.0.
const SUBSTANTIAL_REPLY_CHARS: usize = 50;

/// Heuristic draft quality.
///
/// `0.0` if the text mentions "error" (any case), `1.0` if it is longer
/// than 50 characters, otherwise `0.5`.
#[must_use]
pub fn quality_score(reply: &str) -> f64 {
    if reply.to_lowercase().contains("error") {
        0.0
    } else if reply.chars().count() > SUBSTANTIAL_REPLY_CHARS {
        1.0
    } else {
        0.5
    }
}

/// Drafting worker: writes and analyzes text in a single model call.
pub struct ContentSpecialistAgent {
    config: AgentConfig,
    system_prompt: String,
    sink: Arc<dyn ObservabilitySink>,
}

impl ContentSpecialistAgent {
    /// Creates the drafting agent.
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        system_prompt: String,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            config: config.clone(),
            system_prompt,
            sink,
        }
    }
}

#[async_trait]
impl Agent for ContentSpecialistAgent {
    fn name(&self) -> &'static str {
        Node::DraftingWorker.agent_name()
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

    async fn step(
        &self,
        provider: &dyn LlmProvider,
        state: &mut ConversationState,
        ctx: &RequestContext,
    ) -> Result<StepReport, AgentError> {
        let request = self.build_request(state, ctx);
        let response = provider.chat(&request).await?;

        let mut metadata = Map::new();
        metadata.insert("agent".to_string(), json!(self.name()));
        metadata.insert("model".to_string(), json!(request.model));
        self.sink.log_scored_exchange(
            &request.context,
            ScoredExchange {
                input: state.latest_user_text().to_string(),
                output: response.content.clone(),
                score: quality_score(&response.content),
                score_name: QUALITY_SCORE_NAME.to_string(),
                metadata,
            },
        );

        state.push(Turn::assistant(response.content));
        state.next = Some(Route::Supervisor);

        Ok(StepReport {
            agent: self.name(),
            model: request.model,
            usage: response.usage,
        })
    }
}
