//! Test doubles for the provider, tool backend and observability seams.

#![allow(clippy::panic)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::message::{ChatRequest, ChatResponse, RequestContext, TokenUsage};
use super::provider::LlmProvider;
use super::executor::ToolBackend;
use super::tool::ToolCall;
use crate::error::{AgentError, ToolError};
use crate::observability::{ObservabilitySink, ScoredExchange};

/// Provider that replays a fixed list of responses and records requests.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ChatResponse, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    /// Creates a provider that will answer with `replies` in order.
    pub fn new(replies: Vec<ChatResponse>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Appends a failing reply.
    pub fn then_fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(Err(message.to_string()));
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Plain text response.
pub fn text(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
        tool_calls: Vec::new(),
        finish_reason: Some("stop".to_string()),
    }
}

/// Response requesting one tool call.
pub fn tool_call(id: &str, name: &str, arguments: &str) -> ChatResponse {
    ChatResponse {
        content: String::new(),
        usage: TokenUsage::default(),
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }],
        finish_reason: Some("tool_calls".to_string()),
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        let next = self
            .replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(AgentError::ApiRequest {
                message,
                status: Some(500),
            }),
            None => panic!("scripted provider ran out of replies"),
        }
    }
}

/// Tool backend returning a fixed reply or failure and recording calls.
pub struct MockBackend {
    reply: Result<String, String>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockBackend {
    /// Backend that answers every call with `reply`.
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Backend that fails every call with a remote error.
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(remote tool, arguments)` pairs received so far.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ToolBackend for MockBackend {
    async fn call(&self, tool: &str, arguments: Value) -> Result<String, ToolError> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((tool.to_string(), arguments));
        self.reply.clone().map_err(|message| ToolError::Remote { message })
    }
}

/// Sink that records everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(RequestContext, String)>>,
    scores: Mutex<Vec<(RequestContext, ScoredExchange)>>,
    flushes: AtomicUsize,
}

impl RecordingSink {
    /// Event names in arrival order.
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Scored exchanges with the context they were logged under.
    pub fn scores(&self) -> Vec<(RequestContext, ScoredExchange)> {
        self.scores
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of `flush` calls.
    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObservabilitySink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn log_scored_exchange(&self, ctx: &RequestContext, exchange: ScoredExchange) {
        self.scores
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((ctx.clone(), exchange));
    }

    fn log_event(&self, ctx: &RequestContext, name: &str, _metadata: Map<String, Value>) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((ctx.clone(), name.to_string()));
    }

    async fn flush(&self, _timeout: Duration) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}
