//! Best-effort observability sink.
//!
//! Agents and the tool executor report scored exchanges and business
//! events here. Implementations must never fail into the caller and must
//! not block the run: delivery problems are logged with `warn!` and dropped.

mod keywords;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::agent::config::AgentConfig;
use crate::agent::message::RequestContext;

pub use keywords::KeywordsAiSink;

/// An input/output pair with a heuristic quality score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredExchange {
    /// Model or agent input.
    pub input: String,
    /// Produced output.
    pub output: String,
    /// Score in `[0.0, 1.0]`.
    pub score: f64,
    /// Metric name (e.g. `"content_quality"`).
    pub score_name: String,
    /// Extra attributes.
    pub metadata: Map<String, Value>,
}

/// Receiver for scores and events.
#[async_trait]
pub trait ObservabilitySink: Send + Sync {
    /// Sink name for logs.
    fn name(&self) -> &'static str;

    /// Records a scored exchange.
    fn log_scored_exchange(&self, ctx: &RequestContext, exchange: ScoredExchange);

    /// Records a named event.
    fn log_event(&self, ctx: &RequestContext, name: &str, metadata: Map<String, Value>);

    /// Waits up to `timeout` for deliveries still in flight. Short-lived
    /// callers use this before shutting their runtime down.
    async fn flush(&self, _timeout: Duration) {}
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ObservabilitySink for NoopSink {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn log_scored_exchange(&self, _ctx: &RequestContext, _exchange: ScoredExchange) {}

    fn log_event(&self, _ctx: &RequestContext, _name: &str, _metadata: Map<String, Value>) {}
}

/// Picks the sink for a configuration: request-log ingestion when a key
/// is configured, otherwise [`NoopSink`].
#[must_use]
pub fn create_sink(config: &AgentConfig) -> Arc<dyn ObservabilitySink> {
    match config.observability_api_key.as_deref() {
        Some(key) if !key.is_empty() => match KeywordsAiSink::new(key, &config.base_url) {
            Ok(sink) => Arc::new(sink),
            Err(e) => {
                tracing::warn!(error = %e, "observability sink disabled");
                Arc::new(NoopSink)
            }
        },
        _ => Arc::new(NoopSink),
    }
}
