//! Request-log ingestion sink (`POST {base}/request-logs/create/`).

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{ObservabilitySink, ScoredExchange};
use crate::agent::message::RequestContext;

/// Delivery timeout per log entry.
const LOG_TIMEOUT: Duration = Duration::from_secs(2);

/// Sink posting log entries to the gateway's request-log endpoint.
///
/// Each entry is sent from a spawned task so the caller never waits.
/// Tasks are tracked so [`ObservabilitySink::flush`] can drain them.
#[derive(Debug, Clone)]
pub struct KeywordsAiSink {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    pending: Arc<Mutex<JoinSet<()>>>,
}

impl KeywordsAiSink {
    /// Creates a sink for the given key and gateway base URL.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the HTTP client cannot be built.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(LOG_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/request-logs/create/", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            pending: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    fn send(&self, label: String, payload: Value) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(label, "no runtime, dropping log entry");
            return;
        };
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished deliveries so the set stays small in long-lived servers.
        while pending.try_join_next().is_some() {}
        pending.spawn_on(async move {
            let result = http
                .post(&endpoint)
                .bearer_auth(api_key)
                .json(&payload)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status);
            if let Err(e) = result {
                warn!(label, error = %e, "failed to deliver log entry");
            }
        }, &handle);
    }

    /// Number of deliveries not yet reaped.
    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Copies request identity into a log payload.
fn apply_context(payload: &mut Map<String, Value>, ctx: &RequestContext) {
    if let Some(customer) = &ctx.customer_id {
        payload.insert("customer_identifier".to_string(), json!(customer));
    }
    if let Some(thread) = &ctx.thread_id {
        payload.insert("thread_identifier".to_string(), json!(thread));
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Payload for a scored exchange.
pub(super) fn scored_payload(ctx: &RequestContext, exchange: &ScoredExchange) -> Value {
    let mut metadata = ctx.metadata.clone();
    metadata.extend(exchange.metadata.clone());
    metadata.insert(
        format!("score_{}", exchange.score_name),
        json!(exchange.score),
    );

    let mut payload = Map::new();
    payload.insert(
        "input".to_string(),
        json!(json!([{ "role": "user", "content": exchange.input }]).to_string()),
    );
    payload.insert(
        "output".to_string(),
        json!(json!({ "role": "assistant", "content": exchange.output }).to_string()),
    );
    payload.insert("log_type".to_string(), json!("chat"));
    payload.insert("positive_feedback".to_string(), json!(exchange.score >= 0.5));
    payload.insert("timestamp".to_string(), json!(timestamp()));
    payload.insert("metadata".to_string(), Value::Object(metadata));
    apply_context(&mut payload, ctx);
    Value::Object(payload)
}

/// Payload for a custom event.
pub(super) fn event_payload(ctx: &RequestContext, name: &str, extra: Map<String, Value>) -> Value {
    let mut metadata = ctx.metadata.clone();
    metadata.extend(extra);
    metadata.insert("event_name".to_string(), json!(name));
    if let Some(agent) = &ctx.agent {
        metadata.insert("agent".to_string(), json!(agent));
    }

    let mut payload = Map::new();
    payload.insert("log_type".to_string(), json!("custom_event"));
    payload.insert("status".to_string(), json!("success"));
    payload.insert(
        "input".to_string(),
        json!(json!([{ "role": "system", "content": name }]).to_string()),
    );
    payload.insert(
        "output".to_string(),
        json!(json!({ "role": "assistant", "content": "Event recorded" }).to_string()),
    );
    payload.insert("timestamp".to_string(), json!(timestamp()));
    payload.insert("metadata".to_string(), Value::Object(metadata));
    apply_context(&mut payload, ctx);
    Value::Object(payload)
}

#[async_trait]
impl ObservabilitySink for KeywordsAiSink {
    fn name(&self) -> &'static str {
        "keywordsai"
    }

    fn log_scored_exchange(&self, ctx: &RequestContext, exchange: ScoredExchange) {
        let label = format!("score_{}", exchange.score_name);
        self.send(label, scored_payload(ctx, &exchange));
    }

    fn log_event(&self, ctx: &RequestContext, name: &str, metadata: Map<String, Value>) {
        self.send(name.to_string(), event_payload(ctx, name, metadata));
    }

    async fn flush(&self, timeout: Duration) {
        let mut pending =
            std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        let drained = tokio::time::timeout(timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(remaining = pending.len(), "dropping undelivered log entries");
        }
    }
}
