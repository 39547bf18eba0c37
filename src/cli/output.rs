//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::Serialize;

use crate::agent::state::{ConversationState, Turn};
use crate::canvas::catalog::{Backend, CanvasTool};
use crate::checkpoint::ThreadSummary;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One compact JSON document per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name. Unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes a value for the JSON formats.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

/// Formats the stored thread list.
#[must_use]
pub fn format_thread_list(threads: &[ThreadSummary], format: OutputFormat) -> String {
    if format != OutputFormat::Text {
        return format.to_json(threads);
    }
    if threads.is_empty() {
        return "No threads.\n".to_string();
    }

    let mut out = format!(
        "{:<24} {:<20} {:>6} {:>6}  {}\n",
        "THREAD", "NEXT", "TURNS", "STEPS", "UPDATED"
    );
    for t in threads {
        let _ = writeln!(
            out,
            "{:<24} {:<20} {:>6} {:>6}  {}",
            t.thread_id,
            t.next.map_or("-", |r| r.as_str()),
            t.turn_count,
            t.step,
            t.updated_at
        );
    }
    out
}

/// Formats one thread's transcript.
#[must_use]
pub fn format_transcript(thread_id: &str, state: &ConversationState, format: OutputFormat) -> String {
    if format != OutputFormat::Text {
        return format.to_json(&serde_json::json!({
            "thread_id": thread_id,
            "next": state.next,
            "pending": state.is_pending(),
            "messages": state.messages,
        }));
    }

    let mut out = format!(
        "Thread: {thread_id}\nNext: {}\nTurns: {}\n\n",
        state.next.map_or("-", |r| r.as_str()),
        state.messages.len()
    );
    for turn in &state.messages {
        match turn {
            Turn::Assistant { text, tool_calls } if !tool_calls.is_empty() => {
                let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
                let _ = writeln!(out, "[assistant] calls: {}", names.join(", "));
                if !text.is_empty() {
                    let _ = writeln!(out, "  {text}");
                }
            }
            Turn::ToolResult { name, text, .. } => {
                let _ = writeln!(out, "[tool:{name}] {}", truncate(text, 200));
            }
            other => {
                let _ = writeln!(out, "[{}] {}", other.role(), other.text());
            }
        }
    }
    out
}

/// Formats the Canvas tool catalogue.
#[must_use]
pub fn format_tool_list(tools: &[CanvasTool], format: OutputFormat) -> String {
    if format != OutputFormat::Text {
        let entries: Vec<_> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "backend": backend_label(t.backend),
                    "description": t.description,
                    "parameters": t.definition().parameters,
                })
            })
            .collect();
        return format.to_json(&entries);
    }

    let mut out = format!("{} Canvas tools\n\n", tools.len());
    for t in tools {
        let _ = writeln!(out, "{:<36} {}", t.name, backend_label(t.backend));
        let _ = writeln!(out, "    {}", truncate(t.description, 100));
    }
    out
}

fn backend_label(backend: Backend) -> String {
    match backend {
        Backend::Remote(remote) => format!("mcp:{remote}"),
        Backend::LocalFile => "local".to_string(),
        Backend::Unsupported => "unsupported".to_string(),
    }
}

/// Truncates to `max_chars` characters, appending `...` when cut.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{cut}...")
}
