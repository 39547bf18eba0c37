//! Parser for the supervisor's routing replies.
//!
//! The supervisor is asked for `{"next": "<token>"}` but models do not
//! always comply. Parsing has two tiers:
//!
//! 1. Strict JSON object (after stripping a code fence). A missing or
//!    unknown `next` value terminates.
//! 2. Case-insensitive keyword search for a worker name, else terminate.
//!
//! The same parser decides which assistant turns are routing chatter when
//! extracting the final reply for the caller.

use serde_json::Value;

use super::state::{Route, Turn};

/// Reply text returned when the transcript holds no user-facing answer.
pub const FALLBACK_REPLY: &str = "Process completed.";

/// How a routing decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// Parsed from a JSON object.
    Json,
    /// Found a worker name in free text.
    Keyword,
    /// Nothing recognizable; terminated.
    Default,
}

/// Resolved supervisor decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Where to go next. Always a worker or [`Route::Finish`].
    pub next: Route,
    /// How it was parsed.
    pub source: DecisionSource,
}

/// Strips a surrounding Markdown code fence and its language tag, in any
/// case (```` ```json ````, ```` ```JSON ````, ```` ``` ````).
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let tag_len = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    let rest = &inner[tag_len..];
    let inner = if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        rest
    } else {
        inner
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parses the reply as a JSON object. Non-objects count as unparseable.
fn parse_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fence(text)) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Restricts a token to the routes the supervisor may choose.
fn worker_or_finish(token: Option<&str>) -> Route {
    match token.and_then(Route::from_token) {
        Some(route @ (Route::CanvasExecutor | Route::ContentSpecialist)) => route,
        _ => Route::Finish,
    }
}

/// Resolves a supervisor reply into a routing decision.
#[must_use]
pub fn parse_routing(reply: &str) -> RoutingDecision {
    if let Some(map) = parse_object(reply) {
        return RoutingDecision {
            next: worker_or_finish(map.get("next").and_then(Value::as_str)),
            source: DecisionSource::Json,
        };
    }

    let lowered = reply.to_lowercase();
    let (next, source) = if lowered.contains("canvas_executor") {
        (Route::CanvasExecutor, DecisionSource::Keyword)
    } else if lowered.contains("content_specialist") {
        (Route::ContentSpecialist, DecisionSource::Keyword)
    } else {
        (Route::Finish, DecisionSource::Default)
    };
    RoutingDecision { next, source }
}

/// Whether the text is a JSON routing decision rather than a reply.
#[must_use]
pub fn is_routing_decision(text: &str) -> bool {
    parse_object(text).is_some_and(|map| map.contains_key("next"))
}

/// Picks the user-facing reply from a transcript.
///
/// Scans backward for the first assistant turn with non-empty text that is
/// not a routing decision; falls back to [`FALLBACK_REPLY`].
#[must_use]
pub fn extract_final_reply(messages: &[Turn]) -> String {
    messages
        .iter()
        .rev()
        .find_map(|turn| match turn {
            Turn::Assistant { text, .. }
                if !text.trim().is_empty() && !is_routing_decision(text) =>
            {
                Some(text.clone())
            }
            _ => None,
        })
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#"{"next": "Canvas_Executor"}"#, Route::CanvasExecutor, DecisionSource::Json ; "json executor")]
    #[test_case(r#"{"next": "Content_Specialist"}"#, Route::ContentSpecialist, DecisionSource::Json ; "json specialist")]
    #[test_case(r#"{"next": "FINISH"}"#, Route::Finish, DecisionSource::Json ; "json finish")]
    #[test_case("```json\n{ \"next\": \"Canvas_Executor\" }\n```", Route::CanvasExecutor, DecisionSource::Json ; "fenced json")]
    #[test_case("```JSON\n{\"next\": \"FINISH\"}\n```", Route::Finish, DecisionSource::Json ; "uppercase fence tag")]
    #[test_case(r#"{"next": "Librarian"}"#, Route::Finish, DecisionSource::Json ; "unknown token finishes")]
    #[test_case(r#"{"next": "supervisor"}"#, Route::Finish, DecisionSource::Json ; "supervisor token finishes")]
    #[test_case(r#"{"route": "Canvas_Executor"}"#, Route::Finish, DecisionSource::Json ; "missing key finishes")]
    #[test_case(r#"{"next": 3}"#, Route::Finish, DecisionSource::Json ; "non string token finishes")]
    #[test_case("Route to Canvas_Executor please", Route::CanvasExecutor, DecisionSource::Keyword ; "keyword executor")]
    #[test_case("I think content_specialist should draft it", Route::ContentSpecialist, DecisionSource::Keyword ; "keyword specialist")]
    #[test_case("Both CANVAS_EXECUTOR and Content_Specialist", Route::CanvasExecutor, DecisionSource::Keyword ; "executor keyword wins")]
    #[test_case(r#"["Canvas_Executor"]"#, Route::CanvasExecutor, DecisionSource::Keyword ; "non object json uses keywords")]
    #[test_case("All done here.", Route::Finish, DecisionSource::Default ; "no signal finishes")]
    #[test_case("", Route::Finish, DecisionSource::Default ; "empty finishes")]
    fn test_parse_routing(reply: &str, next: Route, source: DecisionSource) {
        assert_eq!(parse_routing(reply), RoutingDecision { next, source });
    }

    #[test_case("```json\n{\"a\":1}\n```", "{\"a\":1}")]
    #[test_case("```\n{\"a\":1}\n```", "{\"a\":1}")]
    #[test_case("```JSON\n{\"a\":1}\n```", "{\"a\":1}")]
    #[test_case("```Json {\"a\":1}```", "{\"a\":1}")]
    #[test_case("```{\"a\":1}```", "{\"a\":1}")]
    #[test_case("  plain  ", "plain")]
    fn test_strip_code_fence(input: &str, expected: &str) {
        assert_eq!(strip_code_fence(input), expected);
    }

    #[test]
    fn test_extract_final_reply_skips_routing_turns() {
        let messages = vec![
            Turn::user("hi"),
            Turn::assistant(r#"{"next":"Canvas_Executor"}"#),
            Turn::assistant("Here is your link"),
            Turn::assistant(r#"{"next":"FINISH"}"#),
        ];
        assert_eq!(extract_final_reply(&messages), "Here is your link");
    }

    #[test]
    fn test_extract_final_reply_skips_fenced_decision_and_empty_text() {
        let messages = vec![
            Turn::assistant("Announcement posted."),
            Turn::Assistant {
                text: String::new(),
                tool_calls: Vec::new(),
            },
            Turn::assistant("```json\n{\"next\": \"FINISH\"}\n```"),
        ];
        assert_eq!(extract_final_reply(&messages), "Announcement posted.");

        let messages = vec![
            Turn::assistant("Quiz 1 is due Monday."),
            Turn::assistant("```JSON\n{\"next\": \"FINISH\"}\n```"),
        ];
        assert_eq!(extract_final_reply(&messages), "Quiz 1 is due Monday.");
    }

    #[test]
    fn test_extract_final_reply_keeps_other_json_replies() {
        let messages = vec![Turn::assistant(r#"{"id": 42, "name": "Quiz 1"}"#)];
        assert_eq!(extract_final_reply(&messages), r#"{"id": 42, "name": "Quiz 1"}"#);
    }

    #[test]
    fn test_extract_final_reply_fallback() {
        let messages = vec![Turn::user("hi"), Turn::assistant(r#"{"next":"FINISH"}"#)];
        assert_eq!(extract_final_reply(&messages), FALLBACK_REPLY);
        assert_eq!(extract_final_reply(&[]), FALLBACK_REPLY);
    }
}
