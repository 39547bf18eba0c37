//! Conversation state shared by every node of the orchestration graph.
//!
//! A [`ConversationState`] is the unit that is checkpointed per thread.
//! Its `next` field doubles as the program counter: the node to run next
//! is always `Node::from_route(state.next)`.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::{
    ChatMessage, assistant_message, assistant_tool_calls_message, tool_message, user_message,
};
use super::tool::ToolCall;

/// Number of trailing turns every node sends to the model.
pub const CONTEXT_WINDOW: usize = 5;

/// Routing token stored in [`ConversationState::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    /// Hand off to the Canvas executor (tool-using action worker).
    #[serde(rename = "Canvas_Executor")]
    CanvasExecutor,
    /// Hand off to the content specialist (drafting worker).
    #[serde(rename = "Content_Specialist")]
    ContentSpecialist,
    /// Return to the supervisor.
    #[serde(rename = "supervisor")]
    Supervisor,
    /// Terminate the run.
    #[serde(rename = "FINISH")]
    Finish,
}

impl Route {
    /// Wire token for this route.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CanvasExecutor => "Canvas_Executor",
            Self::ContentSpecialist => "Content_Specialist",
            Self::Supervisor => "supervisor",
            Self::Finish => "FINISH",
        }
    }

    /// Parses a wire token, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        [
            Self::CanvasExecutor,
            Self::ContentSpecialist,
            Self::Supervisor,
            Self::Finish,
        ]
        .into_iter()
        .find(|route| route.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nodes of the orchestration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// Routing node.
    Supervisor,
    /// Canvas executor.
    ActionWorker,
    /// Content specialist.
    DraftingWorker,
    /// Terminal node.
    Finish,
}

impl Node {
    /// Maps a routing token to the node it selects.
    ///
    /// Total over every token: an unset token starts at the supervisor.
    #[must_use]
    pub const fn from_route(route: Option<Route>) -> Self {
        match route {
            None | Some(Route::Supervisor) => Self::Supervisor,
            Some(Route::CanvasExecutor) => Self::ActionWorker,
            Some(Route::ContentSpecialist) => Self::DraftingWorker,
            Some(Route::Finish) => Self::Finish,
        }
    }

    /// Agent name used for logs and gateway attribution.
    #[must_use]
    pub const fn agent_name(self) -> &'static str {
        match self {
            Self::Supervisor => "Supervisor",
            Self::ActionWorker => "Canvas_Executor",
            Self::DraftingWorker => "Content_Specialist",
            Self::Finish => "FINISH",
        }
    }
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// Input from the end user.
    User {
        /// Message text.
        text: String,
    },
    /// Output from any agent: a reply, a routing decision, or a tool request.
    Assistant {
        /// Message text (may be empty when `tool_calls` is set).
        text: String,
        /// Tool calls requested in this turn.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    /// Output of one tool call.
    ToolResult {
        /// Call this result answers.
        tool_call_id: String,
        /// Tool that produced it.
        name: String,
        /// Result text.
        text: String,
    },
}

impl Turn {
    /// Creates a user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    /// Creates an assistant turn without tool calls.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Text carried by the turn.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::User { text } | Self::Assistant { text, .. } | Self::ToolResult { text, .. } => {
                text
            }
        }
    }

    /// Short role label for display.
    #[must_use]
    pub const fn role(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::ToolResult { .. } => "tool",
        }
    }
}

/// Per-thread conversation state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Append-only transcript.
    pub messages: Vec<Turn>,
    /// Most recent routing token.
    #[serde(default)]
    pub next: Option<Route>,
}

impl ConversationState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn.
    pub fn push(&mut self, turn: Turn) {
        self.messages.push(turn);
    }

    /// Text of the most recent user turn, or `""` when there is none.
    #[must_use]
    pub fn latest_user_text(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find_map(|turn| match turn {
                Turn::User { text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or("")
    }

    /// The trailing [`CONTEXT_WINDOW`] turns.
    #[must_use]
    pub fn window(&self) -> &[Turn] {
        context_window(&self.messages, CONTEXT_WINDOW)
    }

    /// Whether a run is pending, i.e. the next node is not terminal.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !matches!(self.next, None | Some(Route::Finish))
    }
}

/// Returns the last `size` turns, oldest first.
#[must_use]
pub fn context_window(messages: &[Turn], size: usize) -> &[Turn] {
    &messages[messages.len().saturating_sub(size)..]
}

/// Converts a transcript window into chat messages.
///
/// Truncation can cut an assistant tool-call turn away from its results.
/// Chat APIs reject unmatched tool messages, so orphaned results are sent
/// as assistant text and tool calls without results are dropped.
#[must_use]
pub fn to_chat_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    let answered: HashSet<&str> = turns
        .iter()
        .filter_map(|turn| match turn {
            Turn::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
            _ => None,
        })
        .collect();

    let mut requested: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(turns.len());

    for turn in turns {
        match turn {
            Turn::User { text } => out.push(user_message(text)),
            Turn::Assistant { text, tool_calls } => {
                let calls: Vec<ToolCall> = tool_calls
                    .iter()
                    .filter(|call| answered.contains(call.id.as_str()))
                    .cloned()
                    .collect();
                if calls.is_empty() {
                    if !text.is_empty() {
                        out.push(assistant_message(text));
                    }
                } else {
                    for call in tool_calls {
                        requested.insert(call.id.as_str());
                    }
                    out.push(assistant_tool_calls_message(text, calls));
                }
            }
            Turn::ToolResult {
                tool_call_id,
                name,
                text,
            } => {
                if requested.contains(tool_call_id.as_str()) {
                    out.push(tool_message(tool_call_id, text));
                } else {
                    out.push(assistant_message(&format!("[{name} result]\n{text}")));
                }
            }
        }
    }

    out
}
