//! Heuristic model-tier selection.
//!
//! Classifies a user request as fast (functional, lookup-style) or capable
//! (reasoning, drafting). Simple-action phrases are checked first, so a
//! request that mixes both kinds stays on the fast tier.

use std::fmt;

use serde::Serialize;

use super::config::AgentConfig;

/// Phrases marking a functional request.
pub const SIMPLE_KEYWORDS: &[&str] = &[
    "list",
    "get",
    "show",
    "what is",
    "when is",
    "update",
    "change",
    "delete",
    "remove",
    "set date",
    "create assignment",
    "create quiz",
];

/// Phrases marking a request that needs reasoning or long-form writing.
pub const COMPLEX_KEYWORDS: &[&str] = &[
    "analyze",
    "reason",
    "explain",
    "compare",
    "evaluate",
    "critique",
    "draft",
    "compose",
    "write a",
    "essay",
    "comprehensive",
    "syllabus",
    "curriculum",
    "strategy",
    "intervention",
    "why",
];

/// Word count above which an otherwise neutral request is treated as complex.
pub const LONG_INPUT_WORDS: usize = 50;

/// Cost/capability selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheap, low-latency model.
    Fast,
    /// Stronger model for reasoning and drafting.
    Capable,
}

impl ModelTier {
    /// Model identifier configured for this tier.
    #[must_use]
    pub fn model(self, config: &AgentConfig) -> &str {
        match self {
            Self::Fast => &config.fast_model,
            Self::Capable => &config.capable_model,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fast => "fast",
            Self::Capable => "capable",
        })
    }
}

/// Classifies request text. Total and pure.
#[must_use]
pub fn classify(text: &str) -> ModelTier {
    if text.is_empty() {
        return ModelTier::Fast;
    }

    let lowered = text.to_lowercase();

    if SIMPLE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return ModelTier::Fast;
    }
    if COMPLEX_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return ModelTier::Capable;
    }
    if lowered.split_whitespace().count() > LONG_INPUT_WORDS {
        return ModelTier::Capable;
    }

    ModelTier::Fast
}
