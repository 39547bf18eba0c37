//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default gateway endpoint (`OpenAI`-compatible, with request logging).
pub const DEFAULT_BASE_URL: &str = "https://api.keywordsai.co/api/";
/// Default model for the fast tier.
const DEFAULT_FAST_MODEL: &str = "gpt-4o-mini";
/// Default model for the capable tier.
const DEFAULT_CAPABLE_MODEL: &str = "gpt-4o";
/// Default max tokens per completion.
const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default maximum tool-calling loop iterations.
const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;
/// Default cap on node executions per run.
const DEFAULT_MAX_HOPS: usize = 25;
/// Default gateway semantic-cache TTL.
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
/// Default source tag sent to the gateway.
const DEFAULT_SOURCE_TAG: &str = "CanvasAI-MultiAgent";
/// Default command for the Canvas MCP tool server.
pub const DEFAULT_MCP_COMMAND: &str =
    "docker run --rm -i --env-file .env canvas-lms-agent-mcp-canvas-lms";

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the gateway.
    pub api_key: String,
    /// Gateway base URL.
    pub base_url: String,
    /// Model used for the fast tier (and always by the supervisor).
    pub fast_model: String,
    /// Model used for the capable tier.
    pub capable_model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum tool-calling loop iterations inside the Canvas executor.
    pub max_tool_iterations: usize,
    /// Maximum node executions per run before forcing termination.
    pub max_hops: usize,
    /// Directory containing prompt template files.
    ///
    /// Missing files fall back to compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
    /// `X-Keywords-Source` header value.
    pub source_tag: String,
    /// `X-Keywords-Cache-TTL` header value in seconds.
    pub cache_ttl_secs: u64,
    /// API key for request-log ingestion. `None` disables the sink.
    pub observability_api_key: Option<String>,
    /// Command line that starts the Canvas MCP server.
    pub mcp_command: String,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Splits [`Self::mcp_command`] into program and arguments.
    #[must_use]
    pub fn mcp_command_parts(&self) -> Vec<String> {
        self.mcp_command
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    fast_model: Option<String>,
    capable_model: Option<String>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_tool_iterations: Option<usize>,
    max_hops: Option<usize>,
    prompt_dir: Option<PathBuf>,
    source_tag: Option<String>,
    cache_ttl_secs: Option<u64>,
    observability_api_key: Option<String>,
    mcp_command: Option<String>,
}

/// Reads an environment variable and parses it.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("CANVAS_AGENT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("KEYWORDSAI_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("KEYWORDSAI_BASE_URL")
                .or_else(|_| std::env::var("OPENAI_BASE_URL"))
                .ok();
        }
        if self.fast_model.is_none() {
            self.fast_model = std::env::var("CANVAS_AGENT_FAST_MODEL").ok();
        }
        if self.capable_model.is_none() {
            self.capable_model = std::env::var("CANVAS_AGENT_CAPABLE_MODEL").ok();
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("CANVAS_AGENT_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.max_tool_iterations.is_none() {
            self.max_tool_iterations = env_parse("CANVAS_AGENT_MAX_TOOL_ITERATIONS");
        }
        if self.max_hops.is_none() {
            self.max_hops = env_parse("CANVAS_AGENT_MAX_HOPS");
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("CANVAS_AGENT_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        if self.observability_api_key.is_none() {
            self.observability_api_key = std::env::var("KEYWORDSAI_API_KEY").ok();
        }
        if self.mcp_command.is_none() {
            self.mcp_command = std::env::var("CANVAS_MCP_COMMAND").ok();
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the fast-tier model.
    #[must_use]
    pub fn fast_model(mut self, model: impl Into<String>) -> Self {
        self.fast_model = Some(model.into());
        self
    }

    /// Sets the capable-tier model.
    #[must_use]
    pub fn capable_model(mut self, model: impl Into<String>) -> Self {
        self.capable_model = Some(model.into());
        self
    }

    /// Sets the max tokens per completion.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the maximum tool-calling loop iterations.
    #[must_use]
    pub const fn max_tool_iterations(mut self, n: usize) -> Self {
        self.max_tool_iterations = Some(n);
        self
    }

    /// Sets the per-run node execution cap.
    #[must_use]
    pub const fn max_hops(mut self, n: usize) -> Self {
        self.max_hops = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Sets the gateway source tag.
    #[must_use]
    pub fn source_tag(mut self, tag: impl Into<String>) -> Self {
        self.source_tag = Some(tag.into());
        self
    }

    /// Sets the gateway cache TTL.
    #[must_use]
    pub const fn cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = Some(secs);
        self
    }

    /// Sets the request-log ingestion key.
    #[must_use]
    pub fn observability_api_key(mut self, key: impl Into<String>) -> Self {
        self.observability_api_key = Some(key.into());
        self
    }

    /// Sets the Canvas MCP server command line.
    #[must_use]
    pub fn mcp_command(mut self, command: impl Into<String>) -> Self {
        self.mcp_command = Some(command.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::Config`] for a zero hop or iteration limit.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        let max_hops = self.max_hops.unwrap_or(DEFAULT_MAX_HOPS);
        if max_hops == 0 {
            return Err(AgentError::Config {
                message: "max_hops must be at least 1".to_string(),
            });
        }
        let max_tool_iterations = self
            .max_tool_iterations
            .unwrap_or(DEFAULT_MAX_TOOL_ITERATIONS);
        if max_tool_iterations == 0 {
            return Err(AgentError::Config {
                message: "max_tool_iterations must be at least 1".to_string(),
            });
        }

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            fast_model: self
                .fast_model
                .unwrap_or_else(|| DEFAULT_FAST_MODEL.to_string()),
            capable_model: self
                .capable_model
                .unwrap_or_else(|| DEFAULT_CAPABLE_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_tool_iterations,
            max_hops,
            prompt_dir: self.prompt_dir,
            source_tag: self
                .source_tag
                .unwrap_or_else(|| DEFAULT_SOURCE_TAG.to_string()),
            cache_ttl_secs: self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
            observability_api_key: self.observability_api_key,
            mcp_command: self
                .mcp_command
                .unwrap_or_else(|| DEFAULT_MCP_COMMAND.to_string()),
        })
    }
}
