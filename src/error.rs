//! Error types for canvas-agent.
//!
//! Each layer owns a `thiserror` enum; [`Error`] is the top-level type
//! returned by CLI commands and converts from every layer.

use thiserror::Error;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    /// Agent or orchestration failure.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// Tool backend failure.
    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    /// Checkpoint persistence failure.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// CLI command failure.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by agents, providers and the orchestrator.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No API key was configured.
    #[error("API key missing: set KEYWORDSAI_API_KEY or OPENAI_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is unknown.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name that was requested.
        name: String,
    },

    /// The model endpoint rejected or failed the request.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The model response could not be interpreted.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
    },

    /// The tool-calling loop ran out of iterations.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured iteration limit.
        max_iterations: usize,
    },

    /// Invalid configuration value.
    #[error("configuration error: {message}")]
    Config {
        /// What went wrong.
        message: String,
    },

    /// Orchestration-level failure (bad input, nothing to resume).
    #[error("orchestration error: {message}")]
    Orchestration {
        /// What went wrong.
        message: String,
    },
}

/// Errors raised while invoking a remote or local tool.
///
/// These never escape the tool executor: they are rendered into
/// `"Error executing <name>: ..."` result text.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool name is not in the catalogue.
    #[error("unknown tool: '{name}'")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// Arguments were malformed or failed validation.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments {
        /// Tool name.
        tool: String,
        /// Validation failure.
        reason: String,
    },

    /// The tool server process could not be started.
    #[error("failed to spawn tool server '{command}': {reason}")]
    Spawn {
        /// Command line that was executed.
        command: String,
        /// Spawn failure.
        reason: String,
    },

    /// The tool server handshake failed.
    #[error("tool server initialization failed: {reason}")]
    Initialize {
        /// Handshake failure.
        reason: String,
    },

    /// JSON-RPC transport failure (I/O, closed pipe, malformed frame).
    #[error("transport error: {reason}")]
    Transport {
        /// Transport failure.
        reason: String,
    },

    /// The tool server returned a JSON-RPC error.
    #[error("server error [{code}]: {message}")]
    Server {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
    },

    /// The tool ran but reported a failure.
    #[error("{message}")]
    Remote {
        /// Failure text reported by the tool.
        message: String,
    },

    /// The call did not complete in time.
    #[error("tool call '{tool}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Tool name.
        tool: String,
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The operation exists in the catalogue but has no backend.
    #[error("'{tool}' is not supported by the backend")]
    Unsupported {
        /// Tool name.
        tool: String,
    },

    /// Local file access failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by checkpoint persistence.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// `SQLite` failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// State could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while preparing the database.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A previous holder of the connection lock panicked.
    #[error("checkpoint store lock poisoned")]
    LockPoisoned,

    /// The blocking task running a query panicked or was cancelled.
    #[error("checkpoint task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// CLI command errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command could not be completed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Invalid command-line argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be rendered.
    #[error("output format error: {0}")]
    OutputFormat(String),
}
