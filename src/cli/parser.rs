//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// canvas-agent: supervisor/worker assistant for Canvas LMS.
///
/// Routes each message through a supervisor model to a Canvas executor
/// (tool calls against the Canvas MCP server) or a content specialist
/// (drafting), with per-thread conversation checkpoints.
#[derive(Parser, Debug)]
#[command(name = "canvas-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the checkpoint database file.
    ///
    /// Defaults to `.canvas-agent/checkpoints.db` in the current directory.
    #[arg(short, long, env = "CANVAS_AGENT_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one message to a conversation thread and print the reply.
    ///
    /// Requires `KEYWORDSAI_API_KEY` (or `OPENAI_API_KEY`). Canvas
    /// operations are forwarded to the MCP server started by
    /// `CANVAS_MCP_COMMAND`.
    #[command(after_help = r#"Examples:
  canvas-agent chat "List my courses"
  canvas-agent chat "Draft a welcome announcement" --thread-id fall-101
  canvas-agent chat "Grade summary for course 12" --customer-id prof-7 --meta dept=history
  canvas-agent --format json chat "What is due this week?" | jq .reply
"#)]
    Chat {
        /// The user message.
        message: String,

        /// Conversation thread identifier.
        #[arg(short, long, default_value = "demo-1")]
        thread_id: String,

        /// End-user identifier for gateway analytics.
        #[arg(short, long)]
        customer_id: Option<String>,

        /// Request metadata as key=value (repeatable).
        #[arg(short, long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Interactive chat loop on one thread (`quit` or `exit` to stop).
    Repl {
        /// Conversation thread identifier.
        #[arg(short, long, default_value = "demo-1")]
        thread_id: String,

        /// End-user identifier for gateway analytics.
        #[arg(short, long)]
        customer_id: Option<String>,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Continue a thread whose last run stopped before finishing.
    #[command(after_help = r#"Examples:
  canvas-agent threads list              # NEXT column shows unfinished runs
  canvas-agent resume --thread-id demo-1
"#)]
    Resume {
        /// Conversation thread identifier.
        #[arg(short, long)]
        thread_id: String,

        /// End-user identifier for gateway analytics.
        #[arg(short, long)]
        customer_id: Option<String>,
    },

    /// Stored conversation threads (list, show, delete).
    #[command(subcommand)]
    Threads(ThreadCommands),

    /// Show which model tier a message would be routed to.
    #[command(after_help = r#"Examples:
  canvas-agent classify "list my courses"             # fast
  canvas-agent classify "draft a syllabus for ENG 101"  # capable
"#)]
    Classify {
        /// Message text to classify.
        text: String,
    },

    /// List the Canvas tool catalogue.
    Tools,

    /// Write default prompt templates to disk for customization.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  canvas-agent init-prompts                 # Write to ~/.config/canvas-agent/prompts/
  canvas-agent init-prompts ./my-prompts    # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory. Defaults to `~/.config/canvas-agent/prompts/`.
        dir: Option<PathBuf>,
    },

    /// Start MCP (Model Context Protocol) server.
    #[cfg(feature = "mcp")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// Thread subcommands.
#[derive(Subcommand, Debug)]
pub enum ThreadCommands {
    /// List stored threads, most recently updated first.
    #[command(alias = "ls")]
    List,

    /// Print a thread's transcript.
    Show {
        /// Thread identifier.
        thread_id: String,
    },

    /// Delete a thread's checkpoint.
    #[command(alias = "rm")]
    Delete {
        /// Thread identifier.
        thread_id: String,
    },
}

/// MCP server transport subcommands.
#[cfg(feature = "mcp")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Serve over stdin/stdout.
    #[command(after_help = r#"Examples:
  canvas-agent mcp stdio
"#)]
    Stdio,

    /// Serve over HTTP using streamable HTTP transport.
    #[command(after_help = r#"Examples:
  canvas-agent mcp sse                            # Listen on 127.0.0.1:3000
  canvas-agent mcp sse --host 0.0.0.0 --port 8080
"#)]
    Sse {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000")]
        port: u16,
    },
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::checkpoint::DEFAULT_DB_PATH))
    }
}
