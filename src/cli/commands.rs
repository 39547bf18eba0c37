//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Async work runs on
//! a tokio runtime created per command.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::format_push_string)]

use std::io::{self, BufRead, Write as IoWrite};
use std::path::{Path, PathBuf};
#[cfg(feature = "mcp")]
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::agent::config::AgentConfig;
use crate::agent::orchestrator::{Orchestrator, RequestMetadata, RunOutcome};
use crate::agent::prompt::PromptSet;
use crate::agent::tier::classify;
use crate::canvas::CATALOG;
use crate::checkpoint::{Checkpointer, SqliteCheckpointer, open_checkpointer};
use crate::cli::output::{OutputFormat, format_thread_list, format_tool_list, format_transcript};
#[cfg(feature = "mcp")]
use crate::cli::parser::McpCommands;
use crate::cli::parser::{Cli, Commands, ThreadCommands};
use crate::error::{CommandError, Result};

// ==================== Parameter Structs ====================

/// Parameters for the chat command.
#[derive(Debug, Clone)]
pub struct ChatParams<'a> {
    /// User message.
    pub message: &'a str,
    /// Thread identifier.
    pub thread_id: &'a str,
    /// Customer identifier.
    pub customer_id: Option<&'a str>,
    /// Raw `key=value` metadata pairs.
    pub meta: &'a [String],
    /// Prompt template directory override.
    pub prompt_dir: Option<&'a Path>,
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Chat {
            message,
            thread_id,
            customer_id,
            meta,
            prompt_dir,
        } => {
            let params = ChatParams {
                message,
                thread_id,
                customer_id: customer_id.as_deref(),
                meta,
                prompt_dir: prompt_dir.as_deref(),
            };
            cmd_chat(&db_path, &params, format)
        }
        Commands::Repl {
            thread_id,
            customer_id,
            prompt_dir,
        } => cmd_repl(
            &db_path,
            thread_id,
            customer_id.as_deref(),
            prompt_dir.as_deref(),
        ),
        Commands::Resume {
            thread_id,
            customer_id,
        } => cmd_resume(&db_path, thread_id, customer_id.as_deref(), format),
        Commands::Threads(sub) => execute_threads(sub, &db_path, format),
        Commands::Classify { text } => cmd_classify(text, format),
        Commands::Tools => Ok(format_tool_list(CATALOG, format)),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        #[cfg(feature = "mcp")]
        Commands::Mcp(sub) => cmd_mcp(sub, &db_path),
    }
}

fn execute_threads(cmd: &ThreadCommands, db_path: &Path, format: OutputFormat) -> Result<String> {
    let store = SqliteCheckpointer::open(db_path)?;
    let rt = runtime()?;

    match cmd {
        ThreadCommands::List => {
            let threads = rt.block_on(store.list_threads())?;
            Ok(format_thread_list(&threads, format))
        }
        ThreadCommands::Show { thread_id } => {
            let state = rt.block_on(store.load(thread_id))?.ok_or_else(|| {
                CommandError::ExecutionFailed(format!("Thread not found: {thread_id}"))
            })?;
            Ok(format_transcript(thread_id, &state, format))
        }
        ThreadCommands::Delete { thread_id } => {
            let removed = rt.block_on(store.delete(thread_id))?;
            if !removed {
                return Err(
                    CommandError::ExecutionFailed(format!("Thread not found: {thread_id}")).into(),
                );
            }
            match format {
                OutputFormat::Text => Ok(format!("Deleted thread: {thread_id}\n")),
                OutputFormat::Json | OutputFormat::Ndjson => Ok(format.to_json(
                    &serde_json::json!({ "deleted": thread_id, "success": true }),
                )),
            }
        }
    }
}

// ==================== Helpers ====================

/// How long a command waits for request-log deliveries before exiting.
const SINK_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

/// Creates the tokio runtime used as the sync/async bridge.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Parses repeated `key=value` arguments into a metadata map.
fn parse_meta(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            CommandError::InvalidArgument(format!("metadata must be KEY=VALUE, got '{pair}'"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(
                CommandError::InvalidArgument(format!("metadata key is empty in '{pair}'")).into(),
            );
        }
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    Ok(map)
}

/// Builds the agent configuration from env plus CLI overrides.
fn agent_config(prompt_dir: Option<&Path>) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder().from_env();
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

fn build_orchestrator(db_path: &Path, prompt_dir: Option<&Path>) -> Result<Orchestrator> {
    let config = agent_config(prompt_dir)?;
    let checkpointer = open_checkpointer(db_path);
    Orchestrator::from_config(&config, checkpointer).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}")).into()
    })
}

fn format_run(outcome: &RunOutcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut output = outcome.reply.clone();
            output.push_str(&format!(
                "\n\n---\nThread: {} | Hops: {} | Tokens: {} | Time: {:.1}s",
                outcome.thread_id,
                outcome.hops,
                outcome.usage.total_tokens,
                Duration::from_millis(outcome.elapsed_ms).as_secs_f64()
            ));
            if outcome.hop_limit_reached {
                output.push_str("\nWarning: hop limit reached, run was cut short");
            }
            if !outcome.persisted {
                output.push_str("\nWarning: conversation state was not saved");
            }
            output.push('\n');
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let rendered = if format == OutputFormat::Json {
                serde_json::to_string_pretty(outcome)
            } else {
                serde_json::to_string(outcome)
            };
            rendered.map_err(|e| {
                CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into()
            })
        }
    }
}

// ==================== Command Implementations ====================

fn cmd_chat(db_path: &Path, params: &ChatParams<'_>, format: OutputFormat) -> Result<String> {
    let request = RequestMetadata {
        customer_id: params.customer_id.map(str::to_string),
        metadata: parse_meta(params.meta)?,
    };
    let orchestrator = build_orchestrator(db_path, params.prompt_dir)?;
    let rt = runtime()?;

    let outcome = rt.block_on(async {
        let result = orchestrator
            .run(params.thread_id, params.message, request)
            .await;
        orchestrator.flush_observability(SINK_FLUSH_TIMEOUT).await;
        result
    });
    let outcome =
        outcome.map_err(|e| CommandError::ExecutionFailed(format!("Chat failed: {e}")))?;

    format_run(&outcome, format)
}

fn cmd_resume(
    db_path: &Path,
    thread_id: &str,
    customer_id: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let request = RequestMetadata {
        customer_id: customer_id.map(str::to_string),
        metadata: Map::new(),
    };
    let orchestrator = build_orchestrator(db_path, None)?;
    let rt = runtime()?;

    let outcome = rt.block_on(async {
        let result = orchestrator.resume(thread_id, request).await;
        orchestrator.flush_observability(SINK_FLUSH_TIMEOUT).await;
        result
    });
    let outcome =
        outcome.map_err(|e| CommandError::ExecutionFailed(format!("Resume failed: {e}")))?;

    format_run(&outcome, format)
}

/// Interactive loop. Writes directly to stdout and returns no output.
#[allow(clippy::print_stdout)]
fn cmd_repl(
    db_path: &Path,
    thread_id: &str,
    customer_id: Option<&str>,
    prompt_dir: Option<&Path>,
) -> Result<String> {
    let orchestrator = build_orchestrator(db_path, prompt_dir)?;
    let rt = runtime()?;

    println!("canvas-agent REPL on thread '{thread_id}'. Type 'quit' or 'exit' to stop.");
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("\nYou: ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message.to_ascii_lowercase().as_str(), "quit" | "exit") {
            break;
        }

        let request = RequestMetadata {
            customer_id: customer_id.map(str::to_string),
            metadata: Map::new(),
        };
        match rt.block_on(orchestrator.run(thread_id, message, request)) {
            Ok(outcome) => println!("\nAssistant: {}", outcome.reply),
            Err(e) => println!("\nError: {e}"),
        }
    }

    rt.block_on(orchestrator.flush_observability(SINK_FLUSH_TIMEOUT));
    Ok(String::new())
}

fn cmd_classify(text: &str, format: OutputFormat) -> Result<String> {
    // Classification needs the model names only; a missing API key is fine.
    let config = AgentConfig::builder()
        .from_env()
        .build()
        .or_else(|_| AgentConfig::builder().api_key("").from_env().build())
        .map_err(|e| CommandError::ExecutionFailed(format!("Agent configuration error: {e}")))?;

    let tier = classify(text);
    let model = tier.model(&config);
    match format {
        OutputFormat::Text => Ok(format!("{tier} ({model})\n")),
        OutputFormat::Json | OutputFormat::Ndjson => Ok(format.to_json(&serde_json::json!({
            "text": text,
            "tier": tier,
            "model": model,
        }))),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str(&format!(
                    "  {}\n",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                ));
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

/// Starts the MCP server with the specified transport.
///
/// Runs until the client disconnects (stdio) or the server is stopped
/// (SSE).
#[cfg(feature = "mcp")]
fn cmd_mcp(cmd: &McpCommands, db_path: &Path) -> Result<String> {
    use crate::mcp::{CanvasAgentMcpServer, serve_sse, serve_stdio};

    let config = agent_config(None)?;
    let orchestrator = Orchestrator::from_config(&config, open_checkpointer(db_path))
        .map_err(|e| CommandError::ExecutionFailed(format!("Failed to create MCP server: {e}")))?;
    let server = CanvasAgentMcpServer::new(Arc::new(orchestrator));

    let rt = runtime()?;
    rt.block_on(async {
        match cmd {
            McpCommands::Stdio => serve_stdio(server).await,
            McpCommands::Sse { host, port } => serve_sse(server, host, *port).await,
        }
    })
    .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::{ConversationState, Route, Turn};
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let db_path = temp_dir.path().join("checkpoints.db");
        (temp_dir, db_path)
    }

    fn seed(db_path: &Path, thread_id: &str) {
        let store = SqliteCheckpointer::open(db_path).unwrap_or_else(|_| unreachable!());
        let mut state = ConversationState::new();
        state.push(Turn::user("List my courses"));
        state.push(Turn::assistant(r#"{"next": "FINISH"}"#));
        state.next = Some(Route::Finish);
        runtime()
            .unwrap_or_else(|_| unreachable!())
            .block_on(store.save(thread_id, &state))
            .unwrap_or_else(|_| unreachable!());
    }

    #[test]
    fn test_parse_meta() {
        let map = parse_meta(&["a=1".to_string(), "b = x=y".to_string()])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(map["a"], Value::String("1".to_string()));
        assert_eq!(map["b"], Value::String(" x=y".to_string()));

        assert!(parse_meta(&["novalue".to_string()]).is_err());
        assert!(parse_meta(&["=v".to_string()]).is_err());
    }

    #[test]
    fn test_threads_list_show_delete() {
        let (_dir, db_path) = setup();
        seed(&db_path, "t-1");

        let list = execute_threads(&ThreadCommands::List, &db_path, OutputFormat::Text)
            .unwrap_or_else(|_| unreachable!());
        assert!(list.contains("t-1"));

        let show = execute_threads(
            &ThreadCommands::Show {
                thread_id: "t-1".to_string(),
            },
            &db_path,
            OutputFormat::Text,
        )
        .unwrap_or_else(|_| unreachable!());
        assert!(show.contains("[user] List my courses"));

        let delete = ThreadCommands::Delete {
            thread_id: "t-1".to_string(),
        };
        assert!(execute_threads(&delete, &db_path, OutputFormat::Text).is_ok());
        assert!(execute_threads(&delete, &db_path, OutputFormat::Text).is_err());
    }

    #[test]
    fn test_show_missing_thread() {
        let (_dir, db_path) = setup();
        let result = execute_threads(
            &ThreadCommands::Show {
                thread_id: "nope".to_string(),
            },
            &db_path,
            OutputFormat::Text,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_classify_json() {
        let out = cmd_classify("draft a syllabus", OutputFormat::Json)
            .unwrap_or_else(|_| unreachable!());
        let value: Value = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(value["tier"], Value::String("capable".to_string()));
    }

    #[test]
    fn test_init_prompts_is_idempotent() {
        let dir = TempDir::new().unwrap_or_else(|_| unreachable!());
        let first = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|_| unreachable!());
        assert!(first.contains("Wrote 3 prompt template(s)"));

        let second = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|_| unreachable!());
        assert!(second.contains("already exist"));
    }
}
