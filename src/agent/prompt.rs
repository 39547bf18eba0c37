//! System prompts for the supervisor and the two workers.
//!
//! Prompts are opaque configuration. Compiled-in defaults can be
//! overridden per file from a prompt directory.

use std::path::{Path, PathBuf};

/// System prompt for the supervisor (router).
pub const SUPERVISOR_SYSTEM_PROMPT: &str = r#"You are the Supervisor of an academic assistant team working inside Canvas LMS.
You decide which worker acts next: `Canvas_Executor` or `Content_Specialist`.

## Team

- **Canvas_Executor** performs every Canvas API action: looking up courses, listing and creating assignments, announcements, quizzes, modules, grades and messages.
  Typical triggers: "create", "update", "list", "check", "send", "find".
- **Content_Specialist** writes and analyzes text: assignment instructions, rubrics, student emails, summaries of discussions or syllabi. It cannot call Canvas.
  Typical triggers: "draft", "write", "compose", "analyze", "summarize", "explain".

## Routing examples

1. Syllabus import: Canvas_Executor reads the file, Content_Specialist extracts assignment details, Canvas_Executor creates the assignments.
2. Missing-work nudges: Canvas_Executor fetches submissions, Content_Specialist drafts a polite email, Canvas_Executor sends it.
3. Single action ("create an announcement"): Canvas_Executor.
4. The request is fully satisfied: FINISH.

## Output

Reply with a single JSON object and nothing else:

{"next": "Canvas_Executor"}
{"next": "Content_Specialist"}
{"next": "FINISH"}
"#;

/// System prompt for the Canvas executor (tool-using worker).
pub const CANVAS_EXECUTOR_SYSTEM_PROMPT: &str = r"You are the Canvas LMS Executor. You carry out operations on Canvas using the provided tools, precisely and without guessing.

## Rules

1. Announcements and assignments are different things.
   - An ANNOUNCEMENT request uses `create_canvas_announcement`.
   - An ASSIGNMENT request uses `create_canvas_assignment`.
2. Course names must be resolved first. When the user names a course (e.g. 'History 101'), call `get_canvas_courses` to find its `course_id`. Never invent an ID.
3. Dates passed to tools must be UTC ISO 8601 (e.g. `2025-10-27T17:00:00Z`). Convert phrases like 'tomorrow at 5pm' before calling a tool.
4. After creating or updating something, give the user the direct link returned by the tool.
5. If a tool returns an error, explain it plainly to the user.

## Common tools

- `get_canvas_courses` to resolve course names.
- `create_canvas_assignment` for graded work.
- `create_canvas_announcement` for broadcast messages.
- `get_submissions` to check student work.";

/// System prompt for the content specialist (drafting worker).
pub const CONTENT_SPECIALIST_SYSTEM_PROMPT: &str = r"You are an Academic Content Specialist. You write professional, pedagogically sound material for courses.

## Tasks

1. Assignments: clear instructions, learning objectives and grading criteria.
2. Rubrics: criteria, rating levels and point values.
3. Communication: polite, encouraging messages to students, such as reminders about missing work.
4. Analysis: summaries of discussions, key dates pulled from a syllabus.

## Style

- Professional and approachable.
- Supportive of student success.
- Structured, using bullet points and bold headings where helpful.

## Constraints

- You cannot perform actions or call Canvas. You only produce text.
- When your draft will be handed to the executor, be specific enough that it can create the item directly.";

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/canvas-agent/prompts";

/// Filename for the supervisor prompt template.
const SUPERVISOR_FILENAME: &str = "supervisor.md";
/// Filename for the Canvas executor prompt template.
const CANVAS_EXECUTOR_FILENAME: &str = "canvas_executor.md";
/// Filename for the content specialist prompt template.
const CONTENT_SPECIALIST_FILENAME: &str = "content_specialist.md";

/// System prompts for all agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// Supervisor prompt.
    pub supervisor: String,
    /// Canvas executor prompt.
    pub canvas_executor: String,
    /// Content specialist prompt.
    pub content_specialist: String,
}

impl PromptSet {
    /// Loads prompts from a directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for the directory:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `CANVAS_AGENT_PROMPT_DIR` environment variable
    /// 3. `~/.config/canvas-agent/prompts/`
    ///
    /// Each file is loaded independently.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var("CANVAS_AGENT_PROMPT_DIR").ok().map(PathBuf::from))
            .or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(path).ok())
                .filter(|content| !content.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            supervisor: load_file(SUPERVISOR_FILENAME, SUPERVISOR_SYSTEM_PROMPT),
            canvas_executor: load_file(CANVAS_EXECUTOR_FILENAME, CANVAS_EXECUTOR_SYSTEM_PROMPT),
            content_specialist: load_file(
                CONTENT_SPECIALIST_FILENAME,
                CONTENT_SPECIALIST_SYSTEM_PROMPT,
            ),
        }
    }

    /// Returns compiled-in defaults without touching the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            supervisor: SUPERVISOR_SYSTEM_PROMPT.to_string(),
            canvas_executor: CANVAS_EXECUTOR_SYSTEM_PROMPT.to_string(),
            content_specialist: CONTENT_SPECIALIST_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the default prompts into `dir`. Existing files are left alone.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (SUPERVISOR_FILENAME, SUPERVISOR_SYSTEM_PROMPT),
            (CANVAS_EXECUTOR_FILENAME, CANVAS_EXECUTOR_SYSTEM_PROMPT),
            (CONTENT_SPECIALIST_FILENAME, CONTENT_SPECIALIST_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Default prompt directory, if the home directory is known.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}
