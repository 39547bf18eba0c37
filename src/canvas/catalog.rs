//! Static catalogue of the Canvas operations offered to the executor.
//!
//! Each entry names the tool the model sees, the MCP tool it maps to, the
//! parameter schema, argument renames and defaults applied before the
//! remote call, and an optional success message used when the response
//! carries an `html_url`.

use serde_json::{Map, Value, json};

use crate::agent::tool::ToolDefinition;

/// Where a catalogue entry is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Forwarded to the Canvas MCP server under this tool name.
    Remote(&'static str),
    /// Reads a file from the local filesystem.
    LocalFile,
    /// Known operation with no backing implementation.
    Unsupported,
}

/// JSON schema type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// `integer`
    Integer,
    /// `string`
    String,
    /// `boolean`
    Boolean,
    /// `array` of objects
    ObjectArray,
}

impl ParamKind {
    const fn json_type(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::ObjectArray => "array",
        }
    }
}

/// One tool parameter.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    /// Argument name as the model sends it.
    pub name: &'static str,
    /// Schema type.
    pub kind: ParamKind,
    /// Whether the model must supply it.
    pub required: bool,
    /// Optional schema description (empty for none).
    pub description: &'static str,
}

impl Param {
    const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            description: "",
        }
    }

    const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            description: "",
        }
    }

    const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), json!(self.kind.json_type()));
        if self.kind == ParamKind::ObjectArray {
            schema.insert("items".to_string(), json!({ "type": "object" }));
        }
        if !self.description.is_empty() {
            schema.insert("description".to_string(), json!(self.description));
        }
        Value::Object(schema)
    }
}

/// Constant argument value filled in when the model omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixed {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// String value.
    Str(&'static str),
}

impl Fixed {
    /// JSON form of the value.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Int(n) => Value::from(n),
            Self::Str(s) => Value::from(s),
        }
    }
}

/// A catalogue entry.
#[derive(Debug, Clone, Copy)]
pub struct CanvasTool {
    /// Tool name exposed to the model.
    pub name: &'static str,
    /// Execution backend.
    pub backend: Backend,
    /// Description exposed to the model.
    pub description: &'static str,
    /// Parameters exposed to the model.
    pub params: &'static [Param],
    /// `(model name, remote path)` pairs. A dotted path nests the value;
    /// a trailing `[]` wraps it in a one-element array.
    pub renames: &'static [(&'static str, &'static str)],
    /// Remote arguments filled in when absent.
    pub defaults: &'static [(&'static str, Fixed)],
    /// Success message template; `{arg}` is replaced with the model's argument.
    pub link_message: Option<&'static str>,
}

impl CanvasTool {
    const fn remote(name: &'static str, remote: &'static str, description: &'static str) -> Self {
        Self {
            name,
            backend: Backend::Remote(remote),
            description,
            params: &[],
            renames: &[],
            defaults: &[],
            link_message: None,
        }
    }

    const fn params(mut self, params: &'static [Param]) -> Self {
        self.params = params;
        self
    }

    const fn renames(mut self, renames: &'static [(&'static str, &'static str)]) -> Self {
        self.renames = renames;
        self
    }

    const fn defaults(mut self, defaults: &'static [(&'static str, Fixed)]) -> Self {
        self.defaults = defaults;
        self
    }

    const fn link(mut self, message: &'static str) -> Self {
        self.link_message = Some(message);
        self
    }

    const fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Function-calling definition for this tool.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Renders the success message, substituting `{arg}` placeholders.
    #[must_use]
    pub fn success_message(&self, args: &Map<String, Value>) -> Option<String> {
        let template = self.link_message?;
        let mut message = template.to_string();
        for (key, value) in args {
            let placeholder = format!("{{{key}}}");
            if message.contains(&placeholder) {
                let text = value
                    .as_str()
                    .map_or_else(|| value.to_string(), str::to_string);
                message = message.replace(&placeholder, &text);
            }
        }
        Some(message)
    }
}

/// Looks up a catalogue entry by tool name.
#[must_use]
pub fn find(name: &str) -> Option<&'static CanvasTool> {
    CATALOG.iter().find(|tool| tool.name == name)
}

use ParamKind::{Boolean, Integer, ObjectArray, String as Text};

const COURSE_ID: Param = Param::required("course_id", Integer).describe("Canvas course ID");
const ASSIGNMENT_ID: Param = Param::required("assignment_id", Integer);
const ACCOUNT_ID: Param = Param::required("account_id", Integer);
const TOPIC_ID: Param = Param::required("topic_id", Integer);
const QUIZ_ID: Param = Param::required("quiz_id", Integer);
const MODULE_ID: Param = Param::required("module_id", Integer);
const ITEM_ID: Param = Param::required("item_id", Integer);

/// Every tool the Canvas executor can call.
pub static CATALOG: &[CanvasTool] = &[
    // Core
    CanvasTool::remote(
        "canvas_health_check",
        "canvas_health_check",
        "Check the health and connectivity of the Canvas API.",
    ),
    // Courses
    CanvasTool::remote(
        "get_canvas_courses",
        "canvas_list_courses",
        "Retrieves the list of Canvas courses. Use it to resolve a course name to its course_id.",
    )
    .defaults(&[("include_ended", Fixed::Bool(false))]),
    CanvasTool::remote(
        "get_canvas_course",
        "canvas_get_course",
        "Get detailed information about a specific course.",
    )
    .params(&[COURSE_ID]),
    CanvasTool::remote(
        "create_canvas_course",
        "canvas_create_course",
        "Create a new course in Canvas.",
    )
    .params(&[
        ACCOUNT_ID,
        Param::required("name", Text),
        Param::optional("course_code", Text),
        Param::optional("start_at", Text).describe("ISO 8601 start date"),
        Param::optional("end_at", Text).describe("ISO 8601 end date"),
        Param::optional("license", Text),
        Param::optional("is_public", Boolean),
    ])
    .link("Course '{name}' created"),
    CanvasTool::remote(
        "update_canvas_course",
        "canvas_update_course",
        "Update an existing course in Canvas.",
    )
    .params(&[
        COURSE_ID,
        Param::optional("name", Text),
        Param::optional("course_code", Text),
    ])
    .link("Course updated"),
    CanvasTool::remote(
        "get_course_grades",
        "canvas_get_course_grades",
        "Get grades for a course.",
    )
    .params(&[COURSE_ID]),
    CanvasTool::remote("get_syllabus", "canvas_get_syllabus", "Get course syllabus.")
        .params(&[COURSE_ID]),
    // Assignments
    CanvasTool::remote(
        "get_course_assignments",
        "canvas_list_assignments",
        "Retrieves the list of assignments for a specific Canvas course.",
    )
    .params(&[COURSE_ID]),
    CanvasTool::remote(
        "get_canvas_assignment",
        "canvas_get_assignment",
        "Get detailed information about a specific assignment.",
    )
    .params(&[COURSE_ID, ASSIGNMENT_ID]),
    CanvasTool::remote(
        "create_canvas_assignment",
        "canvas_create_assignment",
        "Creates a new ASSIGNMENT (graded work, homework) in a specific Canvas course. Do NOT use for announcements.",
    )
    .params(&[
        COURSE_ID,
        Param::required("assignment_name", Text),
        Param::optional("due_date", Text).describe("Due date, ISO 8601 in UTC"),
        Param::optional("points", Integer),
        Param::optional("description", Text),
    ])
    .renames(&[
        ("assignment_name", "name"),
        ("due_date", "due_at"),
        ("points", "points_possible"),
    ])
    .defaults(&[
        ("points_possible", Fixed::Int(0)),
        ("description", Fixed::Str("")),
    ])
    .link("Assignment '{assignment_name}' created"),
    CanvasTool::remote(
        "update_canvas_assignment",
        "canvas_update_assignment",
        "Update an existing assignment.",
    )
    .params(&[
        COURSE_ID,
        ASSIGNMENT_ID,
        Param::optional("name", Text),
        Param::optional("description", Text),
        Param::optional("due_at", Text).describe("Due date, ISO 8601 in UTC"),
        Param::optional("points_possible", Integer),
        Param::optional("published", Boolean),
    ])
    .link("Assignment updated"),
    CanvasTool::remote(
        "list_assignment_groups",
        "canvas_list_assignment_groups",
        "List assignment groups for a course.",
    )
    .params(&[COURSE_ID]),
    CanvasTool::remote(
        "get_upcoming_assignments",
        "canvas_get_upcoming_assignments",
        "Get upcoming assignment due dates.",
    )
    .params(&[Param::optional("limit", Integer)])
    .defaults(&[("limit", Fixed::Int(10))]),
    // Submissions and grading
    CanvasTool::remote(
        "get_submissions",
        "canvas_get_submission",
        "Retrieves submissions for a specific assignment.",
    )
    .params(&[COURSE_ID, ASSIGNMENT_ID])
    .defaults(&[("user_id", Fixed::Str("self"))]),
    CanvasTool::remote(
        "get_canvas_submission",
        "canvas_get_submission",
        "Get submission details for an assignment.",
    )
    .params(&[
        COURSE_ID,
        ASSIGNMENT_ID,
        Param::optional("user_id", Integer),
    ]),
    CanvasTool::remote(
        "submit_canvas_assignment",
        "canvas_submit_assignment",
        "Submit work for an assignment.",
    )
    .params(&[
        COURSE_ID,
        ASSIGNMENT_ID,
        Param::required("submission_type", Text),
        Param::optional("body", Text),
        Param::optional("url", Text),
    ])
    .link("Assignment submitted"),
    CanvasTool::remote(
        "submit_canvas_grade",
        "canvas_submit_grade",
        "Submit a grade for a student's assignment (instructor only).",
    )
    .params(&[
        COURSE_ID,
        ASSIGNMENT_ID,
        Param::required("user_id", Integer),
        Param::required("grade", Text),
        Param::optional("comment", Text),
    ])
    .link("Grade submitted"),
    // Announcements
    CanvasTool::remote(
        "create_canvas_announcement",
        "canvas_create_announcement",
        "Creates a new ANNOUNCEMENT (message to students, news) in a specific Canvas course. Do NOT use for assignments.",
    )
    .params(&[
        COURSE_ID,
        Param::required("title", Text),
        Param::required("message", Text),
        Param::optional("delayed_post_at", Text).describe("Publish time, ISO 8601 in UTC"),
    ])
    .link("Announcement '{title}' created"),
    CanvasTool::remote(
        "list_announcements",
        "canvas_list_announcements",
        "List all announcements in a course.",
    )
    .params(&[COURSE_ID]),
    // Discussions
    CanvasTool::remote(
        "list_discussion_topics",
        "canvas_list_discussion_topics",
        "List all discussion topics in a course.",
    )
    .params(&[COURSE_ID]),
    CanvasTool::remote(
        "get_discussion_topics",
        "canvas_list_discussion_topics",
        "Retrieves discussion topics (forums) for a specific Canvas course.",
    )
    .params(&[COURSE_ID]),
    CanvasTool::remote(
        "get_discussion_topic",
        "canvas_get_discussion_topic",
        "Get details of a specific discussion topic.",
    )
    .params(&[COURSE_ID, TOPIC_ID]),
    CanvasTool::remote(
        "get_full_discussion_entry",
        "canvas_get_discussion_topic",
        "Retrieves full discussion entries for a specific topic.",
    )
    .params(&[COURSE_ID, TOPIC_ID]),
    CanvasTool::remote(
        "post_to_discussion",
        "canvas_post_to_discussion",
        "Post a message to a discussion topic.",
    )
    .params(&[COURSE_ID, TOPIC_ID, Param::required("message", Text)])
    .link("Posted to discussion"),
    // Modules
    CanvasTool::remote("list_modules", "canvas_list_modules", "List all modules in a course.")
        .params(&[COURSE_ID]),
    CanvasTool::remote(
        "get_module",
        "canvas_get_module",
        "Get details of a specific module.",
    )
    .params(&[COURSE_ID, MODULE_ID]),
    CanvasTool::remote(
        "list_module_items",
        "canvas_list_module_items",
        "List all items in a module.",
    )
    .params(&[COURSE_ID, MODULE_ID]),
    CanvasTool::remote(
        "get_module_item",
        "canvas_get_module_item",
        "Get details of a specific module item.",
    )
    .params(&[COURSE_ID, MODULE_ID, ITEM_ID]),
    CanvasTool::remote(
        "mark_module_item_complete",
        "canvas_mark_module_item_complete",
        "Mark a module item as complete.",
    )
    .params(&[COURSE_ID, MODULE_ID, ITEM_ID]),
    // Quizzes
    CanvasTool::remote("list_quizzes", "canvas_list_quizzes", "List all quizzes in a course.")
        .params(&[COURSE_ID]),
    CanvasTool::remote("get_quiz", "canvas_get_quiz", "Get details of a specific quiz.")
        .params(&[COURSE_ID, QUIZ_ID]),
    CanvasTool::remote(
        "create_quiz",
        "canvas_create_quiz",
        "Create a new quiz in a course.",
    )
    .params(&[
        COURSE_ID,
        Param::required("title", Text),
        Param::optional("description", Text),
        Param::optional("quiz_type", Text),
        Param::optional("time_limit", Integer).describe("Time limit in minutes"),
        Param::optional("published", Boolean),
        Param::optional("due_at", Text).describe("Due date, ISO 8601 in UTC"),
    ])
    .defaults(&[
        ("quiz_type", Fixed::Str("assignment")),
        ("published", Fixed::Bool(false)),
    ])
    .link("Quiz '{title}' created"),
    CanvasTool::remote(
        "start_quiz_attempt",
        "canvas_start_quiz_attempt",
        "Start a new quiz attempt.",
    )
    .params(&[COURSE_ID, QUIZ_ID]),
    CanvasTool::remote(
        "create_quiz_question",
        "canvas_create_quiz_question",
        "Create a new question for a quiz.",
    )
    .params(&[
        COURSE_ID,
        QUIZ_ID,
        Param::required("question_name", Text),
        Param::required("question_text", Text).describe("Question text (HTML supported)"),
        Param::required("question_type", Text).describe(
            "One of multiple_choice_question, true_false_question, short_answer_question, essay_question",
        ),
        Param::optional("points_possible", Integer),
        Param::optional("answers", ObjectArray).describe(
            "Answers with 'text', 'weight' (100 correct, 0 incorrect) and optional 'comments'",
        ),
    ])
    .defaults(&[("points_possible", Fixed::Int(1))]),
    // Files and pages
    CanvasTool::remote(
        "list_canvas_files",
        "canvas_list_files",
        "List files in a course or folder.",
    )
    .params(&[COURSE_ID, Param::optional("folder_id", Integer)]),
    CanvasTool::remote(
        "get_canvas_file",
        "canvas_get_file",
        "Get information about a specific file.",
    )
    .params(&[Param::required("file_id", Integer)]),
    CanvasTool::remote(
        "list_canvas_folders",
        "canvas_list_folders",
        "List folders in a course.",
    )
    .params(&[COURSE_ID]),
    CanvasTool::remote("list_canvas_pages", "canvas_list_pages", "List pages in a course.")
        .params(&[COURSE_ID]),
    CanvasTool::remote(
        "get_canvas_page",
        "canvas_get_page",
        "Get content of a specific page.",
    )
    .params(&[COURSE_ID, Param::required("page_url", Text)]),
    // Users and accounts
    CanvasTool::remote(
        "get_user_profile",
        "canvas_get_user_profile",
        "Get current user's profile.",
    ),
    CanvasTool::remote(
        "update_user_profile",
        "canvas_update_user_profile",
        "Update current user's profile.",
    )
    .params(&[
        Param::optional("name", Text),
        Param::optional("bio", Text),
    ]),
    CanvasTool::remote("enroll_user", "canvas_enroll_user", "Enroll a user in a course.")
        .params(&[
            COURSE_ID,
            Param::required("user_id", Integer),
            Param::optional("role", Text),
        ])
        .defaults(&[("role", Fixed::Str("StudentEnrollment"))]),
    CanvasTool::remote(
        "get_user_grades",
        "canvas_get_user_grades",
        "Get all grades for the current user.",
    ),
    CanvasTool::remote("get_account", "canvas_get_account", "Get account details.")
        .params(&[ACCOUNT_ID]),
    CanvasTool::remote(
        "list_account_courses",
        "canvas_list_account_courses",
        "List courses for an account.",
    )
    .params(&[ACCOUNT_ID]),
    CanvasTool::remote(
        "list_account_users",
        "canvas_list_account_users",
        "List users for an account.",
    )
    .params(&[ACCOUNT_ID]),
    CanvasTool::remote(
        "create_user",
        "canvas_create_user",
        "Create a new user in an account.",
    )
    .params(&[
        ACCOUNT_ID,
        Param::required("name", Text),
        Param::required("unique_id", Text).describe("Login ID, usually an email address"),
        Param::optional("password", Text),
    ])
    .renames(&[
        ("name", "user.name"),
        ("unique_id", "pseudonym.unique_id"),
        ("password", "pseudonym.password"),
    ])
    .link("User '{name}' created"),
    // Calendar and dashboard
    CanvasTool::remote(
        "list_calendar_events",
        "canvas_list_calendar_events",
        "List calendar events.",
    )
    .params(&[
        Param::optional("start_date", Text),
        Param::optional("end_date", Text),
    ]),
    CanvasTool::remote(
        "get_canvas_dashboard",
        "canvas_get_dashboard",
        "Get user's dashboard information.",
    ),
    CanvasTool::remote(
        "get_canvas_dashboard_cards",
        "canvas_get_dashboard_cards",
        "Get dashboard course cards.",
    ),
    // Rubrics
    CanvasTool::remote("list_rubrics", "canvas_list_rubrics", "List rubrics for a course.")
        .params(&[COURSE_ID]),
    CanvasTool::remote("get_rubric", "canvas_get_rubric", "Get details of a specific rubric.")
        .params(&[COURSE_ID, Param::required("rubric_id", Integer)]),
    CanvasTool::remote(
        "create_canvas_rubric",
        "",
        "Creates a new rubric in a specific Canvas course. Not currently supported by the backend.",
    )
    .params(&[
        COURSE_ID,
        Param::required("title", Text),
        Param::required("description", Text),
    ])
    .backend(Backend::Unsupported),
    // Conversations
    CanvasTool::remote(
        "list_conversations",
        "canvas_list_conversations",
        "List user's conversations.",
    ),
    CanvasTool::remote(
        "get_conversation",
        "canvas_get_conversation",
        "Get details of a specific conversation.",
    )
    .params(&[Param::required("conversation_id", Integer)]),
    CanvasTool::remote(
        "send_canvas_message",
        "canvas_create_conversation",
        "Sends a message to a Canvas user.",
    )
    .params(&[
        Param::required("user_id", Text),
        Param::required("subject", Text),
        Param::required("body", Text),
    ])
    .renames(&[("user_id", "recipients[]")])
    .link("Message sent"),
    CanvasTool::remote(
        "list_notifications",
        "canvas_list_notifications",
        "List user's notifications.",
    ),
    // Local
    CanvasTool::remote(
        "read_local_file",
        "",
        "Reads a local file (syllabus, markdown, text) from the filesystem.",
    )
    .params(&[Param::required("path", Text)])
    .backend(Backend::LocalFile),
];
