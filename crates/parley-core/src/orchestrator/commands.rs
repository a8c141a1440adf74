//! Slash commands and their user-facing texts.

use parley_types::task::Task;

use crate::render::escape_html;

pub const WELCOME: &str = "Welcome! Send me a message or a voice note and I will reply. \
You can also manage your tasks with /addtask, /tasks, and /orbit.";
pub const HISTORY_CLEARED: &str = "Conversation history cleared.";
pub const ADD_TASK_USAGE: &str = "Usage: /addtask <HH:MM> <Description>";
pub const NO_TASKS: &str = "No tasks found.";
pub const EMPTY_ORBIT: &str = "Your Orbit is empty.";
pub const ORBIT_CLEARED: &str = "Orbit cleared. All tasks removed.";
pub const UNKNOWN_COMMAND: &str = "Unknown command.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Greet and forget the conversation.
    Start,
    /// Forget the conversation.
    Clear,
    AddTask { time: String, description: String },
    /// `/addtask` with missing arguments.
    AddTaskUsage,
    /// Tasks in the order they were added.
    Tasks,
    /// Tasks ordered by time of day.
    Orbit,
    ClearOrbit,
    Unknown(String),
}

impl Command {
    /// Parse a message as a command. `None` if it does not start with `/`.
    ///
    /// A `@botname` suffix on the command word (as sent in group chats) is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix('/')?;
        let (word, args) = match rest.split_once(char::is_whitespace) {
            Some((word, args)) => (word, args.trim()),
            None => (rest, ""),
        };
        let name = word.split('@').next().unwrap_or_default();

        let command = match name {
            "start" => Command::Start,
            "clear" => Command::Clear,
            "tasks" => Command::Tasks,
            "orbit" => Command::Orbit,
            "clearorbit" => Command::ClearOrbit,
            "addtask" => match args.split_once(char::is_whitespace) {
                Some((time, description)) if !description.trim().is_empty() => Command::AddTask {
                    time: time.to_string(),
                    description: description.trim().to_string(),
                },
                _ => Command::AddTaskUsage,
            },
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

pub fn task_added(task: &Task) -> String {
    format!("Task added: {} at {}", task.description, task.time)
}

/// HTML listing for `/tasks`.
pub fn format_tasks(tasks: &[Task]) -> String {
    let mut out = String::from("<b>Your Tasks:</b>\n");
    for (index, task) in tasks.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}] {}\n",
            index + 1,
            escape_html(&task.time),
            escape_html(&task.description)
        ));
    }
    out
}

/// HTML schedule for `/orbit`, earliest time first.
pub fn format_orbit(tasks: &[Task]) -> String {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by(|a, b| a.time.cmp(&b.time));

    let mut out = String::from("<b>Your Orbit (Schedule):</b>\n");
    for task in ordered {
        out.push_str(&format!(
            "• <b>{}</b>: {}\n",
            escape_html(&task.time),
            escape_html(&task.description)
        ));
    }
    out
}
