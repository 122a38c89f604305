use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub list_id: String,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Task {
    /// Returns `(completed, total)` over the task's subtasks.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (done, self.subtasks.len())
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub author_id: Option<String>,
    pub body: String,
    pub created_at: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub size_bytes: u64,
    pub added_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub at: String,
    #[serde(default)]
    pub actor_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Todo => "Todo",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_token(raw).as_str() {
            "todo" | "to_do" | "open" => Ok(TaskStatus::Todo),
            "in_progress" | "inprogress" | "doing" | "started" => Ok(TaskStatus::InProgress),
            "done" | "complete" | "completed" => Ok(TaskStatus::Done),
            _ => Err(AppError::invalid_input(format!("unknown status '{}'", raw.trim()))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_token(raw).as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "med" | "normal" => Ok(Priority::Medium),
            "high" | "urgent" => Ok(Priority::High),
            _ => Err(AppError::invalid_input(format!("unknown priority '{}'", raw.trim()))),
        }
    }
}

/// Lowercases and folds runs of punctuation into one underscore, so
/// "In Progress", "in-progress" and "in_progress" compare equal. Config
/// override keys go through the same folding.
pub(crate) fn normalize_token(raw: &str) -> String {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    cleaned.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::{Priority, TaskStatus, normalize_token};

    #[test]
    fn status_parses_common_spellings() {
        assert_eq!("In Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("DONE".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert_eq!(" todo ".parse::<TaskStatus>().unwrap(), TaskStatus::Todo);
    }

    #[test]
    fn normalize_token_folds_punctuation() {
        assert_eq!(normalize_token("Gantt.Day-Width"), "gantt_day_width");
        assert_eq!(normalize_token("  ai..model "), "ai_model");
        assert_eq!(normalize_token("--"), "");
    }

    #[test]
    fn status_rejects_unknown_values() {
        let err = "blocked".parse::<TaskStatus>().unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn priority_defaults_to_medium_and_orders() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert!(Priority::High > Priority::Low);
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::High);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
