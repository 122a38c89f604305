use super::client::{FunctionCall, FunctionDeclaration, GenerateRequest, TextGenerator};
use super::service::AiService;
use crate::board::{Board, NewTask, Stamp};
use crate::error::AppError;
use crate::model::{Priority, Task, TaskStatus};
use serde_json::{Value, json};
use std::fmt::Write as _;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantAction {
    CreateTask {
        title: String,
        description: String,
        priority: Option<Priority>,
        list_id: Option<String>,
    },
    UpdateTaskStatus {
        task: String,
        status: TaskStatus,
    },
    AssignTask {
        task: String,
        assignee: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantReply {
    Message(String),
    Action(AssistantAction),
}

pub fn function_declarations() -> Vec<FunctionDeclaration> {
    vec![
        FunctionDeclaration {
            name: "create_task".into(),
            description: "Create a new task.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] },
                    "list_id": { "type": "string" }
                },
                "required": ["title"]
            }),
        },
        FunctionDeclaration {
            name: "update_task_status".into(),
            description: "Change the status of an existing task.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "task": { "type": "string", "description": "task id or title" },
                    "status": { "type": "string", "enum": ["todo", "in_progress", "done"] }
                },
                "required": ["task", "status"]
            }),
        },
        FunctionDeclaration {
            name: "assign_task".into(),
            description: "Assign an existing task to a user.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "task": { "type": "string", "description": "task id or title" },
                    "assignee": { "type": "string", "description": "user id, name or email" }
                },
                "required": ["task", "assignee"]
            }),
        },
    ]
}

impl AssistantAction {
    pub fn from_call(call: &FunctionCall) -> Result<Self, AppError> {
        let args = &call.args;
        match call.name.as_str() {
            "create_task" => Ok(AssistantAction::CreateTask {
                title: required_arg(args, "title")?,
                description: optional_arg(args, "description").unwrap_or_default(),
                priority: optional_arg(args, "priority")
                    .map(|raw| raw.parse())
                    .transpose()?,
                list_id: optional_arg(args, "list_id"),
            }),
            "update_task_status" => Ok(AssistantAction::UpdateTaskStatus {
                task: required_arg(args, "task")?,
                status: required_arg(args, "status")?.parse()?,
            }),
            "assign_task" => Ok(AssistantAction::AssignTask {
                task: required_arg(args, "task")?,
                assignee: required_arg(args, "assignee")?,
            }),
            other => Err(AppError::remote(format!("model called unknown function: {other}"))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AssistantAction::CreateTask { title, .. } => format!("create task \"{title}\""),
            AssistantAction::UpdateTaskStatus { task, status } => {
                format!("set \"{task}\" to {}", status.label())
            }
            AssistantAction::AssignTask { task, assignee } => {
                format!("assign \"{task}\" to {assignee}")
            }
        }
    }

    /// Runs the action through the regular board operations.
    pub fn apply(
        &self,
        board: &mut Board,
        default_list: Option<&str>,
        stamp: &Stamp,
    ) -> Result<Task, AppError> {
        let task = match self {
            AssistantAction::CreateTask {
                title,
                description,
                priority,
                list_id,
            } => {
                let list_id = match list_id.as_deref().or(default_list) {
                    Some(list) => board.list(list)?.id.clone(),
                    None => first_list(board)?,
                };
                let mut new = NewTask::new(title.as_str(), list_id);
                new.description = description.clone();
                new.priority = priority.unwrap_or_default();
                board.create_task(new, stamp)?
            }
            AssistantAction::UpdateTaskStatus { task, status } => {
                let id = resolve_task(board, task)?.id.clone();
                board.set_status(&id, *status, stamp)?
            }
            AssistantAction::AssignTask { task, assignee } => {
                let id = resolve_task(board, task)?.id.clone();
                let user_id = board.find_user(assignee)?.id.clone();
                board.assign_task(&id, Some(&user_id), stamp)?
            }
        };
        info!(task = %task.id, action = %self.describe(), "assistant action applied");
        Ok(task)
    }
}

/// Finds a task by exact id, then by case-insensitive title.
pub fn resolve_task<'a>(board: &'a Board, query: &str) -> Result<&'a Task, AppError> {
    let query = query.trim();
    if let Some(task) = board.tasks.iter().find(|task| task.id == query) {
        return Ok(task);
    }
    let lowered = query.to_lowercase();
    let matches: Vec<&Task> = board
        .tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == lowered)
        .collect();
    match matches.as_slice() {
        [task] => Ok(task),
        [] => Err(AppError::not_found(format!("task not found: {query}"))),
        _ => Err(AppError::invalid_input(format!(
            "'{query}' matches several tasks; use the task id"
        ))),
    }
}

fn first_list(board: &Board) -> Result<String, AppError> {
    board
        .workspaces
        .iter()
        .min_by_key(|workspace| workspace.order)
        .and_then(|workspace| {
            board
                .lists
                .iter()
                .filter(|list| list.workspace_id == workspace.id)
                .min_by_key(|list| (list.folder_id.is_some(), list.order))
        })
        .or_else(|| board.lists.first())
        .map(|list| list.id.clone())
        .ok_or_else(|| AppError::invalid_input("create a list before adding tasks"))
}

fn required_arg(args: &Value, name: &str) -> Result<String, AppError> {
    optional_arg(args, name)
        .ok_or_else(|| AppError::remote(format!("model omitted required argument '{name}'")))
}

fn optional_arg(args: &Value, name: &str) -> Option<String> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl<G: TextGenerator> AiService<G> {
    /// One assistant turn. A reply without a function call is returned as text.
    pub fn chat(&self, board: &Board, message: &str) -> Result<AssistantReply, AppError> {
        let request = GenerateRequest {
            prompt: assistant_prompt(board, message),
            json: false,
            functions: function_declarations(),
        };
        let reply = self.generator().generate(&request)?;
        match reply.function_call {
            Some(call) => Ok(AssistantReply::Action(AssistantAction::from_call(&call)?)),
            None => Ok(AssistantReply::Message(reply.text.trim().to_string())),
        }
    }
}

fn assistant_prompt(board: &Board, message: &str) -> String {
    let mut prompt = String::from(
        "You are a project assistant. Use the provided functions to change tasks; \
         otherwise answer briefly.\n\nLists:\n",
    );
    for list in &board.lists {
        let _ = writeln!(prompt, "- {} ({})", list.name, list.id);
    }
    prompt.push_str("Users:\n");
    for user in &board.users {
        let _ = writeln!(prompt, "- {} <{}> ({})", user.name, user.email, user.id);
    }
    prompt.push_str("Tasks:\n");
    for task in &board.tasks {
        let _ = writeln!(
            prompt,
            "- {} [{}] {}",
            task.title,
            task.id,
            task.status.as_str()
        );
    }
    let _ = write!(prompt, "\nUser: {}", message.trim());
    prompt
}

#[cfg(test)]
mod tests {
    use super::{AssistantAction, AssistantReply, resolve_task};
    use crate::ai::client::FunctionCall;
    use crate::ai::service::AiService;
    use crate::ai::service::fake::FakeGenerator;
    use crate::board::fixtures::{add_task, add_user, seeded, stamp};
    use crate::model::{Priority, Role, TaskStatus};
    use serde_json::json;

    #[test]
    fn chat_returns_text_without_function_call() {
        let seeded = seeded();
        let service = AiService::new(FakeGenerator::text(" You have no overdue tasks. "));
        let reply = service.chat(&seeded.board, "anything overdue?").unwrap();
        assert_eq!(
            reply,
            AssistantReply::Message("You have no overdue tasks.".into())
        );
        let requests = service.generator().requests.borrow();
        assert_eq!(requests[0].functions.len(), 3);
        assert!(requests[0].prompt.contains("Inbox"));
    }

    #[test]
    fn chat_parses_create_task_call() {
        let seeded = seeded();
        let service = AiService::new(FakeGenerator::call(
            "create_task",
            json!({"title": "Write release notes", "priority": "high"}),
        ));
        let reply = service.chat(&seeded.board, "add release notes").unwrap();
        assert_eq!(
            reply,
            AssistantReply::Action(AssistantAction::CreateTask {
                title: "Write release notes".into(),
                description: String::new(),
                priority: Some(Priority::High),
                list_id: None,
            })
        );
    }

    #[test]
    fn chat_errors_surface() {
        let seeded = seeded();
        let service = AiService::new(FakeGenerator::failing());
        assert_eq!(
            service.chat(&seeded.board, "hi").unwrap_err().code(),
            "remote_error"
        );
    }

    #[test]
    fn from_call_rejects_unknown_functions_and_missing_args() {
        let unknown = FunctionCall {
            name: "delete_everything".into(),
            args: json!({}),
        };
        assert!(AssistantAction::from_call(&unknown).is_err());

        let missing = FunctionCall {
            name: "assign_task".into(),
            args: json!({"task": "Docs"}),
        };
        assert!(
            AssistantAction::from_call(&missing)
                .unwrap_err()
                .message()
                .contains("assignee")
        );
    }

    #[test]
    fn apply_create_task_defaults_to_first_root_list() {
        let mut seeded = seeded();
        let action = AssistantAction::CreateTask {
            title: "Plan sprint".into(),
            description: "two weeks".into(),
            priority: None,
            list_id: None,
        };
        let task = action.apply(&mut seeded.board, None, &stamp()).unwrap();
        assert_eq!(task.list_id, seeded.inbox);
        assert_eq!(task.priority, Priority::Medium);

        let task = action
            .apply(&mut seeded.board, Some(&seeded.backlog), &stamp())
            .unwrap();
        assert_eq!(task.list_id, seeded.backlog);
    }

    #[test]
    fn apply_resolves_titles_and_users() {
        let mut seeded = seeded();
        let id = add_task(&mut seeded.board, &seeded.inbox, "Update Docs");
        let ada = add_user(&mut seeded.board, "Ada", Role::Member);

        let status = AssistantAction::UpdateTaskStatus {
            task: "update docs".into(),
            status: TaskStatus::InProgress,
        };
        assert_eq!(
            status.apply(&mut seeded.board, None, &stamp()).unwrap().status,
            TaskStatus::InProgress
        );

        let assign = AssistantAction::AssignTask {
            task: id.clone(),
            assignee: "ada@example.com".into(),
        };
        let task = assign.apply(&mut seeded.board, None, &stamp()).unwrap();
        assert_eq!(task.assignee_id.as_deref(), Some(ada.as_str()));
    }

    #[test]
    fn resolve_task_reports_ambiguity() {
        let mut seeded = seeded();
        add_task(&mut seeded.board, &seeded.inbox, "Standup");
        add_task(&mut seeded.board, &seeded.backlog, "standup");
        assert_eq!(
            resolve_task(&seeded.board, "STANDUP").unwrap_err().code(),
            "invalid_input"
        );
        assert_eq!(
            resolve_task(&seeded.board, "retro").unwrap_err().code(),
            "not_found"
        );
    }

    #[test]
    fn resolve_task_folds_non_ascii_titles() {
        let mut seeded = seeded();
        let id = add_task(&mut seeded.board, &seeded.inbox, "Überprüfung Ärzte");
        assert_eq!(resolve_task(&seeded.board, "überprüfung ärzte").unwrap().id, id);
        assert_eq!(resolve_task(&seeded.board, "ÜBERPRÜFUNG ÄRZTE").unwrap().id, id);
    }
}
