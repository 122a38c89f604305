use super::{Board, Stamp, require_id, require_text};
use crate::dates;
use crate::error::AppError;
use crate::model::{Attachment, Priority, Subtask, Task, TaskStatus};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub list_id: String,
    pub description: String,
    pub status: Option<TaskStatus>,
    pub priority: Priority,
    pub assignee_id: Option<String>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub subtasks: Vec<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, list_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            list_id: list_id.into(),
            ..Self::default()
        }
    }
}

/// Field edits; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub start_date: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub assignee_id: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self == &TaskPatch::default()
    }
}

impl Board {
    pub fn create_task(&mut self, new: NewTask, stamp: &Stamp) -> Result<Task, AppError> {
        let title = require_text(&new.title, "title")?;
        let list_id = self.list(&new.list_id)?.id.clone();
        let assignee_id = match new.assignee_id.as_deref() {
            Some(user_id) => Some(self.user(user_id)?.id.clone()),
            None => None,
        };
        let (start_date, due_date) =
            validate_dates(new.start_date.as_deref(), new.due_date.as_deref())?;

        let mut subtasks = Vec::new();
        for raw in &new.subtasks {
            let title = raw.trim();
            if title.is_empty() {
                continue;
            }
            subtasks.push(Subtask {
                id: self.fresh_id("sub"),
                title: title.to_string(),
                completed: false,
            });
        }

        let task = Task {
            id: self.fresh_id("task"),
            title,
            description: new.description.trim().to_string(),
            status: new.status.unwrap_or(TaskStatus::Todo),
            priority: new.priority,
            assignee_id: assignee_id.clone(),
            start_date,
            due_date,
            list_id,
            subtasks,
            comments: Vec::new(),
            attachments: Vec::new(),
            dependencies: Vec::new(),
            activity: Vec::new(),
            created_at: stamp.at.clone(),
            updated_at: None,
        };
        let id = task.id.clone();
        self.tasks.push(task);
        self.record(&id, stamp, "created task")?;
        if let Some(user_id) = assignee_id.as_deref() {
            self.notify_assignment(&id, user_id, stamp)?;
        }
        debug!(task = %id, "created task");
        self.task(&id).cloned()
    }

    pub fn update_task(
        &mut self,
        id: &str,
        patch: TaskPatch,
        stamp: &Stamp,
    ) -> Result<Task, AppError> {
        if patch.is_empty() {
            return Err(AppError::invalid_input("nothing to update"));
        }
        let current = self.task(id)?.clone();
        let id = current.id.as_str();
        let mut messages = Vec::new();

        let title = match patch.title.as_deref() {
            Some(raw) => Some(require_text(raw, "title")?),
            None => None,
        };

        let start_input = match &patch.start_date {
            Some(value) => value.clone(),
            None => current.start_date.clone(),
        };
        let due_input = match &patch.due_date {
            Some(value) => value.clone(),
            None => current.due_date.clone(),
        };
        let (start_date, due_date) = validate_dates(start_input.as_deref(), due_input.as_deref())?;

        if let Some(Some(user_id)) = patch.assignee_id.as_ref() {
            self.user(user_id)?;
        }

        {
            let task = self.task_mut(id)?;
            if let Some(title) = title
                && title != task.title
            {
                messages.push(format!("renamed to \"{title}\""));
                task.title = title;
            }
            if let Some(description) = patch.description.as_deref() {
                let description = description.trim().to_string();
                if description != task.description {
                    messages.push("updated description".to_string());
                    task.description = description;
                }
            }
            if let Some(priority) = patch.priority
                && priority != task.priority
            {
                messages.push(format!(
                    "priority changed from {} to {}",
                    task.priority.label(),
                    priority.label()
                ));
                task.priority = priority;
            }
            if start_date != task.start_date {
                messages.push(match start_date.as_deref() {
                    Some(date) => format!("start date set to {date}"),
                    None => "start date cleared".to_string(),
                });
                task.start_date = start_date;
            }
            if due_date != task.due_date {
                messages.push(match due_date.as_deref() {
                    Some(date) => format!("due date set to {date}"),
                    None => "due date cleared".to_string(),
                });
                task.due_date = due_date;
            }
        }

        for message in messages {
            self.record(id, stamp, message)?;
        }
        if let Some(assignee) = patch.assignee_id {
            self.assign_task(id, assignee.as_deref(), stamp)?;
        }
        self.task(id).cloned()
    }

    pub fn set_status(
        &mut self,
        id: &str,
        status: TaskStatus,
        stamp: &Stamp,
    ) -> Result<Task, AppError> {
        let task = self.task_mut(id)?;
        let previous = task.status;
        let id = task.id.clone();
        if previous != status {
            task.status = status;
            self.record(
                &id,
                stamp,
                format!("status changed from {} to {}", previous.label(), status.label()),
            )?;
            debug!(task = %id, from = previous.as_str(), to = status.as_str(), "status changed");
        }
        self.task(&id).cloned()
    }

    pub fn assign_task(
        &mut self,
        id: &str,
        user_id: Option<&str>,
        stamp: &Stamp,
    ) -> Result<Task, AppError> {
        let assignee = match user_id {
            Some(user_id) => Some(self.user(user_id)?.id.clone()),
            None => None,
        };
        let task = self.task_mut(id)?;
        let id = task.id.clone();
        if task.assignee_id == assignee {
            return Ok(task.clone());
        }
        task.assignee_id = assignee.clone();
        match assignee.as_deref() {
            Some(user_id) => {
                let name = self.user_name(user_id);
                self.record(&id, stamp, format!("assigned to {name}"))?;
                self.notify_assignment(&id, user_id, stamp)?;
            }
            None => self.record(&id, stamp, "unassigned")?,
        }
        self.task(&id).cloned()
    }

    pub fn move_task(&mut self, id: &str, list_id: &str, stamp: &Stamp) -> Result<Task, AppError> {
        let list = self.list(list_id)?.clone();
        let task = self.task_mut(id)?;
        let id = task.id.clone();
        if task.list_id != list.id {
            task.list_id = list.id.clone();
            self.record(&id, stamp, format!("moved to list {}", list.name))?;
        }
        self.task(&id).cloned()
    }

    /// Removes the task and scrubs every reference to it from other tasks'
    /// dependency lists and from notifications.
    pub fn delete_task(&mut self, id: &str) -> Result<Task, AppError> {
        let id = self.task(id)?.id.clone();
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::not_found(format!("task not found: {id}")))?;
        let removed = self.tasks.remove(index);
        self.scrub_task_references(&[removed.id.clone()]);
        Ok(removed)
    }

    pub(crate) fn remove_tasks_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Task) -> bool,
    {
        let removed: Vec<String> = self
            .tasks
            .iter()
            .filter(|task| predicate(task))
            .map(|task| task.id.clone())
            .collect();
        if removed.is_empty() {
            return 0;
        }
        self.tasks.retain(|task| !removed.contains(&task.id));
        self.scrub_task_references(&removed);
        removed.len()
    }

    fn scrub_task_references(&mut self, removed: &[String]) {
        for task in &mut self.tasks {
            task.dependencies.retain(|dep| !removed.contains(dep));
        }
        self.notifications.retain(|notification| {
            notification
                .task_id
                .as_ref()
                .is_none_or(|task_id| !removed.contains(task_id))
        });
    }

    pub fn add_subtask(&mut self, task_id: &str, title: &str, stamp: &Stamp) -> Result<Subtask, AppError> {
        let title = require_text(title, "subtask title")?;
        let subtask = Subtask {
            id: self.fresh_id("sub"),
            title,
            completed: false,
        };
        let task = self.task_mut(task_id)?;
        let task_id = task.id.clone();
        task.subtasks.push(subtask.clone());
        self.record(&task_id, stamp, format!("added subtask \"{}\"", subtask.title))?;
        Ok(subtask)
    }

    pub fn toggle_subtask(
        &mut self,
        task_id: &str,
        subtask_id: &str,
        stamp: &Stamp,
    ) -> Result<Subtask, AppError> {
        let subtask_id = require_id(subtask_id)?;
        let task = self.task_mut(task_id)?;
        let task_id = task.id.clone();
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|s| s.id == subtask_id)
            .ok_or_else(|| AppError::not_found(format!("subtask not found: {subtask_id}")))?;
        subtask.completed = !subtask.completed;
        let toggled = subtask.clone();
        let verb = if toggled.completed { "completed" } else { "reopened" };
        self.record(&task_id, stamp, format!("{verb} subtask \"{}\"", toggled.title))?;
        Ok(toggled)
    }

    pub fn remove_subtask(
        &mut self,
        task_id: &str,
        subtask_id: &str,
        stamp: &Stamp,
    ) -> Result<Subtask, AppError> {
        let subtask_id = require_id(subtask_id)?;
        let task = self.task_mut(task_id)?;
        let task_id = task.id.clone();
        let index = task
            .subtasks
            .iter()
            .position(|s| s.id == subtask_id)
            .ok_or_else(|| AppError::not_found(format!("subtask not found: {subtask_id}")))?;
        let removed = task.subtasks.remove(index);
        self.record(&task_id, stamp, format!("removed subtask \"{}\"", removed.title))?;
        Ok(removed)
    }

    pub fn add_attachment(
        &mut self,
        task_id: &str,
        name: &str,
        url: &str,
        size_bytes: u64,
        stamp: &Stamp,
    ) -> Result<Attachment, AppError> {
        let name = require_text(name, "attachment name")?;
        let url = require_text(url, "attachment url")?;
        let attachment = Attachment {
            id: self.fresh_id("file"),
            name,
            url,
            size_bytes,
            added_at: stamp.at.clone(),
        };
        let task = self.task_mut(task_id)?;
        let task_id = task.id.clone();
        task.attachments.push(attachment.clone());
        self.record(&task_id, stamp, format!("attached {}", attachment.name))?;
        Ok(attachment)
    }

    pub fn remove_attachment(
        &mut self,
        task_id: &str,
        attachment_id: &str,
        stamp: &Stamp,
    ) -> Result<Attachment, AppError> {
        let attachment_id = require_id(attachment_id)?;
        let task = self.task_mut(task_id)?;
        let task_id = task.id.clone();
        let index = task
            .attachments
            .iter()
            .position(|a| a.id == attachment_id)
            .ok_or_else(|| AppError::not_found(format!("attachment not found: {attachment_id}")))?;
        let removed = task.attachments.remove(index);
        self.record(&task_id, stamp, format!("removed attachment {}", removed.name))?;
        Ok(removed)
    }
}

/// Normalizes both dates and checks that the start is not after the due date.
pub(crate) fn validate_dates(
    start: Option<&str>,
    due: Option<&str>,
) -> Result<(Option<String>, Option<String>), AppError> {
    let start = start.filter(|s| !s.trim().is_empty()).map(dates::parse_date).transpose()?;
    let due = due.filter(|s| !s.trim().is_empty()).map(dates::parse_date).transpose()?;
    if let (Some(start), Some(due)) = (start, due)
        && start > due
    {
        return Err(AppError::invalid_input("start date must not be after due date"));
    }
    Ok((
        start.map(dates::format_date).transpose()?,
        due.map(dates::format_date).transpose()?,
    ))
}
