//! In-memory store holding every slice of the board.
//!
//! Operations are reducer-style: validate, mutate, stamp, return the
//! affected entity. Persistence and permission checks live in `task_api`.

mod comments;
mod dependencies;
mod hierarchy;
mod notifications;
mod tasks;
mod templates;
mod users;

pub use comments::CommentNode;
pub use tasks::{NewTask, TaskPatch};

use crate::dates;
use crate::error::AppError;
use crate::model::{
    ActivityEntry, Folder, List, Notification, Task, TaskTemplate, User, Workspace,
};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    pub workspaces: Vec<Workspace>,
    pub folders: Vec<Folder>,
    pub lists: Vec<List>,
    pub tasks: Vec<Task>,
    pub users: Vec<User>,
    pub templates: Vec<TaskTemplate>,
    pub notifications: Vec<Notification>,
}

/// Who changed the board and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub at: String,
    pub actor_id: Option<String>,
}

impl Stamp {
    pub fn new(now: OffsetDateTime, actor_id: Option<&str>) -> Result<Self, AppError> {
        Ok(Self {
            at: dates::timestamp(now)?,
            actor_id: actor_id.map(str::to_string),
        })
    }

    pub fn now(actor_id: Option<&str>) -> Result<Self, AppError> {
        Self::new(OffsetDateTime::now_utc(), actor_id)
    }
}

impl Board {
    pub fn task(&self, id: &str) -> Result<&Task, AppError> {
        let id = require_id(id)?;
        self.tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or_else(|| AppError::not_found(format!("task not found: {id}")))
    }

    pub(crate) fn task_mut(&mut self, id: &str) -> Result<&mut Task, AppError> {
        let id = require_id(id)?;
        self.tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| AppError::not_found(format!("task not found: {id}")))
    }

    pub fn workspace(&self, id: &str) -> Result<&Workspace, AppError> {
        let id = require_id(id)?;
        self.workspaces
            .iter()
            .find(|workspace| workspace.id == id)
            .ok_or_else(|| AppError::not_found(format!("workspace not found: {id}")))
    }

    pub fn folder(&self, id: &str) -> Result<&Folder, AppError> {
        let id = require_id(id)?;
        self.folders
            .iter()
            .find(|folder| folder.id == id)
            .ok_or_else(|| AppError::not_found(format!("folder not found: {id}")))
    }

    pub fn list(&self, id: &str) -> Result<&List, AppError> {
        let id = require_id(id)?;
        self.lists
            .iter()
            .find(|list| list.id == id)
            .ok_or_else(|| AppError::not_found(format!("list not found: {id}")))
    }

    pub fn user(&self, id: &str) -> Result<&User, AppError> {
        let id = require_id(id)?;
        self.users
            .iter()
            .find(|user| user.id == id)
            .ok_or_else(|| AppError::not_found(format!("user not found: {id}")))
    }

    pub fn template(&self, id: &str) -> Result<&TaskTemplate, AppError> {
        let id = require_id(id)?;
        self.templates
            .iter()
            .find(|template| template.id == id)
            .ok_or_else(|| AppError::not_found(format!("template not found: {id}")))
    }

    /// Generates `"{prefix}-{8 hex}"`, retrying on the rare collision.
    pub(crate) fn fresh_id(&self, prefix: &str) -> String {
        loop {
            let simple = Uuid::new_v4().simple().to_string();
            let candidate = format!("{prefix}-{}", &simple[..8]);
            if !self.id_taken(&candidate) {
                return candidate;
            }
        }
    }

    fn id_taken(&self, id: &str) -> bool {
        self.workspaces.iter().any(|w| w.id == id)
            || self.folders.iter().any(|f| f.id == id)
            || self.lists.iter().any(|l| l.id == id)
            || self.users.iter().any(|u| u.id == id)
            || self.templates.iter().any(|t| t.id == id)
            || self.notifications.iter().any(|n| n.id == id)
            || self.tasks.iter().any(|task| {
                task.id == id
                    || task.subtasks.iter().any(|s| s.id == id)
                    || task.comments.iter().any(|c| c.id == id)
                    || task.attachments.iter().any(|a| a.id == id)
            })
    }

    /// Appends an activity entry and bumps `updated_at` on the task.
    pub(crate) fn record(
        &mut self,
        task_id: &str,
        stamp: &Stamp,
        message: impl Into<String>,
    ) -> Result<(), AppError> {
        let task = self.task_mut(task_id)?;
        task.activity.push(ActivityEntry {
            at: stamp.at.clone(),
            actor_id: stamp.actor_id.clone(),
            message: message.into(),
        });
        task.updated_at = Some(stamp.at.clone());
        Ok(())
    }

    pub(crate) fn user_name(&self, id: &str) -> String {
        self.users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

pub(crate) fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed)
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}


#[cfg(test)]
mod tests {
    use super::fixtures::{seeded, stamp};
    use super::{Board, require_text};

    #[test]
    fn fresh_ids_carry_prefix_and_are_unique() {
        let board = Board::default();
        let a = board.fresh_id("task");
        let b = board.fresh_id("task");
        assert!(a.starts_with("task-"));
        assert_eq!(a.len(), "task-".len() + 8);
        assert_ne!(a, b);
    }

    #[test]
    fn lookups_report_not_found_and_blank_ids() {
        let seeded = seeded();
        assert_eq!(seeded.board.task("task-nope").unwrap_err().code(), "not_found");
        assert_eq!(seeded.board.task("  ").unwrap_err().code(), "invalid_input");
        assert!(seeded.board.list(&seeded.inbox).is_ok());
    }

    #[test]
    fn record_appends_activity_and_updates_timestamp() {
        let mut seeded = seeded();
        let id = super::fixtures::add_task(&mut seeded.board, &seeded.inbox, "Write docs");
        seeded.board.record(&id, &stamp(), "poked").unwrap();
        let task = seeded.board.task(&id).unwrap();
        assert_eq!(task.activity.last().unwrap().message, "poked");
        assert_eq!(task.updated_at.as_deref(), Some("2025-06-01T09:00:00Z"));
    }

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("  hi ", "title").unwrap(), "hi");
        assert_eq!(require_text(" ", "title").unwrap_err().message(), "title is required");
    }
}
