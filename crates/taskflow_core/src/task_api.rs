//! Persistent entry points: every call loads the board from disk, checks the
//! acting user's role, applies one board operation and writes the result
//! back.

use crate::ai::{AiService, AssistantAction, AssistantReply, Risk, TextGenerator};
use crate::board::{Board, CommentNode, NewTask, Stamp, TaskPatch};
use crate::error::AppError;
use crate::gantt::{DragMode, GanttConfig};
use crate::model::{
    Attachment, Comment, Folder, List, Notification, Role, Subtask, Task, TaskStatus,
    TaskTemplate, User, Workspace,
};
use crate::notify::{AlertOutcome, Notifier, notifier_from_env, pending_alerts, send_alerts};
use crate::permissions::{Permission, ensure_allowed};
use crate::reorder::{DropTarget, DropZone};
use crate::storage::json_store;
use crate::{dates, views};
use std::path::PathBuf;
use time::Date;
use tracing::debug;

/// The board file plus the user acting on it.
#[derive(Debug, Clone)]
pub struct TaskApi {
    path: PathBuf,
    actor_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantOutcome {
    pub reply: AssistantReply,
    pub task: Option<Task>,
}

impl TaskApi {
    pub fn with_path(path: impl Into<PathBuf>, actor_id: Option<&str>) -> Self {
        Self {
            path: path.into(),
            actor_id: actor_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }

    /// Read access to the whole board for the view layer.
    pub fn snapshot(&self) -> Result<Board, AppError> {
        let board = json_store::load_board(&self.path)?;
        self.check(&board, Permission::View)?;
        Ok(board)
    }

    pub fn whoami(&self) -> Result<Option<User>, AppError> {
        let board = json_store::load_board(&self.path)?;
        self.actor(&board)
    }

    fn actor(&self, board: &Board) -> Result<Option<User>, AppError> {
        match self.actor_id.as_deref() {
            Some(id) => board.user(id).cloned().map(Some).map_err(|_| {
                AppError::not_found(format!("acting user not found: {id}"))
            }),
            None => Ok(None),
        }
    }

    fn check(&self, board: &Board, permission: Permission) -> Result<Option<User>, AppError> {
        let actor = self.actor(board)?;
        ensure_allowed(actor.as_ref(), permission)?;
        Ok(actor)
    }

    fn mutate<T, F>(&self, permission: Permission, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Board, &Stamp) -> Result<T, AppError>,
    {
        let mut board = json_store::load_board(&self.path)?;
        let actor = self.check(&board, permission)?;
        let stamp = Stamp::now(actor.as_ref().map(|user| user.id.as_str()))?;
        let result = op(&mut board, &stamp)?;
        json_store::save_board(&self.path, &board)?;
        debug!(permission = permission.as_str(), path = %self.path.display(), "board saved");
        Ok(result)
    }

    pub fn create_workspace(&self, name: &str) -> Result<Workspace, AppError> {
        self.mutate(Permission::ManageWorkspaces, |board, stamp| {
            board.create_workspace(name, stamp)
        })
    }

    pub fn rename_workspace(&self, id: &str, name: &str) -> Result<Workspace, AppError> {
        self.mutate(Permission::ManageWorkspaces, |board, _| {
            board.rename_workspace(id, name)
        })
    }

    pub fn delete_workspace(&self, id: &str) -> Result<Workspace, AppError> {
        self.mutate(Permission::ManageWorkspaces, |board, _| board.delete_workspace(id))
    }

    pub fn create_folder(&self, workspace_id: &str, name: &str) -> Result<Folder, AppError> {
        self.mutate(Permission::ManageLists, |board, stamp| {
            board.create_folder(workspace_id, name, stamp)
        })
    }

    pub fn rename_folder(&self, id: &str, name: &str) -> Result<Folder, AppError> {
        self.mutate(Permission::ManageLists, |board, _| board.rename_folder(id, name))
    }

    pub fn delete_folder(&self, id: &str) -> Result<Folder, AppError> {
        self.mutate(Permission::ManageLists, |board, _| board.delete_folder(id))
    }

    pub fn move_folder(
        &self,
        id: &str,
        target: &DropTarget,
        zone: DropZone,
    ) -> Result<Folder, AppError> {
        self.mutate(Permission::ManageLists, |board, _| {
            board.move_folder(id, target, zone)
        })
    }

    pub fn create_list(
        &self,
        workspace_id: &str,
        folder_id: Option<&str>,
        name: &str,
    ) -> Result<List, AppError> {
        self.mutate(Permission::ManageLists, |board, stamp| {
            board.create_list(workspace_id, folder_id, name, stamp)
        })
    }

    pub fn rename_list(&self, id: &str, name: &str) -> Result<List, AppError> {
        self.mutate(Permission::ManageLists, |board, _| board.rename_list(id, name))
    }

    pub fn delete_list(&self, id: &str) -> Result<List, AppError> {
        self.mutate(Permission::ManageLists, |board, _| board.delete_list(id))
    }

    pub fn move_list(&self, id: &str, target: &DropTarget, zone: DropZone) -> Result<List, AppError> {
        self.mutate(Permission::ManageLists, |board, _| {
            board.move_list(id, target, zone)
        })
    }

    pub fn create_task(&self, new: NewTask) -> Result<Task, AppError> {
        self.mutate(Permission::CreateTask, |board, stamp| {
            board.create_task(new, stamp)
        })
    }

    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Task, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.update_task(id, patch, stamp)
        })
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<Task, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.set_status(id, status, stamp)
        })
    }

    pub fn assign_task(&self, id: &str, user: Option<&str>) -> Result<Task, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            let user_id = user
                .map(|query| board.find_user(query).map(|u| u.id.clone()))
                .transpose()?;
            board.assign_task(id, user_id.as_deref(), stamp)
        })
    }

    pub fn move_task(&self, id: &str, list_id: &str) -> Result<Task, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.move_task(id, list_id, stamp)
        })
    }

    pub fn delete_task(&self, id: &str) -> Result<Task, AppError> {
        self.mutate(Permission::DeleteTask, |board, _| board.delete_task(id))
    }

    pub fn add_subtask(&self, task_id: &str, title: &str) -> Result<Subtask, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.add_subtask(task_id, title, stamp)
        })
    }

    pub fn toggle_subtask(&self, task_id: &str, subtask_id: &str) -> Result<Subtask, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.toggle_subtask(task_id, subtask_id, stamp)
        })
    }

    pub fn remove_subtask(&self, task_id: &str, subtask_id: &str) -> Result<Subtask, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.remove_subtask(task_id, subtask_id, stamp)
        })
    }

    pub fn add_comment(
        &self,
        task_id: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<Comment, AppError> {
        self.mutate(Permission::Comment, |board, stamp| {
            board.add_comment(task_id, body, parent_id, stamp)
        })
    }

    pub fn delete_comment(&self, task_id: &str, comment_id: &str) -> Result<Vec<Comment>, AppError> {
        self.mutate(Permission::Comment, |board, stamp| {
            board.delete_comment(task_id, comment_id, stamp)
        })
    }

    pub fn comment_thread(&self, task_id: &str) -> Result<Vec<CommentNode>, AppError> {
        self.snapshot()?.comment_thread(task_id)
    }

    pub fn add_attachment(
        &self,
        task_id: &str,
        name: &str,
        url: &str,
        size_bytes: u64,
    ) -> Result<Attachment, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.add_attachment(task_id, name, url, size_bytes, stamp)
        })
    }

    pub fn remove_attachment(&self, task_id: &str, attachment_id: &str) -> Result<Attachment, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.remove_attachment(task_id, attachment_id, stamp)
        })
    }

    pub fn add_dependency(&self, task_id: &str, depends_on: &str) -> Result<Task, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.add_dependency(task_id, depends_on, stamp)
        })
    }

    pub fn remove_dependency(&self, task_id: &str, depends_on: &str) -> Result<Task, AppError> {
        self.mutate(Permission::EditTask, |board, stamp| {
            board.remove_dependency(task_id, depends_on, stamp)
        })
    }

    pub fn apply_drag(
        &self,
        task_id: &str,
        mode: DragMode,
        delta_px: f64,
        config: &GanttConfig,
    ) -> Result<Task, AppError> {
        let offset = dates::local_offset();
        self.mutate(Permission::EditTask, |board, stamp| {
            board.apply_drag(task_id, mode, delta_px, config, offset, stamp)
        })
    }

    pub fn add_user(&self, name: &str, email: &str, role: Role) -> Result<User, AppError> {
        self.mutate(Permission::ManageUsers, |board, stamp| {
            board.add_user(name, email, role, stamp)
        })
    }

    pub fn update_user(
        &self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        self.mutate(Permission::ManageUsers, |board, _| {
            board.update_user(id, name, email)
        })
    }

    pub fn set_role(&self, id: &str, role: Role) -> Result<User, AppError> {
        self.mutate(Permission::ManageUsers, |board, _| board.set_role(id, role))
    }

    pub fn delete_user(&self, id: &str) -> Result<User, AppError> {
        self.mutate(Permission::ManageUsers, |board, stamp| {
            board.delete_user(id, stamp)
        })
    }

    pub fn save_template(&self, task_id: &str, name: &str) -> Result<TaskTemplate, AppError> {
        self.mutate(Permission::CreateTask, |board, _| {
            board.save_template(task_id, name)
        })
    }

    pub fn create_from_template(&self, template_id: &str, list_id: &str) -> Result<Task, AppError> {
        self.mutate(Permission::CreateTask, |board, stamp| {
            board.create_from_template(template_id, list_id, stamp)
        })
    }

    pub fn delete_template(&self, template_id: &str) -> Result<TaskTemplate, AppError> {
        self.mutate(Permission::CreateTask, |board, _| {
            board.delete_template(template_id)
        })
    }

    /// Notifications for the acting user (all of them in single-user mode).
    pub fn notifications(&self, unread_only: bool) -> Result<Vec<Notification>, AppError> {
        let board = self.snapshot()?;
        Ok(board
            .notifications_for(self.actor_id.as_deref(), unread_only)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn mark_read(&self, id: &str) -> Result<Notification, AppError> {
        self.mutate(Permission::View, |board, _| board.mark_read(id))
    }

    pub fn mark_all_read(&self) -> Result<usize, AppError> {
        let user = self.actor_id.clone();
        self.mutate(Permission::View, |board, _| {
            Ok(board.mark_all_read(user.as_deref()))
        })
    }

    pub fn clear_notifications(&self) -> Result<usize, AppError> {
        let user = self.actor_id.clone();
        self.mutate(Permission::View, |board, _| {
            Ok(board.clear_notifications(user.as_deref()))
        })
    }

    pub fn notify_pending(&self) -> Result<AlertOutcome, AppError> {
        let notifier = notifier_from_env()?;
        self.notify_pending_with(notifier.as_ref(), dates::local_today())
    }

    pub fn notify_pending_with(
        &self,
        notifier: &dyn Notifier,
        today: Date,
    ) -> Result<AlertOutcome, AppError> {
        let board = self.snapshot()?;
        let alerts = pending_alerts(&board, today);
        Ok(send_alerts(notifier, &alerts))
    }

    /// Drafts subtasks with the model; `save` appends them to the task.
    pub fn draft_subtasks<G: TextGenerator>(
        &self,
        ai: &AiService<G>,
        task_id: &str,
        save: bool,
    ) -> Result<Vec<String>, AppError> {
        let task = self.snapshot()?.task(task_id)?.clone();
        let drafted = ai.generate_subtasks(&task);
        if save && !drafted.is_empty() {
            self.mutate(Permission::EditTask, |board, stamp| {
                for title in &drafted {
                    board.add_subtask(&task.id, title, stamp)?;
                }
                Ok(())
            })?;
        }
        Ok(drafted)
    }

    /// Drafts a description; `save` replaces the task's description.
    pub fn draft_description<G: TextGenerator>(
        &self,
        ai: &AiService<G>,
        task_id: &str,
        save: bool,
    ) -> Result<String, AppError> {
        let task = self.snapshot()?.task(task_id)?.clone();
        let drafted = ai.generate_description(&task);
        if save && !drafted.is_empty() {
            let patch = TaskPatch {
                description: Some(drafted.clone()),
                ..TaskPatch::default()
            };
            self.update_task(&task.id, patch)?;
        }
        Ok(drafted)
    }

    pub fn project_summary<G: TextGenerator>(
        &self,
        ai: &AiService<G>,
        filter: &views::TaskFilter,
    ) -> Result<String, AppError> {
        let board = self.snapshot()?;
        let tasks = views::filter_tasks(&board, filter)?;
        Ok(ai.project_summary(&tasks))
    }

    pub fn risk_analysis<G: TextGenerator>(
        &self,
        ai: &AiService<G>,
        filter: &views::TaskFilter,
        today: Date,
    ) -> Result<Vec<Risk>, AppError> {
        let board = self.snapshot()?;
        let tasks = views::filter_tasks(&board, filter)?;
        let open: Vec<&Task> = tasks.into_iter().filter(|task| !task.is_done()).collect();
        Ok(ai.risk_analysis(&open, &dates::format_date(today)?))
    }

    pub fn suggest_replies<G: TextGenerator>(
        &self,
        ai: &AiService<G>,
        task_id: &str,
    ) -> Result<Vec<String>, AppError> {
        let board = self.snapshot()?;
        Ok(ai.suggest_replies(board.task(task_id)?))
    }

    /// One assistant turn; a requested action is applied under the
    /// permission it needs.
    pub fn assistant<G: TextGenerator>(
        &self,
        ai: &AiService<G>,
        message: &str,
        default_list: Option<&str>,
    ) -> Result<AssistantOutcome, AppError> {
        let board = self.snapshot()?;
        let reply = ai.chat(&board, message)?;
        let task = match &reply {
            AssistantReply::Message(_) => None,
            AssistantReply::Action(action) => {
                let permission = match action {
                    AssistantAction::CreateTask { .. } => Permission::CreateTask,
                    _ => Permission::EditTask,
                };
                Some(self.mutate(permission, |board, stamp| {
                    action.apply(board, default_list, stamp)
                })?)
            }
        };
        Ok(AssistantOutcome { reply, task })
    }
}
