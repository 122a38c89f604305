pub mod output;

use clap::{Args, Parser, Subcommand, ValueEnum};
use taskflow_core::config::ConfigOverrides;
use taskflow_core::error::AppError;
use taskflow_core::gantt::DragMode;
use taskflow_core::model::{Priority, Role, TaskStatus};
use taskflow_core::reorder::DropZone;
use taskflow_core::views::TaskFilter;

#[derive(Parser, Debug)]
#[command(name = "taskflow", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Act as this user (id, name or email); overrides `current_user`
    #[arg(long = "as", value_name = "USER", global = true)]
    pub acting_user: Option<String>,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage workspaces
    #[command(subcommand)]
    Workspace(WorkspaceCommand),
    /// Manage folders inside a workspace
    #[command(subcommand)]
    Folder(FolderCommand),
    /// Manage lists
    #[command(subcommand)]
    List(ListCommand),
    /// Create, edit and inspect tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Manage a task's checklist
    #[command(subcommand)]
    Subtask(SubtaskCommand),
    /// Threaded task comments
    #[command(subcommand)]
    Comment(CommentCommand),
    /// Task attachments
    #[command(subcommand)]
    Attach(AttachCommand),
    /// Task dependencies
    #[command(subcommand)]
    Dep(DepCommand),
    /// Manage users and roles
    #[command(subcommand)]
    User(UserCommand),
    /// Reusable task templates
    #[command(subcommand)]
    Template(TemplateCommand),
    /// In-app notifications
    #[command(subcommand)]
    Notifications(NotificationsCommand),
    /// Send desktop notifications for overdue or high-priority tasks
    ///
    /// Example: taskflow notify
    Notify,
    /// List tasks matching a filter
    ///
    /// Example: taskflow tasks --status todo --search docs
    Tasks {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Kanban columns by status
    ///
    /// Example: taskflow board --list list-1a2b3c4d
    Board {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Month calendar of due dates
    ///
    /// Example: taskflow calendar 2025-06
    Calendar {
        /// Month as YYYY-MM (defaults to the current month)
        month: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Gantt chart and timeline edits
    #[command(subcommand)]
    Gantt(GanttCommand),
    /// Workspace, folder and list tree
    Sidebar,
    /// Generative assistant helpers
    #[command(subcommand)]
    Ai(AiCommand),
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub list: Option<String>,
    #[arg(long)]
    pub workspace: Option<String>,
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<Priority>,
    /// Assignee user id
    #[arg(long)]
    pub assignee: Option<String>,
    /// Case-insensitive text in title or description
    #[arg(long)]
    pub search: Option<String>,
    /// Only tasks due strictly before YYYY-MM-DD
    #[arg(long, value_name = "DATE")]
    pub due_before: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> TaskFilter {
        TaskFilter {
            list_id: self.list.clone(),
            workspace_id: self.workspace.clone(),
            status: self.status,
            priority: self.priority,
            assignee_id: self.assignee.clone(),
            search: self.search.clone(),
            due_before: self.due_before.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommand {
    /// Example: taskflow workspace add "Acme"
    Add { name: String },
    Rename { id: String, name: String },
    /// Deletes the workspace with its folders, lists and tasks
    Delete { id: String },
    List,
}

#[derive(Subcommand, Debug)]
pub enum FolderCommand {
    /// Example: taskflow folder add ws-1a2b3c4d "Product"
    Add { workspace: String, name: String },
    Rename { id: String, name: String },
    /// Deletes the folder with its lists and their tasks
    Delete { id: String },
    /// Reorder a folder relative to another sidebar entry
    ///
    /// Example: taskflow folder move folder-1 folder-2 --zone before
    Move {
        id: String,
        /// Folder or list id to drop onto
        target: String,
        #[arg(long, value_enum, default_value_t = ZoneArg::After)]
        zone: ZoneArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListCommand {
    /// Example: taskflow list add ws-1a2b3c4d "Backlog" --folder folder-1a2b3c4d
    Add {
        workspace: String,
        name: String,
        #[arg(long)]
        folder: Option<String>,
    },
    Rename { id: String, name: String },
    /// Deletes the list and its tasks
    Delete { id: String },
    /// Drag a list onto another list or a folder
    ///
    /// Example: taskflow list move list-1 folder-2 --zone middle
    Move {
        id: String,
        /// Folder or list id to drop onto
        target: String,
        #[arg(long, value_enum, default_value_t = ZoneArg::After)]
        zone: ZoneArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task
    ///
    /// Example: taskflow task add "Write docs" --list list-1a2b3c4d --due 2025-06-30
    Add {
        title: String,
        #[arg(long)]
        list: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_status)]
        status: Option<TaskStatus>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        /// Assignee (id, name or email)
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, value_name = "DATE")]
        start: Option<String>,
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        /// Repeat to add several subtasks
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },
    /// Show a task with its subtasks, comments and activity
    Show { id: String },
    /// Edit task fields
    ///
    /// Example: taskflow task edit task-1 --priority high --clear-due
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        #[arg(long, value_name = "DATE", conflicts_with = "clear_start")]
        start: Option<String>,
        #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_start: bool,
        #[arg(long)]
        clear_due: bool,
    },
    /// Example: taskflow task status task-1 in_progress
    Status {
        id: String,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Assign to a user, or unassign when no user is given
    Assign { id: String, user: Option<String> },
    Move { id: String, list: String },
    /// Delete a task and drop it from other tasks' dependencies
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum SubtaskCommand {
    Add { task: String, title: String },
    Toggle { task: String, subtask: String },
    Remove { task: String, subtask: String },
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    /// Example: taskflow comment add task-1 "Looks good" --reply-to comment-1
    Add {
        task: String,
        body: String,
        #[arg(long = "reply-to")]
        reply_to: Option<String>,
    },
    /// Deletes the comment and its replies
    Delete { task: String, comment: String },
    Thread { task: String },
}

#[derive(Subcommand, Debug)]
pub enum AttachCommand {
    /// Example: taskflow attach add task-1 spec.pdf https://example.com/spec.pdf --size 2048
    Add {
        task: String,
        name: String,
        url: String,
        #[arg(long, default_value_t = 0)]
        size: u64,
    },
    Remove { task: String, attachment: String },
}

#[derive(Subcommand, Debug)]
pub enum DepCommand {
    /// Make TASK wait on ON
    ///
    /// Example: taskflow dep add task-build task-design
    Add { task: String, on: String },
    Remove { task: String, on: String },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Example: taskflow user add "Ada" ada@example.com --role admin
    Add {
        name: String,
        email: String,
        #[arg(long, value_parser = parse_role, default_value = "member")]
        role: Role,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Role {
        id: String,
        #[arg(value_parser = parse_role)]
        role: Role,
    },
    /// Removes the user and unassigns their tasks
    Delete { id: String },
    List,
    /// Show the acting user and their permissions
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Example: taskflow template save task-1 "Release checklist"
    Save { task: String, name: String },
    /// Example: taskflow template use tpl-1 --list list-1
    Use {
        template: String,
        #[arg(long)]
        list: String,
    },
    Delete { id: String },
    List,
}

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    List {
        #[arg(long)]
        unread: bool,
    },
    Read { id: String },
    ReadAll,
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum GanttCommand {
    /// Example: taskflow gantt show --workspace ws-1 --svg
    Show {
        #[command(flatten)]
        filter: FilterArgs,
        /// Emit an SVG document instead of text rows
        #[arg(long)]
        svg: bool,
    },
    /// Drag a bar by a pixel offset; snaps to whole days
    ///
    /// Example: taskflow gantt drag task-1 -- -80 --mode move
    Drag {
        id: String,
        #[arg(allow_negative_numbers = true)]
        delta_px: f64,
        #[arg(long, value_enum, default_value_t = DragArg::Move)]
        mode: DragArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum AiCommand {
    /// Example: taskflow ai subtasks task-1 --save
    Subtasks {
        task: String,
        #[arg(long)]
        save: bool,
    },
    Describe {
        task: String,
        #[arg(long)]
        save: bool,
    },
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    Risks {
        #[command(flatten)]
        filter: FilterArgs,
    },
    Replies { task: String },
    /// Example: taskflow ai chat "move the docs task to done"
    Chat {
        message: String,
        /// List for tasks the assistant creates
        #[arg(long)]
        list: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ZoneArg {
    Before,
    Middle,
    After,
}

impl From<ZoneArg> for DropZone {
    fn from(zone: ZoneArg) -> Self {
        match zone {
            ZoneArg::Before => DropZone::Before,
            ZoneArg::Middle => DropZone::Middle,
            ZoneArg::After => DropZone::After,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DragArg {
    Move,
    Start,
    End,
}

impl From<DragArg> for DragMode {
    fn from(mode: DragArg) -> Self {
        match mode {
            DragArg::Move => DragMode::Move,
            DragArg::Start => DragMode::ResizeStart,
            DragArg::End => DragMode::ResizeEnd,
        }
    }
}

fn parse_status(raw: &str) -> Result<TaskStatus, String> {
    raw.parse().map_err(|err: AppError| err.message().to_string())
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    raw.parse().map_err(|err: AppError| err.message().to_string())
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse().map_err(|err: AppError| err.message().to_string())
}

/// Parse raw `KEY=VALUE` override strings into typed overrides.
pub fn parse_config_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let (key, value) = entry
            .trim()
            .split_once('=')
            .ok_or_else(|| AppError::invalid_input("override must be in KEY=VALUE format"))?;
        if key.trim().is_empty() {
            return Err(AppError::invalid_input("override key cannot be empty"));
        }
        overrides.apply(key, value)?;
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, GanttCommand, TaskCommand, parse_config_overrides};
    use clap::Parser;
    use taskflow_core::model::{Priority, TaskStatus};

    #[test]
    fn parse_config_overrides_canonicalizes_keys() {
        let parsed =
            parse_config_overrides(&[" AI.Model = gemini-pro ".into(), "gantt-day-width=20".into()])
                .unwrap();
        assert_eq!(parsed.ai_model.as_deref(), Some("gemini-pro"));
        assert_eq!(parsed.gantt_day_width, Some(20.0));
    }

    #[test]
    fn parse_config_overrides_rejects_unknown_fields() {
        let err = parse_config_overrides(&["unknown.field=value".into()]).unwrap_err();
        assert!(err.message().contains("unknown config override"));
    }

    #[test]
    fn parse_config_overrides_rejects_missing_equals() {
        let err = parse_config_overrides(&["aimodel".into()]).unwrap_err();
        assert!(err.message().contains("KEY=VALUE"));
    }

    #[test]
    fn parse_config_overrides_rejects_empty_key() {
        let err = parse_config_overrides(&[" =x".into()]).unwrap_err();
        assert!(err.message().contains("cannot be empty"));
    }

    #[test]
    fn task_add_parses_enums_and_repeated_subtasks() {
        let cli = Cli::try_parse_from([
            "taskflow",
            "task",
            "add",
            "Ship it",
            "--list",
            "list-1",
            "--priority",
            "urgent",
            "--status",
            "doing",
            "--subtask",
            "a",
            "--subtask",
            "b",
        ])
        .unwrap();
        match cli.command {
            Command::Task(TaskCommand::Add {
                priority,
                status,
                subtasks,
                ..
            }) => {
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(status, Some(TaskStatus::InProgress));
                assert_eq!(subtasks, vec!["a", "b"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn gantt_drag_accepts_negative_offsets() {
        let cli = Cli::try_parse_from(["taskflow", "gantt", "drag", "task-1", "-80"]).unwrap();
        match cli.command {
            Command::Gantt(GanttCommand::Drag { delta_px, .. }) => assert_eq!(delta_px, -80.0),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["taskflow", "sidebar", "--json", "--as", "user-1"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.acting_user.as_deref(), Some("user-1"));
    }

    #[test]
    fn invalid_status_is_rejected() {
        assert!(Cli::try_parse_from(["taskflow", "task", "status", "task-1", "blocked"]).is_err());
    }
}
