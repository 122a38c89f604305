//! Plain-text and JSON rendering for command results.

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::Write as _;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskflow_core::board::{Board, CommentNode};
use taskflow_core::error::AppError;
use taskflow_core::gantt::GanttLayout;
use taskflow_core::model::{Notification, Task, TaskTemplate, User, Workspace};
use taskflow_core::views::{BoardColumn, CalendarMonth, SidebarNode, SidebarWorkspace};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string(value)?;
    println!("{rendered}");
    Ok(())
}

fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return "(none)".to_string();
    }
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    table.to_string()
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: &'static str,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Subtasks")]
    subtasks: String,
}

pub fn task_table(board: &Board, tasks: &[&Task]) -> String {
    let rows = tasks
        .iter()
        .map(|task| {
            let (done, total) = task.subtask_progress();
            let status = if board.is_blocked(task) {
                format!("{} (blocked)", task.status.label())
            } else {
                task.status.label().to_string()
            };
            TaskRow {
                id: task.id.clone(),
                title: task.title.clone(),
                status,
                priority: task.priority.label(),
                assignee: assignee_name(board, task),
                due: task.due_date.clone().unwrap_or_else(|| "-".into()),
                subtasks: if total == 0 {
                    "-".into()
                } else {
                    format!("{done}/{total}")
                },
            }
        })
        .collect();
    render_table(rows)
}

fn assignee_name(board: &Board, task: &Task) -> String {
    task.assignee_id
        .as_deref()
        .map(|id| match board.user(id) {
            Ok(user) => user.name.clone(),
            Err(_) => id.to_string(),
        })
        .unwrap_or_else(|| "-".into())
}

pub fn task_detail(board: &Board, task: &Task) -> Result<String, AppError> {
    let mut out = String::new();
    let list = board
        .list(&task.list_id)
        .map(|list| list.name.clone())
        .unwrap_or_else(|_| task.list_id.clone());
    let _ = writeln!(out, "{} ({})", task.title, task.id);
    let _ = writeln!(out, "  list:      {list}");
    let _ = writeln!(out, "  status:    {}", task.status.label());
    let _ = writeln!(out, "  priority:  {}", task.priority.label());
    let _ = writeln!(out, "  assignee:  {}", assignee_name(board, task));
    let _ = writeln!(
        out,
        "  dates:     {} .. {}",
        task.start_date.as_deref().unwrap_or("-"),
        task.due_date.as_deref().unwrap_or("-")
    );
    if !task.description.is_empty() {
        let _ = writeln!(out, "  {}", task.description);
    }
    if !task.dependencies.is_empty() {
        let _ = writeln!(out, "Depends on:");
        for dep in &task.dependencies {
            let state = match board.task(dep) {
                Ok(other) => format!("{} [{}]", other.title, other.status.label()),
                Err(_) => "(missing)".into(),
            };
            let _ = writeln!(out, "  {dep} {state}");
        }
    }
    let dependents = board.dependents(&task.id);
    if !dependents.is_empty() {
        let _ = writeln!(out, "Blocks:");
        for other in dependents {
            let _ = writeln!(out, "  {} {} [{}]", other.id, other.title, other.status.label());
        }
    }
    if !task.subtasks.is_empty() {
        let (done, total) = task.subtask_progress();
        let _ = writeln!(out, "Subtasks ({done}/{total}):");
        for subtask in &task.subtasks {
            let mark = if subtask.completed { "x" } else { " " };
            let _ = writeln!(out, "  [{mark}] {} ({})", subtask.title, subtask.id);
        }
    }
    if !task.attachments.is_empty() {
        let _ = writeln!(out, "Attachments:");
        for attachment in &task.attachments {
            let _ = writeln!(
                out,
                "  {} <{}> {} bytes ({})",
                attachment.name, attachment.url, attachment.size_bytes, attachment.id
            );
        }
    }
    let thread = board.comment_thread(&task.id)?;
    if !thread.is_empty() {
        let _ = writeln!(out, "Comments:");
        out.push_str(&comment_thread(board, &thread));
    }
    if !task.activity.is_empty() {
        let _ = writeln!(out, "Activity:");
        for entry in &task.activity {
            let who = entry
                .actor_id
                .as_deref()
                .map(|id| board.user(id).map(|u| u.name.clone()).unwrap_or_else(|_| id.to_string()))
                .unwrap_or_else(|| "-".into());
            let _ = writeln!(out, "  {} {who}: {}", entry.at, entry.message);
        }
    }
    Ok(out)
}

pub fn comment_thread(board: &Board, thread: &[CommentNode]) -> String {
    let mut out = String::new();
    for node in thread {
        for (depth, comment) in node.depth_first() {
            let author = comment
                .author_id
                .as_deref()
                .map(|id| board.user(id).map(|u| u.name.clone()).unwrap_or_else(|_| id.to_string()))
                .unwrap_or_else(|| "anonymous".into());
            let indent = "  ".repeat(depth + 1);
            let _ = writeln!(out, "{indent}{author}: {} ({})", comment.body, comment.id);
        }
    }
    out
}

pub fn comment_thread_json(thread: &[CommentNode]) -> Value {
    Value::Array(
        thread
            .iter()
            .map(|node| {
                json!({
                    "comment": node.comment,
                    "replies": comment_thread_json(&node.replies),
                })
            })
            .collect(),
    )
}

pub fn board_view(board: &Board, columns: &[BoardColumn<'_>]) -> String {
    let mut out = String::new();
    for column in columns {
        let _ = writeln!(out, "== {} ({}) ==", column.status.label(), column.tasks.len());
        for task in &column.tasks {
            let assignee = assignee_name(board, task);
            let _ = writeln!(
                out,
                "  {} | {} | {} | {}",
                task.id,
                task.title,
                task.priority.label(),
                assignee
            );
        }
    }
    out
}

pub fn board_json(columns: &[BoardColumn<'_>]) -> Value {
    Value::Array(
        columns
            .iter()
            .map(|column| json!({ "status": column.status, "tasks": column.tasks }))
            .collect(),
    )
}

pub fn calendar_view(month: &CalendarMonth<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", month.month, month.year);
    let _ = writeln!(out, " Su  Mo  Tu  We  Th  Fr  Sa");
    for week in &month.weeks {
        for day in week {
            if !day.in_month {
                out.push_str("  . ");
            } else if day.tasks.is_empty() {
                let _ = write!(out, " {:>2} ", day.date.day());
            } else {
                let _ = write!(out, " {:>2}*", day.date.day());
            }
        }
        out.push('\n');
    }
    for day in month.weeks.iter().flatten().filter(|d| d.in_month && !d.tasks.is_empty()) {
        for task in &day.tasks {
            let _ = writeln!(out, "{} {} ({})", day.date, task.title, task.id);
        }
    }
    out
}

pub fn calendar_json(month: &CalendarMonth<'_>) -> Value {
    let days: Vec<Value> = month
        .weeks
        .iter()
        .flatten()
        .filter(|day| day.in_month)
        .map(|day| {
            json!({
                "date": day.date.to_string(),
                "tasks": day.tasks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "year": month.year,
        "month": u8::from(month.month),
        "weeks": month.weeks.len(),
        "days": days,
    })
}

pub fn sidebar_view(tree: &[SidebarWorkspace<'_>]) -> String {
    let mut out = String::new();
    for entry in tree {
        let _ = writeln!(out, "{} ({})", entry.workspace.name, entry.workspace.id);
        for child in &entry.children {
            match child {
                SidebarNode::Folder { folder, lists } => {
                    let _ = writeln!(out, "  [{}] ({})", folder.name, folder.id);
                    for (list, count) in lists {
                        let _ = writeln!(out, "    {} ({}) {count}", list.name, list.id);
                    }
                }
                SidebarNode::List { list, task_count } => {
                    let _ = writeln!(out, "  {} ({}) {task_count}", list.name, list.id);
                }
            }
        }
    }
    out
}

pub fn sidebar_json(tree: &[SidebarWorkspace<'_>]) -> Value {
    Value::Array(
        tree.iter()
            .map(|entry| {
                let children: Vec<Value> = entry
                    .children
                    .iter()
                    .map(|child| match child {
                        SidebarNode::Folder { folder, lists } => json!({
                            "folder": folder,
                            "lists": lists
                                .iter()
                                .map(|(list, count)| json!({ "list": list, "task_count": count }))
                                .collect::<Vec<_>>(),
                        }),
                        SidebarNode::List { list, task_count } => {
                            json!({ "list": list, "task_count": task_count })
                        }
                    })
                    .collect();
                json!({ "workspace": entry.workspace, "children": children })
            })
            .collect(),
    )
}

pub fn gantt_json(layout: &GanttLayout) -> Value {
    json!({
        "timeline_start": layout.timeline_start.map(|date| date.to_string()),
        "days": layout.days,
        "width": layout.width(),
        "height": layout.height(),
        "bars": layout.bars.iter().map(|bar| json!({
            "task_id": bar.task_id,
            "title": bar.title,
            "start": bar.start.to_string(),
            "end": bar.end.to_string(),
            "x": bar.x,
            "y": bar.y,
            "width": bar.width,
            "height": bar.height,
        })).collect::<Vec<_>>(),
        "arrows": layout.arrows.iter().map(|arrow| json!({
            "from": arrow.from_task,
            "to": arrow.to_task,
            "path": arrow.path,
        })).collect::<Vec<_>>(),
    })
}

#[derive(Tabled)]
struct WorkspaceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Order")]
    order: u32,
}

pub fn workspace_table(workspaces: &[&Workspace]) -> String {
    render_table(
        workspaces
            .iter()
            .map(|w| WorkspaceRow {
                id: w.id.clone(),
                name: w.name.clone(),
                order: w.order,
            })
            .collect(),
    )
}

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Role")]
    role: &'static str,
}

pub fn user_table(users: &[User]) -> String {
    render_table(
        users
            .iter()
            .map(|u| UserRow {
                id: u.id.clone(),
                name: u.name.clone(),
                email: u.email.clone(),
                role: u.role.as_str(),
            })
            .collect(),
    )
}

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Subtasks")]
    subtasks: usize,
}

pub fn template_table(templates: &[TaskTemplate]) -> String {
    render_table(
        templates
            .iter()
            .map(|t| TemplateRow {
                id: t.id.clone(),
                name: t.name.clone(),
                title: t.title.clone(),
                subtasks: t.subtasks.len(),
            })
            .collect(),
    )
}

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "")]
    unread: &'static str,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "At")]
    at: String,
}

pub fn notification_table(notifications: &[Notification]) -> String {
    render_table(
        notifications
            .iter()
            .map(|n| NotificationRow {
                id: n.id.clone(),
                unread: if n.read { "" } else { "*" },
                message: n.message.clone(),
                at: n.created_at.clone(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::{calendar_view, sidebar_view, task_detail, task_table};
    use taskflow_core::board::{Board, NewTask, Stamp};
    use taskflow_core::views::{TaskFilter, calendar_month, sidebar_tree};
    use time::Month;
    use time::macros::datetime;

    fn sample() -> (Board, String) {
        let stamp = Stamp::new(datetime!(2025-06-01 09:00 UTC), None).unwrap();
        let mut board = Board::default();
        let ws = board.create_workspace("Acme", &stamp).unwrap().id;
        let list = board.create_list(&ws, None, "Inbox", &stamp).unwrap().id;
        let mut new = NewTask::new("Write docs", &list);
        new.due_date = Some("2025-06-10".into());
        new.subtasks = vec!["outline".into()];
        board.create_task(new, &stamp).unwrap();
        (board, list)
    }

    #[test]
    fn task_table_shows_progress_and_due() {
        let (board, _) = sample();
        let tasks: Vec<_> = board.tasks.iter().collect();
        let table = task_table(&board, &tasks);
        assert!(table.contains("Write docs"));
        assert!(table.contains("0/1"));
        assert!(table.contains("2025-06-10"));
    }

    #[test]
    fn task_detail_lists_both_sides_of_a_dependency() {
        let (mut board, list) = sample();
        let stamp = Stamp::new(datetime!(2025-06-02 09:00 UTC), None).unwrap();
        let docs = board.tasks[0].id.clone();
        let release = board
            .create_task(NewTask::new("Release", &list), &stamp)
            .unwrap()
            .id;
        board.add_dependency(&release, &docs, &stamp).unwrap();

        let blocker = task_detail(&board, board.task(&docs).unwrap()).unwrap();
        assert!(blocker.contains(&format!("Blocks:\n  {release} Release [")));
        assert!(!blocker.contains("Depends on:"));

        let waiting = task_detail(&board, board.task(&release).unwrap()).unwrap();
        assert!(waiting.contains(&format!("Depends on:\n  {docs} Write docs [")));
        assert!(!waiting.contains("Blocks:"));
    }

    #[test]
    fn empty_table_renders_placeholder() {
        let board = Board::default();
        assert_eq!(task_table(&board, &[]), "(none)");
    }

    #[test]
    fn calendar_marks_days_with_tasks() {
        let (board, _) = sample();
        let month = calendar_month(&board, 2025, Month::June, &TaskFilter::default()).unwrap();
        let rendered = calendar_view(&month);
        assert!(rendered.starts_with("June 2025"));
        assert!(rendered.contains(" 10*"));
        assert!(rendered.contains("2025-06-10 Write docs"));
    }

    #[test]
    fn sidebar_lists_task_counts() {
        let (board, list) = sample();
        let rendered = sidebar_view(&sidebar_tree(&board));
        assert!(rendered.contains(&format!("Inbox ({list}) 1")));
    }
}
