//! Read-only slices of the board: filtered task lists, kanban columns,
//! the calendar month grid and the sidebar tree.

use crate::board::Board;
use crate::dates;
use crate::error::AppError;
use crate::model::{Folder, List, Priority, Task, TaskStatus, Workspace};
use crate::reorder::SidebarEntry;
use std::cmp::Ordering;
use time::{Date, Month};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub list_id: Option<String>,
    pub workspace_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<String>,
    pub search: Option<String>,
    pub due_before: Option<String>,
}

impl TaskFilter {
    pub fn for_list(list_id: impl Into<String>) -> Self {
        Self {
            list_id: Some(list_id.into()),
            ..Self::default()
        }
    }
}

/// Applies the filter and orders by due date (undated last), then creation.
pub fn filter_tasks<'a>(board: &'a Board, filter: &TaskFilter) -> Result<Vec<&'a Task>, AppError> {
    let due_before = filter.due_before.as_deref().map(dates::parse_date).transpose()?;
    let needle = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let workspace_lists: Option<Vec<&str>> = filter.workspace_id.as_deref().map(|ws| {
        board
            .lists
            .iter()
            .filter(|l| l.workspace_id == ws)
            .map(|l| l.id.as_str())
            .collect()
    });

    let mut selected = Vec::new();
    for task in &board.tasks {
        if filter.list_id.as_deref().is_some_and(|id| id != task.list_id) {
            continue;
        }
        if let Some(lists) = &workspace_lists
            && !lists.contains(&task.list_id.as_str())
        {
            continue;
        }
        if filter.status.is_some_and(|s| s != task.status) {
            continue;
        }
        if filter.priority.is_some_and(|p| p != task.priority) {
            continue;
        }
        if let Some(assignee) = filter.assignee_id.as_deref()
            && task.assignee_id.as_deref() != Some(assignee)
        {
            continue;
        }
        if let Some(needle) = needle.as_deref() {
            let haystack = format!("{} {}", task.title, task.description).to_lowercase();
            if !haystack.contains(needle) {
                continue;
            }
        }
        if let Some(limit) = due_before {
            let Some(due) = task.due_date.as_deref() else {
                continue;
            };
            if dates::parse_date(due)? >= limit {
                continue;
            }
        }
        selected.push(task);
    }

    selected.sort_by(|a, b| compare_due(a, b).then_with(|| a.created_at.cmp(&b.created_at)));
    Ok(selected)
}

fn compare_due(a: &Task, b: &Task) -> Ordering {
    match (a.due_date.as_deref(), b.due_date.as_deref()) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumn<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

/// Kanban columns in Todo, In Progress, Done order.
pub fn board_columns<'a>(board: &'a Board, filter: &TaskFilter) -> Result<Vec<BoardColumn<'a>>, AppError> {
    let tasks = filter_tasks(board, filter)?;
    Ok(TaskStatus::ALL
        .iter()
        .map(|status| BoardColumn {
            status: *status,
            tasks: tasks.iter().copied().filter(|t| t.status == *status).collect(),
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay<'a> {
    pub date: Date,
    pub in_month: bool,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMonth<'a> {
    pub year: i32,
    pub month: Month,
    pub weeks: Vec<[CalendarDay<'a>; 7]>,
}

/// Parses `YYYY-MM`.
pub fn parse_month(raw: &str) -> Result<(i32, Month), AppError> {
    let trimmed = raw.trim();
    let invalid = || AppError::invalid_input(format!("month must be YYYY-MM, got '{trimmed}'"));
    let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;
    Ok((year, month))
}

/// Sunday-first month grid; leading and trailing days from neighbouring
/// months fill the first and last weeks.
pub fn calendar_month<'a>(
    board: &'a Board,
    year: i32,
    month: Month,
    filter: &TaskFilter,
) -> Result<CalendarMonth<'a>, AppError> {
    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|err| AppError::invalid_input(err.to_string()))?;
    let lead = first.weekday().number_days_from_sunday() as i64;
    let mut cursor = dates::add_days(first, -lead)?;

    let tasks = filter_tasks(board, filter)?;
    let mut dated = Vec::with_capacity(tasks.len());
    for task in tasks {
        if let Some(due) = task.due_date.as_deref() {
            dated.push((dates::parse_date(due)?, task));
        }
    }

    let mut weeks = Vec::new();
    loop {
        let mut days = [cursor; 7];
        for (offset, day) in days.iter_mut().enumerate() {
            *day = dates::add_days(cursor, offset as i64)?;
        }
        weeks.push(days.map(|date| CalendarDay {
            date,
            in_month: date.month() == month && date.year() == year,
            tasks: dated
                .iter()
                .filter(|(due, _)| *due == date)
                .map(|(_, task)| *task)
                .collect(),
        }));
        cursor = dates::add_days(cursor, 7)?;
        if cursor.month() != month {
            break;
        }
    }

    Ok(CalendarMonth { year, month, weeks })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarNode<'a> {
    Folder {
        folder: &'a Folder,
        lists: Vec<(&'a List, usize)>,
    },
    List {
        list: &'a List,
        task_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarWorkspace<'a> {
    pub workspace: &'a Workspace,
    pub children: Vec<SidebarNode<'a>>,
}

/// Workspaces in order, each with interleaved folders and root lists.
pub fn sidebar_tree(board: &Board) -> Vec<SidebarWorkspace<'_>> {
    let count = |list_id: &str| board.tasks.iter().filter(|t| t.list_id == list_id).count();
    let mut workspaces: Vec<&Workspace> = board.workspaces.iter().collect();
    workspaces.sort_by_key(|w| w.order);

    workspaces
        .into_iter()
        .map(|workspace| {
            let children = board
                .root_sequence(&workspace.id)
                .into_iter()
                .filter_map(|entry| match entry {
                    SidebarEntry::Folder(id) => {
                        let folder = board.folders.iter().find(|f| f.id == id)?;
                        let lists = board
                            .folder_sequence(&id)
                            .into_iter()
                            .filter_map(|list_id| board.lists.iter().find(|l| l.id == list_id))
                            .map(|list| (list, count(&list.id)))
                            .collect();
                        Some(SidebarNode::Folder { folder, lists })
                    }
                    SidebarEntry::List(id) => {
                        let list = board.lists.iter().find(|l| l.id == id)?;
                        Some(SidebarNode::List {
                            list,
                            task_count: count(&list.id),
                        })
                    }
                })
                .collect();
            SidebarWorkspace {
                workspace,
                children,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        SidebarNode, TaskFilter, board_columns, calendar_month, filter_tasks, parse_month,
        sidebar_tree,
    };
    use crate::board::fixtures::{add_task, add_user, seeded, stamp};
    use crate::board::{NewTask, TaskPatch};
    use crate::model::{Priority, Role, TaskStatus};
    use time::{Month, Weekday};

    fn dated(board: &mut crate::board::Board, list: &str, title: &str, due: &str) -> String {
        let mut new = NewTask::new(title, list);
        new.due_date = Some(due.to_string());
        board.create_task(new, &stamp()).unwrap().id
    }

    #[test]
    fn filter_orders_by_due_date_with_undated_last() {
        let mut seeded = seeded();
        let undated = add_task(&mut seeded.board, &seeded.inbox, "undated");
        let late = dated(&mut seeded.board, &seeded.inbox, "late", "2025-06-20");
        let early = dated(&mut seeded.board, &seeded.inbox, "early", "2025-06-02");

        let ids: Vec<String> = filter_tasks(&seeded.board, &TaskFilter::default())
            .unwrap()
            .into_iter()
            .map(|t| t.id.clone())
            .collect();
        assert_eq!(ids, vec![early, late, undated]);
    }

    #[test]
    fn filter_combines_criteria() {
        let mut seeded = seeded();
        let ada = add_user(&mut seeded.board, "Ada", Role::Member);
        let hit = add_task(&mut seeded.board, &seeded.inbox, "Fix login bug");
        add_task(&mut seeded.board, &seeded.inbox, "Write docs");
        add_task(&mut seeded.board, &seeded.backlog, "Fix flaky test");
        seeded
            .board
            .update_task(
                &hit,
                TaskPatch {
                    priority: Some(Priority::High),
                    assignee_id: Some(Some(ada.clone())),
                    ..TaskPatch::default()
                },
                &stamp(),
            )
            .unwrap();

        let filter = TaskFilter {
            list_id: Some(seeded.inbox.clone()),
            search: Some("FIX".into()),
            priority: Some(Priority::High),
            assignee_id: Some(ada),
            ..TaskFilter::default()
        };
        let tasks = filter_tasks(&seeded.board, &filter).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, hit);
    }

    #[test]
    fn filter_due_before_excludes_undated() {
        let mut seeded = seeded();
        add_task(&mut seeded.board, &seeded.inbox, "undated");
        let soon = dated(&mut seeded.board, &seeded.inbox, "soon", "2025-06-02");
        dated(&mut seeded.board, &seeded.inbox, "later", "2025-08-01");
        let filter = TaskFilter {
            due_before: Some("2025-07-01".into()),
            ..TaskFilter::default()
        };
        let tasks = filter_tasks(&seeded.board, &filter).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, soon);
    }

    #[test]
    fn board_columns_group_by_status() {
        let mut seeded = seeded();
        let a = add_task(&mut seeded.board, &seeded.inbox, "a");
        add_task(&mut seeded.board, &seeded.inbox, "b");
        seeded.board.set_status(&a, TaskStatus::Done, &stamp()).unwrap();

        let columns = board_columns(&seeded.board, &TaskFilter::for_list(&seeded.inbox)).unwrap();
        let sizes: Vec<usize> = columns.iter().map(|c| c.tasks.len()).collect();
        assert_eq!(sizes, vec![1, 0, 1]);
        assert_eq!(columns[2].status, TaskStatus::Done);
    }

    #[test]
    fn calendar_month_builds_sunday_first_grid() {
        let mut seeded = seeded();
        let id = dated(&mut seeded.board, &seeded.inbox, "launch", "2025-06-18");
        dated(&mut seeded.board, &seeded.inbox, "other month", "2025-07-18");

        let month = calendar_month(&seeded.board, 2025, Month::June, &TaskFilter::default()).unwrap();
        // June 2025 starts on a Sunday and spans five weeks.
        assert_eq!(month.weeks.len(), 5);
        assert_eq!(month.weeks[0][0].date.weekday(), Weekday::Sunday);
        assert_eq!(month.weeks[0][0].date.day(), 1);
        let with_tasks: Vec<_> = month
            .weeks
            .iter()
            .flatten()
            .filter(|d| !d.tasks.is_empty())
            .collect();
        assert_eq!(with_tasks.len(), 1);
        assert_eq!(with_tasks[0].tasks[0].id, id);
    }

    #[test]
    fn calendar_month_pads_leading_days() {
        let seeded = seeded();
        let month = calendar_month(&seeded.board, 2025, Month::May, &TaskFilter::default()).unwrap();
        // May 1st 2025 is a Thursday.
        assert!(!month.weeks[0][0].in_month);
        assert_eq!(month.weeks[0][4].date.day(), 1);
        assert!(month.weeks[0][4].in_month);
    }

    #[test]
    fn calendar_month_at_the_end_of_the_calendar_is_an_error() {
        let seeded = seeded();
        let november =
            calendar_month(&seeded.board, 9999, Month::November, &TaskFilter::default()).unwrap();
        assert!(november.weeks.len() >= 5);

        let err = calendar_month(&seeded.board, 9999, Month::December, &TaskFilter::default())
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn parse_month_validates_input() {
        assert_eq!(parse_month("2025-02").unwrap(), (2025, Month::February));
        assert_eq!(parse_month("2025-13").unwrap_err().code(), "invalid_input");
        assert_eq!(parse_month("June").unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn sidebar_tree_interleaves_folders_and_root_lists() {
        let mut seeded = seeded();
        add_task(&mut seeded.board, &seeded.backlog, "one");
        let tree = sidebar_tree(&seeded.board);
        assert_eq!(tree.len(), 1);
        match &tree[0].children[..] {
            [SidebarNode::Folder { folder, lists }, SidebarNode::List { list, task_count }] => {
                assert_eq!(folder.name, "Product");
                assert_eq!(lists.len(), 1);
                assert_eq!(lists[0].1, 1);
                assert_eq!(list.name, "Inbox");
                assert_eq!(*task_count, 0);
            }
            other => panic!("unexpected sidebar: {other:?}"),
        }
    }
}
