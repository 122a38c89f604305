pub mod ai;
pub mod board;
pub mod config;
pub mod dates;
pub mod error;
pub mod gantt;
pub mod model;
pub mod notify;
pub mod permissions;
pub mod reorder;
pub mod storage;
pub mod task_api;
pub mod views;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Priority, Task, TaskStatus};

    #[test]
    fn task_deserializes_with_defaults() {
        let raw = r#"{
            "id": "task-1",
            "title": "demo",
            "list_id": "list-1",
            "created_at": "2025-12-20T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();

        assert_eq!(task.id, "task-1");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.due_date.is_none());
        assert!(task.dependencies.is_empty());
        assert!(task.activity.is_empty());
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing title");
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.to_string(), "invalid_input - missing title");
    }
}
