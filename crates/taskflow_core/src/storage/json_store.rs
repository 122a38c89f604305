use crate::board::Board;
use crate::error::AppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "board.json";
const STORE_ENV_VAR: &str = "TASKFLOW_STORE_PATH";

#[derive(Debug, Serialize)]
struct StoredBoard<'a> {
    schema_version: u32,
    tasks: &'a [crate::model::Task],
    users: &'a [crate::model::User],
    lists: &'a [crate::model::List],
    workspaces: &'a [crate::model::Workspace],
    folders: &'a [crate::model::Folder],
    #[serde(rename = "taskTemplates")]
    task_templates: &'a [crate::model::TaskTemplate],
    notifications: &'a [crate::model::Notification],
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskflow").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskflow")
            .join(STORE_FILE_NAME))
    }
}

/// Loads the board. A missing file is an empty board; unreadable JSON or a
/// malformed slice degrades to empty data with a warning. Only a schema
/// newer than this build understands is an error.
pub fn load_board(path: &Path) -> Result<Board, AppError> {
    if !path.exists() {
        return Ok(Board::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let root: Map<String, Value> = match serde_json::from_str(&content) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            warn!(path = %path.display(), "store is not a JSON object; starting empty");
            return Ok(Board::default());
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "store is not valid JSON; starting empty");
            return Ok(Board::default());
        }
    };

    let version = root
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(u64::from(SCHEMA_VERSION));
    if version > u64::from(SCHEMA_VERSION) {
        return Err(AppError::invalid_data(format!(
            "schema_version {version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(Board {
        tasks: load_slice(&root, "tasks"),
        users: load_slice(&root, "users"),
        lists: load_slice(&root, "lists"),
        workspaces: load_slice(&root, "workspaces"),
        folders: load_slice(&root, "folders"),
        templates: load_slice(&root, "taskTemplates"),
        notifications: load_slice(&root, "notifications"),
    })
}

fn load_slice<T: DeserializeOwned>(root: &Map<String, Value>, key: &str) -> Vec<T> {
    let Some(value) = root.get(key) else {
        return Vec::new();
    };
    match serde_json::from_value(value.clone()) {
        Ok(items) => items,
        Err(err) => {
            warn!(key, error = %err, "discarding unreadable store slice");
            Vec::new()
        }
    }
}

pub fn save_board(path: &Path, board: &Board) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredBoard {
        schema_version: SCHEMA_VERSION,
        tasks: &board.tasks,
        users: &board.users,
        lists: &board.lists,
        workspaces: &board.workspaces,
        folders: &board.folders,
        task_templates: &board.templates,
        notifications: &board.notifications,
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SCHEMA_VERSION, load_board, save_board};
    use crate::board::Board;
    use crate::board::fixtures::{add_task, seeded};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("taskflow-{nanos}-{file_name}"))
    }

    #[test]
    fn save_and_load_preserves_board() {
        let path = temp_path("board.json");
        let mut seeded = seeded();
        add_task(&mut seeded.board, &seeded.inbox, "demo");

        save_board(&path, &seeded.board).unwrap();
        let loaded = load_board(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, seeded.board);
    }

    #[test]
    fn saved_file_uses_storage_keys() {
        let path = temp_path("keys.json");
        save_board(&path, &Board::default()).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(raw["schema_version"], SCHEMA_VERSION);
        for key in [
            "tasks",
            "users",
            "lists",
            "workspaces",
            "folders",
            "taskTemplates",
            "notifications",
        ] {
            assert!(raw[key].is_array(), "missing {key}");
        }
    }

    #[test]
    fn missing_file_is_empty_board() {
        let path = temp_path("missing.json");
        assert_eq!(load_board(&path).unwrap(), Board::default());
    }

    #[test]
    fn invalid_json_degrades_to_empty_board() {
        let path = temp_path("invalid.json");
        fs::write(&path, "{ not json").unwrap();
        let loaded = load_board(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(loaded, Board::default());
    }

    #[test]
    fn bad_slice_is_dropped_without_losing_others() {
        let path = temp_path("bad-slice.json");
        let content = serde_json::json!({
            "schema_version": 1,
            "tasks": "oops",
            "theme": "dark",
            "workspaces": [
                {"id": "ws-1", "name": "Acme", "order": 0, "created_at": "2025-01-01T00:00:00Z"}
            ]
        });
        fs::write(&path, content.to_string()).unwrap();
        let loaded = load_board(&path).unwrap();
        fs::remove_file(&path).ok();

        assert!(loaded.tasks.is_empty());
        assert_eq!(loaded.workspaces.len(), 1);
        assert_eq!(loaded.workspaces[0].name, "Acme");
    }

    #[test]
    fn newer_schema_is_rejected() {
        let path = temp_path("future.json");
        let bad = format!("{{\n  \"schema_version\": {},\n  \"tasks\": []\n}}", SCHEMA_VERSION + 1);
        fs::write(&path, bad).unwrap();
        let err = load_board(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert_eq!(err.code(), "invalid_data");
    }
}
