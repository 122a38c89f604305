use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    pub message: String,
    pub created_at: String,
    #[serde(default)]
    pub read: bool,
}
