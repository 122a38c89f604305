use crate::error::AppError;
use crate::model::task::normalize_token;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Member,
    Viewer,
    Guest,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Viewer => "viewer",
            Role::Guest => "guest",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize_token(raw).as_str() {
            "admin" | "administrator" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            "viewer" => Ok(Role::Viewer),
            "guest" => Ok(Role::Guest),
            _ => Err(AppError::invalid_input(format!("unknown role '{}'", raw.trim()))),
        }
    }
}
