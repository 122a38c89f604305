use crate::error::AppError;
use crate::model::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    View,
    Comment,
    CreateTask,
    EditTask,
    DeleteTask,
    ManageLists,
    ManageWorkspaces,
    ManageUsers,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::View => "view",
            Permission::Comment => "comment",
            Permission::CreateTask => "create_task",
            Permission::EditTask => "edit_task",
            Permission::DeleteTask => "delete_task",
            Permission::ManageLists => "manage_lists",
            Permission::ManageWorkspaces => "manage_workspaces",
            Permission::ManageUsers => "manage_users",
        }
    }
}

const ADMIN: &[Permission] = &[
    Permission::View,
    Permission::Comment,
    Permission::CreateTask,
    Permission::EditTask,
    Permission::DeleteTask,
    Permission::ManageLists,
    Permission::ManageWorkspaces,
    Permission::ManageUsers,
];

const MEMBER: &[Permission] = &[
    Permission::View,
    Permission::Comment,
    Permission::CreateTask,
    Permission::EditTask,
    Permission::DeleteTask,
    Permission::ManageLists,
];

const VIEWER: &[Permission] = &[Permission::View, Permission::Comment];

const GUEST: &[Permission] = &[Permission::View];

pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Admin => ADMIN,
        Role::Member => MEMBER,
        Role::Viewer => VIEWER,
        Role::Guest => GUEST,
    }
}

pub fn role_allows(role: Role, permission: Permission) -> bool {
    permissions_for(role).contains(&permission)
}

/// `None` means no acting user is configured, which runs unrestricted.
pub fn ensure_allowed(actor: Option<&User>, permission: Permission) -> Result<(), AppError> {
    match actor {
        None => Ok(()),
        Some(user) if role_allows(user.role, permission) => Ok(()),
        Some(user) => Err(AppError::permission_denied(format!(
            "{} ({}) lacks {}",
            user.name,
            user.role.as_str(),
            permission.as_str()
        ))),
    }
}
