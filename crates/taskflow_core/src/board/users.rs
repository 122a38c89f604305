use super::{Board, Stamp, require_text};
use crate::error::AppError;
use crate::model::{Role, User};

impl Board {
    pub fn add_user(
        &mut self,
        name: &str,
        email: &str,
        role: Role,
        stamp: &Stamp,
    ) -> Result<User, AppError> {
        let name = require_text(name, "name")?;
        let email = self.validate_email(email, None)?;
        let user = User {
            id: self.fresh_id("user"),
            name,
            email,
            role,
            created_at: stamp.at.clone(),
        };
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn update_user(
        &mut self,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        let id = self.user(id)?.id.clone();
        let name = name.map(|n| require_text(n, "name")).transpose()?;
        let email = email
            .map(|e| self.validate_email(e, Some(&id)))
            .transpose()?;
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("user not found: {id}")))?;
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        Ok(user.clone())
    }

    pub fn set_role(&mut self, id: &str, role: Role) -> Result<User, AppError> {
        let id = self.user(id)?.id.clone();
        let admins = self.users.iter().filter(|u| u.role == Role::Admin).count();
        let user = self
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found(format!("user not found: {id}")))?;
        if user.role == Role::Admin && role != Role::Admin && admins == 1 {
            return Err(AppError::invalid_input("cannot demote the last admin"));
        }
        user.role = role;
        Ok(user.clone())
    }

    /// Removes the user, unassigning their tasks and dropping their
    /// notifications.
    pub fn delete_user(&mut self, id: &str, stamp: &Stamp) -> Result<User, AppError> {
        let user = self.user(id)?.clone();
        if user.role == Role::Admin
            && self.users.iter().filter(|u| u.role == Role::Admin).count() == 1
        {
            return Err(AppError::invalid_input("cannot delete the last admin"));
        }
        let assigned: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.assignee_id.as_deref() == Some(user.id.as_str()))
            .map(|t| t.id.clone())
            .collect();
        for task_id in &assigned {
            self.assign_task(task_id, None, stamp)?;
        }
        self.notifications
            .retain(|n| n.user_id.as_deref() != Some(user.id.as_str()));
        self.users.retain(|u| u.id != user.id);
        Ok(user)
    }

    /// Resolves a user by id, then by case-insensitive name or email.
    pub fn find_user(&self, query: &str) -> Result<&User, AppError> {
        let query = query.trim();
        if let Some(user) = self.users.iter().find(|u| u.id == query) {
            return Ok(user);
        }
        let lowered = query.to_lowercase();
        let matches: Vec<&User> = self
            .users
            .iter()
            .filter(|u| u.name.to_lowercase() == lowered || u.email.to_lowercase() == lowered)
            .collect();
        match matches.as_slice() {
            [user] => Ok(user),
            [] => Err(AppError::not_found(format!("user not found: {query}"))),
            _ => Err(AppError::invalid_input(format!("'{query}' matches several users"))),
        }
    }

    fn validate_email(&self, email: &str, except: Option<&str>) -> Result<String, AppError> {
        let email = require_text(email, "email")?;
        let (local, domain) = email
            .split_once('@')
            .ok_or_else(|| AppError::invalid_input("email must contain '@'"))?;
        if local.is_empty() || domain.is_empty() {
            return Err(AppError::invalid_input("email must contain '@'"));
        }
        let lowered = email.to_lowercase();
        let taken = self
            .users
            .iter()
            .any(|u| Some(u.id.as_str()) != except && u.email.to_lowercase() == lowered);
        if taken {
            return Err(AppError::invalid_input(format!("email already in use: {email}")));
        }
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use crate::board::Board;
    use crate::board::fixtures::{add_task, add_user, seeded, stamp, stamp_by};
    use crate::model::Role;

    #[test]
    fn add_user_validates_email() {
        let mut board = Board::default();
        assert_eq!(
            board.add_user("Ada", "not-an-email", Role::Member, &stamp()).unwrap_err().code(),
            "invalid_input"
        );
        board.add_user("Ada", "ada@example.com", Role::Member, &stamp()).unwrap();
        let err = board
            .add_user("Imposter", "ADA@example.com", Role::Guest, &stamp())
            .unwrap_err();
        assert!(err.message().contains("already in use"));

        board.add_user("Jörg", "jörg@example.com", Role::Member, &stamp()).unwrap();
        let err = board
            .add_user("Jorg", "JÖRG@example.com", Role::Member, &stamp())
            .unwrap_err();
        assert!(err.message().contains("already in use"));
    }

    #[test]
    fn set_role_keeps_at_least_one_admin() {
        let mut board = Board::default();
        let admin = add_user(&mut board, "Root", Role::Admin);
        let err = board.set_role(&admin, Role::Member).unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        assert_eq!(
            board.delete_user(&admin, &stamp()).unwrap_err().code(),
            "invalid_input"
        );

        let second = add_user(&mut board, "Deputy", Role::Admin);
        board.set_role(&admin, Role::Viewer).unwrap();
        assert_eq!(board.user(&admin).unwrap().role, Role::Viewer);
        assert_eq!(board.user(&second).unwrap().role, Role::Admin);
    }

    #[test]
    fn delete_user_unassigns_tasks_and_drops_notifications() {
        let mut seeded = seeded();
        let ada = add_user(&mut seeded.board, "Ada", Role::Member);
        let id = add_task(&mut seeded.board, &seeded.inbox, "demo");
        seeded.board.assign_task(&id, Some(&ada), &stamp()).unwrap();
        assert_eq!(seeded.board.notifications.len(), 1);

        seeded.board.delete_user(&ada, &stamp_by("user-admin")).unwrap();

        assert!(seeded.board.task(&id).unwrap().assignee_id.is_none());
        assert!(seeded.board.notifications.is_empty());
        assert!(seeded.board.user(&ada).is_err());
    }

    #[test]
    fn find_user_matches_name_or_email() {
        let mut board = Board::default();
        let ada = add_user(&mut board, "Ada", Role::Member);
        assert_eq!(board.find_user("ada").unwrap().id, ada);
        assert_eq!(board.find_user("ADA@example.com").unwrap().id, ada);
        assert_eq!(board.find_user(&ada).unwrap().id, ada);
        assert_eq!(board.find_user("nobody").unwrap_err().code(), "not_found");
    }
}
