use super::{Board, Stamp, require_id};
use crate::error::AppError;
use crate::model::Notification;

impl Board {
    pub(crate) fn push_notification(
        &mut self,
        user_id: Option<&str>,
        task_id: Option<&str>,
        message: String,
        stamp: &Stamp,
    ) {
        let notification = Notification {
            id: self.fresh_id("note"),
            user_id: user_id.map(str::to_string),
            task_id: task_id.map(str::to_string),
            message,
            created_at: stamp.at.clone(),
            read: false,
        };
        self.notifications.push(notification);
    }

    /// Self-assignment does not notify.
    pub(crate) fn notify_assignment(
        &mut self,
        task_id: &str,
        user_id: &str,
        stamp: &Stamp,
    ) -> Result<(), AppError> {
        if stamp.actor_id.as_deref() == Some(user_id) {
            return Ok(());
        }
        let title = self.task(task_id)?.title.clone();
        let by = match stamp.actor_id.as_deref() {
            Some(actor) => self.user_name(actor),
            None => "Someone".to_string(),
        };
        self.push_notification(
            Some(user_id),
            Some(task_id),
            format!("{by} assigned you to \"{title}\""),
            stamp,
        );
        Ok(())
    }

    /// Notifications addressed to `user_id` plus broadcast ones, newest first.
    pub fn notifications_for(&self, user_id: Option<&str>, unread_only: bool) -> Vec<&Notification> {
        let mut selected: Vec<&Notification> = self
            .notifications
            .iter()
            .filter(|n| match (user_id, n.user_id.as_deref()) {
                (Some(user), Some(target)) => user == target,
                _ => true,
            })
            .filter(|n| !unread_only || !n.read)
            .collect();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected
    }

    pub fn mark_read(&mut self, id: &str) -> Result<Notification, AppError> {
        let id = require_id(id)?;
        let notification = self
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::not_found(format!("notification not found: {id}")))?;
        notification.read = true;
        Ok(notification.clone())
    }

    pub fn mark_all_read(&mut self, user_id: Option<&str>) -> usize {
        let mut count = 0;
        for notification in &mut self.notifications {
            let addressed = match (user_id, notification.user_id.as_deref()) {
                (Some(user), Some(target)) => user == target,
                _ => true,
            };
            if addressed && !notification.read {
                notification.read = true;
                count += 1;
            }
        }
        count
    }

    pub fn clear_notifications(&mut self, user_id: Option<&str>) -> usize {
        let before = self.notifications.len();
        self.notifications.retain(|n| match (user_id, n.user_id.as_deref()) {
            (Some(user), Some(target)) => user != target,
            (Some(_), None) => true,
            (None, _) => false,
        });
        before - self.notifications.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::board::fixtures::{add_task, add_user, seeded, stamp};
    use crate::model::Role;

    #[test]
    fn notifications_filter_by_user_and_read_state() {
        let mut seeded = seeded();
        let ada = add_user(&mut seeded.board, "Ada", Role::Member);
        let bob = add_user(&mut seeded.board, "Bob", Role::Member);
        let one = add_task(&mut seeded.board, &seeded.inbox, "one");
        let two = add_task(&mut seeded.board, &seeded.inbox, "two");
        seeded.board.assign_task(&one, Some(&ada), &stamp()).unwrap();
        seeded.board.assign_task(&two, Some(&bob), &stamp()).unwrap();

        let for_ada = seeded.board.notifications_for(Some(&ada), true);
        assert_eq!(for_ada.len(), 1);
        assert_eq!(for_ada[0].message, "Someone assigned you to \"one\"");

        let id = for_ada[0].id.clone();
        seeded.board.mark_read(&id).unwrap();
        assert!(seeded.board.notifications_for(Some(&ada), true).is_empty());
        assert_eq!(seeded.board.notifications_for(None, false).len(), 2);
    }

    #[test]
    fn mark_all_read_and_clear_are_scoped_to_user() {
        let mut seeded = seeded();
        let ada = add_user(&mut seeded.board, "Ada", Role::Member);
        let bob = add_user(&mut seeded.board, "Bob", Role::Member);
        let one = add_task(&mut seeded.board, &seeded.inbox, "one");
        seeded.board.assign_task(&one, Some(&ada), &stamp()).unwrap();
        seeded.board.assign_task(&one, Some(&bob), &stamp()).unwrap();

        assert_eq!(seeded.board.mark_all_read(Some(&ada)), 1);
        assert_eq!(seeded.board.clear_notifications(Some(&bob)), 1);
        assert_eq!(seeded.board.notifications.len(), 1);
        assert_eq!(seeded.board.clear_notifications(None), 1);
    }

    #[test]
    fn mark_read_reports_unknown_id() {
        let mut seeded = seeded();
        assert_eq!(seeded.board.mark_read("note-x").unwrap_err().code(), "not_found");
    }
}
