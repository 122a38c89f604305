use crate::error::AppError;
use crate::model::Task;
use crate::notify::{AlertReason, Notifier, alert_body, show_hint};
use notify_rust::{Notification, Urgency};

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, task: &Task, reason: AlertReason) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.summary("taskflow");
        notification.appname("taskflow");
        notification.body(&format!("{}\n{}", alert_body(task, reason), show_hint(task)));
        if reason == AlertReason::Overdue {
            notification.urgency(Urgency::Critical);
        }
        notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
