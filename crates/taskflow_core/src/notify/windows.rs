use crate::error::AppError;
use crate::model::Task;
use crate::notify::{AlertReason, Notifier, alert_body, show_hint};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, task: &Task, reason: AlertReason) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title("taskflow")
            .text1(&alert_body(task, reason))
            .text2(&show_hint(task))
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
