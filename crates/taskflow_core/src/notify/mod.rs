//! Desktop alerts for tasks that need attention.

use crate::board::Board;
use crate::dates;
use crate::error::AppError;
use crate::model::{Priority, Task};
use time::Date;
use tracing::warn;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

const DISABLE_ENV_VAR: &str = "TASKFLOW_DISABLE_NOTIFICATIONS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertReason {
    Overdue,
    HighPriority,
}

impl AlertReason {
    pub fn label(self) -> &'static str {
        match self {
            AlertReason::Overdue => "overdue",
            AlertReason::HighPriority => "high priority",
        }
    }
}

pub trait Notifier {
    fn notify(&self, task: &Task, reason: AlertReason) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _task: &Task, _reason: AlertReason) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Result<Box<dyn Notifier>, AppError> {
    if std::env::var(DISABLE_ENV_VAR).is_ok() {
        return Ok(Box::new(NoopNotifier));
    }

    match platform_notifier() {
        Ok(notifier) => Ok(notifier),
        Err(AppError::InvalidData(_)) => Ok(Box::new(NoopNotifier)),
        Err(other) => Err(other),
    }
}

/// Open tasks alert when overdue (checked first) or high priority.
pub fn alert_reason(task: &Task, today: Date) -> Option<AlertReason> {
    if task.is_done() {
        return None;
    }
    let overdue = task
        .due_date
        .as_deref()
        .and_then(|raw| dates::parse_date(raw).ok())
        .is_some_and(|due| due < today);
    if overdue {
        Some(AlertReason::Overdue)
    } else if task.priority == Priority::High {
        Some(AlertReason::HighPriority)
    } else {
        None
    }
}

pub fn pending_alerts(board: &Board, today: Date) -> Vec<(&Task, AlertReason)> {
    board
        .tasks
        .iter()
        .filter_map(|task| alert_reason(task, today).map(|reason| (task, reason)))
        .collect()
}

#[derive(Debug, Default)]
pub struct AlertOutcome {
    pub sent: Vec<String>,
    pub failures: Vec<(String, AppError)>,
}

/// Sends every alert; one task failing does not stop the rest.
pub fn send_alerts(notifier: &dyn Notifier, alerts: &[(&Task, AlertReason)]) -> AlertOutcome {
    let mut outcome = AlertOutcome::default();
    for (task, reason) in alerts {
        match notifier.notify(task, *reason) {
            Ok(()) => outcome.sent.push(task.id.clone()),
            Err(err) => {
                warn!(task = %task.id, error = %err, "desktop notification failed");
                outcome.failures.push((task.id.clone(), err));
            }
        }
    }
    outcome
}

/// Command that opens the task's detail view.
pub(crate) fn show_hint(task: &Task) -> String {
    format!("taskflow task show {}", task.id)
}

pub(crate) fn alert_body(task: &Task, reason: AlertReason) -> String {
    match task.due_date.as_deref() {
        Some(due) => format!("{} ({}, due {})", task.title, reason.label(), due),
        None => format!("{} ({})", task.title, reason.label()),
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
