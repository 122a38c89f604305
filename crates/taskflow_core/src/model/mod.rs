mod hierarchy;
mod notification;
mod task;
mod template;
mod user;

pub use hierarchy::{Folder, List, Workspace};
pub use notification::Notification;
pub use task::{ActivityEntry, Attachment, Comment, Priority, Subtask, Task, TaskStatus};
pub use template::TaskTemplate;
pub use user::{Role, User};

pub(crate) use task::normalize_token;
