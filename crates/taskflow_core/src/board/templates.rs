use super::{Board, NewTask, Stamp, require_text};
use crate::error::AppError;
use crate::model::{Task, TaskTemplate};

impl Board {
    /// Captures title, description, priority and subtask titles of a task.
    pub fn save_template(&mut self, task_id: &str, name: &str) -> Result<TaskTemplate, AppError> {
        let name = require_text(name, "template name")?;
        let lowered = name.to_lowercase();
        if self.templates.iter().any(|t| t.name.to_lowercase() == lowered) {
            return Err(AppError::invalid_input(format!("template already exists: {name}")));
        }
        let task = self.task(task_id)?;
        let template = TaskTemplate {
            id: self.fresh_id("tpl"),
            name,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            subtasks: task.subtasks.iter().map(|s| s.title.clone()).collect(),
        };
        self.templates.push(template.clone());
        Ok(template)
    }

    pub fn create_from_template(
        &mut self,
        template_id: &str,
        list_id: &str,
        stamp: &Stamp,
    ) -> Result<Task, AppError> {
        let template = self.template(template_id)?.clone();
        let new = NewTask {
            title: template.title,
            list_id: list_id.to_string(),
            description: template.description,
            priority: template.priority,
            subtasks: template.subtasks,
            ..NewTask::default()
        };
        self.create_task(new, stamp)
    }

    pub fn delete_template(&mut self, template_id: &str) -> Result<TaskTemplate, AppError> {
        let id = self.template(template_id)?.id.clone();
        let index = self
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| AppError::not_found(format!("template not found: {id}")))?;
        Ok(self.templates.remove(index))
    }
}
