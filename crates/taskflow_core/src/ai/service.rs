use super::client::{GenerateRequest, TextGenerator};
use crate::error::AppError;
use crate::model::Task;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(alias = "taskId")]
    pub task_id: String,
    pub level: RiskLevel,
    pub reason: String,
}

/// Model-backed helpers. Every call degrades to an empty value and a
/// warning when the model is unreachable or answers with garbage.
pub struct AiService<G> {
    generator: G,
}

impl<G: TextGenerator> AiService<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn generate_subtasks(&self, task: &Task) -> Vec<String> {
        let prompt = format!(
            "Break the task below into 3 to 6 short, actionable subtasks. \
             Reply with a JSON array of strings only.\n\n{}",
            describe_task(task)
        );
        let items = self
            .ask_json::<Vec<String>>(&prompt)
            .map(|items| clean_lines(items.into_iter()));
        or_default("generate_subtasks", items)
    }

    pub fn generate_description(&self, task: &Task) -> String {
        let prompt = format!(
            "Write a concise description (at most 3 sentences) for this task. \
             Reply with plain text only.\n\n{}",
            describe_task(task)
        );
        or_default("generate_description", self.ask_text(&prompt))
    }

    pub fn project_summary(&self, tasks: &[&Task]) -> String {
        if tasks.is_empty() {
            return String::new();
        }
        let prompt = format!(
            "Summarize the state of this project in one short paragraph: progress, \
             what is in flight and what needs attention.\n\n{}",
            describe_tasks(tasks)
        );
        or_default("project_summary", self.ask_text(&prompt))
    }

    /// Risks are only kept for tasks that were part of the input.
    pub fn risk_analysis(&self, tasks: &[&Task], today: &str) -> Vec<Risk> {
        if tasks.is_empty() {
            return Vec::new();
        }
        let prompt = format!(
            "Today is {today}. Identify tasks at risk of slipping. Reply with a JSON \
             array of objects {{\"task_id\": string, \"level\": \"low\"|\"medium\"|\"high\", \
             \"reason\": string}}. Return [] when nothing is at risk.\n\n{}",
            describe_tasks(tasks)
        );
        let risks = self.ask_json::<Vec<Risk>>(&prompt).map(|risks| {
            risks
                .into_iter()
                .filter(|risk| tasks.iter().any(|task| task.id == risk.task_id))
                .collect()
        });
        or_default("risk_analysis", risks)
    }

    pub fn suggest_replies(&self, task: &Task) -> Vec<String> {
        let Some(last) = task.comments.iter().max_by(|a, b| a.created_at.cmp(&b.created_at))
        else {
            return Vec::new();
        };
        let prompt = format!(
            "Suggest 3 short replies to the latest comment on this task. Reply with a \
             JSON array of strings only.\n\n{}\nLatest comment: {}",
            describe_task(task),
            last.body
        );
        let replies = self
            .ask_json::<Vec<String>>(&prompt)
            .map(|items| clean_lines(items.into_iter()));
        or_default("suggest_replies", replies)
    }

    fn ask_text(&self, prompt: &str) -> Result<String, AppError> {
        let reply = self.generator.generate(&GenerateRequest::text(prompt))?;
        Ok(reply.text.trim().to_string())
    }

    fn ask_json<T: for<'de> Deserialize<'de>>(&self, prompt: &str) -> Result<T, AppError> {
        let reply = self.generator.generate(&GenerateRequest::json(prompt))?;
        serde_json::from_str(strip_code_fences(&reply.text))
            .map_err(|err| AppError::remote(format!("model reply is not the expected JSON: {err}")))
    }
}

fn or_default<T: Default>(operation: &str, result: Result<T, AppError>) -> T {
    result.unwrap_or_else(|err| {
        warn!(operation, error = %err, "AI request failed; using empty result");
        T::default()
    })
}

fn clean_lines(items: impl Iterator<Item = String>) -> Vec<String> {
    items
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Removes a surrounding Markdown code fence such as ```` ```json ... ``` ````.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

pub(crate) fn describe_task(task: &Task) -> String {
    let mut out = format!(
        "Title: {}\nStatus: {}\nPriority: {}",
        task.title,
        task.status.label(),
        task.priority.label()
    );
    if !task.description.trim().is_empty() {
        let _ = write!(out, "\nDescription: {}", task.description.trim());
    }
    if let Some(due) = task.due_date.as_deref() {
        let _ = write!(out, "\nDue: {due}");
    }
    if !task.subtasks.is_empty() {
        let titles: Vec<&str> = task.subtasks.iter().map(|s| s.title.as_str()).collect();
        let _ = write!(out, "\nExisting subtasks: {}", titles.join("; "));
    }
    out
}

fn describe_tasks(tasks: &[&Task]) -> String {
    let mut out = String::new();
    for task in tasks {
        let (done, total) = task.subtask_progress();
        let _ = writeln!(
            out,
            "- [{}] {} | status={} priority={} due={} subtasks={done}/{total} depends_on={}",
            task.id,
            task.title,
            task.status.as_str(),
            task.priority.as_str(),
            task.due_date.as_deref().unwrap_or("none"),
            task.dependencies.len()
        );
    }
    out
}
