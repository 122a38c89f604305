use super::{Board, Stamp};
use crate::error::AppError;
use crate::model::Task;
use std::collections::HashSet;

impl Board {
    /// Makes `task_id` wait on `depends_on`.
    pub fn add_dependency(
        &mut self,
        task_id: &str,
        depends_on: &str,
        stamp: &Stamp,
    ) -> Result<Task, AppError> {
        let task_id = self.task(task_id)?.id.clone();
        let target = self.task(depends_on)?.clone();
        if task_id == target.id {
            return Err(AppError::invalid_input("a task cannot depend on itself"));
        }
        if self.task(&task_id)?.dependencies.contains(&target.id) {
            return Err(AppError::invalid_input("dependency already exists"));
        }
        if self.reaches(&target.id, &task_id) {
            return Err(AppError::invalid_input(format!(
                "adding dependency {task_id} -> {} would create a cycle",
                target.id
            )));
        }

        self.task_mut(&task_id)?.dependencies.push(target.id.clone());
        self.record(&task_id, stamp, format!("now depends on \"{}\"", target.title))?;
        self.task(&task_id).cloned()
    }

    pub fn remove_dependency(
        &mut self,
        task_id: &str,
        depends_on: &str,
        stamp: &Stamp,
    ) -> Result<Task, AppError> {
        let depends_on = depends_on.trim();
        let task = self.task_mut(task_id)?;
        let task_id = task.id.clone();
        let before = task.dependencies.len();
        task.dependencies.retain(|dep| dep != depends_on);
        if task.dependencies.len() == before {
            return Err(AppError::not_found(format!(
                "{task_id} does not depend on {depends_on}"
            )));
        }
        let title = self
            .tasks
            .iter()
            .find(|t| t.id == depends_on)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| depends_on.to_string());
        self.record(&task_id, stamp, format!("no longer depends on \"{title}\""))?;
        self.task(&task_id).cloned()
    }

    /// True when any dependency is not done yet.
    pub fn is_blocked(&self, task: &Task) -> bool {
        task.dependencies.iter().any(|dep| {
            self.tasks
                .iter()
                .find(|t| &t.id == dep)
                .is_some_and(|t| !t.is_done())
        })
    }

    /// Tasks that wait on `task_id`.
    pub fn dependents(&self, task_id: &str) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.dependencies.iter().any(|dep| dep == task_id))
            .collect()
    }

    /// Whether following dependency edges from `from` arrives at `to`.
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![from.to_string()];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(task) = self.tasks.iter().find(|t| t.id == current) {
                stack.extend(task.dependencies.iter().cloned());
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::board::fixtures::{add_task, seeded, stamp};
    use crate::model::TaskStatus;

    #[test]
    fn add_dependency_rejects_self_duplicate_and_unknown() {
        let mut seeded = seeded();
        let a = add_task(&mut seeded.board, &seeded.inbox, "a");
        let b = add_task(&mut seeded.board, &seeded.inbox, "b");

        assert_eq!(seeded.board.add_dependency(&a, &a, &stamp()).unwrap_err().code(), "invalid_input");
        assert_eq!(
            seeded.board.add_dependency(&a, "task-missing", &stamp()).unwrap_err().code(),
            "not_found"
        );
        seeded.board.add_dependency(&a, &b, &stamp()).unwrap();
        assert_eq!(seeded.board.add_dependency(&a, &b, &stamp()).unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn add_dependency_rejects_cycles() {
        let mut seeded = seeded();
        let a = add_task(&mut seeded.board, &seeded.inbox, "a");
        let b = add_task(&mut seeded.board, &seeded.inbox, "b");
        let c = add_task(&mut seeded.board, &seeded.inbox, "c");
        seeded.board.add_dependency(&b, &a, &stamp()).unwrap();
        seeded.board.add_dependency(&c, &b, &stamp()).unwrap();

        let err = seeded.board.add_dependency(&a, &c, &stamp()).unwrap_err();
        assert!(err.message().contains("cycle"));
    }

    #[test]
    fn blocked_until_dependencies_are_done() {
        let mut seeded = seeded();
        let a = add_task(&mut seeded.board, &seeded.inbox, "a");
        let b = add_task(&mut seeded.board, &seeded.inbox, "b");
        seeded.board.add_dependency(&b, &a, &stamp()).unwrap();

        assert!(seeded.board.is_blocked(seeded.board.task(&b).unwrap()));
        seeded.board.set_status(&a, TaskStatus::Done, &stamp()).unwrap();
        assert!(!seeded.board.is_blocked(seeded.board.task(&b).unwrap()));
        assert_eq!(seeded.board.dependents(&a).len(), 1);
    }

    #[test]
    fn remove_dependency_requires_existing_edge() {
        let mut seeded = seeded();
        let a = add_task(&mut seeded.board, &seeded.inbox, "a");
        let b = add_task(&mut seeded.board, &seeded.inbox, "b");
        assert_eq!(seeded.board.remove_dependency(&b, &a, &stamp()).unwrap_err().code(), "not_found");

        seeded.board.add_dependency(&b, &a, &stamp()).unwrap();
        let task = seeded.board.remove_dependency(&b, &a, &stamp()).unwrap();
        assert!(task.dependencies.is_empty());
        assert_eq!(task.activity.last().unwrap().message, "no longer depends on \"a\"");
    }
}
