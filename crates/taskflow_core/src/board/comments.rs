use super::{Board, Stamp, require_id, require_text};
use crate::error::AppError;
use crate::model::Comment;

/// A comment together with its replies, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn depth_first(&self) -> Vec<(usize, &Comment)> {
        let mut out = Vec::new();
        self.walk(0, &mut out);
        out
    }

    fn walk<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a Comment)>) {
        out.push((depth, &self.comment));
        for reply in &self.replies {
            reply.walk(depth + 1, out);
        }
    }
}

impl Board {
    pub fn add_comment(
        &mut self,
        task_id: &str,
        body: &str,
        parent_id: Option<&str>,
        stamp: &Stamp,
    ) -> Result<Comment, AppError> {
        let body = require_text(body, "comment")?;
        let id = self.fresh_id("comment");
        let task = self.task_mut(task_id)?;
        let task_id = task.id.clone();
        let parent_id = match parent_id {
            Some(parent) => {
                let parent = require_id(parent)?;
                if !task.comments.iter().any(|c| c.id == parent) {
                    return Err(AppError::not_found(format!(
                        "comment not found on task: {parent}"
                    )));
                }
                Some(parent.to_string())
            }
            None => None,
        };
        let comment = Comment {
            id,
            author_id: stamp.actor_id.clone(),
            body,
            created_at: stamp.at.clone(),
            parent_id,
        };
        task.comments.push(comment.clone());
        let assignee = task.assignee_id.clone();
        let title = task.title.clone();

        let verb = if comment.parent_id.is_some() { "replied" } else { "commented" };
        self.record(&task_id, stamp, verb)?;

        if let Some(assignee) = assignee
            && stamp.actor_id.as_deref() != Some(assignee.as_str())
        {
            let author = match stamp.actor_id.as_deref() {
                Some(actor) => self.user_name(actor),
                None => "Someone".to_string(),
            };
            self.push_notification(
                Some(&assignee),
                Some(&task_id),
                format!("{author} commented on \"{title}\""),
                stamp,
            );
        }
        Ok(comment)
    }

    /// Deletes the comment and every reply beneath it.
    pub fn delete_comment(
        &mut self,
        task_id: &str,
        comment_id: &str,
        stamp: &Stamp,
    ) -> Result<Vec<Comment>, AppError> {
        let comment_id = require_id(comment_id)?;
        let task = self.task_mut(task_id)?;
        let task_id = task.id.clone();
        if !task.comments.iter().any(|c| c.id == comment_id) {
            return Err(AppError::not_found(format!("comment not found: {comment_id}")));
        }

        let mut doomed = vec![comment_id.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor].clone();
            for comment in &task.comments {
                if comment.parent_id.as_deref() == Some(parent.as_str()) {
                    doomed.push(comment.id.clone());
                }
            }
            cursor += 1;
        }

        let (removed, kept): (Vec<Comment>, Vec<Comment>) = task
            .comments
            .drain(..)
            .partition(|c| doomed.contains(&c.id));
        task.comments = kept;
        self.record(&task_id, stamp, "deleted a comment")?;
        Ok(removed)
    }

    /// Builds the reply tree. Comments whose parent is missing are promoted
    /// to the top level.
    pub fn comment_thread(&self, task_id: &str) -> Result<Vec<CommentNode>, AppError> {
        let task = self.task(task_id)?;
        let mut comments = task.comments.clone();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let known: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        let roots: Vec<&Comment> = comments
            .iter()
            .filter(|c| match c.parent_id.as_deref() {
                Some(parent) => !known.contains(&parent),
                None => true,
            })
            .collect();

        Ok(roots
            .into_iter()
            .map(|root| build_node(root, &comments))
            .collect())
    }
}

fn build_node(comment: &Comment, all: &[Comment]) -> CommentNode {
    let replies = all
        .iter()
        .filter(|c| c.parent_id.as_deref() == Some(comment.id.as_str()))
        .map(|reply| build_node(reply, all))
        .collect();
    CommentNode {
        comment: comment.clone(),
        replies,
    }
}

#[cfg(test)]
mod tests {
    use crate::board::fixtures::{add_task, add_user, seeded, stamp, stamp_by};
    use crate::model::Role;

    #[test]
    fn add_comment_rejects_blank_body_and_unknown_parent() {
        let mut seeded = seeded();
        let id = add_task(&mut seeded.board, &seeded.inbox, "demo");
        let err = seeded.board.add_comment(&id, "  ", None, &stamp()).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        let err = seeded
            .board
            .add_comment(&id, "hi", Some("comment-missing"), &stamp())
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn replies_nest_under_their_parent() {
        let mut seeded = seeded();
        let id = add_task(&mut seeded.board, &seeded.inbox, "demo");
        let root = seeded.board.add_comment(&id, "root", None, &stamp()).unwrap();
        let reply = seeded.board.add_comment(&id, "reply", Some(&root.id), &stamp()).unwrap();
        seeded.board.add_comment(&id, "nested", Some(&reply.id), &stamp()).unwrap();
        seeded.board.add_comment(&id, "second root", None, &stamp()).unwrap();

        let thread = seeded.board.comment_thread(&id).unwrap();
        assert_eq!(thread.len(), 2);
        let flat: Vec<(usize, &str)> = thread[0]
            .depth_first()
            .into_iter()
            .map(|(depth, c)| (depth, c.body.as_str()))
            .collect();
        assert_eq!(flat, vec![(0, "root"), (1, "reply"), (2, "nested")]);
    }

    #[test]
    fn delete_comment_removes_reply_subtree() {
        let mut seeded = seeded();
        let id = add_task(&mut seeded.board, &seeded.inbox, "demo");
        let root = seeded.board.add_comment(&id, "root", None, &stamp()).unwrap();
        let reply = seeded.board.add_comment(&id, "reply", Some(&root.id), &stamp()).unwrap();
        seeded.board.add_comment(&id, "nested", Some(&reply.id), &stamp()).unwrap();
        let other = seeded.board.add_comment(&id, "other", None, &stamp()).unwrap();

        let removed = seeded.board.delete_comment(&id, &root.id, &stamp()).unwrap();

        assert_eq!(removed.len(), 3);
        let remaining = &seeded.board.task(&id).unwrap().comments;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, other.id);
    }

    #[test]
    fn comment_notifies_assignee_other_than_author() {
        let mut seeded = seeded();
        let ada = add_user(&mut seeded.board, "Ada", Role::Member);
        let bob = add_user(&mut seeded.board, "Bob", Role::Member);
        let id = add_task(&mut seeded.board, &seeded.inbox, "demo");
        seeded.board.assign_task(&id, Some(&ada), &stamp_by(&ada)).unwrap();

        seeded.board.add_comment(&id, "mine", None, &stamp_by(&ada)).unwrap();
        assert!(seeded.board.notifications.is_empty());

        seeded.board.add_comment(&id, "ping", None, &stamp_by(&bob)).unwrap();
        assert_eq!(seeded.board.notifications.len(), 1);
        assert_eq!(seeded.board.notifications[0].message, "Bob commented on \"demo\"");
    }
}
