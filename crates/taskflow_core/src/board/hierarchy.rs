use super::{Board, Stamp, require_text};
use crate::error::AppError;
use crate::model::{Folder, List, Workspace};
use tracing::debug;

impl Board {
    pub fn create_workspace(&mut self, name: &str, stamp: &Stamp) -> Result<Workspace, AppError> {
        let name = require_text(name, "workspace name")?;
        let order = self
            .workspaces
            .iter()
            .map(|w| w.order + 1)
            .max()
            .unwrap_or(0);
        let workspace = Workspace {
            id: self.fresh_id("ws"),
            name,
            order,
            created_at: stamp.at.clone(),
        };
        self.workspaces.push(workspace.clone());
        Ok(workspace)
    }

    pub fn rename_workspace(&mut self, id: &str, name: &str) -> Result<Workspace, AppError> {
        let name = require_text(name, "workspace name")?;
        let id = self.workspace(id)?.id.clone();
        let workspace = self
            .workspaces
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| AppError::not_found(format!("workspace not found: {id}")))?;
        workspace.name = name;
        Ok(workspace.clone())
    }

    /// Removes the workspace with every folder, list and task under it.
    pub fn delete_workspace(&mut self, id: &str) -> Result<Workspace, AppError> {
        let id = self.workspace(id)?.id.clone();
        let list_ids: Vec<String> = self
            .lists
            .iter()
            .filter(|list| list.workspace_id == id)
            .map(|list| list.id.clone())
            .collect();
        let removed_tasks = self.remove_tasks_where(|task| list_ids.contains(&task.list_id));
        self.lists.retain(|list| list.workspace_id != id);
        self.folders.retain(|folder| folder.workspace_id != id);

        let index = self
            .workspaces
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| AppError::not_found(format!("workspace not found: {id}")))?;
        let removed = self.workspaces.remove(index);
        self.workspaces.sort_by_key(|w| w.order);
        for (order, workspace) in self.workspaces.iter_mut().enumerate() {
            workspace.order = order as u32;
        }
        debug!(
            workspace = %removed.id,
            lists = list_ids.len(),
            tasks = removed_tasks,
            "deleted workspace"
        );
        Ok(removed)
    }

    pub fn create_folder(
        &mut self,
        workspace_id: &str,
        name: &str,
        stamp: &Stamp,
    ) -> Result<Folder, AppError> {
        let name = require_text(name, "folder name")?;
        let workspace_id = self.workspace(workspace_id)?.id.clone();
        let folder = Folder {
            id: self.fresh_id("folder"),
            order: self.next_root_order(&workspace_id),
            workspace_id,
            name,
            created_at: stamp.at.clone(),
        };
        self.folders.push(folder.clone());
        Ok(folder)
    }

    pub fn rename_folder(&mut self, id: &str, name: &str) -> Result<Folder, AppError> {
        let name = require_text(name, "folder name")?;
        let id = self.folder(id)?.id.clone();
        let folder = self
            .folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| AppError::not_found(format!("folder not found: {id}")))?;
        folder.name = name;
        Ok(folder.clone())
    }

    /// Removes the folder together with its lists and their tasks.
    pub fn delete_folder(&mut self, id: &str) -> Result<Folder, AppError> {
        let folder = self.folder(id)?.clone();
        let list_ids: Vec<String> = self
            .lists
            .iter()
            .filter(|list| list.folder_id.as_deref() == Some(folder.id.as_str()))
            .map(|list| list.id.clone())
            .collect();
        let removed_tasks = self.remove_tasks_where(|task| list_ids.contains(&task.list_id));
        self.lists.retain(|list| !list_ids.contains(&list.id));
        self.folders.retain(|f| f.id != folder.id);
        self.renumber_root(&folder.workspace_id);
        debug!(folder = %folder.id, lists = list_ids.len(), tasks = removed_tasks, "deleted folder");
        Ok(folder)
    }

    pub fn create_list(
        &mut self,
        workspace_id: &str,
        folder_id: Option<&str>,
        name: &str,
        stamp: &Stamp,
    ) -> Result<List, AppError> {
        let name = require_text(name, "list name")?;
        let workspace_id = self.workspace(workspace_id)?.id.clone();
        let folder_id = match folder_id {
            Some(folder_id) => {
                let folder = self.folder(folder_id)?;
                if folder.workspace_id != workspace_id {
                    return Err(AppError::invalid_input(
                        "folder belongs to a different workspace",
                    ));
                }
                Some(folder.id.clone())
            }
            None => None,
        };
        let order = match folder_id.as_deref() {
            Some(folder_id) => self.next_folder_order(folder_id),
            None => self.next_root_order(&workspace_id),
        };
        let list = List {
            id: self.fresh_id("list"),
            workspace_id,
            folder_id,
            name,
            order,
            created_at: stamp.at.clone(),
        };
        self.lists.push(list.clone());
        Ok(list)
    }

    pub fn rename_list(&mut self, id: &str, name: &str) -> Result<List, AppError> {
        let name = require_text(name, "list name")?;
        let id = self.list(id)?.id.clone();
        let list = self
            .lists
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::not_found(format!("list not found: {id}")))?;
        list.name = name;
        Ok(list.clone())
    }

    /// Removes the list and its tasks.
    pub fn delete_list(&mut self, id: &str) -> Result<List, AppError> {
        let list = self.list(id)?.clone();
        let removed_tasks = self.remove_tasks_where(|task| task.list_id == list.id);
        self.lists.retain(|l| l.id != list.id);
        match list.folder_id.as_deref() {
            Some(folder_id) => self.renumber_folder(folder_id),
            None => self.renumber_root(&list.workspace_id),
        }
        debug!(list = %list.id, tasks = removed_tasks, "deleted list");
        Ok(list)
    }

    /// Folders and root lists share one order sequence per workspace.
    fn next_root_order(&self, workspace_id: &str) -> u32 {
        let folders = self
            .folders
            .iter()
            .filter(|f| f.workspace_id == workspace_id)
            .map(|f| f.order + 1);
        let root_lists = self
            .lists
            .iter()
            .filter(|l| l.workspace_id == workspace_id && l.folder_id.is_none())
            .map(|l| l.order + 1);
        folders.chain(root_lists).max().unwrap_or(0)
    }

    fn next_folder_order(&self, folder_id: &str) -> u32 {
        self.lists
            .iter()
            .filter(|l| l.folder_id.as_deref() == Some(folder_id))
            .map(|l| l.order + 1)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use crate::board::Board;
    use crate::board::fixtures::{add_task, seeded, stamp};

    #[test]
    fn create_workspace_rejects_blank_name() {
        let mut board = Board::default();
        let err = board.create_workspace("   ", &stamp()).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn new_entities_take_next_order() {
        let mut board = Board::default();
        let a = board.create_workspace("A", &stamp()).unwrap();
        let b = board.create_workspace("B", &stamp()).unwrap();
        assert_eq!((a.order, b.order), (0, 1));

        let folder = board.create_folder(&a.id, "F", &stamp()).unwrap();
        let root = board.create_list(&a.id, None, "Root", &stamp()).unwrap();
        let inner_1 = board.create_list(&a.id, Some(&folder.id), "One", &stamp()).unwrap();
        let inner_2 = board.create_list(&a.id, Some(&folder.id), "Two", &stamp()).unwrap();

        assert_eq!(folder.order, 0);
        assert_eq!(root.order, 1);
        assert_eq!(inner_1.order, 0);
        assert_eq!(inner_2.order, 1);
    }

    #[test]
    fn create_list_rejects_folder_from_other_workspace() {
        let mut seeded = seeded();
        let other = seeded.board.create_workspace("Other", &stamp()).unwrap();
        let err = seeded
            .board
            .create_list(&other.id, Some(&seeded.folder), "Nope", &stamp())
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn delete_folder_cascades_to_lists_and_tasks() {
        let mut seeded = seeded();
        let inside = add_task(&mut seeded.board, &seeded.backlog, "inside");
        let outside = add_task(&mut seeded.board, &seeded.inbox, "outside");
        seeded.board.add_dependency(&outside, &inside, &stamp()).unwrap();

        seeded.board.delete_folder(&seeded.folder).unwrap();

        assert!(seeded.board.list(&seeded.backlog).is_err());
        assert!(seeded.board.task(&inside).is_err());
        let remaining = seeded.board.task(&outside).unwrap();
        assert!(remaining.dependencies.is_empty());
        assert_eq!(seeded.board.list(&seeded.inbox).unwrap().order, 0);
    }

    #[test]
    fn delete_workspace_removes_everything_beneath() {
        let mut seeded = seeded();
        add_task(&mut seeded.board, &seeded.inbox, "gone");
        seeded.board.delete_workspace(&seeded.workspace).unwrap();
        assert!(seeded.board.workspaces.is_empty());
        assert!(seeded.board.folders.is_empty());
        assert!(seeded.board.lists.is_empty());
        assert!(seeded.board.tasks.is_empty());
    }

    #[test]
    fn delete_list_renumbers_siblings() {
        let mut seeded = seeded();
        let second = seeded
            .board
            .create_list(&seeded.workspace, Some(&seeded.folder), "Second", &stamp())
            .unwrap();
        seeded.board.delete_list(&seeded.backlog).unwrap();
        assert_eq!(seeded.board.list(&second.id).unwrap().order, 0);
    }

    #[test]
    fn rename_list_updates_name() {
        let mut seeded = seeded();
        let renamed = seeded.board.rename_list(&seeded.inbox, " Triage ").unwrap();
        assert_eq!(renamed.name, "Triage");
    }
}
