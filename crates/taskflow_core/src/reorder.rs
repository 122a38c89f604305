//! Sidebar drag-and-drop reordering.
//!
//! Folders and root lists of a workspace share one order sequence; lists
//! inside a folder have their own. A drop splices the dragged entry into the
//! destination sequence and renumbers it `0..n`, then renumbers the source
//! sequence when the entry changed parents.

use crate::board::Board;
use crate::error::AppError;
use crate::model::{Folder, List};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Before,
    Middle,
    After,
}

/// Maps the pointer position inside a row to a drop zone. Rows that accept
/// children (folders) get a middle band covering half their height.
pub fn drop_zone_for(offset_y: f64, height: f64, accepts_children: bool) -> DropZone {
    if height <= 0.0 {
        return DropZone::After;
    }
    let ratio = (offset_y / height).clamp(0.0, 1.0);
    if accepts_children {
        if ratio < 0.25 {
            DropZone::Before
        } else if ratio > 0.75 {
            DropZone::After
        } else {
            DropZone::Middle
        }
    } else if ratio < 0.5 {
        DropZone::Before
    } else {
        DropZone::After
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarEntry {
    Folder(String),
    List(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Folder(String),
    List(String),
}

impl Board {
    /// Folders and root lists of a workspace in display order.
    pub fn root_sequence(&self, workspace_id: &str) -> Vec<SidebarEntry> {
        let mut keyed: Vec<(u32, u8, &str, SidebarEntry)> = Vec::new();
        for folder in self.folders.iter().filter(|f| f.workspace_id == workspace_id) {
            keyed.push((
                folder.order,
                0,
                folder.id.as_str(),
                SidebarEntry::Folder(folder.id.clone()),
            ));
        }
        for list in self
            .lists
            .iter()
            .filter(|l| l.workspace_id == workspace_id && l.folder_id.is_none())
        {
            keyed.push((list.order, 1, list.id.as_str(), SidebarEntry::List(list.id.clone())));
        }
        keyed.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));
        keyed.into_iter().map(|(_, _, _, entry)| entry).collect()
    }

    /// List ids inside a folder in display order.
    pub fn folder_sequence(&self, folder_id: &str) -> Vec<String> {
        let mut lists: Vec<&List> = self
            .lists
            .iter()
            .filter(|l| l.folder_id.as_deref() == Some(folder_id))
            .collect();
        lists.sort_by(|a, b| (a.order, &a.id).cmp(&(b.order, &b.id)));
        lists.into_iter().map(|l| l.id.clone()).collect()
    }

    pub(crate) fn renumber_root(&mut self, workspace_id: &str) {
        let sequence = self.root_sequence(workspace_id);
        self.write_root_sequence(&sequence);
    }

    pub(crate) fn renumber_folder(&mut self, folder_id: &str) {
        let sequence = self.folder_sequence(folder_id);
        self.write_folder_sequence(&sequence);
    }

    fn write_root_sequence(&mut self, sequence: &[SidebarEntry]) {
        for (order, entry) in sequence.iter().enumerate() {
            match entry {
                SidebarEntry::Folder(id) => {
                    if let Some(folder) = self.folders.iter_mut().find(|f| &f.id == id) {
                        folder.order = order as u32;
                    }
                }
                SidebarEntry::List(id) => {
                    if let Some(list) = self.lists.iter_mut().find(|l| &l.id == id) {
                        list.order = order as u32;
                    }
                }
            }
        }
    }

    fn write_folder_sequence(&mut self, sequence: &[String]) {
        for (order, id) in sequence.iter().enumerate() {
            if let Some(list) = self.lists.iter_mut().find(|l| &l.id == id) {
                list.order = order as u32;
            }
        }
    }

    /// Moves a folder before or after another root entry of the same
    /// workspace. Folders never nest, so `Middle` behaves like `After`.
    pub fn move_folder(
        &mut self,
        folder_id: &str,
        target: &DropTarget,
        zone: DropZone,
    ) -> Result<Folder, AppError> {
        let folder = self.folder(folder_id)?.clone();
        let anchor = match target {
            DropTarget::Folder(target_id) => {
                let target = self.folder(target_id)?;
                if target.workspace_id != folder.workspace_id {
                    return Err(AppError::invalid_input("cannot move a folder across workspaces"));
                }
                SidebarEntry::Folder(target.id.clone())
            }
            DropTarget::List(target_id) => {
                let target = self.list(target_id)?;
                if target.workspace_id != folder.workspace_id {
                    return Err(AppError::invalid_input("cannot move a folder across workspaces"));
                }
                if target.folder_id.is_some() {
                    return Err(AppError::invalid_input("folders cannot be nested"));
                }
                SidebarEntry::List(target.id.clone())
            }
        };
        let moving = SidebarEntry::Folder(folder.id.clone());
        if anchor == moving {
            return Ok(folder);
        }

        let mut sequence = self.root_sequence(&folder.workspace_id);
        sequence.retain(|entry| entry != &moving);
        let index = splice_index(&sequence, &anchor, zone);
        sequence.insert(index, moving);
        self.write_root_sequence(&sequence);
        debug!(folder = %folder.id, index, "moved folder");
        self.folder(&folder.id).cloned()
    }

    /// Moves a list relative to another list, or onto a folder. Dropping on
    /// a folder's middle re-parents the list into it (appended last); its
    /// edges place the list as a root entry beside the folder.
    pub fn move_list(
        &mut self,
        list_id: &str,
        target: &DropTarget,
        zone: DropZone,
    ) -> Result<List, AppError> {
        let list = self.list(list_id)?.clone();
        let workspace_id = list.workspace_id.clone();

        let (destination, anchor) = match target {
            DropTarget::List(target_id) => {
                let target = self.list(target_id)?;
                if target.id == list.id {
                    return Ok(list);
                }
                if target.workspace_id != workspace_id {
                    return Err(AppError::invalid_input("cannot move a list across workspaces"));
                }
                let anchor = match target.folder_id {
                    Some(_) => Anchor::Folder(target.id.clone()),
                    None => Anchor::Root(SidebarEntry::List(target.id.clone())),
                };
                (target.folder_id.clone(), Some(anchor))
            }
            DropTarget::Folder(target_id) => {
                let target = self.folder(target_id)?;
                if target.workspace_id != workspace_id {
                    return Err(AppError::invalid_input("cannot move a list across workspaces"));
                }
                match zone {
                    DropZone::Middle => (Some(target.id.clone()), None),
                    DropZone::Before | DropZone::After => (
                        None,
                        Some(Anchor::Root(SidebarEntry::Folder(target.id.clone()))),
                    ),
                }
            }
        };

        let source = list.folder_id.clone();
        if let Some(moved) = self.lists.iter_mut().find(|l| l.id == list.id) {
            moved.folder_id = destination.clone();
        }

        match destination.as_deref() {
            Some(folder_id) => {
                let mut sequence = self.folder_sequence(folder_id);
                sequence.retain(|id| id != &list.id);
                let index = match anchor {
                    Some(Anchor::Folder(anchor_id)) => {
                        match sequence.iter().position(|id| id == &anchor_id) {
                            Some(pos) if zone == DropZone::Before => pos,
                            Some(pos) => pos + 1,
                            None => sequence.len(),
                        }
                    }
                    _ => sequence.len(),
                };
                sequence.insert(index, list.id.clone());
                self.write_folder_sequence(&sequence);
            }
            None => {
                let moving = SidebarEntry::List(list.id.clone());
                let mut sequence = self.root_sequence(&workspace_id);
                sequence.retain(|entry| entry != &moving);
                let index = match anchor {
                    Some(Anchor::Root(entry)) => splice_index(&sequence, &entry, zone),
                    _ => sequence.len(),
                };
                sequence.insert(index, moving);
                self.write_root_sequence(&sequence);
            }
        }

        if source != destination {
            match source.as_deref() {
                Some(folder_id) => self.renumber_folder(folder_id),
                None => self.renumber_root(&workspace_id),
            }
        }
        debug!(list = %list.id, folder = ?destination, "moved list");
        self.list(&list.id).cloned()
    }
}

enum Anchor {
    Root(SidebarEntry),
    Folder(String),
}

fn splice_index(sequence: &[SidebarEntry], anchor: &SidebarEntry, zone: DropZone) -> usize {
    match sequence.iter().position(|entry| entry == anchor) {
        Some(pos) if zone == DropZone::Before => pos,
        Some(pos) => pos + 1,
        None => sequence.len(),
    }
}
