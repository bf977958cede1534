//! Destination folder tree.
//!
//! Nodes live in an arena indexed by [`NodeId`]; a node lists its children by
//! id and names its parent by id. Removing a node frees its slot and the slots
//! of its subtree, so no id ever points at a detached node.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::data::repository;
use crate::error::AppError;
use crate::models::folder_node::{ConnectionRow, FolderNode, FolderRow, NodeId};
use crate::scope_path;

#[derive(Debug, Clone)]
pub struct FolderTree {
    nodes: Vec<Option<FolderNode>>,
    index: HashMap<String, NodeId>,
    root: Option<NodeId>,
    next_group_id: u32,
}

impl Default for FolderTree {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            root: None,
            next_group_id: 1,
        }
    }
}

impl FolderTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_root(&mut self, path: &str) -> NodeId {
        let path = scope_path::normalize(path);
        self.nodes.clear();
        self.index.clear();
        self.next_group_id = 1;

        let id = NodeId(0);
        self.nodes.push(Some(FolderNode {
            id,
            parent: None,
            children: Vec::new(),
            name: scope_path::display_name(&path),
            exists: Path::new(&path).is_dir(),
            is_pinned: false,
            is_external: false,
            connection_group_id: None,
            assigned_file_count: 0,
            path: path.clone(),
        }));
        self.index.insert(path, id);
        self.root = Some(id);
        id
    }

    pub fn root(&self) -> Option<&FolderNode> {
        self.root.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&FolderNode> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut FolderNode> {
        self.nodes.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub fn find(&self, path: &str) -> Option<&FolderNode> {
        self.index
            .get(&scope_path::normalize(path))
            .and_then(|id| self.get(*id))
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut FolderNode> {
        let id = *self.index.get(&scope_path::normalize(path))?;
        self.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Adds a node for `path` under the node of its parent directory, or under
    /// the root when that parent is not in the tree. Returns the existing node
    /// when `path` is already present and `None` when there is no root yet.
    pub fn add(&mut self, path: &str, is_virtual: bool) -> Option<NodeId> {
        let path = scope_path::normalize(path);
        if let Some(id) = self.index.get(&path) {
            return Some(*id);
        }

        let root_id = self.root?;
        let root_path = self.get(root_id)?.path.clone();
        let parent_id = scope_path::parent_of(&path)
            .and_then(|parent| self.index.get(&parent).copied())
            .unwrap_or(root_id);

        let id = NodeId(self.nodes.len());
        let node = FolderNode {
            id,
            parent: Some(parent_id),
            children: Vec::new(),
            name: scope_path::display_name(&path),
            exists: !is_virtual && Path::new(&path).is_dir(),
            is_pinned: false,
            is_external: !scope_path::is_within_scope(&path, &root_path),
            connection_group_id: None,
            assigned_file_count: 0,
            path: path.clone(),
        };
        debug!(path = %path, virtual_folder = is_virtual, "adding destination folder");

        self.nodes.push(Some(node));
        self.index.insert(path, id);
        if let Some(parent) = self.get_mut(parent_id) {
            parent.children.push(id);
        }
        Some(id)
    }

    /// Detaches a virtual, non-root node and its subtree.
    ///
    /// Returns `Ok(false)` for the root, unknown paths and folders that exist on
    /// disk. Refuses with [`AppError::FolderInUse`] while any node of the subtree
    /// is still the destination of a move decision.
    pub fn remove(&mut self, path: &str) -> Result<bool, AppError> {
        let Some(node) = self.find(path) else {
            return Ok(false);
        };
        if node.is_root() || node.exists {
            return Ok(false);
        }
        let id = node.id;
        let parent = node.parent;
        let node_path = node.path.clone();

        let subtree = self.subtree(id);
        let assigned: usize = subtree
            .iter()
            .filter_map(|sid| self.get(*sid))
            .map(|n| n.assigned_file_count)
            .sum();
        if assigned > 0 {
            return Err(AppError::FolderInUse {
                path: node_path,
                assigned,
            });
        }

        if let Some(parent) = parent.and_then(|pid| self.get_mut(pid)) {
            parent.children.retain(|child| *child != id);
        }
        for sid in subtree {
            if let Some(removed) = self.nodes.get_mut(sid.0).and_then(Option::take) {
                self.index.remove(&removed.path);
            }
        }
        debug!(path = %node_path, "removed destination folder");
        Ok(true)
    }

    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.get(next) {
                out.push(next);
                stack.extend(node.children.iter().copied());
            }
        }
        out
    }

    pub fn assign(&mut self, path: &str) -> bool {
        match self.find_mut(path) {
            Some(node) => {
                node.assigned_file_count += 1;
                true
            }
            None => false,
        }
    }

    pub fn unassign(&mut self, path: &str) -> bool {
        match self.find_mut(path) {
            Some(node) => {
                node.assigned_file_count = node.assigned_file_count.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Tags every known path in `paths` with one group id and returns it.
    pub fn connect(&mut self, paths: &[&str], group_id: Option<u32>) -> u32 {
        let group = group_id.unwrap_or(self.next_group_id);
        self.next_group_id = self.next_group_id.max(group.saturating_add(1));
        for path in paths {
            if let Some(node) = self.find_mut(path) {
                node.connection_group_id = Some(group);
            }
        }
        group
    }

    pub fn disconnect(&mut self, path: &str) -> bool {
        match self.find_mut(path) {
            Some(node) => node.connection_group_id.take().is_some(),
            None => false,
        }
    }

    pub fn next_group_id(&self) -> u32 {
        self.next_group_id
    }

    pub fn rename(&mut self, path: &str, display_name: &str) -> bool {
        match self.find_mut(path) {
            Some(node) => {
                node.name = display_name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_pinned(&mut self, path: &str, pinned: bool) -> bool {
        match self.find_mut(path) {
            Some(node) => {
                node.is_pinned = pinned;
                true
            }
            None => false,
        }
    }

    /// Marks a virtual folder as present on disk.
    pub fn mark_created(&mut self, path: &str) -> bool {
        match self.find_mut(path) {
            Some(node) => {
                node.exists = true;
                true
            }
            None => false,
        }
    }

    /// Re-probes every node against the filesystem.
    pub fn refresh_exists(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.exists = Path::new(&node.path).is_dir();
        }
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &FolderNode> + '_ {
        self.get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |child| self.get(*child))
    }

    /// Every node, parents before children, siblings in insertion order.
    pub fn nodes(&self) -> Vec<&FolderNode> {
        let mut out = Vec::with_capacity(self.index.len());
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                out.push(node);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn to_rows(&self) -> (Vec<FolderRow>, Vec<ConnectionRow>) {
        let mut folders = Vec::new();
        let mut connections = Vec::new();
        for node in self.nodes().into_iter().filter(|n| !n.is_root()) {
            folders.push(FolderRow {
                folder_path: node.path.clone(),
                display_name: node.name.clone(),
                is_virtual: !node.exists,
                is_pinned: node.is_pinned,
                parent_path: node
                    .parent
                    .and_then(|pid| self.get(pid))
                    .map(|p| p.path.clone()),
                sort_order: folders.len() as i64,
            });
            if let Some(group_id) = node.connection_group_id {
                connections.push(ConnectionRow {
                    folder_path: node.path.clone(),
                    group_id,
                });
            }
        }
        (folders, connections)
    }

    pub fn save(&self, conn: &Connection, session_key: &str) -> Result<(), AppError> {
        let (folders, connections) = self.to_rows();
        repository::replace_folder_tree(conn, session_key, &folders, &connections)
    }

    pub fn load(&mut self, conn: &Connection, session_key: &str) -> Result<usize, AppError> {
        let folders = repository::load_folder_tree(conn, session_key)?;
        let mut restored = 0;
        for row in &folders {
            if self.add(&row.folder_path, row.is_virtual).is_none() {
                continue;
            }
            self.rename(&row.folder_path, &row.display_name);
            self.set_pinned(&row.folder_path, row.is_pinned);
            restored += 1;
        }

        for connection in repository::load_connections(conn, session_key)? {
            if let Some(node) = self.find_mut(&connection.folder_path) {
                node.connection_group_id = Some(connection.group_id);
            }
            self.next_group_id = self
                .next_group_id
                .max(connection.group_id.saturating_add(1));
        }
        Ok(restored)
    }
}
