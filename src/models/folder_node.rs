use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub path: String,
    pub name: String,
    /// `false` for a virtual folder that the commit will create.
    pub exists: bool,
    pub is_pinned: bool,
    pub is_external: bool,
    pub connection_group_id: Option<u32>,
    pub assigned_file_count: usize,
}

impl FolderNode {
    pub fn is_connected(&self) -> bool {
        self.connection_group_id.is_some()
    }

    pub fn is_virtual(&self) -> bool {
        !self.exists
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Persisted shape of one non-root node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRow {
    pub folder_path: String,
    pub display_name: String,
    pub is_virtual: bool,
    pub is_pinned: bool,
    pub parent_path: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub folder_path: String,
    pub group_id: u32,
}
