use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEntry {
    pub source: String,
    pub destination_folder: String,
}

/// What a commit will do, in the order it will do it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub folders_to_create: Vec<String>,
    pub moves: Vec<MoveEntry>,
    pub deletes: Vec<String>,
}

impl ExecutionPlan {
    pub fn total_operations(&self) -> usize {
        self.folders_to_create.len() + self.moves.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_operations() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProgress {
    pub completed: usize,
    pub total: usize,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub folders_created: usize,
    pub files_moved: usize,
    pub files_deleted: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
    /// Remarks that are not failures, e.g. which deletes fell back to permanent.
    pub notes: Vec<String>,
    /// (requested destination, actual destination) for collision renames.
    pub renamed: Vec<(String, String)>,
    pub cancelled: bool,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.error_count == 0
    }

    pub(crate) fn push_error(&mut self, message: String) {
        self.error_count += 1;
        self.errors.push(message);
    }
}
