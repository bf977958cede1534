use serde::{Deserialize, Serialize};

pub const MAX_QUICK_ACCESS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSettings {
    /// Replace a same-named file at a move destination instead of renaming.
    pub overwrite_existing: bool,
    /// Try the recycle bin before deleting permanently.
    pub prefer_recoverable_delete: bool,
    pub quick_access_limit: usize,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            overwrite_existing: false,
            prefer_recoverable_delete: true,
            quick_access_limit: MAX_QUICK_ACCESS,
        }
    }
}
