//! Review the entries of one folder a file at a time, decide keep, delete,
//! skip or move for each, then apply every decision in one batch.

pub mod data;
pub mod error;
pub mod logging;
pub mod models;
pub mod scope_path;
pub mod services;

pub use error::AppError;
pub use logging::LogContext;
pub use models::file_record::{ContentCategory, Decision, DecisionTally, FileRecord};
pub use models::filter::{FileTypeFilter, FilterSpec, SortDirection, SortKey};
pub use models::plan::{ExecutionPlan, ExecutionProgress, ExecutionResult, MoveEntry};
pub use models::settings::ReviewSettings;
pub use services::execution_service::Committer;
pub use services::folder_tree_service::FolderTree;
pub use services::ledger_service::DecisionLedger;
pub use services::session_service::{ReviewCapability, ReviewSession};
pub use services::trash_service::{AppTrash, RecoverableDelete, SystemTrash};
