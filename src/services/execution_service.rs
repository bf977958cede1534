use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AppError;
use crate::models::file_record::{Decision, FileRecord};
use crate::models::plan::{ExecutionPlan, ExecutionProgress, ExecutionResult, MoveEntry};
use crate::services::file_service::{self, MoveOutcome};
use crate::services::folder_tree_service::FolderTree;
use crate::services::trash_service::{self, DeleteMethod, RecoverableDelete};

/// Turns the decided records into a plan. Folders are scheduled for creation
/// when the tree knows them as virtual, each one once, in the order the moves
/// first reference them.
pub fn build_plan(records: &[FileRecord], tree: &FolderTree) -> ExecutionPlan {
    let mut plan = ExecutionPlan::default();
    let mut scheduled: HashSet<&str> = HashSet::new();

    for record in records {
        match record.decision() {
            Decision::Delete => plan.deletes.push(record.path.clone()),
            Decision::Move => {
                let Some(destination) = record.destination_folder().filter(|d| !d.is_empty())
                else {
                    continue;
                };
                plan.moves.push(MoveEntry {
                    source: record.path.clone(),
                    destination_folder: destination.to_string(),
                });

                let is_virtual = tree.find(destination).map(|n| !n.exists).unwrap_or(false);
                if is_virtual && scheduled.insert(destination) {
                    plan.folders_to_create.push(destination.to_string());
                }
            }
            Decision::Pending | Decision::Keep | Decision::Skip => {}
        }
    }
    plan
}

/// Executes plans on the calling thread: folders, then moves, then deletes.
/// Every entry is attempted on its own; failures end up in the result.
pub struct Committer<'a> {
    recoverable: Option<&'a dyn RecoverableDelete>,
    overwrite_existing: bool,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl<'a> Committer<'a> {
    pub fn new(recoverable: Option<&'a dyn RecoverableDelete>) -> Self {
        Self {
            recoverable,
            overwrite_existing: false,
            cancel_flag: None,
        }
    }

    pub fn overwrite_existing(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    /// Checked between operations; an operation in flight always finishes.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    pub fn execute(
        &self,
        plan: &ExecutionPlan,
        mut progress: impl FnMut(ExecutionProgress),
    ) -> ExecutionResult {
        let total = plan.total_operations();
        let mut result = ExecutionResult::default();
        let mut completed = 0;
        info!(
            folders = plan.folders_to_create.len(),
            moves = plan.moves.len(),
            deletes = plan.deletes.len(),
            "executing plan"
        );

        let mut report = |completed: usize, description: String| {
            progress(ExecutionProgress {
                completed,
                total,
                description,
            });
        };

        for folder in &plan.folders_to_create {
            if self.stop(&mut result, total - completed) {
                return result;
            }
            let description = match file_service::create_dir(Path::new(folder)) {
                Ok(()) => {
                    result.folders_created += 1;
                    format!("Created folder {folder}")
                }
                Err(e) => {
                    result.push_error(format!("Failed to create folder {folder}: {e}"));
                    format!("Could not create folder {folder}")
                }
            };
            completed += 1;
            report(completed, description);
        }

        for entry in &plan.moves {
            if self.stop(&mut result, total - completed) {
                return result;
            }
            let outcome = file_service::move_into(
                Path::new(&entry.source),
                Path::new(&entry.destination_folder),
                self.overwrite_existing,
            );
            let description = record_move(entry, outcome, &mut result);
            completed += 1;
            report(completed, description);
        }

        for path in &plan.deletes {
            if self.stop(&mut result, total - completed) {
                return result;
            }
            let description = self.delete_one(path, &mut result);
            completed += 1;
            report(completed, description);
        }

        info!(
            created = result.folders_created,
            moved = result.files_moved,
            deleted = result.files_deleted,
            errors = result.error_count,
            "plan finished"
        );
        result
    }

    fn stop(&self, result: &mut ExecutionResult, remaining: usize) -> bool {
        if !self.is_cancelled() {
            return false;
        }
        warn!(remaining, "execution cancelled");
        result.cancelled = true;
        result.push_error(format!("Cancelled with {remaining} operation(s) not run"));
        true
    }

    fn delete_one(&self, path: &str, result: &mut ExecutionResult) -> String {
        match trash_service::delete_with_fallback(self.recoverable, Path::new(path)) {
            Ok(DeleteMethod::Recoverable) => {
                result.files_deleted += 1;
                format!("Deleted {path}")
            }
            Ok(DeleteMethod::Permanent { fallback_reason }) => {
                result.files_deleted += 1;
                if let Some(reason) = fallback_reason {
                    result
                        .notes
                        .push(format!("Permanently deleted {path} ({reason})"));
                }
                format!("Deleted {path} permanently")
            }
            Err(e) => {
                result.push_error(format!("Failed to delete {path}: {e}"));
                format!("Could not delete {path}")
            }
        }
    }
}

/// Books one move into `result` and describes it for progress reporting.
fn record_move(
    entry: &MoveEntry,
    outcome: Result<MoveOutcome, AppError>,
    result: &mut ExecutionResult,
) -> String {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            result.push_error(format!(
                "Failed to move {} to {}: {e}",
                entry.source, entry.destination_folder
            ));
            return format!("Could not move {}", entry.source);
        }
    };

    result.files_moved += 1;
    let dest_dir = Path::new(&entry.destination_folder);
    let requested = Path::new(&entry.source)
        .file_name()
        .map(|name| dest_dir.join(name))
        .unwrap_or_else(|| dest_dir.to_path_buf());
    if outcome.destination() != requested {
        result.renamed.push((
            requested.to_string_lossy().to_string(),
            outcome.destination().to_string_lossy().to_string(),
        ));
    }
    if let MoveOutcome::CopiedSourceRetained { destination, reason } = &outcome {
        // Counted as moved: the data is at the destination.
        result.errors.push(format!(
            "Copied {} to {} but could not remove the original: {reason}",
            entry.source,
            destination.display()
        ));
    }
    format!(
        "Moved {} to {}",
        entry.source,
        outcome.destination().display()
    )
}
