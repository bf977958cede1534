//! One review session over a source folder.
//!
//! [`ReviewSession`] owns the ledger, the destination tree and the store
//! connection for a single source folder (the session key). Store failures are
//! logged and make the session non-resumable; they never interrupt review.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::data::repository::{self, PersistedDecision, RecentFolder};
use crate::error::AppError;
use crate::logging::LogContext;
use crate::models::file_record::{Decision, DecisionTally, FileRecord};
use crate::models::filter::FilterSpec;
use crate::models::folder_node::NodeId;
use crate::models::plan::{ExecutionPlan, ExecutionProgress, ExecutionResult};
use crate::models::settings::ReviewSettings;
use crate::scope_path;
use crate::services::execution_service::{self, Committer};
use crate::services::folder_tree_service::FolderTree;
use crate::services::ledger_service::DecisionLedger;
use crate::services::trash_service::{RecoverableDelete, SystemTrash};
use crate::services::{scan_service, settings_service};

/// What every review front end drives, whatever it looks like.
pub trait ReviewCapability {
    fn decide(&mut self, decision: Decision, destination: Option<&str>) -> Result<(), AppError>;

    fn go_back(&mut self) -> Option<usize>;

    fn set_filter(&mut self, spec: FilterSpec) -> Option<usize>;

    fn build_plan(&self) -> ExecutionPlan;

    fn execute(
        &mut self,
        plan: &ExecutionPlan,
        progress: &mut dyn FnMut(ExecutionProgress),
    ) -> ExecutionResult;
}

pub struct ReviewSession {
    session_key: String,
    ledger: DecisionLedger,
    tree: FolderTree,
    store: Option<Connection>,
    settings: ReviewSettings,
    recoverable: Option<Box<dyn RecoverableDelete>>,
    cancel_flag: Arc<AtomicBool>,
    log: LogContext,
    resumable: bool,
}

impl ReviewSession {
    /// Scans `source`, then restores the saved tree and decisions from `store`.
    pub fn open(
        source: &Path,
        store: Option<Connection>,
        log: &LogContext,
    ) -> Result<Self, AppError> {
        let session_key = scope_path::normalize_path(source);
        let log = log.for_session(&session_key);
        let scope = log.clone();
        scope.scope(|| Self::open_in_scope(session_key, store, log))
    }

    fn open_in_scope(
        session_key: String,
        store: Option<Connection>,
        log: LogContext,
    ) -> Result<Self, AppError> {
        let records = scan_service::scan(Path::new(&session_key))?;

        let mut tree = FolderTree::new();
        tree.set_root(&session_key);

        let mut resumable = store.is_some();
        let mut settings = ReviewSettings::default();
        let mut persisted: Vec<PersistedDecision> = Vec::new();

        if let Some(conn) = &store {
            match settings_service::load(conn) {
                Ok(loaded) => settings = loaded,
                Err(e) => warn!("could not load settings, using defaults: {e}"),
            }
            if let Err(e) = tree.load(conn, &session_key) {
                warn!("could not restore folder tree: {e}");
                resumable = false;
            }
            match repository::load_decisions(conn, &session_key) {
                Ok(rows) => persisted = rows,
                Err(e) => {
                    warn!("could not restore decisions: {e}");
                    resumable = false;
                }
            }
            if let Err(e) = repository::touch_recent_folder(conn, &session_key, chrono::Utc::now()) {
                warn!("could not record recent folder: {e}");
            }
        }

        // Saved moves may point at folders the saved tree no longer lists.
        for saved in persisted.iter().filter(|p| p.decision == Decision::Move) {
            if let Some(dest) = saved.destination_folder.as_deref() {
                if tree.find(dest).is_none() {
                    tree.add(dest, !Path::new(dest).is_dir());
                }
            }
        }

        let mut ledger = DecisionLedger::new(records);
        let restored = ledger.load_session(&persisted, &mut tree);
        info!(
            files = ledger.records().len(),
            restored,
            folders = tree.len(),
            "session opened"
        );

        Ok(Self {
            session_key,
            ledger,
            tree,
            store,
            settings,
            recoverable: Some(Box::new(SystemTrash)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            log,
            resumable,
        })
    }

    /// Replaces the recoverable-delete mechanism (`None`: delete permanently).
    /// It is only used while `prefer_recoverable_delete` is set.
    pub fn with_recoverable_delete(mut self, recoverable: Option<Box<dyn RecoverableDelete>>) -> Self {
        self.recoverable = recoverable;
        self
    }

    pub fn with_settings(mut self, settings: ReviewSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn settings(&self) -> &ReviewSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &DecisionLedger {
        &self.ledger
    }

    pub fn tree(&self) -> &FolderTree {
        &self.tree
    }

    pub fn current(&self) -> Option<&FileRecord> {
        self.ledger.current()
    }

    pub fn tally(&self) -> DecisionTally {
        self.ledger.tally()
    }

    /// `false` without a store, or once any store read or write failed.
    pub fn is_resumable(&self) -> bool {
        self.resumable
    }

    /// Shared flag a caller can set to stop a running `execute` between operations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    fn note_persistence(&mut self, what: &str, outcome: Result<(), AppError>) {
        if let Err(e) = outcome {
            self.log
                .scope(|| warn!("could not save {what}; session will not resume: {e}"));
            self.resumable = false;
        }
    }

    fn save_record(&mut self, path: &str) {
        let outcome = match &self.store {
            Some(conn) => self.ledger.persist_record(conn, &self.session_key, path),
            None => Ok(()),
        };
        self.note_persistence("decision", outcome);
    }

    fn save_tree(&mut self) {
        let outcome = match &self.store {
            Some(conn) => self.tree.save(conn, &self.session_key),
            None => Ok(()),
        };
        self.note_persistence("folder tree", outcome);
    }

    /// Decides a file by path without moving the cursor, as batch suggestions do.
    pub fn decide_path(
        &mut self,
        path: &str,
        decision: Decision,
        destination: Option<&str>,
    ) -> Result<bool, AppError> {
        let found = self
            .ledger
            .decide_path(path, decision, destination, &mut self.tree)?;
        if found {
            self.save_record(path);
        }
        Ok(found)
    }

    pub fn revert_current(&mut self) -> Option<String> {
        let path = self.ledger.revert_current(&mut self.tree)?;
        self.save_record(&path);
        Some(path)
    }

    pub fn add_folder(&mut self, path: &str, is_virtual: bool) -> Option<NodeId> {
        let id = self.tree.add(path, is_virtual)?;
        self.save_tree();
        Some(id)
    }

    pub fn remove_folder(&mut self, path: &str) -> Result<bool, AppError> {
        let removed = self.tree.remove(path)?;
        if removed {
            self.save_tree();
        }
        Ok(removed)
    }

    pub fn rename_folder(&mut self, path: &str, display_name: &str) -> bool {
        let renamed = self.tree.rename(path, display_name);
        if renamed {
            self.save_tree();
        }
        renamed
    }

    pub fn pin_folder(&mut self, path: &str, pinned: bool) -> bool {
        let changed = self.tree.set_pinned(path, pinned);
        if changed {
            self.save_tree();
        }
        changed
    }

    pub fn connect_folders(&mut self, paths: &[&str], group_id: Option<u32>) -> u32 {
        let group = self.tree.connect(paths, group_id);
        self.save_tree();
        group
    }

    pub fn disconnect_folder(&mut self, path: &str) -> bool {
        let changed = self.tree.disconnect(path);
        if changed {
            self.save_tree();
        }
        changed
    }

    /// Writes the full decision set and tree.
    pub fn persist(&mut self) {
        let outcome = match &self.store {
            Some(conn) => self
                .ledger
                .persist(conn, &self.session_key)
                .and_then(|()| self.tree.save(conn, &self.session_key)),
            None => Ok(()),
        };
        self.note_persistence("session", outcome);
    }

    pub fn quick_access(&self) -> Vec<String> {
        match &self.store {
            Some(conn) => repository::load_quick_access(conn, &self.session_key).unwrap_or_else(|e| {
                self.log.scope(|| warn!("could not load quick access folders: {e}"));
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    pub fn set_quick_access(&mut self, folders: &[String]) {
        let limit = self.settings.quick_access_limit.min(folders.len());
        let outcome = match &self.store {
            Some(conn) => repository::save_quick_access(conn, &self.session_key, &folders[..limit]),
            None => Ok(()),
        };
        self.note_persistence("quick access folders", outcome);
    }

    pub fn recent_folders(&self, limit: usize) -> Vec<RecentFolder> {
        match &self.store {
            Some(conn) => repository::recent_folders(conn, limit).unwrap_or_else(|e| {
                self.log.scope(|| warn!("could not load recent folders: {e}"));
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    /// Builds the plan from the current decisions and executes it.
    pub fn commit(&mut self, progress: &mut dyn FnMut(ExecutionProgress)) -> ExecutionResult {
        let plan = ReviewCapability::build_plan(self);
        ReviewCapability::execute(self, &plan, progress)
    }

    fn execute_in_scope(
        &mut self,
        plan: &ExecutionPlan,
        progress: &mut dyn FnMut(ExecutionProgress),
    ) -> ExecutionResult {
        self.cancel_flag.store(false, Ordering::Relaxed);
        let recoverable = if self.settings.prefer_recoverable_delete {
            self.recoverable.as_deref()
        } else {
            None
        };
        let result = Committer::new(recoverable)
            .overwrite_existing(self.settings.overwrite_existing)
            .cancel_flag(self.cancel_flag.clone())
            .execute(plan, |p| progress(p));

        for folder in &plan.folders_to_create {
            if Path::new(folder).is_dir() {
                self.tree.mark_created(folder);
            }
        }
        self.save_tree();

        if result.success() {
            if let Some(conn) = &self.store {
                let outcome = DecisionLedger::clear_session(conn, &self.session_key).map(|_| ());
                self.note_persistence("cleared session", outcome);
            }
        } else {
            warn!(
                errors = result.error_count,
                "plan finished with errors; decisions kept for retry"
            );
        }
        result
    }
}

impl ReviewCapability for ReviewSession {
    fn decide(&mut self, decision: Decision, destination: Option<&str>) -> Result<(), AppError> {
        let decided = self.ledger.decide(decision, destination, &mut self.tree)?;
        if let Some(path) = decided {
            self.save_record(&path);
        }
        Ok(())
    }

    fn go_back(&mut self) -> Option<usize> {
        self.ledger.go_back()
    }

    fn set_filter(&mut self, spec: FilterSpec) -> Option<usize> {
        self.ledger.set_filter(spec)
    }

    fn build_plan(&self) -> ExecutionPlan {
        execution_service::build_plan(self.ledger.records(), &self.tree)
    }

    fn execute(
        &mut self,
        plan: &ExecutionPlan,
        progress: &mut dyn FnMut(ExecutionProgress),
    ) -> ExecutionResult {
        let log = self.log.clone();
        log.scope(|| self.execute_in_scope(plan, progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::models::file_record::ContentCategory;
    use crate::models::filter::FileTypeFilter;
    use crate::services::trash_service::AppTrash;
    use std::fs;

    fn source_with(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        dir
    }

    fn open(dir: &Path, store: Option<Connection>) -> ReviewSession {
        ReviewSession::open(dir, store, &LogContext::disabled())
            .unwrap()
            .with_recoverable_delete(None)
    }

    #[test]
    fn test_open_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReviewSession::open(&dir.path().join("nope"), None, &LogContext::disabled());
        assert!(matches!(result, Err(AppError::SourceNotFound(_))));
    }

    #[test]
    fn test_decisions_survive_reopen() {
        let dir = source_with(&["a.txt", "b.txt", "c.txt"]);
        let store_dir = tempfile::tempdir().unwrap();
        let store_path = store_dir.path().join("store.db");
        let archive = scope_path::normalize_path(&dir.path().join("Archive"));

        {
            let mut session = open(dir.path(), Some(data::open_store(&store_path).unwrap()));
            session.add_folder(&archive, true);
            session.decide(Decision::Keep, None).unwrap();
            session.decide(Decision::Move, Some(&archive)).unwrap();
            assert!(session.is_resumable());
        }

        let session = open(dir.path(), Some(data::open_store(&store_path).unwrap()));
        assert_eq!(session.tally().keep, 1);
        assert_eq!(session.tally().moved, 1);
        let node = session.tree().find(&archive).unwrap();
        assert!(!node.exists);
        assert_eq!(node.assigned_file_count, 1);
        assert_eq!(session.current().unwrap().name, "c.txt");

        let recent = session.recent_folders(5);
        assert_eq!(recent[0].folder_path, session.session_key());
    }

    #[test]
    fn test_restored_move_adds_missing_folder_node() {
        let dir = source_with(&["a.txt"]);
        let conn = data::open_in_memory().unwrap();
        let key = scope_path::normalize_path(dir.path());
        let elsewhere = format!("{key}/Elsewhere");
        repository::upsert_decision(&conn, &key, &format!("{key}/a.txt"), Decision::Move, Some(&elsewhere))
            .unwrap();

        let session = open(dir.path(), Some(conn));
        let node = session.tree().find(&elsewhere).unwrap();
        assert!(!node.exists);
        assert_eq!(node.assigned_file_count, 1);
    }

    #[test]
    fn test_session_without_store_still_reviews() {
        let dir = source_with(&["a.jpg", "b.txt"]);
        let mut session = open(dir.path(), None);
        assert!(!session.is_resumable());

        let images = FilterSpec {
            file_type: FileTypeFilter::Category(ContentCategory::Image),
            ..Default::default()
        };
        assert_eq!(session.set_filter(images), Some(0));
        session.decide(Decision::Delete, None).unwrap();
        assert!(session.ledger().is_exhausted());
        session.persist();
        assert!(session.quick_access().is_empty());
    }

    #[test]
    fn test_remove_folder_refused_while_assigned() {
        let dir = source_with(&["a.txt"]);
        let mut session = open(dir.path(), Some(data::open_in_memory().unwrap()));
        let target = scope_path::normalize_path(&dir.path().join("Target"));
        session.add_folder(&target, true);
        session.decide(Decision::Move, Some(&target)).unwrap();

        assert!(session.remove_folder(&target).is_err());

        session.go_back();
        session.revert_current();
        assert!(session.remove_folder(&target).unwrap());
    }

    #[test]
    fn test_quick_access_respects_limit() {
        let dir = source_with(&[]);
        let mut session = open(dir.path(), Some(data::open_in_memory().unwrap())).with_settings(
            ReviewSettings {
                quick_access_limit: 2,
                ..Default::default()
            },
        );
        let folders: Vec<String> = ["/a", "/b", "/c"].iter().map(|s| s.to_string()).collect();
        session.set_quick_access(&folders);
        assert_eq!(session.quick_access(), vec!["/a", "/b"]);
    }

    #[test]
    fn test_failed_commit_keeps_decisions() {
        let dir = source_with(&["a.txt", "b.txt"]);
        let conn = data::open_in_memory().unwrap();
        let mut session = open(dir.path(), Some(conn));

        session.decide(Decision::Delete, None).unwrap();
        session.decide(Decision::Delete, None).unwrap();
        fs::remove_file(dir.path().join("b.txt")).unwrap();

        let result = session.commit(&mut |_| {});
        assert!(!result.success());
        assert_eq!(result.files_deleted, 1);

        let store = session.store.as_ref().unwrap();
        let saved = repository::load_decisions(store, session.session_key()).unwrap();
        assert_eq!(saved.len(), 2);
    }

    #[test]
    fn test_successful_commit_clears_decisions() {
        let dir = source_with(&["a.txt"]);
        let mut session = open(dir.path(), Some(data::open_in_memory().unwrap()));
        session.decide(Decision::Delete, None).unwrap();

        let result = session.commit(&mut |_| {});
        assert!(result.success());

        let store = session.store.as_ref().unwrap();
        assert!(repository::load_decisions(store, session.session_key())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_created_folder_is_not_virtual_after_reopen() {
        let dir = source_with(&["a.txt", "b.txt"]);
        let store_dir = tempfile::tempdir().unwrap();
        let store_path = store_dir.path().join("store.db");
        let archive = scope_path::normalize_path(&dir.path().join("Archive"));

        {
            let mut session = open(dir.path(), Some(data::open_store(&store_path).unwrap()));
            session.add_folder(&archive, true);
            session.decide(Decision::Move, Some(&archive)).unwrap();
            let result = session.commit(&mut |_| {});
            assert!(result.success());
            assert_eq!(result.folders_created, 1);
        }

        let mut session = open(dir.path(), Some(data::open_store(&store_path).unwrap()));
        assert!(session.tree().find(&archive).unwrap().exists);

        session.decide(Decision::Move, Some(&archive)).unwrap();
        let plan = session.build_plan();
        assert!(plan.folders_to_create.is_empty());
        let result = session.execute(&plan, &mut |_| {});
        assert!(result.success());
        assert_eq!(result.folders_created, 0);
        assert!(dir.path().join("Archive").join("b.txt").is_file());
    }

    #[test]
    fn test_recoverable_delete_follows_settings() {
        let dir = source_with(&["a.txt", "b.txt"]);
        let trash_dir = tempfile::tempdir().unwrap();
        let trash_root = trash_dir.path().join("trash");

        let mut session = open(dir.path(), None)
            .with_recoverable_delete(Some(Box::new(AppTrash::new(&trash_root))))
            .with_settings(ReviewSettings {
                prefer_recoverable_delete: false,
                ..Default::default()
            });
        session.decide(Decision::Delete, None).unwrap();
        let result = session.commit(&mut |_| {});
        assert_eq!(result.files_deleted, 1);
        assert!(!trash_root.exists());

        let mut session = session.with_settings(ReviewSettings::default());
        session.decide_path(&format!("{}/b.txt", session.session_key()), Decision::Delete, None)
            .unwrap();
        let result = session.commit(&mut |_| {});
        assert_eq!(result.files_deleted, 1);
        assert_eq!(fs::read_dir(&trash_root).unwrap().count(), 2);
    }
}
