//! Per-file decisions and the review cursor.
//!
//! The ledger owns every [`FileRecord`] of a session, the [`DecisionTally`] and
//! a cursor into the records visible under the active [`FilterSpec`]. All
//! decision changes go through one transition so the tally and the folder
//! tree's assigned counts move in lock-step with the records.

use std::collections::HashMap;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::data::repository::{self, PersistedDecision};
use crate::error::AppError;
use crate::models::file_record::{Decision, DecisionTally, FileRecord};
use crate::models::filter::FilterSpec;
use crate::scope_path;
use crate::services::folder_tree_service::FolderTree;

#[derive(Debug, Clone, Default)]
pub struct DecisionLedger {
    records: Vec<FileRecord>,
    by_path: HashMap<String, usize>,
    tally: DecisionTally,
    filter: FilterSpec,
    visible: Vec<usize>,
    /// Position into `visible`; `None` once the review is exhausted.
    cursor: Option<usize>,
}

impl DecisionLedger {
    pub fn new(records: Vec<FileRecord>) -> Self {
        let by_path = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.path.clone(), i))
            .collect();
        let mut ledger = Self {
            records,
            by_path,
            ..Default::default()
        };
        let tally = ledger.records.iter().fold(DecisionTally::default(), |mut t, r| {
            t.record_change(Decision::Pending, r.decision());
            t
        });
        ledger.tally = tally;
        ledger.set_filter(FilterSpec::default());
        ledger
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn record(&self, path: &str) -> Option<&FileRecord> {
        self.by_path.get(path).map(|i| &self.records[*i])
    }

    pub fn tally(&self) -> DecisionTally {
        self.tally
    }

    pub fn filter(&self) -> &FilterSpec {
        &self.filter
    }

    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn visible(&self) -> impl Iterator<Item = &FileRecord> + '_ {
        self.visible.iter().map(|i| &self.records[*i])
    }

    pub fn current(&self) -> Option<&FileRecord> {
        let pos = self.cursor?;
        self.visible.get(pos).map(|i| &self.records[*i])
    }

    pub fn pending_count(&self) -> usize {
        self.records.len() - self.tally.reviewed()
    }

    pub fn pending_in_view(&self) -> usize {
        self.visible
            .iter()
            .filter(|i| self.records[**i].is_pending())
            .count()
    }

    /// Applies persisted decisions to records with the same path and re-derives
    /// the tally and folder counts from them. Returns how many were applied.
    pub fn load_session(&mut self, persisted: &[PersistedDecision], tree: &mut FolderTree) -> usize {
        let mut applied = 0;
        for saved in persisted {
            let Some(&idx) = self.by_path.get(&saved.file_path) else {
                continue;
            };
            if self
                .transition(
                    idx,
                    saved.decision,
                    saved.destination_folder.as_deref(),
                    tree,
                )
                .is_ok()
            {
                applied += 1;
            }
        }
        self.cursor = self.first_pending_position();
        debug!(applied, ignored = persisted.len() - applied, "restored decisions");
        applied
    }

    /// Recomputes the visible sequence and moves the cursor to its first
    /// pending record (or its start, or exhausted when it is empty).
    pub fn set_filter(&mut self, spec: FilterSpec) -> Option<usize> {
        self.visible = spec.apply(&self.records);
        self.filter = spec;
        self.cursor = self.first_pending_position();
        self.cursor
    }

    /// Decides the record under the cursor and advances to the next pending
    /// record. Returns the path of the decided record, `None` when exhausted.
    pub fn decide(
        &mut self,
        decision: Decision,
        destination: Option<&str>,
        tree: &mut FolderTree,
    ) -> Result<Option<String>, AppError> {
        let Some(pos) = self.cursor else {
            return Ok(None);
        };
        let idx = self.visible[pos];
        self.transition(idx, decision, destination, tree)?;
        self.cursor = self.next_pending_after(pos);
        Ok(Some(self.records[idx].path.clone()))
    }

    /// Decides a record by path without touching the cursor.
    pub fn decide_path(
        &mut self,
        path: &str,
        decision: Decision,
        destination: Option<&str>,
        tree: &mut FolderTree,
    ) -> Result<bool, AppError> {
        let Some(&idx) = self.by_path.get(path) else {
            return Ok(false);
        };
        self.transition(idx, decision, destination, tree)?;
        Ok(true)
    }

    /// Puts the record under the cursor back to pending. The cursor stays.
    pub fn revert_current(&mut self, tree: &mut FolderTree) -> Option<String> {
        let pos = self.cursor?;
        let idx = self.visible[pos];
        if self.records[idx].is_pending() {
            return None;
        }
        self.transition(idx, Decision::Pending, None, tree).ok()?;
        Some(self.records[idx].path.clone())
    }

    pub fn go_back(&mut self) -> Option<usize> {
        self.cursor = match self.cursor {
            Some(pos) => Some(pos.saturating_sub(1)),
            None if self.visible.is_empty() => None,
            None => Some(self.visible.len() - 1),
        };
        self.cursor
    }

    fn transition(
        &mut self,
        idx: usize,
        decision: Decision,
        destination: Option<&str>,
        tree: &mut FolderTree,
    ) -> Result<(), AppError> {
        let destination = destination
            .filter(|d| !d.trim().is_empty())
            .map(scope_path::normalize);
        if decision == Decision::Move && destination.is_none() {
            return Err(AppError::MissingDestination);
        }

        let record = &mut self.records[idx];
        let old = record.decision();
        let old_destination = record.destination_folder().map(str::to_string);
        record.set_decision(decision, destination.as_deref());

        self.tally.record_change(old, decision);
        if let Some(old_dest) = old_destination {
            tree.unassign(&old_dest);
        }
        if let Some(dest) = destination.as_deref().filter(|_| decision == Decision::Move) {
            if !tree.assign(dest) {
                debug!(destination = %dest, "move destination is not in the folder tree");
            }
        }
        Ok(())
    }

    fn first_pending_position(&self) -> Option<usize> {
        if self.visible.is_empty() {
            return None;
        }
        self.visible
            .iter()
            .position(|i| self.records[*i].is_pending())
            .or(Some(0))
    }

    fn next_pending_after(&self, pos: usize) -> Option<usize> {
        let len = self.visible.len();
        (pos + 1..len)
            .chain(0..=pos.min(len.saturating_sub(1)))
            .find(|p| self.records[self.visible[*p]].is_pending())
    }

    /// Rows for every decided record, the shape stored by `persist`.
    pub fn decided_rows(&self) -> Vec<(String, Decision, Option<String>)> {
        self.records
            .iter()
            .filter(|r| !r.is_pending())
            .map(|r| {
                (
                    r.path.clone(),
                    r.decision(),
                    r.destination_folder().map(str::to_string),
                )
            })
            .collect()
    }

    pub fn persist(&self, conn: &Connection, session_key: &str) -> Result<(), AppError> {
        let rows = self.decided_rows();
        repository::replace_decisions(conn, session_key, &rows)?;
        debug!(rows = rows.len(), "persisted decisions");
        Ok(())
    }

    /// Stores (or, once pending again, forgets) the decision of one record.
    pub fn persist_record(
        &self,
        conn: &Connection,
        session_key: &str,
        path: &str,
    ) -> Result<(), AppError> {
        let Some(record) = self.record(path) else {
            return Ok(());
        };
        if record.is_pending() {
            repository::delete_decision(conn, session_key, path)?;
        } else {
            repository::upsert_decision(
                conn,
                session_key,
                path,
                record.decision(),
                record.destination_folder(),
            )?;
        }
        Ok(())
    }

    pub fn clear_session(conn: &Connection, session_key: &str) -> Result<usize, AppError> {
        let cleared = repository::clear_decisions(conn, session_key)?;
        info!(cleared, "cleared saved decisions");
        Ok(cleared)
    }
}
