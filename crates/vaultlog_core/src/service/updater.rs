//! Conflict-safe record updates.
//!
//! # Responsibility
//! - Wait out short checkouts held by other writers, then rewrite a record
//!   under exclusive access.
//! - Create new records.
//! - Report outcomes as values; contention is an expected result.
//!
//! # Invariants
//! - Lock probing is bounded by `LockRetryPolicy::max_attempts`.
//! - Any failure after a successful checkout releases it via
//!   `undo_check_out`, discarding staged content.

use crate::config::LockRetryPolicy;
use crate::model::record::{RecordKind, RecordRef};
use crate::repo::record_repo::{RecordStore, StoreError};
use log::{debug, warn};
use std::thread;

/// Result of one append attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// New content committed.
    Appended,
    /// The record stayed checked out by another writer.
    Locked,
    /// The record changed after it was read.
    Conflicted,
    /// The store rejected a probe, checkout or write.
    Failed,
}

impl AppendOutcome {
    /// Whether the new content was committed.
    pub fn is_appended(self) -> bool {
        self == Self::Appended
    }
}

/// Conflict-safe update operations over a record store.
pub struct RecordUpdater<'a, S: RecordStore> {
    store: &'a S,
    retry: &'a LockRetryPolicy,
}

impl<'a, S: RecordStore> RecordUpdater<'a, S> {
    /// Creates an updater over `store` polling locks per `retry`.
    pub fn new(store: &'a S, retry: &'a LockRetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Replaces the content of `record` with `new_content`.
    ///
    /// Polls the lock up to `max_attempts` times with a randomized pause
    /// between probes, then checks out, writes and checks in.
    pub fn try_append(&self, record: &RecordRef, new_content: &str) -> AppendOutcome {
        match self.wait_until_unlocked(record) {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    "event=record_append module=updater status=locked record_id={} attempts={}",
                    record.id, self.retry.max_attempts
                );
                return AppendOutcome::Locked;
            }
            Err(err) => {
                warn!(
                    "event=record_append module=updater status=error stage=probe record_id={} error={}",
                    record.id, err
                );
                return AppendOutcome::Failed;
            }
        }

        match self.store.check_out(record.id) {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    "event=record_append module=updater status=locked stage=check_out record_id={}",
                    record.id
                );
                return AppendOutcome::Locked;
            }
            Err(err) => {
                warn!(
                    "event=record_append module=updater status=error stage=check_out record_id={} error={}",
                    record.id, err
                );
                return AppendOutcome::Failed;
            }
        }

        let committed = self
            .store
            .write_content(record, new_content)
            .map_err(|err| ("write", err))
            .and_then(|()| {
                self.store
                    .check_in(record.id)
                    .map_err(|err| ("check_in", err))
            });

        match committed {
            Ok(()) => AppendOutcome::Appended,
            Err((stage, err)) => {
                if let Err(undo_err) = self.store.undo_check_out(record.id) {
                    warn!(
                        "event=record_undo_check_out module=updater status=error record_id={} error={}",
                        record.id, undo_err
                    );
                }
                if matches!(err, StoreError::VersionConflict { .. }) {
                    debug!(
                        "event=record_append module=updater status=conflict record_id={} error={}",
                        record.id, err
                    );
                    AppendOutcome::Conflicted
                } else {
                    warn!(
                        "event=record_append module=updater status=error stage={} record_id={} error={}",
                        stage, record.id, err
                    );
                    AppendOutcome::Failed
                }
            }
        }
    }

    /// Creates a record titled `title` holding `content`.
    ///
    /// Returns `None` when the store rejects the create.
    pub fn try_create(&self, kind: RecordKind, title: &str, content: &str) -> Option<RecordRef> {
        match self.store.create_record(kind, title, content) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(
                    "event=record_create module=updater status=error kind={} title={} error={}",
                    kind.as_str(),
                    title,
                    err
                );
                None
            }
        }
    }

    fn wait_until_unlocked(&self, record: &RecordRef) -> Result<bool, StoreError> {
        let attempts = self.retry.max_attempts;
        for attempt in 1..=attempts {
            if !self.store.is_locked(record.id)? {
                return Ok(true);
            }
            if attempt < attempts {
                thread::sleep(self.retry.next_delay());
            }
        }
        Ok(false)
    }
}
