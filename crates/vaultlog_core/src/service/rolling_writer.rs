//! Rolling append/rollover of log text across date-grouped records.
//!
//! # Responsibility
//! - Append batched log text to the latest record of today's group.
//! - Roll leftover text into new, ordinally titled records.
//! - Shield the logging pipeline from every store failure.
//!
//! # Invariants
//! - Text is placed left to right; concatenating the touched records in
//!   creation order yields the terminated message exactly once.
//! - Property records never exceed their character ceiling.
//! - Appending is skipped when free capacity is at or below the rollover
//!   threshold.
//! - A line is never split across the append/rollover boundary; hard cuts
//!   only happen inside a chunk written to a new record.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, RecordShape, RollingLogConfig};
use crate::model::record::RecordRef;
use crate::model::title::{date_prefix, record_title};
use crate::repo::record_repo::{RecordStore, StoreError};
use crate::service::locator::find_records_for_prefix;
use crate::service::splitter::{char_len, ensure_terminated, take_bounded, SplitError};
use crate::service::updater::{AppendOutcome, RecordUpdater};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure that stopped a save before all text was placed.
#[derive(Debug)]
pub enum SaveError {
    Store(StoreError),
    Split(SplitError),
}

impl Display for SaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Split(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Split(err) => Some(err),
        }
    }
}

impl From<StoreError> for SaveError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<SplitError> for SaveError {
    fn from(value: SplitError) -> Self {
        Self::Split(value)
    }
}

/// Where one message ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Title of the existing record that received the head of the message.
    pub appended_to: Option<String>,
    /// Characters appended to `appended_to`.
    pub appended_chars: usize,
    /// Outcome of the append attempt, if one was made.
    pub append_outcome: Option<AppendOutcome>,
    /// Titles of records created, in creation order.
    pub created: Vec<String>,
    /// Titles whose create was rejected; their chunks are lost.
    pub failed_creates: Vec<String>,
}

impl SaveReport {
    /// Whether the call left the store untouched.
    pub fn is_noop(&self) -> bool {
        self.appended_to.is_none() && self.created.is_empty() && self.failed_creates.is_empty()
    }
}

/// Rolling log writer for one record shape.
pub struct RollingWriter<S: RecordStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    config: RollingLogConfig,
    shape: RecordShape,
}

impl<S: RecordStore> RollingWriter<S, SystemClock> {
    /// Creates a writer dating records with the local wall clock.
    ///
    /// # Errors
    /// - Any `ConfigError` from `RollingLogConfig::validate`.
    pub fn new(store: S, config: RollingLogConfig) -> Result<Self, ConfigError> {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: RecordStore, C: Clock> RollingWriter<S, C> {
    /// Creates a writer with an explicit date source.
    pub fn with_clock(store: S, config: RollingLogConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let shape = config.record_shape();
        Ok(Self {
            store,
            clock,
            config,
            shape,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RollingLogConfig {
        &self.config
    }

    /// Persists one batch of formatted log lines.
    ///
    /// Never fails: errors are logged and dropped so logging cannot take the
    /// host down.
    pub fn save_log_message(&self, text: &str) {
        if let Err(err) = self.try_save_log_message(text) {
            warn!(
                "event=log_save module=rolling_writer status=error kind={} error={}",
                self.shape.kind().as_str(),
                err
            );
        }
    }

    /// Persists one batch of log text and reports where it went.
    ///
    /// Blank text, or a store without the needed structure, is a silent
    /// no-op.
    ///
    /// # Errors
    /// - Store failures while probing structure or searching records.
    pub fn try_save_log_message(&self, text: &str) -> Result<SaveReport, SaveError> {
        let kind = self.shape.kind();
        if text.trim().is_empty() || !self.store.is_structure_present(kind)? {
            return Ok(SaveReport::default());
        }

        let terminated = ensure_terminated(text);
        let text: &str = &terminated;
        let prefix = date_prefix(&self.config.title_prefix, self.clock.today());
        let records = find_records_for_prefix(&self.store, kind, &prefix)?;
        let updater = RecordUpdater::new(&self.store, &self.config.lock_retry);

        let mut report = SaveReport::default();
        let mut offset = match records.last() {
            Some(target) => self.append_head(&updater, target, text, &mut report)?,
            None => 0,
        };

        let mut ordinal = records.len();
        while offset < text.len() {
            let chunk = match self.shape.ceiling() {
                Some(ceiling) => take_bounded(text, offset, ceiling)?,
                None => &text[offset..],
            };
            ordinal += 1;
            let title = record_title(&prefix, ordinal);
            match updater.try_create(kind, &title, chunk) {
                Some(record) => report.created.push(record.title),
                None => report.failed_creates.push(title),
            }
            offset += chunk.len();
        }

        if report.failed_creates.is_empty() {
            debug!(
                "event=log_save module=rolling_writer status=ok kind={} appended_chars={} created={}",
                kind.as_str(),
                report.appended_chars,
                report.created.len()
            );
        } else {
            warn!(
                "event=log_save module=rolling_writer status=partial kind={} created={} failed_creates={}",
                kind.as_str(),
                report.created.len(),
                report.failed_creates.len()
            );
        }
        Ok(report)
    }

    /// Appends as much leading text to `target` as fits; returns bytes placed.
    fn append_head(
        &self,
        updater: &RecordUpdater<'_, S>,
        target: &RecordRef,
        text: &str,
        report: &mut SaveReport,
    ) -> Result<usize, SaveError> {
        let content = match self.store.read_content(target) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    "event=record_read module=rolling_writer status=error record_id={} error={}",
                    target.id, err
                );
                return Ok(0);
            }
        };

        let chunk = match self.shape {
            RecordShape::Property {
                ceiling,
                rollover_threshold,
            } => {
                let remaining = ceiling.saturating_sub(char_len(&content));
                if remaining <= rollover_threshold {
                    debug!(
                        "event=record_append module=rolling_writer status=skipped reason=threshold record_id={} remaining={}",
                        target.id, remaining
                    );
                    return Ok(0);
                }
                let chunk = take_bounded(text, 0, remaining)?;
                if chunk.len() < text.len() && !chunk.ends_with('\n') {
                    debug!(
                        "event=record_append module=rolling_writer status=skipped reason=line_too_long record_id={} remaining={}",
                        target.id, remaining
                    );
                    return Ok(0);
                }
                chunk
            }
            RecordShape::File => text,
        };

        let outcome = updater.try_append(target, &format!("{content}{chunk}"));
        report.append_outcome = Some(outcome);
        if !outcome.is_appended() {
            return Ok(0);
        }

        report.appended_to = Some(target.title.clone());
        report.appended_chars = char_len(chunk);
        Ok(chunk.len())
    }
}
