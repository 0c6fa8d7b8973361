//! Rolling writer configuration.
//!
//! # Responsibility
//! - Hold the title prefix, record shape, capacity and lock retry knobs.
//! - Reject misconfiguration before any writer is built.
//!
//! # Invariants
//! - A validated config always has a non-blank single-line prefix.
//! - For property records `rollover_threshold < max_record_chars`.

use crate::model::record::RecordKind;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_TITLE_PREFIX: &str = "Log-";
pub const DEFAULT_MAX_RECORD_CHARS: usize = 10_000;
pub const DEFAULT_ROLLOVER_THRESHOLD: usize = 15;
pub const DEFAULT_LOCK_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCK_MIN_DELAY_MS: u64 = 200;
pub const DEFAULT_LOCK_MAX_DELAY_MS: u64 = 1_000;

/// Configuration errors surfaced when a writer is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyPrefix,
    InvalidPrefix(String),
    ZeroCeiling,
    ThresholdNotBelowCeiling { threshold: usize, ceiling: usize },
    ZeroRetryAttempts,
    InvalidRetryWindow { min_delay_ms: u64, max_delay_ms: u64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPrefix => write!(f, "title prefix must not be empty"),
            Self::InvalidPrefix(prefix) => {
                write!(f, "title prefix must be a single line, got `{}`", prefix.escape_debug())
            }
            Self::ZeroCeiling => write!(f, "max_record_chars must be at least 1"),
            Self::ThresholdNotBelowCeiling { threshold, ceiling } => write!(
                f,
                "rollover_threshold {threshold} must be below max_record_chars {ceiling}"
            ),
            Self::ZeroRetryAttempts => write!(f, "lock_retry.max_attempts must be at least 1"),
            Self::InvalidRetryWindow {
                min_delay_ms,
                max_delay_ms,
            } => write!(
                f,
                "lock_retry delay window is inverted: min {min_delay_ms}ms > max {max_delay_ms}ms"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Lock polling policy used before appending to a contended record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockRetryPolicy {
    /// Lock probes before giving up on the record.
    pub max_attempts: u32,
    /// Lower bound of the randomized pause between probes.
    pub min_delay_ms: u64,
    /// Upper bound (inclusive) of the randomized pause between probes.
    pub max_delay_ms: u64,
}

impl Default for LockRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_LOCK_ATTEMPTS,
            min_delay_ms: DEFAULT_LOCK_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_LOCK_MAX_DELAY_MS,
        }
    }
}

impl LockRetryPolicy {
    /// Policy that probes `max_attempts` times without pausing.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Draws the pause before the next probe, uniformly from the window.
    pub fn next_delay(&self) -> Duration {
        if self.max_delay_ms <= self.min_delay_ms {
            return Duration::from_millis(self.min_delay_ms);
        }
        let millis = rand::rng().random_range(self.min_delay_ms..=self.max_delay_ms);
        Duration::from_millis(millis)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroRetryAttempts);
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ConfigError::InvalidRetryWindow {
                min_delay_ms: self.min_delay_ms,
                max_delay_ms: self.max_delay_ms,
            });
        }
        Ok(())
    }
}

/// Capacity policy of the records a writer rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Property-bearing records with a hard character ceiling.
    Property {
        ceiling: usize,
        rollover_threshold: usize,
    },
    /// File-backed records without a practical ceiling.
    File,
}

impl RecordShape {
    pub fn kind(self) -> RecordKind {
        match self {
            Self::Property { .. } => RecordKind::Property,
            Self::File => RecordKind::File,
        }
    }

    /// Largest chunk a single record may receive, if bounded.
    pub fn ceiling(self) -> Option<usize> {
        match self {
            Self::Property { ceiling, .. } => Some(ceiling),
            Self::File => None,
        }
    }
}

/// Rolling writer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingLogConfig {
    /// Prepended to the `yyyy-MM-dd` date in every record title.
    pub title_prefix: String,
    /// Record shape the writer targets.
    pub shape: RecordKind,
    /// Character ceiling of property records. Ignored for file records.
    pub max_record_chars: usize,
    /// Free capacity at or below which appending is skipped.
    pub rollover_threshold: usize,
    pub lock_retry: LockRetryPolicy,
}

impl Default for RollingLogConfig {
    fn default() -> Self {
        Self {
            title_prefix: DEFAULT_TITLE_PREFIX.to_string(),
            shape: RecordKind::Property,
            max_record_chars: DEFAULT_MAX_RECORD_CHARS,
            rollover_threshold: DEFAULT_ROLLOVER_THRESHOLD,
            lock_retry: LockRetryPolicy::default(),
        }
    }
}

impl RollingLogConfig {
    /// Config for property records titled with `title_prefix`.
    pub fn property(title_prefix: impl Into<String>) -> Self {
        Self {
            title_prefix: title_prefix.into(),
            ..Self::default()
        }
    }

    /// Config for file records titled with `title_prefix`.
    pub fn file(title_prefix: impl Into<String>) -> Self {
        Self {
            title_prefix: title_prefix.into(),
            shape: RecordKind::File,
            ..Self::default()
        }
    }

    pub fn record_shape(&self) -> RecordShape {
        match self.shape {
            RecordKind::Property => RecordShape::Property {
                ceiling: self.max_record_chars,
                rollover_threshold: self.rollover_threshold,
            },
            RecordKind::File => RecordShape::File,
        }
    }

    /// Checks the config for construction-time errors.
    ///
    /// # Errors
    /// - Blank or multi-line `title_prefix`.
    /// - Zero ceiling, or threshold not below ceiling, for property records.
    /// - Zero retry attempts or an inverted delay window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.title_prefix.contains(['\r', '\n']) {
            return Err(ConfigError::InvalidPrefix(self.title_prefix.clone()));
        }

        if self.shape == RecordKind::Property {
            if self.max_record_chars == 0 {
                return Err(ConfigError::ZeroCeiling);
            }
            if self.rollover_threshold >= self.max_record_chars {
                return Err(ConfigError::ThresholdNotBelowCeiling {
                    threshold: self.rollover_threshold,
                    ceiling: self.max_record_chars,
                });
            }
        }

        self.lock_retry.validate()
    }
}
