//! Rolling log persistence into a shared, capacity-limited record vault.
//! This crate is the single source of truth for append/rollover invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    ConfigError, LockRetryPolicy, RecordShape, RollingLogConfig, DEFAULT_TITLE_PREFIX,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{RecordId, RecordKind, RecordRef};
pub use model::title::{date_prefix, record_title};
pub use repo::record_repo::{RecordStore, SqliteRecordStore, StoreError, StoreResult};
pub use service::locator::find_records_for_prefix;
pub use service::rolling_writer::{RollingWriter, SaveError, SaveReport};
pub use service::splitter::{take_bounded, SplitError, LINE_TERMINATOR};
pub use service::updater::{AppendOutcome, RecordUpdater};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
