//! Domain model for rolling log records.
//!
//! # Responsibility
//! - Define the record identity and shape shared by store and writer.
//! - Own the deterministic record title/ordinal policy.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Records are never hard-deleted by logging code paths.

pub mod record;
pub mod title;
