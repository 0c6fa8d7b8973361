//! Backing store contract and persistence implementations.
//!
//! # Responsibility
//! - Define the primitives the rolling writer needs from a record vault.
//! - Isolate SQLite query details from writer orchestration.
//!
//! # Invariants
//! - Existing records are only mutated by whole-content replacement under
//!   checkout.
//! - Store APIs return semantic errors (`NotFound`, `VersionConflict`) in
//!   addition to DB transport errors.

pub mod record_repo;
