//! Rolling log services.
//!
//! # Responsibility
//! - Split, locate, update and roll records on top of a `RecordStore`.
//! - Keep the logging pipeline decoupled from storage details.

pub mod locator;
pub mod rolling_writer;
pub mod splitter;
pub mod updater;
