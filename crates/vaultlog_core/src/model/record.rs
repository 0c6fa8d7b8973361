//! Record domain model.
//!
//! # Responsibility
//! - Describe one persisted unit of log content in the backing store.
//! - Distinguish property-bearing records from file-backed records.
//!
//! # Invariants
//! - `id` is stable and never reused for another record.
//! - `created_at` is assigned by the store and never changes.
//! - `version` increases by one on every successful content write.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a record in the backing store.
pub type RecordId = Uuid;

/// Storage shape of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Text kept in a size-limited property value.
    Property,
    /// Text kept as the bytes of an attached file.
    File,
}

impl RecordKind {
    /// Stable string id used by storage adapters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::File => "file",
        }
    }

    /// Parses a storage string id.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "property" => Some(Self::Property),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Reference to a record as returned by a store search.
///
/// Carries the `version` observed at search time, which writers hand back
/// to the store so concurrent rewrites are detected instead of overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: RecordId,
    pub kind: RecordKind,
    pub title: String,
    /// Number of content writes applied since creation.
    pub version: i64,
    /// Store-assigned creation timestamp, epoch milliseconds.
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::RecordKind;

    #[test]
    fn kind_string_ids_roundtrip() {
        for kind in [RecordKind::Property, RecordKind::File] {
            assert_eq!(RecordKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(RecordKind::parse("folder"), None);
    }
}
