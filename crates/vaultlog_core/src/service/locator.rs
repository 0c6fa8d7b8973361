//! Lookup of the record group for one date prefix.

use crate::model::record::{RecordKind, RecordRef};
use crate::repo::record_repo::{RecordStore, StoreResult};

/// Returns all live `kind` records titled with `date_prefix`, oldest first.
///
/// The last element, if any, is the append target. An empty list means no
/// record exists for the date yet.
pub fn find_records_for_prefix<S: RecordStore>(
    store: &S,
    kind: RecordKind,
    date_prefix: &str,
) -> StoreResult<Vec<RecordRef>> {
    let mut records = store.search_records(kind, date_prefix)?;
    records.sort_by_key(|record| record.created_at);
    Ok(records)
}
