//! Record title and ordinal policy.
//!
//! The first record of a day is titled `{prefix}{yyyy-MM-dd}`; the n-th
//! overflow record (`n >= 2`) is `{prefix}{yyyy-MM-dd} ({n})`.

use chrono::NaiveDate;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns the title prefix shared by every record of `date`.
pub fn date_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}{}", date.format(DATE_FORMAT))
}

/// Returns the title of the `ordinal`-th record (1-based) for `date_prefix`.
///
/// Ordinal `0` is treated like `1`.
pub fn record_title(date_prefix: &str, ordinal: usize) -> String {
    if ordinal <= 1 {
        date_prefix.to_string()
    } else {
        format!("{date_prefix} ({ordinal})")
    }
}
