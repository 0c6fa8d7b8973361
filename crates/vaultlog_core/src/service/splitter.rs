//! Line-aware chunking of log text.
//!
//! # Invariants
//! - Chunks never exceed the character budget.
//! - A chunk ends right after its last complete line unless no line break
//!   fits, in which case it is a hard cut at the budget.
//! - Offsets are byte offsets on `char` boundaries; budgets count `char`s.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Line terminator appended to unterminated messages.
pub const LINE_TERMINATOR: &str = "\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// `start` is past the end of the source or not on a char boundary.
    OutOfRange { start: usize, len: usize },
    /// The character budget is zero.
    EmptyBudget,
}

impl Display for SplitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { start, len } => {
                write!(f, "split start {start} is out of range for length {len}")
            }
            Self::EmptyBudget => write!(f, "split budget must be at least one character"),
        }
    }
}

impl Error for SplitError {}

/// Returns the longest prefix of `source[start..]` that fits `max_chars`,
/// preferring to end right after the last line break within the budget.
///
/// # Errors
/// - `OutOfRange` when `start >= source.len()` or `start` splits a char.
/// - `EmptyBudget` when `max_chars == 0`.
pub fn take_bounded(source: &str, start: usize, max_chars: usize) -> Result<&str, SplitError> {
    if start >= source.len() || !source.is_char_boundary(start) {
        return Err(SplitError::OutOfRange {
            start,
            len: source.len(),
        });
    }
    if max_chars == 0 {
        return Err(SplitError::EmptyBudget);
    }

    let rest = &source[start..];
    let window_end = rest
        .char_indices()
        .nth(max_chars)
        .map_or(rest.len(), |(index, _)| index);
    let window = &rest[..window_end];

    match window.rfind('\n') {
        Some(newline) if newline + 1 < window.len() => Ok(&window[..newline + 1]),
        _ => Ok(window),
    }
}

/// Returns `text` with a trailing line terminator, borrowing when present.
pub fn ensure_terminated(text: &str) -> std::borrow::Cow<'_, str> {
    if text.ends_with('\n') {
        text.into()
    } else {
        format!("{text}{LINE_TERMINATOR}").into()
    }
}

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::{ensure_terminated, take_bounded, SplitError};

    #[test]
    fn returns_whole_remainder_when_it_fits() {
        assert_eq!(take_bounded("a\r\nb\r\n", 0, 100), Ok("a\r\nb\r\n"));
        assert_eq!(take_bounded("a\r\nb\r\n", 3, 100), Ok("b\r\n"));
    }

    #[test]
    fn cuts_after_last_complete_line_within_budget() {
        let source = "one\r\ntwo\r\nthree\r\n";
        assert_eq!(take_bounded(source, 0, 12), Ok("one\r\ntwo\r\n"));
        assert_eq!(take_bounded(source, 0, 9), Ok("one\r\n"));
    }

    #[test]
    fn keeps_window_that_ends_exactly_on_a_line_break() {
        assert_eq!(take_bounded("one\r\ntwo\r\n", 0, 5), Ok("one\r\n"));
    }

    #[test]
    fn hard_cuts_a_line_longer_than_the_budget() {
        assert_eq!(take_bounded("abcdefgh\r\n", 0, 4), Ok("abcd"));
        assert_eq!(take_bounded("abcdefgh\r\n", 4, 4), Ok("efgh"));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let source = "ééé\nüü\n";
        assert_eq!(take_bounded(source, 0, 5), Ok("ééé\n"));
        assert_eq!(take_bounded(source, 0, 2), Ok("éé"));
    }

    #[test]
    fn rejects_out_of_range_start_and_empty_budget() {
        assert_eq!(
            take_bounded("abc", 3, 1),
            Err(SplitError::OutOfRange { start: 3, len: 3 })
        );
        assert_eq!(
            take_bounded("é", 1, 1),
            Err(SplitError::OutOfRange { start: 1, len: 2 })
        );
        assert_eq!(take_bounded("abc", 0, 0), Err(SplitError::EmptyBudget));
    }

    #[test]
    fn ensure_terminated_appends_crlf_only_when_missing() {
        assert_eq!(ensure_terminated("Some message"), "Some message\r\n");
        assert_eq!(ensure_terminated("done\r\n"), "done\r\n");
        assert_eq!(ensure_terminated("unix\n"), "unix\n");
    }
}
