use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Upper bound on the number of items a single list call returns.
pub const MAX_PAGE_LEN: i64 = 10;

/// Cursor-based page request: items strictly older than `from`
/// (by id), at most `len` of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CursorPage {
    pub from: Option<i64>,
    pub len: i64,
}

impl Default for CursorPage {
    fn default() -> Self {
        Self {
            from: None,
            len: MAX_PAGE_LEN,
        }
    }
}

impl CursorPage {
    pub fn new(from: Option<i64>, len: Option<i64>) -> Self {
        let len = match len {
            Some(l) if l > 0 => l.min(MAX_PAGE_LEN),
            _ => MAX_PAGE_LEN,
        };
        // 0 and negative cursors mean "start from the newest"
        let from = from.filter(|f| *f > 0);
        Self { from, len }
    }

    /// Upper id bound suitable for `WHERE id < $1`.
    pub fn upper_bound(&self) -> i64 {
        self.from.unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> usize {
        self.len as usize
    }

    /// Applies the cursor to an already most-recent-first sequence of ids.
    ///
    /// When `from` is present, everything up to and including it is skipped.
    /// A cursor that is not in the sequence yields an empty page.
    pub fn page_after<T, F>(&self, items: Vec<T>, id_of: F) -> Vec<T>
    where
        F: Fn(&T) -> i64,
    {
        let start = match self.from {
            None => 0,
            Some(from) => match items.iter().position(|item| id_of(item) == from) {
                Some(idx) => idx + 1,
                None => return Vec::new(),
            },
        };
        items.into_iter().skip(start).take(self.limit()).collect()
    }
}

/// Converts an oldest-first sequence into most-recent-first.
///
/// Engagement records are stored in insertion order; list endpoints
/// present them newest first. Call this exactly once per list.
pub fn reverse_chronological<T>(mut oldest_first: Vec<T>) -> Vec<T> {
    oldest_first.reverse();
    oldest_first
}
