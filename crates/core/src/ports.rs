use std::path::PathBuf;
use std::time::Duration;

use crate::domain::MessageRecord;
use crate::error::Result;

/// A message as the platform returned it, before author/date filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub ts: String,
    /// Absent for bot and system messages
    pub user: Option<String>,
    pub text: String,
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub count: usize,
    /// 1-based
    pub page: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    pub messages: Vec<RawMessage>,
    pub page: usize,
    pub pages: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    pub channel_id: String,
    pub limit: usize,
    pub cursor: Option<String>,
    pub oldest: Option<String>,
    pub latest: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPage {
    pub messages: Vec<RawMessage>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Remote messaging platform, one call per page
pub trait MessageSource {
    fn search_messages(&self, query: &SearchQuery) -> Result<SearchPage>;

    fn channel_history(&self, query: &HistoryQuery) -> Result<HistoryPage>;
}

/// Trait for persisting retrieved records.
/// Returns the path that was written.
pub trait MessageWriter: Send + Sync {
    fn write(&self, records: &[MessageRecord]) -> Result<PathBuf>;
}

/// Blocking wait used between retries.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
