//! In-memory stand-ins for the ports, used by the unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::MessageRecord;
use crate::error::{Error, Result};
use crate::ports::{
    HistoryPage, HistoryQuery, MessageSource, MessageWriter, RawMessage, SearchPage, SearchQuery,
    Sleeper,
};

pub fn raw(ts: &str, user: &str, text: &str) -> RawMessage {
    RawMessage {
        ts: ts.to_string(),
        user: Some(user.to_string()),
        text: text.to_string(),
        channel_id: None,
    }
}

/// Serves scripted responses in order and records every query it receives.
/// Once a script runs dry it answers with an empty page.
#[derive(Default)]
pub struct FakeSource {
    search_script: RefCell<VecDeque<Result<SearchPage>>>,
    history_script: RefCell<VecDeque<Result<HistoryPage>>>,
    pub search_calls: RefCell<Vec<SearchQuery>>,
    pub history_calls: RefCell<Vec<HistoryQuery>>,
}

impl FakeSource {
    pub fn push_search(&self, page: Result<SearchPage>) -> &Self {
        self.search_script.borrow_mut().push_back(page);
        self
    }

    pub fn push_history(&self, page: Result<HistoryPage>) -> &Self {
        self.history_script.borrow_mut().push_back(page);
        self
    }

    /// A channel whose history is split into pages of the given messages,
    /// chained with cursors "c1", "c2", …
    pub fn with_history_pages(pages: Vec<Vec<RawMessage>>) -> Self {
        let source = Self::default();
        let last = pages.len();
        for (i, messages) in pages.into_iter().enumerate() {
            let has_more = i + 1 < last;
            source.push_history(Ok(HistoryPage {
                messages,
                has_more,
                next_cursor: has_more.then(|| format!("c{}", i + 1)),
            }));
        }
        source
    }

    /// Search results of `page_size` per page over `matches`, honoring the
    /// requested page numbers.
    pub fn with_search_matches(matches: Vec<RawMessage>, page_size: usize) -> Self {
        let source = Self::default();
        let total = matches.len();
        let pages = total.div_ceil(page_size).max(1);
        for (i, chunk) in matches.chunks(page_size).enumerate() {
            source.push_search(Ok(SearchPage {
                messages: chunk.to_vec(),
                page: i + 1,
                pages,
                total,
            }));
        }
        source
    }

    pub fn total_calls(&self) -> usize {
        self.search_calls.borrow().len() + self.history_calls.borrow().len()
    }
}

impl MessageSource for FakeSource {
    fn search_messages(&self, query: &SearchQuery) -> Result<SearchPage> {
        self.search_calls.borrow_mut().push(query.clone());
        self.search_script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }

    fn channel_history(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        self.history_calls.borrow_mut().push(query.clone());
        self.history_script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(HistoryPage::default()))
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    waits: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}

/// Keeps written batches in memory; optionally fails every write.
#[derive(Default)]
pub struct MemoryWriter {
    pub batches: Mutex<Vec<Vec<MessageRecord>>>,
    pub fail: bool,
}

impl MessageWriter for MemoryWriter {
    fn write(&self, records: &[MessageRecord]) -> Result<PathBuf> {
        if self.fail {
            return Err(Error::Write {
                path: PathBuf::from("memory.json"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(PathBuf::from("memory.json"))
    }
}

// Shared handles so a test can keep inspecting a fake after handing it to the service.

impl MessageSource for Rc<FakeSource> {
    fn search_messages(&self, query: &SearchQuery) -> Result<SearchPage> {
        self.as_ref().search_messages(query)
    }

    fn channel_history(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        self.as_ref().channel_history(query)
    }
}

impl Sleeper for Rc<RecordingSleeper> {
    fn sleep(&self, duration: Duration) {
        self.as_ref().sleep(duration);
    }
}

impl MessageWriter for Arc<MemoryWriter> {
    fn write(&self, records: &[MessageRecord]) -> Result<PathBuf> {
        self.as_ref().write(records)
    }
}
