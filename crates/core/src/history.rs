//! Full fetch: walk `conversations.history` and filter each page locally.

use tracing::{info, warn};

use crate::domain::{MessageRecord, Retrieval, RetrievalRequest};
use crate::error::Result;
use crate::ports::{HistoryQuery, MessageSource, Sleeper};
use crate::retry::RetryPolicy;
use crate::utils::datetime_to_ts;

/// Largest page `conversations.history` serves.
pub const HISTORY_MAX_PAGE_SIZE: usize = 200;

pub struct FullFetchRetriever<'a> {
    source: &'a dyn MessageSource,
    sleeper: &'a dyn Sleeper,
    retry: &'a RetryPolicy,
    page_size: usize,
}

impl<'a> FullFetchRetriever<'a> {
    pub fn new(
        source: &'a dyn MessageSource,
        sleeper: &'a dyn Sleeper,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            source,
            sleeper,
            retry,
            page_size: HISTORY_MAX_PAGE_SIZE,
        }
    }

    /// Clamped to `1..=HISTORY_MAX_PAGE_SIZE`.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, HISTORY_MAX_PAGE_SIZE);
        self
    }

    /// Walks the channel newest-first until the history ends or `limit`
    /// matches are collected.
    ///
    /// A failure on any page discards what earlier pages matched: the error is
    /// returned alone so that nothing partial reaches the writer.
    pub fn retrieve(&self, request: &RetrievalRequest) -> Result<Retrieval> {
        let mut out = Retrieval::default();
        if request.limit == Some(0) {
            return Ok(out);
        }

        let oldest = request.since.map(datetime_to_ts);
        let latest = request.until.map(datetime_to_ts);
        let mut cursor: Option<String> = None;

        'pages: loop {
            let query = HistoryQuery {
                channel_id: request.channel_id.clone(),
                limit: self.page_size,
                cursor: cursor.clone(),
                oldest: oldest.clone(),
                latest: latest.clone(),
            };
            let page = match self.retry.run(self.sleeper, "conversations.history", || {
                self.source.channel_history(&query)
            }) {
                Ok(page) => page,
                Err(err) => {
                    if !out.records.is_empty() {
                        warn!(
                            page = out.pages + 1,
                            discarded = out.records.len(),
                            "history page failed, discarding earlier matches"
                        );
                    }
                    return Err(err);
                }
            };
            out.pages += 1;

            if page.messages.is_empty() {
                break;
            }

            for message in page.messages {
                out.count_author(message.user.as_deref());
                if !request.matches(message.user.as_deref(), &message.ts) {
                    continue;
                }
                out.records.push(MessageRecord {
                    timestamp: message.ts,
                    author_id: request.author_id.clone(),
                    text: message.text,
                    channel_id: Some(request.channel_id.clone()),
                });
                if request.limit.is_some_and(|limit| out.records.len() >= limit) {
                    break 'pages;
                }
            }

            info!(
                page = out.pages,
                scanned = out.scanned,
                matched = out.records.len(),
                "fetched history page"
            );

            let next = page.next_cursor.filter(|c| !c.is_empty());
            match next {
                Some(next) if page.has_more => {
                    if cursor.as_deref() == Some(next.as_str()) {
                        warn!(cursor = %next, "server repeated the cursor, stopping");
                        break;
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        info!(
            pages = out.pages,
            scanned = out.scanned,
            matched = out.records.len(),
            "history walk finished"
        );
        Ok(out)
    }
}
