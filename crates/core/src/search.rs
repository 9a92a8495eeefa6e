//! Direct search: let `search.messages` filter by author and channel.

use std::collections::HashSet;

use chrono::{DateTime, Days, Timelike, Utc};
use tracing::{debug, info};

use crate::domain::{MessageRecord, Retrieval, RetrievalRequest};
use crate::error::Result;
use crate::ports::{MessageSource, SearchQuery, Sleeper};
use crate::retry::RetryPolicy;

/// The search endpoint never returns more than this many results for a query.
pub const SEARCH_MAX_RESULTS: usize = 1000;
pub const SEARCH_MAX_PAGE_SIZE: usize = 100;
/// Used when the request carries no limit.
pub const DEFAULT_SEARCH_LIMIT: usize = 100;

pub struct DirectSearchRetriever<'a> {
    source: &'a dyn MessageSource,
    sleeper: &'a dyn Sleeper,
    retry: &'a RetryPolicy,
}

impl<'a> DirectSearchRetriever<'a> {
    pub fn new(
        source: &'a dyn MessageSource,
        sleeper: &'a dyn Sleeper,
        retry: &'a RetryPolicy,
    ) -> Self {
        Self {
            source,
            sleeper,
            retry,
        }
    }

    pub fn retrieve(&self, request: &RetrievalRequest) -> Result<Retrieval> {
        let mut out = Retrieval::default();
        let limit = request
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .min(SEARCH_MAX_RESULTS);
        if limit == 0 {
            return Ok(out);
        }

        let query = build_query(request);
        let count = limit.min(SEARCH_MAX_PAGE_SIZE);
        let max_pages = limit.div_ceil(count);
        let mut seen: HashSet<String> = HashSet::new();
        info!(query = %query, limit, "searching messages");

        for page in 1..=max_pages {
            let search = SearchQuery {
                query: query.clone(),
                count,
                page,
            };
            let result = self.retry.run(self.sleeper, "search.messages", || {
                self.source.search_messages(&search)
            })?;
            out.pages += 1;
            debug!(page, pages = result.pages, total = result.total, "search page received");

            if result.messages.is_empty() {
                break;
            }

            for message in result.messages {
                out.count_author(message.user.as_deref());
                if !request.matches(message.user.as_deref(), &message.ts) {
                    continue;
                }
                if !seen.insert(message.ts.clone()) {
                    continue;
                }
                out.records.push(MessageRecord {
                    timestamp: message.ts,
                    author_id: request.author_id.clone(),
                    text: message.text,
                    channel_id: Some(
                        message
                            .channel_id
                            .unwrap_or_else(|| request.channel_id.clone()),
                    ),
                });
                if out.records.len() >= limit {
                    break;
                }
            }

            if out.records.len() >= limit || page >= result.pages {
                break;
            }
        }

        info!(
            matched = out.records.len(),
            pages = out.pages,
            "search finished"
        );
        Ok(out)
    }
}

/// Builds `in:<#C> from:<@U>` plus date modifiers.
///
/// Slack's `after:` and `before:` take whole days, both exclusive, in the
/// searching user's timezone. The window is padded so it covers the bounds
/// for any offset from UTC-12 to UTC+14; `RetrievalRequest::matches` trims
/// the edges.
pub fn build_query(request: &RetrievalRequest) -> String {
    let mut parts = vec![
        format!("in:<#{}>", request.channel_id),
        format!("from:<@{}>", request.author_id),
    ];
    if let Some(since) = request.since {
        let day = since.date_naive().checked_sub_days(Days::new(2));
        if let Some(day) = day {
            parts.push(format!("after:{}", day.format("%Y-%m-%d")));
        }
    }
    if let Some(until) = request.until {
        let pad = if is_midnight(until) { 1 } else { 2 };
        let day = until.date_naive().checked_add_days(Days::new(pad));
        if let Some(day) = day {
            parts.push(format!("before:{}", day.format("%Y-%m-%d")));
        }
    }
    parts.join(" ")
}

fn is_midnight(at: DateTime<Utc>) -> bool {
    at.num_seconds_from_midnight() == 0 && at.nanosecond() == 0
}
