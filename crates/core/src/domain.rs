use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::ts_to_datetime;

/// One message authored by the target user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub timestamp: String, // Slack `ts`, e.g. "1712345678.000200"
    #[serde(rename = "author")]
    pub author_id: String,
    pub text: String,
    #[serde(rename = "channel", skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

/// Which remote endpoint drives the retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `search.messages` with author and channel filters in the query
    DirectSearch,
    /// `conversations.history`, filtered page by page on the client
    FullFetch,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::DirectSearch => f.write_str("direct search"),
            Strategy::FullFetch => f.write_str("full fetch"),
        }
    }
}

/// Parameters of a single retrieval run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
    pub author_id: String,
    pub channel_id: String,
    /// Inclusive lower bound on the message timestamp
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the message timestamp
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl RetrievalRequest {
    pub fn new(author_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            channel_id: channel_id.into(),
            since: None,
            until: None,
            limit: None,
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when a message by `author` at `ts` belongs in the result.
    ///
    /// Messages whose timestamp cannot be parsed are rejected whenever a date
    /// bound is set, since they cannot be shown to satisfy it.
    pub fn matches(&self, author: Option<&str>, ts: &str) -> bool {
        if author != Some(self.author_id.as_str()) {
            return false;
        }
        if self.since.is_none() && self.until.is_none() {
            return true;
        }
        let Some(at) = ts_to_datetime(ts) else {
            return false;
        };
        self.since.map_or(true, |since| at >= since) && self.until.map_or(true, |until| at < until)
    }
}

/// What a retriever produced, plus counters describing the walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Retrieval {
    pub records: Vec<MessageRecord>,
    pub pages: usize,
    /// Messages received from the server before filtering
    pub scanned: usize,
    /// Messages per author over everything scanned
    pub author_counts: BTreeMap<String, usize>,
}

impl Retrieval {
    pub(crate) fn count_author(&mut self, author: Option<&str>) {
        self.scanned += 1;
        let author = author.unwrap_or("Unknown").to_string();
        *self.author_counts.entry(author).or_insert(0) += 1;
    }

    /// Author counts ordered from most to least active.
    pub fn ranked_authors(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .author_counts
            .iter()
            .map(|(author, count)| (author.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn april_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_matches_rejects_other_authors() {
        let request = RetrievalRequest::new("U1", "C1");
        assert!(request.matches(Some("U1"), "1743465600.000100"));
        assert!(!request.matches(Some("U2"), "1743465600.000100"));
        assert!(!request.matches(None, "1743465600.000100"));
    }

    #[test]
    fn test_matches_since_is_inclusive() {
        let request = RetrievalRequest::new("U1", "C1").since(april_first());
        assert!(request.matches(Some("U1"), "1743465600.000000"));
        assert!(!request.matches(Some("U1"), "1743465599.999999"));
    }

    #[test]
    fn test_matches_until_is_exclusive() {
        let request = RetrievalRequest::new("U1", "C1").until(april_first());
        assert!(request.matches(Some("U1"), "1743465599.999999"));
        assert!(!request.matches(Some("U1"), "1743465600.000000"));
    }

    #[test]
    fn test_matches_unparseable_ts_with_bound() {
        let unbounded = RetrievalRequest::new("U1", "C1");
        assert!(unbounded.matches(Some("U1"), "garbage"));

        let bounded = unbounded.since(april_first());
        assert!(!bounded.matches(Some("U1"), "garbage"));
    }

    #[test]
    fn test_record_serializes_with_output_keys() {
        let record = MessageRecord {
            timestamp: "1743465600.000100".to_string(),
            author_id: "U1".to_string(),
            text: "こんにちは".to_string(),
            channel_id: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "timestamp": "1743465600.000100",
                "author": "U1",
                "text": "こんにちは",
            })
        );

        let with_channel = MessageRecord {
            channel_id: Some("C1".to_string()),
            ..record
        };
        let value = serde_json::to_value(&with_channel).unwrap();
        assert_eq!(value["channel"], "C1");
    }

    #[test]
    fn test_ranked_authors_orders_by_count() {
        let mut retrieval = Retrieval::default();
        for author in [Some("U2"), Some("U1"), Some("U2"), None] {
            retrieval.count_author(author);
        }
        assert_eq!(retrieval.scanned, 4);
        assert_eq!(
            retrieval.ranked_authors(),
            vec![("U2", 2), ("U1", 1), ("Unknown", 1)]
        );
    }
}
