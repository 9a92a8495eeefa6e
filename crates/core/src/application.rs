use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{MessageRecord, Retrieval, RetrievalRequest, Strategy};
use crate::error::Result;
use crate::history::{FullFetchRetriever, HISTORY_MAX_PAGE_SIZE};
use crate::ports::{MessageSource, MessageWriter, Sleeper, ThreadSleeper};
use crate::retry::RetryPolicy;
use crate::search::DirectSearchRetriever;

/// Everything the operator chose for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub strategy: Strategy,
    pub limit: Option<usize>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub save: bool,
}

impl RunOptions {
    pub fn request_for(&self, author_id: &str, channel_id: &str) -> RetrievalRequest {
        RetrievalRequest {
            author_id: author_id.to_string(),
            channel_id: channel_id.to_string(),
            since: self.since,
            until: self.until,
            limit: self.limit,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub retrieval: Retrieval,
    /// Set when the records were saved
    pub written_to: Option<PathBuf>,
}

/// Application service: runs one retriever, then optionally the writer
pub struct MessageExportService {
    source: Box<dyn MessageSource>,
    writer: Box<dyn MessageWriter>,
    sleeper: Box<dyn Sleeper>,
    retry: RetryPolicy,
    history_page_size: usize,
}

impl MessageExportService {
    /// Creates a new MessageExportService with the given dependencies
    pub fn new(source: Box<dyn MessageSource>, writer: Box<dyn MessageWriter>) -> Self {
        Self {
            source,
            writer,
            sleeper: Box::new(ThreadSleeper),
            retry: RetryPolicy::default(),
            history_page_size: HISTORY_MAX_PAGE_SIZE,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_history_page_size(mut self, page_size: usize) -> Self {
        self.history_page_size = page_size;
        self
    }

    pub fn retrieve(&self, strategy: Strategy, request: &RetrievalRequest) -> Result<Retrieval> {
        info!(
            %strategy,
            channel = %request.channel_id,
            author = %request.author_id,
            limit = ?request.limit,
            since = ?request.since,
            until = ?request.until,
            "retrieving messages"
        );
        match strategy {
            Strategy::DirectSearch => {
                DirectSearchRetriever::new(self.source.as_ref(), self.sleeper.as_ref(), &self.retry)
                    .retrieve(request)
            }
            Strategy::FullFetch => {
                FullFetchRetriever::new(self.source.as_ref(), self.sleeper.as_ref(), &self.retry)
                    .page_size(self.history_page_size)
                    .retrieve(request)
            }
        }
    }

    pub fn save(&self, records: &[MessageRecord]) -> Result<PathBuf> {
        let path = self.writer.write(records)?;
        info!(count = records.len(), path = %path.display(), "messages saved");
        Ok(path)
    }

    /// Retrieves once and hands the records, unchanged, to the writer when
    /// `options.save` is set.
    pub fn run(&self, options: &RunOptions, request: &RetrievalRequest) -> Result<RunSummary> {
        let retrieval = self.retrieve(options.strategy, request)?;
        let written_to = if options.save {
            Some(self.save(&retrieval.records)?)
        } else {
            None
        };
        Ok(RunSummary {
            retrieval,
            written_to,
        })
    }
}
