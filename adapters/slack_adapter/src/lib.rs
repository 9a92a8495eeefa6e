use std::fmt;
use std::time::Duration;

use messages_core::ports::{
    HistoryPage, HistoryQuery, MessageSource, RawMessage, SearchPage, SearchQuery,
};
use messages_core::{Error, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

const SEARCH_SCOPE: &str = "search:read";
const HISTORY_SCOPES: &str = "channels:history, groups:history, im:history, mpim:history";

/// Error codes meaning the token itself is unusable.
const AUTH_ERROR_CODES: &[&str] = &[
    "not_authed",
    "invalid_auth",
    "account_inactive",
    "token_revoked",
    "token_expired",
    "no_permission",
    "not_allowed_token_type",
];

/// Slack Web API implementation of the MessageSource trait
pub struct SlackMessageSource {
    client: Client,
    base_url: String,
    token: String,
}

impl SlackMessageSource {
    /// Creates a client against `base_url` (normally `DEFAULT_API_BASE_URL`).
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// GETs `method` and unwraps Slack's `{ok, error}` envelope.
    ///
    /// `scope` names what to ask for when Slack answers `missing_scope`
    /// without saying which scope it needed.
    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
        scope: &str,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        debug!(method, ?params, "calling Slack");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .map_err(|e| Error::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after: retry_after(&response),
            });
        }
        if status.is_server_error() {
            return Err(Error::Transport(format!("{method} returned HTTP {status}")));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth {
                code: format!("http_{}", status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(Error::Api {
                code: format!("http_{}", status.as_u16()),
            });
        }

        let retry_hint = retry_after(&response);
        // A stall or reset while reading the body is a transport failure;
        // only bytes that arrive but do not parse are a decode failure.
        let bytes = response.bytes().map_err(|e| {
            Error::Transport(format!("{method}: reading response: {}", e.without_url()))
        })?;
        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Decode(format!("{method}: {e}")))?;
        let envelope: Envelope = serde_json::from_value(body.clone())
            .map_err(|e| Error::Decode(format!("{method}: {e}")))?;

        if !envelope.ok {
            return Err(map_error_code(envelope, scope, retry_hint));
        }

        serde_json::from_value(body).map_err(|e| Error::Decode(format!("{method}: {e}")))
    }
}

impl fmt::Debug for SlackMessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackMessageSource")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl MessageSource for SlackMessageSource {
    fn search_messages(&self, query: &SearchQuery) -> Result<SearchPage> {
        let params = [
            ("query", query.query.clone()),
            ("count", query.count.to_string()),
            ("page", query.page.to_string()),
            ("sort", "timestamp".to_string()),
            ("sort_dir", "desc".to_string()),
        ];
        let response: SearchResponse = self.call("search.messages", &params, SEARCH_SCOPE)?;
        let paging = response.messages.paging.unwrap_or_default();

        Ok(SearchPage {
            messages: response
                .messages
                .matches
                .into_iter()
                .map(WireMessage::into_raw)
                .collect(),
            page: paging.page,
            pages: paging.pages,
            total: paging.total,
        })
    }

    fn channel_history(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        let mut params = vec![
            ("channel", query.channel_id.clone()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", cursor.clone()));
        }
        if let Some(oldest) = &query.oldest {
            params.push(("oldest", oldest.clone()));
            params.push(("inclusive", "true".to_string()));
        }
        if let Some(latest) = &query.latest {
            params.push(("latest", latest.clone()));
        }
        let response: HistoryResponse =
            self.call("conversations.history", &params, HISTORY_SCOPES)?;

        Ok(HistoryPage {
            messages: response
                .messages
                .into_iter()
                .map(WireMessage::into_raw)
                .collect(),
            has_more: response.has_more,
            next_cursor: response.response_metadata.and_then(|m| m.next_cursor),
        })
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn map_error_code(envelope: Envelope, scope: &str, retry_hint: Option<Duration>) -> Error {
    let code = envelope.error.unwrap_or_else(|| "unknown_error".to_string());
    match code.as_str() {
        "missing_scope" => Error::MissingScope {
            scope: envelope
                .needed
                .filter(|needed| !needed.is_empty())
                .unwrap_or_else(|| scope.to_string()),
        },
        "ratelimited" | "rate_limited" => Error::RateLimited {
            retry_after: retry_hint,
        },
        c if AUTH_ERROR_CODES.contains(&c) => Error::Auth { code },
        _ => Error::Api { code },
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    error: Option<String>,
    needed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    ts: String,
    user: Option<String>,
    #[serde(default)]
    text: String,
    channel: Option<WireChannel>,
}

impl WireMessage {
    fn into_raw(self) -> RawMessage {
        RawMessage {
            ts: self.ts,
            user: self.user,
            text: self.text,
            channel_id: self.channel.map(|c| c.id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireChannel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<WireMessage>,
    #[serde(default)]
    has_more: bool,
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    messages: SearchMessages,
}

#[derive(Debug, Deserialize)]
struct SearchMessages {
    #[serde(default)]
    matches: Vec<WireMessage>,
    paging: Option<Paging>,
}

#[derive(Debug, Default, Deserialize)]
struct Paging {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    page: usize,
    #[serde(default)]
    pages: usize,
}
