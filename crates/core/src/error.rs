//! Error taxonomy shared by the core and its adapters.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed settings; raised before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// The token works but lacks a capability the endpoint needs.
    #[error(
        "the Slack token is missing the `{scope}` scope; add it in the Slack app settings \
         and reinstall the app to the workspace"
    )]
    MissingScope { scope: String },

    /// Slack rejected the token itself.
    #[error("Slack rejected the token ({code})")]
    Auth { code: String },

    #[error("rate limited by Slack")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transport error: {0}")]
    Transport(String),

    /// Any other `ok: false` answer from the API.
    #[error("Slack API error: {code}")]
    Api { code: String },

    #[error("malformed response from Slack: {0}")]
    Decode(String),

    #[error("giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Errors worth re-issuing the same request for.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::RateLimited { .. } | Error::Transport(_))
    }

    /// Operator-facing remediation for well-known API error codes.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Api { code } => match code.as_str() {
                "channel_not_found" => Some("check SLACK_CHANNEL_ID; the channel was not found"),
                "not_in_channel" => Some("the app is not a member of this channel; invite it first"),
                "invalid_arguments" => {
                    Some("the search query was rejected; check the channel and user ids")
                }
                _ => None,
            },
            Error::Auth { .. } => Some("check SLACK_TOKEN; it may be revoked or expired"),
            Error::RetriesExhausted { last, .. } => last.hint(),
            _ => None,
        }
    }
}
