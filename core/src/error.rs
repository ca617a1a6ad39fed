//! Error types for the BigBlueButton API client.
//!
//! # Design
//! Only failures the caller must act on are errors: a request that was never
//! sent because a required input was empty, a transport that could not
//! complete the round trip, or a configuration that could not be loaded.
//! Replies the server did send, but that carry `FAILED` or cannot be parsed,
//! are not errors here. They become `false` / `None` at the facade and are
//! available in full through [`crate::Reply`].

use thiserror::Error;

/// Convenience alias for results carrying a [`BbbError`].
pub type BbbResult<T> = Result<T, BbbError>;

/// Errors returned by `BbbClient` and `BigBlueButton`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BbbError {
    /// A required parameter was empty. No request was built.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Network unreachable, DNS failure, connection reset, bad URL.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The transport gave up waiting for the server.
    #[error("request timed out")]
    Timeout,

    /// Configuration could not be loaded or is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ureq::Error> for BbbError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => BbbError::Timeout,
            other => BbbError::Transport(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for BbbError {
    fn from(err: config::ConfigError) -> Self {
        BbbError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_parameter() {
        let err = BbbError::MissingParameter("meetingID");
        assert_eq!(err.to_string(), "missing required parameter: meetingID");
    }

    #[test]
    fn config_error_converts() {
        let err: BbbError = config::ConfigError::Message("no secret".to_string()).into();
        assert!(matches!(err, BbbError::Config(msg) if msg.contains("no secret")));
    }
}
