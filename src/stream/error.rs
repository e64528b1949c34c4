use std::error::Error as StdError;
use std::fmt;

/// Failures surfaced by a streaming session.
///
/// Only this class of error reaches the UI layer; parse and extension
/// anomalies are recovered locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Network failure, timeout, or a broken body stream.
    Transport(String),
    /// The endpoint answered with an error payload. The text is already
    /// formatted for display.
    Api(String),
    /// The caller cancelled the session.
    Aborted,
}

impl StreamError {
    pub fn is_abort(&self) -> bool {
        matches!(self, StreamError::Aborted)
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Transport(msg) => write!(f, "Request failed: {msg}"),
            StreamError::Api(msg) => write!(f, "{msg}"),
            StreamError::Aborted => write!(f, "Request cancelled"),
        }
    }
}

impl StdError for StreamError {}
