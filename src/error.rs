// Error taxonomy for relay calls and coordinator preconditions

use thiserror::Error;

/// Failure of a single call against the device relay.
///
/// Everything the raw HTTP/JSON API can do wrong is normalized here at the
/// boundary, so coordinator logic never inspects optional response fields.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No API token configured. The request is never attempted.
    #[error("no API token configured")]
    MissingToken,

    /// Timeout, connection refused, DNS failure, tunnel down.
    #[error("device relay unreachable: {0}")]
    Unreachable(String),

    /// The relay answered with a non-success HTTP status.
    #[error("device relay returned HTTP {0}")]
    Http(u16),

    /// The relay answered `success: false` with a message.
    /// Some of these are expected transient states (e.g. "no active stream").
    #[error("device relay rejected the request: {0}")]
    Rejected(String),

    /// The response body did not match the wire contract.
    #[error("malformed relay response: {0}")]
    Decode(String),
}

impl RelayError {
    /// Transient connectivity errors auto-clear on the next successful poll;
    /// everything else needs an explicit user retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::Unreachable(_) | RelayError::Http(_))
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            RelayError::Unreachable(err.to_string())
        } else if let Some(status) = err.status() {
            RelayError::Http(status.as_u16())
        } else if err.is_decode() {
            RelayError::Decode(err.to_string())
        } else {
            RelayError::Unreachable(err.to_string())
        }
    }
}

/// Failure of a coordinator action.
///
/// Precondition variants are rejected locally and never reach the network.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no active session")]
    NoActiveSession,

    #[error("a session is already active")]
    SessionAlreadyActive,

    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

/// Failure of a save/discard workflow action.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Validation error; the workflow does not transition.
    #[error("session title must not be empty")]
    EmptyTitle,

    /// The workflow is not holding a session awaiting save.
    #[error("no session awaiting save")]
    NothingPending,

    #[error(transparent)]
    Relay(#[from] RelayError),
}
