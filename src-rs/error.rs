//! Error taxonomy for submission and polling.
//!
//! Submission errors stop a run before any poller starts. Status and group
//! transport errors end their session; results transport errors are only
//! logged by the streamer.

/// A single request to the task API failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP request itself failed (network, DNS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status code.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The body parsed but did not carry what the caller needs.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Starting a computation failed; no poller is started.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("failed to submit the calculation task: {0}")]
    Transport(#[from] TransportError),

    #[error("submission response carried neither a task id nor a group id")]
    MissingHandle,
}

/// A poll request failed while a session was running.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("task status polling failed: {0}")]
    StatusTransport(TransportError),

    #[error("group progress polling failed: {0}")]
    GroupTransport(TransportError),

    #[error("results polling failed: {0}")]
    ResultsTransport(TransportError),
}

impl PollError {
    /// Whether this error ends the session that observed it.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollError::ResultsTransport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error() -> TransportError {
        TransportError::Api {
            status: 503,
            body: "broker unavailable".to_string(),
        }
    }

    #[test]
    fn results_errors_are_recoverable() {
        assert!(PollError::StatusTransport(api_error()).is_terminal());
        assert!(PollError::GroupTransport(api_error()).is_terminal());
        assert!(!PollError::ResultsTransport(api_error()).is_terminal());
    }

    #[test]
    fn messages_name_the_cause() {
        let err = PollError::GroupTransport(api_error());
        assert_eq!(
            err.to_string(),
            "group progress polling failed: API error (503): broker unavailable"
        );
        let err = SubmissionError::from(api_error());
        assert!(err.to_string().starts_with("failed to submit the calculation task"));
    }
}
