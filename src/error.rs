//! Error types shared by the request queue, the dispatcher, and the CLI.

use thiserror::Error;

/// Errors surfaced while queueing, dispatching, or configuring requests.
///
/// Every queued task resolves to exactly one `RequestError` or one value.
/// Rate limiting is not a dedicated variant; the queue classifies errors
/// with [`crate::queue::is_rate_limit_error`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    /// The remote endpoint answered with a non-success status.
    #[error("API error: {message}")]
    Transport {
        /// Numeric HTTP status returned by the endpoint.
        status: u16,
        /// Message taken from the error payload, or the status reason.
        message: String,
    },

    /// The remote endpoint answered successfully but reported an error.
    #[error("AI error: {message}")]
    Application {
        /// Message taken from the `error.message` payload field.
        message: String,
    },

    /// The request never produced a response.
    #[error("network error talking to the AI API: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// A success response body could not be decoded.
    #[error("AI response could not be decoded: {message}")]
    Decode {
        /// Decoder error detail.
        message: String,
    },

    /// Configuration was missing or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// Local I/O failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },

    /// A queued task failed for a caller-defined reason.
    #[error("{message}")]
    Failed {
        /// Failure description.
        message: String,
        /// Optional numeric status attached by the task.
        status: Option<u16>,
    },

    /// The queue worker stopped before the task reached a terminal state.
    #[error("request queue stopped before the task completed")]
    QueueClosed,
}

impl RequestError {
    /// Builds a caller-defined task failure without a status code.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            status: None,
        }
    }

    /// Builds a caller-defined task failure carrying a status code.
    #[must_use]
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Returns the numeric status attached to the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Failed { status, .. } => *status,
            Self::Application { .. }
            | Self::Network { .. }
            | Self::Decode { .. }
            | Self::Configuration { .. }
            | Self::Io { .. }
            | Self::QueueClosed => None,
        }
    }
}
