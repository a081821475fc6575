//! Error types for the adapters module

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("{provider} returned status {status}")]
    HttpStatus {
        /// Which feed answered
        provider: &'static str,
        /// HTTP status code
        status: u16,
    },

    /// Provider answered 2xx with a body of the wrong shape
    #[error("{provider} response did not have expected format: {detail}")]
    UnexpectedPayload {
        /// Which feed answered
        provider: &'static str,
        /// What was wrong with the body
        detail: String,
    },

    /// Queue transport call failed
    #[error("Queue {operation} failed: {reason}")]
    Queue {
        /// Transport operation (receive, delete, get-url)
        operation: &'static str,
        /// Underlying SDK error
        reason: String,
    },

    /// Queue name lookup succeeded but carried no URL
    #[error("Failed to get queue url for name: \"{queue_name}\"")]
    QueueUrlMissing {
        /// Name derived from the ARN
        queue_name: String,
    },

    /// Some entries of a delete batch were rejected by the transport
    #[error("Failed to delete {} message(s) from {queue_url}: {}", .failed_ids.len(), .failed_ids.join(", "))]
    PartialDelete {
        /// Queue the batch was sent to
        queue_url: String,
        /// Entry ids the transport reported as failed
        failed_ids: Vec<String>,
    },

    /// Name resolution failed for a reason other than "not registered"
    #[error("Name lookup failed for {name}: {reason}")]
    Lookup {
        /// Name being resolved
        name: String,
        /// Underlying provider error
        reason: String,
    },

    /// Registration transaction was rejected or could not be sent
    #[error("Registration transaction failed: {0}")]
    Submission(String),

    /// Configuration error in adapter settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AdapterError {
    /// Check if a later attempt with the same input may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AdapterError::Http(_)
                | AdapterError::HttpStatus { .. }
                | AdapterError::Queue { .. }
                | AdapterError::PartialDelete { .. }
                | AdapterError::Lookup { .. }
                | AdapterError::Submission(_)
        )
    }

    /// Check if this error indicates a permanent failure
    pub fn is_permanent(&self) -> bool {
        matches!(self, AdapterError::Configuration(_))
    }

    pub(crate) fn unexpected(provider: &'static str, detail: impl Into<String>) -> Self {
        AdapterError::UnexpectedPayload {
            provider,
            detail: detail.into(),
        }
    }
}
