//! Pipeline error taxonomy
//!
//! Per-message rejections (parse, validation, conflict) never surface here; they are
//! handled inside the cycle. These are the failures that leave messages on the queue.

use std::sync::Arc;

use adapter_service::AdapterError;
use thiserror::Error;
use types::{BatchError, Decimal, PrecisionError};

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Queue receive failed: {0}")]
    Receive(#[source] AdapterError),

    #[error("Transient lookup failure for {name}: {source}")]
    LookupTransient {
        name: String,
        #[source]
        source: AdapterError,
    },

    #[error("Spot price unavailable: {0}")]
    PriceFetch(#[source] Arc<AdapterError>),

    #[error("Safe fee rate unavailable: {0}")]
    FeeFetch(#[source] AdapterError),

    #[error("Safe fee rate {gwei} gwei exceeds ceiling of {ceiling_gwei} gwei")]
    FeeTooHigh { gwei: Decimal, ceiling_gwei: Decimal },

    #[error("Registration submission failed: {0}")]
    Submission(#[source] AdapterError),

    #[error("Queue URL lookup failed for {queue_arn}: {source}")]
    QueueUrl {
        queue_arn: String,
        #[source]
        source: Arc<AdapterError>,
    },

    #[error("Acknowledgment failed for {queue_url}: {source}")]
    Acknowledge {
        queue_url: String,
        #[source]
        source: AdapterError,
    },

    #[error("Amount conversion failed: {0}")]
    Amount(#[from] PrecisionError),

    #[error("Invalid registration batch: {0}")]
    Batch(#[from] BatchError),
}

impl PipelineError {
    /// A later drain cycle may succeed where this one failed
    pub fn is_transient(&self) -> bool {
        !matches!(self, PipelineError::Amount(_) | PipelineError::Batch(_))
    }

    /// Short stage name for structured logs
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Receive(_) => "receive",
            PipelineError::LookupTransient { .. } => "resolve",
            PipelineError::PriceFetch(_) | PipelineError::Amount(_) => "price",
            PipelineError::FeeFetch(_) | PipelineError::FeeTooHigh { .. } => "gas",
            PipelineError::Submission(_) | PipelineError::Batch(_) => "submit",
            PipelineError::QueueUrl { .. } | PipelineError::Acknowledge { .. } => "acknowledge",
        }
    }
}
