//! Error types for message validation, unit conversion and batch construction

use ethers_core::types::U256;
use thiserror::Error;

/// Rejection of a single raw queue message.
///
/// Both variants are terminal: retrying cannot change the validity of the same body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Body is not well-formed JSON
    #[error("Invalid JSON: {0}")]
    Parse(String),

    /// Body is JSON but does not describe a valid registration request
    #[error("Failed validation: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl MessageError {
    /// Invalid input is never retried
    pub fn is_terminal(&self) -> bool {
        true
    }

    /// Short label used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            MessageError::Parse(_) => "parse",
            MessageError::Validation(_) => "validation",
        }
    }
}

/// Errors from exact unit conversion
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecisionError {
    /// Amounts and prices must not be negative
    #[error("Negative value cannot be converted: {0}")]
    Negative(String),

    /// Conversion by a zero price
    #[error("Division by zero in unit conversion")]
    DivisionByZero,

    /// Intermediate or final value does not fit in 256 bits
    #[error("Value overflow: {0}")]
    Overflow(String),
}

/// Violations of the registration transaction invariants
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// A zero-entry registration transaction is never submitted
    #[error("Registration batch is empty")]
    Empty,

    /// Parallel lists must correspond index-for-index
    #[error(
        "Registration lists disagree in length: {labels} labels, {addresses} addresses, {amounts} amounts"
    )]
    LengthMismatch {
        labels: usize,
        addresses: usize,
        amounts: usize,
    },

    /// Attached value must equal the exact sum of the per-entry amounts
    #[error("Transaction value {actual} does not equal sum of amounts {expected}")]
    ValueMismatch { expected: U256, actual: U256 },

    /// Sum of amounts exceeded 256 bits
    #[error(transparent)]
    Precision(#[from] PrecisionError),
}
