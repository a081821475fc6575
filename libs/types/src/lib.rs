//! # Registrar Types
//!
//! Shared data model for the batch registration pipeline.
//!
//! ## Design Philosophy
//!
//! - **No Precision Loss**: dollar amounts and spot prices are exact decimals, on-chain
//!   amounts are `U256` integers. Floating point never touches a money value.
//! - **Validated At The Edge**: a [`RegistrationRequest`] can only be produced by
//!   [`parse_registration_request`], so every downstream stage works on checked data.
//! - **Invariants In Constructors**: a [`RegistrationTransaction`] refuses to exist when its
//!   parallel lists disagree in length or when its value is not the exact sum of its amounts.
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{parse_registration_request, ValidationPolicy};
//!
//! let policy = ValidationPolicy::default();
//! let body = r#"{"name":"moody.myethvault.com","targetAddress":"0x1bd8437054ab40573816f965D95b359Ca2534fD1","dollarAmount":5}"#;
//! let request = parse_registration_request(body, &policy).unwrap();
//! assert_eq!(request.label(), "moody");
//! ```

pub mod acknowledge;
pub mod errors;
pub mod message;
pub mod precision;
pub mod registration;

pub use acknowledge::{group_by_queue, AcknowledgeEntry, DeleteEntry};
pub use errors::{BatchError, MessageError, PrecisionError};
pub use message::{parse_registration_request, RawMessage, RegistrationRequest, ValidationPolicy};
pub use precision::{checked_sum, dollars_to_wei, gwei_to_wei, scaled_quotient_floor};
pub use registration::{label_hash, PendingRegistration, RegistrationTransaction};

// Re-export the primitive types so consumers do not need a direct ethers dependency
pub use ethers_core::types::{Address, TxHash, H256, U256};
pub use rust_decimal::Decimal;
