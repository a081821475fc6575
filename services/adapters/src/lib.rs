//! # Registrar Adapters - External System Boundary
//!
//! ## Purpose
//!
//! Everything the registration pipeline talks to lives behind one of four traits:
//!
//! - [`QueueTransport`]: receive registration requests, delete settled messages
//! - [`NameLedger`]: resolve names, submit the batched registration transaction
//! - [`PriceProvider`]: USD-per-ether spot price
//! - [`FeeProvider`]: "safe low" fee rate in the provider's unit
//!
//! ## Production Implementations
//!
//! - [`SqsQueue`] over `aws-sdk-sqs`
//! - [`EnsLedger`] over an `ethers` HTTP provider and a local signing wallet
//! - [`TickerPriceFeed`] and [`GasStationFeed`] over one pooled `reqwest` client
//!
//! ## Error Handling
//!
//! All adapters return [`AdapterError`]; [`AdapterError::is_transient`] tells the pipeline
//! whether a message touched by the failure should stay on the queue for another attempt.

pub mod ens;
pub mod error;
pub mod gas_station;
pub mod http;
pub mod price_feed;
pub mod sqs;
pub mod traits;

pub use ens::EnsLedger;
pub use error::{AdapterError, Result};
pub use gas_station::GasStationFeed;
pub use http::build_http_client;
pub use price_feed::TickerPriceFeed;
pub use sqs::{queue_name_from_arn, SqsQueue};
pub use traits::{FeeProvider, NameLedger, PriceProvider, QueueTransport};
