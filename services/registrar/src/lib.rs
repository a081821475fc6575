//! # Ethvault Registrar Service
//!
//! Drains the registration queue and turns pending requests into one batched ENS
//! registration transaction per cycle.
//!
//! ## Cycle
//!
//! ```text
//! receive ─► validate ─► resolve name ─┬─ already registered / conflict ─► delete
//!                │                     └─ unregistered ─► price in wei ─┐
//!                └─ invalid ─► delete                                   ▼
//!                                           fee ceiling ─► submit batch ─► delete
//! ```
//!
//! A message is deleted only once its outcome is final. Transient failures (name lookup,
//! price, fee, submission, delete) leave it on the queue for a later cycle.
//!
//! ## Modules
//!
//! - [`pipeline`]: cycle orchestration and [`CycleReport`]
//! - [`price_cache`]: dollar to wei conversion over a single-flight, time-bounded spot price
//! - [`gas_guard`]: safe fee rate with a hard ceiling
//! - [`dedup`]: classification against current name resolution
//! - [`aggregator`]: builds and submits the batched transaction
//! - [`acknowledger`] and [`queue_urls`]: per-queue batched deletes
//! - [`testing`]: in-memory collaborators

pub mod acknowledger;
pub mod aggregator;
pub mod cache;
pub mod dedup;
pub mod error;
pub mod gas_guard;
pub mod pipeline;
pub mod price_cache;
pub mod queue_urls;
pub mod testing;

pub use acknowledger::{AcknowledgeSummary, Acknowledger};
pub use aggregator::{build_transaction, BatchAggregator, SubmittedBatch};
pub use cache::FlightCache;
pub use dedup::{check_registration, DedupOutcome};
pub use error::{PipelineError, Result};
pub use gas_guard::{GasPriceGuard, SafeGasPrice};
pub use pipeline::{Collaborators, CycleReport, PipelineSettings, RegistrarPipeline, SubmissionOutcome};
pub use price_cache::PriceCache;
pub use queue_urls::QueueUrlCache;

/// Default `tracing` filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "registrar_service=info,adapter_service=info,warn";
