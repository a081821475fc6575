//! Collaborator interfaces consumed by the registration pipeline
//!
//! Every external system is reached only through one of these traits, so the pipeline can
//! be driven against in-memory doubles in tests.

use async_trait::async_trait;
use types::{Address, Decimal, DeleteEntry, RawMessage, RegistrationTransaction, TxHash};

use crate::error::Result;

/// Queue holding registration requests
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Receive the next batch of messages (possibly empty)
    async fn receive_batch(&self) -> Result<Vec<RawMessage>>;

    /// Delete delivered messages from one queue
    async fn delete_batch(&self, queue_url: &str, entries: &[DeleteEntry]) -> Result<()>;

    /// Resolve a queue ARN to the URL the delete call needs
    async fn resolve_queue_url(&self, queue_arn: &str) -> Result<String>;
}

/// Name registry on the ledger
#[async_trait]
pub trait NameLedger: Send + Sync {
    /// Current address of `name`, `None` when it is not registered
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>>;

    /// Submit one batched registration, returning its transaction hash
    async fn submit_registration(&self, transaction: &RegistrationTransaction) -> Result<TxHash>;
}

/// Source of the USD-per-ether spot price
#[async_trait]
pub trait PriceProvider: Send + Sync {
    async fn fetch_spot_price(&self) -> Result<Decimal>;
}

/// Source of the recommended "safe low" fee rate, in provider units
#[async_trait]
pub trait FeeProvider: Send + Sync {
    async fn fetch_safe_fee_rate(&self) -> Result<Decimal>;
}
