//! Registration batch aggregation
//!
//! Turns one cycle's pending registrations into a single `register` transaction. The three
//! parallel lists share one ordering (the order of the input slice) and the attached value
//! is the exact checked sum of the per-entry amounts.

use std::sync::Arc;

use adapter_service::NameLedger;
use tracing::{error, info};
use types::{checked_sum, PendingRegistration, RegistrationTransaction, TxHash, U256};

use crate::error::{PipelineError, Result};

/// Successful submission of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedBatch {
    pub tx_hash: TxHash,
    pub entries: usize,
    pub value: U256,
}

/// Build the batched transaction, `None` when there is nothing to register
pub fn build_transaction(
    pending: &[PendingRegistration],
    gas_price: U256,
    chain_id: u64,
) -> Result<Option<RegistrationTransaction>> {
    if pending.is_empty() {
        return Ok(None);
    }

    let label_hashes = pending.iter().map(|entry| entry.label_hash).collect();
    let addresses = pending.iter().map(|entry| entry.target_address).collect();
    let amounts: Vec<U256> = pending.iter().map(|entry| entry.wei_amount).collect();
    let value = checked_sum(&amounts)?;

    let transaction =
        RegistrationTransaction::new(label_hashes, addresses, amounts, gas_price, value, chain_id)?;
    Ok(Some(transaction))
}

/// Submits aggregated batches through the ledger
pub struct BatchAggregator {
    ledger: Arc<dyn NameLedger>,
    chain_id: u64,
}

impl BatchAggregator {
    pub fn new(ledger: Arc<dyn NameLedger>, chain_id: u64) -> Self {
        Self { ledger, chain_id }
    }

    /// Submit every pending registration as one transaction
    ///
    /// The batch succeeds or fails as a whole; an empty slice submits nothing.
    pub async fn submit(
        &self,
        pending: &[PendingRegistration],
        gas_price: U256,
    ) -> Result<Option<SubmittedBatch>> {
        let Some(transaction) = build_transaction(pending, gas_price, self.chain_id)? else {
            return Ok(None);
        };

        let tx_hash = match self.ledger.submit_registration(&transaction).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                error!(entries = transaction.len(), value = %transaction.value(), error = %e, "❌ Registration batch failed");
                return Err(PipelineError::Submission(e));
            }
        };

        info!(
            tx_hash = ?tx_hash,
            entries = transaction.len(),
            value = %transaction.value(),
            gas_price = %gas_price,
            names = ?pending.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>(),
            "📤 Registration batch submitted"
        );

        Ok(Some(SubmittedBatch {
            tx_hash,
            entries: transaction.len(),
            value: transaction.value(),
        }))
    }
}
