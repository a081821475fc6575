//! Registration entries and the aggregated registration transaction

use ethers_core::types::{Address, H256, U256};
use ethers_core::utils::keccak256;

use crate::errors::BatchError;
use crate::message::RegistrationRequest;
use crate::precision::checked_sum;

/// keccak256 of the first dot-separated label of `name`.
///
/// Only the single-level scheme is supported: `alice.myethvault.com` registers the label
/// `alice` under the fixed registrar root.
pub fn label_hash(name: &str) -> H256 {
    let label = name.split('.').next().unwrap_or_default();
    H256::from(keccak256(label.as_bytes()))
}

/// A request that still needs an on-chain registration, priced in wei
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRegistration {
    /// Queue message this entry was derived from
    pub message_id: String,
    /// Full requested name, kept for logs
    pub name: String,
    pub label_hash: H256,
    pub target_address: Address,
    /// `floor(dollar_amount / spot_price * 10^18)`
    pub wei_amount: U256,
}

impl PendingRegistration {
    pub fn new(message_id: impl Into<String>, request: &RegistrationRequest, wei_amount: U256) -> Self {
        Self {
            message_id: message_id.into(),
            name: request.name.clone(),
            label_hash: request.label_hash(),
            target_address: request.target_address,
            wei_amount,
        }
    }
}

/// One registrar call covering every pending registration of a drain cycle.
///
/// Fields are private so the invariants checked in [`RegistrationTransaction::new`] hold for
/// every value in existence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationTransaction {
    label_hashes: Vec<H256>,
    addresses: Vec<Address>,
    amounts: Vec<U256>,
    gas_price: U256,
    value: U256,
    chain_id: u64,
}

impl RegistrationTransaction {
    /// Assemble a transaction from index-aligned lists.
    ///
    /// Fails when the lists are empty, disagree in length, or when `value` is not exactly
    /// the sum of `amounts`.
    pub fn new(
        label_hashes: Vec<H256>,
        addresses: Vec<Address>,
        amounts: Vec<U256>,
        gas_price: U256,
        value: U256,
        chain_id: u64,
    ) -> Result<Self, BatchError> {
        if label_hashes.len() != addresses.len() || addresses.len() != amounts.len() {
            return Err(BatchError::LengthMismatch {
                labels: label_hashes.len(),
                addresses: addresses.len(),
                amounts: amounts.len(),
            });
        }
        if label_hashes.is_empty() {
            return Err(BatchError::Empty);
        }

        let expected = checked_sum(&amounts)?;
        if expected != value {
            return Err(BatchError::ValueMismatch {
                expected,
                actual: value,
            });
        }

        Ok(Self {
            label_hashes,
            addresses,
            amounts,
            gas_price,
            value,
            chain_id,
        })
    }

    pub fn label_hashes(&self) -> &[H256] {
        &self.label_hashes
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn amounts(&self) -> &[U256] {
        &self.amounts
    }

    pub fn gas_price(&self) -> U256 {
        self.gas_price
    }

    /// Exact sum of [`Self::amounts`], attached as the transaction value
    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn len(&self) -> usize {
        self.label_hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label_hashes.is_empty()
    }
}
