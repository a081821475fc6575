//! Safe fee rate lookup with a hard ceiling
//!
//! Never cached: each submission reads the current rate.

use std::sync::Arc;

use adapter_service::FeeProvider;
use tracing::{debug, warn};
use types::{gwei_to_wei, Decimal, PrecisionError, U256};

use crate::error::{PipelineError, Result};

/// Fee rate accepted for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeGasPrice {
    pub gwei: Decimal,
    pub wei: U256,
}

pub struct GasPriceGuard {
    provider: Arc<dyn FeeProvider>,
    ceiling_gwei: Decimal,
    /// Provider units per gwei (the gas station reports tenths of gwei)
    units_per_gwei: Decimal,
}

impl GasPriceGuard {
    pub fn new(provider: Arc<dyn FeeProvider>, ceiling_gwei: Decimal, units_per_gwei: Decimal) -> Self {
        Self {
            provider,
            ceiling_gwei,
            units_per_gwei,
        }
    }

    /// Current safe-low rate in wei, or `FeeTooHigh` above the ceiling
    pub async fn safe_gas_price(&self) -> Result<SafeGasPrice> {
        let raw = self
            .provider
            .fetch_safe_fee_rate()
            .await
            .map_err(PipelineError::FeeFetch)?;

        let gwei = raw
            .checked_div(self.units_per_gwei)
            .ok_or(PrecisionError::DivisionByZero)?;

        if gwei > self.ceiling_gwei {
            warn!(%gwei, ceiling_gwei = %self.ceiling_gwei, "⛽ Safe fee rate above ceiling, refusing to submit");
            return Err(PipelineError::FeeTooHigh {
                gwei,
                ceiling_gwei: self.ceiling_gwei,
            });
        }

        let wei = gwei_to_wei(gwei)?;
        debug!(%gwei, %wei, "safe fee rate accepted");
        Ok(SafeGasPrice { gwei, wei })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFeeProvider;
    use rust_decimal_macros::dec;

    fn guard(provider: &Arc<MockFeeProvider>) -> GasPriceGuard {
        GasPriceGuard::new(provider.clone(), dec!(10), dec!(10))
    }

    #[tokio::test]
    async fn test_normalizes_tenths_of_gwei() {
        let provider = Arc::new(MockFeeProvider::new(dec!(85)));
        let price = guard(&provider).safe_gas_price().await.unwrap();
        assert_eq!(price.gwei, dec!(8.5));
        assert_eq!(price.wei, U256::from(8_500_000_000u64));
    }

    #[tokio::test]
    async fn test_ceiling_is_inclusive() {
        let provider = Arc::new(MockFeeProvider::new(dec!(100)));
        let price = guard(&provider).safe_gas_price().await.unwrap();
        assert_eq!(price.wei, U256::from(10_000_000_000u64));

        provider.set_rate(dec!(101));
        let err = guard(&provider).safe_gas_price().await.unwrap_err();
        assert!(matches!(err, PipelineError::FeeTooHigh { gwei, .. } if gwei == dec!(10.1)));
    }

    #[tokio::test]
    async fn test_not_cached_between_calls() {
        let provider = Arc::new(MockFeeProvider::new(dec!(20)));
        let guard = guard(&provider);
        guard.safe_gas_price().await.unwrap();
        guard.safe_gas_price().await.unwrap();
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces() {
        let provider = Arc::new(MockFeeProvider::failing());
        let err = guard(&provider).safe_gas_price().await.unwrap_err();
        assert!(matches!(err, PipelineError::FeeFetch(_)));
    }
}
