//! Dollar to wei conversion backed by a cached spot price

use std::sync::Arc;
use std::time::Duration;

use adapter_service::PriceProvider;
use tracing::debug;
use types::{dollars_to_wei, Decimal, U256};

use crate::cache::FlightCache;
use crate::error::{PipelineError, Result};

/// Process-wide spot price, refetched once older than the freshness window
pub struct PriceCache {
    provider: Arc<dyn PriceProvider>,
    cache: FlightCache<(), Decimal>,
}

impl PriceCache {
    pub fn new(provider: Arc<dyn PriceProvider>, freshness: Duration) -> Self {
        Self {
            provider,
            cache: FlightCache::with_freshness(freshness),
        }
    }

    /// USD per ether; served from cache while fresh, otherwise one shared fetch
    pub async fn spot_price(&self) -> Result<Decimal> {
        let provider = self.provider.clone();
        self.cache
            .get_or_fetch(&(), move || async move { provider.fetch_spot_price().await })
            .await
            .map_err(PipelineError::PriceFetch)
    }

    /// `floor(dollars / spot_price * 10^18)`
    pub async fn dollars_to_wei(&self, dollars: Decimal) -> Result<U256> {
        let price = self.spot_price().await?;
        let wei = dollars_to_wei(dollars, price)?;
        debug!(%dollars, %price, %wei, "converted dollar amount");
        Ok(wei)
    }

    pub fn cached_price(&self) -> Option<Decimal> {
        self.cache.peek(&())
    }
}
