//! Service defaults
//!
//! Policy constants and default endpoints used when the configuration file and
//! environment leave a value unset.

/// Queue transport defaults
pub mod queue {
    /// Largest batch SQS accepts for receive and delete-batch calls
    pub const MAX_BATCH_SIZE: i32 = 10;

    /// Long-poll duration for one receive (seconds)
    pub const DEFAULT_WAIT_TIME_SECS: i32 = 20;

    /// Default config file, relative to the working directory
    pub const DEFAULT_CONFIG_PATH: &str = "config/registrar.toml";
}

/// Ledger defaults
pub mod ledger {
    /// Ethereum mainnet
    pub const DEFAULT_CHAIN_ID: u64 = 1;

    /// Public mainnet JSON-RPC endpoint
    pub const DEFAULT_RPC_URL: &str = "https://cloudflare-eth.com";

    /// RPC request timeout (seconds)
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Spot price defaults
pub mod pricing {
    /// Ticker endpoint returning `[{"price_usd": "..."}]`
    pub const DEFAULT_PRICE_URL: &str = "https://api.coinmarketcap.com/v1/ticker/ethereum/";

    /// A fetched spot price is reused for this long
    pub const DEFAULT_FRESHNESS_SECS: u64 = 60;

    /// HTTP timeout for price requests (seconds)
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
}

/// Fee rate defaults
pub mod gas {
    /// Gas station endpoint returning `{"safeLow": <tenths of gwei>}`
    pub const DEFAULT_GAS_STATION_URL: &str = "https://ethgasstation.info/json/ethgasAPI.json";

    /// Safe fee ceiling in gwei; above this nothing is submitted
    pub const DEFAULT_MAX_GAS_PRICE_GWEI: u64 = 10;

    /// The gas station reports `safeLow` in tenths of gwei
    pub const SAFE_LOW_UNITS_PER_GWEI: u64 = 10;
}

/// Message validation defaults
pub mod validation {
    /// Every requested name must be a single label under this suffix
    pub const DEFAULT_DOMAIN_SUFFIX: &str = "myethvault.com";

    /// Upper bound of the dollar amount per registration
    pub const DEFAULT_MAX_DOLLARS: u64 = 5;
}

/// Drain loop defaults
pub mod drain {
    /// Pause after a receive that returned nothing (seconds)
    pub const DEFAULT_IDLE_DELAY_SECS: u64 = 1;

    /// Pause after a cycle whose receive failed (seconds)
    pub const DEFAULT_ERROR_DELAY_SECS: u64 = 5;
}
