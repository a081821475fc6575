//! Service Configuration Module
//!
//! Loads the registrar configuration from an optional TOML file with environment
//! overrides (`REGISTRAR_` prefix, `__` between nested keys, e.g.
//! `REGISTRAR_QUEUE__QUEUE_ARN`). The two operating flags of the deployed service keep
//! their historical names: `SIGNING_PRIVATE_KEY` and `REGISTRATION_DISABLED`.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::service::{drain, gas, ledger, pricing, queue, validation};

/// Environment variable holding the transaction signing key
pub const SIGNING_KEY_ENV: &str = "SIGNING_PRIVATE_KEY";

/// Environment variable switching the service into disabled mode
pub const REGISTRATION_DISABLED_ENV: &str = "REGISTRATION_DISABLED";

/// Main service configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct RegistrarConfig {
    /// Queue transport
    pub queue: QueueSettings,

    /// Name resolution and transaction submission
    pub ledger: LedgerSettings,

    /// Spot price feed
    pub pricing: PricingSettings,

    /// Fee rate feed and ceiling
    pub gas: GasSettings,

    /// Message validation policy
    pub validation: ValidationSettings,

    /// Drain loop pacing
    pub drain: DrainSettings,

    /// Feature flags
    pub features: FeatureFlags,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QueueSettings {
    /// ARN of the queue holding registration requests
    pub queue_arn: String,
    /// AWS region override (SDK default chain when unset)
    pub region: Option<String>,
    /// Endpoint override, e.g. a local SQS emulator
    pub endpoint: Option<String>,
    /// Messages per receive (1..=10)
    pub max_messages: i32,
    /// Long-poll wait per receive in seconds (0..=20)
    pub wait_time_secs: i32,
    /// Visibility timeout applied to received messages
    pub visibility_timeout_secs: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LedgerSettings {
    pub rpc_url: String,
    /// Registrar contract receiving the batched `register` call
    pub registrar_address: String,
    pub chain_id: u64,
    /// Hex private key; normally supplied through `SIGNING_PRIVATE_KEY`
    pub signing_key: Option<SecretString>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PricingSettings {
    pub price_url: String,
    /// Seconds a fetched spot price stays fresh
    pub freshness_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GasSettings {
    pub gas_station_url: String,
    /// Safe fee ceiling in gwei
    pub max_gas_price_gwei: Decimal,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ValidationSettings {
    pub domain_suffix: String,
    pub max_dollars: Decimal,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DrainSettings {
    pub idle_delay_secs: u64,
    pub error_delay_secs: u64,
}

/// Feature flags
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct FeatureFlags {
    /// Validate, dedup and acknowledge, but never move funds
    pub registration_disabled: bool,
}

/// String whose value never appears in `Debug` output
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            queue_arn: String::new(),
            region: None,
            endpoint: None,
            max_messages: queue::MAX_BATCH_SIZE,
            wait_time_secs: queue::DEFAULT_WAIT_TIME_SECS,
            visibility_timeout_secs: None,
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            rpc_url: ledger::DEFAULT_RPC_URL.to_string(),
            registrar_address: String::new(),
            chain_id: ledger::DEFAULT_CHAIN_ID,
            signing_key: None,
            request_timeout_secs: ledger::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            price_url: pricing::DEFAULT_PRICE_URL.to_string(),
            freshness_secs: pricing::DEFAULT_FRESHNESS_SECS,
            request_timeout_secs: pricing::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            gas_station_url: gas::DEFAULT_GAS_STATION_URL.to_string(),
            max_gas_price_gwei: Decimal::from(gas::DEFAULT_MAX_GAS_PRICE_GWEI),
            request_timeout_secs: pricing::DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            domain_suffix: validation::DEFAULT_DOMAIN_SUFFIX.to_string(),
            max_dollars: Decimal::from(validation::DEFAULT_MAX_DOLLARS),
        }
    }
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            idle_delay_secs: drain::DEFAULT_IDLE_DELAY_SECS,
            error_delay_secs: drain::DEFAULT_ERROR_DELAY_SECS,
        }
    }
}

impl RegistrarConfig {
    /// Load configuration from file (if any) with environment overrides.
    ///
    /// An explicit `path` must exist; without one, the default path is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => {
                info!("Loading registrar config: {:?}", path);
                builder.add_source(File::from(path).required(true))
            }
            None => {
                let default_path = Path::new(queue::DEFAULT_CONFIG_PATH);
                if !default_path.exists() {
                    debug!("No config file at {:?}, using defaults", default_path);
                }
                builder.add_source(File::from(default_path).required(false))
            }
        };

        // Override with environment variables (REGISTRAR_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("REGISTRAR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder = builder
            .set_override_option("ledger.signing_key", std::env::var(SIGNING_KEY_ENV).ok())
            .context("Failed to apply signing key override")?
            .set_override_option(
                "features.registration_disabled",
                std::env::var(REGISTRATION_DISABLED_ENV)
                    .ok()
                    .map(|value| value == "true"),
            )
            .context("Failed to apply registration flag override")?;

        let config = builder.build().context("Failed to build configuration")?;

        let mut config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in endpoint values
    pub fn expand_env_vars(&mut self) -> Result<()> {
        fn expand(value: &mut String, what: &str) -> Result<()> {
            let expanded = shellexpand::env(value)
                .with_context(|| format!("Failed to expand {what}"))?
                .to_string();
            *value = expanded;
            Ok(())
        }

        expand(&mut self.queue.queue_arn, "queue ARN")?;
        expand(&mut self.ledger.rpc_url, "RPC URL")?;
        expand(&mut self.ledger.registrar_address, "registrar address")?;
        expand(&mut self.pricing.price_url, "price URL")?;
        expand(&mut self.gas.gas_station_url, "gas station URL")?;

        if let Some(endpoint) = &mut self.queue.endpoint {
            expand(endpoint, "queue endpoint")?;
        }

        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.queue.queue_arn.trim().is_empty() {
            bail!("queue.queue_arn must be set");
        }
        if self.queue.queue_arn.rsplit(':').next().unwrap_or_default().is_empty() {
            bail!("queue.queue_arn has no queue name: {}", self.queue.queue_arn);
        }
        if !(1..=queue::MAX_BATCH_SIZE).contains(&self.queue.max_messages) {
            bail!(
                "queue.max_messages must be within 1..={}, got {}",
                queue::MAX_BATCH_SIZE,
                self.queue.max_messages
            );
        }
        if !(0..=20).contains(&self.queue.wait_time_secs) {
            bail!(
                "queue.wait_time_secs must be within 0..=20, got {}",
                self.queue.wait_time_secs
            );
        }
        if self.pricing.freshness_secs == 0 {
            warn!("pricing.freshness_secs is 0, every conversion will fetch a new price");
        }
        if self.gas.max_gas_price_gwei <= Decimal::ZERO {
            bail!("gas.max_gas_price_gwei must be positive");
        }
        if self.validation.max_dollars < Decimal::ZERO {
            bail!("validation.max_dollars must not be negative");
        }
        if self.validation.domain_suffix.trim_matches('.').is_empty() {
            bail!("validation.domain_suffix must be set");
        }

        if !self.features.registration_disabled {
            if self.ledger.registrar_address.trim().is_empty() {
                bail!("ledger.registrar_address must be set unless registration is disabled");
            }
            if self.ledger.signing_key.is_none() {
                bail!("{SIGNING_KEY_ENV} must be set unless registration is disabled");
            }
        }

        Ok(())
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(path: Option<&Path>) -> Result<RegistrarConfig> {
    RegistrarConfig::load(path)
}
