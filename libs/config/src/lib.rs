//! # Registrar Configuration
//!
//! Centralized configuration loading and policy defaults for the registrar service.
//!
//! ## Features
//!
//! - **Service Defaults**: endpoints, freshness window, fee ceiling, dollar ceiling
//! - **Layered Loading**: TOML file, then `REGISTRAR_*` environment overrides, then the
//!   `SIGNING_PRIVATE_KEY` / `REGISTRATION_DISABLED` operating flags
//! - **Validation**: settings the pipeline cannot run with are rejected at startup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::load_config;
//!
//! let config = load_config(None)?;
//! println!("draining {}", config.queue.queue_arn);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod service;
pub mod service_config;

// Re-export commonly used types
pub use service_config::{
    load_config, DrainSettings, FeatureFlags, GasSettings, LedgerSettings, PricingSettings,
    QueueSettings, RegistrarConfig, SecretString, ValidationSettings,
};
