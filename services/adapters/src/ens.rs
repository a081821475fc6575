//! ENS name ledger
//!
//! Resolves names through the provider's ENS support and submits batched registrations to
//! the vault registrar contract with a local signing key.

use std::sync::Arc;

use async_trait::async_trait;
use config::LedgerSettings;
use ethers::prelude::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider, ProviderError};
use ethers::signers::{LocalWallet, Signer};
use tracing::{debug, info};
use types::{Address, RegistrationTransaction, TxHash};
use url::Url;

use crate::error::{AdapterError, Result};
use crate::traits::NameLedger;

abigen!(
    VaultRegistrar,
    r#"[
        function register(bytes32[] labelHashes, address[] addresses, uint256[] values) external payable
    ]"#
);

type SignedClient = SignerMiddleware<Arc<Provider<Http>>, LocalWallet>;

/// Name ledger backed by an Ethereum JSON-RPC endpoint
pub struct EnsLedger {
    provider: Arc<Provider<Http>>,
    registrar: Option<VaultRegistrar<SignedClient>>,
    chain_id: u64,
}

impl EnsLedger {
    /// Connect to the RPC endpoint
    ///
    /// Without a signing key the ledger can still resolve names, which is all disabled mode
    /// needs; submissions then fail with a configuration error.
    pub fn new(settings: &LedgerSettings, http_client: reqwest::Client) -> Result<Self> {
        let url: Url = settings
            .rpc_url
            .parse()
            .map_err(|e| AdapterError::Configuration(format!("invalid RPC URL: {e}")))?;
        let provider = Arc::new(Provider::new(Http::new_with_client(url, http_client)));

        let registrar = match &settings.signing_key {
            Some(key) => {
                let wallet = key
                    .expose()
                    .trim()
                    .trim_start_matches("0x")
                    .parse::<LocalWallet>()
                    .map_err(|_| {
                        AdapterError::Configuration("invalid signing key format".to_string())
                    })?
                    .with_chain_id(settings.chain_id);
                let address: Address = settings.registrar_address.trim().parse().map_err(|e| {
                    AdapterError::Configuration(format!(
                        "invalid registrar address {:?}: {e}",
                        settings.registrar_address
                    ))
                })?;

                info!(
                    signer = ?wallet.address(),
                    registrar = ?address,
                    chain_id = settings.chain_id,
                    "🔑 Registration signer loaded"
                );
                let signer = Arc::new(SignerMiddleware::new(provider.clone(), wallet));
                Some(VaultRegistrar::new(address, signer))
            }
            None => None,
        };

        Ok(Self {
            provider,
            registrar,
            chain_id: settings.chain_id,
        })
    }

    pub fn can_submit(&self) -> bool {
        self.registrar.is_some()
    }
}

#[async_trait]
impl NameLedger for EnsLedger {
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        match self.provider.resolve_name(name).await {
            Ok(address) if address.is_zero() => Ok(None),
            Ok(address) => Ok(Some(address)),
            // No resolver configured for the name
            Err(ProviderError::EnsError(_)) => {
                debug!(name, "name has no resolver");
                Ok(None)
            }
            Err(e) => Err(AdapterError::Lookup {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn submit_registration(&self, transaction: &RegistrationTransaction) -> Result<TxHash> {
        let registrar = self.registrar.as_ref().ok_or_else(|| {
            AdapterError::Configuration("no signing key configured".to_string())
        })?;

        if transaction.chain_id() != self.chain_id {
            return Err(AdapterError::Configuration(format!(
                "transaction targets chain {} but ledger is on chain {}",
                transaction.chain_id(),
                self.chain_id
            )));
        }

        let label_hashes = transaction.label_hashes().iter().map(|hash| hash.0).collect();
        let call = registrar
            .register(
                label_hashes,
                transaction.addresses().to_vec(),
                transaction.amounts().to_vec(),
            )
            .legacy()
            .gas_price(transaction.gas_price())
            .value(transaction.value());

        let pending = call
            .send()
            .await
            .map_err(|e| AdapterError::Submission(e.to_string()))?;
        Ok(pending.tx_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::SecretString;
    use std::time::Duration;

    // Well-known development key (anvil account 0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn client() -> reqwest::Client {
        crate::http::build_http_client(Duration::from_secs(1)).unwrap()
    }

    fn settings(signing_key: Option<&str>) -> LedgerSettings {
        LedgerSettings {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            registrar_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            signing_key: signing_key.map(SecretString::new),
            ..LedgerSettings::default()
        }
    }

    #[test]
    fn test_builds_signer_from_key() {
        let ledger = EnsLedger::new(&settings(Some(DEV_KEY)), client()).unwrap();
        assert!(ledger.can_submit());
    }

    #[test]
    fn test_resolve_only_without_key() {
        let ledger = EnsLedger::new(&settings(None), client()).unwrap();
        assert!(!ledger.can_submit());
    }

    #[test]
    fn test_rejects_bad_key_and_address() {
        let err = EnsLedger::new(&settings(Some("0x1234")), client()).err().unwrap();
        assert!(err.is_permanent());

        let mut bad_address = settings(Some(DEV_KEY));
        bad_address.registrar_address = "not-an-address".to_string();
        let err = EnsLedger::new(&bad_address, client()).err().unwrap();
        assert!(matches!(err, AdapterError::Configuration(_)));
    }

    #[test]
    fn test_rejects_bad_rpc_url() {
        let mut bad_url = settings(None);
        bad_url.rpc_url = "not a url".to_string();
        assert!(EnsLedger::new(&bad_url, client()).is_err());
    }
}
