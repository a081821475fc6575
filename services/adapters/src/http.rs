//! Shared HTTP plumbing for the JSON feeds and the JSON-RPC transport

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::{AdapterError, Result};

/// Build the pooled client shared by every HTTP-backed adapter
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(5)
        .timeout(timeout)
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .user_agent(concat!("ethvault-registrar/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// GET `url` and decode the body as JSON, rejecting non-2xx answers
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
    provider: &'static str,
) -> Result<Value> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::HttpStatus {
            provider,
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    debug!(provider, bytes = body.len(), "feed response received");
    serde_json::from_str(&body).map_err(|e| AdapterError::unexpected(provider, e.to_string()))
}
