//! Gas station fee feed
//!
//! Reports `safeLow` as a JSON number in the station's own unit (tenths of gwei).
//! Normalization to gwei happens in the pipeline's fee guard.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use types::Decimal;

use crate::error::{AdapterError, Result};
use crate::http::get_json;
use crate::traits::FeeProvider;

const PROVIDER: &str = "gas station";

pub struct GasStationFeed {
    client: reqwest::Client,
    url: String,
}

impl GasStationFeed {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl FeeProvider for GasStationFeed {
    async fn fetch_safe_fee_rate(&self) -> Result<Decimal> {
        let body = get_json(&self.client, &self.url, PROVIDER).await?;
        let safe_low = parse_safe_low(&body)?;
        debug!(%safe_low, "fetched safe low fee rate");
        Ok(safe_low)
    }
}

fn parse_safe_low(body: &Value) -> Result<Decimal> {
    let number = match body.get("safeLow") {
        Some(Value::Number(number)) => number,
        _ => {
            return Err(AdapterError::unexpected(
                PROVIDER,
                "safeLow missing or not a number",
            ))
        }
    };

    let text = number.to_string();
    let safe_low = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| AdapterError::unexpected(PROVIDER, format!("safeLow {text}: {e}")))?;

    if safe_low.is_sign_negative() {
        return Err(AdapterError::unexpected(
            PROVIDER,
            format!("safeLow must not be negative, got {safe_low}"),
        ));
    }
    Ok(safe_low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    async fn fetch_with_body(body: &str) -> Result<Decimal> {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let client = build_http_client(Duration::from_secs(5)).unwrap();
        GasStationFeed::new(client, server.url())
            .fetch_safe_fee_rate()
            .await
    }

    #[tokio::test]
    async fn test_reads_raw_safe_low() {
        let safe_low = fetch_with_body(r#"{"fast": 120, "safeLow": 80, "average": 95}"#)
            .await
            .unwrap();
        assert_eq!(safe_low, dec!(80));
    }

    #[tokio::test]
    async fn test_fractional_safe_low() {
        let safe_low = fetch_with_body(r#"{"safeLow": 12.5}"#).await.unwrap();
        assert_eq!(safe_low, dec!(12.5));
    }

    #[tokio::test]
    async fn test_missing_or_string_safe_low_rejected() {
        for body in [r#"{"fast": 1}"#, r#"{"safeLow": "80"}"#, "[80]", r#"{"safeLow": -1}"#] {
            let err = fetch_with_body(body).await.unwrap_err();
            assert!(
                matches!(err, AdapterError::UnexpectedPayload { .. }),
                "body {body:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_not_found_reported_with_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(404)
            .create_async()
            .await;
        let client = build_http_client(Duration::from_secs(5)).unwrap();
        let err = GasStationFeed::new(client, server.url())
            .fetch_safe_fee_rate()
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::HttpStatus { status: 404, .. }));
    }
}
