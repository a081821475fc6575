//! Ticker-style spot price feed
//!
//! The endpoint answers with a JSON array whose first element carries `price_usd` as a
//! decimal string, e.g. `[{"id": "ethereum", "price_usd": "2500.12"}]`.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use types::Decimal;

use crate::error::{AdapterError, Result};
use crate::http::get_json;
use crate::traits::PriceProvider;

const PROVIDER: &str = "price feed";

/// USD-per-ether price from a public ticker endpoint
pub struct TickerPriceFeed {
    client: reqwest::Client,
    url: String,
}

impl TickerPriceFeed {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl PriceProvider for TickerPriceFeed {
    async fn fetch_spot_price(&self) -> Result<Decimal> {
        let body = get_json(&self.client, &self.url, PROVIDER).await?;
        let price = parse_ticker_price(&body)?;
        debug!(%price, "fetched spot price");
        Ok(price)
    }
}

fn parse_ticker_price(body: &Value) -> Result<Decimal> {
    let first = body
        .as_array()
        .and_then(|entries| entries.first())
        .ok_or_else(|| AdapterError::unexpected(PROVIDER, "expected a non-empty array"))?;

    let raw = first
        .get("price_usd")
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::unexpected(PROVIDER, "price_usd missing or not a string"))?;

    let price = Decimal::from_str(raw.trim())
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(|e| AdapterError::unexpected(PROVIDER, format!("price_usd {raw:?}: {e}")))?;

    if price <= Decimal::ZERO {
        return Err(AdapterError::unexpected(
            PROVIDER,
            format!("price_usd must be positive, got {price}"),
        ));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn feed(url: String) -> TickerPriceFeed {
        TickerPriceFeed::new(build_http_client(Duration::from_secs(5)).unwrap(), url)
    }

    #[tokio::test]
    async fn test_fetches_price_from_first_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"ethereum","price_usd":"2500.50"},{"price_usd":"1"}]"#)
            .create_async()
            .await;

        let price = feed(server.url()).fetch_spot_price().await.unwrap();
        assert_eq!(price, dec!(2500.50));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(503)
            .create_async()
            .await;

        let err = feed(server.url()).fetch_spot_price().await.unwrap_err();
        assert!(matches!(err, AdapterError::HttpStatus { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_bodies_rejected() {
        let bodies = [
            "not json",
            "{}",
            "[]",
            r#"[{"price_usd": 2500}]"#,
            r#"[{"price_usd": "abc"}]"#,
            r#"[{"price_usd": "0"}]"#,
            r#"[{"price_usd": "-3"}]"#,
        ];

        for body in bodies {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("GET", "/")
                .with_status(200)
                .with_body(body)
                .create_async()
                .await;

            let err = feed(server.url()).fetch_spot_price().await.unwrap_err();
            assert!(
                matches!(err, AdapterError::UnexpectedPayload { .. }),
                "body {body:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_scientific_price() {
        let body: Value = serde_json::from_str(r#"[{"price_usd":"2.5e3"}]"#).unwrap();
        assert_eq!(parse_ticker_price(&body).unwrap(), dec!(2500));
    }
}
