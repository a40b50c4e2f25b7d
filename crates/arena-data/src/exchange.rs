//! USD/KRW 환율 소스.
//!
//! `GET {base}/v6/latest/USD` → `{"result":"success","rates":{"KRW":1380.5,...}}`

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{QuoteError, QuoteResult};

const DEFAULT_BASE_URL: &str = "https://open.er-api.com";

/// 환율 소스 트레잇.
#[async_trait]
pub trait ExchangeRateSource: Send + Sync {
    /// 1 USD당 KRW 환율을 조회합니다.
    async fn usd_krw(&self) -> QuoteResult<Decimal>;
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// open.er-api.com 기반 환율 소스 (API 키 불필요).
#[derive(Debug, Clone)]
pub struct OpenExchangeRateSource {
    client: Client,
    base_url: String,
}

impl OpenExchangeRateSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ExchangeRateSource for OpenExchangeRateSource {
    async fn usd_krw(&self) -> QuoteResult<Decimal> {
        let response = self
            .client
            .get(format!("{}/v6/latest/USD", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status {
                source_name: "exchange_rate",
                status: response.status().as_u16(),
            });
        }

        let body: LatestRates = response
            .json()
            .await
            .map_err(|e| QuoteError::Parse(e.to_string()))?;

        if body.result.as_deref().is_some_and(|r| r != "success") {
            return Err(QuoteError::NoData(format!("환율 API 결과: {:?}", body.result)));
        }

        body.rates
            .get("KRW")
            .copied()
            .filter(|rate| *rate > 0.0)
            .and_then(Decimal::from_f64_retain)
            .map(|rate| rate.round_dp(2))
            .ok_or_else(|| QuoteError::NoData("KRW 환율 없음".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_parse_krw_rate() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v6/latest/USD")
            .with_status(200)
            .with_body(r#"{"result":"success","base_code":"USD","rates":{"USD":1,"KRW":1392.456}}"#)
            .create_async()
            .await;

        let source = OpenExchangeRateSource::new(Client::new()).with_base_url(server.url());
        assert_eq!(source.usd_krw().await.unwrap(), dec!(1392.46));
    }

    #[tokio::test]
    async fn test_error_result() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v6/latest/USD")
            .with_status(200)
            .with_body(r#"{"result":"error","error-type":"quota-reached"}"#)
            .create_async()
            .await;

        let source = OpenExchangeRateSource::new(Client::new()).with_base_url(server.url());
        assert!(source.usd_krw().await.is_err());
    }
}
