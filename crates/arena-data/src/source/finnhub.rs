//! Finnhub 시세 (US).
//!
//! `GET {base}/api/v1/quote?symbol=AAPL&token=KEY`
//! 응답: `{c, d, dp, h, l, o, pc, t}`. 알 수 없는 종목은 `c = 0`으로 내려옵니다.

use arena_core::{Market, Quote};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::QuoteSource;
use crate::error::{QuoteError, QuoteResult};

const DEFAULT_BASE_URL: &str = "https://finnhub.io";

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    c: f64,
    #[serde(default)]
    d: Option<f64>,
    #[serde(default)]
    dp: Option<f64>,
    #[serde(default)]
    h: f64,
    #[serde(default)]
    l: f64,
    #[serde(default)]
    o: f64,
    #[serde(default)]
    t: i64,
}

fn dec(v: f64) -> Decimal {
    Decimal::from_f64_retain(v).unwrap_or_default().round_dp(4)
}

impl FinnhubQuote {
    fn into_quote(self, ticker: &str) -> Option<Quote> {
        if self.c <= 0.0 {
            return None;
        }
        let price = dec(self.c);
        let mut quote = Quote::new(ticker, Market::US, price);
        quote.change = self.d.map(dec).unwrap_or_default();
        quote.change_pct = self.dp.map(dec).unwrap_or_default();
        quote.open = dec(self.o);
        quote.high = dec(self.h);
        quote.low = dec(self.l);
        if let Some(ts) = Utc.timestamp_opt(self.t, 0).single().filter(|_| self.t > 0) {
            quote.timestamp = ts;
        }
        Some(quote)
    }
}

/// Finnhub 시세 소스.
pub struct FinnhubSource {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl FinnhubSource {
    pub fn new(client: Client, api_key: SecretString) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        }
    }

    /// `FINNHUB_API_KEY`가 설정된 경우에만 생성합니다.
    pub fn from_env(client: Client) -> Option<Self> {
        arena_core::env_var("FINNHUB_API_KEY").map(|key| Self::new(client, SecretString::from(key)))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl QuoteSource for FinnhubSource {
    fn name(&self) -> &'static str {
        "finnhub"
    }

    fn supports(&self, market: Market) -> bool {
        market == Market::US
    }

    async fn fetch_quote(&self, ticker: &str, market: Market) -> QuoteResult<Quote> {
        if market != Market::US {
            return Err(QuoteError::UnsupportedMarket(market.to_string()));
        }

        let response = self
            .client
            .get(format!("{}/api/v1/quote", self.base_url))
            .query(&[("symbol", ticker), ("token", self.api_key.expose_secret())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status {
                source_name: self.name(),
                status: response.status().as_u16(),
            });
        }

        let body: FinnhubQuote = response
            .json()
            .await
            .map_err(|e| QuoteError::Parse(e.to_string()))?;

        body.into_quote(ticker)
            .ok_or_else(|| QuoteError::NoData(ticker.to_string()))
    }
}
