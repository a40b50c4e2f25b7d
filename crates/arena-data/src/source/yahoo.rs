//! Yahoo chart API (KR/US 폴백).
//!
//! `GET {base}/v8/finance/chart/{symbol}?interval=1d&range=1d`
//! KR 종목은 `.KS` 접미사를 붙여 조회합니다.

use arena_core::{Market, Quote};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::QuoteSource;
use crate::error::{QuoteError, QuoteResult};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    regular_market_day_high: Option<f64>,
    #[serde(default)]
    regular_market_day_low: Option<f64>,
    #[serde(default)]
    regular_market_volume: Option<u64>,
    #[serde(default)]
    regular_market_time: Option<i64>,
    #[serde(default)]
    short_name: Option<String>,
}

fn dec(v: f64) -> Decimal {
    Decimal::from_f64_retain(v).unwrap_or_default().round_dp(4)
}

/// 시장별 Yahoo 심볼.
pub(crate) fn yahoo_symbol(ticker: &str, market: Market) -> String {
    match market {
        Market::KR if !ticker.contains('.') => format!("{}.KS", ticker),
        _ => ticker.to_string(),
    }
}

impl ChartMeta {
    fn into_quote(self, ticker: &str, market: Market) -> Option<Quote> {
        let price = self.regular_market_price.filter(|p| *p > 0.0).map(dec)?;
        let mut quote = Quote::new(ticker, market, price);
        quote.name = self.short_name;

        if let Some(prev) = self.chart_previous_close.filter(|p| *p > 0.0).map(dec) {
            quote.change = price - prev;
            quote.change_pct = ((price - prev) / prev * Decimal::ONE_HUNDRED).round_dp(2);
            quote.open = prev;
        }
        quote.high = self.regular_market_day_high.map(dec).unwrap_or(price);
        quote.low = self.regular_market_day_low.map(dec).unwrap_or(price);
        quote.volume = self.regular_market_volume.unwrap_or(0);
        if let Some(ts) = self
            .regular_market_time
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
        {
            quote.timestamp = ts;
        }
        Some(quote)
    }
}

/// Yahoo chart 시세 소스.
#[derive(Debug, Clone)]
pub struct YahooChartSource {
    client: Client,
    base_url: String,
}

impl YahooChartSource {
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
impl QuoteSource for YahooChartSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn supports(&self, _market: Market) -> bool {
        true
    }

    async fn fetch_quote(&self, ticker: &str, market: Market) -> QuoteResult<Quote> {
        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            yahoo_symbol(ticker, market)
        );
        let response = self
            .client
            .get(&url)
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status {
                source_name: self.name(),
                status: response.status().as_u16(),
            });
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| QuoteError::Parse(e.to_string()))?;

        body.chart
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|result| result.meta.into_quote(ticker, market))
            .ok_or_else(|| QuoteError::NoData(ticker.to_string()))
    }
}
