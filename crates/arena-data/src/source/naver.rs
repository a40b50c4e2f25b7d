//! 네이버 실시간 시세 (KR).
//!
//! `GET {base}/api/realtime/domestic/stock/{codes}` 는 쉼표로 구분한 여러 종목을
//! 한 번에 받습니다. 숫자는 "70,000" 같은 문자열로 내려옵니다.

use std::collections::HashMap;

use arena_core::{Market, Quote};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use tracing::debug;

use super::QuoteSource;
use crate::error::{QuoteError, QuoteResult};
use crate::parse_number;

const DEFAULT_BASE_URL: &str = "https://polling.finance.naver.com";

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    #[serde(default)]
    datas: Vec<RealtimeItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeItem {
    item_code: String,
    #[serde(default)]
    stock_name: Option<String>,
    close_price: String,
    #[serde(default)]
    compare_to_previous_close_price: Option<String>,
    #[serde(default)]
    fluctuations_ratio: Option<String>,
    #[serde(default)]
    open_price: Option<String>,
    #[serde(default)]
    high_price: Option<String>,
    #[serde(default)]
    low_price: Option<String>,
    #[serde(default)]
    accumulated_trading_volume: Option<String>,
}

impl RealtimeItem {
    fn into_quote(self) -> Option<Quote> {
        let price = parse_number(&self.close_price)?;
        let field = |raw: &Option<String>| raw.as_deref().and_then(parse_number);

        let mut quote = Quote::new(self.item_code, Market::KR, price);
        quote.name = self.stock_name;
        quote.change = field(&self.compare_to_previous_close_price).unwrap_or_default();
        quote.change_pct = field(&self.fluctuations_ratio).unwrap_or_default();
        quote.open = field(&self.open_price).unwrap_or(price);
        quote.high = field(&self.high_price).unwrap_or(price);
        quote.low = field(&self.low_price).unwrap_or(price);
        quote.volume = field(&self.accumulated_trading_volume)
            .and_then(|v| v.to_u64())
            .unwrap_or(0);
        quote.timestamp = Utc::now();
        Some(quote)
    }
}

/// 네이버 실시간 시세 소스.
#[derive(Debug, Clone)]
pub struct NaverSource {
    client: Client,
    base_url: String,
}

impl NaverSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// 기본 URL을 변경합니다 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_codes(&self, codes: &str) -> QuoteResult<Vec<Quote>> {
        let url = format!("{}/api/realtime/domestic/stock/{}", self.base_url, codes);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status {
                source_name: self.name(),
                status: response.status().as_u16(),
            });
        }

        let body: RealtimeResponse = response
            .json()
            .await
            .map_err(|e| QuoteError::Parse(e.to_string()))?;

        let quotes: Vec<Quote> = body
            .datas
            .into_iter()
            .filter_map(RealtimeItem::into_quote)
            .collect();

        debug!(codes, count = quotes.len(), "네이버 시세 수신");
        Ok(quotes)
    }
}

#[async_trait]
impl QuoteSource for NaverSource {
    fn name(&self) -> &'static str {
        "naver"
    }

    fn supports(&self, market: Market) -> bool {
        market == Market::KR
    }

    async fn fetch_quote(&self, ticker: &str, market: Market) -> QuoteResult<Quote> {
        if market != Market::KR {
            return Err(QuoteError::UnsupportedMarket(market.to_string()));
        }
        self.fetch_codes(ticker)
            .await?
            .into_iter()
            .find(|q| q.ticker == ticker)
            .ok_or_else(|| QuoteError::NoData(ticker.to_string()))
    }

    async fn fetch_batch(&self, tickers: &[String], market: Market) -> HashMap<String, Quote> {
        if market != Market::KR || tickers.is_empty() {
            return HashMap::new();
        }
        match self.fetch_codes(&tickers.join(",")).await {
            Ok(quotes) => quotes.into_iter().map(|q| (q.ticker.clone(), q)).collect(),
            Err(e) => {
                debug!(error = %e, "네이버 배치 시세 실패");
                HashMap::new()
            }
        }
    }
}
