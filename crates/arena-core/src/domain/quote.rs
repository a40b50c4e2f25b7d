//! 시세 스냅샷.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::market::{Currency, Market};

/// 시세 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteOrigin {
    /// 외부 시세 API
    Live,
    /// 모든 소스 실패 시 생성한 결정적 모의 시세
    Mock,
}

/// 종목 현재가 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub market: Market,
    pub price: Decimal,
    pub change: Decimal,
    pub change_pct: Decimal,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub volume: u64,
    pub currency: Currency,
    pub timestamp: DateTime<Utc>,
    pub origin: QuoteOrigin,
}

impl Quote {
    /// 현재가만 있는 시세를 생성합니다. OHLC는 현재가로 채웁니다.
    pub fn new(ticker: impl Into<String>, market: Market, price: Decimal) -> Self {
        Self {
            ticker: ticker.into(),
            name: None,
            market,
            price,
            change: Decimal::ZERO,
            change_pct: Decimal::ZERO,
            open: price,
            high: price,
            low: price,
            volume: 0,
            currency: market.currency(),
            timestamp: Utc::now(),
            origin: QuoteOrigin::Live,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_origin(mut self, origin: QuoteOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// 실시간 시세이고 가격이 양수인지 확인합니다.
    pub fn is_tradable(&self) -> bool {
        self.origin == QuoteOrigin::Live && self.price > Decimal::ZERO
    }
}

/// 종목 유니버스 항목 (코드 + 이름).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerInfo {
    pub ticker: String,
    pub name: String,
    pub market: Market,
}

impl TickerInfo {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>, market: Market) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
            market,
        }
    }
}
