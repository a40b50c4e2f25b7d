//! 모의투자 장부 레코드.
//!
//! 이 모듈은 장부 저장소가 다루는 엔티티를 정의합니다:
//! - `CashBalance` - 모델별 KRW/USD 현금 잔고
//! - `Holding` - 모델별 보유 종목과 평균 단가
//! - `TradeRecord` - 체결된 매수/매도 기록 (추가 전용)
//! - `ExchangeRecord` - 환전 기록 (추가 전용)
//! - `HoldRecord` - 관망(HOLD) 결정 기록
//! - `PortfolioHistoryPoint` - 주기적인 총 평가금액 스냅샷

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::market::{Currency, Market};
use crate::error::ArenaError;

/// 모델별 현금 잔고.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashBalance {
    pub model_id: Uuid,
    pub krw: Decimal,
    pub usd: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl CashBalance {
    /// 새 잔고를 생성합니다.
    pub fn new(model_id: Uuid, krw: Decimal, usd: Decimal) -> Self {
        Self {
            model_id,
            krw,
            usd,
            updated_at: Utc::now(),
        }
    }

    /// 잔고가 없는 모델에 사용할 0 잔고.
    pub fn empty(model_id: Uuid) -> Self {
        Self::new(model_id, Decimal::ZERO, Decimal::ZERO)
    }

    /// 통화별 잔고를 반환합니다.
    pub fn get(&self, currency: Currency) -> Decimal {
        match currency {
            Currency::KRW => self.krw,
            Currency::USD => self.usd,
        }
    }

    /// 통화별 잔고를 설정합니다.
    pub fn set(&mut self, currency: Currency, amount: Decimal) {
        match currency {
            Currency::KRW => self.krw = amount,
            Currency::USD => self.usd = amount,
        }
        self.updated_at = Utc::now();
    }
}

/// 보유 종목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: Uuid,
    pub model_id: Uuid,
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub market: Market,
    pub shares: Decimal,
    /// 평균 매입 단가 (시장 통화)
    pub avg_price: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// 첫 매수로 새 보유 종목을 생성합니다.
    pub fn open(
        model_id: Uuid,
        ticker: impl Into<String>,
        market: Market,
        shares: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id,
            ticker: ticker.into(),
            name: None,
            market,
            shares,
            avg_price: price,
            updated_at: Utc::now(),
        }
    }

    /// 종목명을 설정합니다.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 매입 원가 (시장 통화).
    pub fn cost_basis(&self) -> Decimal {
        self.shares * self.avg_price
    }
}

/// 매매 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            _ => Err(ArenaError::InvalidInput(format!("알 수 없는 매매 방향: {}", s))),
        }
    }
}

/// 체결된 거래 기록 (추가 전용).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub model_id: Uuid,
    pub ticker: String,
    pub market: Market,
    pub action: TradeAction,
    pub shares: Decimal,
    pub price: Decimal,
    /// shares × price (시장 통화)
    pub total_amount: Decimal,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TradeRecord {
    /// 새 거래 기록을 생성합니다.
    ///
    /// 총액은 포화 곱셈입니다. 체결 경로는 생성 전에 범위를 검사합니다.
    pub fn new(
        model_id: Uuid,
        ticker: impl Into<String>,
        market: Market,
        action: TradeAction,
        shares: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id,
            ticker: ticker.into(),
            market,
            action,
            shares,
            price,
            total_amount: shares.saturating_mul(price),
            currency: market.currency(),
            reasoning: None,
            created_at: Utc::now(),
        }
    }

    /// 판단 근거를 설정합니다.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// 이 거래가 해당 통화 현금에 준 영향 (매수는 음수, 매도는 양수).
    pub fn cash_delta(&self) -> Decimal {
        match self.action {
            TradeAction::Buy => -self.total_amount,
            TradeAction::Sell => self.total_amount,
        }
    }
}

/// 환전 기록 (추가 전용).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    pub id: Uuid,
    pub model_id: Uuid,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub from_amount: Decimal,
    pub to_amount: Decimal,
    /// 적용 환율 (KRW per USD)
    pub rate: Decimal,
    pub created_at: DateTime<Utc>,
}

impl ExchangeRecord {
    /// 새 환전 기록을 생성합니다.
    pub fn new(
        model_id: Uuid,
        from_currency: Currency,
        to_currency: Currency,
        from_amount: Decimal,
        to_amount: Decimal,
        rate: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id,
            from_currency,
            to_currency,
            from_amount,
            to_amount,
            rate,
            created_at: Utc::now(),
        }
    }
}

/// 관망(HOLD) 결정 기록.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldRecord {
    pub id: Uuid,
    pub model_id: Uuid,
    pub market: Market,
    pub reasoning: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

impl HoldRecord {
    pub fn new(model_id: Uuid, market: Market, reasoning: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id,
            market,
            reasoning: reasoning.into(),
            confidence,
            created_at: Utc::now(),
        }
    }
}

/// 포트폴리오 총 평가금액 스냅샷 (KRW 환산).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioHistoryPoint {
    pub id: Uuid,
    pub model_id: Uuid,
    pub total_value: Decimal,
    pub krw_cash: Decimal,
    pub usd_cash: Decimal,
    /// 보유 종목 평가금액 (KRW 환산)
    pub holdings_value: Decimal,
    pub exchange_rate: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl PortfolioHistoryPoint {
    /// 현재 시각으로 새 스냅샷을 생성합니다.
    pub fn new(model_id: Uuid, total_value: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_id,
            total_value,
            krw_cash: Decimal::ZERO,
            usd_cash: Decimal::ZERO,
            holdings_value: Decimal::ZERO,
            exchange_rate: Decimal::ZERO,
            recorded_at: Utc::now(),
        }
    }

    /// 기록 시각을 설정합니다.
    pub fn at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }

    /// 평가 구성 요소를 설정합니다.
    pub fn with_breakdown(
        mut self,
        krw_cash: Decimal,
        usd_cash: Decimal,
        holdings_value: Decimal,
        exchange_rate: Decimal,
    ) -> Self {
        self.krw_cash = krw_cash;
        self.usd_cash = usd_cash;
        self.holdings_value = holdings_value;
        self.exchange_rate = exchange_rate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cash_balance_by_currency() {
        let mut balance = CashBalance::new(Uuid::new_v4(), dec!(1000000), dec!(0));
        assert_eq!(balance.get(Currency::KRW), dec!(1000000));

        balance.set(Currency::USD, dec!(150.25));
        assert_eq!(balance.get(Currency::USD), dec!(150.25));
        assert_eq!(balance.krw, dec!(1000000));
    }

    #[test]
    fn test_trade_record_totals() {
        let trade = TradeRecord::new(
            Uuid::new_v4(),
            "005930",
            Market::KR,
            TradeAction::Buy,
            dec!(10),
            dec!(70000),
        );
        assert_eq!(trade.total_amount, dec!(700000));
        assert_eq!(trade.currency, Currency::KRW);
        assert_eq!(trade.cash_delta(), dec!(-700000));
    }

    #[test]
    fn test_trade_action_serde() {
        assert_eq!(serde_json::to_string(&TradeAction::Sell).unwrap(), "\"SELL\"");
        assert_eq!("buy".parse::<TradeAction>().unwrap(), TradeAction::Buy);
    }
}
