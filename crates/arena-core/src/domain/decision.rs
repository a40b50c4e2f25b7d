//! AI 매매 결정.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ledger::TradeAction;
use super::market::Currency;

/// 결정 행동.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionAction {
    Buy,
    Sell,
    Hold,
}

impl DecisionAction {
    /// 대소문자 구분 없이 파싱합니다. 허용되지 않는 값이면 `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(DecisionAction::Buy),
            "SELL" => Some(DecisionAction::Sell),
            "HOLD" => Some(DecisionAction::Hold),
            _ => None,
        }
    }

    /// 매매 행동으로 변환합니다. HOLD는 `None`.
    pub fn trade_action(&self) -> Option<TradeAction> {
        match self {
            DecisionAction::Buy => Some(TradeAction::Buy),
            DecisionAction::Sell => Some(TradeAction::Sell),
            DecisionAction::Hold => None,
        }
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecisionAction::Buy => "BUY",
            DecisionAction::Sell => "SELL",
            DecisionAction::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

/// 결정에 포함된 환전 지시.
///
/// `amount`가 없으면 허용 비율 한도까지 환전합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeInstruction {
    pub from: Currency,
    pub to: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
}

/// 결정이 만들어진 경로.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOrigin {
    /// 단일 프롬프트 응답을 파싱한 결정
    #[default]
    Prompt,
    /// 도구 호출 루프의 `make_decision`으로 확정된 결정
    Tool,
}

/// AI 모델의 구조화된 결정.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<Decimal>,
    pub reasoning: String,
    /// 0.0 ~ 1.0
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<ExchangeInstruction>,
    #[serde(default)]
    pub origin: DecisionOrigin,
}

impl Decision {
    /// 관망 결정을 생성합니다.
    pub fn hold(reasoning: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Hold,
            ticker: None,
            shares: None,
            reasoning: reasoning.into(),
            confidence: 0.5,
            exchange: None,
            origin: DecisionOrigin::Prompt,
        }
    }

    /// 매수 결정을 생성합니다.
    pub fn buy(ticker: impl Into<String>, shares: Decimal, reasoning: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Buy,
            ticker: Some(ticker.into()),
            shares: Some(shares),
            reasoning: reasoning.into(),
            confidence: 0.5,
            exchange: None,
            origin: DecisionOrigin::Prompt,
        }
    }

    /// 매도 결정을 생성합니다.
    pub fn sell(ticker: impl Into<String>, shares: Decimal, reasoning: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Sell,
            ..Self::buy(ticker, shares, reasoning)
        }
    }

    /// 신뢰도를 설정합니다 (0..=1로 제한).
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// 환전 지시를 설정합니다.
    pub fn with_exchange(mut self, exchange: ExchangeInstruction) -> Self {
        self.exchange = Some(exchange);
        self
    }

    pub fn with_origin(mut self, origin: DecisionOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// 매수/매도 결정이 실행 가능한 형태인지 확인합니다.
    ///
    /// 종목 코드가 비어 있지 않고 수량이 양수여야 합니다. HOLD는 항상 유효합니다.
    pub fn is_actionable(&self) -> bool {
        match self.action {
            DecisionAction::Hold => true,
            DecisionAction::Buy | DecisionAction::Sell => {
                let has_ticker = self
                    .ticker
                    .as_deref()
                    .is_some_and(|t| !t.trim().is_empty());
                let has_shares = self.shares.is_some_and(|s| s > Decimal::ZERO);
                has_ticker && has_shares
            }
        }
    }
}
