//! 모델 응답에서 결정 JSON을 추출합니다.

use crate::error::{AiError, AiResult};
use arena_core::{Currency, Decision, DecisionAction, ExchangeInstruction};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

/// 결정 하나에 허용하는 최대 주식 수.
pub const MAX_DECISION_SHARES: i64 = 100_000_000;

/// 텍스트에서 첫 번째 균형 잡힌 `{...}` 객체를 찾습니다.
///
/// 문자열 리터럴 안의 중괄호와 이스케이프는 건너뜁니다.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 모델이 반환하는 결정 JSON 형태.
///
/// 필드 이름과 타입이 조금씩 달라도 받아들일 수 있도록 느슨하게 정의합니다.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDecision {
    pub action: String,
    #[serde(default, alias = "symbol", alias = "stock_code")]
    pub ticker: Option<String>,
    #[serde(default, alias = "quantity")]
    pub shares: Option<Value>,
    #[serde(default, alias = "reason")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub exchange: Option<RawExchange>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawExchange {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub amount: Option<Value>,
}

/// 숫자 또는 숫자 문자열을 Decimal로 변환합니다. `1e3` 같은 지수 표기도 받습니다.
fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            text.parse()
                .ok()
                .or_else(|| Decimal::from_scientific(&text).ok())
                .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain))
        }
        Value::String(s) => {
            let text = s.replace(',', "");
            let text = text.trim();
            text.parse().ok().or_else(|| Decimal::from_scientific(text).ok())
        }
        _ => None,
    }
}

impl RawDecision {
    /// 검증을 거쳐 도메인 결정으로 변환합니다.
    pub(crate) fn into_decision(self) -> AiResult<Decision> {
        let action = DecisionAction::parse(&self.action)
            .ok_or_else(|| AiError::Parse(format!("알 수 없는 action: {}", self.action)))?;

        let reasoning = self.reasoning.unwrap_or_default();
        let mut decision = match action {
            DecisionAction::Hold => Decision::hold(reasoning),
            DecisionAction::Buy | DecisionAction::Sell => {
                let ticker = self
                    .ticker
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| AiError::Parse(format!("{action} 결정에 ticker가 없습니다")))?;
                // 주식은 정수 단위로만 거래합니다
                let shares = self
                    .shares
                    .as_ref()
                    .and_then(value_to_decimal)
                    .map(|s| s.trunc())
                    .filter(|s| *s > Decimal::ZERO)
                    .ok_or_else(|| {
                        AiError::Parse(format!("{action} 결정의 shares가 양수가 아닙니다"))
                    })?;
                if shares > Decimal::from(MAX_DECISION_SHARES) {
                    return Err(AiError::Parse(format!(
                        "{action} 결정의 shares가 너무 큽니다: {shares}"
                    )));
                }
                if action == DecisionAction::Buy {
                    Decision::buy(ticker, shares, reasoning)
                } else {
                    Decision::sell(ticker, shares, reasoning)
                }
            }
        };

        if let Some(confidence) = self.confidence {
            decision = decision.with_confidence(confidence);
        }

        if let Some(exchange) = self.exchange {
            match (exchange.from.parse::<Currency>(), exchange.to.parse::<Currency>()) {
                (Ok(from), Ok(to)) if from != to => {
                    decision = decision.with_exchange(ExchangeInstruction {
                        from,
                        to,
                        amount: exchange
                            .amount
                            .as_ref()
                            .and_then(value_to_decimal)
                            .filter(|a| *a > Decimal::ZERO),
                    });
                }
                _ => {
                    tracing::debug!(from = %exchange.from, to = %exchange.to, "Ignoring invalid exchange instruction");
                }
            }
        }

        Ok(decision)
    }
}

/// 응답 텍스트를 결정으로 파싱합니다.
pub fn parse_decision(text: &str) -> AiResult<Decision> {
    let json = extract_json_object(text)
        .ok_or_else(|| AiError::Parse("응답에 JSON 객체가 없습니다".to_string()))?;
    let raw: RawDecision = serde_json::from_str(json)
        .map_err(|e| AiError::Parse(format!("Invalid JSON: {e}")))?;
    raw.into_decision()
}

/// 도구 호출 인자(JSON 값)를 결정으로 변환합니다.
pub(crate) fn decision_from_value(value: Value) -> AiResult<Decision> {
    let raw: RawDecision = serde_json::from_value(value)
        .map_err(|e| AiError::Parse(format!("Invalid make_decision arguments: {e}")))?;
    raw.into_decision()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_extract_with_surrounding_prose() {
        let text = "분석 결과입니다.\n```json\n{\"action\": \"HOLD\", \"reasoning\": \"wait {x}\"}\n```\n끝";
        assert_eq!(
            extract_json_object(text),
            Some("{\"action\": \"HOLD\", \"reasoning\": \"wait {x}\"}")
        );
    }

    #[test]
    fn test_extract_nested_and_escaped() {
        let text = r#"{"a": {"b": "quote \" and }"}, "c": 1} trailing {"d": 2}"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"a": {"b": "quote \" and }"}, "c": 1}"#)
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{ unterminated"), None);
    }

    #[test]
    fn test_parse_buy() {
        let decision = parse_decision(
            r#"I think {"action":"buy","ticker":"005930","shares":"10","reasoning":"cheap","confidence":0.8}"#,
        )
        .unwrap();
        assert_eq!(decision.action, DecisionAction::Buy);
        assert_eq!(decision.ticker.as_deref(), Some("005930"));
        assert_eq!(decision.shares, Some(dec!(10)));
        assert_eq!(decision.confidence, 0.8);
    }

    #[test]
    fn test_parse_fractional_shares_truncated() {
        let decision =
            parse_decision(r#"{"action":"SELL","symbol":"AAPL","quantity":2.7}"#).unwrap();
        assert_eq!(decision.shares, Some(dec!(2)));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(parse_decision(r#"{"action":"WAIT"}"#).is_err());
        assert!(parse_decision(r#"{"action":"BUY","shares":5}"#).is_err());
        assert!(parse_decision(r#"{"action":"BUY","ticker":"AAPL","shares":0}"#).is_err());
        assert!(parse_decision(r#"{"action":"SELL","ticker":"AAPL","shares":0.4}"#).is_err());
        assert!(parse_decision("HOLD").is_err());
    }

    #[test]
    fn test_parse_rejects_oversized_shares() {
        let err = parse_decision(
            r#"{"action":"BUY","ticker":"005930","shares":"79228162514264337593543950335"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, AiError::Parse(msg) if msg.contains("너무 큽니다")));

        let at_limit = parse_decision(&format!(
            r#"{{"action":"SELL","ticker":"AAPL","shares":{MAX_DECISION_SHARES}}}"#
        ))
        .unwrap();
        assert_eq!(at_limit.shares, Some(Decimal::from(MAX_DECISION_SHARES)));
    }

    #[test]
    fn test_parse_exponent_numbers() {
        let decision =
            parse_decision(r#"{"action":"BUY","ticker":"AAPL","shares":1e1}"#).unwrap();
        assert_eq!(decision.shares, Some(dec!(10)));

        let decision =
            parse_decision(r#"{"action":"BUY","ticker":"AAPL","shares":"2.5E2"}"#).unwrap();
        assert_eq!(decision.shares, Some(dec!(250)));

        assert_eq!(
            value_to_decimal(&serde_json::json!(1e20)),
            Some(dec!(100000000000000000000))
        );
    }

    #[test]
    fn test_parse_exchange_instruction() {
        let decision = parse_decision(
            r#"{"action":"HOLD","exchange":{"from":"krw","to":"USD","amount":500000}}"#,
        )
        .unwrap();
        let exchange = decision.exchange.unwrap();
        assert_eq!(exchange.from, Currency::KRW);
        assert_eq!(exchange.to, Currency::USD);
        assert_eq!(exchange.amount, Some(dec!(500000)));

        let same = parse_decision(r#"{"action":"HOLD","exchange":{"from":"KRW","to":"KRW"}}"#)
            .unwrap();
        assert!(same.exchange.is_none());
    }
}
