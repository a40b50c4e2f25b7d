//! 도구 호출 루프의 도구 정의와 실행기.

use crate::chat::{ToolCall, ToolSpec};
use crate::parse::decision_from_value;
use arena_core::{Decision, DecisionOrigin, Market};
use arena_data::MarketData;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const SEARCH_STOCKS: &str = "search_stocks";
pub const GET_STOCK_QUOTE: &str = "get_stock_quote";
pub const GET_TOP_STOCKS: &str = "get_top_stocks";
pub const MAKE_DECISION: &str = "make_decision";

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 30;

/// 모델에 노출하는 도구 목록.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: SEARCH_STOCKS,
            description: "종목 코드나 이름으로 현재 시장의 종목을 검색합니다.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "검색어" },
                    "limit": { "type": "integer", "description": "최대 결과 수" }
                },
                "required": ["query"]
            }),
        },
        ToolSpec {
            name: GET_STOCK_QUOTE,
            description: "종목의 현재가와 등락률을 조회합니다.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "ticker": { "type": "string", "description": "종목 코드" }
                },
                "required": ["ticker"]
            }),
        },
        ToolSpec {
            name: GET_TOP_STOCKS,
            description: "현재 시장의 시가총액 상위 종목을 조회합니다.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": { "type": "integer", "description": "최대 결과 수" }
                }
            }),
        },
        ToolSpec {
            name: MAKE_DECISION,
            description: "이번 라운드의 최종 결정을 제출합니다. 호출하면 대화가 끝납니다.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ["BUY", "SELL", "HOLD"] },
                    "ticker": { "type": "string" },
                    "shares": { "type": "integer" },
                    "reasoning": { "type": "string" },
                    "confidence": { "type": "number" },
                    "exchange": {
                        "type": "object",
                        "properties": {
                            "from": { "type": "string", "enum": ["KRW", "USD"] },
                            "to": { "type": "string", "enum": ["KRW", "USD"] },
                            "amount": { "type": "number" }
                        },
                        "required": ["from", "to"]
                    }
                },
                "required": ["action", "reasoning"]
            }),
        },
    ]
}

/// 도구 실행 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// 모델에게 돌려줄 결과
    Output(Value),
    /// `make_decision`으로 확정된 결정
    Decision(Decision),
}

/// 시세 데이터를 사용해 도구 호출을 실행합니다.
#[derive(Clone)]
pub struct ToolExecutor {
    market_data: Arc<dyn MarketData>,
    market: Market,
}

impl ToolExecutor {
    pub fn new(market_data: Arc<dyn MarketData>, market: Market) -> Self {
        Self {
            market_data,
            market,
        }
    }

    /// 도구 호출 하나를 실행합니다.
    ///
    /// 잘못된 인자는 에러 대신 `{"error": ...}` 결과로 모델에게 돌려줍니다.
    pub async fn execute(&self, call: &ToolCall) -> ToolOutcome {
        debug!(tool = %call.name, market = %self.market, "Executing tool call");
        match call.name.as_str() {
            SEARCH_STOCKS => {
                let Some(query) = call.arguments.get("query").and_then(Value::as_str) else {
                    return error_output("query가 필요합니다");
                };
                let results = self
                    .market_data
                    .search(query, self.market, limit_arg(&call.arguments))
                    .await;
                ToolOutcome::Output(json!(results))
            }
            GET_STOCK_QUOTE => {
                let Some(ticker) = call.arguments.get("ticker").and_then(Value::as_str) else {
                    return error_output("ticker가 필요합니다");
                };
                let quote = self.market_data.quote(ticker.trim(), self.market).await;
                ToolOutcome::Output(json!({
                    "ticker": quote.ticker,
                    "name": quote.name,
                    "price": quote.price,
                    "change_pct": quote.change_pct,
                    "currency": quote.currency,
                }))
            }
            GET_TOP_STOCKS => {
                let tickers: Vec<_> = self
                    .market_data
                    .top_tickers(self.market)
                    .await
                    .into_iter()
                    .take(limit_arg(&call.arguments))
                    .collect();
                ToolOutcome::Output(json!(tickers))
            }
            MAKE_DECISION => match decision_from_value(call.arguments.clone()) {
                Ok(decision) => ToolOutcome::Decision(decision.with_origin(DecisionOrigin::Tool)),
                Err(e) => {
                    warn!(error = %e, "Invalid make_decision call");
                    error_output(&e.to_string())
                }
            },
            other => error_output(&format!("알 수 없는 도구: {other}")),
        }
    }
}

fn limit_arg(arguments: &Value) -> usize {
    arguments
        .get("limit")
        .and_then(Value::as_u64)
        .map(|l| (l as usize).clamp(1, MAX_LIMIT))
        .unwrap_or(DEFAULT_LIMIT)
}

fn error_output(message: &str) -> ToolOutcome {
    ToolOutcome::Output(json!({ "error": message }))
}
