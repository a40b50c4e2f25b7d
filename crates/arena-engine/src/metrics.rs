//! 트레이딩 메트릭 헬퍼.
//!
//! 레코더는 바이너리에서 설치합니다. 설치 전에는 기록이 무시됩니다.

use arena_core::{Market, ProviderKind, TradeAction};
use metrics::counter;

/// 라운드 결과 카운터 증가.
pub fn record_round(market: Market, result: &'static str) {
    counter!("arena_rounds_total", "market" => market.as_str(), "result" => result).increment(1);
}

/// 체결 카운터 증가.
pub fn record_trade(market: Market, action: TradeAction) {
    counter!(
        "arena_trades_total",
        "market" => market.as_str(),
        "action" => action.as_str()
    )
    .increment(1);
}

/// 결정 결과 카운터 증가.
pub fn record_decision(provider: ProviderKind, outcome: &'static str) {
    counter!(
        "arena_decisions_total",
        "provider" => provider.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
