//! 결정 요청 프롬프트.

use crate::provider::DecisionContext;
use arena_core::{Currency, Market};
use std::fmt::Write;

const OUTPUT_SCHEMA: &str = r#"{
  "action": "BUY" | "SELL" | "HOLD",
  "ticker": "종목 코드 (BUY/SELL일 때 필수)",
  "shares": 정수 주식 수 (BUY/SELL일 때 필수),
  "reasoning": "판단 근거",
  "confidence": 0.0 ~ 1.0,
  "exchange": {"from": "KRW" | "USD", "to": "USD" | "KRW", "amount": 숫자} (선택)
}"#;

/// 시스템 프롬프트.
pub fn system_prompt(market: Market, with_tools: bool) -> String {
    let mut prompt = format!(
        "당신은 모의 투자 대회에 참가한 주식 트레이더입니다. 현재 {} 시장이 열려 있습니다. \
         주어진 포트폴리오와 시세를 보고 이번 라운드에 한 번의 결정을 내리세요. \
         거래는 {} 통화로 체결되며 잔고가 부족하면 환전 지시를 함께 보낼 수 있습니다.",
        market_label(market),
        market.currency()
    );
    if with_tools {
        prompt.push_str(
            "\n\n도구를 사용해 종목을 검색하고 시세를 확인할 수 있습니다. \
             결정이 정해지면 반드시 make_decision 도구를 호출하세요.",
        );
    } else {
        prompt.push_str("\n\n다른 설명 없이 다음 형식의 JSON 객체 하나로만 답하세요:\n");
        prompt.push_str(OUTPUT_SCHEMA);
    }
    prompt
}

fn market_label(market: Market) -> &'static str {
    match market {
        Market::KR => "한국(KOSPI)",
        Market::US => "미국(NASDAQ/NYSE)",
    }
}

/// 포트폴리오 상황을 설명하는 사용자 프롬프트.
pub fn user_prompt(ctx: &DecisionContext) -> String {
    let mut out = String::new();
    let currency = ctx.market.currency();

    let _ = writeln!(out, "## 잔고");
    let _ = writeln!(out, "- KRW: {}", ctx.balance.get(Currency::KRW).round_dp(0));
    let _ = writeln!(out, "- USD: {}", ctx.balance.get(Currency::USD).round_dp(2));
    let _ = writeln!(out, "- 환율: 1 USD = {} KRW", ctx.exchange_rate);

    let _ = writeln!(out, "\n## 보유 종목 ({})", ctx.market);
    if ctx.holdings.is_empty() {
        let _ = writeln!(out, "- 없음");
    }
    for holding in &ctx.holdings {
        let current = ctx
            .candidates
            .iter()
            .find(|q| q.ticker == holding.ticker)
            .map(|q| format!(", 현재가 {} {currency}", q.price))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "- {}{}: {}주, 평균단가 {} {currency}{current}",
            holding.ticker,
            holding
                .name
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default(),
            holding.shares,
            holding.avg_price.round_dp(2),
        );
    }

    let _ = writeln!(out, "\n## 후보 종목 시세");
    if ctx.candidates.is_empty() {
        let _ = writeln!(out, "- 없음");
    }
    for quote in &ctx.candidates {
        let sign = if quote.change_pct.is_sign_negative() { "" } else { "+" };
        let _ = writeln!(
            out,
            "- {}{}: {} {currency} ({sign}{}%)",
            quote.ticker,
            quote
                .name
                .as_deref()
                .map(|n| format!(" {n}"))
                .unwrap_or_default(),
            quote.price,
            quote.change_pct.round_dp(2),
        );
    }

    let _ = write!(out, "\n이번 라운드의 결정을 내려주세요.");
    out
}
