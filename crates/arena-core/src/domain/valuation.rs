//! 평단가 및 포트폴리오 평가 계산.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ledger::{CashBalance, Holding};
use super::market::Currency;

/// 추가 매수 후 가중평균 단가를 계산합니다.
///
/// `(old_shares × old_avg + new_shares × price) / (old_shares + new_shares)`
pub fn weighted_average_price(
    old_shares: Decimal,
    old_avg: Decimal,
    new_shares: Decimal,
    price: Decimal,
) -> Decimal {
    let total = old_shares + new_shares;
    if total <= Decimal::ZERO {
        return price;
    }
    (old_shares * old_avg + new_shares * price) / total
}

/// 보유 종목의 KRW 환산 평가금액을 계산합니다.
pub fn holding_value_krw(holding: &Holding, price: Decimal, exchange_rate: Decimal) -> Decimal {
    let value = holding.shares * price;
    match holding.market.currency() {
        Currency::KRW => value,
        Currency::USD => value * exchange_rate,
    }
}

/// 포트폴리오 평가 결과 (모두 KRW 환산).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValuation {
    pub krw_cash: Decimal,
    pub usd_cash: Decimal,
    pub holdings_value: Decimal,
    pub exchange_rate: Decimal,
    pub total_value: Decimal,
}

impl PortfolioValuation {
    /// 잔고와 (보유 종목, 현재가) 목록으로 총 평가금액을 계산합니다.
    ///
    /// 총액 = KRW 현금 + USD 현금 × 환율 + Σ 보유 평가금액 (USD 종목은 환율 적용)
    pub fn compute<'a, I>(balance: &CashBalance, holdings: I, exchange_rate: Decimal) -> Self
    where
        I: IntoIterator<Item = (&'a Holding, Decimal)>,
    {
        let holdings_value: Decimal = holdings
            .into_iter()
            .map(|(holding, price)| holding_value_krw(holding, price, exchange_rate))
            .sum();

        let total_value = balance.krw + balance.usd * exchange_rate + holdings_value;

        Self {
            krw_cash: balance.krw,
            usd_cash: balance.usd,
            holdings_value,
            exchange_rate,
            total_value,
        }
    }
}
