//! 포트폴리오 평가 작업.
//!
//! 모델마다 보유 종목 시세를 시장별로 한 번에 조회해 총 평가금액(KRW)을 계산하고
//! 히스토리 포인트를 하나씩 추가합니다.

use std::collections::HashMap;
use std::sync::Arc;

use arena_core::{AiModel, Holding, Market, PortfolioHistoryPoint, PortfolioValuation};
use arena_data::MarketData;
use arena_ledger::{Ledger, LedgerResult};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

/// 평가 작업 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValuationReport {
    /// 기록에 성공한 모델 수
    pub recorded: usize,
    /// 평가 대상 모델 수
    pub total: usize,
}

impl ValuationReport {
    /// 대상이 있는데 하나도 기록하지 못한 경우.
    pub fn is_failure(&self) -> bool {
        self.recorded == 0 && self.total > 0
    }
}

/// 포트폴리오 평가기.
#[derive(Clone)]
pub struct PortfolioValuator {
    ledger: Ledger,
    market_data: Arc<dyn MarketData>,
}

impl PortfolioValuator {
    pub fn new(ledger: Ledger, market_data: Arc<dyn MarketData>) -> Self {
        Self {
            ledger,
            market_data,
        }
    }

    /// 모델 하나의 현재 평가금액을 계산합니다.
    ///
    /// 실시간 시세가 없는 종목은 평균 단가로 평가합니다. 잔고나 보유 종목을 읽지
    /// 못하면 에러를 돌려줍니다.
    pub async fn value_model(
        &self,
        model: &AiModel,
        exchange_rate: Decimal,
    ) -> LedgerResult<PortfolioValuation> {
        let balance = self.ledger.try_balance(model.id).await?;
        let holdings = self.ledger.try_holdings(model.id, None).await?;
        let prices = self.current_prices(&holdings).await;

        Ok(PortfolioValuation::compute(
            &balance,
            holdings.iter().map(|h| {
                let price = prices
                    .get(&(h.market, h.ticker.clone()))
                    .copied()
                    .unwrap_or(h.avg_price);
                (h, price)
            }),
            exchange_rate,
        ))
    }

    /// 시장별로 한 번씩 시세를 조회합니다.
    async fn current_prices(&self, holdings: &[Holding]) -> HashMap<(Market, String), Decimal> {
        let mut by_market: HashMap<Market, Vec<String>> = HashMap::new();
        for holding in holdings {
            by_market
                .entry(holding.market)
                .or_default()
                .push(holding.ticker.clone());
        }

        let mut prices = HashMap::new();
        for (market, tickers) in by_market {
            let quotes = self.market_data.quotes(&tickers, market).await;
            for (ticker, quote) in quotes {
                if quote.is_tradable() {
                    prices.insert((market, ticker), quote.price);
                } else {
                    debug!(%ticker, %market, "No live quote, valuing at average price");
                }
            }
        }
        prices
    }

    /// 모든 활성 모델의 평가금액을 히스토리에 기록합니다.
    pub async fn record_portfolio_values(&self) -> ValuationReport {
        let models = self.ledger.active_models().await;
        let exchange_rate = self.market_data.exchange_rate().await;
        let mut report = ValuationReport {
            recorded: 0,
            total: models.len(),
        };

        for model in &models {
            let valuation = match self.value_model(model, exchange_rate).await {
                Ok(valuation) => valuation,
                Err(e) => {
                    warn!(model = %model.name, error = %e, "Failed to value portfolio, skipping");
                    continue;
                }
            };
            let point = PortfolioHistoryPoint::new(model.id, valuation.total_value).with_breakdown(
                valuation.krw_cash,
                valuation.usd_cash,
                valuation.holdings_value,
                valuation.exchange_rate,
            );

            if self.ledger.record_history(&point).await {
                report.recorded += 1;
            } else {
                warn!(model = %model.name, "Failed to record portfolio value, skipping");
            }
        }

        info!(
            recorded = report.recorded,
            total = report.total,
            %exchange_rate,
            "Portfolio values recorded"
        );
        report
    }
}
