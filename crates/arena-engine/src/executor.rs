//! 매매 결정 실행.
//!
//! 제공 기능:
//! - 결정에 포함된 환전 지시 처리 (허용 비율 한도)
//! - 통화를 고려한 매수 (미국 시장 USD 부족 시 1회 자동 환전)
//! - 매도 (전량 매도 시 보유 종목 삭제)
//! - 거래 기록 추가
//!
//! 장부 쓰기는 여러 번에 나눠 순차적으로 수행되며 하나의 트랜잭션으로 묶이지 않습니다.

use std::sync::Arc;

use arena_core::{
    weighted_average_price, AiModel, CashBalance, Currency, Decision, DecisionOrigin,
    ExchangeInstruction, ExchangeRecord, Holding, Market, QuoteOrigin, TradeAction, TradeRecord,
    TradingConfig,
};
use arena_data::MarketData;
use arena_ledger::{Ledger, LedgerResult};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 비즈니스 규칙에 의해 결정이 거부된 사유.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TradeRejection {
    #[error("HOLD 결정은 체결 대상이 아닙니다")]
    NotATrade,

    #[error("종목 또는 수량이 없는 결정")]
    IncompleteDecision,

    #[error("{ticker} 시세를 사용할 수 없습니다 (가격 {price}, 모의 시세: {mock})")]
    QuoteUnavailable {
        ticker: String,
        price: Decimal,
        mock: bool,
    },

    #[error("{currency} 잔고 부족: 필요 {required}, 보유 {available}")]
    InsufficientFunds {
        currency: Currency,
        required: Decimal,
        available: Decimal,
    },

    #[error("{ticker} 보유 수량 부족: 보유 {held}, 요청 {requested}")]
    InsufficientShares {
        ticker: String,
        held: Decimal,
        requested: Decimal,
    },

    #[error("{ticker} 거래 금액이 표현 범위를 벗어납니다 (수량 {shares}, 가격 {price})")]
    AmountOverflow {
        ticker: String,
        shares: Decimal,
        price: Decimal,
    },

    /// 장부 읽기/쓰기 실패. 읽기 실패 시에는 아무것도 쓰지 않습니다.
    #[error("장부 기록 실패: {0}")]
    Persistence(&'static str),
}

impl TradeRejection {
    /// 장부 쓰기 실패 여부 (비즈니스 규칙 거부와 구분).
    pub fn is_persistence(&self) -> bool {
        matches!(self, TradeRejection::Persistence(_))
    }
}

/// 체결 결과.
#[derive(Debug, Clone)]
pub struct ExecutedTrade {
    pub trade: TradeRecord,
    /// 매수 전에 수행한 자동 환전
    pub auto_exchange: Option<ExchangeRecord>,
    pub balance_after: CashBalance,
    /// 체결 후 보유 종목 (전량 매도 시 `None`)
    pub holding_after: Option<Holding>,
}

/// 매매 실행기.
#[derive(Clone)]
pub struct TradeExecutor {
    ledger: Ledger,
    market_data: Arc<dyn MarketData>,
    config: TradingConfig,
}

impl TradeExecutor {
    pub fn new(ledger: Ledger, market_data: Arc<dyn MarketData>, config: TradingConfig) -> Self {
        Self {
            ledger,
            market_data,
            config,
        }
    }

    /// 결정 경로에 맞는 환전 허용 비율.
    pub fn exchange_fraction(&self, decision: &Decision) -> Decimal {
        match decision.origin {
            DecisionOrigin::Prompt => self.config.decision_exchange_fraction,
            DecisionOrigin::Tool => self.config.tool_exchange_fraction,
        }
    }

    /// 환전 지시를 처리합니다.
    ///
    /// `min(요청 금액, fraction × 원천 통화 잔고)`만큼 환전합니다. 환전할 금액이 없으면
    /// `Ok(None)`.
    pub async fn apply_exchange(
        &self,
        model_id: Uuid,
        instruction: &ExchangeInstruction,
        fraction: Decimal,
    ) -> Result<Option<ExchangeRecord>, TradeRejection> {
        if instruction.from == instruction.to {
            return Ok(None);
        }

        let mut balance = read(self.ledger.try_balance(model_id).await)?;
        let source = balance.get(instruction.from);
        let cap = (source * fraction.clamp(Decimal::ZERO, Decimal::ONE)).max(Decimal::ZERO);
        let amount = instruction
            .amount
            .map(|requested| requested.min(cap))
            .unwrap_or(cap);
        let amount = round_currency(amount, instruction.from);
        if amount <= Decimal::ZERO {
            debug!(%model_id, "Nothing to exchange");
            return Ok(None);
        }

        let rate = self.market_data.exchange_rate().await;
        let converted = convert(amount, instruction.from, instruction.to, rate);
        if converted <= Decimal::ZERO {
            return Ok(None);
        }

        balance.set(instruction.from, source - amount);
        balance.set(instruction.to, balance.get(instruction.to) + converted);
        let record = ExchangeRecord::new(
            model_id,
            instruction.from,
            instruction.to,
            amount,
            converted,
            rate,
        );
        self.persist_exchange(&balance, &record).await?;

        info!(
            %model_id,
            from = %instruction.from,
            to = %instruction.to,
            %amount,
            %converted,
            %rate,
            "Currency exchanged"
        );
        Ok(Some(record))
    }

    async fn persist_exchange(
        &self,
        balance: &CashBalance,
        record: &ExchangeRecord,
    ) -> Result<(), TradeRejection> {
        if !self.ledger.save_balance(balance).await {
            return Err(TradeRejection::Persistence("balance"));
        }
        if !self.ledger.record_exchange(record).await {
            // 잔고는 이미 반영됨. 기록만 누락된 상태로 남습니다.
            warn!(model_id = %record.model_id, "Exchange applied but record not persisted");
        }
        Ok(())
    }

    /// 매수/매도 결정을 실행합니다.
    pub async fn execute(
        &self,
        model: &AiModel,
        market: Market,
        decision: &Decision,
    ) -> Result<ExecutedTrade, TradeRejection> {
        let action = decision
            .action
            .trade_action()
            .ok_or(TradeRejection::NotATrade)?;
        let (Some(ticker), Some(shares)) = (decision.ticker.as_deref(), decision.shares) else {
            return Err(TradeRejection::IncompleteDecision);
        };
        let ticker = ticker.trim();
        if ticker.is_empty() || shares <= Decimal::ZERO {
            return Err(TradeRejection::IncompleteDecision);
        }

        let quote = self.market_data.quote(ticker, market).await;
        if !quote.is_tradable() {
            return Err(TradeRejection::QuoteUnavailable {
                ticker: ticker.to_string(),
                price: quote.price,
                mock: quote.origin == QuoteOrigin::Mock,
            });
        }
        let price = quote.price;
        if shares.checked_mul(price).is_none() {
            return Err(TradeRejection::AmountOverflow {
                ticker: ticker.to_string(),
                shares,
                price,
            });
        }

        let mut trade = TradeRecord::new(model.id, ticker, market, action, shares, price);
        if !decision.reasoning.is_empty() {
            trade = trade.with_reasoning(decision.reasoning.clone());
        }

        let result = match action {
            TradeAction::Buy => {
                self.execute_buy(model.id, market, trade, quote.name.as_deref())
                    .await?
            }
            TradeAction::Sell => self.execute_sell(model.id, market, trade).await?,
        };

        info!(
            model = %model.name,
            %market,
            ticker,
            action = action.as_str(),
            %shares,
            %price,
            "Trade executed"
        );
        Ok(result)
    }

    async fn execute_buy(
        &self,
        model_id: Uuid,
        market: Market,
        trade: TradeRecord,
        name: Option<&str>,
    ) -> Result<ExecutedTrade, TradeRejection> {
        let currency = market.currency();
        let cost = trade.total_amount;
        let mut balance = read(self.ledger.try_balance(model_id).await)?;
        let mut auto_exchange = None;

        if balance.get(currency) < cost {
            if market != Market::US {
                return Err(TradeRejection::InsufficientFunds {
                    currency,
                    required: cost,
                    available: balance.get(currency),
                });
            }
            let (updated, record) = self.auto_exchange(balance, cost).await?;
            balance = updated;
            auto_exchange = Some(record);
        }

        let available = balance.get(currency);
        if available < cost {
            return Err(TradeRejection::InsufficientFunds {
                currency,
                required: cost,
                available,
            });
        }

        let existing = read(self.ledger.try_holding(model_id, &trade.ticker, market).await)?;
        let holding = match existing {
            Some(mut existing) => {
                existing.avg_price = weighted_average_price(
                    existing.shares,
                    existing.avg_price,
                    trade.shares,
                    trade.price,
                );
                existing.shares += trade.shares;
                existing.updated_at = trade.created_at;
                if existing.name.is_none() {
                    existing.name = name.map(str::to_string);
                }
                existing
            }
            None => {
                let opened =
                    Holding::open(model_id, trade.ticker.clone(), market, trade.shares, trade.price);
                match name {
                    Some(n) => opened.with_name(n),
                    None => opened,
                }
            }
        };
        balance.set(currency, available - cost);

        if !self.ledger.save_holding(&holding).await {
            return Err(TradeRejection::Persistence("holding"));
        }
        if !self.ledger.save_balance(&balance).await {
            return Err(TradeRejection::Persistence("balance"));
        }
        if !self.ledger.record_trade(&trade).await {
            return Err(TradeRejection::Persistence("trade"));
        }

        Ok(ExecutedTrade {
            trade,
            auto_exchange,
            balance_after: balance,
            holding_after: Some(holding),
        })
    }

    /// 미국 시장 매수 시 부족한 USD를 KRW에서 1회 환전합니다.
    ///
    /// 환전 금액은 `부족분 × 환율 × 버퍼`이며 KRW가 모자라면 거부합니다.
    async fn auto_exchange(
        &self,
        mut balance: CashBalance,
        cost: Decimal,
    ) -> Result<(CashBalance, ExchangeRecord), TradeRejection> {
        let rate = self.market_data.exchange_rate().await;
        let shortfall = cost - balance.usd;
        let krw_needed = shortfall
            .checked_mul(rate)
            .and_then(|v| v.checked_mul(self.config.auto_exchange_buffer))
            .map(|v| v.ceil())
            .ok_or(TradeRejection::InsufficientFunds {
                currency: Currency::KRW,
                required: Decimal::MAX,
                available: balance.krw,
            })?;

        if balance.krw < krw_needed {
            return Err(TradeRejection::InsufficientFunds {
                currency: Currency::KRW,
                required: krw_needed,
                available: balance.krw,
            });
        }

        let usd_gained = convert(krw_needed, Currency::KRW, Currency::USD, rate);
        balance.krw -= krw_needed;
        balance.usd += usd_gained;

        let record = ExchangeRecord::new(
            balance.model_id,
            Currency::KRW,
            Currency::USD,
            krw_needed,
            usd_gained,
            rate,
        );
        self.persist_exchange(&balance, &record).await?;

        info!(
            model_id = %balance.model_id,
            %shortfall,
            %krw_needed,
            %usd_gained,
            "Auto-exchanged KRW to USD for US buy"
        );
        Ok((balance, record))
    }

    async fn execute_sell(
        &self,
        model_id: Uuid,
        market: Market,
        trade: TradeRecord,
    ) -> Result<ExecutedTrade, TradeRejection> {
        let currency = market.currency();
        let holding = read(self.ledger.try_holding(model_id, &trade.ticker, market).await)?;
        let held = holding.as_ref().map(|h| h.shares).unwrap_or(Decimal::ZERO);
        let Some(mut holding) = holding.filter(|_| held >= trade.shares) else {
            return Err(TradeRejection::InsufficientShares {
                ticker: trade.ticker.clone(),
                held,
                requested: trade.shares,
            });
        };

        let mut balance = read(self.ledger.try_balance(model_id).await)?;
        balance.set(currency, balance.get(currency) + trade.total_amount);

        let holding_after = if held == trade.shares {
            if !self.ledger.remove_holding(holding.id).await {
                return Err(TradeRejection::Persistence("holding"));
            }
            None
        } else {
            // 평균 단가는 유지됩니다
            holding.shares -= trade.shares;
            holding.updated_at = trade.created_at;
            if !self.ledger.save_holding(&holding).await {
                return Err(TradeRejection::Persistence("holding"));
            }
            Some(holding)
        };

        if !self.ledger.save_balance(&balance).await {
            return Err(TradeRejection::Persistence("balance"));
        }
        if !self.ledger.record_trade(&trade).await {
            return Err(TradeRejection::Persistence("trade"));
        }

        Ok(ExecutedTrade {
            trade,
            auto_exchange: None,
            balance_after: balance,
            holding_after,
        })
    }
}

/// 장부 읽기 실패를 거부 사유로 바꿉니다. 로그는 `Ledger`가 남깁니다.
fn read<T>(result: LedgerResult<T>) -> Result<T, TradeRejection> {
    result.map_err(|_| TradeRejection::Persistence("read"))
}

/// 통화별 최소 단위로 내림합니다 (KRW 1원, USD 1센트).
fn round_currency(amount: Decimal, currency: Currency) -> Decimal {
    let dp = match currency {
        Currency::KRW => 0,
        Currency::USD => 2,
    };
    amount.round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::ToZero)
}

/// 환율로 금액을 변환합니다. 결과는 대상 통화 단위로 내림합니다.
fn convert(amount: Decimal, from: Currency, to: Currency, rate: Decimal) -> Decimal {
    if rate <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let raw = match (from, to) {
        (Currency::KRW, Currency::USD) => amount / rate,
        (Currency::USD, Currency::KRW) => amount * rate,
        _ => amount,
    };
    round_currency(raw, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{ProviderKind, Quote, TickerInfo};
    use arena_ledger::{MemoryLedgerStore, RetryPolicy};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    /// 고정 가격을 돌려주는 시세 소스.
    struct FixedPrices {
        prices: HashMap<String, Decimal>,
        rate: Decimal,
    }

    impl FixedPrices {
        fn new(prices: &[(&str, Decimal)]) -> Arc<Self> {
            Arc::new(Self {
                prices: prices.iter().map(|(t, p)| (t.to_string(), *p)).collect(),
                rate: dec!(1400),
            })
        }
    }

    #[async_trait]
    impl MarketData for FixedPrices {
        async fn quote(&self, ticker: &str, market: Market) -> Quote {
            match self.prices.get(ticker) {
                Some(price) => Quote::new(ticker, market, *price),
                None => Quote::new(ticker, market, dec!(12345)).with_origin(QuoteOrigin::Mock),
            }
        }

        async fn quotes(&self, tickers: &[String], market: Market) -> HashMap<String, Quote> {
            let mut out = HashMap::new();
            for t in tickers {
                out.insert(t.clone(), self.quote(t, market).await);
            }
            out
        }

        async fn exchange_rate(&self) -> Decimal {
            self.rate
        }

        async fn top_tickers(&self, _market: Market) -> Vec<TickerInfo> {
            Vec::new()
        }
    }

    async fn setup(
        krw: Decimal,
        usd: Decimal,
        prices: &[(&str, Decimal)],
    ) -> (TradeExecutor, Arc<MemoryLedgerStore>, AiModel, Ledger) {
        let store = Arc::new(MemoryLedgerStore::new());
        let model = AiModel::new("GPT-4o", ProviderKind::OpenAi, krw);
        store.seed_model(model.clone(), krw, usd).await;
        let ledger = Ledger::new(store.clone(), RetryPolicy::no_retry());
        let executor = TradeExecutor::new(ledger.clone(), FixedPrices::new(prices), TradingConfig::default());
        (executor, store, model, ledger)
    }

    #[tokio::test]
    async fn test_kr_buy_end_to_end() {
        let (executor, _store, model, ledger) =
            setup(dec!(1000000), dec!(0), &[("005930", dec!(70000))]).await;

        let decision = Decision::buy("005930", dec!(10), "반도체 회복");
        let executed = executor.execute(&model, Market::KR, &decision).await.unwrap();
        assert!(executed.auto_exchange.is_none());

        let holding = ledger.holding(model.id, "005930", Market::KR).await.unwrap();
        assert_eq!(holding.shares, dec!(10));
        assert_eq!(holding.avg_price, dec!(70000));
        assert_eq!(ledger.balance(model.id).await.krw, dec!(300000));

        let trades = ledger.trades(model.id, None).await;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].total_amount, dec!(700000));
        assert_eq!(trades[0].reasoning.as_deref(), Some("반도체 회복"));
    }

    #[tokio::test]
    async fn test_second_buy_updates_average() {
        let (executor, _store, model, ledger) =
            setup(dec!(10000000), dec!(0), &[("005930", dec!(70000))]).await;
        executor
            .execute(&model, Market::KR, &Decision::buy("005930", dec!(10), ""))
            .await
            .unwrap();

        let executor = TradeExecutor::new(
            ledger.clone(),
            FixedPrices::new(&[("005930", dec!(76000))]),
            TradingConfig::default(),
        );
        executor
            .execute(&model, Market::KR, &Decision::buy("005930", dec!(5), ""))
            .await
            .unwrap();

        let holding = ledger.holding(model.id, "005930", Market::KR).await.unwrap();
        assert_eq!(holding.shares, dec!(15));
        assert_eq!(holding.avg_price, dec!(72000));
    }

    #[tokio::test]
    async fn test_kr_buy_insufficient_funds() {
        let (executor, _store, model, ledger) =
            setup(dec!(100000), dec!(0), &[("005930", dec!(70000))]).await;
        let err = executor
            .execute(&model, Market::KR, &Decision::buy("005930", dec!(2), ""))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeRejection::InsufficientFunds { currency: Currency::KRW, .. }));
        assert!(ledger.trades(model.id, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_us_buy_auto_exchanges_once() {
        let (executor, store, model, ledger) =
            setup(dec!(1000000), dec!(10), &[("AAPL", dec!(200))]).await;

        let executed = executor
            .execute(&model, Market::US, &Decision::buy("AAPL", dec!(2), ""))
            .await
            .unwrap();

        // 부족분 390 USD × 1400 × 1.01 = 551,460 KRW
        let exchange = executed.auto_exchange.unwrap();
        assert_eq!(exchange.from_amount, dec!(551460));
        assert_eq!(store.exchanges().await.len(), 1);

        let balance = ledger.balance(model.id).await;
        assert_eq!(balance.krw, dec!(448540));
        assert!(balance.usd >= Decimal::ZERO);
        assert_eq!(balance.usd, dec!(10) + dec!(393.90) - dec!(400));
    }

    #[tokio::test]
    async fn test_us_buy_rejected_when_krw_short() {
        let (executor, store, model, _ledger) =
            setup(dec!(100000), dec!(0), &[("AAPL", dec!(200))]).await;
        let err = executor
            .execute(&model, Market::US, &Decision::buy("AAPL", dec!(1), ""))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeRejection::InsufficientFunds { currency: Currency::KRW, .. }));
        assert!(store.exchanges().await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_quote_rejected() {
        let (executor, _store, model, _ledger) = setup(dec!(1000000), dec!(0), &[]).await;
        let err = executor
            .execute(&model, Market::KR, &Decision::buy("999999", dec!(1), ""))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeRejection::QuoteUnavailable { mock: true, .. }));
    }

    #[tokio::test]
    async fn test_sell_partial_and_full() {
        let (executor, _store, model, ledger) =
            setup(dec!(1000000), dec!(0), &[("005930", dec!(70000))]).await;
        executor
            .execute(&model, Market::KR, &Decision::buy("005930", dec!(10), ""))
            .await
            .unwrap();

        let partial = executor
            .execute(&model, Market::KR, &Decision::sell("005930", dec!(4), ""))
            .await
            .unwrap();
        let holding = partial.holding_after.unwrap();
        assert_eq!(holding.shares, dec!(6));
        assert_eq!(holding.avg_price, dec!(70000));

        let full = executor
            .execute(&model, Market::KR, &Decision::sell("005930", dec!(6), ""))
            .await
            .unwrap();
        assert!(full.holding_after.is_none());
        assert!(ledger.holding(model.id, "005930", Market::KR).await.is_none());
        assert_eq!(ledger.balance(model.id).await.krw, dec!(1000000));
        assert_eq!(ledger.trades(model.id, None).await.len(), 3);
    }

    #[tokio::test]
    async fn test_sell_more_than_held() {
        let (executor, _store, model, _ledger) =
            setup(dec!(1000000), dec!(0), &[("005930", dec!(70000))]).await;
        let err = executor
            .execute(&model, Market::KR, &Decision::sell("005930", dec!(1), ""))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeRejection::InsufficientShares { .. }));
    }

    #[tokio::test]
    async fn test_sell_with_failed_balance_read_writes_nothing() {
        let (executor, store, model, ledger) =
            setup(dec!(1000000), dec!(0), &[("005930", dec!(70000))]).await;
        executor
            .execute(&model, Market::KR, &Decision::buy("005930", dec!(10), ""))
            .await
            .unwrap();

        store.fail_operation("get_balance");
        let err = executor
            .execute(&model, Market::KR, &Decision::sell("005930", dec!(1), ""))
            .await
            .unwrap_err();
        assert_eq!(err, TradeRejection::Persistence("read"));
        assert!(err.is_persistence());

        store.clear_failures();
        assert_eq!(ledger.balance(model.id).await.krw, dec!(300000));
        let holding = ledger.holding(model.id, "005930", Market::KR).await.unwrap();
        assert_eq!(holding.shares, dec!(10));
        assert_eq!(ledger.trades(model.id, None).await.len(), 1);
    }

    #[tokio::test]
    async fn test_buy_with_failed_holding_read_writes_nothing() {
        let (executor, store, model, ledger) =
            setup(dec!(1000000), dec!(0), &[("005930", dec!(70000))]).await;
        executor
            .execute(&model, Market::KR, &Decision::buy("005930", dec!(10), ""))
            .await
            .unwrap();

        store.fail_operation("get_holding");
        let err = executor
            .execute(&model, Market::KR, &Decision::buy("005930", dec!(2), ""))
            .await
            .unwrap_err();
        assert_eq!(err, TradeRejection::Persistence("read"));

        store.clear_failures();
        let holding = ledger.holding(model.id, "005930", Market::KR).await.unwrap();
        assert_eq!(holding.shares, dec!(10));
        assert_eq!(holding.avg_price, dec!(70000));
        assert_eq!(ledger.balance(model.id).await.krw, dec!(300000));
    }

    #[tokio::test]
    async fn test_oversized_share_count_rejected() {
        let (executor, _store, model, ledger) =
            setup(dec!(1000000), dec!(0), &[("005930", dec!(70000))]).await;
        let err = executor
            .execute(&model, Market::KR, &Decision::buy("005930", Decimal::MAX, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, TradeRejection::AmountOverflow { .. }));
        assert!(!err.is_persistence());
        assert!(ledger.trades(model.id, None).await.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_with_failed_balance_read() {
        let (executor, store, model, _ledger) = setup(dec!(1000000), dec!(0), &[]).await;
        store.fail_operation("get_balance");
        let instruction = ExchangeInstruction {
            from: Currency::KRW,
            to: Currency::USD,
            amount: None,
        };
        let err = executor
            .apply_exchange(model.id, &instruction, dec!(0.8))
            .await
            .unwrap_err();
        assert_eq!(err, TradeRejection::Persistence("read"));
        assert!(store.exchanges().await.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_capped_by_fraction() {
        let (executor, store, model, ledger) = setup(dec!(1000000), dec!(0), &[]).await;
        let instruction = ExchangeInstruction {
            from: Currency::KRW,
            to: Currency::USD,
            amount: Some(dec!(5000000)),
        };
        let record = executor
            .apply_exchange(model.id, &instruction, dec!(0.8))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.from_amount, dec!(800000));
        assert_eq!(record.to_amount, dec!(571.42));

        let balance = ledger.balance(model.id).await;
        assert_eq!(balance.krw, dec!(200000));
        assert_eq!(balance.usd, dec!(571.42));
        assert_eq!(store.exchanges().await.len(), 1);
    }

    #[tokio::test]
    async fn test_exchange_nothing_to_convert() {
        let (executor, _store, model, _ledger) = setup(dec!(0), dec!(0), &[]).await;
        let instruction = ExchangeInstruction {
            from: Currency::USD,
            to: Currency::KRW,
            amount: None,
        };
        assert!(executor
            .apply_exchange(model.id, &instruction, dec!(0.5))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_fraction_by_origin() {
        let (executor, _store, _model, _ledger) = setup(dec!(0), dec!(0), &[]).await;
        let prompt = Decision::hold("x");
        let tool = Decision::hold("x").with_origin(DecisionOrigin::Tool);
        assert_eq!(executor.exchange_fraction(&prompt), dec!(0.8));
        assert_eq!(executor.exchange_fraction(&tool), dec!(0.5));
    }
}
