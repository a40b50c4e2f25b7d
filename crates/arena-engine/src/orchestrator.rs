//! 트레이딩 라운드 오케스트레이터.
//!
//! 한 라운드는 활성 모델을 하나씩 순서대로 처리합니다. 모델 사이에는 `RateGate`로
//! 최소 간격을 둡니다. 한 모델의 실패는 그 모델의 행동만 중단시키며 라운드는
//! 계속됩니다.

use std::collections::HashSet;
use std::sync::Arc;

use arena_ai::{DecisionContext, DecisionProvider};
use arena_core::{
    AiModel, Decision, DecisionAction, HoldRecord, Market, ProviderKind, Quote, TradingConfig,
};
use arena_data::MarketData;
use arena_ledger::Ledger;
use arena_notification::{ModelSummaryLine, Notification, NotificationEvent, NotificationManager};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::executor::{ExecutedTrade, TradeExecutor};
use crate::metrics;
use crate::rate_gate::RateGate;

/// 모델별 라운드 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// 매수/매도 체결
    Executed,
    /// 관망 기록
    Held,
    /// 결정 없음 또는 비즈니스 규칙 거부
    Skipped,
    /// 장부 기록 실패
    Failed,
}

impl ActionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionOutcome::Executed => "executed",
            ActionOutcome::Held => "held",
            ActionOutcome::Skipped => "skipped",
            ActionOutcome::Failed => "failed",
        }
    }
}

/// 한 모델의 라운드 처리 결과.
#[derive(Debug, Clone, Serialize)]
pub struct ModelAction {
    pub model_id: Uuid,
    pub model_name: String,
    pub provider: ProviderKind,
    pub outcome: ActionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<DecisionAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// 건너뜀/실패 사유
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ModelAction {
    fn new(model: &AiModel, outcome: ActionOutcome) -> Self {
        Self {
            model_id: model.id,
            model_name: model.name.clone(),
            provider: model.provider,
            outcome,
            action: None,
            ticker: None,
            shares: None,
            price: None,
            reasoning: None,
            message: None,
        }
    }

    fn with_decision(mut self, decision: &Decision) -> Self {
        self.action = Some(decision.action);
        self.ticker = decision.ticker.clone();
        self.shares = decision.shares;
        self.reasoning = Some(decision.reasoning.clone());
        self
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn summary_line(&self) -> ModelSummaryLine {
        let outcome = match (self.outcome, self.action) {
            (ActionOutcome::Executed, Some(action)) => action.to_string(),
            (ActionOutcome::Held, _) => "HOLD".to_string(),
            (ActionOutcome::Skipped, _) => "SKIP".to_string(),
            (ActionOutcome::Failed, _) => "FAILED".to_string(),
            (ActionOutcome::Executed, None) => "EXECUTED".to_string(),
        };
        let detail = match (self.outcome, &self.ticker, self.shares, self.price) {
            (ActionOutcome::Executed, Some(ticker), Some(shares), Some(price)) => {
                format!("{ticker} {shares}주 @ {price}")
            }
            _ => self.message.clone().unwrap_or_default(),
        };
        ModelSummaryLine::new(self.model_name.clone(), outcome, detail)
    }
}

/// 라운드 결과 보고.
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub market: Market,
    pub success: bool,
    pub trades_executed: usize,
    pub holds: usize,
    pub skipped: usize,
    pub failed: usize,
    pub models_processed: usize,
    pub actions: Vec<ModelAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RoundReport {
    fn empty(market: Market, started_at: DateTime<Utc>) -> Self {
        Self {
            market,
            success: false,
            trades_executed: 0,
            holds: 0,
            skipped: 0,
            failed: 0,
            models_processed: 0,
            actions: Vec::new(),
            error: None,
            started_at,
            finished_at: started_at,
        }
    }

    fn push(&mut self, action: ModelAction) {
        match action.outcome {
            ActionOutcome::Executed => self.trades_executed += 1,
            ActionOutcome::Held => self.holds += 1,
            ActionOutcome::Skipped => self.skipped += 1,
            ActionOutcome::Failed => self.failed += 1,
        }
        self.models_processed += 1;
        self.actions.push(action);
    }

    fn notification(&self) -> Notification {
        Notification::new(NotificationEvent::RoundCompleted {
            market: self.market,
            trades_executed: self.trades_executed,
            holds: self.holds,
            skipped: self.skipped,
            failed: self.failed,
            lines: self.actions.iter().map(ModelAction::summary_line).collect(),
        })
    }
}

/// 트레이딩 오케스트레이터.
pub struct TradingOrchestrator {
    ledger: Ledger,
    market_data: Arc<dyn MarketData>,
    decisions: Arc<dyn DecisionProvider>,
    executor: TradeExecutor,
    notifier: NotificationManager,
    gate: RateGate,
    config: TradingConfig,
}

impl TradingOrchestrator {
    pub fn new(
        ledger: Ledger,
        market_data: Arc<dyn MarketData>,
        decisions: Arc<dyn DecisionProvider>,
        notifier: NotificationManager,
        config: TradingConfig,
    ) -> Self {
        let executor = TradeExecutor::new(ledger.clone(), market_data.clone(), config.clone());
        Self {
            gate: RateGate::new(config.model_gap()),
            ledger,
            market_data,
            decisions,
            executor,
            notifier,
            config,
        }
    }

    /// 한 시장에 대해 트레이딩 라운드를 실행합니다.
    ///
    /// 에러를 반환하지 않습니다. 결과는 `RoundReport`에 담깁니다.
    pub async fn run_round(&self, market: Market) -> RoundReport {
        let started_at = Utc::now();
        let mut report = RoundReport::empty(market, started_at);

        let models = self.ledger.active_models().await;
        if models.is_empty() {
            warn!(%market, "No active models, skipping round");
            report.error = Some("활성 모델이 없습니다".to_string());
            metrics::record_round(market, "no_models");
            return report;
        }

        info!(%market, models = models.len(), "Trading round started");
        let candidates = self.candidates(market).await;
        let exchange_rate = self.market_data.exchange_rate().await;

        self.gate.reset().await;
        for model in &models {
            self.gate.wait().await;
            let action = self
                .process_model(model, market, &candidates, exchange_rate)
                .await;
            debug!(model = %model.name, outcome = action.outcome.as_str(), "Model processed");
            report.push(action);
        }

        report.success = report.failed < report.models_processed;
        if !report.success {
            report.error = Some("모든 모델 처리에 실패했습니다".to_string());
        }
        report.finished_at = Utc::now();

        metrics::record_round(market, if report.success { "success" } else { "failure" });
        info!(
            %market,
            trades = report.trades_executed,
            holds = report.holds,
            skipped = report.skipped,
            failed = report.failed,
            "Trading round finished"
        );

        self.notifier.notify_quietly(report.notification()).await;
        report
    }

    /// 프롬프트에 넣을 후보 종목 시세.
    async fn candidates(&self, market: Market) -> Vec<Quote> {
        let tickers: Vec<String> = self
            .market_data
            .top_tickers(market)
            .await
            .into_iter()
            .take(self.config.candidate_count)
            .map(|t| t.ticker)
            .collect();
        let mut quotes = self.market_data.quotes(&tickers, market).await;
        tickers
            .iter()
            .filter_map(|t| quotes.remove(t))
            .collect()
    }

    async fn process_model(
        &self,
        model: &AiModel,
        market: Market,
        candidates: &[Quote],
        exchange_rate: Decimal,
    ) -> ModelAction {
        let (holdings, balance) = match (
            self.ledger.try_holdings(model.id, Some(market)).await,
            self.ledger.try_balance(model.id).await,
        ) {
            (Ok(holdings), Ok(balance)) => (holdings, balance),
            _ => {
                warn!(model = %model.name, %market, "Ledger read failed, skipping model");
                return ModelAction::new(model, ActionOutcome::Failed).with_message("장부 조회 실패");
            }
        };

        // 후보에 없는 보유 종목 시세도 함께 전달합니다
        let known: HashSet<&str> = candidates.iter().map(|q| q.ticker.as_str()).collect();
        let missing: Vec<String> = holdings
            .iter()
            .filter(|h| !known.contains(h.ticker.as_str()))
            .map(|h| h.ticker.clone())
            .collect();
        let mut quotes = candidates.to_vec();
        if !missing.is_empty() {
            let mut extra = self.market_data.quotes(&missing, market).await;
            quotes.extend(missing.iter().filter_map(|t| extra.remove(t)));
        }

        let ctx = DecisionContext {
            model: model.clone(),
            market,
            holdings,
            balance,
            exchange_rate,
            candidates: quotes,
        };

        let Some(decision) = self.decisions.decide(&ctx).await else {
            metrics::record_decision(model.provider, "none");
            info!(model = %model.name, %market, "No decision, skipping model");
            return ModelAction::new(model, ActionOutcome::Skipped).with_message("결정 없음");
        };
        metrics::record_decision(model.provider, decision_outcome(&decision));
        if !decision.is_actionable() {
            return ModelAction::new(model, ActionOutcome::Skipped)
                .with_decision(&decision)
                .with_message("실행할 수 없는 결정");
        }

        if let Some(instruction) = &decision.exchange {
            let fraction = self.executor.exchange_fraction(&decision);
            if let Err(e) = self
                .executor
                .apply_exchange(model.id, instruction, fraction)
                .await
            {
                warn!(model = %model.name, error = %e, "Exchange instruction failed, continuing");
            }
        }

        match decision.action {
            DecisionAction::Hold => self.record_hold(model, market, &decision).await,
            DecisionAction::Buy | DecisionAction::Sell => {
                self.execute_trade(model, market, &decision).await
            }
        }
    }

    async fn record_hold(&self, model: &AiModel, market: Market, decision: &Decision) -> ModelAction {
        let record = HoldRecord::new(
            model.id,
            market,
            decision.reasoning.clone(),
            decision.confidence,
        );
        if self.ledger.record_hold(&record).await {
            ModelAction::new(model, ActionOutcome::Held).with_decision(decision)
        } else {
            ModelAction::new(model, ActionOutcome::Failed)
                .with_decision(decision)
                .with_message("관망 기록 실패")
        }
    }

    async fn execute_trade(
        &self,
        model: &AiModel,
        market: Market,
        decision: &Decision,
    ) -> ModelAction {
        match self.executor.execute(model, market, decision).await {
            Ok(ExecutedTrade { trade, .. }) => {
                metrics::record_trade(market, trade.action);
                self.notifier
                    .notify_quietly(Notification::new(NotificationEvent::TradeExecuted {
                        model: model.name.clone(),
                        ticker: trade.ticker.clone(),
                        market,
                        action: trade.action,
                        shares: trade.shares,
                        price: trade.price,
                        currency: trade.currency,
                    }))
                    .await;
                let mut action =
                    ModelAction::new(model, ActionOutcome::Executed).with_decision(decision);
                action.price = Some(trade.price);
                action
            }
            Err(rejection) => {
                warn!(
                    model = %model.name,
                    %market,
                    ticker = decision.ticker.as_deref().unwrap_or("-"),
                    reason = %rejection,
                    "Decision rejected"
                );
                let outcome = if rejection.is_persistence() {
                    ActionOutcome::Failed
                } else {
                    ActionOutcome::Skipped
                };
                ModelAction::new(model, outcome)
                    .with_decision(decision)
                    .with_message(rejection.to_string())
            }
        }
    }
}

/// `arena_decisions_total`의 outcome 라벨.
fn decision_outcome(decision: &Decision) -> &'static str {
    if decision.is_actionable() {
        "received"
    } else {
        "unactionable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::TickerInfo;
    use arena_ledger::{LedgerStore, MemoryLedgerStore, RetryPolicy};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedPrices;

    #[async_trait]
    impl MarketData for FixedPrices {
        async fn quote(&self, ticker: &str, market: Market) -> Quote {
            Quote::new(ticker, market, dec!(70000))
        }

        async fn quotes(&self, tickers: &[String], market: Market) -> HashMap<String, Quote> {
            tickers
                .iter()
                .map(|t| (t.clone(), Quote::new(t.as_str(), market, dec!(70000))))
                .collect()
        }

        async fn exchange_rate(&self) -> Decimal {
            dec!(1380)
        }

        async fn top_tickers(&self, market: Market) -> Vec<TickerInfo> {
            vec![TickerInfo::new("005930", "삼성전자", market)]
        }
    }

    /// 모델 이름별로 정해진 결정을 돌려줍니다.
    struct ScriptedDecisions {
        decisions: HashMap<String, Decision>,
        seen: Mutex<Vec<DecisionContext>>,
    }

    #[async_trait]
    impl DecisionProvider for ScriptedDecisions {
        async fn decide(&self, ctx: &DecisionContext) -> Option<Decision> {
            self.seen.lock().unwrap().push(ctx.clone());
            self.decisions.get(&ctx.model.name).cloned()
        }
    }

    fn config() -> TradingConfig {
        TradingConfig {
            model_gap_ms: 0,
            ..TradingConfig::default()
        }
    }

    async fn orchestrator(
        decisions: Vec<(&str, Decision)>,
    ) -> (TradingOrchestrator, Arc<MemoryLedgerStore>, Arc<ScriptedDecisions>) {
        let store = Arc::new(MemoryLedgerStore::new());
        for (name, _) in &decisions {
            let model = AiModel::new(*name, ProviderKind::OpenAi, dec!(1000000));
            store.seed_model(model, dec!(1000000), dec!(0)).await;
        }
        let scripted = Arc::new(ScriptedDecisions {
            decisions: decisions
                .into_iter()
                .map(|(n, d)| (n.to_string(), d))
                .collect(),
            seen: Mutex::new(Vec::new()),
        });
        let orchestrator = TradingOrchestrator::new(
            Ledger::new(store.clone(), RetryPolicy::no_retry()),
            Arc::new(FixedPrices),
            scripted.clone(),
            NotificationManager::new(),
            config(),
        );
        (orchestrator, store, scripted)
    }

    #[test]
    fn test_decision_outcome_label() {
        assert_eq!(decision_outcome(&Decision::buy("005930", dec!(1), "")), "received");
        assert_eq!(decision_outcome(&Decision::hold("wait")), "received");

        let mut incomplete = Decision::sell("005930", dec!(1), "");
        incomplete.ticker = None;
        assert_eq!(decision_outcome(&incomplete), "unactionable");
    }

    #[tokio::test]
    async fn test_zero_active_models() {
        let (orchestrator, _store, _decisions) = orchestrator(Vec::new()).await;
        let report = orchestrator.run_round(Market::KR).await;
        assert!(!report.success);
        assert_eq!(report.trades_executed, 0);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn test_round_mixes_outcomes() {
        let (orchestrator, store, scripted) = orchestrator(vec![
            ("buyer", Decision::buy("005930", dec!(10), "buy")),
            ("holder", Decision::hold("wait").with_confidence(0.3)),
            ("seller", Decision::sell("005930", dec!(1), "nothing to sell")),
        ])
        .await;

        let report = orchestrator.run_round(Market::KR).await;
        assert!(report.success);
        assert_eq!(report.models_processed, 3);
        assert_eq!(report.trades_executed, 1);
        assert_eq!(report.holds, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.holds().await.len(), 1);

        let seen = scripted.seen.lock().unwrap();
        assert_eq!(seen[0].candidates.len(), 1);
        assert_eq!(seen[0].exchange_rate, dec!(1380));
    }

    #[tokio::test]
    async fn test_missing_decision_is_skipped() {
        let (orchestrator, store, _scripted) =
            orchestrator(vec![("quiet", Decision::hold("unused"))]).await;
        // 스크립트에 없는 이름의 모델 추가
        store
            .seed_model(
                AiModel::new("silent", ProviderKind::Gemini, dec!(1000000)),
                dec!(1000000),
                dec!(0),
            )
            .await;

        let report = orchestrator.run_round(Market::KR).await;
        let silent = report
            .actions
            .iter()
            .find(|a| a.model_name == "silent")
            .unwrap();
        assert_eq!(silent.outcome, ActionOutcome::Skipped);
        assert_eq!(report.holds, 1);
    }

    #[tokio::test]
    async fn test_exchange_instruction_applied_before_hold() {
        let decision = Decision::hold("convert").with_exchange(arena_core::ExchangeInstruction {
            from: arena_core::Currency::KRW,
            to: arena_core::Currency::USD,
            amount: None,
        });
        let (orchestrator, store, _scripted) = orchestrator(vec![("fx", decision)]).await;

        orchestrator.run_round(Market::US).await;
        let exchanges = store.exchanges().await;
        assert_eq!(exchanges.len(), 1);
        // 결정 경로 환전은 잔고의 80%까지
        assert_eq!(exchanges[0].from_amount, dec!(800000));

        let model = store.list_models().await.unwrap().remove(0);
        let balance = store.get_balance(model.id).await.unwrap().unwrap();
        assert_eq!(balance.krw, dec!(200000));
    }

    #[tokio::test]
    async fn test_oversized_decision_does_not_abort_round() {
        let (orchestrator, store, _scripted) = orchestrator(vec![
            ("greedy", Decision::buy("005930", Decimal::MAX, "all in")),
            ("buyer", Decision::buy("005930", dec!(1), "buy")),
        ])
        .await;

        let report = tokio::spawn(async move { orchestrator.run_round(Market::KR).await })
            .await
            .unwrap();
        assert!(report.success);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.trades_executed, 1);

        let greedy = store
            .list_models()
            .await
            .unwrap()
            .into_iter()
            .find(|m| m.name == "greedy")
            .unwrap();
        assert!(store.list_trades(greedy.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_read_failure_marks_failed() {
        let (orchestrator, store, scripted) =
            orchestrator(vec![("buyer", Decision::buy("005930", dec!(1), "buy"))]).await;
        store.fail_operation("get_balance");

        let report = orchestrator.run_round(Market::KR).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.actions[0].outcome, ActionOutcome::Failed);
        // 잘못된 잔고로 결정을 요청하지 않음
        assert!(scripted.seen.lock().unwrap().is_empty());
    }

    /// 결정 직후 저장소 쓰기를 한 번 실패시킵니다.
    struct FailingStoreDecisions {
        store: Arc<MemoryLedgerStore>,
    }

    #[async_trait]
    impl DecisionProvider for FailingStoreDecisions {
        async fn decide(&self, _ctx: &DecisionContext) -> Option<Decision> {
            self.store.fail_next(1);
            Some(Decision::hold("wait"))
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_marks_failed() {
        let store = Arc::new(MemoryLedgerStore::new());
        store
            .seed_model(
                AiModel::new("holder", ProviderKind::Anthropic, dec!(1000000)),
                dec!(1000000),
                dec!(0),
            )
            .await;
        let orchestrator = TradingOrchestrator::new(
            Ledger::new(store.clone(), RetryPolicy::no_retry()),
            Arc::new(FixedPrices),
            Arc::new(FailingStoreDecisions {
                store: store.clone(),
            }),
            NotificationManager::new(),
            config(),
        );

        let report = orchestrator.run_round(Market::KR).await;
        assert_eq!(report.failed, 1);
        assert!(!report.success);
        assert_eq!(report.actions[0].outcome, ActionOutcome::Failed);
        assert!(store.holds().await.is_empty());
    }
}
