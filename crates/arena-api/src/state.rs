//! 애플리케이션 공유 상태.
//!
//! 핸들러는 `State<Arc<AppState>>`로 접근합니다. 엔진 구성 요소는 모두 같은
//! 장부와 시세 제공자를 공유합니다.

use std::sync::Arc;
use std::time::Instant;

use arena_ai::{ApiKeys, DecisionProvider};
use arena_core::ArenaConfig;
use arena_data::MarketData;
use arena_engine::{
    AiHealthChecker, HistoryService, PortfolioValuator, Scheduler, TradingOrchestrator,
};
use arena_ledger::Ledger;
use arena_notification::NotificationManager;

/// 애플리케이션 상태.
pub struct AppState {
    /// 라운드 실행과 평가 기록 (수동 트리거 포함)
    pub scheduler: Arc<Scheduler>,
    /// 히스토리 조회/보정
    pub history: HistoryService,
    /// 모델별 키/거래 현황
    pub health: AiHealthChecker,
    pub ledger: Ledger,
    pub notifier: NotificationManager,
    pub keys: ApiKeys,
    pub config: ArenaConfig,
    /// 애플리케이션 버전
    pub version: String,
    started_at: Instant,
}

impl AppState {
    /// 구성 요소를 연결해 상태를 만듭니다.
    pub fn build(
        config: ArenaConfig,
        ledger: Ledger,
        market_data: Arc<dyn MarketData>,
        decisions: Arc<dyn DecisionProvider>,
        keys: ApiKeys,
        notifier: NotificationManager,
    ) -> Self {
        let orchestrator = TradingOrchestrator::new(
            ledger.clone(),
            market_data.clone(),
            decisions,
            notifier.clone(),
            config.trading.clone(),
        );
        let scheduler = Scheduler::new(
            Arc::new(orchestrator),
            PortfolioValuator::new(ledger.clone(), market_data.clone()),
            notifier.clone(),
            config.scheduler.clone(),
        );

        Self {
            scheduler: Arc::new(scheduler),
            history: HistoryService::new(ledger.clone(), market_data),
            health: AiHealthChecker::new(ledger.clone(), keys.clone()),
            ledger,
            notifier,
            keys,
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        }
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// 인메모리 장부와 고정 시세로 테스트용 상태를 만듭니다.
///
/// 결정 백엔드가 없으므로 라운드에서 모든 모델은 건너뜁니다.
#[cfg(test)]
pub async fn create_test_state() -> AppState {
    use arena_ai::AiDecisionProvider;
    use arena_core::{AiModel, Market, ProviderKind, Quote, TickerInfo, TradingConfig};
    use arena_ledger::{MemoryLedgerStore, RetryPolicy};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct StaticMarket;

    #[async_trait]
    impl MarketData for StaticMarket {
        async fn quote(&self, ticker: &str, market: Market) -> Quote {
            Quote::new(ticker, market, dec!(50000))
        }

        async fn quotes(&self, tickers: &[String], market: Market) -> HashMap<String, Quote> {
            tickers
                .iter()
                .map(|t| (t.clone(), Quote::new(t.as_str(), market, dec!(50000))))
                .collect()
        }

        async fn exchange_rate(&self) -> Decimal {
            dec!(1380)
        }

        async fn top_tickers(&self, market: Market) -> Vec<TickerInfo> {
            vec![TickerInfo::new("005930", "삼성전자", market)]
        }
    }

    let store = Arc::new(MemoryLedgerStore::new());
    for model in AiModel::default_roster(dec!(10000000)) {
        store.seed_model(model, dec!(10000000), Decimal::ZERO).await;
    }
    let market_data: Arc<dyn MarketData> = Arc::new(StaticMarket);
    let keys = ApiKeys::new().with_key(ProviderKind::OpenAi, "sk-test-0123456789abcdefghij");

    let mut config = ArenaConfig::default();
    config.trading = TradingConfig {
        model_gap_ms: 0,
        ..TradingConfig::default()
    };

    AppState::build(
        config,
        Ledger::new(store, RetryPolicy::no_retry()),
        market_data.clone(),
        Arc::new(AiDecisionProvider::new(market_data, 5)),
        keys,
        NotificationManager::new(),
    )
}
