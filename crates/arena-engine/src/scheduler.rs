//! 트레이딩 스케줄러.
//!
//! 주기마다 열린 시장에 대해 라운드를 실행한 뒤 포트폴리오 평가를 기록합니다.
//! 수동 트리거와 주기 실행은 같은 잠금을 사용하므로 라운드가 겹치지 않습니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arena_core::{calendar, Market, SchedulerConfig};
use arena_notification::{Notification, NotificationManager};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::orchestrator::{RoundReport, TradingOrchestrator};
use crate::valuation::{PortfolioValuator, ValuationReport};

/// 한 주기 실행 결과.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub open_markets: Vec<Market>,
    pub rounds: Vec<RoundReport>,
    pub valuation: ValuationReport,
}

/// 트레이딩 스케줄러.
pub struct Scheduler {
    orchestrator: Arc<TradingOrchestrator>,
    valuator: PortfolioValuator,
    notifier: NotificationManager,
    config: SchedulerConfig,
    round_lock: Mutex<()>,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<TradingOrchestrator>,
        valuator: PortfolioValuator,
        notifier: NotificationManager,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            orchestrator,
            valuator,
            notifier,
            config,
            round_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 라운드를 즉시 실행합니다. 진행 중인 라운드가 있으면 끝날 때까지 기다립니다.
    pub async fn trigger(&self, market: Market) -> RoundReport {
        let _guard = self.round_lock.lock().await;
        self.orchestrator.run_round(market).await
    }

    /// 평가 작업을 재시도 정책과 함께 실행합니다.
    pub async fn record_portfolio(&self) -> ValuationReport {
        let report = with_valuation_retries(
            self.config.valuation_retries,
            self.config.valuation_retry_delay(),
            || self.valuator.record_portfolio_values(),
        )
        .await;

        if report.is_failure() {
            error!(total = report.total, "Portfolio valuation failed after retries");
            self.notifier
                .notify_quietly(Notification::system_error(
                    "valuation",
                    format!("포트폴리오 평가 기록 실패 (대상 {}개 모델)", report.total),
                ))
                .await;
        }
        report
    }

    /// 한 주기를 실행합니다.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let open_markets = calendar::open_markets(now);
        let mut rounds = Vec::with_capacity(open_markets.len());

        if open_markets.is_empty() {
            info!("No market open, skipping trading rounds");
        }
        for market in &open_markets {
            rounds.push(self.trigger(*market).await);
        }

        let valuation = self.record_portfolio().await;
        TickReport {
            open_markets,
            rounds,
            valuation,
        }
    }

    /// 주기 실행 태스크를 시작합니다. 비활성화되어 있으면 `None`.
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Scheduler disabled by configuration");
            return None;
        }

        Some(tokio::spawn(async move {
            let period = self.config.interval();
            info!(
                interval_secs = period.as_secs(),
                run_on_start = self.config.run_on_start,
                "Scheduler started"
            );

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            if !self.config.run_on_start {
                // 첫 tick은 즉시 완료됩니다
                ticker.tick().await;
            }

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.tick(Utc::now()).await;
                        info!(
                            rounds = report.rounds.len(),
                            recorded = report.valuation.recorded,
                            "Scheduled tick finished"
                        );
                    }
                    _ = shutdown.cancelled() => {
                        info!("Scheduler received shutdown signal");
                        break;
                    }
                }
            }

            info!("Scheduler stopped");
        }))
    }
}

/// 실패(`recorded == 0 && total > 0`)하면 `retries`번까지 다시 실행합니다.
async fn with_valuation_retries<F, Fut>(retries: u32, delay: Duration, mut run: F) -> ValuationReport
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ValuationReport>,
{
    let mut report = run().await;
    for attempt in 1..=retries {
        if !report.is_failure() {
            break;
        }
        warn!(attempt, delay_secs = delay.as_secs(), "Valuation recorded nothing, retrying");
        tokio::time::sleep(delay).await;
        report = run().await;
    }
    report
}
