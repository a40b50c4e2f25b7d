//! 재시도를 감싼 장부 façade.
//!
//! 읽기는 최종 실패 시 빈 기본값을 반환하고, 쓰기는 성공 여부(`bool`)를 반환합니다.
//! 읽은 값으로 다시 쓰는 경로는 기본값이 실제 행을 덮어쓰지 않도록 `try_*` 읽기를
//! 사용해야 합니다. 실패는 모두 여기서 로그로 남깁니다.

use std::sync::Arc;

use arena_core::{
    AiModel, CashBalance, ExchangeRecord, HoldRecord, Holding, Market, PortfolioHistoryPoint,
    TradeRecord,
};
use chrono::{DateTime, Utc};
use tracing::error;
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::retry::RetryPolicy;
use crate::store::LedgerStore;

fn or_default<T>(operation: &'static str, result: LedgerResult<T>, default: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(operation, error = %e, "장부 읽기 실패, 기본값 반환");
            default
        }
    }
}

fn logged<T>(operation: &'static str, result: LedgerResult<T>) -> LedgerResult<T> {
    result.inspect_err(|e| error!(operation, error = %e, "장부 읽기 실패"))
}

fn succeeded(operation: &'static str, result: LedgerResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            error!(operation, error = %e, "장부 쓰기 실패");
            false
        }
    }
}

/// 장부 façade.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    retry: RetryPolicy,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// 내부 저장소 (에러를 직접 다뤄야 할 때).
    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    // ==================== 읽기 ====================

    pub async fn models(&self) -> Vec<AiModel> {
        let result = self.retry.run("list_models", || self.store.list_models()).await;
        or_default("list_models", result, Vec::new())
    }

    pub async fn active_models(&self) -> Vec<AiModel> {
        let result = self
            .retry
            .run("list_active_models", || self.store.list_active_models())
            .await;
        or_default("list_active_models", result, Vec::new())
    }

    /// 잔고를 조회합니다. 없거나 실패하면 0 잔고.
    pub async fn balance(&self, model_id: Uuid) -> CashBalance {
        self.try_balance(model_id)
            .await
            .unwrap_or_else(|_| CashBalance::empty(model_id))
    }

    /// 잔고를 조회합니다. 행이 없으면 0 잔고, 조회 실패는 에러로 돌려줍니다.
    pub async fn try_balance(&self, model_id: Uuid) -> LedgerResult<CashBalance> {
        let result = self
            .retry
            .run("get_balance", || self.store.get_balance(model_id))
            .await;
        logged("get_balance", result)
            .map(|balance| balance.unwrap_or_else(|| CashBalance::empty(model_id)))
    }

    pub async fn holdings(&self, model_id: Uuid, market: Option<Market>) -> Vec<Holding> {
        self.try_holdings(model_id, market).await.unwrap_or_default()
    }

    pub async fn try_holdings(
        &self,
        model_id: Uuid,
        market: Option<Market>,
    ) -> LedgerResult<Vec<Holding>> {
        let result = self
            .retry
            .run("list_holdings", || self.store.list_holdings(model_id, market))
            .await;
        logged("list_holdings", result)
    }

    pub async fn holding(&self, model_id: Uuid, ticker: &str, market: Market) -> Option<Holding> {
        self.try_holding(model_id, ticker, market).await.ok().flatten()
    }

    /// 보유 종목 하나를 조회합니다. `Ok(None)`은 보유하지 않은 경우뿐입니다.
    pub async fn try_holding(
        &self,
        model_id: Uuid,
        ticker: &str,
        market: Market,
    ) -> LedgerResult<Option<Holding>> {
        let result = self
            .retry
            .run("get_holding", || self.store.get_holding(model_id, ticker, market))
            .await;
        logged("get_holding", result)
    }

    pub async fn trades(&self, model_id: Uuid, since: Option<DateTime<Utc>>) -> Vec<TradeRecord> {
        let result = self
            .retry
            .run("list_trades", || self.store.list_trades(model_id, since))
            .await;
        or_default("list_trades", result, Vec::new())
    }

    pub async fn trade_count_since(&self, model_id: Uuid, since: DateTime<Utc>) -> u64 {
        let result = self
            .retry
            .run("count_trades_since", || {
                self.store.count_trades_since(model_id, since)
            })
            .await;
        or_default("count_trades_since", result, 0)
    }

    pub async fn history(
        &self,
        model_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Vec<PortfolioHistoryPoint> {
        self.try_history(model_id, since).await.unwrap_or_default()
    }

    pub async fn try_history(
        &self,
        model_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> LedgerResult<Vec<PortfolioHistoryPoint>> {
        let result = self
            .retry
            .run("list_history", || self.store.list_history(model_id, since))
            .await;
        logged("list_history", result)
    }

    /// 저장소 연결 상태.
    pub async fn is_healthy(&self) -> bool {
        self.store.health_check().await.is_ok()
    }

    // ==================== 쓰기 ====================

    pub async fn save_model(&self, model: &AiModel) -> bool {
        let result = self.retry.run("insert_model", || self.store.insert_model(model)).await;
        succeeded("insert_model", result)
    }

    pub async fn save_balance(&self, balance: &CashBalance) -> bool {
        let result = self
            .retry
            .run("upsert_balance", || self.store.upsert_balance(balance))
            .await;
        succeeded("upsert_balance", result)
    }

    pub async fn save_holding(&self, holding: &Holding) -> bool {
        let result = self
            .retry
            .run("upsert_holding", || self.store.upsert_holding(holding))
            .await;
        succeeded("upsert_holding", result)
    }

    pub async fn remove_holding(&self, holding_id: Uuid) -> bool {
        let result = self
            .retry
            .run("delete_holding", || self.store.delete_holding(holding_id))
            .await;
        succeeded("delete_holding", result)
    }

    pub async fn record_trade(&self, trade: &TradeRecord) -> bool {
        let result = self.retry.run("insert_trade", || self.store.insert_trade(trade)).await;
        succeeded("insert_trade", result)
    }

    pub async fn record_exchange(&self, record: &ExchangeRecord) -> bool {
        let result = self
            .retry
            .run("insert_exchange", || self.store.insert_exchange(record))
            .await;
        succeeded("insert_exchange", result)
    }

    pub async fn record_hold(&self, record: &HoldRecord) -> bool {
        let result = self.retry.run("insert_hold", || self.store.insert_hold(record)).await;
        succeeded("insert_hold", result)
    }

    pub async fn record_history(&self, point: &PortfolioHistoryPoint) -> bool {
        let result = self
            .retry
            .run("insert_history_point", || self.store.insert_history_point(point))
            .await;
        succeeded("insert_history_point", result)
    }
}
