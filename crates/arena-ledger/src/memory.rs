//! 인메모리 장부 저장소.
//!
//! `DATABASE_URL`이 없을 때와 테스트에서 사용합니다. 재시도 동작 검증을 위해
//! 다음 N번의 호출, 또는 지정한 연산만 일시적 에러로 실패시키는 기능이 있습니다.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock as SyncRwLock;

use arena_core::{
    AiModel, CashBalance, ExchangeRecord, HoldRecord, Holding, Market, PortfolioHistoryPoint,
    TradeRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerStore;

#[derive(Debug, Default)]
struct MemoryState {
    models: Vec<AiModel>,
    balances: HashMap<Uuid, CashBalance>,
    holdings: Vec<Holding>,
    trades: Vec<TradeRecord>,
    exchanges: Vec<ExchangeRecord>,
    holds: Vec<HoldRecord>,
    history: Vec<PortfolioHistoryPoint>,
}

/// 인메모리 장부 저장소.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: RwLock<MemoryState>,
    pending_failures: AtomicU32,
    failing_operations: SyncRwLock<HashSet<&'static str>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 다음 `count`번의 호출을 `LedgerError::Transient`로 실패시킵니다.
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// `operation`(예: `"get_balance"`) 호출을 해제할 때까지 계속 실패시킵니다.
    pub fn fail_operation(&self, operation: &'static str) {
        if let Ok(mut ops) = self.failing_operations.write() {
            ops.insert(operation);
        }
    }

    /// 주입한 실패를 모두 해제합니다.
    pub fn clear_failures(&self) {
        self.pending_failures.store(0, Ordering::SeqCst);
        if let Ok(mut ops) = self.failing_operations.write() {
            ops.clear();
        }
    }

    fn check_failure(&self, operation: &'static str) -> LedgerResult<()> {
        let targeted = self
            .failing_operations
            .read()
            .map(|ops| ops.contains(operation))
            .unwrap_or(false);
        if targeted {
            return Err(LedgerError::Transient(format!("injected {operation} failure")));
        }

        let consumed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match consumed {
            Ok(_) => Err(LedgerError::Transient("injected failure".to_string())),
            Err(_) => Ok(()),
        }
    }

    /// 모델과 초기 잔고를 함께 등록합니다 (시드/테스트용).
    pub async fn seed_model(&self, model: AiModel, krw: rust_decimal::Decimal, usd: rust_decimal::Decimal) {
        let mut state = self.state.write().await;
        state
            .balances
            .insert(model.id, CashBalance::new(model.id, krw, usd));
        state.models.push(model);
    }

    /// 저장된 환전 기록 (테스트 검증용).
    pub async fn exchanges(&self) -> Vec<ExchangeRecord> {
        self.state.read().await.exchanges.clone()
    }

    /// 저장된 관망 기록 (테스트 검증용).
    pub async fn holds(&self) -> Vec<HoldRecord> {
        self.state.read().await.holds.clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list_models(&self) -> LedgerResult<Vec<AiModel>> {
        self.check_failure("list_models")?;
        Ok(self.state.read().await.models.clone())
    }

    async fn insert_model(&self, model: &AiModel) -> LedgerResult<()> {
        self.check_failure("insert_model")?;
        let mut state = self.state.write().await;
        if state.models.iter().any(|m| m.id == model.id) {
            return Err(LedgerError::Conflict(format!("model {}", model.id)));
        }
        state.models.push(model.clone());
        Ok(())
    }

    async fn set_model_active(&self, model_id: Uuid, active: bool) -> LedgerResult<()> {
        self.check_failure("set_model_active")?;
        let mut state = self.state.write().await;
        let model = state
            .models
            .iter_mut()
            .find(|m| m.id == model_id)
            .ok_or_else(|| LedgerError::NotFound(format!("model {}", model_id)))?;
        model.is_active = active;
        Ok(())
    }

    async fn get_balance(&self, model_id: Uuid) -> LedgerResult<Option<CashBalance>> {
        self.check_failure("get_balance")?;
        Ok(self.state.read().await.balances.get(&model_id).cloned())
    }

    async fn upsert_balance(&self, balance: &CashBalance) -> LedgerResult<()> {
        self.check_failure("upsert_balance")?;
        self.state
            .write()
            .await
            .balances
            .insert(balance.model_id, balance.clone());
        Ok(())
    }

    async fn list_holdings(
        &self,
        model_id: Uuid,
        market: Option<Market>,
    ) -> LedgerResult<Vec<Holding>> {
        self.check_failure("list_holdings")?;
        Ok(self
            .state
            .read()
            .await
            .holdings
            .iter()
            .filter(|h| h.model_id == model_id && market.map_or(true, |m| h.market == m))
            .cloned()
            .collect())
    }

    async fn get_holding(
        &self,
        model_id: Uuid,
        ticker: &str,
        market: Market,
    ) -> LedgerResult<Option<Holding>> {
        self.check_failure("get_holding")?;
        Ok(self
            .state
            .read()
            .await
            .holdings
            .iter()
            .find(|h| h.model_id == model_id && h.ticker == ticker && h.market == market)
            .cloned())
    }

    async fn upsert_holding(&self, holding: &Holding) -> LedgerResult<()> {
        self.check_failure("upsert_holding")?;
        let mut state = self.state.write().await;
        match state.holdings.iter_mut().find(|h| {
            h.model_id == holding.model_id && h.ticker == holding.ticker && h.market == holding.market
        }) {
            Some(existing) => {
                existing.shares = holding.shares;
                existing.avg_price = holding.avg_price;
                existing.updated_at = holding.updated_at;
                if holding.name.is_some() {
                    existing.name = holding.name.clone();
                }
            }
            None => state.holdings.push(holding.clone()),
        }
        Ok(())
    }

    async fn delete_holding(&self, holding_id: Uuid) -> LedgerResult<()> {
        self.check_failure("delete_holding")?;
        self.state
            .write()
            .await
            .holdings
            .retain(|h| h.id != holding_id);
        Ok(())
    }

    async fn insert_trade(&self, trade: &TradeRecord) -> LedgerResult<()> {
        self.check_failure("insert_trade")?;
        self.state.write().await.trades.push(trade.clone());
        Ok(())
    }

    async fn list_trades(
        &self,
        model_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<TradeRecord>> {
        self.check_failure("list_trades")?;
        let mut trades: Vec<TradeRecord> = self
            .state
            .read()
            .await
            .trades
            .iter()
            .filter(|t| t.model_id == model_id && since.map_or(true, |s| t.created_at >= s))
            .cloned()
            .collect();
        trades.sort_by_key(|t| t.created_at);
        Ok(trades)
    }

    async fn count_trades_since(&self, model_id: Uuid, since: DateTime<Utc>) -> LedgerResult<u64> {
        self.check_failure("count_trades_since")?;
        let count = self
            .state
            .read()
            .await
            .trades
            .iter()
            .filter(|t| t.model_id == model_id && t.created_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn insert_exchange(&self, record: &ExchangeRecord) -> LedgerResult<()> {
        self.check_failure("insert_exchange")?;
        self.state.write().await.exchanges.push(record.clone());
        Ok(())
    }

    async fn insert_hold(&self, record: &HoldRecord) -> LedgerResult<()> {
        self.check_failure("insert_hold")?;
        self.state.write().await.holds.push(record.clone());
        Ok(())
    }

    async fn insert_history_point(&self, point: &PortfolioHistoryPoint) -> LedgerResult<()> {
        self.check_failure("insert_history_point")?;
        self.state.write().await.history.push(point.clone());
        Ok(())
    }

    async fn list_history(
        &self,
        model_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> LedgerResult<Vec<PortfolioHistoryPoint>> {
        self.check_failure("list_history")?;
        let mut points: Vec<PortfolioHistoryPoint> = self
            .state
            .read()
            .await
            .history
            .iter()
            .filter(|p| p.recorded_at >= since && model_id.map_or(true, |id| p.model_id == id))
            .cloned()
            .collect();
        points.sort_by_key(|p| p.recorded_at);
        Ok(points)
    }

    async fn health_check(&self) -> LedgerResult<()> {
        self.check_failure("health_check")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::ProviderKind;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_upsert_holding_by_key() {
        let store = MemoryLedgerStore::new();
        let model_id = Uuid::new_v4();

        let first = Holding::open(model_id, "005930", Market::KR, dec!(10), dec!(70000));
        store.upsert_holding(&first).await.unwrap();

        let mut second = Holding::open(model_id, "005930", Market::KR, dec!(15), dec!(72000));
        second.name = Some("삼성전자".to_string());
        store.upsert_holding(&second).await.unwrap();

        let holdings = store.list_holdings(model_id, Some(Market::KR)).await.unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].id, first.id);
        assert_eq!(holdings[0].shares, dec!(15));
        assert_eq!(holdings[0].name.as_deref(), Some("삼성전자"));
        assert!(store.list_holdings(model_id, Some(Market::US)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = MemoryLedgerStore::new();
        store.fail_next(2);

        assert!(store.health_check().await.unwrap_err().is_transient());
        assert!(store.health_check().await.is_err());
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_targeted_failure_until_cleared() {
        let store = MemoryLedgerStore::new();
        let model = AiModel::new("GPT-4o", ProviderKind::OpenAi, dec!(1000000));
        store.seed_model(model.clone(), dec!(1000000), dec!(0)).await;

        store.fail_operation("get_balance");
        assert!(store.get_balance(model.id).await.is_err());
        assert!(store.get_balance(model.id).await.is_err());
        assert_eq!(store.list_models().await.unwrap().len(), 1);

        store.clear_failures();
        assert!(store.get_balance(model.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_active_model_filter() {
        let store = MemoryLedgerStore::new();
        let active = AiModel::new("GPT-4o", ProviderKind::OpenAi, dec!(1000000));
        let inactive = AiModel::new("Grok", ProviderKind::Grok, dec!(1000000));
        store.seed_model(active.clone(), dec!(1000000), dec!(0)).await;
        store.seed_model(inactive.clone(), dec!(1000000), dec!(0)).await;
        store.set_model_active(inactive.id, false).await.unwrap();

        let models = store.list_active_models().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, active.id);
    }
}
