//! 장부 저장소 트레잇.

use arena_core::{
    AiModel, CashBalance, ExchangeRecord, HoldRecord, Holding, Market, PortfolioHistoryPoint,
    TradeRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::LedgerResult;

/// 엔티티별 CRUD를 제공하는 장부 저장소.
///
/// 여러 행에 걸친 원자성은 보장하지 않습니다. 호출자는 잔고/보유/거래 기록을
/// 각각 독립적인 쓰기로 다룹니다.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// 로그와 `/api/info`에 표시할 백엔드 이름.
    fn backend(&self) -> &'static str;

    // ==================== 모델 ====================

    async fn list_models(&self) -> LedgerResult<Vec<AiModel>>;

    async fn list_active_models(&self) -> LedgerResult<Vec<AiModel>> {
        Ok(self
            .list_models()
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect())
    }

    async fn insert_model(&self, model: &AiModel) -> LedgerResult<()>;

    async fn set_model_active(&self, model_id: Uuid, active: bool) -> LedgerResult<()>;

    // ==================== 잔고 ====================

    async fn get_balance(&self, model_id: Uuid) -> LedgerResult<Option<CashBalance>>;

    async fn upsert_balance(&self, balance: &CashBalance) -> LedgerResult<()>;

    // ==================== 보유 종목 ====================

    /// 모델의 보유 종목. `market`이 주어지면 해당 시장만.
    async fn list_holdings(
        &self,
        model_id: Uuid,
        market: Option<Market>,
    ) -> LedgerResult<Vec<Holding>>;

    async fn get_holding(
        &self,
        model_id: Uuid,
        ticker: &str,
        market: Market,
    ) -> LedgerResult<Option<Holding>>;

    /// (model, ticker, market) 기준으로 생성 또는 갱신합니다.
    async fn upsert_holding(&self, holding: &Holding) -> LedgerResult<()>;

    async fn delete_holding(&self, holding_id: Uuid) -> LedgerResult<()>;

    // ==================== 추가 전용 기록 ====================

    async fn insert_trade(&self, trade: &TradeRecord) -> LedgerResult<()>;

    /// 모델의 거래 기록 (오래된 순). `since`가 주어지면 그 이후만.
    async fn list_trades(
        &self,
        model_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<TradeRecord>>;

    async fn count_trades_since(&self, model_id: Uuid, since: DateTime<Utc>) -> LedgerResult<u64>;

    async fn insert_exchange(&self, record: &ExchangeRecord) -> LedgerResult<()>;

    async fn insert_hold(&self, record: &HoldRecord) -> LedgerResult<()>;

    // ==================== 포트폴리오 히스토리 ====================

    async fn insert_history_point(&self, point: &PortfolioHistoryPoint) -> LedgerResult<()>;

    /// `since` 이후 히스토리 (시간순). `model_id`가 없으면 전체 모델.
    async fn list_history(
        &self,
        model_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> LedgerResult<Vec<PortfolioHistoryPoint>>;

    /// 연결 상태를 확인합니다.
    async fn health_check(&self) -> LedgerResult<()>;
}
