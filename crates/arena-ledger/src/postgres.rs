//! PostgreSQL 장부 저장소.

use std::time::Duration;

use arena_core::{
    AiModel, CashBalance, Currency, DatabaseConfig, ExchangeRecord, HoldRecord, Holding, Market,
    PortfolioHistoryPoint, ProviderKind, TradeAction, TradeRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerStore;

// ==================== 레코드 타입 ====================

#[derive(Debug, FromRow)]
struct ModelRow {
    id: Uuid,
    name: String,
    provider: String,
    initial_capital: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    model_id: Uuid,
    krw: Decimal,
    usd: Decimal,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct HoldingRow {
    id: Uuid,
    model_id: Uuid,
    ticker: String,
    name: Option<String>,
    market: String,
    shares: Decimal,
    avg_price: Decimal,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct TradeRow {
    id: Uuid,
    model_id: Uuid,
    ticker: String,
    market: String,
    action: String,
    shares: Decimal,
    price: Decimal,
    total_amount: Decimal,
    currency: String,
    reasoning: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    id: Uuid,
    model_id: Uuid,
    total_value: Decimal,
    krw_cash: Decimal,
    usd_cash: Decimal,
    holdings_value: Decimal,
    exchange_rate: Decimal,
    recorded_at: DateTime<Utc>,
}

fn invalid<E: std::fmt::Display>(err: E) -> LedgerError {
    LedgerError::InvalidData(err.to_string())
}

impl TryFrom<ModelRow> for AiModel {
    type Error = LedgerError;

    fn try_from(row: ModelRow) -> Result<Self, Self::Error> {
        Ok(AiModel {
            id: row.id,
            name: row.name,
            provider: row.provider.parse::<ProviderKind>().map_err(invalid)?,
            initial_capital: row.initial_capital,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

impl From<BalanceRow> for CashBalance {
    fn from(row: BalanceRow) -> Self {
        CashBalance {
            model_id: row.model_id,
            krw: row.krw,
            usd: row.usd,
            updated_at: row.updated_at,
        }
    }
}

impl TryFrom<HoldingRow> for Holding {
    type Error = LedgerError;

    fn try_from(row: HoldingRow) -> Result<Self, Self::Error> {
        Ok(Holding {
            id: row.id,
            model_id: row.model_id,
            ticker: row.ticker,
            name: row.name,
            market: row.market.parse::<Market>().map_err(invalid)?,
            shares: row.shares,
            avg_price: row.avg_price,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = LedgerError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        Ok(TradeRecord {
            id: row.id,
            model_id: row.model_id,
            ticker: row.ticker,
            market: row.market.parse::<Market>().map_err(invalid)?,
            action: row.action.parse::<TradeAction>().map_err(invalid)?,
            shares: row.shares,
            price: row.price,
            total_amount: row.total_amount,
            currency: row.currency.parse::<Currency>().map_err(invalid)?,
            reasoning: row.reasoning,
            created_at: row.created_at,
        })
    }
}

impl From<HistoryRow> for PortfolioHistoryPoint {
    fn from(row: HistoryRow) -> Self {
        PortfolioHistoryPoint {
            id: row.id,
            model_id: row.model_id,
            total_value: row.total_value,
            krw_cash: row.krw_cash,
            usd_cash: row.usd_cash,
            holdings_value: row.holdings_value,
            exchange_rate: row.exchange_rate,
            recorded_at: row.recorded_at,
        }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> LedgerResult<Vec<T>>
where
    T: TryFrom<R, Error = LedgerError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ==================== 저장소 ====================

/// PostgreSQL 장부 저장소.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// 연결 풀을 생성합니다.
    pub async fn connect(database_url: &str, config: &DatabaseConfig) -> LedgerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(database_url)
            .await?;

        info!(max_connections = config.max_connections, "데이터베이스 연결 완료");
        Ok(Self { pool })
    }

    /// 기존 풀에서 생성합니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 마이그레이션을 실행합니다.
    pub async fn migrate(&self) -> LedgerResult<()> {
        info!("데이터베이스 마이그레이션 실행");
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::Query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn list_models(&self) -> LedgerResult<Vec<AiModel>> {
        let rows = sqlx::query_as::<_, ModelRow>(
            "SELECT id, name, provider, initial_capital, is_active, created_at
             FROM ai_models ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn list_active_models(&self) -> LedgerResult<Vec<AiModel>> {
        let rows = sqlx::query_as::<_, ModelRow>(
            "SELECT id, name, provider, initial_capital, is_active, created_at
             FROM ai_models WHERE is_active = TRUE ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn insert_model(&self, model: &AiModel) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO ai_models (id, name, provider, initial_capital, is_active, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(model.id)
        .bind(&model.name)
        .bind(model.provider.as_str())
        .bind(model.initial_capital)
        .bind(model.is_active)
        .bind(model.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_model_active(&self, model_id: Uuid, active: bool) -> LedgerResult<()> {
        let result = sqlx::query("UPDATE ai_models SET is_active = $2 WHERE id = $1")
            .bind(model_id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound(format!("model {}", model_id)));
        }
        Ok(())
    }

    async fn get_balance(&self, model_id: Uuid) -> LedgerResult<Option<CashBalance>> {
        let row = sqlx::query_as::<_, BalanceRow>(
            "SELECT model_id, krw, usd, updated_at FROM cash_balances WHERE model_id = $1",
        )
        .bind(model_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CashBalance::from))
    }

    async fn upsert_balance(&self, balance: &CashBalance) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO cash_balances (model_id, krw, usd, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (model_id)
             DO UPDATE SET krw = EXCLUDED.krw, usd = EXCLUDED.usd, updated_at = EXCLUDED.updated_at",
        )
        .bind(balance.model_id)
        .bind(balance.krw)
        .bind(balance.usd)
        .bind(balance.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_holdings(
        &self,
        model_id: Uuid,
        market: Option<Market>,
    ) -> LedgerResult<Vec<Holding>> {
        let rows = sqlx::query_as::<_, HoldingRow>(
            "SELECT id, model_id, ticker, name, market, shares, avg_price, updated_at
             FROM holdings
             WHERE model_id = $1 AND ($2::TEXT IS NULL OR market = $2)
             ORDER BY ticker",
        )
        .bind(model_id)
        .bind(market.map(|m| m.as_str()))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn get_holding(
        &self,
        model_id: Uuid,
        ticker: &str,
        market: Market,
    ) -> LedgerResult<Option<Holding>> {
        let row = sqlx::query_as::<_, HoldingRow>(
            "SELECT id, model_id, ticker, name, market, shares, avg_price, updated_at
             FROM holdings WHERE model_id = $1 AND ticker = $2 AND market = $3",
        )
        .bind(model_id)
        .bind(ticker)
        .bind(market.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Holding::try_from).transpose()
    }

    async fn upsert_holding(&self, holding: &Holding) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO holdings (id, model_id, ticker, name, market, shares, avg_price, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (model_id, ticker, market)
             DO UPDATE SET shares = EXCLUDED.shares,
                           avg_price = EXCLUDED.avg_price,
                           name = COALESCE(EXCLUDED.name, holdings.name),
                           updated_at = EXCLUDED.updated_at",
        )
        .bind(holding.id)
        .bind(holding.model_id)
        .bind(&holding.ticker)
        .bind(&holding.name)
        .bind(holding.market.as_str())
        .bind(holding.shares)
        .bind(holding.avg_price)
        .bind(holding.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_holding(&self, holding_id: Uuid) -> LedgerResult<()> {
        sqlx::query("DELETE FROM holdings WHERE id = $1")
            .bind(holding_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_trade(&self, trade: &TradeRecord) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO trades (id, model_id, ticker, market, action, shares, price,
                                 total_amount, currency, reasoning, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(trade.id)
        .bind(trade.model_id)
        .bind(&trade.ticker)
        .bind(trade.market.as_str())
        .bind(trade.action.as_str())
        .bind(trade.shares)
        .bind(trade.price)
        .bind(trade.total_amount)
        .bind(trade.currency.as_str())
        .bind(&trade.reasoning)
        .bind(trade.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_trades(
        &self,
        model_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> LedgerResult<Vec<TradeRecord>> {
        let rows = sqlx::query_as::<_, TradeRow>(
            "SELECT id, model_id, ticker, market, action, shares, price, total_amount,
                    currency, reasoning, created_at
             FROM trades
             WHERE model_id = $1 AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)
             ORDER BY created_at",
        )
        .bind(model_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn count_trades_since(&self, model_id: Uuid, since: DateTime<Utc>) -> LedgerResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trades WHERE model_id = $1 AND created_at >= $2",
        )
        .bind(model_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_exchange(&self, record: &ExchangeRecord) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO exchange_history (id, model_id, from_currency, to_currency,
                                           from_amount, to_amount, rate, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(record.id)
        .bind(record.model_id)
        .bind(record.from_currency.as_str())
        .bind(record.to_currency.as_str())
        .bind(record.from_amount)
        .bind(record.to_amount)
        .bind(record.rate)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_hold(&self, record: &HoldRecord) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO hold_decisions (id, model_id, market, reasoning, confidence, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(record.model_id)
        .bind(record.market.as_str())
        .bind(&record.reasoning)
        .bind(record.confidence)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_history_point(&self, point: &PortfolioHistoryPoint) -> LedgerResult<()> {
        sqlx::query(
            "INSERT INTO portfolio_history (id, model_id, total_value, krw_cash, usd_cash,
                                            holdings_value, exchange_rate, recorded_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(point.id)
        .bind(point.model_id)
        .bind(point.total_value)
        .bind(point.krw_cash)
        .bind(point.usd_cash)
        .bind(point.holdings_value)
        .bind(point.exchange_rate)
        .bind(point.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_history(
        &self,
        model_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> LedgerResult<Vec<PortfolioHistoryPoint>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT id, model_id, total_value, krw_cash, usd_cash, holdings_value,
                    exchange_rate, recorded_at
             FROM portfolio_history
             WHERE recorded_at >= $1 AND ($2::UUID IS NULL OR model_id = $2)
             ORDER BY recorded_at",
        )
        .bind(since)
        .bind(model_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PortfolioHistoryPoint::from).collect())
    }

    async fn health_check(&self) -> LedgerResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
