//! 포트폴리오 히스토리 조회와 보정 endpoint.

use std::sync::Arc;

use arena_engine::{GapFillReport, MigrationReport, ModelCandles, ModelSeries};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::metrics::record_api_trigger;
use crate::state::AppState;

const DEFAULT_DAYS: u32 = 30;
const MAX_DAYS: u32 = 365;

/// 조회 기간 쿼리 (`?days=`).
#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

impl DaysQuery {
    /// 1..=365로 제한한 일수 (기본 30일).
    pub fn days(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
    }
}

/// GET /api/portfolio-history
pub async fn get_portfolio_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Json<Vec<ModelSeries>> {
    Json(state.history.portfolio_history(query.days()).await)
}

/// GET /api/candle-chart
pub async fn get_candle_chart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Json<Vec<ModelCandles>> {
    Json(state.history.candle_chart(query.days()).await)
}

/// POST /api/migrate-portfolio-history
pub async fn migrate_portfolio_history(
    State(state): State<Arc<AppState>>,
) -> Json<MigrationReport> {
    record_api_trigger("migrate_history");
    let report = state.history.migrate_history_from_trades().await;
    info!(
        migrated = report.migrated_models,
        skipped = report.skipped_models,
        inserted = report.inserted,
        "Portfolio history migrated from trades"
    );
    Json(report)
}

/// POST /api/fill-portfolio-history
pub async fn fill_portfolio_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DaysQuery>,
) -> Json<GapFillReport> {
    record_api_trigger("fill_history");
    let days = query.days();
    let report = state.history.fill_history_gaps(days).await;
    info!(days, models = report.models, inserted = report.inserted, "Portfolio history gaps filled");
    Json(report)
}
