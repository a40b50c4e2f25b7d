//! 수동 트레이딩 라운드와 평가 기록 endpoint.

use std::str::FromStr;
use std::sync::Arc;

use arena_core::Market;
use arena_engine::{RoundReport, ValuationReport};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use crate::error::{ApiErrorResponse, ApiResult};
use crate::metrics::record_api_trigger;
use crate::state::AppState;

/// POST /api/trigger/{market}
///
/// 라운드가 실패하면 500과 함께 라운드 보고를 그대로 돌려줍니다.
pub async fn trigger_round(
    State(state): State<Arc<AppState>>,
    Path(market): Path<String>,
) -> ApiResult<(StatusCode, Json<RoundReport>)> {
    let market = Market::from_str(&market)
        .map_err(|e| ApiErrorResponse::bad_request("INVALID_MARKET", e.to_string()))?;

    record_api_trigger("trigger");
    info!(%market, "Manual trading round requested");
    let report = state.scheduler.trigger(market).await;

    let status = if report.success {
        StatusCode::OK
    } else {
        warn!(%market, error = report.error.as_deref().unwrap_or("-"), "Manual round failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(report)))
}

/// POST /api/record-portfolio
pub async fn record_portfolio(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ValuationReport>) {
    record_api_trigger("record_portfolio");
    let report = state.scheduler.record_portfolio().await;
    let status = if report.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}
