//! 헬스 체크 endpoint.

use std::sync::Arc;

use arena_core::calendar;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" | "degraded"
    pub status: String,
    pub uptime_secs: u64,
    pub version: String,
    pub market: MarketOpen,
    /// 장부 백엔드 ("postgres" | "memory")
    pub ledger: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarketOpen {
    pub kr_open: bool,
    pub us_open: bool,
}

/// GET /health
///
/// 장부 연결이 실패하면 503과 함께 "degraded"를 반환합니다.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = calendar::market_status(Utc::now());
    let healthy = state.ledger.is_healthy().await;

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        uptime_secs: state.uptime_secs(),
        version: state.version.clone(),
        market: MarketOpen {
            kr_open: status.kr_open,
            us_open: status.us_open,
        },
        ledger: state.ledger.backend().to_string(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}
