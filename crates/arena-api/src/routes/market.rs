//! 시장 상태와 서버 정보 endpoint.

use std::sync::Arc;

use arena_core::{calendar, MarketStatus, ProviderKind};
use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// GET /api/market-status
pub async fn get_market_status() -> Json<MarketStatus> {
    Json(calendar::market_status(Utc::now()))
}

/// 서버 메타데이터.
#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub version: String,
    pub scheduler: SchedulerInfo,
    /// 사용 가능한 API 키가 있는 제공자
    pub providers: Vec<ProviderKind>,
    pub notification_channels: Vec<String>,
    pub ledger_backend: String,
    pub model_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SchedulerInfo {
    pub enabled: bool,
    pub interval_minutes: u64,
}

/// GET /api/info
pub async fn get_info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let scheduler = state.scheduler.config();
    Json(InfoResponse {
        version: state.version.clone(),
        scheduler: SchedulerInfo {
            enabled: scheduler.enabled,
            interval_minutes: scheduler.interval_minutes,
        },
        providers: state.keys.configured(),
        notification_channels: state.notifier.channels(),
        ledger_backend: state.ledger.backend().to_string(),
        model_count: state.ledger.models().await.len(),
    })
}
