//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크
//! - `/api/info`, `/api/market-status` - 서버/시장 정보
//! - `/api/trigger/{market}` - 수동 트레이딩 라운드 (KR | US)
//! - `/api/record-portfolio` - 포트폴리오 평가 기록
//! - `/api/portfolio-history`, `/api/candle-chart` - 히스토리 조회
//! - `/api/migrate-portfolio-history`, `/api/fill-portfolio-history` - 히스토리 보정
//! - `/api/ai-health` - 모델별 키/거래 현황

pub mod ai;
pub mod health;
pub mod market;
pub mod portfolio;
pub mod trading;

pub use ai::get_ai_health;
pub use health::{health_check, HealthResponse};
pub use market::{get_info, get_market_status, InfoResponse};
pub use portfolio::DaysQuery;
pub use trading::{record_portfolio, trigger_round};

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/info", get(get_info))
        .route("/api/market-status", get(get_market_status))
        .route("/api/trigger/{market}", post(trigger_round))
        .route("/api/record-portfolio", post(record_portfolio))
        .route("/api/portfolio-history", get(portfolio::get_portfolio_history))
        .route("/api/candle-chart", get(portfolio::get_candle_chart))
        .route(
            "/api/migrate-portfolio-history",
            post(portfolio::migrate_portfolio_history),
        )
        .route(
            "/api/fill-portfolio-history",
            post(portfolio::fill_portfolio_history),
        )
        .route("/api/ai-health", get(get_ai_health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_registers_all_endpoints() {
        let state = Arc::new(create_test_state().await);
        let app = create_api_router().with_state(state);

        let requests = [
            ("GET", "/health"),
            ("GET", "/api/info"),
            ("GET", "/api/market-status"),
            ("POST", "/api/trigger/US"),
            ("POST", "/api/record-portfolio"),
            ("GET", "/api/portfolio-history"),
            ("GET", "/api/candle-chart?days=7"),
            ("POST", "/api/migrate-portfolio-history"),
            ("POST", "/api/fill-portfolio-history?days=3"),
            ("GET", "/api/ai-health"),
        ];
        for (method, uri) in requests {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let state = Arc::new(create_test_state().await);
        let app = create_api_router().with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/trigger/KR")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
