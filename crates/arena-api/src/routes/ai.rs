//! AI 모델 상태 endpoint.

use std::sync::Arc;

use arena_engine::AiHealthReport;
use axum::{extract::State, Json};

use crate::state::AppState;

/// GET /api/ai-health
///
/// 모델별 API 키 상태와 최근 24시간/7일 거래 수를 반환합니다.
pub async fn get_ai_health(State(state): State<Arc<AppState>>) -> Json<AiHealthReport> {
    Json(state.health.ai_health().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_ai_health_marks_configured_provider_ready() {
        let state = Arc::new(create_test_state().await);
        let app = Router::new()
            .route("/api/ai-health", get(get_ai_health))
            .with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/ai-health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(report["ready"], 1);

        let models = report["models"].as_array().unwrap();
        assert_eq!(models.len(), 6);
        let openai = models
            .iter()
            .find(|m| m["provider"] == "openai")
            .unwrap();
        assert_eq!(openai["key_status"], "present");
        assert_eq!(openai["trades_24h"], 0);

        let grok = models.iter().find(|m| m["provider"] == "grok").unwrap();
        assert_eq!(grok["key_status"], "missing");
    }
}
