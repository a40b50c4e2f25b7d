//! AI 트레이딩 아레나 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Axum 기반 REST API (수동 라운드, 히스토리 조회/보정, 상태 점검)
//! - 스케줄러 호스팅
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`error`]: API 에러 응답
//! - [`metrics`]: Prometheus 레코더

pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::{ApiErrorResponse, ApiResult};
pub use self::metrics::setup_metrics_recorder;
pub use routes::*;
pub use state::AppState;

#[cfg(test)]
pub use state::create_test_state;
