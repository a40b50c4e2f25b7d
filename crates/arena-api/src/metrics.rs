//! Prometheus 메트릭 설정.
//!
//! 라운드/체결/결정 카운터는 `arena_engine::metrics`에서 기록하고 여기서는
//! 레코더 설치와 `/metrics` 렌더링만 담당합니다.

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Prometheus 레코더를 설치하고 핸들을 반환합니다.
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// 수동 API 호출 카운터 증가.
pub fn record_api_trigger(endpoint: &'static str) {
    counter!("arena_api_triggers_total", "endpoint" => endpoint).increment(1);
}
