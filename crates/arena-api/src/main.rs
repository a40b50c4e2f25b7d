//! AI 트레이딩 아레나 서버 진입점.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arena_ai::{AiDecisionProvider, ApiKeys};
use arena_core::{env_var, init_logging, ArenaConfig, LogConfig};
use arena_data::{http_client, MarketData, QuoteProvider};
use arena_ledger::{open_store, Ledger, RetryPolicy};
use arena_notification::NotificationManager;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use arena_api::metrics::setup_metrics_recorder;
use arena_api::routes::create_api_router;
use arena_api::state::AppState;

/// LLM 호출 타임아웃 (초).
const AI_REQUEST_TIMEOUT_SECS: u64 = 60;

/// 수동 라운드는 모델 6개를 순차 호출하므로 넉넉하게 잡습니다.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (없어도 됨)
    let _ = dotenvy::dotenv();

    let config = ArenaConfig::load_default().context("설정 로드 실패")?;
    init_logging(LogConfig::from(&config.logging)).map_err(|e| anyhow::anyhow!(e))?;

    info!("Starting AI trading arena...");

    // Prometheus 메트릭 레코더 설정
    let metrics_handle = match setup_metrics_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics recorder initialized");
            Some(handle)
        }
        Err(e) => {
            warn!(error = %e, "Prometheus 레코더 설치 실패, /metrics 비활성화");
            None
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                error = %e,
                "소켓 주소 설정이 유효하지 않습니다. API_HOST, PORT 환경변수를 확인하세요."
            );
            e
        })?;

    // 장부 (DATABASE_URL이 없으면 인메모리)
    let store = open_store(env_var("DATABASE_URL").as_deref(), &config.database)
        .await
        .context("장부 저장소 연결 실패")?;
    let ledger = Ledger::new(store, RetryPolicy::from_config(&config.database));

    let market_data: Arc<dyn MarketData> = Arc::new(QuoteProvider::from_config(&config.quotes));

    let keys = ApiKeys::from_env();
    let decisions = AiDecisionProvider::from_keys(
        &keys,
        http_client(AI_REQUEST_TIMEOUT_SECS),
        market_data.clone(),
        config.trading.max_tool_turns,
    );
    let notifier = NotificationManager::from_env();

    let state = Arc::new(AppState::build(
        config,
        ledger,
        market_data,
        Arc::new(decisions),
        keys,
        notifier,
    ));

    info!(
        version = %state.version,
        ledger = state.ledger.backend(),
        providers = ?state.keys.configured(),
        notification_channels = ?state.notifier.channels(),
        "Application state initialized"
    );

    // 전역 종료 토큰 (스케줄러와 서버가 공유)
    let shutdown_token = CancellationToken::new();
    let scheduler_handle = state.scheduler.clone().spawn(shutdown_token.clone());
    if scheduler_handle.is_none() {
        info!("Scheduler disabled (SCHEDULER_ENABLED=false)");
    }

    let app = create_router(state, metrics_handle);

    info!(%addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    info!("Server shutdown initiated, waiting for scheduler...");
    shutdown_token.cancel();

    if let Some(handle) = scheduler_handle {
        // 진행 중인 라운드가 있으면 최대 30초 대기
        match tokio::time::timeout(Duration::from_secs(30), handle).await {
            Ok(Ok(())) => info!("Scheduler stopped"),
            Ok(Err(e)) => warn!(error = %e, "Scheduler task ended abnormally"),
            Err(_) => warn!("Scheduler shutdown timeout, forcing exit"),
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// CORS 설정.
///
/// `CORS_ORIGINS`(쉼표 구분)가 있으면 해당 origin만 허용하고, 없으면 모두 허용합니다.
fn cors_layer() -> CorsLayer {
    let origins: Vec<_> = env_var("CORS_ORIGINS")
        .map(|origins| {
            origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let restricted = !origins.is_empty();
    let allow_origin = if restricted {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    } else {
        warn!("CORS_ORIGINS not set or invalid, allowing any origin (development mode)");
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        // 와일드카드 origin에는 자격 증명을 허용할 수 없음
        .allow_credentials(restricted)
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new().merge(create_api_router().with_state(state));

    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(handle),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(cors_layer())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM을 수신하면 종료 토큰을 취소합니다. 시그널 핸들러 설치에
/// 실패하면 해당 시그널은 무시합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = shutdown_token.cancelled() => {}
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
}
