//! 설정 관리.
//!
//! 기본값 → `config/arena.toml`(선택) → `ARENA__섹션__키` 환경 변수 순으로 덮어씁니다.
//! API 키 같은 비밀 값은 여기서 다루지 않고 각 크레이트가 환경 변수에서 직접 읽습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/arena.toml";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub trading: TradingConfig,
    pub quotes: QuoteConfig,
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    /// 연결 획득 타임아웃 (초)
    pub acquire_timeout_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
    /// 일시적 에러 재시도 횟수 (최초 시도 포함)
    pub retry_attempts: u32,
    /// 선형 백오프 기본 지연 (밀리초)
    pub retry_base_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout_secs: 10,
            run_migrations: false,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

/// 스케줄러 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// 트레이딩 라운드/평가 주기 (분)
    pub interval_minutes: u64,
    /// 평가 작업 추가 재시도 횟수
    pub valuation_retries: u32,
    /// 평가 작업 재시도 간격 (초)
    pub valuation_retry_delay_secs: u64,
    /// 시작 직후 한 번 실행 여부
    pub run_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 30,
            valuation_retries: 2,
            valuation_retry_delay_secs: 5,
            run_on_start: false,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }

    pub fn valuation_retry_delay(&self) -> Duration {
        Duration::from_secs(self.valuation_retry_delay_secs)
    }
}

/// 트레이딩 라운드 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TradingConfig {
    /// 모델 간 최소 호출 간격 (밀리초)
    pub model_gap_ms: u64,
    /// 결정에 포함된 환전 지시의 최대 환전 비율
    pub decision_exchange_fraction: Decimal,
    /// 도구 호출 `make_decision`의 최대 환전 비율
    pub tool_exchange_fraction: Decimal,
    /// 자동 환전 시 부족분에 곱하는 여유 배수
    pub auto_exchange_buffer: Decimal,
    /// 도구 호출 최대 턴 수
    pub max_tool_turns: usize,
    /// 프롬프트에 포함할 후보 종목 수
    pub candidate_count: usize,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            model_gap_ms: 1000,
            decision_exchange_fraction: dec!(0.8),
            tool_exchange_fraction: dec!(0.5),
            auto_exchange_buffer: dec!(1.01),
            max_tool_turns: 5,
            candidate_count: 10,
        }
    }
}

impl TradingConfig {
    pub fn model_gap(&self) -> Duration {
        Duration::from_millis(self.model_gap_ms)
    }
}

/// 시세 조회 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuoteConfig {
    /// 환율 캐시 TTL (초)
    pub exchange_rate_ttl_secs: u64,
    /// 종목 유니버스 캐시 TTL (초)
    pub ticker_list_ttl_secs: u64,
    /// 배치 조회 묶음 크기
    pub batch_size: usize,
    /// 환율 조회 실패 시 사용하는 기본 환율 (KRW per USD)
    pub fallback_exchange_rate: Decimal,
    /// HTTP 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            exchange_rate_ttl_secs: 60,
            ticker_list_ttl_secs: 24 * 60 * 60,
            batch_size: 8,
            fallback_exchange_rate: dec!(1380),
            request_timeout_secs: 10,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// pretty, json, compact
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ArenaConfig {
    /// 파일(없어도 됨)과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("ARENA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut loaded: ArenaConfig = builder.build()?.try_deserialize()?;
        loaded.apply_env_overrides();
        Ok(loaded)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    /// 배포 환경에서 흔히 쓰는 평범한 환경 변수(`PORT`, `API_HOST` 등)를 반영합니다.
    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = env_var("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_var_parse::<u16>("PORT").or_else(|| env_var_parse("API_PORT")) {
            self.server.port = port;
        }
        if let Some(max) = env_var_parse("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }
        if let Some(run) = env_var_bool("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = run;
        }
        if let Some(enabled) = env_var_bool("SCHEDULER_ENABLED") {
            self.scheduler.enabled = enabled;
        }
    }
}

// ==================== 환경 변수 헬퍼 ====================

/// 비어 있지 않은 환경 변수 값을 반환합니다.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 환경 변수를 파싱합니다. 없거나 파싱에 실패하면 `None`.
pub fn env_var_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_var(key).and_then(|v| v.parse().ok())
}

/// 불리언 환경 변수 (`true/1/yes/on`, `false/0/no/off`).
pub fn env_var_bool(key: &str) -> Option<bool> {
    env_var(key).and_then(|v| match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    })
}
