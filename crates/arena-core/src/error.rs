//! 아레나 공통 에러 타입.
//!
//! 여러 크레이트에서 공유하는 에러를 정의합니다. 각 크레이트는 자신의
//! 세부 에러(예: `LedgerError`, `AiError`)를 따로 두고, 경계에서만 이 타입으로 변환합니다.

use thiserror::Error;

/// 핵심 아레나 에러.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 지원하지 않는 시장 코드
    #[error("잘못된 시장: {0}")]
    InvalidMarket(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 시세/외부 데이터 에러
    #[error("데이터 에러: {0}")]
    Data(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 네트워크 에러
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 아레나 작업을 위한 Result 타입.
pub type ArenaResult<T> = Result<T, ArenaError>;

impl ArenaError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ArenaError::Network(_))
    }
}

impl From<serde_json::Error> for ArenaError {
    fn from(err: serde_json::Error) -> Self {
        ArenaError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for ArenaError {
    fn from(err: config::ConfigError) -> Self {
        ArenaError::Config(err.to_string())
    }
}
