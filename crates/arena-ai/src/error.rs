//! AI 결정 요청 에러.

use arena_core::ProviderKind;
use thiserror::Error;

/// AI 백엔드 호출 및 응답 파싱 에러.
///
/// 호출자 바깥으로는 전파되지 않고 로그 후 `None` 결정으로 바뀝니다.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0} API 키가 설정되지 않았습니다")]
    MissingKey(ProviderKind),

    #[error("HTTP 에러: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} 응답 상태 {status}: {body}")]
    Status {
        provider: ProviderKind,
        status: u16,
        body: String,
    },

    #[error("잘못된 응답 형식: {0}")]
    InvalidResponse(String),

    #[error("결정 파싱 실패: {0}")]
    Parse(String),

    #[error("도구 호출이 {0}턴을 초과했습니다")]
    TooManyTurns(usize),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AiResult<T> = Result<T, AiError>;
