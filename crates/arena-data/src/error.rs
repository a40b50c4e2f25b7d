//! 시세 조회 에러 타입.
//!
//! 크레이트 내부에서만 전파되며, `QuoteProvider` 경계에서 모의 시세나 빈 결과로 바뀝니다.

use thiserror::Error;

/// 시세 소스 에러.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("HTTP 요청 실패: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} 응답 상태 {status}")]
    Status { source_name: &'static str, status: u16 },

    #[error("응답 파싱 실패: {0}")]
    Parse(String),

    #[error("데이터 없음: {0}")]
    NoData(String),

    #[error("API 키 없음: {0}")]
    MissingKey(&'static str),

    #[error("지원하지 않는 시장: {0}")]
    UnsupportedMarket(String),
}

pub type QuoteResult<T> = Result<T, QuoteError>;

impl QuoteError {
    /// 요청 한도 초과 여부.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, QuoteError::Status { status: 429, .. })
    }
}
