//! API 에러 응답 타입.
//!
//! 모든 엔드포인트는 실패 시 같은 JSON 형식을 돌려줍니다.
//!
//! ```json
//! { "code": "INVALID_MARKET", "message": "알 수 없는 시장: JP" }
//! ```

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 통합 API 에러 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_MARKET", "ROUND_FAILED")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// 상세 정보를 포함한 에러.
    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: Value) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    /// 400 응답.
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::BAD_REQUEST, Json(Self::new(code, message)))
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_skips_empty_details() {
        let error = ApiErrorResponse::new("INVALID_MARKET", "알 수 없는 시장");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""code":"INVALID_MARKET""#));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_with_details() {
        let error = ApiErrorResponse::with_details(
            "ROUND_FAILED",
            "라운드 실패",
            serde_json::json!({ "failed": 6 }),
        );
        assert_eq!(error.details.unwrap()["failed"], 6);
        assert_eq!(error.code, "ROUND_FAILED");
    }
}
