//! 장부 저장소 에러 타입.
//!
//! 저장소 계층이 에러를 타입으로 분류합니다. 재시도 여부는 메시지 문자열이 아니라
//! `LedgerError::Transient` 변형으로 판단합니다.

use thiserror::Error;

/// 장부 저장소 에러.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 연결 끊김, 풀 타임아웃 등 재시도하면 성공할 수 있는 에러
    #[error("일시적 저장소 에러: {0}")]
    Transient(String),

    #[error("레코드 없음: {0}")]
    NotFound(String),

    /// 유니크 제약 위반 등
    #[error("충돌: {0}")]
    Conflict(String),

    #[error("쿼리 에러: {0}")]
    Query(String),

    /// 저장된 값을 도메인 타입으로 변환하지 못함
    #[error("잘못된 저장 데이터: {0}")]
    InvalidData(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    /// 재시도 대상인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => LedgerError::NotFound("row not found".to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed => LedgerError::Transient(err.to_string()),
            sqlx::Error::Database(ref db_err) => match db_err.code().as_deref() {
                Some("23505") => LedgerError::Conflict(db_err.message().to_string()),
                // 40001 serialization_failure, 40P01 deadlock, 57P01 admin_shutdown
                Some("40001") | Some("40P01") | Some("57P01") => {
                    LedgerError::Transient(db_err.message().to_string())
                }
                _ => LedgerError::Query(err.to_string()),
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                LedgerError::InvalidData(err.to_string())
            }
            other => LedgerError::Query(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_classification() {
        assert!(LedgerError::from(sqlx::Error::PoolTimedOut).is_transient());
        assert!(LedgerError::from(sqlx::Error::PoolClosed).is_transient());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(LedgerError::from(sqlx::Error::Io(io)).is_transient());

        assert!(matches!(
            LedgerError::from(sqlx::Error::RowNotFound),
            LedgerError::NotFound(_)
        ));
        assert!(!LedgerError::from(sqlx::Error::Protocol("x".into())).to_string().is_empty());
        assert!(!LedgerError::Query("syntax".into()).is_transient());
    }
}
