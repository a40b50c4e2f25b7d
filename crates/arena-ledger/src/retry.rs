//! 일시적 에러 재시도 정책.

use std::future::Future;
use std::time::Duration;

use arena_core::DatabaseConfig;
use tracing::warn;

use crate::error::LedgerResult;

/// 선형 백오프 재시도 정책.
///
/// `n`번째 실패 후 `n × base_delay`만큼 기다립니다. `LedgerError::Transient`만
/// 재시도하며, 다른 에러는 즉시 반환합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최초 시도를 포함한 최대 시도 횟수
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    /// 재시도 없이 한 번만 시도합니다.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// `attempt`번째 실패 후 대기 시간.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// 작업을 실행하고, 일시적 에러면 정책에 따라 재시도합니다.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> LedgerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "일시적 저장소 에러, 재시도"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
