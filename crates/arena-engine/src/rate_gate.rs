//! 최소 간격 게이트.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// 연속 호출 사이에 최소 간격을 보장합니다.
///
/// 첫 호출은 바로 통과하고, 이후 호출은 직전 통과 시각 + `min_interval`까지 대기합니다.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last_pass: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_pass: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 통과할 수 있을 때까지 대기합니다.
    pub async fn wait(&self) {
        let mut last = self.last_pass.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if Instant::now() < ready_at {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// 다음 호출이 바로 통과하도록 초기화합니다.
    pub async fn reset(&self) {
        *self.last_pass.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_pass_is_immediate() {
        let gate = RateGate::new(Duration::from_secs(1));
        let start = Instant::now();
        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforces_min_interval() {
        let gate = RateGate::new(Duration::from_secs(1));
        let start = Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_interval_elapsed() {
        let gate = RateGate::new(Duration::from_secs(1));
        gate.wait().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        let start = Instant::now();
        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        gate.reset().await;
        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
