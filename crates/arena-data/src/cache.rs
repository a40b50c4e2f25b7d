//! TTL 캐시.
//!
//! 값, 조회 시각, TTL을 함께 보관하는 단일 값 캐시입니다. `QuoteProvider`에
//! 주입되어 환율(60초)과 종목 유니버스(24시간)를 보관합니다.

use std::future::Future;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// 단일 값 TTL 캐시.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    entry: RwLock<Option<CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    /// 빈 캐시를 생성합니다.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// TTL 안에 있는 값을 반환합니다.
    pub async fn get(&self) -> Option<T> {
        let guard = self.entry.read().await;
        guard
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// 만료 여부와 관계없이 마지막 값을 반환합니다.
    pub async fn get_stale(&self) -> Option<T> {
        self.entry.read().await.as_ref().map(|entry| entry.value.clone())
    }

    /// 값을 저장하고 조회 시각을 갱신합니다.
    pub async fn set(&self, value: T) {
        *self.entry.write().await = Some(CacheEntry {
            value,
            fetched_at: Instant::now(),
        });
    }

    /// 캐시를 비웁니다.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }

    /// 신선한 값이 있으면 반환하고, 없으면 `fetch`로 갱신합니다.
    ///
    /// `fetch`가 실패하면 만료된 마지막 값을 반환하고, 그것도 없으면 에러를 돌려줍니다.
    pub async fn get_or_refresh<F, Fut, E>(&self, fetch: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get().await {
            return Ok(value);
        }

        match fetch().await {
            Ok(value) => {
                self.set(value.clone()).await;
                Ok(value)
            }
            Err(err) => match self.get_stale().await {
                Some(stale) => Ok(stale),
                None => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_value_expires_after_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.set(1380).await;
        assert_eq!(cache.get().await, Some(1380));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get().await, None);
        assert_eq!(cache.get_stale().await, Some(1380));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_only_when_stale() {
        let cache = TtlCache::new(Duration::from_secs(60));
        let mut calls = 0;

        let v: Result<i32, ()> = cache
            .get_or_refresh(|| {
                calls += 1;
                async { Ok(1) }
            })
            .await;
        assert_eq!(v, Ok(1));

        let v: Result<i32, ()> = cache
            .get_or_refresh(|| {
                calls += 1;
                async { Ok(2) }
            })
            .await;
        assert_eq!(v, Ok(1));
        assert_eq!(calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_falls_back_to_stale() {
        let cache = TtlCache::new(Duration::from_secs(1));
        cache.set(7).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let v: Result<i32, &str> = cache.get_or_refresh(|| async { Err("down") }).await;
        assert_eq!(v, Ok(7));

        cache.invalidate().await;
        let v: Result<i32, &str> = cache.get_or_refresh(|| async { Err("down") }).await;
        assert_eq!(v, Err("down"));
    }
}
