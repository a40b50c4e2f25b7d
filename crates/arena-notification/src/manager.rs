//! 여러 채널로 알림을 동시에 전송하는 관리자.

use crate::discord::DiscordSender;
use crate::telegram::TelegramSender;
use crate::types::{Notification, NotificationError, NotificationResult, NotificationSender};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 알림 관리자.
///
/// 등록된 전송기 중 활성화된 것들로 동시에 전송합니다. 개별 채널 실패는
/// 로그로 남기며, 모든 채널이 실패한 경우에만 에러를 반환합니다.
#[derive(Clone, Default)]
pub struct NotificationManager {
    senders: Vec<Arc<dyn NotificationSender>>,
}

impl NotificationManager {
    /// 빈 관리자를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 환경 변수에 설정된 채널로 관리자를 구성합니다.
    pub fn from_env() -> Self {
        let mut manager = Self::new();
        if let Some(telegram) = TelegramSender::from_env() {
            manager.add_sender(Arc::new(telegram));
        }
        if let Some(discord) = DiscordSender::from_env() {
            manager.add_sender(Arc::new(discord));
        }
        info!(channels = ?manager.channels(), "Notification channels configured");
        manager
    }

    /// 전송기를 추가합니다.
    pub fn add_sender(&mut self, sender: Arc<dyn NotificationSender>) {
        self.senders.push(sender);
    }

    /// 활성화된 채널 이름 목록.
    pub fn channels(&self) -> Vec<String> {
        self.senders
            .iter()
            .filter(|s| s.is_enabled())
            .map(|s| s.name().to_string())
            .collect()
    }

    pub fn has_channels(&self) -> bool {
        self.senders.iter().any(|s| s.is_enabled())
    }

    /// 모든 활성 채널로 알림을 전송합니다.
    pub async fn notify(&self, notification: &Notification) -> NotificationResult<()> {
        let enabled: Vec<_> = self.senders.iter().filter(|s| s.is_enabled()).collect();
        if enabled.is_empty() {
            debug!("No notification channels enabled, skipping");
            return Ok(());
        }

        let results = join_all(enabled.iter().map(|s| s.send(notification))).await;

        let mut failures = Vec::new();
        for (sender, result) in enabled.iter().zip(results) {
            if let Err(e) = result {
                warn!(channel = sender.name(), error = %e, "Notification send failed");
                failures.push(format!("{}: {e}", sender.name()));
            }
        }

        if failures.len() == enabled.len() {
            return Err(NotificationError::SendFailed(failures.join("; ")));
        }
        Ok(())
    }

    /// 결과를 무시하고 전송합니다. 트레이딩 흐름에서 사용합니다.
    pub async fn notify_quietly(&self, notification: Notification) {
        if let Err(e) = self.notify(&notification).await {
            warn!(error = %e, "All notification channels failed");
        }
    }
}

impl std::fmt::Debug for NotificationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationManager")
            .field("channels", &self.channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingSender {
        name: &'static str,
        enabled: bool,
        fail: bool,
        sent: AtomicUsize,
    }

    impl RecordingSender {
        fn new(name: &'static str, enabled: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                enabled,
                fail,
                sent: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, _notification: &Notification) -> NotificationResult<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotificationError::SendFailed("down".to_string()))
            } else {
                Ok(())
            }
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    #[tokio::test]
    async fn test_fan_out_skips_disabled() {
        let a = RecordingSender::new("a", true, false);
        let b = RecordingSender::new("b", false, false);
        let mut manager = NotificationManager::new();
        manager.add_sender(a.clone());
        manager.add_sender(b.clone());

        manager
            .notify(&Notification::custom("t", "m"))
            .await
            .unwrap();
        assert_eq!(a.sent.load(Ordering::SeqCst), 1);
        assert_eq!(b.sent.load(Ordering::SeqCst), 0);
        assert_eq!(manager.channels(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_partial_failure_is_ok() {
        let ok = RecordingSender::new("ok", true, false);
        let bad = RecordingSender::new("bad", true, true);
        let mut manager = NotificationManager::new();
        manager.add_sender(ok.clone());
        manager.add_sender(bad.clone());

        assert!(manager.notify(&Notification::custom("t", "m")).await.is_ok());
        assert_eq!(bad.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_failed_is_error() {
        let mut manager = NotificationManager::new();
        manager.add_sender(RecordingSender::new("x", true, true));
        manager.add_sender(RecordingSender::new("y", true, true));

        let err = manager
            .notify(&Notification::custom("t", "m"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("x: "));
    }

    #[tokio::test]
    async fn test_no_channels_is_noop() {
        let manager = NotificationManager::new();
        assert!(!manager.has_channels());
        manager.notify_quietly(Notification::custom("t", "m")).await;
    }
}
