//! Discord 알림 서비스.
//!
//! Discord Webhook으로 embed 메시지를 전송합니다.

use crate::types::{
    Notification, NotificationError, NotificationEvent, NotificationPriority, NotificationResult,
    NotificationSender,
};
use arena_core::TradeAction;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info, warn};

const COLOR_GREEN: u32 = 0x28a745;
const COLOR_RED: u32 = 0xdc3545;
const COLOR_ORANGE: u32 = 0xfd7e14;
const COLOR_BLUE: u32 = 0x007bff;

/// embed description 최대 길이.
const MAX_DESCRIPTION_LEN: usize = 4000;

/// Discord 알림 전송 설정.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Discord Webhook URL
    pub webhook_url: String,
    /// 표시 이름 (봇 이름으로 표시)
    pub display_name: Option<String>,
    /// 전송 활성화 여부
    pub enabled: bool,
}

impl DiscordConfig {
    /// 새 Discord 설정을 생성합니다.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            display_name: None,
            enabled: true,
        }
    }

    /// 표시 이름을 설정합니다.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// 환경 변수에서 설정을 생성합니다.
    pub fn from_env() -> Option<Self> {
        let webhook_url = std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())?;
        let display_name = std::env::var("DISCORD_DISPLAY_NAME").ok();
        let enabled = std::env::var("DISCORD_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self {
            webhook_url,
            display_name,
            enabled,
        })
    }
}

/// Discord 알림 전송기.
pub struct DiscordSender {
    config: DiscordConfig,
    client: reqwest::Client,
}

impl DiscordSender {
    /// 새 Discord 전송기를 생성합니다.
    pub fn new(config: DiscordConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        DiscordConfig::from_env().map(Self::new)
    }

    fn embed_color(notification: &Notification) -> u32 {
        match &notification.event {
            NotificationEvent::TradeExecuted { action, .. } => match action {
                TradeAction::Buy => COLOR_GREEN,
                TradeAction::Sell => COLOR_RED,
            },
            _ => match notification.priority {
                NotificationPriority::Critical => COLOR_RED,
                NotificationPriority::High => COLOR_ORANGE,
                NotificationPriority::Normal => COLOR_BLUE,
                NotificationPriority::Low => COLOR_GREEN,
            },
        }
    }

    /// 알림을 embed 객체로 변환합니다.
    fn build_embed(&self, notification: &Notification) -> serde_json::Value {
        let mut description = notification.event.body_lines().join("\n");
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            description = description.chars().take(MAX_DESCRIPTION_LEN).collect();
            description.push('…');
        }

        json!({
            "title": notification.event.title(),
            "description": description,
            "color": Self::embed_color(notification),
            "timestamp": notification.timestamp.to_rfc3339(),
            "footer": { "text": "AI Trading Arena" }
        })
    }

    async fn send_webhook(&self, embed: serde_json::Value) -> NotificationResult<()> {
        let mut payload = json!({
            "embeds": [embed],
        });

        if let Some(ref name) = self.config.display_name {
            payload["username"] = json!(name);
        }

        debug!("Sending Discord webhook message");

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            info!("Discord 알림 전송 완료");
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            warn!("Discord rate limited");
            return Err(NotificationError::RateLimited(60));
        }

        error!(%status, body = %body, "Discord webhook 전송 실패");
        Err(NotificationError::SendFailed(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl NotificationSender for DiscordSender {
    async fn send(&self, notification: &Notification) -> NotificationResult<()> {
        if !self.is_enabled() {
            debug!("Discord 알림이 비활성화되어 있습니다");
            return Ok(());
        }

        let embed = self.build_embed(notification);
        self.send_webhook(embed).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn name(&self) -> &str {
        "discord"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::{Currency, Market};
    use rust_decimal_macros::dec;

    fn sell_notification() -> Notification {
        Notification::new(NotificationEvent::TradeExecuted {
            model: "Claude".to_string(),
            ticker: "005930".to_string(),
            market: Market::KR,
            action: TradeAction::Sell,
            shares: dec!(5),
            price: dec!(71000),
            currency: Currency::KRW,
        })
    }

    #[test]
    fn test_embed_color_by_action() {
        let sender = DiscordSender::new(DiscordConfig::new("http://localhost"));
        let embed = sender.build_embed(&sell_notification());
        assert_eq!(embed["color"], COLOR_RED);
        assert_eq!(embed["title"], "매도 체결");
    }

    #[test]
    fn test_embed_description_truncated() {
        let sender = DiscordSender::new(DiscordConfig::new("http://localhost"));
        let long = "가".repeat(MAX_DESCRIPTION_LEN + 100);
        let embed = sender.build_embed(&Notification::custom("long", long));
        let description = embed["description"].as_str().unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_LEN + 1);
    }

    #[tokio::test]
    async fn test_send_webhook_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/webhook")
            .match_body(mockito::Matcher::PartialJson(json!({ "username": "Arena" })))
            .with_status(204)
            .create_async()
            .await;

        let config =
            DiscordConfig::new(format!("{}/webhook", server.url())).with_display_name("Arena");
        DiscordSender::new(config)
            .send(&sell_notification())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_failure_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/webhook")
            .with_status(400)
            .with_body("bad embed")
            .create_async()
            .await;

        let sender = DiscordSender::new(DiscordConfig::new(format!("{}/webhook", server.url())));
        let err = sender.send(&sell_notification()).await.unwrap_err();
        assert!(matches!(err, NotificationError::SendFailed(msg) if msg.contains("bad embed")));
    }
}
