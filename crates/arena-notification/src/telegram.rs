//! 텔레그램 알림 서비스.
//!
//! Telegram Bot API `sendMessage`로 라운드 결과와 오류를 전송합니다.

use crate::types::{
    Notification, NotificationError, NotificationPriority, NotificationResult, NotificationSender,
};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// 텔레그램 알림 전송 설정.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// @BotFather에서 받은 봇 토큰
    pub bot_token: String,
    /// 메시지를 보낼 채팅 ID
    pub chat_id: String,
    /// 전송 활성화 여부
    pub enabled: bool,
    /// 파싱 모드 (HTML 또는 MarkdownV2)
    pub parse_mode: String,
    /// Bot API 주소
    pub api_base: String,
}

impl TelegramConfig {
    /// 새 텔레그램 설정을 생성합니다.
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            enabled: true,
            parse_mode: "HTML".to_string(),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// 환경 변수에서 설정을 생성합니다.
    ///
    /// 토큰이나 채팅 ID가 비어 있으면 `None`.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty())?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())?;
        let enabled = std::env::var("TELEGRAM_ENABLED")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(true);

        Some(Self {
            enabled,
            ..Self::new(bot_token, chat_id)
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

/// 텔레그램 알림 전송기.
pub struct TelegramSender {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramSender {
    /// 새 텔레그램 전송기를 생성합니다.
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 환경 변수에서 전송기를 생성합니다.
    pub fn from_env() -> Option<Self> {
        TelegramConfig::from_env().map(Self::new)
    }

    /// 알림을 텔레그램 HTML 메시지로 포맷합니다.
    fn format_message(&self, notification: &Notification) -> String {
        let priority_emoji = match notification.priority {
            NotificationPriority::Low => "ℹ️",
            NotificationPriority::Normal => "📊",
            NotificationPriority::High => "⚠️",
            NotificationPriority::Critical => "🚨",
        };

        let title = escape_html(&notification.event.title());
        let body = notification
            .event
            .body_lines()
            .iter()
            .map(|line| escape_html(line))
            .collect::<Vec<_>>()
            .join("\n");

        format!("{priority_emoji} <b>{title}</b>\n\n{body}")
    }

    async fn send_message(&self, text: &str) -> NotificationResult<()> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.bot_token
        );

        let params = serde_json::json!({
            "chat_id": self.config.chat_id,
            "text": text,
            "parse_mode": self.config.parse_mode,
            "disable_web_page_preview": true,
        });

        debug!(chat_id = %self.config.chat_id, "Sending Telegram message");

        let response = self.client.post(&url).json(&params).send().await?;

        if response.status().is_success() {
            info!("Telegram notification sent");
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        // 요청 한도 제한 확인
        if status.as_u16() == 429 {
            warn!("Telegram rate limited");
            return Err(NotificationError::RateLimited(60));
        }

        error!(%status, body = %body, "Failed to send Telegram message");
        Err(NotificationError::SendFailed(format!("HTTP {status}: {body}")))
    }
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn send(&self, notification: &Notification) -> NotificationResult<()> {
        if !self.config.enabled {
            debug!("Telegram notifications disabled");
            return Ok(());
        }

        let message = self.format_message(notification);
        self.send_message(&message).await
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

/// HTML parse_mode에서 예약된 문자를 이스케이프합니다.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationEvent;
    use arena_core::{Currency, Market, TradeAction};
    use rust_decimal_macros::dec;

    fn trade_notification() -> Notification {
        Notification::new(NotificationEvent::TradeExecuted {
            model: "GPT-4o".to_string(),
            ticker: "AAPL".to_string(),
            market: Market::US,
            action: TradeAction::Buy,
            shares: dec!(3),
            price: dec!(190.5),
            currency: Currency::USD,
        })
    }

    #[test]
    fn test_format_trade() {
        let sender = TelegramSender::new(TelegramConfig::new("token", "123456"));
        let message = sender.format_message(&trade_notification());
        assert!(message.contains("<b>매수 체결</b>"));
        assert!(message.contains("AAPL"));
        assert!(message.contains("571.5 USD"));
    }

    #[test]
    fn test_format_escapes_html() {
        let sender = TelegramSender::new(TelegramConfig::new("token", "123456"));
        let message = sender.format_message(&Notification::custom("a<b>", "x & y"));
        assert!(message.contains("a&lt;b&gt;"));
        assert!(message.contains("x &amp; y"));
    }

    #[tokio::test]
    async fn test_send_posts_to_bot_api() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bottoken/sendMessage")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "chat_id": "123456",
                "parse_mode": "HTML"
            })))
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let sender =
            TelegramSender::new(TelegramConfig::new("token", "123456").with_api_base(server.url()));
        sender.send(&trade_notification()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/bottoken/sendMessage")
            .with_status(429)
            .create_async()
            .await;

        let sender =
            TelegramSender::new(TelegramConfig::new("token", "1").with_api_base(server.url()));
        let err = sender.send(&trade_notification()).await.unwrap_err();
        assert!(matches!(err, NotificationError::RateLimited(60)));
    }

    #[tokio::test]
    async fn test_disabled_sender_is_noop() {
        let mut config = TelegramConfig::new("token", "1").with_api_base("http://127.0.0.1:1");
        config.enabled = false;
        let sender = TelegramSender::new(config);
        assert!(!sender.is_enabled());
        sender.send(&trade_notification()).await.unwrap();
    }
}
