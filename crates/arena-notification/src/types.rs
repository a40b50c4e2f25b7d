//! 알림 타입 및 전송기 트레이트.

use arena_core::{Currency, Market, TradeAction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 알림 우선순위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// 라운드 요약에 포함되는 모델별 한 줄.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummaryLine {
    /// 모델 표시 이름
    pub model: String,
    /// BUY / SELL / HOLD / SKIP / FAILED
    pub outcome: String,
    /// 사람이 읽을 수 있는 상세 (예: "005930 10주 @ 70000")
    pub detail: String,
}

impl ModelSummaryLine {
    pub fn new(
        model: impl Into<String>,
        outcome: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            outcome: outcome.into(),
            detail: detail.into(),
        }
    }
}

/// 알림 이벤트.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// 트레이딩 라운드 완료
    RoundCompleted {
        market: Market,
        trades_executed: usize,
        holds: usize,
        skipped: usize,
        failed: usize,
        lines: Vec<ModelSummaryLine>,
    },
    /// 개별 체결
    TradeExecuted {
        model: String,
        ticker: String,
        market: Market,
        action: TradeAction,
        shares: Decimal,
        price: Decimal,
        currency: Currency,
    },
    /// 포트폴리오 가치 기록 결과
    ValuationRecorded { recorded: usize, total: usize },
    /// 시스템 오류
    SystemError { component: String, message: String },
    /// 사용자 정의 메시지
    Custom { title: String, message: String },
}

impl NotificationEvent {
    /// 이벤트 제목.
    pub fn title(&self) -> String {
        match self {
            Self::RoundCompleted { market, .. } => format!("{market} 트레이딩 라운드 완료"),
            Self::TradeExecuted { action, .. } => match action {
                TradeAction::Buy => "매수 체결".to_string(),
                TradeAction::Sell => "매도 체결".to_string(),
            },
            Self::ValuationRecorded { .. } => "포트폴리오 가치 기록".to_string(),
            Self::SystemError { component, .. } => format!("시스템 오류 ({component})"),
            Self::Custom { title, .. } => title.clone(),
        }
    }

    /// 서식 없는 본문 줄 목록.
    ///
    /// 전송기는 이 줄들에 채널별 서식(HTML, embed)을 입힙니다.
    pub fn body_lines(&self) -> Vec<String> {
        match self {
            Self::RoundCompleted {
                trades_executed,
                holds,
                skipped,
                failed,
                lines,
                ..
            } => {
                let mut out = vec![format!(
                    "체결 {trades_executed} / 보류 {holds} / 건너뜀 {skipped} / 실패 {failed}"
                )];
                out.extend(
                    lines
                        .iter()
                        .map(|l| format!("{}: {} {}", l.model, l.outcome, l.detail).trim_end().to_string()),
                );
                out
            }
            Self::TradeExecuted {
                model,
                ticker,
                market,
                shares,
                price,
                currency,
                ..
            } => vec![
                format!("모델: {model}"),
                format!("종목: {ticker} ({market})"),
                format!("수량: {shares}"),
                format!("가격: {price} {currency}"),
                format!("금액: {} {currency}", (shares * price).round_dp(2)),
            ],
            Self::ValuationRecorded { recorded, total } => {
                vec![format!("{recorded}/{total} 모델 기록 완료")]
            }
            Self::SystemError { message, .. } => vec![message.clone()],
            Self::Custom { message, .. } => vec![message.clone()],
        }
    }

    /// 이벤트 성격에 따른 기본 우선순위.
    pub fn default_priority(&self) -> NotificationPriority {
        match self {
            Self::SystemError { .. } => NotificationPriority::Critical,
            Self::ValuationRecorded { recorded, total } if *recorded == 0 && *total > 0 => {
                NotificationPriority::High
            }
            Self::RoundCompleted { failed, .. } if *failed > 0 => NotificationPriority::High,
            Self::TradeExecuted { .. } => NotificationPriority::Normal,
            _ => NotificationPriority::Low,
        }
    }
}

/// 전송 가능한 알림.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub event: NotificationEvent,
    pub priority: NotificationPriority,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// 이벤트의 기본 우선순위로 알림을 생성합니다.
    pub fn new(event: NotificationEvent) -> Self {
        let priority = event.default_priority();
        Self {
            id: Uuid::new_v4(),
            event,
            priority,
            timestamp: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn custom(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationEvent::Custom {
            title: title.into(),
            message: message.into(),
        })
    }

    pub fn system_error(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationEvent::SystemError {
            component: component.into(),
            message: message.into(),
        })
    }
}

/// 알림 에러.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("전송 실패: {0}")]
    SendFailed(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("요청 한도 초과, {0}초 후 재시도")]
    RateLimited(u64),

    #[error("네트워크 에러: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type NotificationResult<T> = Result<T, NotificationError>;

/// 알림 전송기 트레이트.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 알림을 전송합니다.
    async fn send(&self, notification: &Notification) -> NotificationResult<()>;

    /// 전송기 활성화 여부.
    fn is_enabled(&self) -> bool;

    /// 채널 이름 (로그 및 /api/info 용).
    fn name(&self) -> &str;
}
