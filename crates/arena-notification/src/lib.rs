//! # Arena Notification
//!
//! 트레이딩 라운드 결과와 시스템 이벤트를 채팅 채널로 전송합니다.
//!
//! 지원 채널:
//! - Telegram (Bot API)
//! - Discord (webhook)

pub mod discord;
pub mod manager;
pub mod telegram;
pub mod types;

pub use discord::*;
pub use manager::*;
pub use telegram::*;
pub use types::*;
