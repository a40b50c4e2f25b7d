//! AI 모델 및 제공자 구분.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ArenaError;

/// AI 제공자 백엔드.
///
/// 제공자마다 요청/응답 형식과 지원 기능이 다르며, 결정 제공자는 이 태그로
/// 백엔드를 선택합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OpenAI chat completions (GPT 계열)
    #[serde(rename = "openai")]
    OpenAi,
    /// OpenAI 추론 모델 (o 시리즈, OpenAI 키 공유)
    #[serde(rename = "openai_reasoning")]
    OpenAiReasoning,
    /// Anthropic messages API (Claude)
    #[serde(rename = "anthropic")]
    Anthropic,
    /// Google generateContent (Gemini)
    #[serde(rename = "gemini")]
    Gemini,
    /// DeepSeek (OpenAI 호환)
    #[serde(rename = "deepseek")]
    DeepSeek,
    /// xAI Grok (OpenAI 호환)
    #[serde(rename = "grok")]
    Grok,
}

impl ProviderKind {
    /// 모든 제공자.
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::OpenAi,
        ProviderKind::OpenAiReasoning,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::DeepSeek,
        ProviderKind::Grok,
    ];

    /// API 키를 읽을 환경 변수 이름을 반환합니다.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi | ProviderKind::OpenAiReasoning => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderKind::Grok => "XAI_API_KEY",
        }
    }

    /// 대체 환경 변수 이름 (있는 경우).
    pub fn api_key_fallback_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Gemini => Some("GOOGLE_API_KEY"),
            _ => None,
        }
    }

    /// 기본 벤더 모델 ID.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o",
            ProviderKind::OpenAiReasoning => "o3-mini",
            ProviderKind::Anthropic => "claude-3-5-sonnet-latest",
            ProviderKind::Gemini => "gemini-1.5-pro",
            ProviderKind::DeepSeek => "deepseek-chat",
            ProviderKind::Grok => "grok-2-latest",
        }
    }

    /// 도구 호출(function calling) 프로토콜 지원 여부.
    pub fn supports_tools(&self) -> bool {
        !matches!(self, ProviderKind::OpenAiReasoning)
    }

    /// OpenAI 호환 wire 형식 사용 여부.
    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            ProviderKind::OpenAi
                | ProviderKind::OpenAiReasoning
                | ProviderKind::DeepSeek
                | ProviderKind::Grok
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenAiReasoning => "openai_reasoning",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Grok => "grok",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            "openai_reasoning" | "o1" | "o3" => Ok(ProviderKind::OpenAiReasoning),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "grok" | "xai" => Ok(ProviderKind::Grok),
            _ => Err(ArenaError::InvalidInput(format!("알 수 없는 AI 제공자: {}", s))),
        }
    }
}

/// 아레나에 참가하는 AI 모델.
///
/// 생성 후 활성화 여부만 변경됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiModel {
    pub id: Uuid,
    /// 표시 이름 (예: "GPT-4o")
    pub name: String,
    pub provider: ProviderKind,
    /// 초기 자본 (KRW)
    pub initial_capital: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl AiModel {
    /// 새 활성 모델을 생성합니다.
    pub fn new(name: impl Into<String>, provider: ProviderKind, initial_capital: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            provider,
            initial_capital,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// 제공자별 기본 참가 모델 6종을 생성합니다.
    ///
    /// 데이터베이스 없이 실행할 때 인메모리 장부를 채우는 데 사용합니다.
    pub fn default_roster(initial_capital: Decimal) -> Vec<AiModel> {
        [
            ("GPT-4o", ProviderKind::OpenAi),
            ("o3-mini", ProviderKind::OpenAiReasoning),
            ("Claude", ProviderKind::Anthropic),
            ("Gemini", ProviderKind::Gemini),
            ("DeepSeek", ProviderKind::DeepSeek),
            ("Grok", ProviderKind::Grok),
        ]
        .into_iter()
        .map(|(name, provider)| AiModel::new(name, provider, initial_capital))
        .collect()
    }
}
