//! 벤더 공통 채팅 요청/응답 형태.
//!
//! 각 백엔드는 이 형태를 자기 wire 형식으로 변환합니다.

use crate::error::AiResult;
use arena_core::ProviderKind;
use async_trait::async_trait;
use serde_json::Value;

/// 모델에 노출하는 도구 정의.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema 객체
    pub parameters: Value,
}

/// 모델이 요청한 도구 호출.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// 벤더가 부여한 호출 ID (없으면 백엔드가 생성)
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// 대화 메시지.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    User(String),
    Assistant {
        text: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        content: Value,
    },
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        ChatMessage::User(text.into())
    }
}

/// 채팅 요청.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: vec![ChatMessage::user(user)],
            tools: Vec::new(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

/// 채팅 응답.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls,
        }
    }

    /// 이 응답을 대화 기록에 넣을 assistant 메시지로 변환합니다.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::Assistant {
            text: self.text.clone(),
            tool_calls: self.tool_calls.clone(),
        }
    }
}

/// 채팅 백엔드 트레이트.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 백엔드 제공자 종류.
    fn kind(&self) -> ProviderKind;

    /// 요청을 보내고 응답을 받습니다.
    async fn chat(&self, request: &ChatRequest) -> AiResult<ChatResponse>;
}
