//! OpenAI chat completions 형식 백엔드.
//!
//! OpenAI, OpenAI reasoning(o 계열), DeepSeek, Grok이 같은 wire 형식을
//! 사용하며 base URL만 다릅니다.

use crate::chat::{ChatBackend, ChatMessage, ChatRequest, ChatResponse, ToolCall};
use crate::error::{AiError, AiResult};
use arena_core::ProviderKind;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEEPSEEK_BASE: &str = "https://api.deepseek.com/v1";
const XAI_BASE: &str = "https://api.x.ai/v1";

/// OpenAI 호환 백엔드.
pub struct OpenAiCompatibleBackend {
    kind: ProviderKind,
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiCompatibleBackend {
    /// 제공자 종류에 맞는 기본 base URL로 생성합니다.
    pub fn new(kind: ProviderKind, client: Client, api_key: SecretString, model: impl Into<String>) -> Self {
        let base_url = match kind {
            ProviderKind::DeepSeek => DEEPSEEK_BASE,
            ProviderKind::Grok => XAI_BASE,
            _ => OPENAI_BASE,
        };
        Self {
            kind,
            client,
            api_key,
            model: model.into(),
            base_url: base_url.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn is_reasoning(&self) -> bool {
        matches!(self.kind, ProviderKind::OpenAiReasoning)
    }

    fn build_body(&self, request: &ChatRequest) -> Value {
        // reasoning 모델은 system 역할 대신 developer 역할을 씁니다
        let system_role = if self.is_reasoning() { "developer" } else { "system" };
        let mut messages = vec![json!({ "role": system_role, "content": request.system })];
        messages.extend(request.messages.iter().map(encode_message));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });

        if self.is_reasoning() {
            body["max_completion_tokens"] = json!(request.max_tokens * 4);
        } else {
            body["max_tokens"] = json!(request.max_tokens);
            body["temperature"] = json!(request.temperature);
        }

        if !request.tools.is_empty() && self.kind.supports_tools() {
            body["tools"] = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
        }
        body
    }
}

fn encode_message(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::User(text) => json!({ "role": "user", "content": text }),
        ChatMessage::Assistant { text, tool_calls } => {
            let mut value = json!({ "role": "assistant", "content": text });
            if !tool_calls.is_empty() {
                value["tool_calls"] = tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": {
                                "name": c.name,
                                "arguments": c.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
            }
            value
        }
        ChatMessage::ToolResult {
            call_id, content, ..
        } => json!({
            "role": "tool",
            "tool_call_id": call_id,
            "content": content.to_string(),
        }),
    }
}

#[derive(Deserialize)]
struct Response {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ResponseToolCall>,
}

#[derive(Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Deserialize)]
struct ResponseFunction {
    name: String,
    /// JSON 인코딩된 문자열
    arguments: String,
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn chat(&self, request: &ChatRequest) -> AiResult<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(provider = %self.kind, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.build_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                provider: self.kind,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Response = response.json().await?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AiError::InvalidResponse("choices가 비어 있습니다".to_string()))?;

        let tool_calls = message
            .tool_calls
            .into_iter()
            .map(|c| ToolCall {
                arguments: serde_json::from_str(&c.function.arguments)
                    .unwrap_or(Value::Object(Default::default())),
                id: c.id,
                name: c.function.name,
            })
            .collect();

        Ok(ChatResponse {
            text: message.content.filter(|t| !t.trim().is_empty()),
            tool_calls,
        })
    }
}
