//! Google Gemini generateContent 백엔드.

use crate::chat::{ChatBackend, ChatMessage, ChatRequest, ChatResponse, ToolCall};
use crate::error::{AiError, AiResult};
use arena_core::ProviderKind;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini 백엔드.
///
/// Gemini의 functionCall에는 호출 ID가 없으므로 `{name}-{index}` 형태로 부여합니다.
pub struct GeminiBackend {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(client: Client, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(&self, request: &ChatRequest) -> Value {
        let contents: Vec<Value> = request.messages.iter().map(encode_message).collect();
        let mut body = json!({
            "systemInstruction": { "parts": [{ "text": request.system }] },
            "contents": contents,
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            },
        });
        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }
        body
    }
}

fn encode_message(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::User(text) => json!({ "role": "user", "parts": [{ "text": text }] }),
        ChatMessage::Assistant { text, tool_calls } => {
            let mut parts = Vec::new();
            if let Some(text) = text {
                parts.push(json!({ "text": text }));
            }
            for call in tool_calls {
                parts.push(json!({
                    "functionCall": { "name": call.name, "args": call.arguments }
                }));
            }
            json!({ "role": "model", "parts": parts })
        }
        ChatMessage::ToolResult { name, content, .. } => json!({
            "role": "user",
            "parts": [{
                "functionResponse": {
                    "name": name,
                    "response": { "content": content },
                }
            }]
        }),
    }
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn chat(&self, request: &ChatRequest) -> AiResult<ChatResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        debug!(model = %self.model, "Sending Gemini generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.expose_secret())])
            .json(&self.build_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                provider: ProviderKind::Gemini,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Response = response.json().await?;
        let parts = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .ok_or_else(|| AiError::InvalidResponse("candidates가 비어 있습니다".to_string()))?;

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        for part in parts {
            if let Some(text) = part.text {
                texts.push(text);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall {
                    id: format!("{}-{}", call.name, tool_calls.len()),
                    name: call.name,
                    arguments: call.args,
                });
            }
        }

        let text = texts.join("");
        Ok(ChatResponse {
            text: (!text.trim().is_empty()).then_some(text),
            tool_calls,
        })
    }
}
