//! Anthropic Messages API 백엔드.

use crate::chat::{ChatBackend, ChatMessage, ChatRequest, ChatResponse, ToolCall};
use crate::error::{AiError, AiResult};
use arena_core::ProviderKind;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const API_BASE: &str = "https://api.anthropic.com";

/// API version header value.
const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude 백엔드.
pub struct AnthropicBackend {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl AnthropicBackend {
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
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": encode_messages(&request.messages),
        });
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
        }
        body
    }
}

/// 연속된 도구 결과는 하나의 user 메시지로 묶습니다.
fn encode_messages(messages: &[ChatMessage]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    let mut pending_results: Vec<Value> = Vec::new();

    let flush = |out: &mut Vec<Value>, pending: &mut Vec<Value>| {
        if !pending.is_empty() {
            out.push(json!({ "role": "user", "content": std::mem::take(pending) }));
        }
    };

    for message in messages {
        match message {
            ChatMessage::ToolResult {
                call_id, content, ..
            } => pending_results.push(json!({
                "type": "tool_result",
                "tool_use_id": call_id,
                "content": content.to_string(),
            })),
            ChatMessage::User(text) => {
                flush(&mut out, &mut pending_results);
                out.push(json!({ "role": "user", "content": text }));
            }
            ChatMessage::Assistant { text, tool_calls } => {
                flush(&mut out, &mut pending_results);
                let mut blocks = Vec::new();
                if let Some(text) = text {
                    blocks.push(json!({ "type": "text", "text": text }));
                }
                for call in tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                out.push(json!({ "role": "assistant", "content": blocks }));
            }
        }
    }
    flush(&mut out, &mut pending_results);
    out
}

#[derive(Deserialize)]
struct Response {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn chat(&self, request: &ChatRequest) -> AiResult<ChatResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %self.model, "Sending Anthropic messages request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&self.build_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                provider: ProviderKind::Anthropic,
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Response = response.json().await?;
        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                ContentBlock::Text { text } => texts.push(text),
                ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input,
                }),
                ContentBlock::Other => {}
            }
        }

        let text = texts.join("");
        Ok(ChatResponse {
            text: (!text.trim().is_empty()).then_some(text),
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> AnthropicBackend {
        AnthropicBackend::new(
            Client::new(),
            SecretString::from("sk-ant-test-0123456789"),
            "claude-3-5-sonnet-latest",
        )
        .with_base_url(base)
    }

    #[test]
    fn test_tool_results_grouped_into_one_user_message() {
        let messages = vec![
            ChatMessage::user("hi"),
            ChatMessage::Assistant {
                text: Some("checking".to_string()),
                tool_calls: vec![
                    ToolCall {
                        id: "tu_1".to_string(),
                        name: "get_stock_quote".to_string(),
                        arguments: json!({ "ticker": "AAPL" }),
                    },
                    ToolCall {
                        id: "tu_2".to_string(),
                        name: "get_stock_quote".to_string(),
                        arguments: json!({ "ticker": "MSFT" }),
                    },
                ],
            },
            ChatMessage::ToolResult {
                call_id: "tu_1".to_string(),
                name: "get_stock_quote".to_string(),
                content: json!({ "price": "190" }),
            },
            ChatMessage::ToolResult {
                call_id: "tu_2".to_string(),
                name: "get_stock_quote".to_string(),
                content: json!({ "price": "410" }),
            },
        ];

        let encoded = encode_messages(&messages);
        assert_eq!(encoded.len(), 3);
        assert_eq!(encoded[1]["content"][1]["type"], "tool_use");
        assert_eq!(encoded[2]["role"], "user");
        assert_eq!(encoded[2]["content"].as_array().unwrap().len(), 2);
        assert_eq!(encoded[2]["content"][1]["tool_use_id"], "tu_2");
    }

    #[tokio::test]
    async fn test_chat_parses_blocks() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-test-0123456789")
            .match_header("anthropic-version", API_VERSION)
            .with_status(200)
            .with_body(
                r#"{"id":"msg_1","type":"message","role":"assistant","content":[
                {"type":"thinking","thinking":"..."},
                {"type":"text","text":"Let me look."},
                {"type":"tool_use","id":"tu_1","name":"get_top_stocks","input":{"limit":5}}
                ],"stop_reason":"tool_use"}"#,
            )
            .create_async()
            .await;

        let response = backend(&server.url())
            .chat(&ChatRequest::new("sys", "hi"))
            .await
            .unwrap();
        assert_eq!(response.text.as_deref(), Some("Let me look."));
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].arguments["limit"], 5);
    }
}
