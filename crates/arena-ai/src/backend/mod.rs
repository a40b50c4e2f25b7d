//! 벤더별 채팅 백엔드.

mod anthropic;
mod gemini;
mod openai;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiCompatibleBackend;

use crate::chat::ChatBackend;
use arena_core::ProviderKind;
use secrecy::SecretString;
use std::sync::Arc;

/// 제공자 종류에 맞는 백엔드를 생성합니다.
pub fn build_backend(
    kind: ProviderKind,
    client: reqwest::Client,
    api_key: SecretString,
    model: &str,
) -> Arc<dyn ChatBackend> {
    match kind {
        ProviderKind::Anthropic => Arc::new(AnthropicBackend::new(client, api_key, model)),
        ProviderKind::Gemini => Arc::new(GeminiBackend::new(client, api_key, model)),
        ProviderKind::OpenAi
        | ProviderKind::OpenAiReasoning
        | ProviderKind::DeepSeek
        | ProviderKind::Grok => {
            Arc::new(OpenAiCompatibleBackend::new(kind, client, api_key, model))
        }
    }
}
