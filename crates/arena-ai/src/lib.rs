//! # Arena AI
//!
//! AI 모델에게 매매 결정을 요청합니다.
//!
//! - `keys` - 제공자별 API 키 로딩과 검증
//! - `chat` - 벤더 공통 요청/응답 형태와 `ChatBackend` 트레이트
//! - `backend` - OpenAI 호환, Anthropic, Gemini 구현
//! - `prompt` - 포트폴리오 상황을 설명하는 프롬프트
//! - `parse` - 응답 텍스트에서 결정 JSON 추출
//! - `tools` - 도구 호출 루프에서 쓰는 도구 정의와 실행기
//! - `provider` - `DecisionProvider` 트레이트와 기본 구현
//!
//! 결정 요청은 실패해도 에러를 돌려주지 않고 `None`이 됩니다.

pub mod backend;
pub mod chat;
pub mod error;
pub mod keys;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod tools;

pub use backend::{build_backend, AnthropicBackend, GeminiBackend, OpenAiCompatibleBackend};
pub use chat::{ChatBackend, ChatMessage, ChatRequest, ChatResponse, ToolCall, ToolSpec};
pub use error::{AiError, AiResult};
pub use keys::{ApiKeys, KeyStatus};
pub use parse::{extract_json_object, parse_decision};
pub use provider::{AiDecisionProvider, DecisionContext, DecisionProvider};
pub use tools::{ToolExecutor, ToolOutcome};
