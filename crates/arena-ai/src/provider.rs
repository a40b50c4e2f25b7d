//! 결정 제공자.

use crate::backend::build_backend;
use crate::chat::{ChatBackend, ChatMessage, ChatRequest};
use crate::error::{AiError, AiResult};
use crate::keys::ApiKeys;
use crate::parse::parse_decision;
use crate::prompt::{system_prompt, user_prompt};
use crate::tools::{tool_specs, ToolExecutor, ToolOutcome};
use arena_core::{AiModel, CashBalance, Decision, Holding, Market, ProviderKind, Quote};
use arena_data::MarketData;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 결정 요청에 필요한 포트폴리오 상황.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub model: AiModel,
    pub market: Market,
    /// 해당 시장의 보유 종목
    pub holdings: Vec<Holding>,
    pub balance: CashBalance,
    /// USD/KRW
    pub exchange_rate: Decimal,
    pub candidates: Vec<Quote>,
}

/// 매매 결정 제공자 트레이트.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// 결정을 요청합니다. 키가 없거나 호출/파싱에 실패하면 `None`.
    async fn decide(&self, ctx: &DecisionContext) -> Option<Decision>;
}

/// LLM 백엔드를 사용하는 결정 제공자.
pub struct AiDecisionProvider {
    backends: HashMap<ProviderKind, Arc<dyn ChatBackend>>,
    market_data: Arc<dyn MarketData>,
    max_tool_turns: usize,
}

impl AiDecisionProvider {
    /// 백엔드 없이 생성합니다.
    pub fn new(market_data: Arc<dyn MarketData>, max_tool_turns: usize) -> Self {
        Self {
            backends: HashMap::new(),
            market_data,
            max_tool_turns: max_tool_turns.max(1),
        }
    }

    /// 사용 가능한 키가 있는 모든 제공자의 백엔드를 구성합니다.
    pub fn from_keys(
        keys: &ApiKeys,
        client: reqwest::Client,
        market_data: Arc<dyn MarketData>,
        max_tool_turns: usize,
    ) -> Self {
        let mut provider = Self::new(market_data, max_tool_turns);
        for kind in keys.configured() {
            if let Some(key) = keys.get(kind) {
                provider = provider.with_backend(build_backend(
                    kind,
                    client.clone(),
                    key.clone(),
                    kind.default_model(),
                ));
            }
        }
        info!(providers = ?keys.configured(), "AI decision backends configured");
        provider
    }

    /// 백엔드를 추가하거나 교체합니다.
    pub fn with_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    pub fn has_backend(&self, kind: ProviderKind) -> bool {
        self.backends.contains_key(&kind)
    }

    async fn decide_single_shot(
        &self,
        backend: &dyn ChatBackend,
        ctx: &DecisionContext,
    ) -> AiResult<Decision> {
        let request = ChatRequest::new(system_prompt(ctx.market, false), user_prompt(ctx));
        let response = backend.chat(&request).await?;
        let text = response
            .text
            .ok_or_else(|| AiError::InvalidResponse("응답 텍스트가 없습니다".to_string()))?;
        parse_decision(&text)
    }

    async fn decide_with_tools(
        &self,
        backend: &dyn ChatBackend,
        ctx: &DecisionContext,
    ) -> AiResult<Decision> {
        let executor = ToolExecutor::new(self.market_data.clone(), ctx.market);
        let mut request = ChatRequest::new(system_prompt(ctx.market, true), user_prompt(ctx))
            .with_tools(tool_specs());

        for turn in 1..=self.max_tool_turns {
            let response = backend.chat(&request).await?;

            if response.tool_calls.is_empty() {
                // 도구 없이 텍스트로 답한 경우 텍스트에서 결정을 찾습니다
                let text = response.text.ok_or_else(|| {
                    AiError::InvalidResponse("도구 호출도 텍스트도 없습니다".to_string())
                })?;
                return parse_decision(&text);
            }

            debug!(
                model = %ctx.model.name,
                turn,
                calls = response.tool_calls.len(),
                "Tool calls requested"
            );
            request.messages.push(response.to_message());

            for call in &response.tool_calls {
                match executor.execute(call).await {
                    ToolOutcome::Decision(decision) => return Ok(decision),
                    ToolOutcome::Output(content) => {
                        request.messages.push(ChatMessage::ToolResult {
                            call_id: call.id.clone(),
                            name: call.name.clone(),
                            content,
                        })
                    }
                }
            }
        }

        Err(AiError::TooManyTurns(self.max_tool_turns))
    }
}

#[async_trait]
impl DecisionProvider for AiDecisionProvider {
    async fn decide(&self, ctx: &DecisionContext) -> Option<Decision> {
        let kind = ctx.model.provider;
        let Some(backend) = self.backends.get(&kind) else {
            warn!(model = %ctx.model.name, provider = %kind, "{}", AiError::MissingKey(kind));
            return None;
        };

        let result = if kind.supports_tools() {
            self.decide_with_tools(backend.as_ref(), ctx).await
        } else {
            self.decide_single_shot(backend.as_ref(), ctx).await
        };

        match result {
            Ok(decision) => {
                info!(
                    model = %ctx.model.name,
                    market = %ctx.market,
                    action = %decision.action,
                    ticker = decision.ticker.as_deref().unwrap_or("-"),
                    "Decision received"
                );
                Some(decision)
            }
            Err(e) => {
                warn!(model = %ctx.model.name, market = %ctx.market, error = %e, "Decision request failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatResponse, ToolCall};
    use crate::tools::{GET_STOCK_QUOTE, MAKE_DECISION};
    use arena_core::{DecisionAction, DecisionOrigin, TickerInfo};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedMarket;

    #[async_trait]
    impl MarketData for FixedMarket {
        async fn quote(&self, ticker: &str, market: Market) -> Quote {
            Quote::new(ticker, market, dec!(190))
        }

        async fn quotes(&self, _tickers: &[String], _market: Market) -> HashMap<String, Quote> {
            HashMap::new()
        }

        async fn exchange_rate(&self) -> Decimal {
            dec!(1380)
        }

        async fn top_tickers(&self, market: Market) -> Vec<TickerInfo> {
            vec![TickerInfo::new("AAPL", "Apple", market)]
        }
    }

    /// 미리 정해진 응답을 순서대로 돌려주는 백엔드.
    struct ScriptedBackend {
        kind: ProviderKind,
        responses: Mutex<Vec<ChatResponse>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        fn new(kind: ProviderKind, mut responses: Vec<ChatResponse>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                kind,
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn chat(&self, request: &ChatRequest) -> AiResult<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AiError::InvalidResponse("script exhausted".to_string()))
        }
    }

    fn context(provider: ProviderKind) -> DecisionContext {
        let model = AiModel::new("test", provider, dec!(10000000));
        DecisionContext {
            balance: CashBalance::new(model.id, dec!(10000000), dec!(0)),
            model,
            market: Market::US,
            holdings: Vec::new(),
            exchange_rate: dec!(1380),
            candidates: Vec::new(),
        }
    }

    fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_missing_backend_returns_none() {
        let provider = AiDecisionProvider::new(Arc::new(FixedMarket), 5);
        assert!(provider.decide(&context(ProviderKind::Gemini)).await.is_none());
    }

    #[tokio::test]
    async fn test_single_shot_for_reasoning_models() {
        let backend = ScriptedBackend::new(
            ProviderKind::OpenAiReasoning,
            vec![ChatResponse::text(r#"{"action":"HOLD","reasoning":"flat"}"#)],
        );
        let provider =
            AiDecisionProvider::new(Arc::new(FixedMarket), 5).with_backend(backend.clone());

        let decision = provider
            .decide(&context(ProviderKind::OpenAiReasoning))
            .await
            .unwrap();
        assert_eq!(decision.action, DecisionAction::Hold);
        assert_eq!(decision.origin, DecisionOrigin::Prompt);
        assert!(backend.requests.lock().unwrap()[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_reply_returns_none() {
        let backend = ScriptedBackend::new(
            ProviderKind::OpenAiReasoning,
            vec![ChatResponse::text("I would rather not decide.")],
        );
        let provider = AiDecisionProvider::new(Arc::new(FixedMarket), 5).with_backend(backend);
        assert!(provider
            .decide(&context(ProviderKind::OpenAiReasoning))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_tool_loop_until_make_decision() {
        let backend = ScriptedBackend::new(
            ProviderKind::Anthropic,
            vec![
                ChatResponse::tools(vec![tool_call(
                    "t1",
                    GET_STOCK_QUOTE,
                    json!({ "ticker": "AAPL" }),
                )]),
                ChatResponse::tools(vec![tool_call(
                    "t2",
                    MAKE_DECISION,
                    json!({ "action": "BUY", "ticker": "AAPL", "shares": 2, "reasoning": "momentum" }),
                )]),
            ],
        );
        let provider =
            AiDecisionProvider::new(Arc::new(FixedMarket), 5).with_backend(backend.clone());

        let decision = provider
            .decide(&context(ProviderKind::Anthropic))
            .await
            .unwrap();
        assert_eq!(decision.ticker.as_deref(), Some("AAPL"));
        assert_eq!(decision.origin, DecisionOrigin::Tool);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        // 두 번째 요청에는 assistant 메시지와 도구 결과가 추가됩니다
        assert_eq!(requests[1].messages.len(), 3);
        assert!(matches!(
            &requests[1].messages[2],
            ChatMessage::ToolResult { call_id, .. } if call_id == "t1"
        ));
    }

    #[tokio::test]
    async fn test_tool_loop_text_fallback() {
        let backend = ScriptedBackend::new(
            ProviderKind::Grok,
            vec![ChatResponse::text(
                r#"Final: {"action":"SELL","ticker":"AAPL","shares":1,"reasoning":"take profit"}"#,
            )],
        );
        let provider = AiDecisionProvider::new(Arc::new(FixedMarket), 5).with_backend(backend);
        let decision = provider.decide(&context(ProviderKind::Grok)).await.unwrap();
        assert_eq!(decision.action, DecisionAction::Sell);
        assert_eq!(decision.origin, DecisionOrigin::Prompt);
    }

    #[tokio::test]
    async fn test_tool_loop_turn_limit() {
        let responses = (0..3)
            .map(|i| {
                ChatResponse::tools(vec![tool_call(
                    &format!("t{i}"),
                    GET_STOCK_QUOTE,
                    json!({ "ticker": "AAPL" }),
                )])
            })
            .collect();
        let backend = ScriptedBackend::new(ProviderKind::DeepSeek, responses);
        let provider =
            AiDecisionProvider::new(Arc::new(FixedMarket), 2).with_backend(backend.clone());

        assert!(provider.decide(&context(ProviderKind::DeepSeek)).await.is_none());
        assert_eq!(backend.requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_from_keys_builds_configured_backends() {
        let keys = ApiKeys::new()
            .with_key(ProviderKind::Anthropic, "sk-ant-REDACTED")
            .with_key(ProviderKind::Gemini, "short");
        let provider =
            AiDecisionProvider::from_keys(&keys, reqwest::Client::new(), Arc::new(FixedMarket), 5);
        assert!(provider.has_backend(ProviderKind::Anthropic));
        assert!(!provider.has_backend(ProviderKind::Gemini));
    }
}
