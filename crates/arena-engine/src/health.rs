//! 모델별 AI 상태 점검.

use arena_ai::{ApiKeys, KeyStatus};
use arena_core::{AiModel, ProviderKind};
use arena_ledger::Ledger;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

/// 한 모델의 상태.
#[derive(Debug, Clone, Serialize)]
pub struct ModelHealth {
    pub model_id: Uuid,
    pub model_name: String,
    pub provider: ProviderKind,
    /// 호출에 사용하는 기본 모델 ID
    pub model: &'static str,
    pub is_active: bool,
    pub key_status: KeyStatus,
    pub supports_tools: bool,
    pub trades_24h: u64,
    pub trades_7d: u64,
}

/// 전체 상태 점검 결과.
#[derive(Debug, Clone, Serialize)]
pub struct AiHealthReport {
    pub models: Vec<ModelHealth>,
    /// 키가 정상인 모델 수
    pub ready: usize,
    pub checked_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AiHealthChecker {
    ledger: Ledger,
    keys: ApiKeys,
}

impl AiHealthChecker {
    pub fn new(ledger: Ledger, keys: ApiKeys) -> Self {
        Self { ledger, keys }
    }

    /// 모든 모델을 동시에 점검합니다.
    pub async fn ai_health(&self) -> AiHealthReport {
        let now = Utc::now();
        let models = self.ledger.models().await;
        let models = join_all(models.iter().map(|m| self.check_model(m, now))).await;
        let ready = models.iter().filter(|m| m.key_status.is_present()).count();

        AiHealthReport {
            models,
            ready,
            checked_at: now,
        }
    }

    async fn check_model(&self, model: &AiModel, now: DateTime<Utc>) -> ModelHealth {
        let (trades_24h, trades_7d) = tokio::join!(
            self.ledger.trade_count_since(model.id, now - Duration::hours(24)),
            self.ledger.trade_count_since(model.id, now - Duration::days(7)),
        );

        ModelHealth {
            model_id: model.id,
            model_name: model.name.clone(),
            provider: model.provider,
            model: model.provider.default_model(),
            is_active: model.is_active,
            key_status: self.keys.status(model.provider),
            supports_tools: model.provider.supports_tools(),
            trades_24h,
            trades_7d,
        }
    }
}
