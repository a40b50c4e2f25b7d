//! # Arena Ledger
//!
//! 모델별 현금 잔고, 보유 종목, 거래/환전/관망 기록, 포트폴리오 히스토리를
//! 저장하는 장부 계층입니다.
//!
//! - `store` - `LedgerStore` 트레잇
//! - `postgres` - PostgreSQL(sqlx) 구현
//! - `memory` - 인메모리 구현 (테스트, DB 미설정 시)
//! - `retry` - 일시적 에러 재시도 정책
//! - `ledger` - 재시도와 기본값 처리를 감싼 `Ledger` façade

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod retry;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use retry::RetryPolicy;
pub use store::LedgerStore;

use std::sync::Arc;

use arena_core::{AiModel, DatabaseConfig};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// 인메모리 장부에 채울 모델별 초기 자본 (KRW).
pub const DEFAULT_INITIAL_CAPITAL: i64 = 10_000_000;

/// 환경에 맞는 저장소를 엽니다.
///
/// `database_url`이 있으면 PostgreSQL에 연결하고, 없으면 기본 모델 6종이 들어 있는
/// 인메모리 저장소를 반환합니다.
pub async fn open_store(
    database_url: Option<&str>,
    config: &DatabaseConfig,
) -> LedgerResult<Arc<dyn LedgerStore>> {
    match database_url {
        Some(url) => {
            let store = PgLedgerStore::connect(url, config).await?;
            if config.run_migrations {
                store.migrate().await?;
            }
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL 미설정, 인메모리 장부 사용 (재시작 시 초기화)");
            let store = MemoryLedgerStore::new();
            let capital = Decimal::from(DEFAULT_INITIAL_CAPITAL);
            for model in AiModel::default_roster(capital) {
                store.seed_model(model, capital, Decimal::ZERO).await;
            }
            info!("인메모리 장부에 기본 모델 등록 완료");
            Ok(Arc::new(store))
        }
    }
}
