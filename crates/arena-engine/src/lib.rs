//! # Arena Engine
//!
//! 트레이딩 라운드 실행과 포트폴리오 기록을 담당합니다.
//!
//! - `executor` - 결정 하나를 장부에 반영 (환전, 매수, 매도)
//! - `orchestrator` - 활성 모델을 순회하는 트레이딩 라운드
//! - `valuation` - 주기적인 포트폴리오 평가 기록
//! - `history` - 히스토리 보정과 차트용 조회
//! - `scheduler` - 장 시간 기반 주기 실행
//! - `health` - 모델별 API 키/거래 현황 점검

pub mod executor;
pub mod health;
pub mod history;
pub mod metrics;
pub mod orchestrator;
pub mod rate_gate;
pub mod scheduler;
pub mod valuation;

pub use executor::{ExecutedTrade, TradeExecutor, TradeRejection};
pub use health::{AiHealthChecker, AiHealthReport, ModelHealth};
pub use history::{
    DailyCandle, GapFillReport, HistoryService, MigrationReport, ModelCandles, ModelSeries,
    SeriesPoint,
};
pub use orchestrator::{ActionOutcome, ModelAction, RoundReport, TradingOrchestrator};
pub use rate_gate::RateGate;
pub use scheduler::{Scheduler, TickReport};
pub use valuation::{PortfolioValuator, ValuationReport};
