//! 아레나 도메인 모델.
//!
//! - `market` - 시장 및 통화
//! - `model` - AI 모델과 제공자 구분
//! - `ledger` - 잔고, 보유 종목, 거래/환전/관망 기록, 포트폴리오 히스토리
//! - `decision` - AI 매매 결정
//! - `quote` - 시세 스냅샷
//! - `valuation` - 평단가/평가금액 계산

pub mod decision;
pub mod ledger;
pub mod market;
pub mod model;
pub mod quote;
pub mod valuation;

pub use decision::*;
pub use ledger::*;
pub use market::*;
pub use model::*;
pub use quote::*;
pub use valuation::*;
