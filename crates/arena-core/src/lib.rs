//! # Arena Core
//!
//! AI 모델 모의투자 아레나의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 아레나 전반에서 사용되는 기본 타입을 제공합니다:
//! - 시장/통화 및 모델 정의
//! - 현금 잔고, 보유 종목, 거래/환전 기록
//! - 포트폴리오 히스토리 포인트
//! - AI 매매 결정 타입
//! - 장 운영 시간 계산 (KST 기준)
//! - 설정 관리
//! - 로깅 인프라

pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use calendar::*;
pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
