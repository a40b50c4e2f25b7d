//! # Arena Data
//!
//! 시세, 환율, 종목 유니버스를 제공합니다.
//!
//! - `source` - 외부 시세 소스 (네이버, Finnhub, Yahoo)
//! - `mock` - 모든 소스 실패 시 사용하는 결정적 모의 시세
//! - `cache` - 값 + 조회 시각 + TTL을 가진 명시적 캐시
//! - `exchange` - USD/KRW 환율 소스
//! - `universe` - 시가총액 상위 종목 목록 소스
//! - `provider` - 위 구성 요소를 묶은 `QuoteProvider`
//!
//! `QuoteProvider`는 호출자에게 에러를 돌려주지 않습니다. 항상 실시간 또는 모의
//! 시세, 혹은 빈 컬렉션을 반환합니다.

pub mod cache;
pub mod error;
pub mod exchange;
pub mod mock;
pub mod provider;
pub mod source;
pub mod universe;

pub use cache::TtlCache;
pub use error::{QuoteError, QuoteResult};
pub use exchange::{ExchangeRateSource, OpenExchangeRateSource};
pub use provider::{MarketData, QuoteProvider};
pub use source::{FinnhubSource, NaverSource, QuoteSource, YahooChartSource};
pub use universe::{NaverUniverseSource, UniverseSource};

/// 외부 API 호출에 사용할 HTTP 클라이언트를 생성합니다.
pub fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent("Mozilla/5.0 (compatible; ai-trading-arena/0.1)")
        .build()
        .unwrap_or_default()
}

/// 쉼표/공백이 섞인 숫자 문자열을 Decimal로 파싱합니다.
pub(crate) fn parse_number(raw: &str) -> Option<rust_decimal::Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '+'))
        .collect();
    cleaned.parse().ok()
}
