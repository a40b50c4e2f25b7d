//! 외부 시세 소스.
//!
//! - `naver` - 네이버 실시간 폴링 API (KR)
//! - `finnhub` - Finnhub quote API (US, API 키 필요)
//! - `yahoo` - Yahoo chart API (KR/US 공통 폴백)

mod finnhub;
mod naver;
mod yahoo;

pub use finnhub::FinnhubSource;
pub use naver::NaverSource;
pub use yahoo::YahooChartSource;

use std::collections::HashMap;

use arena_core::{Market, Quote};
use async_trait::async_trait;
use futures::future::join_all;

use crate::error::QuoteResult;

/// 시세 소스 트레잇.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// 로그용 소스 이름.
    fn name(&self) -> &'static str;

    /// 해당 시장을 지원하는지 여부.
    fn supports(&self, market: Market) -> bool;

    /// 단일 종목 시세를 조회합니다.
    async fn fetch_quote(&self, ticker: &str, market: Market) -> QuoteResult<Quote>;

    /// 여러 종목을 조회합니다. 실패한 종목은 결과에서 빠집니다.
    ///
    /// 기본 구현은 종목별 요청을 동시에 보냅니다.
    async fn fetch_batch(&self, tickers: &[String], market: Market) -> HashMap<String, Quote> {
        let results = join_all(
            tickers
                .iter()
                .map(|ticker| async move { (ticker.clone(), self.fetch_quote(ticker, market).await) }),
        )
        .await;

        results
            .into_iter()
            .filter_map(|(ticker, result)| result.ok().map(|quote| (ticker, quote)))
            .collect()
    }
}
