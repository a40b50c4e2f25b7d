//! 시세 제공자.
//!
//! 여러 시세 소스를 순서대로 시도하고, 전부 실패하면 모의 시세로 대체합니다.
//! 환율과 종목 유니버스는 주입된 `TtlCache`에 보관합니다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use arena_core::{Market, Quote, QuoteConfig, TickerInfo};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::exchange::{ExchangeRateSource, OpenExchangeRateSource};
use crate::mock::mock_quote;
use crate::source::{FinnhubSource, NaverSource, QuoteSource, YahooChartSource};
use crate::universe::{fallback_tickers, NaverUniverseSource, UniverseSource};

/// 시장 데이터 조회 인터페이스.
///
/// 구현체는 호출자에게 에러를 돌려주지 않습니다.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// 단일 종목 시세 (실시간 또는 모의).
    async fn quote(&self, ticker: &str, market: Market) -> Quote;

    /// 여러 종목 시세. 모든 요청 종목이 결과에 포함됩니다.
    async fn quotes(&self, tickers: &[String], market: Market) -> HashMap<String, Quote>;

    /// USD/KRW 환율.
    async fn exchange_rate(&self) -> Decimal;

    /// 시가총액 상위 종목 목록.
    async fn top_tickers(&self, market: Market) -> Vec<TickerInfo>;

    /// 종목 코드나 이름으로 검색합니다 (대소문자 무시).
    async fn search(&self, query: &str, market: Market, limit: usize) -> Vec<TickerInfo> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.top_tickers(market)
            .await
            .into_iter()
            .filter(|t| {
                t.ticker.to_lowercase().contains(&needle) || t.name.to_lowercase().contains(&needle)
            })
            .take(limit)
            .collect()
    }
}

/// 시세 제공자가 사용하는 캐시 묶음.
#[derive(Debug)]
pub struct QuoteCaches {
    pub exchange_rate: TtlCache<Decimal>,
    pub kr_tickers: TtlCache<Vec<TickerInfo>>,
    pub us_tickers: TtlCache<Vec<TickerInfo>>,
}

impl QuoteCaches {
    /// 설정의 TTL로 빈 캐시를 생성합니다.
    pub fn from_config(config: &QuoteConfig) -> Self {
        let ticker_ttl = Duration::from_secs(config.ticker_list_ttl_secs);
        Self {
            exchange_rate: TtlCache::new(Duration::from_secs(config.exchange_rate_ttl_secs)),
            kr_tickers: TtlCache::new(ticker_ttl),
            us_tickers: TtlCache::new(ticker_ttl),
        }
    }

    fn tickers(&self, market: Market) -> &TtlCache<Vec<TickerInfo>> {
        match market {
            Market::KR => &self.kr_tickers,
            Market::US => &self.us_tickers,
        }
    }
}

/// 다중 소스 시세 제공자.
pub struct QuoteProvider {
    sources: Vec<Arc<dyn QuoteSource>>,
    rate_source: Arc<dyn ExchangeRateSource>,
    universe_source: Arc<dyn UniverseSource>,
    caches: QuoteCaches,
    batch_size: usize,
    fallback_rate: Decimal,
}

impl QuoteProvider {
    /// 구성 요소를 직접 주입해 생성합니다.
    pub fn new(
        sources: Vec<Arc<dyn QuoteSource>>,
        rate_source: Arc<dyn ExchangeRateSource>,
        universe_source: Arc<dyn UniverseSource>,
        caches: QuoteCaches,
        config: &QuoteConfig,
    ) -> Self {
        Self {
            sources,
            rate_source,
            universe_source,
            caches,
            batch_size: config.batch_size.max(1),
            fallback_rate: config.fallback_exchange_rate,
        }
    }

    /// 기본 외부 소스로 생성합니다.
    ///
    /// 순서: 네이버(KR) → Finnhub(US, 키가 있을 때) → Yahoo(공통).
    pub fn from_config(config: &QuoteConfig) -> Self {
        let client = crate::http_client(config.request_timeout_secs);

        let mut sources: Vec<Arc<dyn QuoteSource>> = vec![Arc::new(NaverSource::new(client.clone()))];
        match FinnhubSource::from_env(client.clone()) {
            Some(finnhub) => sources.push(Arc::new(finnhub)),
            None => info!("FINNHUB_API_KEY 미설정, US 시세는 Yahoo만 사용"),
        }
        sources.push(Arc::new(YahooChartSource::new(client.clone())));

        Self::new(
            sources,
            Arc::new(OpenExchangeRateSource::new(client.clone())),
            Arc::new(NaverUniverseSource::new(client)),
            QuoteCaches::from_config(config),
            config,
        )
    }

    fn sources_for(&self, market: Market) -> impl Iterator<Item = &Arc<dyn QuoteSource>> {
        self.sources.iter().filter(move |s| s.supports(market))
    }

    /// 한 묶음의 종목을 소스 순서대로 조회하고, 남은 종목은 모의 시세로 채웁니다.
    async fn fetch_chunk(&self, chunk: &[String], market: Market) -> HashMap<String, Quote> {
        let mut found: HashMap<String, Quote> = HashMap::with_capacity(chunk.len());
        let mut remaining: Vec<String> = chunk.to_vec();

        for source in self.sources_for(market) {
            if remaining.is_empty() {
                break;
            }
            let batch = source.fetch_batch(&remaining, market).await;
            for (ticker, quote) in batch {
                if quote.price > Decimal::ZERO {
                    found.insert(ticker, quote);
                }
            }
            remaining.retain(|t| !found.contains_key(t));
        }

        if !remaining.is_empty() {
            warn!(%market, count = remaining.len(), "시세 조회 실패 종목 모의 시세 사용");
            let now = Utc::now();
            for ticker in remaining {
                let quote = mock_quote(&ticker, market, now);
                found.insert(ticker, quote);
            }
        }

        found
    }
}

#[async_trait]
impl MarketData for QuoteProvider {
    async fn quote(&self, ticker: &str, market: Market) -> Quote {
        for source in self.sources_for(market) {
            match source.fetch_quote(ticker, market).await {
                Ok(quote) if quote.price > Decimal::ZERO => {
                    debug!(ticker, %market, source = source.name(), price = %quote.price, "시세 조회");
                    return quote;
                }
                Ok(_) => debug!(ticker, source = source.name(), "가격 0 응답, 다음 소스 시도"),
                Err(e) => debug!(ticker, source = source.name(), error = %e, "시세 소스 실패"),
            }
        }

        warn!(ticker, %market, "모든 시세 소스 실패, 모의 시세 사용");
        mock_quote(ticker, market, Utc::now())
    }

    async fn quotes(&self, tickers: &[String], market: Market) -> HashMap<String, Quote> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = tickers
            .iter()
            .filter(|t| seen.insert(t.as_str()))
            .cloned()
            .collect();
        if unique.is_empty() {
            return HashMap::new();
        }

        let chunks = unique.chunks(self.batch_size);
        let results = join_all(chunks.map(|chunk| self.fetch_chunk(chunk, market))).await;
        results.into_iter().flatten().collect()
    }

    async fn exchange_rate(&self) -> Decimal {
        let result = self
            .caches
            .exchange_rate
            .get_or_refresh(|| self.rate_source.usd_krw())
            .await;

        match result {
            Ok(rate) => rate,
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback_rate, "환율 조회 실패, 기본 환율 사용");
                self.fallback_rate
            }
        }
    }

    async fn top_tickers(&self, market: Market) -> Vec<TickerInfo> {
        let result = self
            .caches
            .tickers(market)
            .get_or_refresh(|| self.universe_source.top_tickers(market))
            .await;

        match result {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!(%market, error = %e, "종목 목록 조회 실패, 정적 목록 사용");
                fallback_tickers(market)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QuoteError, QuoteResult};
    use arena_core::QuoteOrigin;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 고정 가격을 돌려주고 배치 크기를 기록하는 소스.
    struct FixedSource {
        prices: HashMap<String, Decimal>,
        batch_sizes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl QuoteSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn supports(&self, _market: Market) -> bool {
            true
        }
        async fn fetch_quote(&self, ticker: &str, market: Market) -> QuoteResult<Quote> {
            self.prices
                .get(ticker)
                .map(|p| Quote::new(ticker, market, *p))
                .ok_or_else(|| QuoteError::NoData(ticker.to_string()))
        }
        async fn fetch_batch(&self, tickers: &[String], market: Market) -> HashMap<String, Quote> {
            self.batch_sizes.lock().unwrap().push(tickers.len());
            let mut out = HashMap::new();
            for t in tickers {
                if let Ok(q) = self.fetch_quote(t, market).await {
                    out.insert(t.clone(), q);
                }
            }
            out
        }
    }

    struct CountingRate {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ExchangeRateSource for CountingRate {
        async fn usd_krw(&self) -> QuoteResult<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(QuoteError::NoData("down".to_string()))
            } else {
                Ok(dec!(1400))
            }
        }
    }

    struct FailingUniverse;

    #[async_trait]
    impl UniverseSource for FailingUniverse {
        async fn top_tickers(&self, market: Market) -> QuoteResult<Vec<TickerInfo>> {
            Err(QuoteError::NoData(market.to_string()))
        }
    }

    fn provider(source: Arc<FixedSource>, rate: Arc<CountingRate>) -> QuoteProvider {
        let config = QuoteConfig::default();
        QuoteProvider::new(
            vec![source as Arc<dyn QuoteSource>],
            rate,
            Arc::new(FailingUniverse),
            QuoteCaches::from_config(&config),
            &config,
        )
    }

    fn fixed(prices: &[(&str, Decimal)]) -> Arc<FixedSource> {
        Arc::new(FixedSource {
            prices: prices.iter().map(|(t, p)| (t.to_string(), *p)).collect(),
            batch_sizes: Mutex::new(Vec::new()),
        })
    }

    fn rate(fail: bool) -> Arc<CountingRate> {
        Arc::new(CountingRate {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn test_quote_falls_back_to_mock() {
        let p = provider(fixed(&[("005930", dec!(70000))]), rate(false));

        let live = p.quote("005930", Market::KR).await;
        assert_eq!(live.price, dec!(70000));
        assert_eq!(live.origin, QuoteOrigin::Live);

        let mock = p.quote("999999", Market::KR).await;
        assert_eq!(mock.origin, QuoteOrigin::Mock);
        assert!(mock.price > Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_batch_chunks_of_eight() {
        let tickers: Vec<String> = (0..20).map(|i| format!("{:06}", i)).collect();
        let prices: Vec<(&str, Decimal)> = tickers.iter().map(|t| (t.as_str(), dec!(1000))).collect();
        let source = fixed(&prices);
        let p = provider(source.clone(), rate(false));

        let quotes = p.quotes(&tickers, Market::KR).await;
        assert_eq!(quotes.len(), 20);

        let mut sizes = source.batch_sizes.lock().unwrap().clone();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![4, 8, 8]);
    }

    #[tokio::test]
    async fn test_batch_fills_missing_with_mock() {
        let p = provider(fixed(&[("AAPL", dec!(190))]), rate(false));
        let tickers = vec!["AAPL".to_string(), "ZZZZ".to_string(), "AAPL".to_string()];

        let quotes = p.quotes(&tickers, Market::US).await;
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["AAPL"].origin, QuoteOrigin::Live);
        assert_eq!(quotes["ZZZZ"].origin, QuoteOrigin::Mock);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exchange_rate_cached_for_ttl() {
        let counter = rate(false);
        let p = provider(fixed(&[]), counter.clone());

        assert_eq!(p.exchange_rate().await, dec!(1400));
        assert_eq!(p.exchange_rate().await, dec!(1400));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        p.exchange_rate().await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exchange_rate_fallback_constant() {
        let p = provider(fixed(&[]), rate(true));
        assert_eq!(p.exchange_rate().await, dec!(1380));
    }

    #[tokio::test]
    async fn test_universe_fallback_and_search() {
        let p = provider(fixed(&[]), rate(false));
        assert_eq!(p.top_tickers(Market::KR).await.len(), 20);

        let found = p.search("삼성", Market::KR, 3).await;
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|t| t.name.contains("삼성")));

        let found = p.search("nvda", Market::US, 5).await;
        assert_eq!(found[0].ticker, "NVDA");
        assert!(p.search("  ", Market::US, 5).await.is_empty());
    }
}
