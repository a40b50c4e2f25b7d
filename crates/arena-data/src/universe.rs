//! 종목 유니버스 (시가총액 상위 종목).
//!
//! 네이버 증권 시가총액 순위 API에서 가져오며, 실패하면 정적 목록을 사용합니다.

use arena_core::{Market, TickerInfo};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{QuoteError, QuoteResult};

const KR_BASE_URL: &str = "https://m.stock.naver.com";
const US_BASE_URL: &str = "https://api.stock.naver.com";
const PAGE_SIZE: usize = 50;

/// 종목 유니버스 소스 트레잇.
#[async_trait]
pub trait UniverseSource: Send + Sync {
    /// 시가총액 상위 종목 목록을 조회합니다.
    async fn top_tickers(&self, market: Market) -> QuoteResult<Vec<TickerInfo>>;
}

#[derive(Debug, Deserialize)]
struct MarketValueResponse {
    #[serde(default)]
    stocks: Vec<MarketValueItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketValueItem {
    #[serde(alias = "symbolCode")]
    item_code: String,
    #[serde(default)]
    stock_name: Option<String>,
    #[serde(default)]
    stock_name_eng: Option<String>,
}

/// 네이버 증권 시가총액 순위 소스.
#[derive(Debug, Clone)]
pub struct NaverUniverseSource {
    client: Client,
    kr_base_url: String,
    us_base_url: String,
}

impl NaverUniverseSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            kr_base_url: KR_BASE_URL.to_string(),
            us_base_url: US_BASE_URL.to_string(),
        }
    }

    /// 두 기본 URL을 같은 값으로 바꿉니다 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        self.kr_base_url = base.clone();
        self.us_base_url = base;
        self
    }

    fn url(&self, market: Market) -> String {
        match market {
            Market::KR => format!("{}/api/stocks/marketValue/KOSPI", self.kr_base_url),
            Market::US => format!("{}/stock/exchange/NASDAQ/marketValue", self.us_base_url),
        }
    }
}

#[async_trait]
impl UniverseSource for NaverUniverseSource {
    async fn top_tickers(&self, market: Market) -> QuoteResult<Vec<TickerInfo>> {
        let page_size = PAGE_SIZE.to_string();
        let response = self
            .client
            .get(self.url(market))
            .query(&[("page", "1"), ("pageSize", page_size.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuoteError::Status {
                source_name: "naver_universe",
                status: response.status().as_u16(),
            });
        }

        let body: MarketValueResponse = response
            .json()
            .await
            .map_err(|e| QuoteError::Parse(e.to_string()))?;

        let tickers: Vec<TickerInfo> = body
            .stocks
            .into_iter()
            .map(|item| {
                let name = match market {
                    Market::US => item.stock_name_eng.or(item.stock_name),
                    Market::KR => item.stock_name,
                }
                .unwrap_or_else(|| item.item_code.clone());
                TickerInfo::new(item.item_code, name, market)
            })
            .collect();

        if tickers.is_empty() {
            return Err(QuoteError::NoData(format!("{} 종목 목록 비어 있음", market)));
        }
        Ok(tickers)
    }
}

// ==================== 정적 폴백 목록 ====================

const KR_FALLBACK: &[(&str, &str)] = &[
    ("005930", "삼성전자"),
    ("000660", "SK하이닉스"),
    ("373220", "LG에너지솔루션"),
    ("207940", "삼성바이오로직스"),
    ("005380", "현대차"),
    ("000270", "기아"),
    ("068270", "셀트리온"),
    ("035420", "NAVER"),
    ("105560", "KB금융"),
    ("055550", "신한지주"),
    ("005490", "POSCO홀딩스"),
    ("035720", "카카오"),
    ("012330", "현대모비스"),
    ("051910", "LG화학"),
    ("006400", "삼성SDI"),
    ("028260", "삼성물산"),
    ("066570", "LG전자"),
    ("003550", "LG"),
    ("032830", "삼성생명"),
    ("086790", "하나금융지주"),
];

const US_FALLBACK: &[(&str, &str)] = &[
    ("AAPL", "Apple Inc."),
    ("MSFT", "Microsoft Corporation"),
    ("NVDA", "NVIDIA Corporation"),
    ("AMZN", "Amazon.com Inc."),
    ("GOOGL", "Alphabet Inc."),
    ("META", "Meta Platforms Inc."),
    ("TSLA", "Tesla Inc."),
    ("AVGO", "Broadcom Inc."),
    ("JPM", "JPMorgan Chase & Co."),
    ("V", "Visa Inc."),
    ("NFLX", "Netflix Inc."),
    ("AMD", "Advanced Micro Devices"),
    ("COST", "Costco Wholesale"),
    ("ADBE", "Adobe Inc."),
    ("PEP", "PepsiCo Inc."),
    ("KO", "Coca-Cola Company"),
    ("INTC", "Intel Corporation"),
    ("QCOM", "Qualcomm Inc."),
    ("ORCL", "Oracle Corporation"),
    ("CRM", "Salesforce Inc."),
];

/// 정적 폴백 종목 목록.
pub fn fallback_tickers(market: Market) -> Vec<TickerInfo> {
    let list = match market {
        Market::KR => KR_FALLBACK,
        Market::US => US_FALLBACK,
    };
    list.iter()
        .map(|(code, name)| TickerInfo::new(*code, *name, market))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_lists() {
        let kr = fallback_tickers(Market::KR);
        assert_eq!(kr.len(), 20);
        assert_eq!(kr[0].ticker, "005930");
        assert!(fallback_tickers(Market::US).iter().all(|t| t.market == Market::US));
    }

    #[tokio::test]
    async fn test_parse_us_market_value() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/stock/exchange/NASDAQ/marketValue")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"stocks":[{"symbolCode":"AAPL","stockName":"애플","stockNameEng":"Apple Inc"}]}"#)
            .create_async()
            .await;

        let source = NaverUniverseSource::new(Client::new()).with_base_url(server.url());
        let tickers = source.top_tickers(Market::US).await.unwrap();
        assert_eq!(tickers, vec![TickerInfo::new("AAPL", "Apple Inc", Market::US)]);
    }

    #[tokio::test]
    async fn test_empty_list_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/stocks/marketValue/KOSPI")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"stocks":[]}"#)
            .create_async()
            .await;

        let source = NaverUniverseSource::new(Client::new()).with_base_url(server.url());
        assert!(source.top_tickers(Market::KR).await.is_err());
    }
}
