//! 포트폴리오 히스토리 보정과 조회 모델.
//!
//! # 주요 기능
//!
//! - 누락된 평일 포인트를 직전 값으로 채우기
//! - 거래 기록을 역산해 과거 히스토리 복원 (최초 1회)
//! - 모델별 시계열과 일별 OHLC 캔들 조회
//!
//! 날짜 경계는 모두 KST 기준입니다.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use arena_core::{
    AiModel, Currency, Market, PortfolioHistoryPoint, ProviderKind, TradeAction, TradeRecord,
};
use arena_data::MarketData;
use arena_ledger::Ledger;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Asia::Seoul;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 보정 포인트를 찍는 KST 시각 (한국 장 마감 직후).
const SNAPSHOT_HOUR: u32 = 15;
const SNAPSHOT_MINUTE: u32 = 30;

// ==================== 조회 모델 ====================

/// 시계열 포인트.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
}

/// 모델별 평가금액 시계열.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSeries {
    pub model_id: Uuid,
    pub model_name: String,
    pub provider: ProviderKind,
    pub points: Vec<SeriesPoint>,
}

/// 일별 OHLC 캔들 (KST 날짜).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCandle {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// 모델별 캔들 차트.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCandles {
    pub model_id: Uuid,
    pub model_name: String,
    pub provider: ProviderKind,
    pub candles: Vec<DailyCandle>,
}

/// 빈 날짜 채우기 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GapFillReport {
    pub models: usize,
    pub inserted: usize,
}

/// 거래 기록 역산 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migrated_models: usize,
    pub skipped_models: usize,
    pub inserted: usize,
}

/// 시간순 히스토리를 모델별 시계열로 묶습니다.
pub fn build_series(models: &[AiModel], points: &[PortfolioHistoryPoint]) -> Vec<ModelSeries> {
    let mut grouped: HashMap<Uuid, Vec<SeriesPoint>> = HashMap::new();
    for point in points {
        grouped.entry(point.model_id).or_default().push(SeriesPoint {
            timestamp: point.recorded_at,
            value: point.total_value,
        });
    }

    models
        .iter()
        .map(|model| ModelSeries {
            model_id: model.id,
            model_name: model.name.clone(),
            provider: model.provider,
            points: grouped.remove(&model.id).unwrap_or_default(),
        })
        .collect()
}

/// 시간순 히스토리를 KST 일별 캔들로 집계합니다.
pub fn build_candles(points: &[PortfolioHistoryPoint]) -> Vec<DailyCandle> {
    let mut days: BTreeMap<NaiveDate, DailyCandle> = BTreeMap::new();
    for point in points {
        let value = point.total_value;
        days.entry(kst_date(point.recorded_at))
            .and_modify(|c| {
                c.high = c.high.max(value);
                c.low = c.low.min(value);
                c.close = value;
            })
            .or_insert(DailyCandle {
                date: kst_date(point.recorded_at),
                open: value,
                high: value,
                low: value,
                close: value,
            });
    }
    days.into_values().collect()
}

fn kst_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.with_timezone(&Seoul).date_naive()
}

/// 해당 KST 날짜의 보정 포인트 시각.
fn snapshot_time(date: NaiveDate) -> Option<DateTime<Utc>> {
    let local = date.and_hms_opt(SNAPSHOT_HOUR, SNAPSHOT_MINUTE, 0)?;
    Seoul
        .from_local_datetime(&local)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

// ==================== 서비스 ====================

/// 포트폴리오 히스토리 서비스.
#[derive(Clone)]
pub struct HistoryService {
    ledger: Ledger,
    market_data: Arc<dyn MarketData>,
}

impl HistoryService {
    pub fn new(ledger: Ledger, market_data: Arc<dyn MarketData>) -> Self {
        Self {
            ledger,
            market_data,
        }
    }

    /// 최근 `days`일 모델별 시계열.
    pub async fn portfolio_history(&self, days: u32) -> Vec<ModelSeries> {
        let since = Utc::now() - Duration::days(i64::from(days));
        let models = self.ledger.models().await;
        let points = self.ledger.history(None, since).await;
        build_series(&models, &points)
    }

    /// 최근 `days`일 모델별 일별 캔들.
    pub async fn candle_chart(&self, days: u32) -> Vec<ModelCandles> {
        self.portfolio_history_points(days)
            .await
            .into_iter()
            .map(|(model, points)| ModelCandles {
                model_id: model.id,
                model_name: model.name,
                provider: model.provider,
                candles: build_candles(&points),
            })
            .collect()
    }

    async fn portfolio_history_points(&self, days: u32) -> Vec<(AiModel, Vec<PortfolioHistoryPoint>)> {
        let since = Utc::now() - Duration::days(i64::from(days));
        let models = self.ledger.models().await;
        let mut grouped: HashMap<Uuid, Vec<PortfolioHistoryPoint>> = HashMap::new();
        for point in self.ledger.history(None, since).await {
            grouped.entry(point.model_id).or_default().push(point);
        }
        models
            .into_iter()
            .map(|m| {
                let points = grouped.remove(&m.id).unwrap_or_default();
                (m, points)
            })
            .collect()
    }

    /// 최근 `days`일 중 포인트가 없는 평일을 직전 값으로 채웁니다.
    ///
    /// 오늘은 제외합니다. 이전 포인트가 전혀 없는 모델은 건너뜁니다.
    pub async fn fill_history_gaps(&self, days: u32) -> GapFillReport {
        self.fill_history_gaps_at(days, Utc::now()).await
    }

    pub(crate) async fn fill_history_gaps_at(&self, days: u32, now: DateTime<Utc>) -> GapFillReport {
        let today = kst_date(now);
        let start = today - Duration::days(i64::from(days));
        let models = self.ledger.models().await;
        let mut report = GapFillReport::default();

        for model in &models {
            // 첫 빈 날짜 이전의 값이 필요하므로 전체 히스토리를 읽습니다
            let history = self
                .ledger
                .history(Some(model.id), DateTime::<Utc>::default())
                .await;
            if history.is_empty() {
                debug!(model = %model.name, "No history to carry forward");
                continue;
            }

            let covered: HashSet<NaiveDate> =
                history.iter().map(|p| kst_date(p.recorded_at)).collect();
            let mut inserted = 0;

            let mut date = start;
            while date < today {
                if is_weekday(date) && !covered.contains(&date) {
                    if let Some(ts) = snapshot_time(date) {
                        if let Some(last) = history.iter().rev().find(|p| p.recorded_at < ts) {
                            let point = PortfolioHistoryPoint::new(model.id, last.total_value)
                                .at(ts)
                                .with_breakdown(
                                    last.krw_cash,
                                    last.usd_cash,
                                    last.holdings_value,
                                    last.exchange_rate,
                                );
                            if self.ledger.record_history(&point).await {
                                inserted += 1;
                            }
                        }
                    }
                }
                date += Duration::days(1);
            }

            if inserted > 0 {
                report.models += 1;
                report.inserted += inserted;
            }
        }

        info!(models = report.models, inserted = report.inserted, "History gaps filled");
        report
    }

    /// 거래 기록을 역산해 과거 일별 히스토리를 만듭니다.
    ///
    /// 이미 히스토리가 있는 모델은 건너뜁니다. 환전 기록은 되돌리지 않으며 보유
    /// 종목은 마지막 체결가(없으면 평균 단가)와 현재 환율로 평가합니다.
    pub async fn migrate_history_from_trades(&self) -> MigrationReport {
        let models = self.ledger.models().await;
        let exchange_rate = self.market_data.exchange_rate().await;
        let now = Utc::now();
        let mut report = MigrationReport::default();

        for model in &models {
            let existing = match self
                .ledger
                .try_history(Some(model.id), DateTime::<Utc>::default())
                .await
            {
                Ok(existing) => existing,
                Err(e) => {
                    warn!(model = %model.name, error = %e, "History read failed, skipping migration");
                    report.skipped_models += 1;
                    continue;
                }
            };
            if !existing.is_empty() {
                report.skipped_models += 1;
                continue;
            }

            let trades = self.ledger.trades(model.id, None).await;
            if trades.is_empty() {
                report.skipped_models += 1;
                continue;
            }

            let (balance, holdings) = match (
                self.ledger.try_balance(model.id).await,
                self.ledger.try_holdings(model.id, None).await,
            ) {
                (Ok(balance), Ok(holdings)) => (balance, holdings),
                _ => {
                    warn!(model = %model.name, "Ledger read failed, skipping migration");
                    report.skipped_models += 1;
                    continue;
                }
            };
            let mut state = ReplayState {
                krw: balance.krw,
                usd: balance.usd,
                shares: holdings
                    .iter()
                    .map(|h| ((h.market, h.ticker.clone()), h.shares))
                    .collect(),
                prices: holdings
                    .iter()
                    .map(|h| ((h.market, h.ticker.clone()), h.avg_price))
                    .collect(),
            };
            for trade in &trades {
                state
                    .prices
                    .insert((trade.market, trade.ticker.clone()), trade.price);
            }

            let points = state.replay_backward(model.id, &trades, exchange_rate, now);
            let mut inserted = 0;
            for point in &points {
                if self.ledger.record_history(point).await {
                    inserted += 1;
                } else {
                    warn!(model = %model.name, "Failed to store migrated history point");
                }
            }

            info!(model = %model.name, trades = trades.len(), inserted, "History migrated from trades");
            report.migrated_models += 1;
            report.inserted += inserted;
        }

        report
    }
}

/// 역산 중인 모델 상태.
struct ReplayState {
    krw: Decimal,
    usd: Decimal,
    shares: HashMap<(Market, String), Decimal>,
    /// 평가에 쓰는 종목별 가격 (시장 통화)
    prices: HashMap<(Market, String), Decimal>,
}

impl ReplayState {
    fn value(&self, exchange_rate: Decimal) -> (Decimal, Decimal) {
        let holdings: Decimal = self
            .shares
            .iter()
            .filter(|(_, shares)| **shares > Decimal::ZERO)
            .map(|(key, shares)| {
                let price = self.prices.get(key).copied().unwrap_or(Decimal::ZERO);
                match key.0.currency() {
                    Currency::KRW => *shares * price,
                    Currency::USD => *shares * price * exchange_rate,
                }
            })
            .sum();
        (holdings, self.krw + self.usd * exchange_rate + holdings)
    }

    /// 거래일마다 그날 마감 상태의 포인트를 만들고 그날 거래를 되돌립니다.
    fn replay_backward(
        &mut self,
        model_id: Uuid,
        trades: &[TradeRecord],
        exchange_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Vec<PortfolioHistoryPoint> {
        let mut by_day: BTreeMap<NaiveDate, Vec<&TradeRecord>> = BTreeMap::new();
        for trade in trades {
            by_day.entry(kst_date(trade.created_at)).or_default().push(trade);
        }

        let mut points = Vec::with_capacity(by_day.len());
        for (date, day_trades) in by_day.iter().rev() {
            if let Some(ts) = snapshot_time(*date) {
                let (holdings_value, total) = self.value(exchange_rate);
                points.push(
                    PortfolioHistoryPoint::new(model_id, total)
                        .at(ts.min(now))
                        .with_breakdown(self.krw, self.usd, holdings_value, exchange_rate),
                );
            }

            for trade in day_trades.iter().rev() {
                self.undo(trade);
            }
        }

        points.reverse();
        points
    }

    fn undo(&mut self, trade: &TradeRecord) {
        match trade.currency {
            Currency::KRW => self.krw -= trade.cash_delta(),
            Currency::USD => self.usd -= trade.cash_delta(),
        }
        let shares = self
            .shares
            .entry((trade.market, trade.ticker.clone()))
            .or_insert(Decimal::ZERO);
        match trade.action {
            TradeAction::Buy => *shares -= trade.shares,
            TradeAction::Sell => *shares += trade.shares,
        }
    }
}
