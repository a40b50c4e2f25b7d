//! 장 운영 시간 계산.
//!
//! 모든 판정은 KST(Asia/Seoul) 기준의 순수 함수입니다. 공휴일은 고려하지 않습니다.
//!
//! - KR: 평일 09:00 ~ 15:00
//! - US: 23:30 ~ 다음날 06:00 (미국 서머타임 기간에는 22:30 ~ 05:00),
//!   미국 거래일이 평일인 경우에만 개장

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Asia::Seoul;
use serde::{Deserialize, Serialize};

use crate::domain::Market;

// ==================== 시간 상수 ====================

const KR_OPEN: (u32, u32) = (9, 0);
const KR_CLOSE: (u32, u32) = (15, 0);

const US_OPEN_STANDARD: (u32, u32) = (23, 30);
const US_CLOSE_STANDARD: (u32, u32) = (6, 0);
const US_OPEN_DST: (u32, u32) = (22, 30);
const US_CLOSE_DST: (u32, u32) = (5, 0);

fn hm((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 해당 월의 n번째 일요일.
fn nth_sunday(year: i32, month: u32, n: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (7 - first.weekday().num_days_from_sunday()) % 7;
    first.checked_add_signed(Duration::days(i64::from(offset + (n - 1) * 7)))
}

// ==================== 판정 함수 ====================

/// 미국 서머타임 적용 여부를 반환합니다.
///
/// 3월 둘째 일요일부터 11월 첫째 일요일 전날까지를 서머타임으로 봅니다.
pub fn is_us_dst(date: NaiveDate) -> bool {
    let year = date.year();
    match (nth_sunday(year, 3, 2), nth_sunday(year, 11, 1)) {
        (Some(start), Some(end)) => date >= start && date < end,
        _ => false,
    }
}

/// 미국 거래일 기준 KST 개장/폐장 시각.
fn us_window(session_date: NaiveDate) -> (NaiveTime, NaiveTime) {
    if is_us_dst(session_date) {
        (hm(US_OPEN_DST), hm(US_CLOSE_DST))
    } else {
        (hm(US_OPEN_STANDARD), hm(US_CLOSE_STANDARD))
    }
}

/// 현재 시각이 속한 미국 거래일을 반환합니다. 장외 시간이면 `None`.
///
/// 개장 시각 이후는 같은 KST 날짜, 폐장 시각 이전은 전날 세션입니다.
pub fn us_session_date(now: DateTime<Utc>) -> Option<NaiveDate> {
    let kst = now.with_timezone(&Seoul).naive_local();
    let (date, time) = (kst.date(), kst.time());

    let (open, _) = us_window(date);
    if time >= open {
        return Some(date);
    }

    let previous = date.pred_opt()?;
    let (_, close) = us_window(previous);
    if time < close {
        return Some(previous);
    }

    None
}

/// 해당 시장이 지금 열려 있는지 확인합니다.
pub fn is_market_open(market: Market, now: DateTime<Utc>) -> bool {
    match market {
        Market::KR => {
            let kst = now.with_timezone(&Seoul).naive_local();
            let time = kst.time();
            is_weekday(kst.date()) && time >= hm(KR_OPEN) && time < hm(KR_CLOSE)
        }
        Market::US => us_session_date(now).is_some_and(is_weekday),
    }
}

/// 지금 열려 있는 시장 목록.
pub fn open_markets(now: DateTime<Utc>) -> Vec<Market> {
    Market::ALL
        .into_iter()
        .filter(|market| is_market_open(*market, now))
        .collect()
}

// ==================== 상태 요약 ====================

/// 시장 상태 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatus {
    pub kr_open: bool,
    pub us_open: bool,
    /// KST 현재 시각 (RFC 3339)
    pub kst_time: String,
    /// 미국 서머타임 적용 여부 (KST 날짜 기준)
    pub us_dst: bool,
}

/// 주어진 시각의 시장 상태를 계산합니다.
pub fn market_status(now: DateTime<Utc>) -> MarketStatus {
    let kst = now.with_timezone(&Seoul);
    MarketStatus {
        kr_open: is_market_open(Market::KR, now),
        us_open: is_market_open(Market::US, now),
        kst_time: kst.to_rfc3339(),
        us_dst: is_us_dst(kst.date_naive()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kst(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Utc> {
        Seoul
            .with_ymd_and_hms(y, m, d, hh, mm, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_kr_open_weekday_hours() {
        // 2026-10-14 수요일
        assert!(is_market_open(Market::KR, kst(2026, 10, 14, 9, 0)));
        assert!(is_market_open(Market::KR, kst(2026, 10, 14, 14, 59)));
        assert!(!is_market_open(Market::KR, kst(2026, 10, 14, 15, 0)));
        assert!(!is_market_open(Market::KR, kst(2026, 10, 14, 8, 59)));
    }

    #[test]
    fn test_kr_closed_on_weekend() {
        // 2026-10-17 토요일, 2026-10-18 일요일
        for hour in 0..24 {
            assert!(!is_market_open(Market::KR, kst(2026, 10, 17, hour, 30)));
            assert!(!is_market_open(Market::KR, kst(2026, 10, 18, hour, 30)));
        }
    }

    #[test]
    fn test_dst_window_2026() {
        assert!(!is_us_dst(NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()));
        assert!(is_us_dst(NaiveDate::from_ymd_opt(2026, 3, 8).unwrap()));
        assert!(is_us_dst(NaiveDate::from_ymd_opt(2026, 10, 31).unwrap()));
        assert!(!is_us_dst(NaiveDate::from_ymd_opt(2026, 11, 1).unwrap()));
    }

    #[test]
    fn test_dst_window_2025() {
        assert!(!is_us_dst(NaiveDate::from_ymd_opt(2025, 3, 8).unwrap()));
        assert!(is_us_dst(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()));
        assert!(is_us_dst(NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()));
        assert!(!is_us_dst(NaiveDate::from_ymd_opt(2025, 11, 2).unwrap()));
    }

    #[test]
    fn test_us_open_around_march_transition() {
        // 2026-03-06 금요일 (표준시): 23:30 개장
        assert!(!is_market_open(Market::US, kst(2026, 3, 6, 22, 45)));
        assert!(is_market_open(Market::US, kst(2026, 3, 6, 23, 45)));
        // 2026-03-09 월요일 (서머타임): 22:30 개장
        assert!(is_market_open(Market::US, kst(2026, 3, 9, 22, 45)));
        assert!(!is_market_open(Market::US, kst(2026, 3, 9, 22, 15)));
        // 월요일 세션은 화요일 05:00 폐장
        assert!(is_market_open(Market::US, kst(2026, 3, 10, 4, 59)));
        assert!(!is_market_open(Market::US, kst(2026, 3, 10, 5, 30)));
    }

    #[test]
    fn test_us_open_around_november_transition() {
        // 2026-10-30 금요일 (서머타임)
        assert!(is_market_open(Market::US, kst(2026, 10, 30, 22, 45)));
        assert!(!is_market_open(Market::US, kst(2026, 10, 31, 5, 30)));
        // 2026-11-02 월요일 (표준시)
        assert!(!is_market_open(Market::US, kst(2026, 11, 2, 22, 45)));
        assert!(is_market_open(Market::US, kst(2026, 11, 2, 23, 45)));
        assert!(is_market_open(Market::US, kst(2026, 11, 3, 5, 30)));
        assert!(!is_market_open(Market::US, kst(2026, 11, 3, 6, 0)));
    }

    #[test]
    fn test_us_session_follows_us_weekday() {
        // 토요일 새벽은 금요일 세션
        assert!(is_market_open(Market::US, kst(2026, 3, 7, 2, 0)));
        // 일요일 새벽은 토요일 세션 → 휴장
        assert!(!is_market_open(Market::US, kst(2026, 3, 8, 2, 0)));
        // 월요일 새벽은 일요일 세션 → 휴장
        assert!(!is_market_open(Market::US, kst(2026, 3, 9, 2, 0)));
    }

    #[test]
    fn test_market_status_summary() {
        let status = market_status(kst(2026, 10, 14, 10, 0));
        assert!(status.kr_open);
        assert!(!status.us_open);
        assert!(status.us_dst);
        assert!(status.kst_time.starts_with("2026-10-14T10:00:00"));
        assert_eq!(open_markets(kst(2026, 10, 14, 10, 0)), vec![Market::KR]);
    }
}
