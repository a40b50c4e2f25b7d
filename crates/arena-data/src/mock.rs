//! 결정적 모의 시세.
//!
//! 모든 시세 소스가 실패했을 때 사용합니다. 시드는 종목 코드와 날짜에서 만들어지므로
//! 같은 날 같은 종목은 항상 같은 가격을 받습니다.

use arena_core::{Market, Quote, QuoteOrigin};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// FNV-1a 64비트 해시.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn seed_for(ticker: &str, market: Market, now: DateTime<Utc>) -> u64 {
    let day = now.timestamp().div_euclid(86_400) as u64;
    fnv1a(ticker.as_bytes()) ^ fnv1a(market.as_str().as_bytes()).rotate_left(17) ^ day
}

/// 모의 시세를 생성합니다.
///
/// KR은 10,000 ~ 200,000원(100원 단위), US는 20 ~ 500달러(센트 단위) 범위입니다.
pub fn mock_quote(ticker: &str, market: Market, now: DateTime<Utc>) -> Quote {
    let mut rng = StdRng::seed_from_u64(seed_for(ticker, market, now));

    let price = match market {
        Market::KR => Decimal::from(rng.gen_range(100_u32..=2_000) * 100),
        Market::US => Decimal::new(rng.gen_range(2_000_i64..=50_000), 2),
    };
    // -3.00% ~ +3.00%
    let change_pct = Decimal::new(rng.gen_range(-300_i64..=300), 2);
    let change = (price * change_pct / Decimal::ONE_HUNDRED).round_dp(2);
    let spread = (price * Decimal::new(rng.gen_range(0_i64..=200), 4)).round_dp(2);

    let mut quote = Quote::new(ticker, market, price).with_origin(QuoteOrigin::Mock);
    quote.change = change;
    quote.change_pct = change_pct;
    quote.open = price - change;
    quote.high = price + spread;
    quote.low = (price - spread).max(Decimal::ZERO);
    quote.volume = rng.gen_range(10_000_u64..5_000_000);
    quote.timestamp = now;
    quote
}
