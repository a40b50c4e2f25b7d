//! 시장 및 통화 정의.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ArenaError;

/// 거래 대상 시장.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    /// 한국 주식 시장 (KRX)
    KR,
    /// 미국 주식 시장 (NYSE/NASDAQ)
    US,
}

impl Market {
    /// 모든 시장.
    pub const ALL: [Market; 2] = [Market::KR, Market::US];

    /// 해당 시장의 거래 통화를 반환합니다.
    pub fn currency(&self) -> Currency {
        match self {
            Market::KR => Currency::KRW,
            Market::US => Currency::USD,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::KR => "KR",
            Market::US => "US",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KR" => Ok(Market::KR),
            "US" => Ok(Market::US),
            _ => Err(ArenaError::InvalidMarket(s.to_string())),
        }
    }
}

/// 잔고 통화.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    KRW,
    USD,
}

impl Currency {
    /// 반대 통화를 반환합니다.
    pub fn other(&self) -> Currency {
        match self {
            Currency::KRW => Currency::USD,
            Currency::USD => Currency::KRW,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::KRW => "KRW",
            Currency::USD => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KRW" => Ok(Currency::KRW),
            "USD" => Ok(Currency::USD),
            _ => Err(ArenaError::InvalidInput(format!("알 수 없는 통화: {}", s))),
        }
    }
}
