use async_trait::async_trait;
use chrono::{Local, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{IndicatorSignal, PositionType, Timeframe, TradeError};

/// Snapshot of the open book for one position type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenPositions {
    pub count: usize,
    pub symbols: Vec<String>,
}

impl OpenPositions {
    pub fn new(symbols: Vec<String>) -> Self {
        Self {
            count: symbols.len(),
            symbols,
        }
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

/// Source of per-indicator readings for a symbol/timeframe
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    async fn indicator_signals(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<BTreeMap<String, IndicatorSignal>, TradeError>;
}

/// Trading capital currently available
pub trait CapitalProvider: Send + Sync {
    fn available_capital(&self) -> Result<Decimal, TradeError>;
}

/// Open positions of one holding style
pub trait PositionProvider: Send + Sync {
    fn open_positions(&self, position_type: PositionType) -> Result<OpenPositions, TradeError>;
}

/// Exchange-local wall clock for intraday checks
pub trait MarketClock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// Reads the host's local time. Run the host in the exchange's time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl MarketClock for SystemClock {
    fn now(&self) -> NaiveTime {
        Local::now().time()
    }
}
