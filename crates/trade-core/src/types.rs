use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Free-form evidence attached to results (sizing details, decision details).
pub type Details = BTreeMap<String, Value>;

/// Directional verdict of an indicator or of an aggregated signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
}

impl Direction {
    pub fn is_bullish(&self) -> bool {
        matches!(self, Direction::StrongBuy | Direction::Buy)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Direction::StrongSell | Direction::Sell)
    }

    /// Human-readable label for the direction
    pub fn to_label(&self) -> &'static str {
        match self {
            Direction::StrongBuy => "Strong Buy",
            Direction::Buy => "Buy",
            Direction::Neutral => "Neutral",
            Direction::Sell => "Sell",
            Direction::StrongSell => "Strong Sell",
        }
    }
}

/// One indicator's reading, produced by the external indicator source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSignal {
    pub indicator_id: String,
    pub direction: Direction,
    /// 0 to 100
    pub strength: f64,
    /// Raw indicator output (RSI level, ATR in price units, MACD histogram, ...)
    pub current_value: f64,
}

impl IndicatorSignal {
    pub fn new(indicator_id: impl Into<String>, direction: Direction, strength: f64, current_value: f64) -> Self {
        Self {
            indicator_id: indicator_id.into(),
            direction,
            strength,
            current_value,
        }
    }
}

/// Consensus of several indicators for one symbol and timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSignal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// 0 to 100
    pub confidence: f64,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub neutral_count: usize,
    pub bullish_score: f64,
    pub bearish_score: f64,
    pub indicator_signals: BTreeMap<String, IndicatorSignal>,
    pub reasons: Vec<String>,
}

impl AggregatedSignal {
    /// Neutral signal carrying no evidence
    pub fn neutral(symbol: impl Into<String>, timestamp: DateTime<Utc>, confidence: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            direction: Direction::Neutral,
            confidence,
            bullish_count: 0,
            bearish_count: 0,
            neutral_count: 0,
            bullish_score: 0.0,
            bearish_score: 0.0,
            indicator_signals: BTreeMap::new(),
            reasons: Vec::new(),
        }
    }

    pub fn total_count(&self) -> usize {
        self.bullish_count + self.bearish_count + self.neutral_count
    }

    /// Share of indicators agreeing with the dominant side, 0 to 100.
    pub fn consensus_strength(&self) -> f64 {
        let total = self.total_count();
        if total == 0 {
            return 0.0;
        }
        let max_agreement = self.bullish_count.max(self.bearish_count);
        (max_agreement as f64 / total as f64) * 100.0
    }

    /// (bullish, bearish, neutral) counts
    pub fn distribution(&self) -> (usize, usize, usize) {
        (self.bullish_count, self.bearish_count, self.neutral_count)
    }

    /// Bullish by head count, the way strategy gates read direction
    pub fn leans_bullish(&self) -> bool {
        self.bullish_count > self.bearish_count
    }

    pub fn leans_bearish(&self) -> bool {
        self.bearish_count > self.bullish_count
    }

    pub fn dominant_score(&self) -> f64 {
        self.bullish_score.max(self.bearish_score)
    }

    /// Current value of the indicator named `key`, else of the first one
    /// whose name contains it (case-insensitive), e.g. `"ATR"` matches
    /// `"ATR_14"`. A key ending in a digit never matches a longer number,
    /// so `"EMA_20"` skips `"EMA_200"`.
    pub fn indicator_value(&self, key: &str) -> Option<f64> {
        let key = key.to_uppercase();
        self.indicator_signals
            .iter()
            .find(|(name, _)| name.to_uppercase() == key)
            .or_else(|| {
                self.indicator_signals
                    .iter()
                    .find(|(name, _)| contains_key(&name.to_uppercase(), &key))
            })
            .map(|(_, signal)| signal.current_value)
    }
}

fn contains_key(name: &str, key: &str) -> bool {
    let ends_in_digit = key.ends_with(|c: char| c.is_ascii_digit());
    name.match_indices(key).any(|(at, _)| {
        !ends_in_digit || !name[at + key.len()..].starts_with(|c: char| c.is_ascii_digit())
    })
}

/// Supported chart timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// 5-minute bars
    Min5,
    /// 15-minute bars
    Min15,
    /// 1-hour bars
    Hour1,
    /// 4-hour bars
    Hour4,
    /// Daily bars
    Daily,
}

impl Timeframe {
    /// Short code used in configuration and reasons
    pub fn code(&self) -> &'static str {
        match self {
            Timeframe::Min5 => "5m",
            Timeframe::Min15 => "15m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "5m" | "5min" => Some(Timeframe::Min5),
            "15m" | "15min" => Some(Timeframe::Min15),
            "1h" | "1hour" => Some(Timeframe::Hour1),
            "4h" | "4hour" => Some(Timeframe::Hour4),
            "1d" | "daily" => Some(Timeframe::Daily),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Holding style of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionType {
    #[default]
    Swing,
    Intraday,
}

impl PositionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionType::Swing => "SWING",
            PositionType::Intraday => "INTRADAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    /// Close an existing long
    Sell,
    Short,
    Hold,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::Short => "SHORT",
            TradeAction::Hold => "HOLD",
        }
    }
}

/// Closed set of business reasons for not trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    LowConfidence,
    PositionLimit,
    CapitalInsufficient,
    RiskLimit,
    MarketHours,
    DuplicatePosition,
    InvalidSignal,
    ConflictingTimeframes,
}

impl RejectionReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::LowConfidence => "LOW_CONFIDENCE",
            RejectionReason::PositionLimit => "POSITION_LIMIT",
            RejectionReason::CapitalInsufficient => "CAPITAL_INSUFFICIENT",
            RejectionReason::RiskLimit => "RISK_LIMIT",
            RejectionReason::MarketHours => "MARKET_HOURS",
            RejectionReason::DuplicatePosition => "DUPLICATE_POSITION",
            RejectionReason::InvalidSignal => "INVALID_SIGNAL",
            RejectionReason::ConflictingTimeframes => "CONFLICTING_TIMEFRAMES",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RejectionReason::LowConfidence => "Confidence below threshold",
            RejectionReason::PositionLimit => "Position limit reached",
            RejectionReason::CapitalInsufficient => "Insufficient capital",
            RejectionReason::RiskLimit => "Risk limit exceeded",
            RejectionReason::MarketHours => "Outside trading hours",
            RejectionReason::DuplicatePosition => "Already have position in symbol",
            RejectionReason::InvalidSignal => "Invalid signal",
            RejectionReason::ConflictingTimeframes => "Timeframe conflict",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Entry, stop and target prices computed by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub target: f64,
}

impl TradeLevels {
    /// Degenerate levels used for exits and holds
    pub fn flat(price: f64) -> Self {
        Self {
            entry: price,
            stop_loss: price,
            target: price,
        }
    }

    pub fn risk_per_share(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }

    /// |target - entry| / |entry - stop|, 0 when the stop sits on the entry.
    pub fn risk_reward(&self) -> f64 {
        let risk = self.risk_per_share();
        if risk == 0.0 {
            return 0.0;
        }
        (self.target - self.entry).abs() / risk
    }

    pub fn expected_return_percent(&self) -> f64 {
        if self.entry == 0.0 {
            return 0.0;
        }
        (self.target - self.entry) / self.entry * 100.0
    }
}

/// Output of a position sizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizeResult {
    pub quantity: u64,
    pub position_value: f64,
    pub risk_amount: f64,
    /// Share of capital at risk, 0 to 100
    pub risk_percent: f64,
    pub method: String,
    /// 0 to 100
    pub confidence: f64,
    pub details: Details,
}

impl PositionSizeResult {
    /// Zero-quantity result explaining why nothing can be sized
    pub fn zero(method: &str, error: impl Into<String>) -> Self {
        let mut details = Details::new();
        details.insert("error".to_string(), Value::String(error.into()));
        Self {
            quantity: 0,
            position_value: 0.0,
            risk_amount: 0.0,
            risk_percent: 0.0,
            method: method.to_string(),
            confidence: 0.0,
            details,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.details.get("error").and_then(|v| v.as_str())
    }
}
