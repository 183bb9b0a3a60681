use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use trade_core::{AggregatedSignal, TradeAction, TradeLevels};

use crate::config::StrategyConfig;

/// Extra inputs some strategies need beyond the execution signal
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyContext<'a> {
    /// Exchange-local clock time of the evaluation
    pub current_time: Option<NaiveTime>,
    pub daily_signal: Option<&'a AggregatedSignal>,
    pub hourly_signal: Option<&'a AggregatedSignal>,
    pub alignment_score: Option<f64>,
}

/// Outcome of a strategy's own acceptance criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub accepted: bool,
    pub reason: String,
}

impl Verdict {
    pub fn accept(reason: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

/// A trading strategy: turns a signal into price levels and decides whether
/// the setup is worth taking.
///
/// Implementations hold only their configuration and are safe to share
/// across evaluations.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn config(&self) -> &StrategyConfig;

    /// Entry, stop and target for `action`. Actions that open nothing
    /// (closing a long, holding) get flat levels at `current_price`.
    fn calculate_trade_levels(
        &self,
        current_price: f64,
        signal: &AggregatedSignal,
        action: TradeAction,
    ) -> TradeLevels;

    fn should_take_trade(
        &self,
        signal: &AggregatedSignal,
        current_price: f64,
        context: &StrategyContext<'_>,
    ) -> Verdict;

    fn allows_long_positions(&self) -> bool {
        true
    }

    fn allows_short_positions(&self) -> bool {
        true
    }
}

/// Confidence floor shared by every strategy
pub(crate) fn check_confidence(config: &StrategyConfig, signal: &AggregatedSignal) -> Option<Verdict> {
    if signal.confidence < config.min_confidence {
        return Some(Verdict::reject(format!(
            "Confidence {:.0}% < {}%",
            signal.confidence, config.min_confidence
        )));
    }
    None
}

/// How far from entry the protective stop goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum StopRule {
    /// ATR × multiplier when ATR is known, else a percentage of entry
    AtrOrPercent { atr_multiplier: f64, percent: f64 },
    /// The larger of the ATR and percentage distances
    Wider { atr_multiplier: f64, percent: f64 },
    /// The smaller of the ATR and percentage distances
    Tighter { atr_multiplier: f64, percent: f64 },
    Percent(f64),
}

impl StopRule {
    fn distance(&self, entry: f64, atr: Option<f64>) -> f64 {
        let atr = atr.filter(|a| *a > 0.0);
        match *self {
            StopRule::AtrOrPercent { atr_multiplier, percent } => atr
                .map(|a| a * atr_multiplier)
                .unwrap_or(entry * percent / 100.0),
            StopRule::Wider { atr_multiplier, percent } => {
                let pct = entry * percent / 100.0;
                atr.map(|a| pct.max(a * atr_multiplier)).unwrap_or(pct)
            }
            StopRule::Tighter { atr_multiplier, percent } => {
                let pct = entry * percent / 100.0;
                atr.map(|a| pct.min(a * atr_multiplier)).unwrap_or(pct)
            }
            StopRule::Percent(percent) => entry * percent / 100.0,
        }
    }

    /// Levels for a long or short entry with the target at `reward_multiple`
    /// times the risk. Other actions get flat levels.
    pub(crate) fn levels(
        &self,
        current_price: f64,
        atr: Option<f64>,
        action: TradeAction,
        reward_multiple: f64,
    ) -> TradeLevels {
        let entry = current_price;
        let distance = self.distance(entry, atr);
        let stop_loss = match action {
            TradeAction::Buy => entry - distance,
            TradeAction::Short => entry + distance,
            TradeAction::Sell | TradeAction::Hold => return rounded(TradeLevels::flat(entry)),
        };
        let target = entry + (entry - stop_loss) * reward_multiple;
        rounded(TradeLevels {
            entry,
            stop_loss,
            target,
        })
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn rounded(levels: TradeLevels) -> TradeLevels {
    TradeLevels {
        entry: round2(levels.entry),
        stop_loss: round2(levels.stop_loss),
        target: round2(levels.target),
    }
}

/// Indicator readings strategies gate on, looked up by name fragment
pub(crate) fn atr(signal: &AggregatedSignal) -> Option<f64> {
    signal.indicator_value("ATR")
}

pub(crate) fn rsi(signal: &AggregatedSignal) -> Option<f64> {
    signal.indicator_value("RSI")
}

pub(crate) fn adx(signal: &AggregatedSignal) -> Option<f64> {
    signal.indicator_value("ADX")
}

pub(crate) fn macd_histogram(signal: &AggregatedSignal) -> Option<f64> {
    signal.indicator_value("MACD")
}

pub(crate) fn stochastic_k(signal: &AggregatedSignal) -> Option<f64> {
    signal.indicator_value("STOCH")
}

pub(crate) fn bollinger_middle(signal: &AggregatedSignal) -> Option<f64> {
    signal
        .indicator_value("BB")
        .or_else(|| signal.indicator_value("BOLLINGER"))
}

pub(crate) fn ema(signal: &AggregatedSignal, period: u32) -> Option<f64> {
    signal.indicator_value(&format!("EMA_{period}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_atr_or_percent() {
        let rule = StopRule::AtrOrPercent {
            atr_multiplier: 1.5,
            percent: 2.0,
        };
        let with_atr = rule.levels(100.0, Some(2.0), TradeAction::Buy, 3.0);
        assert_relative_eq!(with_atr.stop_loss, 97.0);
        assert_relative_eq!(with_atr.target, 109.0);

        let without = rule.levels(100.0, None, TradeAction::Short, 3.0);
        assert_relative_eq!(without.stop_loss, 102.0);
        assert_relative_eq!(without.target, 94.0);
    }

    #[test]
    fn test_wider_and_tighter() {
        let wider = StopRule::Wider {
            atr_multiplier: 1.5,
            percent: 2.0,
        };
        // ATR distance 1.5 vs percent distance 2.0
        assert_relative_eq!(wider.levels(100.0, Some(1.0), TradeAction::Buy, 3.0).stop_loss, 98.0);
        assert_relative_eq!(wider.levels(100.0, Some(3.0), TradeAction::Buy, 3.0).stop_loss, 95.5);

        let tighter = StopRule::Tighter {
            atr_multiplier: 1.5,
            percent: 2.5,
        };
        assert_relative_eq!(tighter.levels(100.0, Some(1.0), TradeAction::Short, 2.5).stop_loss, 101.5);
        assert_relative_eq!(tighter.levels(100.0, None, TradeAction::Short, 2.5).stop_loss, 102.5);
    }

    #[test]
    fn test_exit_levels_are_flat() {
        let rule = StopRule::Percent(1.5);
        let levels = rule.levels(250.456, None, TradeAction::Sell, 2.0);
        assert_eq!(levels, TradeLevels::flat(250.46));
        assert_eq!(levels.risk_reward(), 0.0);
    }

    #[test]
    fn test_zero_atr_treated_as_missing() {
        let rule = StopRule::AtrOrPercent {
            atr_multiplier: 2.0,
            percent: 3.0,
        };
        assert_relative_eq!(rule.levels(100.0, Some(0.0), TradeAction::Buy, 4.0).stop_loss, 97.0);
    }
}
