use trade_core::{AggregatedSignal, TradeAction, TradeLevels};

use super::config_or_default;
use crate::config::StrategyConfig;
use crate::strategy::{atr, check_confidence, StopRule, Strategy, StrategyContext, Verdict};

/// Weighted vote of all indicators with ATR-based stops and a 1:3 target.
/// This is the default strategy.
#[derive(Debug, Clone)]
pub struct MultiIndicatorStrategy {
    config: StrategyConfig,
    stop: StopRule,
    reward_multiple: f64,
    min_consensus: f64,
}

impl MultiIndicatorStrategy {
    pub const NAME: &'static str = "MULTI_INDICATOR";
    pub const DESCRIPTION: &'static str = "Combines multiple technical indicators with weighted voting";

    pub fn new(config: Option<StrategyConfig>) -> Self {
        let config = config_or_default(config, Self::NAME, Self::DESCRIPTION);
        Self {
            stop: StopRule::AtrOrPercent {
                atr_multiplier: config.param_f64("atr_multiplier", 1.5),
                percent: config.param_f64("stop_percent", 2.0),
            },
            reward_multiple: config.param_f64("reward_multiple", 3.0),
            min_consensus: config.param_f64("min_consensus", 60.0),
            config,
        }
    }
}

impl Default for MultiIndicatorStrategy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Strategy for MultiIndicatorStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn calculate_trade_levels(
        &self,
        current_price: f64,
        signal: &AggregatedSignal,
        action: TradeAction,
    ) -> TradeLevels {
        self.stop
            .levels(current_price, atr(signal), action, self.reward_multiple)
    }

    fn should_take_trade(
        &self,
        signal: &AggregatedSignal,
        _current_price: f64,
        _context: &StrategyContext<'_>,
    ) -> Verdict {
        if let Some(rejected) = check_confidence(&self.config, signal) {
            return rejected;
        }

        if signal.bullish_count > 0
            && signal.bearish_count > 0
            && signal.bullish_count.abs_diff(signal.bearish_count) <= 1
        {
            return Verdict::reject("Mixed signals - indicators disagree");
        }

        let consensus = signal.consensus_strength();
        if consensus < self.min_consensus {
            return Verdict::reject(format!(
                "Low consensus ({consensus:.0}%) - indicators not aligned"
            ));
        }

        Verdict::accept("Multi-indicator criteria met")
    }
}
