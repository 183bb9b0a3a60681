use trade_core::{AggregatedSignal, TradeAction, TradeLevels};

use super::config_or_default;
use crate::config::StrategyConfig;
use crate::strategy::{adx, atr, check_confidence, StopRule, Strategy, StrategyContext, Verdict};

/// Rides strong directional moves: wide stops, 1:4 targets, and demands a
/// confident, near-unanimous signal.
#[derive(Debug, Clone)]
pub struct BreakoutStrategy {
    config: StrategyConfig,
    stop: StopRule,
    reward_multiple: f64,
    min_confidence: f64,
    min_adx: f64,
    min_consensus: f64,
}

impl BreakoutStrategy {
    pub const NAME: &'static str = "BREAKOUT";
    pub const DESCRIPTION: &'static str = "Trades breakouts with strong directional momentum (ADX-based)";

    pub fn new(config: Option<StrategyConfig>) -> Self {
        let config = config_or_default(config, Self::NAME, Self::DESCRIPTION);
        Self {
            stop: StopRule::AtrOrPercent {
                atr_multiplier: config.param_f64("atr_multiplier", 2.0),
                percent: config.param_f64("stop_percent", 3.0),
            },
            reward_multiple: config.param_f64("reward_multiple", 4.0),
            min_confidence: config.param_f64("breakout_min_confidence", 70.0),
            min_adx: config.param_f64("min_adx", 25.0),
            min_consensus: config.param_f64("min_consensus", 80.0),
            config,
        }
    }
}

impl Default for BreakoutStrategy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Strategy for BreakoutStrategy {
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

        if signal.confidence < self.min_confidence {
            return Verdict::reject(format!(
                "Confidence {:.0}% < {}% (breakout needs high confidence)",
                signal.confidence, self.min_confidence
            ));
        }

        // Trend strength is only checked when ADX is reported
        if let Some(adx) = adx(signal) {
            if adx < self.min_adx {
                return Verdict::reject(format!(
                    "ADX {adx:.0} < {} (weak trend, not suitable for breakout)",
                    self.min_adx
                ));
            }
        }

        let consensus = signal.consensus_strength();
        if consensus < self.min_consensus {
            return Verdict::reject(format!(
                "Consensus {consensus:.0}% < {}% (breakout needs strong agreement)",
                self.min_consensus
            ));
        }

        Verdict::accept("Breakout conditions met")
    }
}
