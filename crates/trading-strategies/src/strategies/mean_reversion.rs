use trade_core::{AggregatedSignal, TradeAction, TradeLevels};

use super::config_or_default;
use crate::config::StrategyConfig;
use crate::strategy::{
    bollinger_middle, check_confidence, round2, rsi, StopRule, Strategy, StrategyContext, Verdict,
};

/// Fades RSI extremes and targets the Bollinger midline.
///
/// Best in range-bound markets. Stops are tight (1.5%) and the target is
/// the band midline when it lies in the trade's direction, else 1.5× risk.
#[derive(Debug, Clone)]
pub struct MeanReversionStrategy {
    config: StrategyConfig,
    stop_percent: f64,
    reward_multiple: f64,
    oversold: f64,
    overbought: f64,
}

impl MeanReversionStrategy {
    pub const NAME: &'static str = "MEAN_REVERSION";
    pub const DESCRIPTION: &'static str =
        "Trades mean reversion using RSI and Bollinger Bands oversold/overbought levels";

    pub fn new(config: Option<StrategyConfig>) -> Self {
        let config = config_or_default(config, Self::NAME, Self::DESCRIPTION);
        Self {
            stop_percent: config.param_f64("stop_percent", 1.5),
            reward_multiple: config.param_f64("reward_multiple", 1.5),
            oversold: config.param_f64("rsi_oversold", 30.0),
            overbought: config.param_f64("rsi_overbought", 70.0),
            config,
        }
    }
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Strategy for MeanReversionStrategy {
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
        let levels = StopRule::Percent(self.stop_percent).levels(
            current_price,
            None,
            action,
            self.reward_multiple,
        );

        let midline = bollinger_middle(signal).filter(|m| *m > 0.0);
        match (action, midline) {
            (TradeAction::Buy, Some(mid)) if mid > current_price => TradeLevels {
                target: round2(mid),
                ..levels
            },
            (TradeAction::Short, Some(mid)) if mid < current_price => TradeLevels {
                target: round2(mid),
                ..levels
            },
            _ => levels,
        }
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

        let Some(rsi) = rsi(signal) else {
            return Verdict::reject("RSI data not available");
        };

        if signal.leans_bullish() && rsi >= self.oversold {
            return Verdict::reject(format!(
                "RSI {rsi:.0} not oversold (need <{})",
                self.oversold
            ));
        }
        if signal.leans_bearish() && rsi <= self.overbought {
            return Verdict::reject(format!(
                "RSI {rsi:.0} not overbought (need >{})",
                self.overbought
            ));
        }
        if !signal.leans_bullish() && !signal.leans_bearish() {
            return Verdict::reject("No directional bias to revert from");
        }

        Verdict::accept("Mean reversion conditions met")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::signal;
    use approx::assert_relative_eq;
    use trade_core::Direction;

    #[test]
    fn test_targets_band_midline() {
        let strategy = MeanReversionStrategy::default();
        let s = signal(70.0, &[("BB_20", Direction::Buy, 106.0)]);
        let levels = strategy.calculate_trade_levels(100.0, &s, TradeAction::Buy);
        assert_relative_eq!(levels.stop_loss, 98.5);
        assert_relative_eq!(levels.target, 106.0);

        // midline on the wrong side falls back to 1.5x risk
        let levels = strategy.calculate_trade_levels(100.0, &s, TradeAction::Short);
        assert_relative_eq!(levels.stop_loss, 101.5);
        assert_relative_eq!(levels.target, 97.75);
    }

    #[test]
    fn test_rsi_gate_by_direction() {
        let strategy = MeanReversionStrategy::default();
        let ctx = StrategyContext::default();

        let oversold = signal(70.0, &[("RSI_14", Direction::Buy, 24.0), ("BB", Direction::Buy, 0.0)]);
        assert!(strategy.should_take_trade(&oversold, 100.0, &ctx).accepted);

        let not_extreme = signal(70.0, &[("RSI_14", Direction::Buy, 45.0)]);
        assert!(!strategy.should_take_trade(&not_extreme, 100.0, &ctx).accepted);

        // bearish setup needs overbought, an oversold RSI is the wrong extreme
        let wrong_extreme = signal(70.0, &[("RSI_14", Direction::Sell, 24.0)]);
        assert!(!strategy.should_take_trade(&wrong_extreme, 100.0, &ctx).accepted);

        let missing = signal(70.0, &[("MACD", Direction::Buy, 0.2)]);
        let verdict = strategy.should_take_trade(&missing, 100.0, &ctx);
        assert_eq!(verdict.reason, "RSI data not available");
    }
}
