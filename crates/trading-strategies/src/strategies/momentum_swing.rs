use trade_core::{AggregatedSignal, TradeAction, TradeLevels};

use super::config_or_default;
use crate::config::StrategyConfig;
use crate::strategy::{
    adx, atr, check_confidence, macd_histogram, rsi, stochastic_k, StopRule, Strategy,
    StrategyContext, Verdict,
};

/// Short daily swings when RSI, MACD and Stochastic all confirm momentum.
/// Momentum reverses fast, so the stop is the tighter of 2.5% and 1.5× ATR.
#[derive(Debug, Clone)]
pub struct MomentumSwingStrategy {
    config: StrategyConfig,
    stop: StopRule,
    reward_multiple: f64,
    min_adx: f64,
    min_confidence: f64,
    rsi_bullish: (f64, f64),
    rsi_bearish: (f64, f64),
}

impl MomentumSwingStrategy {
    pub const NAME: &'static str = "MOMENTUM_SWING";
    pub const DESCRIPTION: &'static str =
        "Captures strong daily momentum with multi-indicator confirmation and volume validation";

    pub fn new(config: Option<StrategyConfig>) -> Self {
        let config = config_or_default(config, Self::NAME, Self::DESCRIPTION);
        Self {
            stop: StopRule::Tighter {
                atr_multiplier: config.param_f64("atr_multiplier", 1.5),
                percent: config.param_f64("stop_percent", 2.5),
            },
            reward_multiple: config.param_f64("reward_multiple", 2.5),
            min_adx: config.param_f64("min_adx", 20.0),
            min_confidence: config.param_f64("momentum_min_confidence", 65.0),
            rsi_bullish: (
                config.param_f64("rsi_bullish_threshold", 60.0),
                config.param_f64("rsi_bullish_extreme", 85.0),
            ),
            rsi_bearish: (
                config.param_f64("rsi_bearish_extreme", 15.0),
                config.param_f64("rsi_bearish_threshold", 40.0),
            ),
            config,
        }
    }
}

impl Default for MomentumSwingStrategy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Strategy for MomentumSwingStrategy {
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

        let Some(rsi) = rsi(signal) else {
            return Verdict::reject("RSI not available");
        };
        let Some(adx) = adx(signal) else {
            return Verdict::reject("ADX not available");
        };
        if adx < self.min_adx {
            return Verdict::reject(format!(
                "ADX {adx:.1} < {} (market too choppy for momentum)",
                self.min_adx
            ));
        }

        let macd = macd_histogram(signal);
        let stoch = stochastic_k(signal);

        if signal.leans_bullish() {
            let (threshold, extreme) = self.rsi_bullish;
            if rsi < threshold {
                return Verdict::reject(format!(
                    "RSI {rsi:.1} < {threshold} (insufficient bullish momentum)"
                ));
            }
            if rsi > extreme {
                return Verdict::reject(format!("RSI {rsi:.1} > {extreme} (extremely overbought, avoid)"));
            }
            if macd.is_some_and(|m| m < 0.0) {
                return Verdict::reject("MACD histogram negative (momentum not confirmed)");
            }
            if let Some(k) = stoch.filter(|k| *k < 50.0) {
                return Verdict::reject(format!("Stochastic %K {k:.1} < 50 (momentum not confirmed)"));
            }
        } else if signal.leans_bearish() {
            let (extreme, threshold) = self.rsi_bearish;
            if rsi > threshold {
                return Verdict::reject(format!(
                    "RSI {rsi:.1} > {threshold} (insufficient bearish momentum)"
                ));
            }
            if rsi < extreme {
                return Verdict::reject(format!("RSI {rsi:.1} < {extreme} (extremely oversold, may bounce)"));
            }
            if macd.is_some_and(|m| m > 0.0) {
                return Verdict::reject("MACD histogram positive (bearish momentum not confirmed)");
            }
            if let Some(k) = stoch.filter(|k| *k > 50.0) {
                return Verdict::reject(format!(
                    "Stochastic %K {k:.1} > 50 (bearish momentum not confirmed)"
                ));
            }
        }

        if signal.confidence < self.min_confidence {
            return Verdict::reject(format!(
                "Confidence {:.0}% < {}% (momentum needs high confidence)",
                signal.confidence, self.min_confidence
            ));
        }

        Verdict::accept(format!(
            "Momentum confirmed (RSI: {rsi:.1}, ADX: {adx:.1}, Confidence: {:.0}%)",
            signal.confidence
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::signal;
    use approx::assert_relative_eq;
    use trade_core::Direction;

    #[test]
    fn test_tighter_stop() {
        let strategy = MomentumSwingStrategy::default();
        // 1.5 x ATR 1 = 1.5 is tighter than 2.5% of 100
        let s = signal(70.0, &[("ATR", Direction::Neutral, 1.0)]);
        let levels = strategy.calculate_trade_levels(100.0, &s, TradeAction::Buy);
        assert_relative_eq!(levels.stop_loss, 98.5);
        assert_relative_eq!(levels.target, 103.75);
    }

    #[test]
    fn test_bullish_momentum() {
        let strategy = MomentumSwingStrategy::default();
        let ctx = StrategyContext::default();
        let good = signal(
            72.0,
            &[
                ("RSI", Direction::Buy, 66.0),
                ("ADX", Direction::Buy, 24.0),
                ("MACD", Direction::Buy, 0.8),
                ("STOCH", Direction::Buy, 71.0),
            ],
        );
        assert!(strategy.should_take_trade(&good, 100.0, &ctx).accepted);

        let negative_macd = signal(
            72.0,
            &[
                ("RSI", Direction::Buy, 66.0),
                ("ADX", Direction::Buy, 24.0),
                ("MACD", Direction::Neutral, -0.3),
            ],
        );
        assert!(strategy.should_take_trade(&negative_macd, 100.0, &ctx).reason.contains("MACD"));

        let overheated = signal(72.0, &[("RSI", Direction::Buy, 90.0), ("ADX", Direction::Buy, 24.0)]);
        assert!(!strategy.should_take_trade(&overheated, 100.0, &ctx).accepted);
    }

    #[test]
    fn test_bearish_momentum_and_confidence() {
        let strategy = MomentumSwingStrategy::default();
        let ctx = StrategyContext::default();
        let bearish = signal(
            68.0,
            &[
                ("RSI", Direction::Sell, 32.0),
                ("ADX", Direction::Sell, 26.0),
                ("STOCH", Direction::Sell, 22.0),
            ],
        );
        assert!(strategy.should_take_trade(&bearish, 100.0, &ctx).accepted);

        let lukewarm = signal(
            62.0,
            &[("RSI", Direction::Sell, 32.0), ("ADX", Direction::Sell, 26.0)],
        );
        assert!(strategy
            .should_take_trade(&lukewarm, 100.0, &ctx)
            .reason
            .contains("momentum needs high confidence"));
    }
}
