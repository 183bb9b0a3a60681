use trade_core::{AggregatedSignal, TradeAction, TradeLevels};

use super::config_or_default;
use crate::config::StrategyConfig;
use crate::strategy::{adx, atr, check_confidence, ema, rsi, StopRule, Strategy, StrategyContext, Verdict};

/// EMA 20/50 trend with RSI confirmation for multi-day swings.
///
/// The stop takes the wider of 2% and 1.5× ATR so the trend has room to
/// breathe; the target is 3× risk.
#[derive(Debug, Clone)]
pub struct TrendFollowingStrategy {
    config: StrategyConfig,
    stop: StopRule,
    reward_multiple: f64,
    min_adx: f64,
    rsi_buy: (f64, f64),
    rsi_sell: (f64, f64),
}

impl TrendFollowingStrategy {
    pub const NAME: &'static str = "TREND_FOLLOWING";
    pub const DESCRIPTION: &'static str =
        "Trend following strategy using EMA crossover with RSI confirmation for swing trades";

    pub fn new(config: Option<StrategyConfig>) -> Self {
        let config = config_or_default(config, Self::NAME, Self::DESCRIPTION);
        Self {
            stop: StopRule::Wider {
                atr_multiplier: config.param_f64("atr_multiplier", 1.5),
                percent: config.param_f64("stop_percent", 2.0),
            },
            reward_multiple: config.param_f64("reward_multiple", 3.0),
            min_adx: config.param_f64("min_adx", 20.0),
            rsi_buy: (
                config.param_f64("rsi_buy_min", 40.0),
                config.param_f64("rsi_buy_max", 70.0),
            ),
            rsi_sell: (
                config.param_f64("rsi_sell_min", 30.0),
                config.param_f64("rsi_sell_max", 60.0),
            ),
            config,
        }
    }
}

impl Default for TrendFollowingStrategy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Strategy for TrendFollowingStrategy {
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
            return Verdict::reject("RSI data not available");
        };
        let Some(adx) = adx(signal) else {
            return Verdict::reject("ADX data not available for trend strength");
        };

        if adx < self.min_adx {
            return Verdict::reject(format!("ADX {adx:.1} < {} (trend too weak)", self.min_adx));
        }

        let bullish = signal.leans_bullish();
        let bearish = signal.leans_bearish();

        if let (Some(fast), Some(slow)) = (ema(signal, 20), ema(signal, 50)) {
            if bullish && fast <= slow {
                return Verdict::reject(format!(
                    "Bullish signal but EMA bearish (EMA20: {fast:.2} <= EMA50: {slow:.2})"
                ));
            }
            if bearish && fast >= slow {
                return Verdict::reject(format!(
                    "Bearish signal but EMA bullish (EMA20: {fast:.2} >= EMA50: {slow:.2})"
                ));
            }
        }

        if bullish {
            let (min, max) = self.rsi_buy;
            if rsi < min {
                return Verdict::reject(format!("RSI {rsi:.1} < {min} (uptrend not confirmed)"));
            }
            if rsi > max {
                return Verdict::reject(format!("RSI {rsi:.1} > {max} (overbought, trend may reverse)"));
            }
        } else if bearish {
            let (min, max) = self.rsi_sell;
            if rsi < min {
                return Verdict::reject(format!("RSI {rsi:.1} < {min} (oversold, may bounce)"));
            }
            if rsi > max {
                return Verdict::reject(format!("RSI {rsi:.1} > {max} (downtrend not confirmed)"));
            }
        }

        Verdict::accept(format!("Trend confirmed (ADX: {adx:.1}, RSI: {rsi:.1})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::signal;
    use approx::assert_relative_eq;
    use trade_core::Direction;

    #[test]
    fn test_wider_stop() {
        let strategy = TrendFollowingStrategy::default();
        // 1.5 x ATR 2 = 3 beats 2% of 100
        let s = signal(70.0, &[("ATR", Direction::Neutral, 2.0)]);
        let levels = strategy.calculate_trade_levels(100.0, &s, TradeAction::Short);
        assert_relative_eq!(levels.stop_loss, 103.0);
        assert_relative_eq!(levels.target, 91.0);
    }

    #[test]
    fn test_uptrend_confirmed() {
        let strategy = TrendFollowingStrategy::default();
        let s = signal(
            72.0,
            &[
                ("RSI", Direction::Buy, 58.0),
                ("ADX", Direction::Buy, 27.0),
                ("EMA_20", Direction::Buy, 105.0),
                ("EMA_50", Direction::Neutral, 101.0),
            ],
        );
        let verdict = strategy.should_take_trade(&s, 106.0, &StrategyContext::default());
        assert!(verdict.accepted, "{}", verdict.reason);
    }

    #[test]
    fn test_ema_misalignment_rejected() {
        let strategy = TrendFollowingStrategy::default();
        let s = signal(
            72.0,
            &[
                ("RSI", Direction::Buy, 58.0),
                ("ADX", Direction::Buy, 27.0),
                ("EMA_20", Direction::Neutral, 99.0),
                ("EMA_50", Direction::Neutral, 101.0),
            ],
        );
        let verdict = strategy.should_take_trade(&s, 100.0, &StrategyContext::default());
        assert!(verdict.reason.contains("EMA bearish"));
    }

    #[test]
    fn test_rsi_band_and_required_indicators() {
        let strategy = TrendFollowingStrategy::default();
        let ctx = StrategyContext::default();

        let overbought = signal(72.0, &[("RSI", Direction::Buy, 75.0), ("ADX", Direction::Buy, 27.0)]);
        assert!(strategy.should_take_trade(&overbought, 100.0, &ctx).reason.contains("overbought"));

        let bearish_ok = signal(72.0, &[("RSI", Direction::Sell, 45.0), ("ADX", Direction::Sell, 27.0)]);
        assert!(strategy.should_take_trade(&bearish_ok, 100.0, &ctx).accepted);

        let no_adx = signal(72.0, &[("RSI", Direction::Buy, 55.0)]);
        assert!(!strategy.should_take_trade(&no_adx, 100.0, &ctx).accepted);

        let weak = signal(72.0, &[("RSI", Direction::Buy, 55.0), ("ADX", Direction::Buy, 12.0)]);
        assert!(strategy.should_take_trade(&weak, 100.0, &ctx).reason.contains("trend too weak"));
    }
}
