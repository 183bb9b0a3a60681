use trade_core::{AggregatedSignal, TradeAction, TradeLevels};

use super::config_or_default;
use crate::config::StrategyConfig;
use crate::strategy::{adx, atr, check_confidence, StopRule, Strategy, StrategyContext, Verdict};

/// Top-down alignment: daily sets the trend, hourly confirms it and the
/// execution timeframe (15m) times the entry.
///
/// Very selective. Needs the daily and hourly signals in the context.
#[derive(Debug, Clone)]
pub struct MultiTimeframeStrategy {
    config: StrategyConfig,
    stop: StopRule,
    reward_multiple: f64,
    min_alignment_score: f64,
    min_daily_adx: f64,
    min_confidence: f64,
    min_average_consensus: f64,
}

impl MultiTimeframeStrategy {
    pub const NAME: &'static str = "MULTI_TIMEFRAME";
    pub const DESCRIPTION: &'static str = "Advanced multi-timeframe alignment strategy requiring trend confirmation across daily, hourly, and 15-min charts";

    pub fn new(config: Option<StrategyConfig>) -> Self {
        let config = config_or_default(config, Self::NAME, Self::DESCRIPTION);
        Self {
            stop: StopRule::Wider {
                atr_multiplier: config.param_f64("atr_multiplier", 1.5),
                percent: config.param_f64("stop_percent", 2.0),
            },
            reward_multiple: config.param_f64("reward_multiple", 3.0),
            min_alignment_score: config.param_f64("min_alignment_score", 80.0),
            min_daily_adx: config.param_f64("min_daily_adx", 20.0),
            min_confidence: config.param_f64("execution_min_confidence", 70.0),
            min_average_consensus: config.param_f64("min_average_consensus", 70.0),
            config,
        }
    }
}

impl Default for MultiTimeframeStrategy {
    fn default() -> Self {
        Self::new(None)
    }
}

/// How well daily, hourly and execution timeframes agree, 0 to 100.
///
/// Directions are read by head count, and anything not bullish counts as
/// bearish. Partial agreement scores at most 50; full agreement scores 60
/// plus up to 40 from the 0.5/0.3/0.2 weighted confidence.
pub fn calculate_alignment_score(
    daily: &AggregatedSignal,
    hourly: &AggregatedSignal,
    execution: &AggregatedSignal,
) -> f64 {
    let d = daily.leans_bullish();
    let h = hourly.leans_bullish();
    let e = execution.leans_bullish();

    let all_agree = (d && h && e) || (!d && !h && !e);
    let score = if all_agree {
        let weighted_confidence =
            daily.confidence * 0.5 + hourly.confidence * 0.3 + execution.confidence * 0.2;
        60.0 + weighted_confidence / 100.0 * 40.0
    } else {
        let agreeing_pairs = [d == h, h == e, d == e].iter().filter(|x| **x).count();
        agreeing_pairs as f64 / 3.0 * 50.0
    };
    score.min(100.0)
}

impl Strategy for MultiTimeframeStrategy {
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
        context: &StrategyContext<'_>,
    ) -> Verdict {
        if let Some(rejected) = check_confidence(&self.config, signal) {
            return rejected;
        }

        let (Some(daily), Some(hourly)) = (context.daily_signal, context.hourly_signal) else {
            return Verdict::reject("Multi-timeframe data not available (daily/hourly signals required)");
        };

        let alignment = context
            .alignment_score
            .unwrap_or_else(|| calculate_alignment_score(daily, hourly, signal));
        if alignment < self.min_alignment_score {
            return Verdict::reject(format!(
                "Alignment score {alignment:.0}% < {}% (timeframes not aligned)",
                self.min_alignment_score
            ));
        }

        let Some(daily_adx) = adx(daily) else {
            return Verdict::reject("Daily ADX not available");
        };
        if daily_adx < self.min_daily_adx {
            return Verdict::reject(format!(
                "Daily ADX {daily_adx:.1} < {} (daily trend too weak)",
                self.min_daily_adx
            ));
        }

        if signal.leans_bullish() {
            if !daily.leans_bullish() {
                return Verdict::reject("Bullish signal but daily trend is bearish (timeframe conflict)");
            }
            if !hourly.leans_bullish() {
                return Verdict::reject(
                    "Bullish signal but hourly trend is bearish (intermediate timeframe conflict)",
                );
            }
        } else if signal.leans_bearish() {
            if !daily.leans_bearish() {
                return Verdict::reject("Bearish signal but daily trend is bullish (timeframe conflict)");
            }
            if !hourly.leans_bearish() {
                return Verdict::reject(
                    "Bearish signal but hourly trend is bullish (intermediate timeframe conflict)",
                );
            }
        }

        if signal.confidence < self.min_confidence {
            return Verdict::reject(format!(
                "Execution timeframe confidence {:.0}% < {}% (need strong entry signal)",
                signal.confidence, self.min_confidence
            ));
        }

        let average_consensus = (daily.consensus_strength()
            + hourly.consensus_strength()
            + signal.consensus_strength())
            / 3.0;
        if average_consensus < self.min_average_consensus {
            return Verdict::reject(format!(
                "Average consensus {average_consensus:.0}% < {}% (weak agreement across timeframes)",
                self.min_average_consensus
            ));
        }

        Verdict::accept(format!(
            "Multi-timeframe alignment confirmed (Daily ADX: {daily_adx:.1}, Alignment: {alignment:.0}%, Consensus: {average_consensus:.0}%)"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::signal;
    use approx::assert_relative_eq;
    use trade_core::Direction;

    fn bullish(confidence: f64, adx: f64) -> AggregatedSignal {
        signal(
            confidence,
            &[
                ("RSI", Direction::Buy, 60.0),
                ("MACD", Direction::Buy, 0.6),
                ("ADX", Direction::Buy, adx),
            ],
        )
    }

    #[test]
    fn test_alignment_score_full_agreement() {
        let score = calculate_alignment_score(&bullish(80.0, 30.0), &bullish(70.0, 25.0), &bullish(90.0, 22.0));
        // weighted confidence 40 + 21 + 18 = 79
        assert_relative_eq!(score, 60.0 + 0.79 * 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_alignment_score_partial() {
        let bearish = signal(70.0, &[("RSI", Direction::Sell, 35.0)]);
        let score = calculate_alignment_score(&bullish(80.0, 30.0), &bullish(70.0, 25.0), &bearish);
        // only daily/hourly agree
        assert_relative_eq!(score, 50.0 / 3.0, epsilon = 1e-9);

        // a neutral timeframe counts as not bullish
        let neutral = signal(50.0, &[]);
        let score = calculate_alignment_score(&neutral, &neutral, &neutral);
        assert_relative_eq!(score, 60.0 + 0.5 * 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_aligned_setup_accepted() {
        let strategy = MultiTimeframeStrategy::default();
        let daily = bullish(80.0, 30.0);
        let hourly = bullish(75.0, 24.0);
        let execution = bullish(78.0, 21.0);
        let ctx = StrategyContext {
            daily_signal: Some(&daily),
            hourly_signal: Some(&hourly),
            ..Default::default()
        };
        let verdict = strategy.should_take_trade(&execution, 100.0, &ctx);
        assert!(verdict.accepted, "{}", verdict.reason);
    }

    #[test]
    fn test_requires_higher_timeframes() {
        let strategy = MultiTimeframeStrategy::default();
        let execution = bullish(78.0, 21.0);
        let verdict = strategy.should_take_trade(&execution, 100.0, &StrategyContext::default());
        assert!(verdict.reason.contains("daily/hourly signals required"));
    }

    #[test]
    fn test_weak_daily_trend_and_low_alignment() {
        let strategy = MultiTimeframeStrategy::default();
        let daily = bullish(80.0, 15.0);
        let hourly = bullish(75.0, 24.0);
        let execution = bullish(78.0, 21.0);
        let ctx = StrategyContext {
            daily_signal: Some(&daily),
            hourly_signal: Some(&hourly),
            ..Default::default()
        };
        assert!(strategy.should_take_trade(&execution, 100.0, &ctx).reason.contains("Daily ADX"));

        let ctx = StrategyContext {
            alignment_score: Some(65.0),
            ..ctx
        };
        assert!(strategy.should_take_trade(&execution, 100.0, &ctx).reason.contains("Alignment score"));
    }
}
