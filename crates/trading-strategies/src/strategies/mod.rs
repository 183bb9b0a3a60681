mod breakout;
mod intraday_short;
mod mean_reversion;
mod momentum_swing;
mod multi_indicator;
mod multi_timeframe;
mod trend_following;

pub use breakout::BreakoutStrategy;
pub use intraday_short::IntradayShortStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use momentum_swing::MomentumSwingStrategy;
pub use multi_indicator::MultiIndicatorStrategy;
pub use multi_timeframe::{calculate_alignment_score, MultiTimeframeStrategy};
pub use trend_following::TrendFollowingStrategy;

use crate::config::StrategyConfig;

/// Caller's config, or the strategy's own defaults
pub(crate) fn config_or_default(
    config: Option<StrategyConfig>,
    name: &str,
    description: &str,
) -> StrategyConfig {
    config.unwrap_or_else(|| StrategyConfig::named(name, description))
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};
    use trade_core::{AggregatedSignal, Direction, IndicatorSignal};

    /// Signal with the given confidence and indicators; counts follow the
    /// indicator directions.
    pub fn signal(confidence: f64, indicators: &[(&str, Direction, f64)]) -> AggregatedSignal {
        let ts = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        let mut signal = AggregatedSignal::neutral("ITC", ts, confidence);
        for (name, direction, value) in indicators {
            if direction.is_bullish() {
                signal.bullish_count += 1;
            } else if direction.is_bearish() {
                signal.bearish_count += 1;
            } else {
                signal.neutral_count += 1;
            }
            signal.indicator_signals.insert(
                name.to_string(),
                IndicatorSignal::new(*name, *direction, 70.0, *value),
            );
        }
        signal.direction = if signal.leans_bullish() {
            Direction::Buy
        } else if signal.leans_bearish() {
            Direction::Sell
        } else {
            Direction::Neutral
        };
        signal
    }
}
