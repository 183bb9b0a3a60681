//! Turns per-indicator readings into one directional verdict, and combines
//! verdicts from several timeframes.

mod aggregator;
mod multi_timeframe;

pub use aggregator::{default_indicator_weights, validate_weights, SignalAggregator, FALLBACK_WEIGHT};
pub use multi_timeframe::{default_timeframe_weights, MultiTimeframeAggregator};

use trade_core::Direction;

/// Direction and confidence from weighted scores and head counts.
///
/// `confidence = min(100, diff * scale + agreement * 50)` where `diff` is the
/// winning score margin and `agreement` the winning side's share of the count.
/// Equal scores are Neutral at 50; no inputs at all is Neutral at 0.
pub(crate) fn resolve_direction(
    bullish_score: f64,
    bearish_score: f64,
    bullish_count: usize,
    bearish_count: usize,
    total_count: usize,
    scale: f64,
) -> (Direction, f64) {
    if total_count == 0 {
        return (Direction::Neutral, 0.0);
    }

    let total = total_count as f64;
    if bullish_score > bearish_score {
        let diff = bullish_score - bearish_score;
        let agreement = bullish_count as f64 / total;
        let confidence = (diff * scale + agreement * 50.0).clamp(0.0, 100.0);
        let direction = if confidence >= 70.0 {
            Direction::StrongBuy
        } else {
            Direction::Buy
        };
        (direction, confidence)
    } else if bearish_score > bullish_score {
        let diff = bearish_score - bullish_score;
        let agreement = bearish_count as f64 / total;
        let confidence = (diff * scale + agreement * 50.0).clamp(0.0, 100.0);
        let direction = if confidence >= 70.0 {
            Direction::StrongSell
        } else {
            Direction::Sell
        };
        (direction, confidence)
    } else {
        (Direction::Neutral, 50.0)
    }
}
