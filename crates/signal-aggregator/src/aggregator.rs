use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trade_core::{AggregatedSignal, IndicatorSignal, TradeError};

use crate::resolve_direction;

/// Weight given to indicators missing from the weight table
pub const FALLBACK_WEIGHT: f64 = 0.1;

/// Default reliability weights; normalised at construction
pub fn default_indicator_weights() -> BTreeMap<String, f64> {
    [
        ("RSI", 0.25),
        ("MACD", 0.25),
        ("BB", 0.20),
        ("ADX", 0.15),
        ("STOCH", 0.10),
        ("ATR", 0.05),
    ]
    .into_iter()
    .map(|(name, weight)| (name.to_string(), weight))
    .collect()
}

/// Weighted vote over indicator signals.
///
/// Weights are normalised to sum to 1.0 once, when the aggregator is built, and
/// never change afterwards, so one instance can be shared across threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalAggregator {
    weights: BTreeMap<String, f64>,
}

impl Default for SignalAggregator {
    fn default() -> Self {
        Self {
            weights: normalize(default_indicator_weights()),
        }
    }
}

impl SignalAggregator {
    pub fn new(weights: BTreeMap<String, f64>) -> Result<Self, TradeError> {
        let errors = validate_weights(&weights);
        if !errors.is_empty() {
            return Err(TradeError::InvalidConfig(errors));
        }

        let weights = normalize(weights);
        info!("Signal aggregator initialized with weights: {:?}", weights);
        Ok(Self { weights })
    }

    /// Normalised weight table
    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Weight for an indicator name: exact match, then prefix match
    /// (`RSI_14` uses `RSI`), then [`FALLBACK_WEIGHT`].
    pub fn weight_for(&self, indicator: &str) -> f64 {
        if let Some(weight) = self.weights.get(indicator) {
            return *weight;
        }

        let upper = indicator.to_uppercase();
        self.weights
            .iter()
            .find(|(key, _)| upper.starts_with(&key.to_uppercase()))
            .map(|(_, weight)| *weight)
            .unwrap_or(FALLBACK_WEIGHT)
    }

    pub fn aggregate(
        &self,
        symbol: &str,
        indicator_signals: BTreeMap<String, IndicatorSignal>,
    ) -> AggregatedSignal {
        self.aggregate_at(symbol, indicator_signals, Utc::now())
    }

    /// Same as [`aggregate`](Self::aggregate) with an explicit timestamp, which
    /// makes the output fully determined by the inputs.
    pub fn aggregate_at(
        &self,
        symbol: &str,
        indicator_signals: BTreeMap<String, IndicatorSignal>,
        timestamp: DateTime<Utc>,
    ) -> AggregatedSignal {
        let mut bullish_count = 0;
        let mut bearish_count = 0;
        let mut neutral_count = 0;
        let mut bullish_score = 0.0;
        let mut bearish_score = 0.0;
        let mut reasons = Vec::with_capacity(indicator_signals.len());

        for (name, signal) in &indicator_signals {
            let weight = self.weight_for(name);
            let strength = signal.strength.clamp(0.0, 100.0) / 100.0;

            if signal.direction.is_bullish() {
                bullish_count += 1;
                bullish_score += weight * strength;
                reasons.push(format!("{}: BUY (strength: {:.0})", name, signal.strength));
            } else if signal.direction.is_bearish() {
                bearish_count += 1;
                bearish_score += weight * strength;
                reasons.push(format!("{}: SELL (strength: {:.0})", name, signal.strength));
            } else {
                neutral_count += 1;
                reasons.push(format!("{}: NEUTRAL", name));
            }
        }

        let (direction, confidence) = resolve_direction(
            bullish_score,
            bearish_score,
            bullish_count,
            bearish_count,
            bullish_count + bearish_count + neutral_count,
            100.0,
        );

        debug!(
            "Aggregated {} indicators for {}: {:?} ({:.1}%)",
            indicator_signals.len(),
            symbol,
            direction,
            confidence
        );

        AggregatedSignal {
            symbol: symbol.to_string(),
            timestamp,
            direction,
            confidence,
            bullish_count,
            bearish_count,
            neutral_count,
            bullish_score,
            bearish_score,
            indicator_signals,
            reasons,
        }
    }
}

/// Problems with a weight table, empty when usable
pub fn validate_weights(weights: &BTreeMap<String, f64>) -> Vec<String> {
    let mut errors = Vec::new();
    for (name, weight) in weights {
        if !weight.is_finite() || *weight < 0.0 {
            errors.push(format!("weight for {name} must be a non-negative number, got {weight}"));
        }
    }
    let total: f64 = weights.values().filter(|w| w.is_finite()).sum();
    if total <= 0.0 {
        errors.push("indicator weights must have a positive total".to_string());
    }
    errors
}

fn normalize(weights: BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    let total: f64 = weights.values().sum();
    if total <= 0.0 {
        return weights;
    }
    weights
        .into_iter()
        .map(|(name, weight)| (name, weight / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use trade_core::Direction;

    fn signals(items: &[(&str, Direction, f64)]) -> BTreeMap<String, IndicatorSignal> {
        items
            .iter()
            .map(|(name, direction, strength)| {
                (
                    name.to_string(),
                    IndicatorSignal::new(*name, *direction, *strength, 0.0),
                )
            })
            .collect()
    }

    fn weights(items: &[(&str, f64)]) -> BTreeMap<String, f64> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_weights_normalized() {
        let configs = vec![
            default_indicator_weights(),
            weights(&[("RSI", 0.5), ("MACD", 0.5)]),
            weights(&[("RSI", 3.0), ("MACD", 1.0), ("ADX", 4.0)]),
            weights(&[("RSI", 0.01)]),
        ];
        for config in configs {
            let aggregator = SignalAggregator::new(config).unwrap();
            let total: f64 = aggregator.weights().values().sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
        let total: f64 = SignalAggregator::default().weights().values().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_unusable_weights() {
        assert!(SignalAggregator::new(BTreeMap::new()).is_err());
        assert!(SignalAggregator::new(weights(&[("RSI", -0.5), ("MACD", 1.0)])).is_err());
        assert!(SignalAggregator::new(weights(&[("RSI", 0.0)])).is_err());
    }

    #[test]
    fn test_unanimous_buy() {
        let aggregator = SignalAggregator::new(weights(&[("RSI", 0.5), ("MACD", 0.5)])).unwrap();
        let result = aggregator.aggregate(
            "RELIANCE",
            signals(&[("RSI", Direction::Buy, 80.0), ("MACD", Direction::Buy, 60.0)]),
        );

        assert_relative_eq!(result.bullish_score, 0.7, epsilon = 1e-9);
        assert_relative_eq!(result.confidence, 100.0);
        assert_eq!(result.direction, Direction::StrongBuy);
        assert_eq!(result.bullish_count, 2);
        assert_relative_eq!(result.consensus_strength(), 100.0);
        assert_eq!(result.reasons.len(), 2);
    }

    #[test]
    fn test_bearish_majority() {
        let aggregator = SignalAggregator::new(weights(&[
            ("RSI", 0.25),
            ("MACD", 0.25),
            ("BB", 0.25),
            ("ADX", 0.25),
        ]))
        .unwrap();
        let result = aggregator.aggregate(
            "TCS",
            signals(&[
                ("RSI", Direction::Sell, 40.0),
                ("MACD", Direction::StrongSell, 40.0),
                ("BB", Direction::Buy, 40.0),
                ("ADX", Direction::Neutral, 0.0),
            ]),
        );

        // bearish 0.2, bullish 0.1: diff 0.1 -> 10, agreement 2/4 -> 25
        assert_relative_eq!(result.bearish_score, 0.2, epsilon = 1e-9);
        assert_relative_eq!(result.confidence, 35.0, epsilon = 1e-9);
        assert_eq!(result.direction, Direction::Sell);
        assert_eq!(result.distribution(), (1, 2, 1));
    }

    #[test]
    fn test_equal_scores_are_neutral() {
        let aggregator = SignalAggregator::new(weights(&[("RSI", 0.5), ("MACD", 0.5)])).unwrap();
        let result = aggregator.aggregate(
            "INFY",
            signals(&[("RSI", Direction::Buy, 50.0), ("MACD", Direction::Sell, 50.0)]),
        );
        assert_eq!(result.direction, Direction::Neutral);
        assert_relative_eq!(result.confidence, 50.0);
    }

    #[test]
    fn test_empty_input() {
        let result = SignalAggregator::default().aggregate("INFY", BTreeMap::new());
        assert_eq!(result.direction, Direction::Neutral);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_weight_lookup() {
        let aggregator = SignalAggregator::default();
        assert_relative_eq!(aggregator.weight_for("RSI"), 0.25);
        assert_relative_eq!(aggregator.weight_for("RSI_14"), 0.25);
        assert_relative_eq!(aggregator.weight_for("VWAP"), FALLBACK_WEIGHT);
    }

    #[test]
    fn test_confidence_bounded() {
        let aggregator = SignalAggregator::default();
        let directions = [
            Direction::StrongBuy,
            Direction::Buy,
            Direction::Neutral,
            Direction::Sell,
            Direction::StrongSell,
        ];
        for (i, a) in directions.iter().enumerate() {
            for b in &directions[i..] {
                for strength in [0.0, 35.0, 100.0, 250.0] {
                    let result = aggregator.aggregate(
                        "HDFC",
                        signals(&[
                            ("RSI", *a, strength),
                            ("MACD", *b, strength),
                            ("VWAP", *a, strength),
                        ]),
                    );
                    assert!((0.0..=100.0).contains(&result.confidence));
                }
            }
        }
    }
}
