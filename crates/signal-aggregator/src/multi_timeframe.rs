use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trade_core::{AggregatedSignal, IndicatorSignal, Timeframe, TradeError};

use crate::{resolve_direction, FALLBACK_WEIGHT};

/// Timeframe scores span a narrower range than indicator scores
const TIMEFRAME_SCALE: f64 = 150.0;

pub fn default_timeframe_weights() -> BTreeMap<Timeframe, f64> {
    BTreeMap::from([
        (Timeframe::Daily, 0.40),
        (Timeframe::Hour1, 0.30),
        (Timeframe::Min15, 0.20),
        (Timeframe::Min5, 0.10),
    ])
}

/// Combines per-timeframe verdicts into one cross-timeframe verdict.
///
/// Longer timeframes carry more weight by default. Timeframes with no signal
/// are skipped and the scores are normalised by the weight actually used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiTimeframeAggregator {
    weights: BTreeMap<Timeframe, f64>,
}

impl Default for MultiTimeframeAggregator {
    fn default() -> Self {
        Self {
            weights: default_timeframe_weights(),
        }
    }
}

impl MultiTimeframeAggregator {
    pub fn new(weights: BTreeMap<Timeframe, f64>) -> Result<Self, TradeError> {
        let errors: Vec<String> = weights
            .iter()
            .filter(|(_, w)| !w.is_finite() || **w < 0.0)
            .map(|(tf, w)| format!("weight for timeframe {tf} must be a non-negative number, got {w}"))
            .collect();
        if !errors.is_empty() {
            return Err(TradeError::InvalidConfig(errors));
        }
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &BTreeMap<Timeframe, f64> {
        &self.weights
    }

    pub fn weight_for(&self, timeframe: Timeframe) -> f64 {
        self.weights.get(&timeframe).copied().unwrap_or(FALLBACK_WEIGHT)
    }

    /// The result carries the latest input timestamp; each timeframe appears in
    /// `indicator_signals` under its code with its confidence as strength.
    pub fn aggregate(
        &self,
        symbol: &str,
        signals: &BTreeMap<Timeframe, AggregatedSignal>,
    ) -> AggregatedSignal {
        let timestamp = signals
            .values()
            .map(|s| s.timestamp)
            .max()
            .unwrap_or_else(Utc::now);

        let mut bullish_count = 0;
        let mut bearish_count = 0;
        let mut neutral_count = 0;
        let mut bullish_score = 0.0;
        let mut bearish_score = 0.0;
        let mut total_weight = 0.0;
        let mut evidence = BTreeMap::new();
        let mut reasons = Vec::with_capacity(signals.len());

        // Longest timeframe first in the reasons
        for (timeframe, signal) in signals.iter().rev() {
            let weight = self.weight_for(*timeframe);
            let confidence = signal.confidence.clamp(0.0, 100.0) / 100.0;
            total_weight += weight;

            if signal.direction.is_bullish() {
                bullish_count += 1;
                bullish_score += weight * confidence;
            } else if signal.direction.is_bearish() {
                bearish_count += 1;
                bearish_score += weight * confidence;
            } else {
                neutral_count += 1;
            }

            reasons.push(format!(
                "{}: {} ({:.0}% confidence)",
                timeframe,
                signal.direction.to_label(),
                signal.confidence
            ));
            evidence.insert(
                timeframe.code().to_string(),
                IndicatorSignal::new(
                    timeframe.code(),
                    signal.direction,
                    signal.confidence,
                    signal.confidence,
                ),
            );
        }

        if total_weight > 0.0 {
            bullish_score /= total_weight;
            bearish_score /= total_weight;
        }

        let (direction, confidence) = resolve_direction(
            bullish_score,
            bearish_score,
            bullish_count,
            bearish_count,
            bullish_count + bearish_count + neutral_count,
            TIMEFRAME_SCALE,
        );

        debug!(
            "Multi-timeframe verdict for {} over {} timeframes: {:?} ({:.1}%)",
            symbol,
            signals.len(),
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
            indicator_signals: evidence,
            reasons,
        }
    }
}
