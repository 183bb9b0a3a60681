use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use trade_core::{Details, PositionSizeResult};

use crate::sizer::{cap_quantity, shares_for, PositionSizer, SizingRequest, TradePerformance};

/// Kelly Criterion position sizing
///
/// The Kelly Criterion determines the position size that maximises
/// long-term growth. Formula: f* = (bp - q) / b
/// where:
///   f* = optimal fraction of capital
///   b = avg win / avg loss
///   p = probability of winning
///   q = probability of losing (1 - p)
///
/// Full Kelly is very aggressive, so `kelly_fraction` scales it down
/// (0.25 = quarter Kelly).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellyCriterionSizer {
    /// Default edge when the request carries no performance history
    pub performance: TradePerformance,

    /// Fractional Kelly multiplier
    pub kelly_fraction: f64,

    /// Maximum position size as percent of capital
    pub max_position_percent: f64,
}

impl Default for KellyCriterionSizer {
    fn default() -> Self {
        Self {
            performance: TradePerformance {
                win_rate: 0.55,
                avg_win: 6.0,
                avg_loss: 3.0,
            },
            kelly_fraction: 0.25, // Quarter Kelly
            max_position_percent: 20.0,
        }
    }
}

impl KellyCriterionSizer {
    pub const NAME: &'static str = "KELLY_CRITERION";

    pub fn new(performance: TradePerformance, kelly_fraction: f64, max_position_percent: f64) -> Self {
        Self {
            performance,
            kelly_fraction,
            max_position_percent,
        }
    }

    /// Replace the default edge with recent results
    pub fn update_stats(&mut self, performance: TradePerformance) {
        info!(
            "Kelly stats updated: win_rate {:.2}, avg_win {:.2}, avg_loss {:.2}",
            performance.win_rate, performance.avg_win, performance.avg_loss
        );
        self.performance = performance;
    }

    /// Fractional Kelly as a fraction of capital (may be negative)
    pub fn kelly_fraction_for(&self, performance: &TradePerformance) -> f64 {
        let p = performance.win_rate;
        let q = 1.0 - p;
        let b = if performance.avg_loss > 0.0 {
            performance.avg_win / performance.avg_loss
        } else {
            1.0
        };
        let raw_kelly = (p * b - q) / b;
        raw_kelly * self.kelly_fraction
    }
}

impl PositionSizer for KellyCriterionSizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        format!(
            "Kelly Criterion ({:.0}% Kelly) - Optimal growth sizing based on edge",
            self.kelly_fraction * 100.0
        )
    }

    fn calculate_position_size(&self, request: &SizingRequest) -> PositionSizeResult {
        if let Some(error) = request.validate() {
            debug!("Kelly sizing refused: {}", error);
            return PositionSizeResult::zero(Self::NAME, error);
        }

        let risk_per_share = request.risk_per_share();
        if risk_per_share == 0.0 {
            return PositionSizeResult::zero(Self::NAME, "Stop loss equals entry price");
        }

        let performance = request.performance.unwrap_or(self.performance);
        let kelly = self.kelly_fraction_for(&performance);

        if kelly <= 0.0 {
            debug!("Negative Kelly ({:.4}) - no edge, sizing to zero", kelly);
            let mut result = PositionSizeResult::zero(Self::NAME, "Negative Kelly - no edge detected");
            result.details.insert("negative_edge".into(), json!(true));
            result.details.insert("kelly_percent".into(), json!(kelly * 100.0));
            result.details.insert("win_rate".into(), json!(performance.win_rate));
            return result;
        }

        let kelly_percent = (kelly * 100.0).min(self.max_position_percent);
        let capital = request.capital;
        let target_value = capital * kelly_percent / 100.0;
        let quantity = cap_quantity(
            shares_for(target_value, request.entry_price),
            request.entry_price,
            capital,
            100.0,
        );

        let position_value = quantity as f64 * request.entry_price;
        let risk_amount = quantity as f64 * risk_per_share;
        let risk_percent = risk_amount / capital * 100.0;
        let loss_rate = 1.0 - performance.win_rate;

        let mut details = Details::new();
        details.insert("kelly_percent".into(), json!(kelly_percent));
        details.insert("kelly_fraction".into(), json!(self.kelly_fraction));
        details.insert("win_rate".into(), json!(performance.win_rate));
        details.insert("avg_win".into(), json!(performance.avg_win));
        details.insert("avg_loss".into(), json!(performance.avg_loss));
        details.insert(
            "edge".into(),
            json!(performance.win_rate * performance.avg_win - loss_rate * performance.avg_loss),
        );

        PositionSizeResult {
            quantity,
            position_value,
            risk_amount,
            risk_percent,
            method: Self::NAME.to_string(),
            confidence: (performance.win_rate * 100.0 + 20.0).min(100.0),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_negative_edge() {
        let sizer = KellyCriterionSizer::default();
        let request = SizingRequest::new(100_000.0, 100.0, 95.0).with_performance(TradePerformance {
            win_rate: 0.3,
            avg_win: 2.0,
            avg_loss: 5.0,
        });
        let result = sizer.calculate_position_size(&request);

        assert_eq!(result.quantity, 0);
        assert_eq!(result.details.get("negative_edge"), Some(&json!(true)));
        assert_eq!(result.error(), Some("Negative Kelly - no edge detected"));
    }

    #[test]
    fn test_quarter_kelly_with_defaults() {
        let sizer = KellyCriterionSizer::default();
        // b = 2, raw kelly = (0.55 * 2 - 0.45) / 2 = 0.325, quarter = 8.125%
        assert_relative_eq!(sizer.kelly_fraction_for(&sizer.performance), 0.08125, epsilon = 1e-12);

        let result = sizer.calculate_position_size(&SizingRequest::new(100_000.0, 100.0, 97.0));
        assert_eq!(result.quantity, 81);
        assert_relative_eq!(result.position_value, 8_100.0);
        assert_relative_eq!(result.risk_amount, 243.0, epsilon = 1e-9);
        assert_relative_eq!(result.risk_percent, 0.243, epsilon = 1e-9);
        assert_relative_eq!(result.confidence, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_capped_at_max_position() {
        let sizer = KellyCriterionSizer::new(
            TradePerformance {
                win_rate: 0.8,
                avg_win: 10.0,
                avg_loss: 2.0,
            },
            1.0,
            20.0,
        );
        let result = sizer.calculate_position_size(&SizingRequest::new(50_000.0, 100.0, 98.0));
        assert_eq!(result.quantity, 100);
        assert_relative_eq!(result.confidence, 100.0);
    }

    #[test]
    fn test_zero_avg_loss_uses_even_odds() {
        let sizer = KellyCriterionSizer::default();
        let perf = TradePerformance {
            win_rate: 0.6,
            avg_win: 4.0,
            avg_loss: 0.0,
        };
        // b = 1: (0.6 - 0.4) / 1 = 0.2, quarter = 0.05
        assert_relative_eq!(sizer.kelly_fraction_for(&perf), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_stop_equal_to_entry() {
        let result = KellyCriterionSizer::default()
            .calculate_position_size(&SizingRequest::new(100_000.0, 100.0, 100.0));
        assert_eq!(result.quantity, 0);
    }
}
