use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use trade_core::{Details, PositionSizeResult};

use crate::sizer::{cap_quantity, shares_for, PositionSizer, SizingRequest};

/// ATR-based sizing: larger positions in quiet markets, smaller in volatile ones.
///
/// Risk per share is ATR × multiplier. Without ATR it falls back to the stop
/// distance (with lower confidence) unless the fallback is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityAdjustedSizer {
    pub risk_percent: f64,
    pub atr_multiplier: f64,
    pub max_position_percent: f64,
    pub use_stop_if_no_atr: bool,
}

impl Default for VolatilityAdjustedSizer {
    fn default() -> Self {
        Self {
            risk_percent: 1.0,
            atr_multiplier: 2.0,
            max_position_percent: 20.0,
            use_stop_if_no_atr: true,
        }
    }
}

impl VolatilityAdjustedSizer {
    pub const NAME: &'static str = "VOLATILITY_ADJUSTED";
}

impl PositionSizer for VolatilityAdjustedSizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        format!(
            "ATR-based sizing: Risk {}% using {}× ATR",
            self.risk_percent, self.atr_multiplier
        )
    }

    fn calculate_position_size(&self, request: &SizingRequest) -> PositionSizeResult {
        if let Some(error) = request.validate() {
            debug!("Volatility sizing refused: {}", error);
            return PositionSizeResult::zero(Self::NAME, error);
        }
        // Flat levels open nothing, whatever the volatility
        if request.risk_per_share() == 0.0 {
            return PositionSizeResult::zero(Self::NAME, "Stop loss equals entry price");
        }

        let (risk_per_share, sizing_basis, confidence) = match request.atr.filter(|a| *a > 0.0) {
            Some(atr) => (
                atr * self.atr_multiplier,
                format!("ATR ({}×)", self.atr_multiplier),
                100.0,
            ),
            None if self.use_stop_if_no_atr => {
                (request.risk_per_share(), "Stop Loss (no ATR)".to_string(), 70.0)
            }
            None => {
                return PositionSizeResult::zero(Self::NAME, "ATR not provided and fallback disabled")
            }
        };

        if risk_per_share == 0.0 {
            return PositionSizeResult::zero(Self::NAME, "Risk per share is zero");
        }

        let capital = request.capital;
        let risk_amount = capital * self.risk_percent / 100.0;
        let quantity = cap_quantity(
            shares_for(risk_amount, risk_per_share),
            request.entry_price,
            capital,
            self.max_position_percent,
        );

        let position_value = quantity as f64 * request.entry_price;
        let actual_risk = quantity as f64 * risk_per_share;
        let actual_risk_percent = actual_risk / capital * 100.0;

        let mut details = Details::new();
        details.insert("atr".into(), json!(request.atr));
        details.insert("atr_multiplier".into(), json!(self.atr_multiplier));
        details.insert("risk_per_share".into(), json!(risk_per_share));
        details.insert("sizing_method".into(), json!(sizing_basis));
        details.insert("target_risk_percent".into(), json!(self.risk_percent));

        PositionSizeResult {
            quantity,
            position_value,
            risk_amount: actual_risk,
            risk_percent: actual_risk_percent,
            method: Self::NAME.to_string(),
            confidence,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_atr_sizing() {
        let sizer = VolatilityAdjustedSizer::default();
        // 500 risk / (5 x 2) = 50 shares
        let request = SizingRequest::new(50_000.0, 100.0, 98.0).with_atr(Some(5.0));
        let result = sizer.calculate_position_size(&request);
        assert_eq!(result.quantity, 50);
        assert_relative_eq!(result.risk_amount, 500.0);
        assert_relative_eq!(result.confidence, 100.0);
    }

    #[test]
    fn test_stop_fallback() {
        let sizer = VolatilityAdjustedSizer::default();
        let result = sizer.calculate_position_size(&SizingRequest::new(50_000.0, 100.0, 98.0));
        assert_eq!(result.quantity, 100);
        assert_relative_eq!(result.confidence, 70.0);
        assert_eq!(result.details.get("sizing_method"), Some(&json!("Stop Loss (no ATR)")));
    }

    #[test]
    fn test_fallback_disabled() {
        let sizer = VolatilityAdjustedSizer {
            use_stop_if_no_atr: false,
            ..Default::default()
        };
        let result = sizer.calculate_position_size(&SizingRequest::new(50_000.0, 100.0, 98.0));
        assert_eq!(result.quantity, 0);
        assert!(result.error().is_some());
    }

    #[test]
    fn test_flat_levels_size_to_zero() {
        let sizer = VolatilityAdjustedSizer::default();
        let result = sizer.calculate_position_size(&SizingRequest::new(50_000.0, 100.0, 100.0));
        assert_eq!(result.quantity, 0);
        assert_eq!(result.error(), Some("Stop loss equals entry price"));

        // ATR does not stand in for a missing stop distance
        let request = SizingRequest::new(100_000.0, 250.0, 250.0).with_atr(Some(4.0));
        let result = sizer.calculate_position_size(&request);
        assert_eq!(result.quantity, 0);
        assert_relative_eq!(result.position_value, 0.0);
        assert_relative_eq!(result.risk_percent, 0.0);
        assert_eq!(result.error(), Some("Stop loss equals entry price"));
    }
}
