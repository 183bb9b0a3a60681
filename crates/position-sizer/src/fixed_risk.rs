use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use trade_core::{Details, PositionSizeResult};

use crate::sizer::{cap_quantity, shares_for, PositionSizer, SizingRequest};

/// Risk a fixed share of capital per trade.
///
/// quantity = (capital × risk%) ÷ |entry − stop|, then capped to
/// `max_position_percent` of capital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedRiskSizer {
    pub risk_percent: f64,
    pub max_position_percent: f64,
}

impl Default for FixedRiskSizer {
    fn default() -> Self {
        Self {
            risk_percent: 1.0,
            max_position_percent: 20.0,
        }
    }
}

impl FixedRiskSizer {
    pub const NAME: &'static str = "FIXED_RISK";

    pub fn new(risk_percent: f64, max_position_percent: f64) -> Self {
        Self {
            risk_percent,
            max_position_percent,
        }
    }
}

impl PositionSizer for FixedRiskSizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> String {
        format!(
            "Risk {}% of capital per trade (max {}% position size)",
            self.risk_percent, self.max_position_percent
        )
    }

    fn calculate_position_size(&self, request: &SizingRequest) -> PositionSizeResult {
        if let Some(error) = request.validate() {
            debug!("Fixed-risk sizing refused: {}", error);
            return PositionSizeResult::zero(Self::NAME, error);
        }

        let risk_per_share = request.risk_per_share();
        if risk_per_share == 0.0 {
            return PositionSizeResult::zero(Self::NAME, "Stop loss equals entry price");
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
        details.insert("target_risk_percent".into(), json!(self.risk_percent));
        details.insert("actual_risk_percent".into(), json!(actual_risk_percent));
        details.insert("risk_per_share".into(), json!(risk_per_share));
        details.insert("max_position_percent".into(), json!(self.max_position_percent));

        PositionSizeResult {
            quantity,
            position_value,
            risk_amount: actual_risk,
            risk_percent: actual_risk_percent,
            method: Self::NAME.to_string(),
            confidence: 100.0,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_capped_by_max_position() {
        let sizer = FixedRiskSizer::default();
        let result = sizer.calculate_position_size(&SizingRequest::new(50_000.0, 100.0, 98.0));

        assert_eq!(result.quantity, 100);
        assert_relative_eq!(result.position_value, 10_000.0);
        assert_relative_eq!(result.risk_amount, 200.0);
        assert_relative_eq!(result.risk_percent, 0.4);
        assert_eq!(result.method, "FIXED_RISK");
    }

    #[test]
    fn test_uncapped() {
        let sizer = FixedRiskSizer::new(1.0, 100.0);
        let result = sizer.calculate_position_size(&SizingRequest::new(50_000.0, 100.0, 98.0));
        assert_eq!(result.quantity, 250);
        assert_relative_eq!(result.position_value, 25_000.0);
        assert_relative_eq!(result.risk_percent, 1.0);
    }

    #[test]
    fn test_short_side_stop() {
        let sizer = FixedRiskSizer::default();
        let result = sizer.calculate_position_size(&SizingRequest::new(100_000.0, 50.0, 51.0));
        // 1000 risk / 1 per share, capped at 20000 / 50
        assert_eq!(result.quantity, 400);
    }

    #[test]
    fn test_stop_equal_to_entry() {
        let sizer = FixedRiskSizer::default();
        let result = sizer.calculate_position_size(&SizingRequest::new(50_000.0, 100.0, 100.0));
        assert_eq!(result.quantity, 0);
        assert_eq!(result.error(), Some("Stop loss equals entry price"));
    }

    #[test]
    fn test_invalid_inputs() {
        let sizer = FixedRiskSizer::default();
        for request in [
            SizingRequest::new(0.0, 100.0, 98.0),
            SizingRequest::new(50_000.0, 0.0, 98.0),
            SizingRequest::new(50_000.0, 100.0, -1.0),
        ] {
            let result = sizer.calculate_position_size(&request);
            assert_eq!(result.quantity, 0);
            assert_eq!(result.confidence, 0.0);
            assert!(result.error().is_some());
        }
    }
}
