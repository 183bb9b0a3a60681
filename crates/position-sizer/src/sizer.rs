use serde::{Deserialize, Serialize};
use trade_core::PositionSizeResult;

/// Historical edge used by the Kelly sizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePerformance {
    /// Win rate (0.0 to 1.0)
    pub win_rate: f64,
    /// Average win, in percent
    pub avg_win: f64,
    /// Average loss, in percent (positive)
    pub avg_loss: f64,
}

/// Inputs to a sizing calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingRequest {
    pub capital: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    /// Average True Range in price units
    pub atr: Option<f64>,
    pub performance: Option<TradePerformance>,
}

impl SizingRequest {
    pub fn new(capital: f64, entry_price: f64, stop_loss: f64) -> Self {
        Self {
            capital,
            entry_price,
            stop_loss,
            atr: None,
            performance: None,
        }
    }

    pub fn with_atr(mut self, atr: Option<f64>) -> Self {
        self.atr = atr;
        self
    }

    pub fn with_performance(mut self, performance: TradePerformance) -> Self {
        self.performance = Some(performance);
        self
    }

    pub fn risk_per_share(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    /// Why the request cannot be sized at all, if it can't
    pub fn validate(&self) -> Option<&'static str> {
        if self.capital.is_nan() || self.capital <= 0.0 {
            return Some("Capital must be positive");
        }
        if self.entry_price.is_nan() || self.entry_price <= 0.0 {
            return Some("Entry price must be positive");
        }
        if self.stop_loss.is_nan() || self.stop_loss <= 0.0 {
            return Some("Stop loss must be positive");
        }
        None
    }
}

/// A position sizing algorithm.
///
/// Unfavourable or invalid inputs give a zero-quantity result with an
/// `error` detail, never a panic.
pub trait PositionSizer: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> String;

    fn calculate_position_size(&self, request: &SizingRequest) -> PositionSizeResult;
}

/// Whole shares affordable within `max_position_percent` of capital and
/// within capital itself.
pub(crate) fn cap_quantity(quantity: u64, entry_price: f64, capital: f64, max_position_percent: f64) -> u64 {
    let mut quantity = quantity;

    let max_position_value = capital * max_position_percent / 100.0;
    if quantity as f64 * entry_price > max_position_value {
        quantity = (max_position_value / entry_price).floor() as u64;
    }
    if quantity as f64 * entry_price > capital {
        quantity = (capital / entry_price).floor() as u64;
    }
    quantity
}

pub(crate) fn shares_for(amount: f64, per_share: f64) -> u64 {
    if per_share <= 0.0 || !amount.is_finite() {
        return 0;
    }
    (amount / per_share).floor().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_request() {
        assert!(SizingRequest::new(50_000.0, 100.0, 98.0).validate().is_none());
        assert_eq!(
            SizingRequest::new(0.0, 100.0, 98.0).validate(),
            Some("Capital must be positive")
        );
        assert!(SizingRequest::new(1_000.0, -5.0, 98.0).validate().is_some());
        assert!(SizingRequest::new(1_000.0, 100.0, f64::NAN).validate().is_some());
    }

    #[test]
    fn test_cap_quantity() {
        // 250 shares at 100 = 25000, capped to 20% of 50000
        assert_eq!(cap_quantity(250, 100.0, 50_000.0, 20.0), 100);
        assert_eq!(cap_quantity(40, 100.0, 50_000.0, 20.0), 40);
        // max position above 100% still bounded by capital
        assert_eq!(cap_quantity(1_000, 100.0, 50_000.0, 150.0), 500);
    }

    #[test]
    fn test_shares_for() {
        assert_eq!(shares_for(500.0, 2.0), 250);
        assert_eq!(shares_for(500.0, 0.0), 0);
        assert_eq!(shares_for(499.0, 2.0), 249);
    }
}
