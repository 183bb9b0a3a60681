use serde::{Deserialize, Serialize};
use trade_core::validation::{validate_percentage, validate_positive, validate_range};

use crate::sizer::TradePerformance;

/// Parameters shared by the built-in sizers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    pub risk_percent: f64,
    pub max_position_percent: f64,
    pub kelly_fraction: f64,
    pub performance: TradePerformance,
    pub atr_multiplier: f64,
    pub use_stop_if_no_atr: bool,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            risk_percent: 1.0,
            max_position_percent: 20.0,
            kelly_fraction: 0.25,
            performance: TradePerformance {
                win_rate: 0.55,
                avg_win: 6.0,
                avg_loss: 3.0,
            },
            atr_multiplier: 2.0,
            use_stop_if_no_atr: true,
        }
    }
}

pub fn validate(config: &SizingConfig) -> Vec<String> {
    let mut errors = Vec::new();
    errors.extend(validate_range(config.risk_percent, 0.01, 100.0, "risk_percent"));
    errors.extend(validate_range(
        config.max_position_percent,
        0.01,
        100.0,
        "max_position_percent",
    ));
    errors.extend(validate_range(config.kelly_fraction, 0.01, 1.0, "kelly_fraction"));
    errors.extend(validate_range(config.performance.win_rate, 0.0, 1.0, "win_rate"));
    errors.extend(validate_percentage(config.performance.avg_win, "avg_win"));
    errors.extend(validate_percentage(config.performance.avg_loss, "avg_loss"));
    errors.extend(validate_positive(config.atr_multiplier, "atr_multiplier"));
    errors
}
