//! Position sizing algorithms: fixed fractional risk, fractional Kelly and
//! ATR-adjusted sizing, selectable by name.

pub mod config;
mod fixed_risk;
mod kelly;
mod registry;
mod sizer;
mod volatility;

pub use config::SizingConfig;
pub use fixed_risk::FixedRiskSizer;
pub use kelly::KellyCriterionSizer;
pub use registry::{SizerConstructor, SizerInfo, SizerRegistry};
pub use sizer::{PositionSizer, SizingRequest, TradePerformance};
pub use volatility::VolatilityAdjustedSizer;
