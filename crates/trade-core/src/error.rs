use thiserror::Error;

/// Faults that stop an evaluation. Business rejections are never errors;
/// they travel inside `TradeDecision`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("Capital lookup failed: {0}")]
    CapitalLookup(String),

    #[error("Position lookup failed: {0}")]
    PositionLookup(String),

    #[error("Indicator source failed: {0}")]
    SignalSource(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown position sizer: {0}")]
    UnknownSizer(String),

    #[error("Invalid configuration: {}", .0.join(", "))]
    InvalidConfig(Vec<String>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
