//! Pre-trade risk gating: independent validators run as an ordered chain
//! over a proposed trade.

pub mod chain;
pub mod models;
pub mod validators;

pub use chain::{ChainOutcome, FailedCheck, RiskSummary, RiskValidationChain};
pub use models::*;
pub use validators::*;
