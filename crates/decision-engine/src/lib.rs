//! Trade decision pipeline: confidence gate, action mapping, position
//! limits, strategy levels, sizing, risk:reward and the risk chain, ending
//! in a scored [`TradeDecision`].

pub mod config;
pub mod decision;
pub mod engine;
pub mod scanner;
pub mod telemetry;

pub use config::EngineConfig;
pub use decision::{EvaluationRequest, RiskContext, TradeDecision, TradeRecommendation};
pub use engine::{action_for, opportunity_score, DecisionEngine};
pub use scanner::{MarketScanner, ScanFailure, ScanReport, ScanTarget};
pub use telemetry::init_tracing;
