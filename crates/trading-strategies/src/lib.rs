//! Pluggable trading strategies.
//!
//! A strategy turns an aggregated signal into entry/stop/target levels and
//! applies its own acceptance criteria. Strategies are looked up by name
//! through [`StrategyRegistry`].

pub mod config;
mod registry;
mod strategies;
mod strategy;

pub use config::StrategyConfig;
pub use registry::{StrategyConstructor, StrategyInfo, StrategyRegistry};
pub use strategies::*;
pub use strategy::{Strategy, StrategyContext, Verdict};
