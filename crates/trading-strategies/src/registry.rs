use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};
use trade_core::TradeError;

use crate::config::StrategyConfig;
use crate::strategies::{
    BreakoutStrategy, IntradayShortStrategy, MeanReversionStrategy, MomentumSwingStrategy,
    MultiIndicatorStrategy, MultiTimeframeStrategy, TrendFollowingStrategy,
};
use crate::strategy::Strategy;

/// Builds a strategy from an optional configuration
pub type StrategyConstructor = fn(Option<StrategyConfig>) -> Arc<dyn Strategy>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub description: String,
}

/// Name → constructor table, filled once at startup.
///
/// Names are case-insensitive; `DEFAULT` is an alias for Multi-Indicator.
#[derive(Clone)]
pub struct StrategyRegistry {
    constructors: BTreeMap<String, StrategyConstructor>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(MultiIndicatorStrategy::NAME, |c| Arc::new(MultiIndicatorStrategy::new(c)));
        registry.register("DEFAULT", |c| Arc::new(MultiIndicatorStrategy::new(c)));
        registry.register(MeanReversionStrategy::NAME, |c| Arc::new(MeanReversionStrategy::new(c)));
        registry.register(BreakoutStrategy::NAME, |c| Arc::new(BreakoutStrategy::new(c)));
        registry.register(TrendFollowingStrategy::NAME, |c| Arc::new(TrendFollowingStrategy::new(c)));
        registry.register(MomentumSwingStrategy::NAME, |c| Arc::new(MomentumSwingStrategy::new(c)));
        registry.register(IntradayShortStrategy::NAME, |c| Arc::new(IntradayShortStrategy::new(c)));
        registry.register(MultiTimeframeStrategy::NAME, |c| Arc::new(MultiTimeframeStrategy::new(c)));
        info!("Registered {} built-in strategies", registry.constructors.len());
        registry
    }

    pub fn register(&mut self, name: &str, constructor: StrategyConstructor) {
        self.constructors.insert(name.to_uppercase(), constructor);
    }

    pub fn exists(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_uppercase())
    }

    pub fn create(
        &self,
        name: &str,
        config: Option<StrategyConfig>,
    ) -> Result<Arc<dyn Strategy>, TradeError> {
        let key = name.to_uppercase();
        match self.constructors.get(&key) {
            Some(constructor) => Ok(constructor(config)),
            None => {
                let available: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
                error!("Strategy '{}' not found. Available: {}", name, available.join(", "));
                Err(TradeError::UnknownStrategy(name.to_string()))
            }
        }
    }

    pub fn available_strategies(&self) -> Vec<StrategyInfo> {
        self.constructors
            .iter()
            .map(|(name, constructor)| StrategyInfo {
                name: name.clone(),
                description: constructor(None).description().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_case_insensitive() {
        let registry = StrategyRegistry::default();
        let strategy = registry.create("breakout", None).unwrap();
        assert_eq!(strategy.name(), "BREAKOUT");
        assert!(registry.exists("Trend_Following"));
    }

    #[test]
    fn test_default_alias() {
        let registry = StrategyRegistry::default();
        let strategy = registry.create("DEFAULT", None).unwrap();
        assert_eq!(strategy.name(), MultiIndicatorStrategy::NAME);
    }

    #[test]
    fn test_unknown_strategy() {
        let registry = StrategyRegistry::default();
        let err = registry.create("SCALPER", None).err().unwrap();
        assert_eq!(err, TradeError::UnknownStrategy("SCALPER".to_string()));
    }

    #[test]
    fn test_lists_builtins_with_descriptions() {
        let strategies = StrategyRegistry::default().available_strategies();
        assert_eq!(strategies.len(), 8);
        assert!(strategies.iter().all(|s| !s.description.is_empty()));
    }

    #[test]
    fn test_config_is_passed_through() {
        let config = StrategyConfig {
            min_confidence: 75.0,
            ..StrategyConfig::named("MEAN_REVERSION", "custom")
        };
        let strategy = StrategyRegistry::default()
            .create("mean_reversion", Some(config))
            .unwrap();
        assert_eq!(strategy.config().min_confidence, 75.0);
    }
}
