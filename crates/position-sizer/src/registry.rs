use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use trade_core::TradeError;

use crate::config::SizingConfig;
use crate::fixed_risk::FixedRiskSizer;
use crate::kelly::KellyCriterionSizer;
use crate::sizer::PositionSizer;
use crate::volatility::VolatilityAdjustedSizer;

pub type SizerConstructor = fn(&SizingConfig) -> Arc<dyn PositionSizer>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizerInfo {
    pub name: String,
    pub description: String,
}

/// Name → constructor table for position sizers. `KELLY` aliases the
/// Kelly Criterion sizer.
#[derive(Clone)]
pub struct SizerRegistry {
    constructors: BTreeMap<String, SizerConstructor>,
}

impl Default for SizerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn fixed_risk(config: &SizingConfig) -> Arc<dyn PositionSizer> {
    Arc::new(FixedRiskSizer::new(config.risk_percent, config.max_position_percent))
}

fn kelly(config: &SizingConfig) -> Arc<dyn PositionSizer> {
    Arc::new(KellyCriterionSizer::new(
        config.performance,
        config.kelly_fraction,
        config.max_position_percent,
    ))
}

fn volatility_adjusted(config: &SizingConfig) -> Arc<dyn PositionSizer> {
    Arc::new(VolatilityAdjustedSizer {
        risk_percent: config.risk_percent,
        atr_multiplier: config.atr_multiplier,
        max_position_percent: config.max_position_percent,
        use_stop_if_no_atr: config.use_stop_if_no_atr,
    })
}

impl SizerRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(FixedRiskSizer::NAME, fixed_risk);
        registry.register(KellyCriterionSizer::NAME, kelly);
        registry.register("KELLY", kelly);
        registry.register(VolatilityAdjustedSizer::NAME, volatility_adjusted);
        info!("Registered {} position sizers", registry.constructors.len());
        registry
    }

    pub fn register(&mut self, name: &str, constructor: SizerConstructor) {
        self.constructors.insert(name.to_uppercase(), constructor);
    }

    pub fn exists(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_uppercase())
    }

    pub fn create(&self, name: &str, config: &SizingConfig) -> Result<Arc<dyn PositionSizer>, TradeError> {
        match self.constructors.get(&name.to_uppercase()) {
            Some(constructor) => Ok(constructor(config)),
            None => {
                error!("Position sizer '{}' not found", name);
                Err(TradeError::UnknownSizer(name.to_string()))
            }
        }
    }

    pub fn available_sizers(&self) -> Vec<SizerInfo> {
        let config = SizingConfig::default();
        self.constructors
            .iter()
            .map(|(name, constructor)| SizerInfo {
                name: name.clone(),
                description: constructor(&config).description(),
            })
            .collect()
    }
}
