use anyhow::{Context, Result};
use position_sizer::{SizerRegistry, SizingConfig};
use risk_manager::RiskLimits;
use serde::{Deserialize, Serialize};
use signal_aggregator::{default_indicator_weights, default_timeframe_weights, validate_weights};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use trade_core::validation::{validate_percentage, validate_positive};
use trade_core::Timeframe;
use trading_strategies::{MultiIndicatorStrategy, StrategyConfig, StrategyRegistry};

/// Everything the engine is built from. Read once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    // Decision thresholds
    pub min_confidence: f64,          // 60
    pub min_opportunity_score: f64,   // 50
    pub min_risk_reward: f64,         // 1.5

    // Open position caps per holding style
    pub max_swing_positions: usize,    // 4
    pub max_intraday_positions: usize, // 2

    // Risk validation chain
    pub enable_risk_chain: bool,
    pub stop_on_first_failure: bool,

    /// Active strategy; `sizing_method` picks the position sizer
    pub strategy: StrategyConfig,
    pub sizing: SizingConfig,
    pub risk: RiskLimits,

    pub indicator_weights: BTreeMap<String, f64>,
    pub timeframe_weights: BTreeMap<Timeframe, f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_confidence: 60.0,
            min_opportunity_score: 50.0,
            min_risk_reward: 1.5,
            max_swing_positions: 4,
            max_intraday_positions: 2,
            enable_risk_chain: true,
            stop_on_first_failure: true,
            strategy: StrategyConfig::named(
                MultiIndicatorStrategy::NAME,
                MultiIndicatorStrategy::DESCRIPTION,
            ),
            sizing: SizingConfig::default(),
            risk: RiskLimits::default(),
            indicator_weights: default_indicator_weights(),
            timeframe_weights: default_timeframe_weights(),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl EngineConfig {
    /// Defaults overridden from the environment (and `.env`), then validated
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        config.min_confidence = env_or("MIN_CONFIDENCE", config.min_confidence)?;
        config.min_opportunity_score = env_or("MIN_OPPORTUNITY_SCORE", config.min_opportunity_score)?;
        config.min_risk_reward = env_or("MIN_RISK_REWARD", config.min_risk_reward)?;
        config.max_swing_positions = env_or("MAX_SWING_POSITIONS", config.max_swing_positions)?;
        config.max_intraday_positions =
            env_or("MAX_INTRADAY_POSITIONS", config.max_intraday_positions)?;
        config.stop_on_first_failure = env_or("STOP_ON_FIRST_FAILURE", config.stop_on_first_failure)?;

        // Strategy
        if let Ok(name) = env::var("STRATEGY") {
            let name = name.trim().to_uppercase();
            config.strategy.description = StrategyRegistry::default()
                .create(&name, None)
                .map(|s| s.description().to_string())
                .unwrap_or_default();
            config.strategy.name = name;
        }
        if let Ok(method) = env::var("SIZING_METHOD") {
            config.strategy.sizing_method = method.trim().to_uppercase();
        }
        config.strategy.min_confidence = config.min_confidence;
        config.strategy.min_risk_reward = config.min_risk_reward;

        // Risk limits
        let risk_per_trade = env_or("RISK_PER_TRADE", config.risk.risk_per_trade_percent)?;
        config.risk.risk_per_trade_percent = risk_per_trade;
        config.strategy.risk_per_trade_percent = risk_per_trade;
        config.sizing.risk_percent = risk_per_trade;

        config.risk.max_daily_loss_percent = env_or("MAX_DAILY_LOSS", config.risk.max_daily_loss_percent)?;
        config.risk.max_drawdown_percent = env_or("MAX_DRAWDOWN", config.risk.max_drawdown_percent)?;
        config.risk.max_position_percent =
            env_or("MAX_POSITION_PERCENT", config.risk.max_position_percent)?;
        config.sizing.max_position_percent = config.risk.max_position_percent;
        config.risk.max_sector_exposure_percent =
            env_or("MAX_SECTOR_EXPOSURE", config.risk.max_sector_exposure_percent)?;
        config.risk.max_consecutive_losses =
            env_or("MAX_CONSECUTIVE_LOSSES", config.risk.max_consecutive_losses)?;
        config.risk.min_capital_reserve = env_or("MIN_CAPITAL_RESERVE", config.risk.min_capital_reserve)?;

        // Sizing
        config.sizing.kelly_fraction = env_or("KELLY_FRACTION", config.sizing.kelly_fraction)?;

        let errors = validate(&config);
        if !errors.is_empty() {
            anyhow::bail!("Invalid engine configuration: {}", errors.join("; "));
        }

        Ok(config)
    }

    pub fn max_positions_for(&self, position_type: trade_core::PositionType) -> usize {
        match position_type {
            trade_core::PositionType::Swing => self.max_swing_positions,
            trade_core::PositionType::Intraday => self.max_intraday_positions,
        }
    }
}

/// Every problem with the configuration, sub-configs included
pub fn validate(config: &EngineConfig) -> Vec<String> {
    let mut errors = Vec::new();

    errors.extend(validate_percentage(config.min_confidence, "min_confidence"));
    errors.extend(validate_percentage(config.min_opportunity_score, "min_opportunity_score"));
    errors.extend(validate_positive(config.min_risk_reward, "min_risk_reward"));
    if config.max_swing_positions == 0 {
        errors.push("max_swing_positions must be at least 1".to_string());
    }
    if config.max_intraday_positions == 0 {
        errors.push("max_intraday_positions must be at least 1".to_string());
    }

    errors.extend(trading_strategies::config::validate(&config.strategy));
    if !StrategyRegistry::default().exists(&config.strategy.name) {
        errors.push(format!("unknown strategy: {}", config.strategy.name));
    }
    if !SizerRegistry::default().exists(&config.strategy.sizing_method) {
        errors.push(format!("unknown sizing method: {}", config.strategy.sizing_method));
    }

    errors.extend(position_sizer::config::validate(&config.sizing));
    errors.extend(risk_manager::models::validate(&config.risk));
    errors.extend(validate_weights(&config.indicator_weights));
    for (timeframe, weight) in &config.timeframe_weights {
        if !weight.is_finite() || *weight < 0.0 {
            errors.push(format!("weight for timeframe {timeframe} must be a non-negative number, got {weight}"));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(validate(&config).is_empty(), "{:?}", validate(&config));
        assert_eq!(config.strategy.name, "MULTI_INDICATOR");
        assert_eq!(config.max_positions_for(trade_core::PositionType::Intraday), 2);
    }

    #[test]
    fn test_sub_config_errors_are_collected() {
        let mut config = EngineConfig::default();
        config.min_confidence = 140.0;
        config.strategy.name = "MARTINGALE".to_string();
        config.sizing.kelly_fraction = 2.0;
        config.risk.max_consecutive_losses = 0;
        config.indicator_weights.insert("RSI".to_string(), -0.1);

        let errors = validate(&config);
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("unknown strategy")));
        assert!(errors.iter().any(|e| e.contains("kelly_fraction")));
    }

    #[test]
    fn test_unknown_sizing_method() {
        let mut config = EngineConfig::default();
        config.strategy.sizing_method = "ALL_IN".to_string();
        assert_eq!(validate(&config), vec!["unknown sizing method: ALL_IN".to_string()]);
    }
}
