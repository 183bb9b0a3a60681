use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use trade_core::validation::{validate_percentage, validate_positive, validate_range};

/// Per-strategy configuration; `params` overrides a strategy's tunables by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub description: String,
    /// Minimum signal confidence to trade (0-100)
    pub min_confidence: f64,
    pub min_risk_reward: f64,
    /// FIXED_RISK, KELLY_CRITERION, VOLATILITY_ADJUSTED
    pub sizing_method: String,
    pub risk_per_trade_percent: f64,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            min_confidence: 60.0,
            min_risk_reward: 1.5,
            sizing_method: "FIXED_RISK".to_string(),
            risk_per_trade_percent: 1.0,
            params: BTreeMap::new(),
        }
    }
}

impl StrategyConfig {
    pub fn named(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Numeric parameter, or `default` when absent or not a number
    pub fn param_f64(&self, key: &str, default: f64) -> f64 {
        self.params
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// Clock-time parameter in `HH:MM` form
    pub fn param_time(&self, key: &str, default: NaiveTime) -> NaiveTime {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M").ok())
            .unwrap_or(default)
    }
}

pub fn validate(config: &StrategyConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push("strategy name must not be empty".to_string());
    }
    errors.extend(validate_percentage(config.min_confidence, "min_confidence"));
    errors.extend(validate_positive(config.min_risk_reward, "min_risk_reward"));
    errors.extend(validate_range(
        config.risk_per_trade_percent,
        0.01,
        100.0,
        "risk_per_trade_percent",
    ));
    for (key, value) in &config.params {
        if let Some(n) = value.as_f64() {
            if !n.is_finite() {
                errors.push(format!("strategy param {key} must be finite"));
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StrategyConfig::named("MULTI_INDICATOR", "test");
        assert!(validate(&config).is_empty());
        assert_eq!(config.min_confidence, 60.0);
        assert_eq!(config.sizing_method, "FIXED_RISK");
    }

    #[test]
    fn test_invalid_values_reported_together() {
        let config = StrategyConfig {
            min_confidence: 140.0,
            min_risk_reward: 0.0,
            ..StrategyConfig::default()
        };
        let errors = validate(&config);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_param_lookup() {
        let config = StrategyConfig::named("X", "")
            .with_param("min_adx", 30.0)
            .with_param("square_off_time", "14:45");
        assert_eq!(config.param_f64("min_adx", 20.0), 30.0);
        assert_eq!(config.param_f64("missing", 2.5), 2.5);
        let default = NaiveTime::from_hms_opt(15, 15, 0).unwrap();
        assert_eq!(
            config.param_time("square_off_time", default),
            NaiveTime::from_hms_opt(14, 45, 0).unwrap()
        );
    }
}
