use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use trade_core::validation::validate_percentage;
use trade_core::{Details, PositionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// Outcome of one validator against one trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskValidationResult {
    pub passed: bool,
    pub validator_name: String,
    pub reason: String,
    pub severity: Severity,
    #[serde(default)]
    pub details: Details,
}

impl RiskValidationResult {
    pub fn pass(validator_name: &str, reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            validator_name: validator_name.to_string(),
            reason: reason.into(),
            severity: Severity::Info,
            details: Details::new(),
        }
    }

    pub fn fail(validator_name: &str, reason: impl Into<String>, severity: Severity, details: Details) -> Self {
        Self {
            passed: false,
            validator_name: validator_name.to_string(),
            reason: reason.into(),
            severity,
            details,
        }
    }
}

/// Everything the validators look at for a proposed trade
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeCandidate {
    pub symbol: String,
    pub position_type: PositionType,
    pub quantity: u64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub position_value: f64,
    pub capital: f64,
    /// Capital at risk, 0 to 100
    pub risk_percent: f64,
    pub current_position_count: usize,
    pub existing_position_symbols: Vec<String>,
    /// Today's P&L as percent of capital; losses are negative
    pub current_daily_loss_percent: f64,
    /// Decline from the account's peak value, positive percent
    pub drawdown_from_peak_percent: f64,
    pub consecutive_losses: u32,
    pub sector: Option<String>,
    pub sector_exposure_percent: f64,
    /// Exchange-local clock time
    pub current_time: Option<NaiveTime>,
}

/// Global risk thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub risk_per_trade_percent: f64,
    /// Daily loss that halts trading
    pub max_daily_loss_percent: f64,
    /// Drawdown from peak that halts trading
    pub max_drawdown_percent: f64,
    pub max_position_percent: f64,
    pub max_sector_exposure_percent: f64,
    pub max_consecutive_losses: u32,
    /// Per-trade risk above this is flagged by the chain
    pub max_risk_per_trade_percent: f64,
    pub min_capital_reserve: f64,
    pub max_positions: usize,
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            risk_per_trade_percent: 1.0,
            max_daily_loss_percent: 5.0,
            max_drawdown_percent: 10.0,
            max_position_percent: 20.0,
            max_sector_exposure_percent: 40.0,
            max_consecutive_losses: 3,
            max_risk_per_trade_percent: 2.0,
            min_capital_reserve: 1000.0,
            max_positions: 5,
            market_open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN),
            market_close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

pub fn validate(limits: &RiskLimits) -> Vec<String> {
    let mut errors = Vec::new();

    for (value, field) in [
        (limits.risk_per_trade_percent, "risk_per_trade_percent"),
        (limits.max_daily_loss_percent, "max_daily_loss_percent"),
        (limits.max_drawdown_percent, "max_drawdown_percent"),
        (limits.max_position_percent, "max_position_percent"),
        (limits.max_sector_exposure_percent, "max_sector_exposure_percent"),
        (limits.max_risk_per_trade_percent, "max_risk_per_trade_percent"),
    ] {
        errors.extend(validate_percentage(value, field));
    }
    if limits.min_capital_reserve < 0.0 {
        errors.push(format!(
            "min_capital_reserve must not be negative, got {}",
            limits.min_capital_reserve
        ));
    }

    if limits.risk_per_trade_percent > limits.max_daily_loss_percent {
        errors.push("Per-trade risk cannot exceed daily loss limit".to_string());
    }
    if limits.max_daily_loss_percent > limits.max_drawdown_percent {
        errors.push("Daily loss limit cannot exceed drawdown limit".to_string());
    }
    if limits.max_consecutive_losses == 0 {
        errors.push("max_consecutive_losses must be at least 1".to_string());
    }
    if limits.max_positions == 0 {
        errors.push("max_positions must be at least 1".to_string());
    }
    if limits.market_open >= limits.market_close {
        errors.push("market_open must be before market_close".to_string());
    }

    errors
}
