use chrono::NaiveTime;
use serde_json::json;
use trade_core::{Details, PositionType, RejectionReason};

use crate::models::{RiskValidationResult, Severity, TradeCandidate};

/// One independent check in the risk chain. A failed check is data, never
/// a panic or an error.
pub trait RiskValidator: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult;

    /// Rejection reported by the engine when this check fails
    fn rejection_reason(&self) -> RejectionReason {
        RejectionReason::RiskLimit
    }
}

fn details<const N: usize>(entries: [(&str, serde_json::Value); N]) -> Details {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Halts trading once today's loss reaches the daily limit
#[derive(Debug, Clone)]
pub struct MaxDrawdownValidator {
    pub max_daily_loss_percent: f64,
}

impl MaxDrawdownValidator {
    pub const NAME: &'static str = "MaxDrawdownValidator";

    pub fn new(max_daily_loss_percent: f64) -> Self {
        Self { max_daily_loss_percent }
    }
}

impl RiskValidator for MaxDrawdownValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        let loss = candidate.current_daily_loss_percent.abs();
        if loss >= self.max_daily_loss_percent {
            return RiskValidationResult::fail(
                Self::NAME,
                format!(
                    "Daily loss limit reached: {:.2}% (max: {:.2}%)",
                    loss, self.max_daily_loss_percent
                ),
                Severity::Critical,
                details([
                    ("current_loss", json!(candidate.current_daily_loss_percent)),
                    ("max_loss", json!(self.max_daily_loss_percent)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Within daily loss limit")
    }
}

/// Caps the number of simultaneously open positions
#[derive(Debug, Clone)]
pub struct PositionLimitValidator {
    pub max_positions: usize,
}

impl PositionLimitValidator {
    pub const NAME: &'static str = "PositionLimitValidator";

    pub fn new(max_positions: usize) -> Self {
        Self { max_positions }
    }
}

impl RiskValidator for PositionLimitValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        if candidate.current_position_count >= self.max_positions {
            return RiskValidationResult::fail(
                Self::NAME,
                format!("Position limit reached: {}", self.max_positions),
                Severity::Warning,
                details([
                    ("current_positions", json!(candidate.current_position_count)),
                    ("max_positions", json!(self.max_positions)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Within position limit")
    }

    fn rejection_reason(&self) -> RejectionReason {
        RejectionReason::PositionLimit
    }
}

#[derive(Debug, Clone, Default)]
pub struct DuplicatePositionValidator;

impl DuplicatePositionValidator {
    pub const NAME: &'static str = "DuplicatePositionValidator";
}

impl RiskValidator for DuplicatePositionValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        if candidate
            .existing_position_symbols
            .iter()
            .any(|s| s == &candidate.symbol)
        {
            return RiskValidationResult::fail(
                Self::NAME,
                format!("Already have position in {}", candidate.symbol),
                Severity::Warning,
                details([("symbol", json!(candidate.symbol))]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "No duplicate position")
    }

    fn rejection_reason(&self) -> RejectionReason {
        RejectionReason::DuplicatePosition
    }
}

/// Position value as a share of capital
#[derive(Debug, Clone)]
pub struct PositionSizeValidator {
    pub max_position_percent: f64,
}

impl PositionSizeValidator {
    pub const NAME: &'static str = "PositionSizeValidator";

    pub fn new(max_position_percent: f64) -> Self {
        Self { max_position_percent }
    }
}

impl RiskValidator for PositionSizeValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        if candidate.capital <= 0.0 {
            return RiskValidationResult::fail(
                Self::NAME,
                "Capital must be positive",
                Severity::Warning,
                details([("capital", json!(candidate.capital))]),
            );
        }

        let position_percent = candidate.position_value / candidate.capital * 100.0;
        if position_percent > self.max_position_percent {
            return RiskValidationResult::fail(
                Self::NAME,
                format!(
                    "Position size too large: {:.2}% (max: {:.2}%)",
                    position_percent, self.max_position_percent
                ),
                Severity::Warning,
                details([
                    ("position_percent", json!(position_percent)),
                    ("max_percent", json!(self.max_position_percent)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Position size acceptable")
    }
}

#[derive(Debug, Clone)]
pub struct RiskPerTradeValidator {
    pub max_risk_percent: f64,
}

impl RiskPerTradeValidator {
    pub const NAME: &'static str = "RiskPerTradeValidator";

    pub fn new(max_risk_percent: f64) -> Self {
        Self { max_risk_percent }
    }
}

impl RiskValidator for RiskPerTradeValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        if candidate.risk_percent > self.max_risk_percent {
            return RiskValidationResult::fail(
                Self::NAME,
                format!(
                    "Risk per trade too high: {:.2}% (max: {:.2}%)",
                    candidate.risk_percent, self.max_risk_percent
                ),
                Severity::Warning,
                details([
                    ("risk_percent", json!(candidate.risk_percent)),
                    ("max_risk", json!(self.max_risk_percent)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Risk per trade acceptable")
    }
}

/// Keeps a cash reserve after the position is opened
#[derive(Debug, Clone)]
pub struct CapitalValidator {
    pub min_capital_reserve: f64,
}

impl CapitalValidator {
    pub const NAME: &'static str = "CapitalValidator";

    pub fn new(min_capital_reserve: f64) -> Self {
        Self { min_capital_reserve }
    }
}

impl RiskValidator for CapitalValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        let remaining = candidate.capital - candidate.position_value;
        if remaining < self.min_capital_reserve {
            return RiskValidationResult::fail(
                Self::NAME,
                format!("Insufficient capital reserve: {:.2}", remaining),
                Severity::Critical,
                details([
                    ("remaining", json!(remaining)),
                    ("min_reserve", json!(self.min_capital_reserve)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Sufficient capital")
    }

    fn rejection_reason(&self) -> RejectionReason {
        RejectionReason::CapitalInsufficient
    }
}

/// Intraday trades only inside the exchange session, bounds inclusive
#[derive(Debug, Clone)]
pub struct MarketHoursValidator {
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
}

impl MarketHoursValidator {
    pub const NAME: &'static str = "MarketHoursValidator";

    pub fn new(market_open: NaiveTime, market_close: NaiveTime) -> Self {
        Self {
            market_open,
            market_close,
        }
    }
}

impl RiskValidator for MarketHoursValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        if candidate.position_type != PositionType::Intraday {
            return RiskValidationResult::pass(Self::NAME, "Not intraday - market hours not checked");
        }

        let window = format!(
            "{}-{}",
            self.market_open.format("%H:%M"),
            self.market_close.format("%H:%M")
        );
        let Some(now) = candidate.current_time else {
            return RiskValidationResult::fail(
                Self::NAME,
                "No market time supplied for intraday trade",
                Severity::Warning,
                details([("market_hours", json!(window))]),
            );
        };

        if now < self.market_open || now > self.market_close {
            return RiskValidationResult::fail(
                Self::NAME,
                format!("Outside market hours: {}", now.format("%H:%M")),
                Severity::Warning,
                details([
                    ("current_time", json!(now.format("%H:%M").to_string())),
                    ("market_hours", json!(window)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Within market hours")
    }

    fn rejection_reason(&self) -> RejectionReason {
        RejectionReason::MarketHours
    }
}

/// Sector exposure limit
#[derive(Debug, Clone)]
pub struct ConcentrationValidator {
    pub max_sector_exposure_percent: f64,
}

impl ConcentrationValidator {
    pub const NAME: &'static str = "ConcentrationValidator";

    pub fn new(max_sector_exposure_percent: f64) -> Self {
        Self {
            max_sector_exposure_percent,
        }
    }
}

impl RiskValidator for ConcentrationValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        if candidate.sector_exposure_percent > self.max_sector_exposure_percent {
            let sector = candidate.sector.as_deref().unwrap_or("Unknown");
            return RiskValidationResult::fail(
                Self::NAME,
                format!(
                    "Sector concentration too high: {} {:.1}%",
                    sector, candidate.sector_exposure_percent
                ),
                Severity::Warning,
                details([
                    ("sector", json!(sector)),
                    ("exposure", json!(candidate.sector_exposure_percent)),
                    ("max_exposure", json!(self.max_sector_exposure_percent)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Sector concentration acceptable")
    }
}

/// Circuit breaker on a losing streak
#[derive(Debug, Clone)]
pub struct ConsecutiveLossValidator {
    pub max_consecutive_losses: u32,
}

impl ConsecutiveLossValidator {
    pub const NAME: &'static str = "ConsecutiveLossValidator";

    pub fn new(max_consecutive_losses: u32) -> Self {
        Self { max_consecutive_losses }
    }
}

impl RiskValidator for ConsecutiveLossValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        if candidate.consecutive_losses >= self.max_consecutive_losses {
            return RiskValidationResult::fail(
                Self::NAME,
                format!(
                    "Consecutive losses: {} >= limit of {}",
                    candidate.consecutive_losses, self.max_consecutive_losses
                ),
                Severity::Critical,
                details([
                    ("consecutive_losses", json!(candidate.consecutive_losses)),
                    ("max_consecutive_losses", json!(self.max_consecutive_losses)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Losing streak within limit")
    }
}

/// Circuit breaker on decline from the account's peak value
#[derive(Debug, Clone)]
pub struct AccountDrawdownValidator {
    pub max_drawdown_percent: f64,
}

impl AccountDrawdownValidator {
    pub const NAME: &'static str = "AccountDrawdownValidator";

    pub fn new(max_drawdown_percent: f64) -> Self {
        Self { max_drawdown_percent }
    }
}

impl RiskValidator for AccountDrawdownValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn validate(&self, candidate: &TradeCandidate) -> RiskValidationResult {
        let drawdown = candidate.drawdown_from_peak_percent.abs();
        if drawdown >= self.max_drawdown_percent {
            return RiskValidationResult::fail(
                Self::NAME,
                format!(
                    "Drawdown: {:.1}% exceeds limit of {:.1}%",
                    drawdown, self.max_drawdown_percent
                ),
                Severity::Critical,
                details([
                    ("drawdown_percent", json!(drawdown)),
                    ("max_drawdown_percent", json!(self.max_drawdown_percent)),
                ]),
            );
        }
        RiskValidationResult::pass(Self::NAME, "Drawdown within limit")
    }
}
