use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trade_core::RejectionReason;

use crate::models::{RiskLimits, RiskValidationResult, Severity, TradeCandidate};
use crate::validators::{
    AccountDrawdownValidator, CapitalValidator, ConcentrationValidator, ConsecutiveLossValidator,
    DuplicatePositionValidator, MarketHoursValidator, MaxDrawdownValidator, PositionLimitValidator,
    PositionSizeValidator, RiskPerTradeValidator, RiskValidator,
};

/// Result of running the chain once
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub passed: bool,
    pub results: Vec<RiskValidationResult>,
    /// Reason mapped from the first failing validator
    pub rejection: Option<RejectionReason>,
}

impl ChainOutcome {
    pub fn first_failure(&self) -> Option<&RiskValidationResult> {
        self.results.iter().find(|r| !r.passed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedCheck {
    pub validator: String,
    pub reason: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
    pub all_passed: bool,
    pub failed_checks: Vec<FailedCheck>,
    pub passed_checks: Vec<String>,
}

/// Ordered list of independent validators, run front to back
pub struct RiskValidationChain {
    validators: Vec<Box<dyn RiskValidator>>,
}

impl Default for RiskValidationChain {
    fn default() -> Self {
        Self::from_limits(&RiskLimits::default())
    }
}

impl std::fmt::Debug for RiskValidationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskValidationChain")
            .field("validators", &self.active_validators())
            .finish()
    }
}

impl RiskValidationChain {
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// The default chain: account-level breakers first, then the
    /// per-trade checks.
    pub fn from_limits(limits: &RiskLimits) -> Self {
        let mut chain = Self::empty();
        chain.push(MaxDrawdownValidator::new(limits.max_daily_loss_percent));
        chain.push(PositionLimitValidator::new(limits.max_positions));
        chain.push(DuplicatePositionValidator);
        chain.push(PositionSizeValidator::new(limits.max_position_percent));
        chain.push(RiskPerTradeValidator::new(limits.max_risk_per_trade_percent));
        chain.push(CapitalValidator::new(limits.min_capital_reserve));
        chain.push(MarketHoursValidator::new(limits.market_open, limits.market_close));
        chain.push(ConcentrationValidator::new(limits.max_sector_exposure_percent));
        chain.push(ConsecutiveLossValidator::new(limits.max_consecutive_losses));
        chain.push(AccountDrawdownValidator::new(limits.max_drawdown_percent));
        info!("Risk validation chain: {} validators", chain.len());
        chain
    }

    pub fn push(&mut self, validator: impl RiskValidator + 'static) {
        self.add(Box::new(validator));
    }

    pub fn add(&mut self, validator: Box<dyn RiskValidator>) {
        debug!("Added validator: {}", validator.name());
        self.validators.push(validator);
    }

    /// Removes every validator with this name; false if none matched
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.validators.len();
        self.validators.retain(|v| v.name() != name);
        let removed = self.validators.len() != before;
        if removed {
            debug!("Removed validator: {}", name);
        }
        removed
    }

    pub fn active_validators(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn validate(&self, candidate: &TradeCandidate, stop_on_first_failure: bool) -> ChainOutcome {
        let mut results = Vec::with_capacity(self.validators.len());
        let mut rejection = None;

        for validator in &self.validators {
            let result = validator.validate(candidate);
            let failed = !result.passed;
            if failed {
                warn!(
                    symbol = %candidate.symbol,
                    severity = result.severity.as_str(),
                    "Risk check failed: {} - {}",
                    result.validator_name,
                    result.reason
                );
                rejection.get_or_insert(validator.rejection_reason());
            }
            results.push(result);
            if failed && stop_on_first_failure {
                break;
            }
        }

        let passed = rejection.is_none();
        if passed {
            debug!(symbol = %candidate.symbol, "All {} risk checks passed", results.len());
        }

        ChainOutcome {
            passed,
            results,
            rejection,
        }
    }

    pub fn summary(results: &[RiskValidationResult]) -> RiskSummary {
        let failed_checks: Vec<FailedCheck> = results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| FailedCheck {
                validator: r.validator_name.clone(),
                reason: r.reason.clone(),
                severity: r.severity,
            })
            .collect();
        let passed_checks: Vec<String> = results
            .iter()
            .filter(|r| r.passed)
            .map(|r| r.validator_name.clone())
            .collect();

        RiskSummary {
            total_checks: results.len(),
            passed: passed_checks.len(),
            failed: failed_checks.len(),
            all_passed: failed_checks.is_empty(),
            failed_checks,
            passed_checks,
        }
    }
}
