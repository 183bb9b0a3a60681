use chrono::{DateTime, NaiveTime, Utc};
use position_sizer::TradePerformance;
use serde::{Deserialize, Serialize};
use trade_core::{
    AggregatedSignal, Details, PositionSizeResult, PositionType, RejectionReason, Timeframe,
    TradeAction, TradeLevels,
};

/// Account state the risk chain needs beyond the open book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskContext {
    /// Today's P&L as percent of capital; losses are negative
    pub current_daily_loss_percent: f64,
    pub drawdown_from_peak_percent: f64,
    pub consecutive_losses: u32,
    pub sector: Option<String>,
    /// Current exposure to `sector`, percent of capital
    pub sector_exposure_percent: f64,
    /// Exchange-local clock time
    pub current_time: Option<NaiveTime>,
}

/// One evaluation's inputs
#[derive(Debug, Clone)]
pub struct EvaluationRequest<'a> {
    pub symbol: &'a str,
    pub signal: &'a AggregatedSignal,
    pub current_price: f64,
    pub timeframe: Timeframe,
    pub position_type: PositionType,
    /// Overrides the ATR reading carried by the signal
    pub atr: Option<f64>,
    pub performance: Option<TradePerformance>,
    pub risk: RiskContext,
    pub daily_signal: Option<&'a AggregatedSignal>,
    pub hourly_signal: Option<&'a AggregatedSignal>,
    pub alignment_score: Option<f64>,
}

impl<'a> EvaluationRequest<'a> {
    pub fn new(
        symbol: &'a str,
        signal: &'a AggregatedSignal,
        current_price: f64,
        timeframe: Timeframe,
        position_type: PositionType,
    ) -> Self {
        Self {
            symbol,
            signal,
            current_price,
            timeframe,
            position_type,
            atr: None,
            performance: None,
            risk: RiskContext::default(),
            daily_signal: None,
            hourly_signal: None,
            alignment_score: None,
        }
    }

    pub fn with_risk(mut self, risk: RiskContext) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_atr(mut self, atr: f64) -> Self {
        self.atr = Some(atr);
        self
    }

    pub fn with_performance(mut self, performance: TradePerformance) -> Self {
        self.performance = Some(performance);
        self
    }

    pub fn with_timeframes(
        mut self,
        daily: Option<&'a AggregatedSignal>,
        hourly: Option<&'a AggregatedSignal>,
    ) -> Self {
        self.daily_signal = daily;
        self.hourly_signal = hourly;
        self
    }
}

/// A fully sized trade proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecommendation {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    pub strategy: String,
    pub timeframe: Timeframe,
    pub position_type: PositionType,

    pub signal: AggregatedSignal,
    /// Score of the side being traded, 0 to 1
    pub signal_strength: f64,

    pub levels: TradeLevels,
    pub position: PositionSizeResult,

    /// 0 to 100
    pub opportunity_score: f64,
    pub risk_reward_ratio: f64,
    pub expected_return_percent: f64,
    pub max_loss: f64,
    pub potential_profit: f64,

    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
    /// Score needed to act on this recommendation
    pub min_opportunity_score: f64,
}

impl TradeRecommendation {
    /// Tradable only when nothing at all was flagged
    pub fn is_actionable(&self) -> bool {
        self.action != TradeAction::Hold
            && self.opportunity_score >= self.min_opportunity_score
            && self.position.quantity > 0
            && self.warnings.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} {} @ {:.2} | SL: {:.2} | Target: {:.2} | Score: {:.0} | Confidence: {:.0}%",
            self.action.as_str(),
            self.position.quantity,
            self.symbol,
            self.levels.entry,
            self.levels.stop_loss,
            self.levels.target,
            self.opportunity_score,
            self.signal.confidence
        )
    }
}

/// The pipeline's only output. A rejection carries a reason and no
/// recommendation; a non-actionable recommendation carries neither flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub should_trade: bool,
    pub recommendation: Option<TradeRecommendation>,
    pub rejection_reason: Option<RejectionReason>,
    #[serde(default)]
    pub details: Details,
}

impl TradeDecision {
    pub fn reject(
        symbol: &str,
        timestamp: DateTime<Utc>,
        reason: RejectionReason,
        details: Details,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp,
            should_trade: false,
            recommendation: None,
            rejection_reason: Some(reason),
            details,
        }
    }

    pub fn from_recommendation(recommendation: TradeRecommendation, details: Details) -> Self {
        Self {
            symbol: recommendation.symbol.clone(),
            timestamp: recommendation.timestamp,
            should_trade: recommendation.is_actionable(),
            recommendation: Some(recommendation),
            rejection_reason: None,
            details,
        }
    }

    pub fn opportunity_score(&self) -> Option<f64> {
        self.recommendation.as_ref().map(|r| r.opportunity_score)
    }
}
