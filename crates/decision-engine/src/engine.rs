use chrono::{DateTime, Utc};
use position_sizer::{PositionSizer, SizerRegistry, SizingConfig, SizingRequest};
use risk_manager::{RiskValidationChain, TradeCandidate};
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Value};
use signal_aggregator::MultiTimeframeAggregator;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use trade_core::{
    AggregatedSignal, CapitalProvider, Details, Direction, MarketClock, PositionProvider,
    PositionSizeResult, PositionType, RejectionReason, SystemClock, Timeframe, TradeAction,
    TradeError,
};
use trading_strategies::{Strategy, StrategyContext, StrategyRegistry, Verdict};

use crate::config::{validate, EngineConfig};
use crate::decision::{EvaluationRequest, RiskContext, TradeDecision, TradeRecommendation};

/// Turns aggregated signals into sized, risk-checked trade decisions.
///
/// Configuration, strategy, sizer and risk chain are fixed at construction,
/// so one engine can serve concurrent evaluations. Capital and open positions
/// are read through the injected providers on every call; callers that
/// evaluate in parallel must snapshot them consistently. The clock is read
/// only when a request carries no time of its own.
pub struct DecisionEngine {
    config: EngineConfig,
    strategy: Arc<dyn Strategy>,
    sizer: Arc<dyn PositionSizer>,
    risk_chain: RiskValidationChain,
    timeframe_aggregator: MultiTimeframeAggregator,
    capital: Arc<dyn CapitalProvider>,
    positions: Arc<dyn PositionProvider>,
    clock: Arc<dyn MarketClock>,
}

impl DecisionEngine {
    /// Builds the strategy, sizer and risk chain named by `config`
    pub fn new(
        config: EngineConfig,
        capital: Arc<dyn CapitalProvider>,
        positions: Arc<dyn PositionProvider>,
    ) -> Result<Self, TradeError> {
        let errors = validate(&config);
        if !errors.is_empty() {
            return Err(TradeError::InvalidConfig(errors));
        }

        let strategy =
            StrategyRegistry::default().create(&config.strategy.name, Some(config.strategy.clone()))?;
        let sizing = SizingConfig {
            risk_percent: config.strategy.risk_per_trade_percent,
            ..config.sizing.clone()
        };
        let sizer = SizerRegistry::default().create(&config.strategy.sizing_method, &sizing)?;
        let risk_chain = RiskValidationChain::from_limits(&config.risk);

        Self::with_components(config, strategy, sizer, risk_chain, capital, positions)
    }

    /// Engine around caller-built components, e.g. a custom strategy or chain
    pub fn with_components(
        config: EngineConfig,
        strategy: Arc<dyn Strategy>,
        sizer: Arc<dyn PositionSizer>,
        risk_chain: RiskValidationChain,
        capital: Arc<dyn CapitalProvider>,
        positions: Arc<dyn PositionProvider>,
    ) -> Result<Self, TradeError> {
        let timeframe_aggregator = MultiTimeframeAggregator::new(config.timeframe_weights.clone())?;

        info!(
            strategy = strategy.name(),
            sizer = sizer.name(),
            validators = risk_chain.len(),
            "Decision engine initialized"
        );
        info!("  Min confidence: {:.0}%", config.min_confidence);
        info!(
            "  Min risk:reward: {:.1}",
            config.min_risk_reward.max(strategy.config().min_risk_reward)
        );
        info!(
            "  Position caps: {} swing / {} intraday",
            config.max_swing_positions, config.max_intraday_positions
        );

        Ok(Self {
            config,
            strategy,
            sizer,
            risk_chain,
            timeframe_aggregator,
            capital,
            positions,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the host clock, e.g. with an exchange feed or a fixed time
    pub fn with_clock(mut self, clock: Arc<dyn MarketClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    pub fn sizer(&self) -> &dyn PositionSizer {
        self.sizer.as_ref()
    }

    pub fn risk_chain(&self) -> &RiskValidationChain {
        &self.risk_chain
    }

    /// Risk:reward a trade must reach
    pub fn min_risk_reward(&self) -> f64 {
        self.config
            .min_risk_reward
            .max(self.strategy.config().min_risk_reward)
    }

    pub fn evaluate(
        &self,
        symbol: &str,
        signal: &AggregatedSignal,
        current_price: f64,
        timeframe: Timeframe,
        position_type: PositionType,
    ) -> Result<TradeDecision, TradeError> {
        self.evaluate_request(&EvaluationRequest::new(
            symbol,
            signal,
            current_price,
            timeframe,
            position_type,
        ))
    }

    /// Runs the full pipeline. Business outcomes come back as a
    /// `TradeDecision`; only provider failures are errors.
    pub fn evaluate_request(&self, request: &EvaluationRequest<'_>) -> Result<TradeDecision, TradeError> {
        let signal = request.signal;
        let symbol = request.symbol;
        // Decisions carry the signal's time so repeated runs are identical
        let timestamp = signal.timestamp;
        let current_time = request
            .risk
            .current_time
            .unwrap_or_else(|| self.clock.now());

        // 1. Confidence floor
        if signal.confidence < self.config.min_confidence {
            return Ok(rejected(
                symbol,
                timestamp,
                RejectionReason::LowConfidence,
                details([
                    ("confidence", json!(signal.confidence)),
                    ("min_confidence", json!(self.config.min_confidence)),
                ]),
            ));
        }

        // 2. Direction to action
        let action = action_for(signal.direction, request.position_type);
        if action == TradeAction::Hold {
            return Ok(rejected(
                symbol,
                timestamp,
                RejectionReason::InvalidSignal,
                details([("signal", json!(signal.direction.to_label()))]),
            ));
        }
        let side_allowed = match action {
            TradeAction::Buy | TradeAction::Sell => self.strategy.allows_long_positions(),
            TradeAction::Short => self.strategy.allows_short_positions(),
            TradeAction::Hold => false,
        };
        if !side_allowed {
            return Ok(rejected(
                symbol,
                timestamp,
                RejectionReason::InvalidSignal,
                details([
                    ("action", json!(action.as_str())),
                    ("strategy", json!(self.strategy.name())),
                ]),
            ));
        }

        // 3. Open book
        let open = self
            .positions
            .open_positions(request.position_type)
            .inspect_err(|e| error!(symbol, "Position lookup failed: {}", e))?;
        let max_positions = self.config.max_positions_for(request.position_type);
        if open.contains(symbol) {
            return Ok(rejected(
                symbol,
                timestamp,
                RejectionReason::PositionLimit,
                details([("existing_position", json!(symbol))]),
            ));
        }
        if open.count >= max_positions {
            return Ok(rejected(
                symbol,
                timestamp,
                RejectionReason::PositionLimit,
                details([
                    ("open_positions", json!(open.count)),
                    ("max_positions", json!(max_positions)),
                ]),
            ));
        }

        // 4. Levels, plus the strategy's own view of the setup
        let levels = self
            .strategy
            .calculate_trade_levels(request.current_price, signal, action);
        let context = StrategyContext {
            current_time: Some(current_time),
            daily_signal: request.daily_signal,
            hourly_signal: request.hourly_signal,
            alignment_score: request.alignment_score,
        };
        let verdict = self
            .strategy
            .should_take_trade(signal, request.current_price, &context);

        // 5. Sizing
        let capital = self
            .capital
            .available_capital()
            .inspect_err(|e| error!(symbol, "Capital lookup failed: {}", e))?
            .to_f64()
            .unwrap_or(0.0);
        let mut sizing = SizingRequest::new(capital, levels.entry, levels.stop_loss)
            .with_atr(request.atr.or_else(|| signal.indicator_value("ATR")));
        if let Some(performance) = request.performance {
            sizing = sizing.with_performance(performance);
        }
        let position = self.sizer.calculate_position_size(&sizing);

        // 6. Nothing to buy
        if position.quantity == 0 {
            let mut d = details([("capital", json!(capital))]);
            if let Some(reason) = position.error() {
                d.insert("sizing_error".to_string(), json!(reason));
            }
            return Ok(rejected(symbol, timestamp, RejectionReason::CapitalInsufficient, d));
        }

        // 7. Risk:reward floor, the stricter of engine and strategy
        let risk_reward = levels.risk_reward();
        let min_risk_reward = self.min_risk_reward();
        if risk_reward < min_risk_reward {
            return Ok(rejected(
                symbol,
                timestamp,
                RejectionReason::RiskLimit,
                details([
                    ("risk_reward", json!(risk_reward)),
                    ("min_risk_reward", json!(min_risk_reward)),
                ]),
            ));
        }

        let mut decision_details = Details::new();
        if self.config.enable_risk_chain {
            let candidate = TradeCandidate {
                symbol: symbol.to_string(),
                position_type: request.position_type,
                quantity: position.quantity,
                entry_price: levels.entry,
                stop_loss: levels.stop_loss,
                position_value: position.position_value,
                capital,
                risk_percent: position.risk_percent,
                current_position_count: open.count,
                existing_position_symbols: open.symbols.clone(),
                current_daily_loss_percent: request.risk.current_daily_loss_percent,
                drawdown_from_peak_percent: request.risk.drawdown_from_peak_percent,
                consecutive_losses: request.risk.consecutive_losses,
                sector: request.risk.sector.clone(),
                sector_exposure_percent: request.risk.sector_exposure_percent,
                current_time: Some(current_time),
            };
            let outcome = self
                .risk_chain
                .validate(&candidate, self.config.stop_on_first_failure);

            if let Some(reason) = outcome.rejection {
                let mut d = details([
                    ("risk_checks", json!(outcome.results)),
                    ("risk_summary", json!(RiskValidationChain::summary(&outcome.results))),
                ]);
                if let Some(failure) = outcome.first_failure() {
                    d.insert("failed_check".to_string(), json!(failure.validator_name));
                }
                return Ok(rejected(symbol, timestamp, reason, d));
            }
            decision_details.insert("risk_checks".to_string(), json!(outcome.results));
        }

        // 8. Score
        let score = opportunity_score(signal, risk_reward);

        // 9. Assemble
        let warnings = self.warnings(signal, &position, &verdict);
        let signal_strength = if action == TradeAction::Buy {
            signal.bullish_score
        } else {
            signal.bearish_score
        };
        let recommendation = TradeRecommendation {
            symbol: symbol.to_string(),
            timestamp,
            action,
            strategy: self.strategy.name().to_string(),
            timeframe: request.timeframe,
            position_type: request.position_type,
            signal: signal.clone(),
            signal_strength,
            levels,
            expected_return_percent: levels.expected_return_percent().abs(),
            max_loss: position.risk_amount,
            potential_profit: position.quantity as f64 * (levels.target - levels.entry).abs(),
            position,
            opportunity_score: score,
            risk_reward_ratio: risk_reward,
            reasons: signal.reasons.clone(),
            warnings,
            min_opportunity_score: self.config.min_opportunity_score,
        };

        decision_details.insert("score".to_string(), json!(score));
        decision_details.insert("risk_reward".to_string(), json!(risk_reward));
        decision_details.insert("confidence".to_string(), json!(signal.confidence));
        decision_details.insert("strategy_verdict".to_string(), json!(verdict));

        // 10. Actionable only with no warnings at all
        let decision = TradeDecision::from_recommendation(recommendation, decision_details);
        match &decision.recommendation {
            Some(rec) if decision.should_trade => info!("Trade accepted: {}", rec.summary()),
            Some(rec) => debug!(
                symbol,
                score = rec.opportunity_score,
                warnings = ?rec.warnings,
                "Recommendation not actionable"
            ),
            None => {}
        }

        Ok(decision)
    }

    /// Evaluates the execution timeframe's signal after checking that the
    /// combined multi-timeframe verdict agrees with it.
    pub fn evaluate_timeframes(
        &self,
        symbol: &str,
        signals: &BTreeMap<Timeframe, AggregatedSignal>,
        execution: Timeframe,
        current_price: f64,
        position_type: PositionType,
        risk: RiskContext,
    ) -> Result<TradeDecision, TradeError> {
        let Some(execution_signal) = signals.get(&execution) else {
            let timestamp = signals.values().map(|s| s.timestamp).max().unwrap_or_else(Utc::now);
            return Ok(rejected(
                symbol,
                timestamp,
                RejectionReason::InvalidSignal,
                details([("missing_timeframe", json!(execution.code()))]),
            ));
        };

        let combined = self.timeframe_aggregator.aggregate(symbol, signals);
        let conflicting = combined.direction == Direction::Neutral
            || (combined.direction.is_bullish() && execution_signal.direction.is_bearish())
            || (combined.direction.is_bearish() && execution_signal.direction.is_bullish());
        if conflicting {
            return Ok(rejected(
                symbol,
                execution_signal.timestamp,
                RejectionReason::ConflictingTimeframes,
                details([
                    ("timeframe_direction", json!(combined.direction.to_label())),
                    ("timeframe_confidence", json!(combined.confidence)),
                    ("execution_direction", json!(execution_signal.direction.to_label())),
                    ("timeframe_reasons", json!(combined.reasons)),
                ]),
            ));
        }

        let request = EvaluationRequest::new(symbol, execution_signal, current_price, execution, position_type)
            .with_risk(risk)
            .with_timeframes(signals.get(&Timeframe::Daily), signals.get(&Timeframe::Hour1));
        let mut decision = self.evaluate_request(&request)?;
        decision
            .details
            .insert("timeframe_direction".to_string(), json!(combined.direction.to_label()));
        decision
            .details
            .insert("timeframe_confidence".to_string(), json!(combined.confidence));
        Ok(decision)
    }

    fn warnings(&self, signal: &AggregatedSignal, position: &PositionSizeResult, verdict: &Verdict) -> Vec<String> {
        let mut warnings = Vec::new();

        if signal.bullish_count > 0
            && signal.bearish_count > 0
            && signal.bullish_count.abs_diff(signal.bearish_count) <= 1
        {
            warnings.push("Mixed signals - low consensus".to_string());
        }
        if position.risk_percent > self.config.risk.max_risk_per_trade_percent {
            warnings.push(format!("High risk: {:.1}% of capital", position.risk_percent));
        }
        if signal.confidence < 70.0 {
            warnings.push(format!("Moderate confidence: {:.0}%", signal.confidence));
        }
        if !verdict.accepted {
            warnings.push(format!("{}: {}", self.strategy.name(), verdict.reason));
        }

        warnings
    }
}

/// Bullish buys; bearish shorts intraday and closes longs on swing.
pub fn action_for(direction: Direction, position_type: PositionType) -> TradeAction {
    if direction.is_bullish() {
        TradeAction::Buy
    } else if direction.is_bearish() {
        match position_type {
            PositionType::Intraday => TradeAction::Short,
            PositionType::Swing => TradeAction::Sell,
        }
    } else {
        TradeAction::Hold
    }
}

/// Confidence 40%, consensus 20%, risk:reward (5:1 scores 100) 20%,
/// dominant signal score 20%. Clamped to 0..=100.
pub fn opportunity_score(signal: &AggregatedSignal, risk_reward: f64) -> f64 {
    let rr_score = (risk_reward / 5.0 * 100.0).min(100.0);
    let signal_score = signal.dominant_score() * 100.0;
    let score = signal.confidence * 0.40
        + signal.consensus_strength() * 0.20
        + rr_score * 0.20
        + signal_score * 0.20;
    score.clamp(0.0, 100.0)
}

fn details<const N: usize>(entries: [(&str, Value); N]) -> Details {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn rejected(
    symbol: &str,
    timestamp: DateTime<Utc>,
    reason: RejectionReason,
    details: Details,
) -> TradeDecision {
    debug!(symbol, reason = reason.code(), "Trade rejected: {}", reason.description());
    TradeDecision::reject(symbol, timestamp, reason, details)
}
