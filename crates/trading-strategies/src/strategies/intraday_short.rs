use chrono::NaiveTime;
use trade_core::{AggregatedSignal, TradeAction, TradeLevels};

use super::config_or_default;
use crate::config::StrategyConfig;
use crate::strategy::{
    adx, check_confidence, macd_histogram, rounded, rsi, StopRule, Strategy, StrategyContext,
    Verdict,
};

/// Short-only intraday breakdown trades, squared off before the close.
///
/// Breakdowns that fail reverse quickly, so the stop is a tight 1.2% and the
/// target a conservative 2× risk. New entries are refused once the
/// square-off time is reached.
#[derive(Debug, Clone)]
pub struct IntradayShortStrategy {
    config: StrategyConfig,
    stop_percent: f64,
    reward_multiple: f64,
    rsi_band: (f64, f64),
    min_adx: f64,
    min_confidence: f64,
    square_off: NaiveTime,
}

impl IntradayShortStrategy {
    pub const NAME: &'static str = "INTRADAY_SHORT";
    pub const DESCRIPTION: &'static str =
        "Intraday short-selling strategy for support breakdown with volume confirmation (MIS only)";

    pub fn new(config: Option<StrategyConfig>) -> Self {
        let config = config_or_default(config, Self::NAME, Self::DESCRIPTION);
        let default_square_off = NaiveTime::from_hms_opt(15, 15, 0).unwrap_or(NaiveTime::MIN);
        Self {
            stop_percent: config.param_f64("stop_percent", 1.2),
            reward_multiple: config.param_f64("reward_multiple", 2.0),
            rsi_band: (
                config.param_f64("rsi_min", 20.0),
                config.param_f64("rsi_max", 50.0),
            ),
            min_adx: config.param_f64("min_adx", 18.0),
            min_confidence: config.param_f64("intraday_min_confidence", 65.0),
            square_off: config.param_time("square_off_time", default_square_off),
            config,
        }
    }

    /// Clock time from which new entries are refused
    pub fn square_off_time(&self) -> NaiveTime {
        self.square_off
    }
}

impl Default for IntradayShortStrategy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Strategy for IntradayShortStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn calculate_trade_levels(
        &self,
        current_price: f64,
        _signal: &AggregatedSignal,
        action: TradeAction,
    ) -> TradeLevels {
        if action != TradeAction::Short {
            return rounded(TradeLevels::flat(current_price));
        }
        StopRule::Percent(self.stop_percent).levels(current_price, None, action, self.reward_multiple)
    }

    fn should_take_trade(
        &self,
        signal: &AggregatedSignal,
        _current_price: f64,
        context: &StrategyContext<'_>,
    ) -> Verdict {
        if let Some(rejected) = check_confidence(&self.config, signal) {
            return rejected;
        }

        if !signal.leans_bearish() {
            return Verdict::reject("Intraday short strategy requires bearish signal");
        }

        let Some(rsi) = rsi(signal) else {
            return Verdict::reject("RSI not available");
        };
        let (rsi_min, rsi_max) = self.rsi_band;
        if rsi > rsi_max {
            return Verdict::reject(format!("RSI {rsi:.1} > {rsi_max} (not bearish enough for short)"));
        }
        if rsi < rsi_min {
            return Verdict::reject(format!("RSI {rsi:.1} < {rsi_min} (too oversold, may bounce)"));
        }

        let Some(adx) = adx(signal) else {
            return Verdict::reject("ADX not available");
        };
        if adx < self.min_adx {
            return Verdict::reject(format!(
                "ADX {adx:.1} < {} (insufficient directional movement)",
                self.min_adx
            ));
        }

        if macd_histogram(signal).is_some_and(|m| m > 0.0) {
            return Verdict::reject("MACD bullish (histogram > 0), not suitable for short");
        }

        if signal.confidence < self.min_confidence {
            return Verdict::reject(format!(
                "Confidence {:.0}% < {}% (intraday shorts need high confidence)",
                signal.confidence, self.min_confidence
            ));
        }

        let Some(now) = context.current_time else {
            return Verdict::reject("Clock time required to enforce square-off");
        };
        if now >= self.square_off {
            return Verdict::reject(format!(
                "Past square-off time {} (no new intraday entries)",
                self.square_off.format("%H:%M")
            ));
        }

        Verdict::accept(format!(
            "Intraday short setup confirmed (RSI: {rsi:.1}, ADX: {adx:.1})"
        ))
    }

    fn allows_long_positions(&self) -> bool {
        false
    }
}
