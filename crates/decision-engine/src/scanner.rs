use futures::future::join_all;
use signal_aggregator::SignalAggregator;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use trade_core::{AggregatedSignal, IndicatorSource, PositionType, Timeframe, TradeError};

use crate::decision::{EvaluationRequest, RiskContext, TradeDecision};
use crate::engine::DecisionEngine;

/// A symbol to scan and its last traded price
#[derive(Debug, Clone, PartialEq)]
pub struct ScanTarget {
    pub symbol: String,
    pub current_price: f64,
}

impl ScanTarget {
    pub fn new(symbol: impl Into<String>, current_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            current_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanFailure {
    pub symbol: String,
    pub error: TradeError,
}

/// Per-symbol outcomes of one scan, in target order
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub decisions: Vec<TradeDecision>,
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    /// Tradable decisions, best opportunity first
    pub fn actionable(&self) -> Vec<&TradeDecision> {
        let mut actionable: Vec<&TradeDecision> =
            self.decisions.iter().filter(|d| d.should_trade).collect();
        actionable.sort_by(|a, b| {
            b.opportunity_score()
                .partial_cmp(&a.opportunity_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        actionable
    }
}

/// Fetches indicator readings for many symbols with bounded concurrency and
/// runs each through the engine independently.
pub struct MarketScanner {
    engine: Arc<DecisionEngine>,
    source: Arc<dyn IndicatorSource>,
    aggregator: SignalAggregator,
    semaphore: Arc<Semaphore>,
    timeframe: Timeframe,
    position_type: PositionType,
}

impl MarketScanner {
    pub fn new(
        engine: Arc<DecisionEngine>,
        source: Arc<dyn IndicatorSource>,
        max_concurrent: usize,
    ) -> Result<Self, TradeError> {
        let aggregator = SignalAggregator::new(engine.config().indicator_weights.clone())?;
        Ok(Self {
            engine,
            source,
            aggregator,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeframe: Timeframe::Daily,
            position_type: PositionType::Swing,
        })
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn with_position_type(mut self, position_type: PositionType) -> Self {
        self.position_type = position_type;
        self
    }

    /// Aggregated signal for one symbol and timeframe
    pub async fn fetch_signal(&self, symbol: &str, timeframe: Timeframe) -> Result<AggregatedSignal, TradeError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| TradeError::SignalSource(format!("Semaphore error: {e}")))?;
        let readings = self.source.indicator_signals(symbol, timeframe).await?;
        Ok(self.aggregator.aggregate(symbol, readings))
    }

    /// Fetch several timeframes of one symbol concurrently. Timeframes that
    /// fail are skipped; it is an error only when none succeed.
    pub async fn fetch_timeframes(
        &self,
        symbol: &str,
        timeframes: &[Timeframe],
    ) -> Result<BTreeMap<Timeframe, AggregatedSignal>, TradeError> {
        let futures: Vec<_> = timeframes
            .iter()
            .map(|&timeframe| async move {
                match self.fetch_signal(symbol, timeframe).await {
                    Ok(signal) => Some((timeframe, signal)),
                    Err(e) => {
                        debug!("Failed to fetch {} signals for {}: {}", timeframe, symbol, e);
                        None
                    }
                }
            })
            .collect();

        let signals: BTreeMap<Timeframe, AggregatedSignal> =
            join_all(futures).await.into_iter().flatten().collect();
        if signals.is_empty() && !timeframes.is_empty() {
            return Err(TradeError::SignalSource(format!("No timeframe data for {symbol}")));
        }
        Ok(signals)
    }

    /// Single-timeframe scan of every target
    pub async fn scan(&self, targets: &[ScanTarget], risk: &RiskContext) -> ScanReport {
        let futures = targets.iter().map(|target| async move {
            let result = match self.fetch_signal(&target.symbol, self.timeframe).await {
                Ok(signal) => {
                    let request = EvaluationRequest::new(
                        &target.symbol,
                        &signal,
                        target.current_price,
                        self.timeframe,
                        self.position_type,
                    )
                    .with_risk(risk.clone());
                    self.engine.evaluate_request(&request)
                }
                Err(e) => Err(e),
            };
            (target.symbol.clone(), result)
        });

        self.collect(join_all(futures).await)
    }

    /// Multi-timeframe scan: each target's `timeframes` are combined and the
    /// `execution` timeframe is evaluated.
    pub async fn scan_timeframes(
        &self,
        targets: &[ScanTarget],
        timeframes: &[Timeframe],
        execution: Timeframe,
        risk: &RiskContext,
    ) -> ScanReport {
        let futures = targets.iter().map(|target| async move {
            let result = match self.fetch_timeframes(&target.symbol, timeframes).await {
                Ok(signals) => self.engine.evaluate_timeframes(
                    &target.symbol,
                    &signals,
                    execution,
                    target.current_price,
                    self.position_type,
                    risk.clone(),
                ),
                Err(e) => Err(e),
            };
            (target.symbol.clone(), result)
        });

        self.collect(join_all(futures).await)
    }

    fn collect(&self, results: Vec<(String, Result<TradeDecision, TradeError>)>) -> ScanReport {
        let mut report = ScanReport::default();
        for (symbol, result) in results {
            match result {
                Ok(decision) => report.decisions.push(decision),
                Err(error) => {
                    warn!("Scan failed for {}: {}", symbol, error);
                    report.failures.push(ScanFailure { symbol, error });
                }
            }
        }

        info!(
            "Market scan: {} evaluated, {} actionable, {} failed",
            report.decisions.len(),
            report.decisions.iter().filter(|d| d.should_trade).count(),
            report.failures.len()
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trade_core::{CapitalProvider, Direction, IndicatorSignal, OpenPositions, PositionProvider, RejectionReason};

    struct Capital;

    impl CapitalProvider for Capital {
        fn available_capital(&self) -> Result<Decimal, TradeError> {
            Ok(dec!(100000))
        }
    }

    struct EmptyBook;

    impl PositionProvider for EmptyBook {
        fn open_positions(&self, _position_type: PositionType) -> Result<OpenPositions, TradeError> {
            Ok(OpenPositions::default())
        }
    }

    /// Bullish for every symbol except `BEAR`, fails for `DOWN`, and tracks
    /// how many fetches run at once.
    #[derive(Default)]
    struct FakeSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl IndicatorSource for FakeSource {
        async fn indicator_signals(
            &self,
            symbol: &str,
            timeframe: Timeframe,
        ) -> Result<BTreeMap<String, IndicatorSignal>, TradeError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if symbol == "DOWN" || (symbol == "PARTIAL" && timeframe != Timeframe::Daily) {
                return Err(TradeError::SignalSource(format!("no data for {symbol}")));
            }
            let direction = if symbol == "BEAR" { Direction::Sell } else { Direction::Buy };
            let mut readings = BTreeMap::new();
            for (name, value) in [("RSI_14", 58.0), ("MACD", 1.2), ("BB", 95.0), ("ADX", 28.0), ("STOCH", 70.0)] {
                readings.insert(name.to_string(), IndicatorSignal::new(name, direction, 85.0, value));
            }
            readings.insert(
                "ATR_14".to_string(),
                IndicatorSignal::new("ATR_14", Direction::Neutral, 0.0, 2.0),
            );
            Ok(readings)
        }
    }

    fn scanner(source: Arc<FakeSource>, max_concurrent: usize) -> MarketScanner {
        let engine = DecisionEngine::new(EngineConfig::default(), Arc::new(Capital), Arc::new(EmptyBook)).unwrap();
        MarketScanner::new(Arc::new(engine), source, max_concurrent).unwrap()
    }

    fn targets(symbols: &[&str]) -> Vec<ScanTarget> {
        symbols.iter().map(|s| ScanTarget::new(*s, 100.0)).collect()
    }

    #[tokio::test]
    async fn test_scan_reports_failures_without_aborting() {
        let scanner = scanner(Arc::new(FakeSource::default()), 4);
        let report = scanner
            .scan(&targets(&["ITC", "DOWN", "BEAR", "TCS"]), &RiskContext::default())
            .await;

        assert_eq!(report.decisions.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol, "DOWN");

        let symbols: Vec<&str> = report.decisions.iter().map(|d| d.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ITC", "BEAR", "TCS"]);
        // Bearish swing signals close longs, which size to nothing
        assert_eq!(
            report.decisions[1].rejection_reason,
            Some(RejectionReason::CapitalInsufficient)
        );
        assert_eq!(report.actionable().len(), 2);
    }

    #[tokio::test]
    async fn test_scan_respects_concurrency_limit() {
        let source = Arc::new(FakeSource::default());
        let scanner = scanner(Arc::clone(&source), 2);
        let symbols: Vec<String> = (0..12).map(|i| format!("SYM{i}")).collect();
        let targets: Vec<ScanTarget> = symbols.iter().map(|s| ScanTarget::new(s.as_str(), 100.0)).collect();

        let report = scanner.scan(&targets, &RiskContext::default()).await;
        assert_eq!(report.decisions.len(), 12);
        assert!(source.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_fetch_timeframes_skips_failures() {
        let scanner = scanner(Arc::new(FakeSource::default()), 4);
        let timeframes = [Timeframe::Daily, Timeframe::Hour1, Timeframe::Min15];

        let all = scanner.fetch_timeframes("ITC", &timeframes).await.unwrap();
        assert_eq!(all.len(), 3);

        let partial = scanner.fetch_timeframes("PARTIAL", &timeframes).await.unwrap();
        assert_eq!(partial.keys().copied().collect::<Vec<_>>(), vec![Timeframe::Daily]);

        let err = scanner.fetch_timeframes("DOWN", &timeframes).await.unwrap_err();
        assert!(matches!(err, TradeError::SignalSource(_)));
    }

    #[tokio::test]
    async fn test_intraday_multi_timeframe_scan() {
        let scanner = scanner(Arc::new(FakeSource::default()), 4)
            .with_timeframe(Timeframe::Min15)
            .with_position_type(PositionType::Intraday);
        let risk = RiskContext {
            current_time: NaiveTime::from_hms_opt(10, 30, 0),
            ..Default::default()
        };

        let report = scanner
            .scan_timeframes(
                &targets(&["ITC", "PARTIAL"]),
                &[Timeframe::Daily, Timeframe::Hour1, Timeframe::Min15],
                Timeframe::Min15,
                &risk,
            )
            .await;

        assert_eq!(report.decisions.len(), 2);
        assert!(report.decisions[0].should_trade, "{:?}", report.decisions[0]);
        // Only daily data came back, so the execution timeframe is missing
        assert_eq!(
            report.decisions[1].rejection_reason,
            Some(RejectionReason::InvalidSignal)
        );
    }
}
