// =============================================================================
// Signal Engine — per-instrument analysis
// =============================================================================
//
// Pipeline for one instrument in one scan cycle:
//   1. Run the four strategies over the per-timeframe series
//   2. Score confidence for SMMA trend, MA cross and MA pullback, each against
//      the cross/pullback companion pair and the volatility series
//   3. Select the most confident of the three as the instrument's signal
//   4. Attach the technical context (pivots, swing levels, patterns)
//
// The engine keeps no state between calls: identical series always produce
// an identical `InstrumentAnalysis`.
// =============================================================================

use serde::Serialize;
use tracing::info;

use crate::market_data::SeriesByTimeframe;
use crate::runtime_config::{display_name, RuntimeConfig};
use crate::signals::{
    select_best, Candidate, Companions, ConfidenceResult, ConfidenceScorer, Selection,
};
use crate::strategies::{
    MaCrossStrategy, MaPullbackStrategy, SmmaTrendStrategy, Strategy, StrategyKind,
    StrategyResult, SupertrendStrategy, Verdict,
};
use crate::technical::{TechnicalAnalysis, TechnicalAnalyzer};
use crate::types::Side;

// =============================================================================
// InstrumentAnalysis
// =============================================================================

/// Everything the engine concluded about one instrument in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentAnalysis {
    pub instrument: String,
    pub display_name: String,
    pub smma_trend: StrategyResult,
    pub ma_cross: StrategyResult,
    pub ma_pullback: StrategyResult,
    /// Display context only.
    pub supertrend: StrategyResult,
    pub smma_confidence: ConfidenceResult,
    pub ma_cross_confidence: ConfidenceResult,
    pub ma_pullback_confidence: ConfidenceResult,
    pub best_strategy: StrategyKind,
    pub best_confidence: u32,
    pub overall_signal: Verdict,
    /// Last H4 close, or H1 when H4 is absent.
    pub current_price: Option<f64>,
    /// Pivots, swing levels and candle patterns for display.
    pub technical: TechnicalAnalysis,
}

impl InstrumentAnalysis {
    /// Normalised direction of the selected signal.
    pub fn side(&self) -> Option<Side> {
        self.overall_signal.side()
    }

    pub fn result(&self, kind: StrategyKind) -> &StrategyResult {
        match kind {
            StrategyKind::SmmaTrend => &self.smma_trend,
            StrategyKind::MaCross => &self.ma_cross,
            StrategyKind::MaPullback => &self.ma_pullback,
            StrategyKind::Supertrend => &self.supertrend,
        }
    }

    /// Confidence of a scoring strategy; `None` for supertrend.
    pub fn confidence(&self, kind: StrategyKind) -> Option<&ConfidenceResult> {
        match kind {
            StrategyKind::SmmaTrend => Some(&self.smma_confidence),
            StrategyKind::MaCross => Some(&self.ma_cross_confidence),
            StrategyKind::MaPullback => Some(&self.ma_pullback_confidence),
            StrategyKind::Supertrend => None,
        }
    }
}

// =============================================================================
// SignalEngine
// =============================================================================

pub struct SignalEngine {
    smma_trend: SmmaTrendStrategy,
    ma_cross: MaCrossStrategy,
    ma_pullback: MaPullbackStrategy,
    supertrend: SupertrendStrategy,
    scorer: ConfidenceScorer,
    technical: TechnicalAnalyzer,
}

impl SignalEngine {
    pub fn new(
        smma_trend: SmmaTrendStrategy,
        ma_cross: MaCrossStrategy,
        ma_pullback: MaPullbackStrategy,
        supertrend: SupertrendStrategy,
        scorer: ConfidenceScorer,
        technical: TechnicalAnalyzer,
    ) -> Self {
        Self {
            smma_trend,
            ma_cross,
            ma_pullback,
            supertrend,
            scorer,
            technical,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            SmmaTrendStrategy::new(config.smma.clone(), config.adx.clone()),
            MaCrossStrategy::new(config.ma_cross.clone()),
            MaPullbackStrategy::new(config.ma_pullback.clone()),
            SupertrendStrategy::new(config.supertrend.clone()),
            ConfidenceScorer::new(config.confidence.clone()),
            TechnicalAnalyzer::new(config.technical.clone()),
        )
    }

    /// Analyze one instrument.  Missing timeframes degrade to neutral,
    /// unavailable readings; this never fails.
    pub fn analyze(&self, instrument: &str, series: &SeriesByTimeframe) -> InstrumentAnalysis {
        let [smma_trend, ma_cross, ma_pullback, supertrend] =
            self.strategies().map(|strategy| strategy.analyze(series));

        let companions = Companions {
            ma_cross: Some(&ma_cross),
            ma_pullback: Some(&ma_pullback),
        };
        let volatility = series.get(self.scorer.params().volatility_timeframe);

        let scoring = [&smma_trend, &ma_cross, &ma_pullback];
        let [smma_confidence, ma_cross_confidence, ma_pullback_confidence] =
            scoring.map(|result| self.scorer.score(result, companions, volatility));

        let confidences = [&smma_confidence, &ma_cross_confidence, &ma_pullback_confidence];
        let candidates = scoring
            .into_iter()
            .zip(confidences)
            .map(|(result, confidence)| Candidate { result, confidence });
        let selection = select_best(&candidates.collect::<Vec<_>>());

        let Selection {
            best_strategy,
            best_confidence,
            overall_signal,
        } = selection.unwrap_or(Selection {
            best_strategy: StrategyKind::SmmaTrend,
            best_confidence: smma_confidence.confidence,
            overall_signal: smma_trend.overall,
        });

        info!(
            instrument,
            strategy = %best_strategy,
            confidence = best_confidence,
            signal = %overall_signal,
            smma_score = smma_trend.score,
            cross_score = ma_cross.score,
            pullback_score = ma_pullback.score,
            supertrend = %supertrend.overall,
            "instrument analyzed"
        );

        InstrumentAnalysis {
            instrument: instrument.to_string(),
            display_name: display_name(instrument),
            current_price: series.current_price(),
            technical: self.technical.analyze(series),
            smma_trend,
            ma_cross,
            ma_pullback,
            supertrend,
            smma_confidence,
            ma_cross_confidence,
            ma_pullback_confidence,
            best_strategy,
            best_confidence,
            overall_signal,
        }
    }

    /// Every strategy the engine runs: the three scoring ones in selection
    /// order, then supertrend.
    fn strategies(&self) -> [&dyn Strategy; 4] {
        [
            &self.smma_trend,
            &self.ma_cross,
            &self.ma_pullback,
            &self.supertrend,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testutil::*;
    use crate::types::{AdxStrength, Timeframe};

    fn engine() -> SignalEngine {
        SignalEngine::from_config(&RuntimeConfig::default())
    }

    #[test]
    fn strong_uptrend_end_to_end() {
        let analysis = engine().analyze("EUR_USD", &all_timeframes(&rising(300)));

        assert_eq!(analysis.smma_trend.score, 5);
        assert_eq!(analysis.smma_trend.overall.to_string(), "STRONG BUY");
        for tf in Timeframe::CORE {
            assert_eq!(analysis.smma_trend.adx(tf), AdxStrength::Strong);
        }
        assert_eq!(analysis.smma_confidence.breakdown.timeframe_alignment, 40);
        assert_eq!(analysis.smma_confidence.breakdown.trend_strength, 15);
        assert_eq!(analysis.display_name, "EURUSD");
        assert!((analysis.current_price.unwrap() - 1.299).abs() < 1e-9);
        assert_eq!(analysis.supertrend.overall.to_string(), "STRONG UP");
        assert!(analysis.technical.daily_pivots.is_some());
        assert!(analysis.technical.atr_h4.is_some());
    }

    #[test]
    fn smma_wins_when_it_carries_adx() {
        // Only SMMA attaches ADX labels, so its trend-strength points put it
        // ahead of the MA strategies on the same aligned data.
        let analysis = engine().analyze("GBP_USD", &all_timeframes(&rising(300)));
        assert!(analysis.smma_confidence.confidence > analysis.ma_cross_confidence.confidence);
        assert_eq!(analysis.best_strategy, StrategyKind::SmmaTrend);
        assert_eq!(analysis.best_confidence, analysis.smma_confidence.confidence);
        assert_eq!(analysis.overall_signal, analysis.smma_trend.overall);
        assert_eq!(analysis.side(), Some(Side::Buy));
    }

    #[test]
    fn no_data_is_neutral() {
        let analysis = engine().analyze("XAU_USD", &SeriesByTimeframe::new());
        assert_eq!(analysis.overall_signal, Verdict::NEUTRAL);
        assert_eq!(analysis.side(), None);
        assert_eq!(analysis.current_price, None);
        assert!(analysis.best_confidence <= 100);
        // volatility series absent => 8, plus the win-rate points
        assert_eq!(analysis.smma_confidence.confidence, 8 + 10);
        assert_eq!(analysis.best_strategy, StrategyKind::SmmaTrend);
    }

    #[test]
    fn analysis_is_deterministic() {
        let series = all_timeframes(&falling(300));
        let e = engine();
        assert_eq!(e.analyze("USD_JPY", &series), e.analyze("USD_JPY", &series));
    }

    #[test]
    fn supertrend_is_never_selected() {
        let analysis = engine().analyze("USD_JPY", &all_timeframes(&falling(300)));
        assert_ne!(analysis.best_strategy, StrategyKind::Supertrend);
        assert!(analysis.confidence(StrategyKind::Supertrend).is_none());
        let kinds = [
            analysis.smma_trend.strategy,
            analysis.ma_cross.strategy,
            analysis.ma_pullback.strategy,
            analysis.supertrend.strategy,
        ];
        assert_eq!(
            kinds,
            [
                StrategyKind::SmmaTrend,
                StrategyKind::MaCross,
                StrategyKind::MaPullback,
                StrategyKind::Supertrend,
            ]
        );
    }

    #[test]
    fn price_comes_from_h4_then_h1() {
        let mut series = all_timeframes(&rising(300));
        series.insert(Timeframe::H4, series_from_closes(&[1.4, 1.5]));
        let analysis = engine().analyze("EUR_USD", &series);
        assert_eq!(analysis.current_price, Some(1.5));

        let h1_only = SeriesByTimeframe::new()
            .with(Timeframe::M15, rising(300))
            .with(Timeframe::H1, series_from_closes(&[1.1, 1.2]));
        assert_eq!(engine().analyze("EUR_USD", &h1_only).current_price, Some(1.2));
    }
}
