// =============================================================================
// Signal Selector — best strategy per instrument
// =============================================================================
//
// Picks the scoring strategy (SMMA trend, MA cross, MA pullback, in that
// order) with the strictly greatest confidence.  Ties keep the earlier
// candidate.  Supertrend is never a candidate.

use serde::Serialize;

use crate::strategies::{StrategyKind, StrategyResult, Verdict};

use super::confidence::ConfidenceResult;

/// One scoring strategy's result with its confidence.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub result: &'a StrategyResult,
    pub confidence: &'a ConfidenceResult,
}

/// The representative signal of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub best_strategy: StrategyKind,
    pub best_confidence: u32,
    pub overall_signal: Verdict,
}

/// Select among `candidates` in evaluation order.  `None` only when the
/// slice is empty.
pub fn select_best(candidates: &[Candidate<'_>]) -> Option<Selection> {
    let mut best: Option<&Candidate<'_>> = None;
    for candidate in candidates {
        match best {
            Some(b) if candidate.confidence.confidence <= b.confidence.confidence => {}
            _ => best = Some(candidate),
        }
    }

    best.map(|b| Selection {
        best_strategy: b.result.strategy,
        best_confidence: b.confidence.confidence,
        overall_signal: b.result.overall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::confidence::ConfidenceBreakdown;
    use crate::strategies::{SignalBasis, TimeframeReading};
    use crate::types::Timeframe;

    fn result(kind: StrategyKind, raw: f64) -> StrategyResult {
        let reading = TimeframeReading {
            contribution: raw,
            ..TimeframeReading::unavailable(Timeframe::H1)
        };
        StrategyResult::from_readings(kind, vec![reading], |s, e| {
            Verdict::weighted(s, e, SignalBasis::Cross)
        })
    }

    fn conf(confidence: u32) -> ConfidenceResult {
        ConfidenceResult {
            confidence,
            breakdown: ConfidenceBreakdown::default(),
            meets_threshold: confidence >= 70,
        }
    }

    #[test]
    fn highest_confidence_wins() {
        let (a, b, c) = (
            result(StrategyKind::SmmaTrend, 0.0),
            result(StrategyKind::MaCross, 2.0),
            result(StrategyKind::MaPullback, -3.0),
        );
        let (ca, cb, cc) = (conf(60), conf(75), conf(74));
        let pick = select_best(&[
            Candidate { result: &a, confidence: &ca },
            Candidate { result: &b, confidence: &cb },
            Candidate { result: &c, confidence: &cc },
        ])
        .unwrap();
        assert_eq!(pick.best_strategy, StrategyKind::MaCross);
        assert_eq!(pick.best_confidence, 75);
        assert_eq!(pick.overall_signal.to_string(), "BUY (TREND)");
    }

    #[test]
    fn ties_keep_first_listed() {
        let (a, b, c) = (
            result(StrategyKind::SmmaTrend, 0.0),
            result(StrategyKind::MaCross, 0.0),
            result(StrategyKind::MaPullback, 0.0),
        );
        let same = conf(72);
        let pick = select_best(&[
            Candidate { result: &a, confidence: &same },
            Candidate { result: &b, confidence: &same },
            Candidate { result: &c, confidence: &same },
        ])
        .unwrap();
        assert_eq!(pick.best_strategy, StrategyKind::SmmaTrend);

        let higher = conf(73);
        let pick = select_best(&[
            Candidate { result: &a, confidence: &same },
            Candidate { result: &b, confidence: &higher },
            Candidate { result: &c, confidence: &higher },
        ])
        .unwrap();
        assert_eq!(pick.best_strategy, StrategyKind::MaCross);
    }

    #[test]
    fn empty_has_no_selection() {
        assert!(select_best(&[]).is_none());
    }
}
