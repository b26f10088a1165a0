// =============================================================================
// Signals Module
// =============================================================================
//
// Turning strategy results into one representative signal per instrument:
// - Confidence scoring (alignment, convergence, ADX, volatility, win rate)
// - Best-strategy selection

pub mod confidence;
pub mod selector;

pub use confidence::{Companions, ConfidenceBreakdown, ConfidenceResult, ConfidenceScorer};
pub use selector::{select_best, Candidate, Selection};
