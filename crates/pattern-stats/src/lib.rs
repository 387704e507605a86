//! Statistical pattern analysis over matched historical events: aggregate
//! direction/consistency/volatility summaries, macro-factor correlations,
//! and sentiment-alignment diagnostics.

pub mod aggregate;
pub mod correlation;
pub mod sentiment;

pub use aggregate::{aggregate_pattern, EnrichedMatch};
pub use correlation::{compute_correlations, macro_insights, MacroObservation};
pub use sentiment::{agreement, alignment_insights, alignment_pct, compare, AlignmentRecord};
