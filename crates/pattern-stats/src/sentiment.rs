//! Agreement between price-derived sentiment labels and independently
//! retrieved historical labels, plus the alignment diagnostics that feed the
//! aggregate pattern.

use event_core::{SentimentComparison, SentimentLabel};

/// Agreement at or above this level counts as aligned.
pub const ALIGNED_THRESHOLD: f64 = 0.7;

/// Widest possible distance on the five-point bipolar scale.
const MAX_SCALE_DELTA: f64 = 4.0;

/// Performance gap (in percentage points of mean absolute move) required
/// before the aligned-vs-diverged comparison is reported.
const PERFORMANCE_GAP_PCT: f64 = 2.0;

/// Agreement between two labels: 1 at identical labels, 0 at opposite
/// extremes of the scale.
pub fn agreement(classified: SentimentLabel, historical: SentimentLabel) -> f64 {
    let delta = (classified.scale_value() - historical.scale_value()).abs() as f64;
    1.0 - delta / MAX_SCALE_DELTA
}

pub fn compare(classified: SentimentLabel, historical: SentimentLabel) -> SentimentComparison {
    SentimentComparison {
        classified,
        historical,
        agreement: agreement(classified, historical),
    }
}

/// One match's sentiment comparison with its realized move, when known.
#[derive(Debug, Clone)]
pub struct AlignmentRecord {
    pub agreement: f64,
    pub price_change_pct: Option<f64>,
}

/// Share of records counted as aligned, 0-100, rounded to whole percent.
pub fn alignment_pct(records: &[AlignmentRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let aligned = records
        .iter()
        .filter(|r| r.agreement >= ALIGNED_THRESHOLD)
        .count();
    ((aligned as f64 / records.len() as f64) * 100.0).round()
}

/// Insight lines for the aggregate pattern: aligned-vs-diverged performance
/// when both groups have enough samples, and a consistency note at the
/// extremes of the alignment percentage.
pub fn alignment_insights(records: &[AlignmentRecord], alignment_pct: f64) -> Vec<String> {
    let mut insights = Vec::new();

    let aligned: Vec<f64> = records
        .iter()
        .filter(|r| r.agreement >= ALIGNED_THRESHOLD)
        .filter_map(|r| r.price_change_pct)
        .collect();
    let diverged: Vec<f64> = records
        .iter()
        .filter(|r| r.agreement < ALIGNED_THRESHOLD)
        .filter_map(|r| r.price_change_pct)
        .collect();

    if aligned.len() >= 2 && diverged.len() >= 2 {
        let avg_aligned: f64 = aligned.iter().sum::<f64>() / aligned.len() as f64;
        let avg_diverged: f64 = diverged.iter().sum::<f64>() / diverged.len() as f64;
        let gap = avg_aligned.abs() - avg_diverged.abs();

        if gap > PERFORMANCE_GAP_PCT {
            insights.push(format!(
                "Events where sentiment analysis aligned with historical sentiment had stronger price movements ({:.1}% vs {:.1}%)",
                avg_aligned, avg_diverged
            ));
        } else if gap < -PERFORMANCE_GAP_PCT {
            insights.push(format!(
                "Events where sentiment analysis diverged from historical sentiment had stronger price movements ({:.1}% vs {:.1}%)",
                avg_diverged, avg_aligned
            ));
        }
    }

    if alignment_pct >= 70.0 {
        insights.push(format!(
            "Strong consistency ({:.0}%) between price-based classification and historical sentiment data suggests reliable sentiment signals for these events",
            alignment_pct
        ));
    } else if alignment_pct <= 30.0 {
        insights.push(format!(
            "Low consistency ({:.0}%) between price-based classification and historical sentiment data suggests sentiment often diverges from price action for these events",
            alignment_pct
        ));
    }

    insights
}
