//! Aggregate pattern statistics over a set of historical matches.
//!
//! The base pattern (direction, consistency, volatility) always computes from
//! whatever matches carry analyzed impacts. Macro-correlation and
//! sentiment-alignment sections are additive and appear only when their
//! sample-size guards are met.

use std::collections::HashMap;

use event_core::{
    AggregatePattern, EngineError, EventMatch, MacroSnapshot, SentimentComparison,
};

use crate::correlation::{compute_correlations, macro_insights, MacroObservation};
use crate::sentiment::{alignment_insights, alignment_pct, AlignmentRecord};

/// Matches carrying a usable macro snapshot required before correlation runs.
const MIN_MACRO_SAMPLES: usize = 3;

/// Matches carrying a sentiment comparison required before alignment runs.
const MIN_SENTIMENT_SAMPLES: usize = 2;

/// A match optionally enriched with the macro regime and sentiment
/// comparison recorded for its event.
#[derive(Debug, Clone)]
pub struct EnrichedMatch {
    pub event_match: EventMatch,
    pub macro_snapshot: Option<MacroSnapshot>,
    pub sentiment: Option<SentimentComparison>,
}

impl EnrichedMatch {
    pub fn bare(event_match: EventMatch) -> Self {
        Self {
            event_match,
            macro_snapshot: None,
            sentiment: None,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn direction_band(avg_change: f64) -> &'static str {
    if avg_change > 5.0 {
        "Strong bullish trend"
    } else if avg_change > 1.0 {
        "Moderate bullish trend"
    } else if avg_change > -1.0 {
        "Neutral or sideways movement"
    } else if avg_change > -5.0 {
        "Moderate bearish trend"
    } else {
        "Strong bearish trend"
    }
}

fn volatility_band(avg_drawdown_magnitude: f64) -> &'static str {
    if avg_drawdown_magnitude > 10.0 {
        " with significant volatility"
    } else if avg_drawdown_magnitude > 5.0 {
        " with moderate volatility"
    } else {
        " with low volatility"
    }
}

/// Most frequent value, ties broken lexicographically for determinism.
fn dominant(counts: &HashMap<&str, usize>) -> String {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Recompute the full aggregate pattern from scratch.
///
/// Matches whose impact analysis came back unavailable still count toward
/// sector/ticker dominance but carry no price statistics. At least one
/// analyzed impact is required.
pub fn aggregate_pattern(matches: &[EnrichedMatch]) -> Result<AggregatePattern, EngineError> {
    let mut price_changes = Vec::new();
    let mut drawdowns = Vec::new();
    let mut sectors: HashMap<&str, usize> = HashMap::new();
    let mut tickers: HashMap<&str, usize> = HashMap::new();
    let mut macro_points = Vec::new();
    let mut sentiment_records = Vec::new();

    for enriched in matches {
        let m = &enriched.event_match;
        *sectors.entry(m.template.sector.as_str()).or_insert(0) += 1;
        *tickers
            .entry(m.template.affected_ticker.as_str())
            .or_insert(0) += 1;

        let change = m.impact.price_change_pct();
        if let Some(change) = change {
            price_changes.push(change);
            if let Some(dd) = m.impact.max_drawdown_pct() {
                drawdowns.push(dd);
            }
            if let Some(snapshot) = &enriched.macro_snapshot {
                let point = MacroObservation::from_snapshot(change, snapshot);
                if point.has_any_factor() {
                    macro_points.push(point);
                }
            }
        }

        if let Some(comparison) = &enriched.sentiment {
            sentiment_records.push(AlignmentRecord {
                agreement: comparison.agreement,
                price_change_pct: change,
            });
        }
    }

    if price_changes.is_empty() {
        return Err(EngineError::InsufficientData(
            "no matches with analyzed market impact".to_string(),
        ));
    }

    let total = price_changes.len();
    let bullish_count = price_changes.iter().filter(|c| **c > 0.0).count();
    let bearish_count = price_changes.iter().filter(|c| **c < 0.0).count();
    let consistency_score =
        (bullish_count.max(bearish_count) as f64 / total as f64 * 100.0).round();

    let avg_price_change = price_changes.iter().sum::<f64>() / total as f64;
    let avg_drawdown = if drawdowns.is_empty() {
        0.0
    } else {
        drawdowns.iter().sum::<f64>() / drawdowns.len() as f64
    };

    let pattern_summary = format!(
        "{}{}",
        direction_band(avg_price_change),
        volatility_band(avg_drawdown.abs())
    );

    let mut pattern = AggregatePattern {
        pattern_summary,
        consistency_score,
        avg_price_change_pct: round2(avg_price_change),
        avg_max_drawdown_pct: round2(avg_drawdown),
        bullish_count,
        bearish_count,
        dominant_sector: dominant(&sectors),
        dominant_ticker: dominant(&tickers),
        matches_analyzed: total,
        macro_correlations: None,
        macro_insights: Vec::new(),
        sentiment_alignment_pct: None,
        sentiment_insights: Vec::new(),
    };

    if macro_points.len() >= MIN_MACRO_SAMPLES {
        let correlations = compute_correlations(&macro_points);
        pattern.macro_insights = macro_insights(&correlations, &macro_points);
        pattern.macro_correlations = Some(correlations);
    } else {
        log::info!(
            "skipping macro correlation analysis: {} of {} required samples",
            macro_points.len(),
            MIN_MACRO_SAMPLES
        );
    }

    if sentiment_records.len() >= MIN_SENTIMENT_SAMPLES {
        let pct = alignment_pct(&sentiment_records);
        pattern.sentiment_insights = alignment_insights(&sentiment_records, pct);
        pattern.sentiment_alignment_pct = Some(pct);
    } else {
        log::info!(
            "skipping sentiment alignment analysis: {} of {} required samples",
            sentiment_records.len(),
            MIN_SENTIMENT_SAMPLES
        );
    }

    Ok(pattern)
}
