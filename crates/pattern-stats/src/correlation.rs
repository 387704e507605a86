//! Pearson correlation of macro factors against realized match outcomes,
//! plus regime-bucket comparisons for the insight list.

use event_core::{
    CorrelationDirection, CorrelationStrength, FactorCorrelation, MacroCorrelations, MacroSnapshot,
};

/// Minimum valid pairs before a correlation is reported at all.
const MIN_CORRELATION_SAMPLES: usize = 3;

/// Minimum samples on each side of a regime threshold before the bucket
/// means are compared.
const MIN_REGIME_SAMPLES: usize = 2;

/// Bucket means must differ by more than this many percentage points to be
/// surfaced as an insight.
const REGIME_GAP_PCT: f64 = 3.0;

/// One match outcome paired with the macro readings in force at its event date.
#[derive(Debug, Clone)]
pub struct MacroObservation {
    pub price_change_pct: f64,
    pub cpi: Option<f64>,
    pub fed_rate: Option<f64>,
    pub unemployment: Option<f64>,
    pub yield_curve: Option<f64>,
}

impl MacroObservation {
    pub fn from_snapshot(price_change_pct: f64, snapshot: &MacroSnapshot) -> Self {
        Self {
            price_change_pct,
            cpi: snapshot.cpi_yoy(),
            fed_rate: snapshot.fed_funds_rate(),
            unemployment: snapshot.unemployment(),
            yield_curve: snapshot.yield_curve_spread(),
        }
    }

    /// True when at least one canonical factor is populated.
    pub fn has_any_factor(&self) -> bool {
        self.cpi.is_some()
            || self.fed_rate.is_some()
            || self.unemployment.is_some()
            || self.yield_curve.is_some()
    }
}

/// Pearson coefficient over paired samples. A degenerate sample (either side
/// constant) yields 0.0 rather than NaN.
fn pearson(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len() as f64;
    let sum_x: f64 = pairs.iter().map(|(x, _)| x).sum();
    let sum_y: f64 = pairs.iter().map(|(_, y)| y).sum();
    let sum_xy: f64 = pairs.iter().map(|(x, y)| x * y).sum();
    let sum_x2: f64 = pairs.iter().map(|(x, _)| x * x).sum();
    let sum_y2: f64 = pairs.iter().map(|(_, y)| y * y).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn factor_correlation<F>(points: &[MacroObservation], factor: F) -> FactorCorrelation
where
    F: Fn(&MacroObservation) -> Option<f64>,
{
    let pairs: Vec<(f64, f64)> = points
        .iter()
        .filter_map(|p| factor(p).map(|v| (p.price_change_pct, v)))
        .collect();

    if pairs.len() < MIN_CORRELATION_SAMPLES {
        return FactorCorrelation::insufficient(pairs.len());
    }

    let r = pearson(&pairs);
    let rounded = (r * 100.0).round() / 100.0;
    FactorCorrelation {
        correlation: rounded,
        strength: CorrelationStrength::from_abs(r.abs()),
        direction: Some(if r > 0.0 {
            CorrelationDirection::Positive
        } else {
            CorrelationDirection::Negative
        }),
        sample_size: pairs.len(),
    }
}

/// Per-factor Pearson correlations over the canonical macro factors.
pub fn compute_correlations(points: &[MacroObservation]) -> MacroCorrelations {
    MacroCorrelations {
        cpi: factor_correlation(points, |p| p.cpi),
        fed_rate: factor_correlation(points, |p| p.fed_rate),
        unemployment: factor_correlation(points, |p| p.unemployment),
        yield_curve: factor_correlation(points, |p| p.yield_curve),
    }
}

fn is_significant(c: &FactorCorrelation) -> bool {
    matches!(
        c.strength,
        CorrelationStrength::Moderate | CorrelationStrength::Strong
    )
}

fn correlation_insight(label: &str, data: &FactorCorrelation) -> String {
    let direction = match data.direction {
        Some(CorrelationDirection::Positive) => "Positive",
        _ => "Negative",
    };
    let returns = if data.correlation > 0.0 { "higher" } else { "lower" };
    format!(
        "{} {} correlation ({}) between {} and market performance: {} tends to correlate with {} returns during similar events.",
        data.strength.name(),
        direction,
        data.correlation,
        label,
        label,
        returns
    )
}

/// Compare mean outcomes on each side of a regime threshold. Returns an
/// insight line only when both buckets are populated and the gap is material.
fn regime_insight<F>(
    points: &[MacroObservation],
    factor: F,
    in_regime: impl Fn(f64) -> bool,
    regime_name: &str,
    baseline_name: &str,
) -> Option<String>
where
    F: Fn(&MacroObservation) -> Option<f64>,
{
    let mut in_bucket = Vec::new();
    let mut out_bucket = Vec::new();
    for p in points {
        match factor(p) {
            Some(v) if in_regime(v) => in_bucket.push(p.price_change_pct),
            Some(_) => out_bucket.push(p.price_change_pct),
            None => {}
        }
    }

    if in_bucket.len() < MIN_REGIME_SAMPLES || out_bucket.len() < MIN_REGIME_SAMPLES {
        return None;
    }

    let avg_in: f64 = in_bucket.iter().sum::<f64>() / in_bucket.len() as f64;
    let avg_out: f64 = out_bucket.iter().sum::<f64>() / out_bucket.len() as f64;

    if (avg_in - avg_out).abs() <= REGIME_GAP_PCT {
        return None;
    }

    let better = if avg_in > avg_out { regime_name } else { baseline_name };
    let high = avg_in.max(avg_out);
    let low = avg_in.min(avg_out);
    Some(format!(
        "Similar events performed better during {} environments ({:.1}% vs {:.1}% average returns).",
        better, high, low
    ))
}

/// Insight lines for the aggregate pattern: one per Moderate/Strong factor,
/// plus regime-bucket comparisons. When no factor clears the significance
/// bar a single disclaimer line is emitted instead.
pub fn macro_insights(
    correlations: &MacroCorrelations,
    points: &[MacroObservation],
) -> Vec<String> {
    let factors = [
        ("inflation (CPI)", &correlations.cpi),
        ("Federal Funds Rate", &correlations.fed_rate),
        ("unemployment rate", &correlations.unemployment),
        ("yield curve spread (10Y-2Y)", &correlations.yield_curve),
    ];

    if !factors.iter().any(|(_, c)| is_significant(c)) {
        return vec![
            "No significant correlations found between macro factors and market performance."
                .to_string(),
        ];
    }

    let mut insights = Vec::new();
    for (label, data) in factors {
        if is_significant(data) {
            insights.push(correlation_insight(label, data));
        }
    }

    if points.len() >= MIN_CORRELATION_SAMPLES {
        let buckets = [
            regime_insight(points, |p| p.cpi, |v| v > 3.0, "high inflation", "low inflation"),
            regime_insight(
                points,
                |p| p.fed_rate,
                |v| v > 3.0,
                "high interest rate",
                "low interest rate",
            ),
            regime_insight(
                points,
                |p| p.yield_curve,
                |v| v < 0.0,
                "inverted yield curve",
                "normal yield curve",
            ),
        ];
        insights.extend(buckets.into_iter().flatten());
    }

    insights
}
