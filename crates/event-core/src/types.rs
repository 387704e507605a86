use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily OHLCV bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Directional sentiment attached to a classified event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn name(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "Bullish",
            Sentiment::Bearish => "Bearish",
            Sentiment::Neutral => "Neutral",
        }
    }
}

/// Boolean context tags for an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTags {
    pub is_fed_week: bool,
    pub is_cpi_week: bool,
    pub is_earnings_season: bool,
    pub is_repeat_event: bool,
    pub surprise_positive: bool,
}

/// Snapshot of macroeconomic indicators at a point in time.
///
/// Field names follow the indicator names used by the macro provider
/// (e.g. `CPI_YoY`, `CPI_Expected`, `FedFundsRate`). `sources` records which
/// acquisition source satisfied each field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroSnapshot {
    pub values: BTreeMap<String, f64>,
    pub as_of: Option<NaiveDate>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
    /// Share of fields backed by live data rather than fallbacks (0-100)
    #[serde(default)]
    pub live_percentage: f64,
}

impl MacroSnapshot {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn cpi_yoy(&self) -> Option<f64> {
        self.get("CPI_YoY")
    }

    pub fn cpi_expected(&self) -> Option<f64> {
        self.get("CPI_Expected")
    }

    pub fn fed_funds_rate(&self) -> Option<f64> {
        self.get("FedFundsRate")
    }

    pub fn unemployment(&self) -> Option<f64> {
        self.get("Unemployment")
    }

    pub fn ten_year_yield(&self) -> Option<f64> {
        self.get("TenYearYield")
    }

    pub fn two_year_yield(&self) -> Option<f64> {
        self.get("TwoYearYield")
    }

    /// 10Y minus 2Y treasury spread, when both tenors are present
    pub fn yield_curve_spread(&self) -> Option<f64> {
        match (self.ten_year_yield(), self.two_year_yield()) {
            (Some(ten), Some(two)) => Some(ten - two),
            _ => None,
        }
    }

    /// Short tenor yielding more than long tenor
    pub fn is_curve_inverted(&self) -> bool {
        self.yield_curve_spread().map(|s| s < 0.0).unwrap_or(false)
    }
}

/// External directional recommendation attached to a classified event.
///
/// Upstream classifiers sometimes emit a structured direction and sometimes
/// free text; callers normalize to `Structured` at the boundary so nothing
/// downstream branches on shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TradeRecommendation {
    Structured { direction: TradeDirection },
    Freeform(String),
}

impl TradeRecommendation {
    /// Resolve to a concrete direction, parsing freeform text if needed.
    pub fn direction(&self) -> Option<TradeDirection> {
        match self {
            TradeRecommendation::Structured { direction } => Some(*direction),
            TradeRecommendation::Freeform(text) => {
                let upper = text.to_uppercase();
                if upper.contains("BUY") && !upper.contains("SELL") {
                    Some(TradeDirection::Buy)
                } else if upper.contains("SELL") && !upper.contains("BUY") {
                    Some(TradeDirection::Sell)
                } else {
                    None
                }
            }
        }
    }
}

/// A news event after classification by the upstream language-model service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    pub headline: String,
    pub event_type: String,
    pub sentiment: Sentiment,
    pub sector: String,
    #[serde(default)]
    pub tags: EventTags,
    #[serde(default)]
    pub macro_snapshot: Option<MacroSnapshot>,
    /// Optional directional recommendation from the classifier
    #[serde(default)]
    pub recommendation: Option<TradeRecommendation>,
}

/// Historical market-moving event template, loaded read-only from the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalTemplate {
    pub event_summary: String,
    pub event_date: NaiveDate,
    pub affected_ticker: String,
    pub event_type: String,
    pub sentiment: Sentiment,
    pub sector: String,
}

/// Price extremes and endpoints over the fetched window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSummary {
    pub start_price: f64,
    pub end_price: f64,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub trading_days: usize,
}

/// Realized market impact over the analyzed post-event window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketImpact {
    /// Signed move from first to last close, percent
    pub price_change_pct: f64,
    /// Peak-to-trough drawdown within the window, percent (always <= 0)
    pub max_drawdown_pct: f64,
    pub date_range: (NaiveDate, NaiveDate),
    pub price_data: PriceSummary,
}

/// Per-template impact result: analysis failures keep the match alive
/// with the impact explicitly marked unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImpactStatus {
    Analyzed(MarketImpact),
    Unavailable { reason: String },
}

impl ImpactStatus {
    pub fn as_analyzed(&self) -> Option<&MarketImpact> {
        match self {
            ImpactStatus::Analyzed(impact) => Some(impact),
            ImpactStatus::Unavailable { .. } => None,
        }
    }

    pub fn price_change_pct(&self) -> Option<f64> {
        self.as_analyzed().map(|i| i.price_change_pct)
    }

    pub fn max_drawdown_pct(&self) -> Option<f64> {
        self.as_analyzed().map(|i| i.max_drawdown_pct)
    }
}

/// A historical template matched against the current event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMatch {
    pub template: HistoricalTemplate,
    /// Weighted similarity in [0, 1], rounded to 2 decimals
    pub match_score: f64,
    pub impact: ImpactStatus,
}

/// Five-point bipolar sentiment label used by the alignment analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    VeryBullish,
    Bullish,
    Neutral,
    Bearish,
    VeryBearish,
}

impl SentimentLabel {
    /// Position on the bipolar scale: +2 (very bullish) .. -2 (very bearish)
    pub fn scale_value(&self) -> i32 {
        match self {
            SentimentLabel::VeryBullish => 2,
            SentimentLabel::Bullish => 1,
            SentimentLabel::Neutral => 0,
            SentimentLabel::Bearish => -1,
            SentimentLabel::VeryBearish => -2,
        }
    }

    /// Convert a numeric sentiment score (-1.0 to 1.0) to a label
    pub fn from_score(score: f64) -> Self {
        if score >= 0.6 {
            SentimentLabel::VeryBullish
        } else if score >= 0.2 {
            SentimentLabel::Bullish
        } else if score >= -0.2 {
            SentimentLabel::Neutral
        } else if score >= -0.6 {
            SentimentLabel::Bearish
        } else {
            SentimentLabel::VeryBearish
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SentimentLabel::VeryBullish => "Very Bullish",
            SentimentLabel::Bullish => "Bullish",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Bearish => "Bearish",
            SentimentLabel::VeryBearish => "Very Bearish",
        }
    }
}

/// Comparison between a price-derived sentiment label and an independently
/// retrieved historical label for the same event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentComparison {
    pub classified: SentimentLabel,
    pub historical: SentimentLabel,
    /// 1 - |delta| / max_delta over the five-point scale
    pub agreement: f64,
}

/// Equity or option instrument for a trade idea
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Equity,
    Option,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    pub fn name(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "BUY",
            TradeDirection::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn name(&self) -> &'static str {
        match self {
            OptionType::Call => "CALL",
            OptionType::Put => "PUT",
        }
    }
}

/// Concrete trade instruction emitted by the decision engine.
///
/// Strike, expiry, and option_type are null for equity trades and when the
/// engine fails closed on a missing current price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeIdea {
    pub ticker: String,
    pub trade_type: TradeType,
    pub direction: TradeDirection,
    pub option_type: Option<OptionType>,
    pub strike: Option<f64>,
    pub expiry: Option<NaiveDate>,
    pub rationale: String,
}

/// Realized outcome of a previously issued trade idea
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvaluation {
    pub actual_move_pct: f64,
    pub max_gain_pct: f64,
    pub max_drawdown_pct: f64,
    pub trade_direction_correct: bool,
    pub notes: String,
    pub evaluated_days: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Strength classification for a factor correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationStrength {
    None,
    Negligible,
    Weak,
    Moderate,
    Strong,
}

impl CorrelationStrength {
    /// Classify an absolute Pearson coefficient
    pub fn from_abs(r: f64) -> Self {
        if r >= 0.7 {
            CorrelationStrength::Strong
        } else if r >= 0.5 {
            CorrelationStrength::Moderate
        } else if r >= 0.3 {
            CorrelationStrength::Weak
        } else {
            CorrelationStrength::Negligible
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CorrelationStrength::None => "None",
            CorrelationStrength::Negligible => "Negligible",
            CorrelationStrength::Weak => "Weak",
            CorrelationStrength::Moderate => "Moderate",
            CorrelationStrength::Strong => "Strong",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationDirection {
    Positive,
    Negative,
}

/// Pearson correlation of one macro factor against match outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorCorrelation {
    pub correlation: f64,
    pub strength: CorrelationStrength,
    pub direction: Option<CorrelationDirection>,
    pub sample_size: usize,
}

impl FactorCorrelation {
    /// Guard value emitted when fewer than 3 valid pairs exist
    pub fn insufficient(sample_size: usize) -> Self {
        Self {
            correlation: 0.0,
            strength: CorrelationStrength::None,
            direction: None,
            sample_size,
        }
    }
}

/// Per-factor correlation results over the canonical macro factors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroCorrelations {
    pub cpi: FactorCorrelation,
    pub fed_rate: FactorCorrelation,
    pub unemployment: FactorCorrelation,
    pub yield_curve: FactorCorrelation,
}

/// Aggregate statistical pattern over a set of matches.
///
/// Fully recomputed on every call; macro and sentiment sections are additive
/// and absent when their sample-size guards are not met.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatePattern {
    pub pattern_summary: String,
    /// Share of matches agreeing on price-direction sign (0-100)
    pub consistency_score: f64,
    pub avg_price_change_pct: f64,
    pub avg_max_drawdown_pct: f64,
    pub bullish_count: usize,
    pub bearish_count: usize,
    pub dominant_sector: String,
    pub dominant_ticker: String,
    pub matches_analyzed: usize,
    #[serde(default)]
    pub macro_correlations: Option<MacroCorrelations>,
    #[serde(default)]
    pub macro_insights: Vec<String>,
    #[serde(default)]
    pub sentiment_alignment_pct: Option<f64>,
    #[serde(default)]
    pub sentiment_insights: Vec<String>,
}
