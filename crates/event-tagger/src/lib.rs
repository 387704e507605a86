//! Generates boolean context tags for classified events when the upstream
//! classifier omits them: surprise direction, Fed/CPI week, earnings season,
//! and repeat-event detection.

pub mod calendar;
pub mod similarity;

use chrono::NaiveDate;
use event_core::{EventTags, MacroSnapshot};

pub use calendar::{is_earnings_season, is_fed_week};
pub use similarity::{jaccard, tokenize, RepeatRegistry};

const POSITIVE_SURPRISE_KEYWORDS: &[&str] = &[
    "beat",
    "beats",
    "exceeds",
    "exceeded",
    "higher than expected",
    "better than expected",
    "surprise",
    "surprised",
    "surprising",
    "outperform",
    "outperformed",
    "outperforms",
    "above expectations",
    "positive surprise",
    "strong",
    "stronger",
    "strongest",
    "record",
    "surge",
    "surged",
    "surges",
    "jump",
    "jumped",
    "jumps",
    "rally",
    "rallied",
    "rallies",
];

const NEGATIVE_SURPRISE_KEYWORDS: &[&str] = &[
    "miss",
    "misses",
    "missed",
    "below",
    "lower than expected",
    "worse than expected",
    "disappoint",
    "disappoints",
    "disappointed",
    "disappointing",
    "underperform",
    "underperformed",
    "underperforms",
    "below expectations",
    "negative surprise",
    "weak",
    "weaker",
    "weakest",
    "drop",
    "dropped",
    "drops",
    "fall",
    "fell",
    "falls",
    "plunge",
    "plunged",
    "plunges",
    "slump",
    "slumped",
    "slumps",
    "tank",
    "tanked",
    "tanks",
];

fn keyword_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|k| text.contains(*k)).count()
}

/// Keyword-balance surprise call, overridden by CPI expectation data when
/// the headline is about inflation. Higher-than-expected CPI reads negative
/// for markets, lower-than-expected positive.
pub fn surprise_positive(headline: &str, snapshot: Option<&MacroSnapshot>) -> bool {
    let text = headline.to_lowercase();

    let positive = keyword_hits(&text, POSITIVE_SURPRISE_KEYWORDS);
    let negative = keyword_hits(&text, NEGATIVE_SURPRISE_KEYWORDS);
    let mut surprise = positive > 0 && (negative == 0 || positive > negative);

    if text.contains("cpi") {
        if let Some(snapshot) = snapshot {
            if let (Some(actual), Some(expected)) = (snapshot.cpi_yoy(), snapshot.cpi_expected()) {
                if actual > expected {
                    surprise = false;
                } else if actual < expected {
                    surprise = true;
                }
            }
        }
    }

    surprise
}

/// CPI week: the headline is about inflation and a CPI reading is in hand.
pub fn is_cpi_week(headline: &str, snapshot: Option<&MacroSnapshot>) -> bool {
    headline.to_lowercase().contains("cpi")
        && snapshot.map(|s| s.cpi_yoy().is_some()).unwrap_or(false)
}

/// Stateful tagger; owns the repeat-event registry.
#[derive(Debug, Default)]
pub struct EventTagger {
    registry: RepeatRegistry,
}

impl EventTagger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the full tag set for one event. Records the event in the
    /// repeat registry as a side effect.
    pub fn generate_tags(
        &mut self,
        headline: &str,
        snapshot: Option<&MacroSnapshot>,
        event_date: NaiveDate,
        ticker: &str,
    ) -> EventTags {
        let tags = EventTags {
            surprise_positive: surprise_positive(headline, snapshot),
            is_fed_week: is_fed_week(event_date),
            is_cpi_week: is_cpi_week(headline, snapshot),
            is_earnings_season: is_earnings_season(event_date),
            is_repeat_event: self.registry.check_and_record(ticker, headline, event_date),
        };
        log::debug!("tags for {ticker} on {event_date}: {tags:?}");
        tags
    }
}
