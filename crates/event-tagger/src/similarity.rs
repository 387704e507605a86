//! Headline similarity and the bounded registry used for repeat-event
//! detection.

use std::collections::{BTreeSet, VecDeque};

use chrono::NaiveDate;

/// Registry capacity; oldest entries are evicted first.
const MAX_REGISTRY_SIZE: usize = 1000;

/// Events older than this many days never count as repeats.
const REPEAT_WINDOW_DAYS: i64 = 30;

/// Jaccard similarity above which two headlines describe the same event.
const REPEAT_SIMILARITY: f64 = 0.7;

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "as", "at", "by", "for", "in", "to", "with",
];

/// Content tokens of a headline: lowercased, digits and punctuation stripped,
/// stopwords and short words dropped.
pub fn tokenize(headline: &str) -> BTreeSet<String> {
    headline
        .split(|c: char| !c.is_alphabetic())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Jaccard similarity of two token sets. Empty sets never match anything.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

#[derive(Debug, Clone)]
struct SeenEvent {
    ticker: String,
    tokens: BTreeSet<String>,
    date: NaiveDate,
}

/// Bounded FIFO registry of recently seen events. An incoming event is a
/// repeat when, within the 30-day window, it shares a ticker with a prior
/// event or its headline tokens overlap heavily with one.
#[derive(Debug, Default)]
pub struct RepeatRegistry {
    events: VecDeque<SeenEvent>,
}

impl RepeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check against prior events, then record this one.
    pub fn check_and_record(&mut self, ticker: &str, headline: &str, date: NaiveDate) -> bool {
        let ticker = ticker.to_lowercase();
        let tokens = tokenize(headline);

        let repeat = self.events.iter().any(|seen| {
            let age = (date - seen.date).num_days();
            if !(0..=REPEAT_WINDOW_DAYS).contains(&age) {
                return false;
            }
            seen.ticker == ticker || jaccard(&seen.tokens, &tokens) > REPEAT_SIMILARITY
        });

        self.events.push_back(SeenEvent {
            ticker,
            tokens,
            date,
        });
        if self.events.len() > MAX_REGISTRY_SIZE {
            self.events.pop_front();
        }

        repeat
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
