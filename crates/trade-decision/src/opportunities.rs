//! Bounded per-horizon book of the best current trade opportunities.
//!
//! Updated by a periodic background scan and read by display/alert paths, so
//! all access goes through one mutex. Inserts are pure in-memory
//! read-modify-write; callers must finish scoring and idea generation before
//! touching the book.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use event_core::TradeIdea;

/// Maximum opportunities retained per horizon bucket.
pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Short,
    Medium,
    Long,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Short, Horizon::Medium, Horizon::Long];

    fn index(self) -> usize {
        match self {
            Horizon::Short => 0,
            Horizon::Medium => 1,
            Horizon::Long => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Bucket a match score; scores below the low bar produce no opportunity.
    pub fn from_score(score: f64) -> Option<Self> {
        if score >= 0.8 {
            Some(Priority::High)
        } else if score >= 0.6 {
            Some(Priority::Medium)
        } else if score >= 0.4 {
            Some(Priority::Low)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Opportunity {
    pub idea: TradeIdea,
    pub match_score: f64,
    pub priority: Priority,
    pub recorded_at: DateTime<Utc>,
}

/// Fixed-capacity opportunity buckets, one per horizon, best-first.
pub struct OpportunityBook {
    capacity: usize,
    buckets: Mutex<[Vec<Opportunity>; 3]>,
}

impl Default for OpportunityBook {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl OpportunityBook {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buckets: Mutex::new(Default::default()),
        }
    }

    /// Merge a scan's findings into one horizon bucket, keeping only the
    /// best `capacity` entries by priority then match score.
    pub fn merge(&self, horizon: Horizon, incoming: Vec<Opportunity>) {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = &mut buckets[horizon.index()];
        bucket.extend(incoming);
        bucket.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.match_score.total_cmp(&a.match_score))
        });
        bucket.truncate(self.capacity);
    }

    pub fn record(&self, horizon: Horizon, opportunity: Opportunity) {
        self.merge(horizon, vec![opportunity]);
    }

    /// Clone out one horizon's entries, best first.
    pub fn snapshot(&self, horizon: Horizon) -> Vec<Opportunity> {
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets[horizon.index()].clone()
    }

    pub fn len(&self, horizon: Horizon) -> usize {
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets[horizon.index()].len()
    }

    pub fn is_empty(&self, horizon: Horizon) -> bool {
        self.len(horizon) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_core::{TradeDirection, TradeType};

    fn opportunity(ticker: &str, score: f64) -> Opportunity {
        Opportunity {
            idea: TradeIdea {
                ticker: ticker.to_string(),
                trade_type: TradeType::Equity,
                direction: TradeDirection::Buy,
                option_type: None,
                strike: None,
                expiry: None,
                rationale: String::new(),
            },
            match_score: score,
            priority: Priority::from_score(score).unwrap(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn priority_thresholds() {
        assert_eq!(Priority::from_score(0.85), Some(Priority::High));
        assert_eq!(Priority::from_score(0.8), Some(Priority::High));
        assert_eq!(Priority::from_score(0.65), Some(Priority::Medium));
        assert_eq!(Priority::from_score(0.45), Some(Priority::Low));
        assert_eq!(Priority::from_score(0.3), None);
    }

    #[test]
    fn book_keeps_best_entries_within_capacity() {
        let book = OpportunityBook::new(2);
        book.record(Horizon::Short, opportunity("A", 0.5));
        book.record(Horizon::Short, opportunity("B", 0.9));
        book.record(Horizon::Short, opportunity("C", 0.7));

        let entries = book.snapshot(Horizon::Short);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].idea.ticker, "B");
        assert_eq!(entries[1].idea.ticker, "C");
    }

    #[test]
    fn horizons_are_independent() {
        let book = OpportunityBook::default();
        book.record(Horizon::Short, opportunity("A", 0.9));
        assert_eq!(book.len(Horizon::Short), 1);
        assert!(book.is_empty(Horizon::Medium));
        assert!(book.is_empty(Horizon::Long));
    }

    #[test]
    fn priority_outranks_raw_score() {
        let book = OpportunityBook::new(3);
        book.merge(
            Horizon::Medium,
            vec![
                opportunity("LOW", 0.59),
                opportunity("HIGH", 0.81),
                opportunity("MID", 0.79),
            ],
        );
        let entries = book.snapshot(Horizon::Medium);
        assert_eq!(entries[0].idea.ticker, "HIGH");
        assert_eq!(entries[1].idea.ticker, "MID");
        assert_eq!(entries[2].idea.ticker, "LOW");
    }
}
