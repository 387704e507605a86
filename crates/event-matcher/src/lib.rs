pub mod impact;

use event_core::{ClassifiedEvent, EventMatch, HistoricalTemplate, TemplateStore};
use log::warn;

pub use impact::{ImpactAnalyzer, DEFAULT_ANALYSIS_DAYS};

/// Matches to return unless overridden
pub const DEFAULT_TOP_N: usize = 3;

/// Criterion weights: event type dominates, then sentiment, then sector
const EVENT_TYPE_WEIGHT: f64 = 0.5;
const SENTIMENT_WEIGHT: f64 = 0.3;
const SECTOR_WEIGHT: f64 = 0.2;

/// Weighted similarity between a classified event and a historical template.
///
/// Only sums of the three weights are reachable, so scores land in
/// {0, 0.2, 0.3, 0.5, 0.7, 0.8, 1.0}.
pub fn match_score(event: &ClassifiedEvent, template: &HistoricalTemplate) -> f64 {
    let mut score = 0.0;
    if event.event_type == template.event_type {
        score += EVENT_TYPE_WEIGHT;
    }
    if event.sentiment == template.sentiment {
        score += SENTIMENT_WEIGHT;
    }
    if event.sector == template.sector {
        score += SECTOR_WEIGHT;
    }
    score
}

/// Scores a classified event against the historical template library and
/// attaches realized market impact to the surviving matches.
pub struct MatchScorer {
    analyzer: ImpactAnalyzer,
    top_n: usize,
}

impl MatchScorer {
    pub fn new(analyzer: ImpactAnalyzer) -> Self {
        Self {
            analyzer,
            top_n: DEFAULT_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Rank templates by similarity, keep the top N with any similarity at
    /// all, and compute each one's post-event market impact.
    ///
    /// Ordering is deterministic: score descending, original template order
    /// for ties. Impact failures are per-match, never batch-fatal.
    pub async fn find_matches(
        &self,
        event: &ClassifiedEvent,
        store: &dyn TemplateStore,
    ) -> Vec<EventMatch> {
        let mut scored: Vec<(f64, &HistoricalTemplate)> = Vec::new();
        for template in store.templates() {
            if template.event_type.is_empty() || template.affected_ticker.is_empty() {
                warn!(
                    "Skipping malformed template '{}': missing event type or ticker",
                    template.event_summary
                );
                continue;
            }
            let score = match_score(event, template);
            if score > 0.0 {
                scored.push((score, template));
            }
        }

        // Stable sort keeps original template order within equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_n);

        let mut matches = Vec::with_capacity(scored.len());
        for (score, template) in scored {
            let impact = self
                .analyzer
                .analyze(&template.affected_ticker, template.event_date)
                .await;
            matches.push(EventMatch {
                template: template.clone(),
                match_score: (score * 100.0).round() / 100.0,
                impact,
            });
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use event_core::{
        Bar, EngineError, EventTags, ImpactStatus, InMemoryTemplateStore, MarketDataProvider,
        Sentiment,
    };
    use std::sync::Arc;

    fn event(event_type: &str, sentiment: Sentiment, sector: &str) -> ClassifiedEvent {
        ClassifiedEvent {
            headline: "test headline".to_string(),
            event_type: event_type.to_string(),
            sentiment,
            sector: sector.to_string(),
            tags: EventTags::default(),
            macro_snapshot: None,
            recommendation: None,
        }
    }

    fn template(
        summary: &str,
        event_type: &str,
        sentiment: Sentiment,
        sector: &str,
        ticker: &str,
    ) -> HistoricalTemplate {
        HistoricalTemplate {
            event_summary: summary.to_string(),
            event_date: NaiveDate::from_ymd_opt(2023, 9, 20).unwrap(),
            affected_ticker: ticker.to_string(),
            event_type: event_type.to_string(),
            sentiment,
            sector: sector.to_string(),
        }
    }

    /// Provider that fails for tickers in its deny list
    struct SelectiveProvider {
        failing_ticker: String,
    }

    #[async_trait]
    impl MarketDataProvider for SelectiveProvider {
        async fn fetch_series(
            &self,
            ticker: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Bar>, EngineError> {
            if ticker == self.failing_ticker {
                return Err(EngineError::ApiError("simulated outage".to_string()));
            }
            Ok(crate::impact::tests::bars_from_closes(
                start,
                &[100.0, 101.0, 99.0, 102.0, 103.0, 104.0, 105.0],
            ))
        }

        async fn current_price(&self, _ticker: &str) -> Result<f64, EngineError> {
            Ok(100.0)
        }

        async fn list_expiries(&self, _ticker: &str) -> Result<Vec<NaiveDate>, EngineError> {
            Ok(Vec::new())
        }
    }

    fn scorer(failing_ticker: &str) -> MatchScorer {
        let provider = Arc::new(SelectiveProvider {
            failing_ticker: failing_ticker.to_string(),
        });
        MatchScorer::new(ImpactAnalyzer::new(provider))
    }

    #[test]
    fn score_is_a_weight_sum() {
        let e = event("Monetary Policy", Sentiment::Bullish, "Financials");
        let reachable = [0.0, 0.2, 0.3, 0.5, 0.7, 0.8, 1.0];

        let cases = [
            template("full", "Monetary Policy", Sentiment::Bullish, "Financials", "SPY"),
            template("type+sent", "Monetary Policy", Sentiment::Bullish, "Tech", "SPY"),
            template("type+sector", "Monetary Policy", Sentiment::Bearish, "Financials", "SPY"),
            template("type only", "Monetary Policy", Sentiment::Bearish, "Tech", "SPY"),
            template("sent+sector", "Earnings", Sentiment::Bullish, "Financials", "SPY"),
            template("sector only", "Earnings", Sentiment::Bearish, "Financials", "SPY"),
            template("nothing", "Earnings", Sentiment::Bearish, "Tech", "SPY"),
        ];
        for t in &cases {
            let s = match_score(&e, t);
            assert!(s >= 0.0);
            assert!(
                reachable.iter().any(|r| (s - r).abs() < 1e-9),
                "unreachable score {} for '{}'",
                s,
                t.event_summary
            );
        }
        assert!((match_score(&e, &cases[0]) - 1.0).abs() < 1e-9);
        assert!((match_score(&e, &cases[3]) - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn ranking_is_deterministic_and_bounded() {
        let e = event("Monetary Policy", Sentiment::Bullish, "Financials");
        let store = InMemoryTemplateStore::new(vec![
            template("a", "Earnings", Sentiment::Bullish, "Financials", "SPY"),
            template("b", "Monetary Policy", Sentiment::Bullish, "Financials", "SPY"),
            template("c", "Monetary Policy", Sentiment::Bearish, "Tech", "SPY"),
            template("d", "Earnings", Sentiment::Bullish, "Financials", "QQQ"),
            template("e", "Unrelated", Sentiment::Bearish, "Energy", "SPY"),
        ]);

        let s = scorer("NONE");
        let first = s.find_matches(&e, &store).await;
        let second = s.find_matches(&e, &store).await;

        assert_eq!(first.len(), 3);
        // Perfect match first, then the two 0.5-scored templates in
        // original order
        assert_eq!(first[0].template.event_summary, "b");
        assert_eq!(first[1].template.event_summary, "a");
        assert_eq!(first[2].template.event_summary, "d");

        let order = |ms: &[EventMatch]| {
            ms.iter()
                .map(|m| m.template.event_summary.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(order(&first), order(&second));
    }

    #[tokio::test]
    async fn zero_score_templates_are_discarded() {
        let e = event("Monetary Policy", Sentiment::Bullish, "Financials");
        let store = InMemoryTemplateStore::new(vec![template(
            "no overlap",
            "Earnings",
            Sentiment::Bearish,
            "Tech",
            "SPY",
        )]);
        let matches = scorer("NONE").find_matches(&e, &store).await;
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn impact_failure_keeps_the_match() {
        let e = event("Monetary Policy", Sentiment::Bullish, "Financials");
        let store = InMemoryTemplateStore::new(vec![
            template("healthy", "Monetary Policy", Sentiment::Bullish, "Financials", "SPY"),
            template("broken", "Monetary Policy", Sentiment::Bullish, "Financials", "XBAD"),
        ]);

        let matches = scorer("XBAD").find_matches(&e, &store).await;
        assert_eq!(matches.len(), 2);
        assert!(matches[0].impact.as_analyzed().is_some());
        assert!(matches!(matches[1].impact, ImpactStatus::Unavailable { .. }));
    }

    #[tokio::test]
    async fn malformed_templates_are_skipped() {
        let e = event("Monetary Policy", Sentiment::Bullish, "Financials");
        let mut bad = template("no ticker", "Monetary Policy", Sentiment::Bullish, "Financials", "");
        bad.affected_ticker.clear();
        let store = InMemoryTemplateStore::new(vec![
            bad,
            template("ok", "Monetary Policy", Sentiment::Bullish, "Financials", "SPY"),
        ]);

        let matches = scorer("NONE").find_matches(&e, &store).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].template.event_summary, "ok");
    }
}
