pub mod sources;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use event_core::{EngineError, MacroDataProvider, MacroSnapshot, TtlCache};
use std::collections::BTreeMap;
use std::time::Duration;

pub use sources::{CsvFileSource, FredSource, MacroSource, StaticDefaults};

/// Indicators every snapshot must carry, one way or another
pub const REQUIRED_INDICATORS: &[&str] = &[
    "CPI_YoY",
    "CPI_Expected",
    "FedFundsRate",
    "Unemployment",
    "TenYearYield",
    "TwoYearYield",
];

const SNAPSHOT_CACHE_TTL: Duration = Duration::from_secs(4 * 3600);

/// Macro snapshot collector running an ordered source cascade.
///
/// Sources are tried in order; each fills only the indicators still missing,
/// and the satisfying source is recorded per field. Later sources never
/// overwrite earlier ones, so live data always wins over fallbacks.
pub struct MacroCollector {
    sources: Vec<Box<dyn MacroSource>>,
    cache: TtlCache<String, MacroSnapshot>,
}

impl MacroCollector {
    pub fn new(sources: Vec<Box<dyn MacroSource>>) -> Self {
        Self {
            sources,
            cache: TtlCache::new(),
        }
    }

    /// Default cascade: live FRED, then the local CSV file, then static
    /// defaults as the last resort.
    pub fn with_default_sources() -> Self {
        let _ = dotenvy::dotenv();
        let mut sources: Vec<Box<dyn MacroSource>> = Vec::new();
        if let Ok(api_key) = std::env::var("FRED_API_KEY") {
            sources.push(Box::new(FredSource::new(api_key)));
        } else {
            tracing::warn!("FRED_API_KEY not set; macro snapshots will rely on fallbacks");
        }
        sources.push(Box::new(CsvFileSource::new("data/latest_macro_snapshot.csv")));
        sources.push(Box::new(StaticDefaults::new()));
        Self::new(sources)
    }

    async fn collect(&self, as_of: Option<NaiveDate>) -> MacroSnapshot {
        let mut values: BTreeMap<String, f64> = BTreeMap::new();
        let mut field_sources: BTreeMap<String, String> = BTreeMap::new();

        for source in &self.sources {
            let missing: Vec<&str> = REQUIRED_INDICATORS
                .iter()
                .copied()
                .filter(|k| !values.contains_key(*k))
                .collect();
            if missing.is_empty() {
                break;
            }

            match source.try_fetch(as_of).await {
                Ok(fetched) => {
                    let mut filled = 0usize;
                    for (key, value) in fetched {
                        if !values.contains_key(&key) {
                            field_sources.insert(key.clone(), source.name().to_string());
                            values.insert(key, value);
                            filled += 1;
                        }
                    }
                    if filled > 0 {
                        tracing::info!(
                            "Macro source '{}' supplied {} indicators",
                            source.name(),
                            filled
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("Macro source '{}' failed: {}", source.name(), e);
                }
            }
        }

        let live_percentage = live_percentage(&field_sources);
        MacroSnapshot {
            values,
            as_of,
            fetched_at: Utc::now(),
            sources: field_sources,
            live_percentage,
        }
    }
}

#[async_trait]
impl MacroDataProvider for MacroCollector {
    async fn snapshot(&self, as_of: Option<NaiveDate>) -> Result<MacroSnapshot, EngineError> {
        let cache_key = as_of
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "latest".to_string());

        if let Some(cached) = self.cache.get(&cache_key, SNAPSHOT_CACHE_TTL) {
            return Ok(cached);
        }

        let snapshot = self.collect(as_of).await;
        if snapshot.values.is_empty() {
            return Err(EngineError::NoData(
                "No macro source produced any indicators".to_string(),
            ));
        }

        // Pure-fallback snapshots are not worth caching; a later call may
        // find the live source recovered.
        if snapshot.live_percentage > 0.0 {
            self.cache.insert(cache_key, snapshot.clone());
        }
        Ok(snapshot)
    }
}

/// Share of fields served by a live source rather than a fallback (0-100)
fn live_percentage(field_sources: &BTreeMap<String, String>) -> f64 {
    if field_sources.is_empty() {
        return 0.0;
    }
    let live = field_sources
        .values()
        .filter(|s| s.as_str() == "fred")
        .count();
    (live as f64 / field_sources.len() as f64) * 100.0
}
