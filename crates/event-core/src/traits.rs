use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{Bar, EngineError, HistoricalTemplate, MacroSnapshot};

/// Daily price series, spot price, and option expiries for a ticker
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch daily bars for `[start, end]` inclusive; may return an empty
    /// series when the ticker or range has no data.
    async fn fetch_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError>;

    async fn current_price(&self, ticker: &str) -> Result<f64, EngineError>;

    /// Available option expiry dates, ascending. Empty when the ticker has
    /// no listed options.
    async fn list_expiries(&self, ticker: &str) -> Result<Vec<NaiveDate>, EngineError>;
}

/// Macro indicator snapshot for "now" or a historical date
#[async_trait]
pub trait MacroDataProvider: Send + Sync {
    async fn snapshot(&self, as_of: Option<NaiveDate>) -> Result<MacroSnapshot, EngineError>;
}

/// Read-only collection of historical event templates
pub trait TemplateStore: Send + Sync {
    fn templates(&self) -> &[HistoricalTemplate];
}

/// In-memory template store, typically deserialized once per run
pub struct InMemoryTemplateStore {
    templates: Vec<HistoricalTemplate>,
}

impl InMemoryTemplateStore {
    pub fn new(templates: Vec<HistoricalTemplate>) -> Self {
        Self { templates }
    }

    /// Load templates from a JSON array file
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let templates: Vec<HistoricalTemplate> = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidData(format!("template JSON: {}", e)))?;
        Ok(Self::new(templates))
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn templates(&self) -> &[HistoricalTemplate] {
        &self.templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_store_loads_json() {
        let json = r#"[
            {
                "event_summary": "Fed pauses rate hikes",
                "event_date": "2023-09-20",
                "affected_ticker": "SPY",
                "event_type": "Monetary Policy",
                "sentiment": "Bullish",
                "sector": "Financials"
            }
        ]"#;
        let store = InMemoryTemplateStore::from_json(json).unwrap();
        assert_eq!(store.templates().len(), 1);
        assert_eq!(store.templates()[0].affected_ticker, "SPY");
    }

    #[test]
    fn template_store_rejects_malformed_json() {
        assert!(InMemoryTemplateStore::from_json("{not json").is_err());
    }
}
