use async_trait::async_trait;
use chrono::NaiveDate;
use event_core::EngineError;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// One rung of the macro acquisition cascade.
///
/// A source returns whatever indicators it can; absent keys are simply not
/// in the map, and the collector moves on to the next source for them.
#[async_trait]
pub trait MacroSource: Send + Sync {
    fn name(&self) -> &str;

    async fn try_fetch(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<HashMap<String, f64>, EngineError>;
}

/// FRED series IDs for each indicator we track
const FRED_SERIES: &[(&str, &str)] = &[
    ("CPI_YoY", "CPIAUCSL"),
    ("CPI_Expected", "EXPINF1YR"),
    ("FedFundsRate", "FEDFUNDS"),
    ("Unemployment", "UNRATE"),
    ("TenYearYield", "GS10"),
    ("TwoYearYield", "GS2"),
];

/// Live macro indicators from the FRED observations API
pub struct FredSource {
    api_key: String,
    client: Client,
}

impl FredSource {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    async fn fetch_series(
        &self,
        series_id: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Option<f64>, EngineError> {
        let url = "https://api.stlouisfed.org/fred/series/observations";
        let mut query: Vec<(&str, String)> = vec![
            ("series_id", series_id.to_string()),
            ("api_key", self.api_key.clone()),
            ("file_type", "json".to_string()),
            ("sort_order", "desc".to_string()),
            ("limit", "1".to_string()),
        ];
        if let Some(date) = as_of {
            query.push(("observation_end", date.format("%Y-%m-%d").to_string()));
        }

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| EngineError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::ApiError(format!(
                "FRED HTTP {} for {}",
                response.status(),
                series_id
            )));
        }

        let body: FredObservations = response
            .json()
            .await
            .map_err(|e| EngineError::ApiError(e.to_string()))?;

        // FRED encodes missing observations as "."
        Ok(body
            .observations
            .into_iter()
            .next()
            .and_then(|o| o.value.parse::<f64>().ok()))
    }
}

#[async_trait]
impl MacroSource for FredSource {
    fn name(&self) -> &str {
        "fred"
    }

    async fn try_fetch(
        &self,
        as_of: Option<NaiveDate>,
    ) -> Result<HashMap<String, f64>, EngineError> {
        let mut values = HashMap::new();
        for (key, series_id) in FRED_SERIES {
            match self.fetch_series(series_id, as_of).await {
                Ok(Some(value)) => {
                    values.insert(key.to_string(), value);
                }
                Ok(None) => {
                    tracing::warn!("Empty FRED series for {} ({})", key, series_id);
                }
                Err(e) => {
                    tracing::warn!("FRED fetch failed for {} ({}): {}", key, series_id, e);
                }
            }
        }
        if values.is_empty() {
            return Err(EngineError::NoData("FRED returned no indicators".to_string()));
        }
        Ok(values)
    }
}

#[derive(Deserialize)]
struct FredObservations {
    observations: Vec<FredObservation>,
}

#[derive(Deserialize)]
struct FredObservation {
    value: String,
}

/// Operator-maintained CSV fallback: a header row of indicator names and one
/// row of values.
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(content: &str) -> HashMap<String, f64> {
        let mut lines = content.lines();
        let (Some(header), Some(row)) = (lines.next(), lines.next()) else {
            return HashMap::new();
        };

        header
            .split(',')
            .zip(row.split(','))
            .filter_map(|(key, value)| {
                let key = key.trim();
                // Skip the date column and anything non-numeric
                value.trim().parse::<f64>().ok().map(|v| (key.to_string(), v))
            })
            .collect()
    }
}

#[async_trait]
impl MacroSource for CsvFileSource {
    fn name(&self) -> &str {
        "csv_fallback"
    }

    async fn try_fetch(
        &self,
        _as_of: Option<NaiveDate>,
    ) -> Result<HashMap<String, f64>, EngineError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| EngineError::NoData(format!("{}: {}", self.path.display(), e)))?;
        Ok(Self::parse(&content))
    }
}

/// Hardcoded last-resort values, refreshed occasionally by hand
pub struct StaticDefaults {
    values: HashMap<String, f64>,
}

impl StaticDefaults {
    pub fn new() -> Self {
        let values = [
            ("CPI_YoY", 3.5),
            ("CPI_Expected", 3.4),
            ("FedFundsRate", 5.33),
            ("Unemployment", 3.9),
            ("TenYearYield", 4.32),
            ("TwoYearYield", 4.72),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self { values }
    }
}

impl Default for StaticDefaults {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MacroSource for StaticDefaults {
    fn name(&self) -> &str {
        "hardcoded_fallback"
    }

    async fn try_fetch(
        &self,
        _as_of: Option<NaiveDate>,
    ) -> Result<HashMap<String, f64>, EngineError> {
        Ok(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parse_pairs_header_with_row() {
        let content = "Date,CPI_YoY,Unemployment\n2024-02-01,3.2,3.9\n";
        let parsed = CsvFileSource::parse(content);
        assert_eq!(parsed.get("CPI_YoY"), Some(&3.2));
        assert_eq!(parsed.get("Unemployment"), Some(&3.9));
        // Date column is non-numeric and dropped
        assert!(!parsed.contains_key("Date"));
    }

    #[test]
    fn csv_parse_handles_empty_file() {
        assert!(CsvFileSource::parse("").is_empty());
        assert!(CsvFileSource::parse("CPI_YoY\n").is_empty());
    }

    #[tokio::test]
    async fn static_defaults_cover_required_indicators() {
        let defaults = StaticDefaults::new();
        let values = defaults.try_fetch(None).await.unwrap();
        for key in crate::REQUIRED_INDICATORS {
            assert!(values.contains_key(*key), "missing default for {}", key);
        }
    }
}
