pub mod normalize;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use event_core::{Bar, EngineError, MarketDataProvider, TtlCache};
use reqwest::Client;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub use normalize::normalize_ticker;

const BASE_URL: &str = "https://api.polygon.io";

/// Expiry lists change rarely; cache them briefly to avoid hammering the
/// reference endpoint during batch scans.
const EXPIRY_CACHE_TTL: Duration = Duration::from_secs(300);

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let wait_until = ts.front().copied().map(|f| f + self.window).unwrap_or(now);
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for market API slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// REST client for the market-data provider.
///
/// Handles rate limiting, 429 retries, and crypto ticker normalization so
/// callers work with plain symbols.
pub struct MarketClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
    expiry_cache: TtlCache<String, Vec<NaiveDate>>,
}

impl MarketClient {
    pub fn new(api_key: String) -> Self {
        // Default 500 req/min. Free-tier users should set MARKET_RATE_LIMIT=5.
        let rate_limit: usize = std::env::var("MARKET_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(500);

        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            expiry_cache: TtlCache::new(),
        }
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, EngineError> {
        let request = builder
            .build()
            .map_err(|e| EngineError::ApiError(e.to_string()))?;

        for attempt in 0..3u32 {
            self.rate_limiter.acquire().await;
            let req_clone = request
                .try_clone()
                .ok_or_else(|| EngineError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| EngineError::ApiError(e.to_string()))?;

            if response.status().as_u16() != 429 {
                return Ok(response);
            }

            let wait_secs = 15u64;
            tracing::warn!(
                "Market API 429 rate limited, waiting {}s before retry {}/3",
                wait_secs,
                attempt + 1
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(EngineError::ApiError(
            "Rate limited by market API after 3 retries".to_string(),
        ))
    }
}

#[async_trait]
impl MarketDataProvider for MarketClient {
    async fn fetch_series(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, EngineError> {
        let symbol = normalize_ticker(ticker);
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            BASE_URL,
            symbol,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("apiKey", self.api_key.as_str()),
                ("adjusted", "true"),
                ("sort", "asc"),
            ]))
            .await?;

        if !response.status().is_success() {
            return Err(EngineError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let agg: AggregateResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ApiError(e.to_string()))?;

        // Missing results means a valid ticker with no bars in range;
        // callers treat the empty series as no-data, not an error.
        Ok(agg
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| {
                DateTime::from_timestamp_millis(r.t).map(|timestamp| Bar {
                    timestamp,
                    open: r.o,
                    high: r.h,
                    low: r.l,
                    close: r.c,
                    volume: r.v,
                })
            })
            .collect())
    }

    async fn current_price(&self, ticker: &str) -> Result<f64, EngineError> {
        let symbol = normalize_ticker(ticker);
        let url = format!("{}/v2/aggs/ticker/{}/prev", BASE_URL, symbol);

        let response = self
            .send_request(
                self.client
                    .get(&url)
                    .query(&[("apiKey", self.api_key.as_str()), ("adjusted", "true")]),
            )
            .await?;

        if !response.status().is_success() {
            return Err(EngineError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let agg: AggregateResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ApiError(e.to_string()))?;

        agg.results
            .unwrap_or_default()
            .first()
            .map(|r| r.c)
            .ok_or_else(|| EngineError::NoData(format!("No price data for {}", symbol)))
    }

    async fn list_expiries(&self, ticker: &str) -> Result<Vec<NaiveDate>, EngineError> {
        let symbol = normalize_ticker(ticker);

        if let Some(cached) = self.expiry_cache.get(&symbol, EXPIRY_CACHE_TTL) {
            return Ok(cached);
        }

        let url = format!("{}/v3/reference/options/contracts", BASE_URL);
        let response = self
            .send_request(self.client.get(&url).query(&[
                ("underlying_ticker", symbol.as_str()),
                ("apiKey", self.api_key.as_str()),
                ("limit", "1000"),
                ("sort", "expiration_date"),
            ]))
            .await?;

        if !response.status().is_success() {
            // Some plans have no options entitlement; report no expiries
            // rather than failing the whole trade decision.
            if matches!(response.status().as_u16(), 401 | 403) {
                return Ok(Vec::new());
            }
            return Err(EngineError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let contracts: ContractsResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ApiError(e.to_string()))?;

        let mut expiries: Vec<NaiveDate> = contracts
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| NaiveDate::parse_from_str(&c.expiration_date, "%Y-%m-%d").ok())
            .collect();
        expiries.sort();
        expiries.dedup();

        self.expiry_cache.insert(symbol, expiries.clone());
        Ok(expiries)
    }
}

#[derive(Deserialize)]
struct AggregateResponse {
    results: Option<Vec<AggregateBar>>,
}

#[derive(Deserialize)]
struct AggregateBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

#[derive(Deserialize)]
struct ContractsResponse {
    results: Option<Vec<OptionContract>>,
}

#[derive(Deserialize)]
struct OptionContract {
    expiration_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_response_tolerates_missing_results() {
        let parsed: AggregateResponse =
            serde_json::from_str(r#"{"status": "OK", "resultsCount": 0}"#).unwrap();
        assert!(parsed.results.is_none());
    }

    #[test]
    fn aggregate_bar_parses_provider_shape() {
        let parsed: AggregateResponse = serde_json::from_str(
            r#"{"results": [{"t": 1700000000000, "o": 100.0, "h": 103.0, "l": 99.0, "c": 102.0, "v": 5000000.0}]}"#,
        )
        .unwrap();
        let bars = parsed.results.unwrap();
        assert_eq!(bars.len(), 1);
        assert!((bars[0].c - 102.0).abs() < 1e-9);
    }
}
