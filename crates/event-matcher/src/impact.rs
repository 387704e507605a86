use chrono::{Duration as ChronoDuration, NaiveDate};
use event_core::{Bar, ImpactStatus, MarketDataProvider, MarketImpact, PriceSummary};
use log::warn;
use std::sync::Arc;
use std::time::Duration;

/// Trading days analyzed after an event, unless overridden
pub const DEFAULT_ANALYSIS_DAYS: usize = 7;

/// Per-call ceiling on the market-data fetch; a timeout is treated the same
/// as an empty series.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Overall close-to-close change and peak-to-trough drawdown for a closing
/// price sequence, both in signed percent. None when fewer than 2 closes.
pub fn price_movement(closes: &[f64]) -> Option<(f64, f64)> {
    if closes.len() < 2 {
        return None;
    }

    let first = closes[0];
    let last = closes[closes.len() - 1];
    let change_pct = (last / first - 1.0) * 100.0;

    // Walk forward tracking the running peak; drawdown is the worst
    // close-relative-to-peak seen, never positive.
    let mut peak = closes[0];
    let mut max_drawdown = 0.0f64;
    for &close in &closes[1..] {
        peak = peak.max(close);
        let drawdown = (close / peak - 1.0) * 100.0;
        max_drawdown = max_drawdown.min(drawdown);
    }

    Some((change_pct, max_drawdown))
}

/// Price extremes and endpoints over a bar window
pub fn summarize_bars(bars: &[Bar]) -> Option<PriceSummary> {
    let first = bars.first()?;
    let last = bars.last()?;
    let highest = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let lowest = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    Some(PriceSummary {
        start_price: first.close,
        end_price: last.close,
        highest_price: highest,
        lowest_price: lowest,
        trading_days: bars.len(),
    })
}

/// Computes normalized post-event price statistics for a ticker.
///
/// Fetches twice the requested window in calendar days to cover weekends and
/// holidays, then truncates to the first `days` trading rows actually
/// returned. All failure modes fold into `ImpactStatus::Unavailable` so
/// batch callers never abort on a single ticker.
pub struct ImpactAnalyzer {
    provider: Arc<dyn MarketDataProvider>,
    days: usize,
    fetch_timeout: Duration,
}

impl ImpactAnalyzer {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            days: DEFAULT_ANALYSIS_DAYS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_days(mut self, days: usize) -> Self {
        self.days = days.max(2);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub async fn analyze(&self, ticker: &str, event_date: NaiveDate) -> ImpactStatus {
        let end = event_date + ChronoDuration::days((self.days * 2) as i64);

        let fetch = self.provider.fetch_series(ticker, event_date, end);
        let bars = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(bars)) => bars,
            Ok(Err(e)) => {
                warn!("Market data fetch failed for {}: {}", ticker, e);
                return ImpactStatus::Unavailable {
                    reason: format!("market data fetch failed: {}", e),
                };
            }
            Err(_) => {
                warn!("Market data fetch timed out for {}", ticker);
                return ImpactStatus::Unavailable {
                    reason: "market data fetch timed out".to_string(),
                };
            }
        };

        if bars.is_empty() {
            return ImpactStatus::Unavailable {
                reason: format!("no market data for {} from {} to {}", ticker, event_date, end),
            };
        }

        // Endpoint/extreme summary covers the full fetched window; the
        // movement statistics are computed over the truncated window only.
        let price_data = match summarize_bars(&bars) {
            Some(summary) => summary,
            None => {
                return ImpactStatus::Unavailable {
                    reason: "empty price series".to_string(),
                }
            }
        };

        let analyzed = &bars[..bars.len().min(self.days)];
        let closes: Vec<f64> = analyzed.iter().map(|b| b.close).collect();
        let Some((price_change_pct, max_drawdown_pct)) = price_movement(&closes) else {
            return ImpactStatus::Unavailable {
                reason: format!("only {} trading day(s) of data", analyzed.len()),
            };
        };

        let range_start = analyzed[0].timestamp.date_naive();
        let range_end = analyzed[analyzed.len() - 1].timestamp.date_naive();

        ImpactStatus::Analyzed(MarketImpact {
            price_change_pct,
            max_drawdown_pct,
            date_range: (range_start, range_end),
            price_data,
        })
    }
}
