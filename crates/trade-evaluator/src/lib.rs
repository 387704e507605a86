//! Evaluates previously issued trade ideas against realized market data,
//! closing the feedback loop on the decision engine.

pub mod ledger;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use event_core::{Bar, MarketDataProvider, OptionType, TradeEvaluation, TradeIdea};

pub use ledger::{success_summary, EvaluationLedger, SuccessSummary};

pub const DEFAULT_EVALUATION_DAYS: usize = 7;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Moves below this magnitude count as minimal even when directionally right.
const MIN_MOVE_THRESHOLD: f64 = 1.0;

/// A trade idea paired with the timestamp it was issued at. The pair
/// `(issued_at, ticker)` identifies the trade across evaluation runs.
#[derive(Debug, Clone)]
pub struct StoredTrade {
    pub issued_at: DateTime<Utc>,
    pub idea: TradeIdea,
}

/// Outcome of evaluating one stored trade. Un-evaluable trades are skipped
/// with a reason, never scored as failures.
#[derive(Debug, Clone)]
pub enum EvaluationOutcome {
    Evaluated(TradeEvaluation),
    Skipped { reason: String },
}

impl EvaluationOutcome {
    pub fn as_evaluated(&self) -> Option<&TradeEvaluation> {
        match self {
            EvaluationOutcome::Evaluated(evaluation) => Some(evaluation),
            EvaluationOutcome::Skipped { .. } => None,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Change, max gain, and running-peak drawdown over the evaluated bars.
/// Gains measure against the first close using intraday highs.
fn price_movement(bars: &[Bar]) -> Option<(f64, f64, f64)> {
    if bars.len() < 2 {
        return None;
    }

    let first = bars[0].close;
    let last = bars[bars.len() - 1].close;
    if first <= 0.0 {
        return None;
    }

    let change = (last / first - 1.0) * 100.0;

    let highest = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let max_gain = (highest / first - 1.0) * 100.0;

    let mut peak = first;
    let mut max_drawdown = 0.0f64;
    for bar in bars {
        if bar.close > peak {
            peak = bar.close;
        }
        let drawdown = (bar.close / peak - 1.0) * 100.0;
        if drawdown < max_drawdown {
            max_drawdown = drawdown;
        }
    }

    Some((change, max_gain, max_drawdown))
}

fn direction_correct(price_change_pct: f64, option_type: OptionType) -> bool {
    match option_type {
        OptionType::Call => price_change_pct > 0.0,
        OptionType::Put => price_change_pct < 0.0,
    }
}

fn evaluation_notes(
    price_change_pct: f64,
    max_gain_pct: f64,
    max_drawdown_pct: f64,
    option_type: OptionType,
    correct: bool,
) -> String {
    let mut notes = Vec::new();

    if correct {
        if price_change_pct.abs() > MIN_MOVE_THRESHOLD {
            notes.push(format!(
                "[+] {} direction was correct with significant movement of {:.2}%",
                option_type.name(),
                price_change_pct
            ));
        } else {
            notes.push(format!(
                "[+] {} direction was technically correct but movement was minimal ({:.2}%)",
                option_type.name(),
                price_change_pct
            ));
        }
    } else {
        notes.push(format!(
            "[-] {} direction was incorrect. Price moved {:.2}% in opposite direction",
            option_type.name(),
            price_change_pct
        ));
    }

    if max_gain_pct > 2.0 {
        notes.push(format!(
            "[UP] Significant upside: Price reached +{:.2}% above start price",
            max_gain_pct
        ));
    }
    if max_drawdown_pct < -2.0 {
        notes.push(format!(
            "[DOWN] Significant downside: Price dropped {:.2}% from peak",
            max_drawdown_pct
        ));
    }

    notes.join(" | ")
}

pub struct TradeEvaluator {
    provider: Arc<dyn MarketDataProvider>,
    evaluation_days: usize,
    fetch_timeout: Duration,
}

impl TradeEvaluator {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            evaluation_days: DEFAULT_EVALUATION_DAYS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_evaluation_days(mut self, days: usize) -> Self {
        self.evaluation_days = days.max(2);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Evaluate one stored trade against realized prices as of `now`.
    ///
    /// The fetch window is twice the horizon in calendar days to leave room
    /// for weekends and holidays; the returned rows are truncated back to
    /// the horizon before any movement math.
    pub async fn evaluate(&self, trade: &StoredTrade, now: DateTime<Utc>) -> EvaluationOutcome {
        if trade.issued_at > now {
            log::info!("skipping trade issued in the future: {}", trade.issued_at);
            return EvaluationOutcome::Skipped {
                reason: "trade was issued in the future".to_string(),
            };
        }

        let ticker = trade.idea.ticker.trim();
        if ticker.is_empty() {
            log::warn!("trade missing ticker symbol, cannot evaluate");
            return EvaluationOutcome::Skipped {
                reason: "missing ticker symbol".to_string(),
            };
        }

        let option_type = match trade.idea.option_type {
            Some(option_type) => option_type,
            None => {
                log::info!("trade for {ticker} has no option type, cannot score direction");
                return EvaluationOutcome::Skipped {
                    reason: "missing option type".to_string(),
                };
            }
        };

        let start = trade.issued_at.date_naive();
        let end = start + chrono::Duration::days(2 * self.evaluation_days as i64);

        let fetch = self.provider.fetch_series(ticker, start, end);
        let bars = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(bars)) => bars,
            Ok(Err(e)) => {
                log::warn!("price fetch failed for {ticker}: {e}");
                return EvaluationOutcome::Skipped {
                    reason: format!("no data available for {ticker}"),
                };
            }
            Err(_) => {
                log::warn!("price fetch timed out for {ticker}");
                return EvaluationOutcome::Skipped {
                    reason: format!("no data available for {ticker}"),
                };
            }
        };

        let window = &bars[..bars.len().min(self.evaluation_days)];
        let (change, max_gain, max_drawdown) = match price_movement(window) {
            Some(movement) => movement,
            None => {
                return EvaluationOutcome::Skipped {
                    reason: format!("insufficient price data for {ticker}"),
                };
            }
        };

        let correct = direction_correct(change, option_type);
        let notes = evaluation_notes(change, max_gain, max_drawdown, option_type, correct);

        log::info!(
            "evaluated {} trade for {ticker}: move={change:.2}%, correct={correct}",
            option_type.name()
        );

        EvaluationOutcome::Evaluated(TradeEvaluation {
            actual_move_pct: round2(change),
            max_gain_pct: round2(max_gain),
            max_drawdown_pct: round2(max_drawdown),
            trade_direction_correct: correct,
            notes,
            evaluated_days: window.len(),
            start_date: window[0].timestamp.date_naive(),
            end_date: window[window.len() - 1].timestamp.date_naive(),
        })
    }

    /// Evaluate a batch against the ledger. Trades already present are
    /// returned unchanged unless `force` is set.
    pub async fn evaluate_batch(
        &self,
        trades: &[StoredTrade],
        ledger: &mut EvaluationLedger,
        force: bool,
    ) -> Vec<EvaluationOutcome> {
        let now = Utc::now();
        let mut outcomes = Vec::with_capacity(trades.len());

        for trade in trades {
            if !force {
                if let Some(existing) = ledger.get(trade) {
                    outcomes.push(existing.clone());
                    continue;
                }
            }
            let outcome = self.evaluate(trade, now).await;
            ledger.insert(trade, outcome.clone());
            outcomes.push(outcome);
        }

        outcomes
    }
}
