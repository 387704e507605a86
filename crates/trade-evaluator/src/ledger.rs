//! In-memory record of completed evaluations, keyed by the externally
//! assigned `(issued_at, ticker)` identity, plus aggregate success metrics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use event_core::OptionType;

use crate::{EvaluationOutcome, StoredTrade};

/// Ledger of evaluation outcomes. Batch runs consult it first so re-running
/// over the same history is idempotent.
#[derive(Debug, Default)]
pub struct EvaluationLedger {
    entries: HashMap<(DateTime<Utc>, String), EvaluationOutcome>,
}

impl EvaluationLedger {
    fn key(trade: &StoredTrade) -> (DateTime<Utc>, String) {
        (trade.issued_at, trade.idea.ticker.clone())
    }

    pub fn get(&self, trade: &StoredTrade) -> Option<&EvaluationOutcome> {
        self.entries.get(&Self::key(trade))
    }

    pub fn insert(&mut self, trade: &StoredTrade, outcome: EvaluationOutcome) {
        self.entries.insert(Self::key(trade), outcome);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hit rates across a set of evaluated trades, overall and per option type.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessSummary {
    pub total_trades: usize,
    pub successful_trades: usize,
    pub success_rate: f64,
    pub average_move_pct: f64,
    pub call_trades: usize,
    pub call_successful: usize,
    pub call_success_rate: f64,
    pub put_trades: usize,
    pub put_successful: usize,
    pub put_success_rate: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(successful as f64 / total as f64 * 100.0)
    }
}

/// Summarize a batch of outcomes. Skipped trades carry no verdict and are
/// left out of every count.
pub fn success_summary(results: &[(StoredTrade, EvaluationOutcome)]) -> SuccessSummary {
    let mut total = 0;
    let mut successful = 0;
    let mut move_sum = 0.0;
    let mut call_trades = 0;
    let mut call_successful = 0;
    let mut put_trades = 0;
    let mut put_successful = 0;

    for (trade, outcome) in results {
        let Some(evaluation) = outcome.as_evaluated() else {
            continue;
        };

        total += 1;
        move_sum += evaluation.actual_move_pct;
        if evaluation.trade_direction_correct {
            successful += 1;
        }

        match trade.idea.option_type {
            Some(OptionType::Call) => {
                call_trades += 1;
                if evaluation.trade_direction_correct {
                    call_successful += 1;
                }
            }
            Some(OptionType::Put) => {
                put_trades += 1;
                if evaluation.trade_direction_correct {
                    put_successful += 1;
                }
            }
            None => {}
        }
    }

    SuccessSummary {
        total_trades: total,
        successful_trades: successful,
        success_rate: rate(successful, total),
        average_move_pct: if total == 0 {
            0.0
        } else {
            round2(move_sum / total as f64)
        },
        call_trades,
        call_successful,
        call_success_rate: rate(call_successful, call_trades),
        put_trades,
        put_successful,
        put_success_rate: rate(put_successful, put_trades),
    }
}
