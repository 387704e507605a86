//! Strike and expiry calibration for option trades.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use event_core::OptionType;

/// Strike offset is capped at this percentage from the current price.
const MAX_OTM_PCT: f64 = 5.0;

/// Fraction of the historical move used as the out-of-the-money offset.
const OTM_SCALE: f64 = 0.3;

/// Strike target scaled off the current price by a fraction of the matched
/// historical move. CALL strikes sit above the price, PUT strikes below.
/// Rounds to the nearest 0.5 below $100, nearest whole unit above.
pub fn select_strike(current_price: f64, option_type: OptionType, price_change_pct: f64) -> f64 {
    let otm_pct = (price_change_pct.abs() * OTM_SCALE).min(MAX_OTM_PCT);
    let target = match option_type {
        OptionType::Call => current_price * (1.0 + otm_pct / 100.0),
        OptionType::Put => current_price * (1.0 - otm_pct / 100.0),
    };

    if current_price < 100.0 {
        (target * 2.0).round() / 2.0
    } else {
        target.round()
    }
}

/// Pick the expiry with days-to-expiry closest to, and within, the
/// `[min_days, max_days]` window. Falls back to the earliest listed expiry,
/// and to the next Friday when the chain is empty.
pub fn select_expiry(
    today: NaiveDate,
    expiries: &[NaiveDate],
    min_days: i64,
    max_days: i64,
) -> NaiveDate {
    if expiries.is_empty() {
        return next_friday(today);
    }

    expiries
        .iter()
        .copied()
        .filter(|e| {
            let days = (*e - today).num_days();
            days >= min_days && days <= max_days
        })
        .min_by_key(|e| (*e - today).num_days())
        .or_else(|| expiries.iter().copied().min())
        .unwrap_or_else(|| next_friday(today))
}

/// Next Friday strictly after `from`.
pub fn next_friday(from: NaiveDate) -> NaiveDate {
    let ahead = Weekday::Fri.num_days_from_monday() as i64
        - from.weekday().num_days_from_monday() as i64;
    let ahead = if ahead <= 0 { ahead + 7 } else { ahead };
    from + Duration::days(ahead)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn call_strike_above_put_strike_below() {
        // 4% historical move scales to a 1.2% offset.
        let call = select_strike(200.0, OptionType::Call, 4.0);
        let put = select_strike(200.0, OptionType::Put, 4.0);
        assert_eq!(call, 202.0);
        assert_eq!(put, 198.0);
    }

    #[test]
    fn otm_offset_caps_at_five_percent() {
        let strike = select_strike(200.0, OptionType::Call, 40.0);
        assert_eq!(strike, 210.0);
    }

    #[test]
    fn cheap_stock_rounds_to_half_dollar() {
        // 50 * 1.012 = 50.6, nearest half is 50.5.
        let strike = select_strike(50.0, OptionType::Call, 4.0);
        assert_eq!(strike, 50.5);
    }

    #[test]
    fn expiry_prefers_closest_within_window() {
        let today = d(2024, 3, 1);
        let expiries = vec![d(2024, 3, 4), d(2024, 3, 12), d(2024, 3, 22), d(2024, 5, 1)];
        // 3 days is below the window, 11 and 21 qualify, 61 is beyond it.
        assert_eq!(select_expiry(today, &expiries, 7, 30), d(2024, 3, 12));
    }

    #[test]
    fn expiry_falls_back_to_earliest_when_none_qualify() {
        let today = d(2024, 3, 1);
        let expiries = vec![d(2024, 3, 4), d(2024, 5, 1)];
        assert_eq!(select_expiry(today, &expiries, 7, 30), d(2024, 3, 4));
    }

    #[test]
    fn empty_chain_uses_next_friday() {
        let today = d(2024, 3, 6); // a Wednesday
        assert_eq!(select_expiry(today, &[], 7, 30), d(2024, 3, 8));
    }

    #[test]
    fn next_friday_skips_same_day() {
        assert_eq!(next_friday(d(2024, 3, 8)), d(2024, 3, 15)); // from a Friday
        assert_eq!(next_friday(d(2024, 3, 9)), d(2024, 3, 15)); // from a Saturday
        assert_eq!(next_friday(d(2024, 3, 11)), d(2024, 3, 15)); // from a Monday
    }
}
