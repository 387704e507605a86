//! Market calendar checks: FOMC meeting proximity and earnings season.

use chrono::{Datelike, NaiveDate};

/// Days either side of an FOMC meeting that still count as Fed week.
const FED_WEEK_RADIUS: i64 = 3;

/// Scheduled FOMC meeting days, 2023 through 2026. Sourced from the Federal
/// Reserve's published calendar; needs a yearly refresh.
const FOMC_MEETING_DATES: &[(i32, u32, u32)] = &[
    (2023, 1, 31),
    (2023, 2, 1),
    (2023, 3, 21),
    (2023, 3, 22),
    (2023, 5, 2),
    (2023, 5, 3),
    (2023, 6, 13),
    (2023, 6, 14),
    (2023, 7, 25),
    (2023, 7, 26),
    (2023, 9, 19),
    (2023, 9, 20),
    (2023, 10, 31),
    (2023, 11, 1),
    (2023, 12, 12),
    (2023, 12, 13),
    (2024, 1, 30),
    (2024, 1, 31),
    (2024, 3, 19),
    (2024, 3, 20),
    (2024, 4, 30),
    (2024, 5, 1),
    (2024, 6, 11),
    (2024, 6, 12),
    (2024, 7, 30),
    (2024, 7, 31),
    (2024, 9, 17),
    (2024, 9, 18),
    (2024, 11, 6),
    (2024, 11, 7),
    (2024, 12, 17),
    (2024, 12, 18),
    (2025, 1, 28),
    (2025, 1, 29),
    (2025, 3, 18),
    (2025, 3, 19),
    (2025, 5, 6),
    (2025, 5, 7),
    (2025, 6, 17),
    (2025, 6, 18),
    (2025, 7, 29),
    (2025, 7, 30),
    (2025, 9, 16),
    (2025, 9, 17),
    (2025, 10, 28),
    (2025, 10, 29),
    (2025, 12, 9),
    (2025, 12, 10),
    (2026, 1, 27),
    (2026, 1, 28),
    (2026, 3, 17),
    (2026, 3, 18),
    (2026, 4, 28),
    (2026, 4, 29),
    (2026, 6, 16),
    (2026, 6, 17),
    (2026, 7, 28),
    (2026, 7, 29),
    (2026, 9, 15),
    (2026, 9, 16),
    (2026, 10, 27),
    (2026, 10, 28),
    (2026, 12, 8),
    (2026, 12, 9),
];

/// True when `date` falls within three days of a scheduled FOMC meeting.
pub fn is_fed_week(date: NaiveDate) -> bool {
    FOMC_MEETING_DATES.iter().any(|(y, m, d)| {
        NaiveDate::from_ymd_opt(*y, *m, *d)
            .map(|meeting| (date - meeting).num_days().abs() <= FED_WEEK_RADIUS)
            .unwrap_or(false)
    })
}

/// Mid-month window of the quarterly reporting months.
pub fn is_earnings_season(date: NaiveDate) -> bool {
    matches!(date.month(), 1 | 4 | 7 | 10) && (10..=25).contains(&date.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn fed_week_covers_meeting_and_margin() {
        assert!(is_fed_week(d(2024, 6, 12))); // meeting day
        assert!(is_fed_week(d(2024, 6, 9))); // three days before
        assert!(is_fed_week(d(2024, 6, 15))); // three days after
        assert!(!is_fed_week(d(2024, 6, 25)));
    }

    #[test]
    fn fed_week_known_in_later_years() {
        assert!(is_fed_week(d(2025, 9, 17)));
        assert!(is_fed_week(d(2026, 3, 18)));
    }

    #[test]
    fn earnings_season_is_mid_quarter_months() {
        assert!(is_earnings_season(d(2024, 1, 15)));
        assert!(is_earnings_season(d(2024, 7, 10)));
        assert!(is_earnings_season(d(2024, 10, 25)));
        assert!(!is_earnings_season(d(2024, 1, 9)));
        assert!(!is_earnings_season(d(2024, 2, 15)));
    }
}
