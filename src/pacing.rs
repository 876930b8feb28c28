//! Goal pacing evaluation.
//!
//! Classifies how a store tracks against its monthly goal, accounting
//! for the fraction of the month already elapsed. Deterministic, no
//! I/O. Callers must skip evaluation entirely when no target exists;
//! this is never invoked with a synthetic zero target.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dates;

/// Margin (achieved minus expected, in percent points) above which a
/// current month counts as ahead.
const AHEAD_MARGIN: f64 = 5.0;
/// Margin down to which a current month still counts as on pace.
const ON_PACE_MARGIN: f64 = -10.0;
/// Achieved percent above which a fully-elapsed month counts as ahead.
const PAST_AHEAD_PERCENT: f64 = 70.0;
/// Achieved percent above which a fully-elapsed month is on pace.
const PAST_ON_PACE_PERCENT: f64 = 50.0;

/// Pacing classification. Variant order is the total ordering
/// `behind < onPace < ahead < goalMet`; increasing the month total can
/// never move the status backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PacingStatus {
    Behind,
    OnPace,
    Ahead,
    GoalMet,
}

impl PacingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Behind => "behind",
            Self::OnPace => "onPace",
            Self::Ahead => "ahead",
            Self::GoalMet => "goalMet",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pacing {
    pub percent_achieved: f64,
    /// Only reported for the month in progress; pacing-vs-time is not
    /// meaningful for past or future months.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_expected: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_elapsed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_in_month: Option<u32>,
    pub status: PacingStatus,
}

/// Evaluate `month_total` against `target_amount` for `(month, year)`
/// as seen from `today` (a UTC calendar date).
///
/// `month` must be validated into `1..=12` and `target_amount` must be
/// non-negative; both are enforced at the input boundary.
pub fn evaluate(
    month_total: f64,
    target_amount: f64,
    month: u32,
    year: i32,
    today: NaiveDate,
) -> Pacing {
    let percent_achieved = if target_amount > 0.0 {
        (month_total / target_amount) * 100.0
    } else {
        0.0
    };

    let is_current_month = month == today.month() && year == today.year();
    let days_in_month = dates::days_in_month(month, year);
    let days_elapsed = if is_current_month {
        today.day()
    } else if (year, month) > (today.year(), today.month()) {
        0
    } else {
        days_in_month
    };
    let percent_expected = if days_elapsed > 0 {
        (days_elapsed as f64 / days_in_month as f64) * 100.0
    } else {
        0.0
    };

    let status = if month_total >= target_amount {
        PacingStatus::GoalMet
    } else if is_current_month {
        let margin = percent_achieved - percent_expected;
        if margin >= AHEAD_MARGIN {
            PacingStatus::Ahead
        } else if margin >= ON_PACE_MARGIN {
            PacingStatus::OnPace
        } else {
            PacingStatus::Behind
        }
    } else if percent_achieved >= PAST_AHEAD_PERCENT {
        PacingStatus::Ahead
    } else if percent_achieved >= PAST_ON_PACE_PERCENT {
        PacingStatus::OnPace
    } else {
        PacingStatus::Behind
    };

    Pacing {
        percent_achieved,
        percent_expected: is_current_month.then_some(percent_expected),
        days_elapsed: is_current_month.then_some(days_elapsed),
        days_in_month: is_current_month.then_some(days_in_month),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    #[test]
    fn meeting_the_target_always_wins() {
        // Scenario A: target met, any elapsed time.
        let today = date(2024, 6, 1);
        let result = evaluate(10_000.0, 10_000.0, 6, 2024, today);
        assert_eq!(result.status, PacingStatus::GoalMet);

        let past = evaluate(10_000.0, 10_000.0, 1, 2024, today);
        assert_eq!(past.status, PacingStatus::GoalMet);

        let future = evaluate(10_000.0, 10_000.0, 12, 2024, today);
        assert_eq!(future.status, PacingStatus::GoalMet);
    }

    #[test]
    fn current_month_ahead_when_margin_reaches_five() {
        // Scenario B: 60% achieved at 50% expected -> +10 -> ahead.
        // June 15th of a 30-day month = exactly 50% expected.
        let today = date(2024, 6, 15);
        let result = evaluate(6_000.0, 10_000.0, 6, 2024, today);
        assert_eq!(result.percent_expected, Some(50.0));
        assert_eq!(result.days_elapsed, Some(15));
        assert_eq!(result.days_in_month, Some(30));
        assert_eq!(result.status, PacingStatus::Ahead);
    }

    #[test]
    fn current_month_minus_ten_boundary_is_on_pace() {
        // Scenario C: 40% achieved at 50% expected -> exactly -10 must
        // resolve to onPace, not behind.
        let today = date(2024, 6, 15);
        let result = evaluate(4_000.0, 10_000.0, 6, 2024, today);
        assert_eq!(result.status, PacingStatus::OnPace);

        // Just under the boundary flips to behind.
        let behind = evaluate(3_990.0, 10_000.0, 6, 2024, today);
        assert_eq!(behind.status, PacingStatus::Behind);
    }

    #[test]
    fn past_month_fifty_percent_boundary_is_on_pace() {
        // Scenario D: fully elapsed month at exactly 50% achieved.
        let today = date(2024, 6, 15);
        let result = evaluate(5_000.0, 10_000.0, 3, 2024, today);
        assert_eq!(result.status, PacingStatus::OnPace);
        assert_eq!(result.percent_expected, None);
        assert_eq!(result.days_elapsed, None);

        let ahead = evaluate(7_000.0, 10_000.0, 3, 2024, today);
        assert_eq!(ahead.status, PacingStatus::Ahead);

        let behind = evaluate(4_999.0, 10_000.0, 3, 2024, today);
        assert_eq!(behind.status, PacingStatus::Behind);
    }

    #[test]
    fn future_month_reports_no_elapsed_fields() {
        let today = date(2024, 6, 15);
        let result = evaluate(0.0, 10_000.0, 9, 2024, today);
        assert_eq!(result.percent_expected, None);
        assert_eq!(result.days_elapsed, None);
        assert_eq!(result.status, PacingStatus::Behind);
    }

    #[test]
    fn december_versus_january_year_boundary() {
        // December 2023 is strictly in the past from June 2024, even
        // though 12 > 6; the comparison is on (year, month).
        let today = date(2024, 6, 15);
        let past = evaluate(6_000.0, 10_000.0, 12, 2023, today);
        assert_eq!(past.percent_expected, None);
        assert_eq!(past.status, PacingStatus::OnPace);

        // January 2025 is strictly in the future.
        let future = evaluate(0.0, 10_000.0, 1, 2025, today);
        assert_eq!(future.days_elapsed, None);
    }

    #[test]
    fn status_is_monotonic_in_total() {
        let today = date(2024, 6, 10);
        let mut previous = PacingStatus::Behind;
        let mut total = 0.0;
        while total <= 11_000.0 {
            let status = evaluate(total, 10_000.0, 6, 2024, today).status;
            assert!(
                status >= previous,
                "status went backward at total {total}: {previous:?} -> {status:?}"
            );
            previous = status;
            total += 50.0;
        }
        assert_eq!(previous, PacingStatus::GoalMet);
    }

    #[test]
    fn zero_target_reports_zero_achieved() {
        // The evaluator is never called without a real target, but a
        // zero denominator must still not divide.
        let today = date(2024, 6, 15);
        let result = evaluate(100.0, 0.0, 6, 2024, today);
        assert_eq!(result.percent_achieved, 0.0);
        // 100 >= 0 so the precedence rule still reports goalMet.
        assert_eq!(result.status, PacingStatus::GoalMet);
    }

    #[test]
    fn status_serializes_to_spec_labels() {
        assert_eq!(
            serde_json::to_value(PacingStatus::GoalMet).unwrap(),
            serde_json::json!("goalMet")
        );
        assert_eq!(
            serde_json::to_value(PacingStatus::OnPace).unwrap(),
            serde_json::json!("onPace")
        );
        assert_eq!(
            serde_json::to_value(PacingStatus::Ahead).unwrap(),
            serde_json::json!("ahead")
        );
        assert_eq!(
            serde_json::to_value(PacingStatus::Behind).unwrap(),
            serde_json::json!("behind")
        );
    }
}
