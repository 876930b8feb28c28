//! Read-only dashboard and alert view models.
//!
//! Builds human-facing summaries from aggregator and evaluator output.
//! Everything here is re-derived fresh on every call; there is no stored
//! alert state and nothing mutates.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Leaderboard length for top performers.
const TOP_PERFORMER_LIMIT: usize = 10;
/// Margin (achieved minus expected) below which a current-month
/// employee is flagged as underperforming.
const UNDERPERFORMER_MARGIN: f64 = -10.0;
/// Achieved percent below which a past-month employee is flagged.
const PAST_UNDERPERFORMER_PERCENT: f64 = 50.0;

/// One employee's month as seen by the presenters.
#[derive(Debug, Clone)]
pub struct EmployeeMonth {
    pub id: String,
    pub name: String,
    pub role_label: String,
    pub monthly_total: f64,
    pub monthly_target: f64,
    pub sale_count: u64,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPerformer {
    pub id: String,
    pub name: String,
    pub role_label: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Underperformer {
    pub id: String,
    pub name: String,
    pub percent_achieved: f64,
    pub monthly_target: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRef {
    pub id: String,
    pub name: String,
}

fn is_sales_eligible(role_label: &str, eligible_roles: &[String]) -> bool {
    let trimmed = role_label.trim();
    eligible_roles
        .iter()
        .any(|role| role.eq_ignore_ascii_case(trimmed))
}

/// Rank sales-eligible employees with positive totals by amount
/// descending and keep the top 10. The sort is stable, so ties keep
/// their original iteration order.
pub fn top_performers(
    employees: &[EmployeeMonth],
    eligible_roles: &[String],
) -> Vec<TopPerformer> {
    let mut ranked: Vec<&EmployeeMonth> = employees
        .iter()
        .filter(|e| is_sales_eligible(&e.role_label, eligible_roles))
        .filter(|e| e.monthly_total > 0.0)
        .collect();
    ranked.sort_by(|a, b| {
        b.monthly_total
            .partial_cmp(&a.monthly_total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
        .into_iter()
        .take(TOP_PERFORMER_LIMIT)
        .map(|e| TopPerformer {
            id: e.id.clone(),
            name: e.name.clone(),
            role_label: e.role_label.clone(),
            total: e.monthly_total,
        })
        .collect()
}

/// Flag employees tracking below their individual target.
///
/// Current month: `(achieved - percent_expected) < -10`. Past months:
/// `achieved < 50`. Employees with a zero or unset individual target
/// are never flagged.
pub fn underperformers(
    employees: &[EmployeeMonth],
    percent_expected: f64,
    is_current_month: bool,
) -> Vec<Underperformer> {
    employees
        .iter()
        .filter_map(|e| {
            if e.monthly_target <= 0.0 {
                return None;
            }
            let percent_achieved = (e.monthly_total / e.monthly_target) * 100.0;
            let flagged = if is_current_month {
                (percent_achieved - percent_expected) < UNDERPERFORMER_MARGIN
            } else {
                percent_achieved < PAST_UNDERPERFORMER_PERCENT
            };
            flagged.then(|| Underperformer {
                id: e.id.clone(),
                name: e.name.clone(),
                percent_achieved,
                monthly_target: e.monthly_target,
            })
        })
        .collect()
}

/// Employees with no recorded sale, or only zero-amount sales, for the
/// queried month.
pub fn no_sales_yet(employees: &[EmployeeMonth]) -> Vec<EmployeeRef> {
    employees
        .iter()
        .filter(|e| e.sale_count == 0 || e.monthly_total == 0.0)
        .map(|e| EmployeeRef {
            id: e.id.clone(),
            name: e.name.clone(),
        })
        .collect()
}

/// Employees whose birthday falls in the queried month.
///
/// Birthdays are civil-calendar facts, so this matches on the calendar
/// month of the stored birth date rather than re-deriving anything
/// through a timezone. This is the one deliberate exception to the
/// UTC-everywhere bucketing rule.
pub fn birthday_reminders(employees: &[EmployeeMonth], month: u32) -> Vec<EmployeeRef> {
    employees
        .iter()
        .filter(|e| e.birth_date.map(|d| d.month() == month).unwrap_or(false))
        .map(|e| EmployeeRef {
            id: e.id.clone(),
            name: e.name.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(id: &str, role: &str, total: f64, target: f64, count: u64) -> EmployeeMonth {
        EmployeeMonth {
            id: id.to_string(),
            name: format!("Employee {id}"),
            role_label: role.to_string(),
            monthly_total: total,
            monthly_target: target,
            sale_count: count,
            birth_date: None,
        }
    }

    fn roles(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn top_performers_filters_roles_and_zero_totals() {
        let employees = vec![
            employee("a", "sales", 500.0, 0.0, 3),
            employee("b", "stockroom", 900.0, 0.0, 2),
            employee("c", "sales", 0.0, 0.0, 0),
            employee("d", "Sales", 700.0, 0.0, 4),
        ];
        let top = top_performers(&employees, &roles(&["sales"]));
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "d");
        assert_eq!(top[1].id, "a");
    }

    #[test]
    fn top_performers_keeps_at_most_ten() {
        let employees: Vec<EmployeeMonth> = (0..15)
            .map(|i| employee(&format!("e{i}"), "sales", 100.0 + i as f64, 0.0, 1))
            .collect();
        let top = top_performers(&employees, &roles(&["sales"]));
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].id, "e14");
    }

    #[test]
    fn top_performers_ties_keep_input_order() {
        let employees = vec![
            employee("first", "sales", 300.0, 0.0, 1),
            employee("second", "sales", 300.0, 0.0, 1),
            employee("third", "sales", 300.0, 0.0, 1),
        ];
        let top = top_performers(&employees, &roles(&["sales"]));
        let ids: Vec<&str> = top.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn underperformers_skip_zero_target_employees() {
        // Scenario E: zero individual target is never flagged.
        let employees = vec![
            employee("no-target", "sales", 0.0, 0.0, 0),
            employee("behind", "sales", 100.0, 1000.0, 1),
        ];
        let flagged = underperformers(&employees, 50.0, true);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, "behind");
    }

    #[test]
    fn underperformers_current_month_margin() {
        // 40% achieved at 50% expected -> -10, not flagged (< -10 required).
        let boundary = vec![employee("boundary", "sales", 400.0, 1000.0, 1)];
        assert!(underperformers(&boundary, 50.0, true).is_empty());

        // 39% achieved -> -11, flagged.
        let under = vec![employee("under", "sales", 390.0, 1000.0, 1)];
        assert_eq!(underperformers(&under, 50.0, true).len(), 1);
    }

    #[test]
    fn underperformers_past_month_uses_fifty_percent() {
        let employees = vec![
            employee("half", "sales", 500.0, 1000.0, 1),
            employee("short", "sales", 499.0, 1000.0, 1),
        ];
        let flagged = underperformers(&employees, 0.0, false);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, "short");
    }

    #[test]
    fn no_sales_yet_includes_zero_amount_sales() {
        let employees = vec![
            employee("none", "sales", 0.0, 0.0, 0),
            employee("zeroes", "sales", 0.0, 0.0, 2),
            employee("selling", "sales", 10.0, 0.0, 1),
        ];
        let listed = no_sales_yet(&employees);
        let ids: Vec<&str> = listed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["none", "zeroes"]);
    }

    #[test]
    fn birthday_reminders_match_calendar_month() {
        let mut march = employee("march", "sales", 0.0, 0.0, 0);
        march.birth_date = NaiveDate::from_ymd_opt(1990, 3, 31);
        let mut june = employee("june", "sales", 0.0, 0.0, 0);
        june.birth_date = NaiveDate::from_ymd_opt(1985, 6, 2);
        let unknown = employee("unknown", "sales", 0.0, 0.0, 0);

        let employees = vec![march, june, unknown];
        let reminders = birthday_reminders(&employees, 3);
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].id, "march");
    }
}
