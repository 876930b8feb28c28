//! Threshold alerts.
//!
//! Re-derived fresh on every call from the same aggregator/evaluator
//! outputs the dashboard uses; no alert state is ever stored. The
//! email variant sends the manager a plain-text summary of the same
//! data.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use serde_json::{json, Value};

use crate::aggregate;
use crate::auth::Manager;
use crate::dates;
use crate::error::ApiError;
use crate::mail;
use crate::models::Employee;
use crate::pacing::{self, Pacing};
use crate::presenters::{self, EmployeeRef, Underperformer};
use crate::routes::{employee_month_summaries, ok, MonthYearParams};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(alerts))
        .route("/email", post(email_alerts))
}

struct AlertData {
    month: u32,
    year: i32,
    month_total: f64,
    pacing: Option<Pacing>,
    underperformers: Vec<Underperformer>,
    no_sales: Vec<EmployeeRef>,
}

async fn build_alerts(
    state: &SharedState,
    manager: &Manager,
    params: &MonthYearParams,
) -> Result<AlertData, ApiError> {
    let (month, year) = params.resolve()?;
    let today = Utc::now().date_naive();
    let is_current_month = month == today.month() && year == today.year();

    let sales = state
        .db
        .sales_for_month(manager.store_id, month, year)
        .await?;
    let agg = aggregate::aggregate(&sales.to_records(), month, year);

    let goal = state
        .db
        .goals()
        .find_one(doc! {
            "store_id": manager.store_id,
            "month": month as i32,
            "year": year,
        })
        .await?;
    let store_pacing = goal
        .as_ref()
        .map(|goal| pacing::evaluate(agg.month_total, goal.target_amount, month, year, today));

    let employees: Vec<Employee> = state
        .db
        .employees()
        .find(doc! { "store_id": manager.store_id })
        .await?
        .try_collect()
        .await?;
    let summaries = employee_month_summaries(&employees, &sales);

    // Individual pacing compares against elapsed time directly; the
    // store goal is irrelevant for per-employee targets.
    let percent_expected = if is_current_month {
        (today.day() as f64 / dates::days_in_month(month, year) as f64) * 100.0
    } else {
        0.0
    };
    let underperformers =
        presenters::underperformers(&summaries, percent_expected, is_current_month);
    let no_sales = presenters::no_sales_yet(&summaries);

    Ok(AlertData {
        month,
        year,
        month_total: agg.month_total,
        pacing: store_pacing,
        underperformers,
        no_sales,
    })
}

async fn alerts(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    let data = build_alerts(&state, &manager, &params).await?;
    Ok(ok(json!({
        "month": data.month,
        "year": data.year,
        "monthTotal": data.month_total,
        "pacing": data.pacing,
        "underperformers": data.underperformers,
        "noSalesYet": data.no_sales,
    })))
}

fn summary_body(store_name: &str, data: &AlertData) -> String {
    let mut lines = vec![format!(
        "Alert summary for {store_name}, {:02}/{}",
        data.month, data.year
    )];
    lines.push(format!("Month total so far: {:.2}", data.month_total));
    match &data.pacing {
        Some(pacing) => lines.push(format!(
            "Goal status: {} ({:.1}% achieved)",
            pacing.status.as_str(),
            pacing.percent_achieved
        )),
        None => lines.push("No goal set for this month.".to_string()),
    }

    if data.underperformers.is_empty() {
        lines.push("No employees below their individual target.".to_string());
    } else {
        lines.push("Below individual target:".to_string());
        for employee in &data.underperformers {
            lines.push(format!(
                "  - {} ({:.1}% of {:.2})",
                employee.name, employee.percent_achieved, employee.monthly_target
            ));
        }
    }

    if !data.no_sales.is_empty() {
        lines.push("No sales recorded yet:".to_string());
        for employee in &data.no_sales {
            lines.push(format!("  - {}", employee.name));
        }
    }

    lines.join("\n")
}

async fn email_alerts(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::internal("mail delivery not configured"))?;

    let account = state
        .db
        .accounts()
        .find_one(doc! { "_id": manager.store_id })
        .await?
        .ok_or_else(|| ApiError::not_found("account not found"))?;

    let data = build_alerts(&state, &manager, &params).await?;
    mailer
        .send_text(
            &account.email,
            &mail::alert_summary_subject(data.month, data.year),
            summary_body(&account.store_name, &data),
        )
        .await?;

    Ok(ok(json!({ "sentTo": account.email })))
}
