//! Manager dashboard views.
//!
//! Read-only: fetches the month's sales once, runs the aggregator and
//! evaluator, and builds the presenter lists. Nothing here writes.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use serde_json::{json, Value};

use crate::aggregate;
use crate::auth::Manager;
use crate::error::ApiError;
use crate::models::Employee;
use crate::pacing;
use crate::presenters;
use crate::routes::{employee_month_summaries, ok, MonthYearParams};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(overview))
        .route("/daily", get(daily))
}

async fn overview(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    let (month, year) = params.resolve()?;

    let sales = state
        .db
        .sales_for_month(manager.store_id, month, year)
        .await?;
    let records = sales.to_records();
    let agg = aggregate::aggregate(&records, month, year);

    let goal = state
        .db
        .goals()
        .find_one(doc! {
            "store_id": manager.store_id,
            "month": month as i32,
            "year": year,
        })
        .await?;
    let evaluation = goal.as_ref().map(|goal| {
        pacing::evaluate(
            agg.month_total,
            goal.target_amount,
            month,
            year,
            Utc::now().date_naive(),
        )
    });

    let employees: Vec<Employee> = state
        .db
        .employees()
        .find(doc! { "store_id": manager.store_id })
        .await?
        .try_collect()
        .await?;
    let summaries = employee_month_summaries(&employees, &sales);

    let top_performers = presenters::top_performers(&summaries, &state.config.sales_roles);
    let birthdays = presenters::birthday_reminders(&summaries, month);

    Ok(ok(json!({
        "month": month,
        "year": year,
        "monthTotal": agg.month_total,
        "perDay": agg.per_day,
        "goal": goal.map(|goal| json!({
            "id": goal.id.map(|id| id.to_hex()),
            "targetAmount": goal.target_amount,
            "cachedTotal": goal.cached_total,
        })),
        "pacing": evaluation,
        "topPerformers": top_performers,
        "birthdays": birthdays,
    })))
}

async fn daily(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    let (month, year) = params.resolve()?;

    let sales = state
        .db
        .sales_for_month(manager.store_id, month, year)
        .await?;
    let agg = aggregate::aggregate(&sales.to_records(), month, year);

    Ok(ok(json!({
        "month": month,
        "year": year,
        "monthTotal": agg.month_total,
        "perDay": agg.per_day,
    })))
}
