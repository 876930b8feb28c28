//! Owner views across all tenants.
//!
//! The only place queries span stores, and they do it by explicitly
//! enumerating the manager accounts rather than dropping the tenant
//! filter anywhere else.

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
use crate::auth::Owner;
use crate::error::ApiError;
use crate::models::{Account, ROLE_MANAGER};
use crate::pacing;
use crate::routes::{ok, MonthYearParams};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/stores", get(stores))
        .route("/summary", get(summary))
}

struct StoreMonth {
    account: Account,
    month_total: f64,
    target_amount: Option<f64>,
    pacing: Option<pacing::Pacing>,
}

async fn store_months(
    state: &SharedState,
    month: u32,
    year: i32,
) -> Result<Vec<StoreMonth>, ApiError> {
    let managers: Vec<Account> = state
        .db
        .accounts()
        .find(doc! { "role": ROLE_MANAGER })
        .sort(doc! { "store_name": 1 })
        .await?
        .try_collect()
        .await?;

    let today = Utc::now().date_naive();
    let mut result = Vec::with_capacity(managers.len());
    for account in managers {
        let Some(store_id) = account.id else {
            continue;
        };
        let sales = state.db.sales_for_month(store_id, month, year).await?;
        let agg = aggregate::aggregate(&sales.to_records(), month, year);

        let goal = state
            .db
            .goals()
            .find_one(doc! { "store_id": store_id, "month": month as i32, "year": year })
            .await?;
        let target_amount = goal.as_ref().map(|goal| goal.target_amount);
        let evaluation = goal
            .as_ref()
            .map(|goal| pacing::evaluate(agg.month_total, goal.target_amount, month, year, today));

        result.push(StoreMonth {
            account,
            month_total: agg.month_total,
            target_amount,
            pacing: evaluation,
        });
    }
    Ok(result)
}

async fn stores(
    _owner: Owner,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    let (month, year) = params.resolve()?;
    let months = store_months(&state, month, year).await?;

    let data: Vec<Value> = months
        .iter()
        .map(|store| {
            json!({
                "storeId": store.account.id.map(|id| id.to_hex()),
                "storeName": store.account.store_name,
                "manager": store.account.name,
                "monthTotal": store.month_total,
                "targetAmount": store.target_amount,
                "pacing": store.pacing,
            })
        })
        .collect();

    Ok(ok(json!({ "month": month, "year": year, "stores": data })))
}

async fn summary(
    _owner: Owner,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    let (month, year) = params.resolve()?;
    let months = store_months(&state, month, year).await?;

    let total: f64 = months.iter().map(|store| store.month_total).sum();
    let combined_target: f64 = months
        .iter()
        .filter_map(|store| store.target_amount)
        .sum();
    let goals_met = months
        .iter()
        .filter(|store| {
            matches!(
                store.pacing.as_ref().map(|pacing| pacing.status),
                Some(pacing::PacingStatus::GoalMet)
            )
        })
        .count();

    Ok(ok(json!({
        "month": month,
        "year": year,
        "storeCount": months.len(),
        "monthTotal": total,
        "combinedTarget": combined_target,
        "goalsMet": goals_met,
    })))
}
