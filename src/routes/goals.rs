//! Monthly goal CRUD.
//!
//! One goal per `(store, month, year)`, enforced by the unique index;
//! a duplicate insert surfaces as a 409. `cached_total` is recomputed
//! right after creation so goals added mid-month pick up existing
//! sales immediately.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{Datelike, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::Manager;
use crate::dates;
use crate::error::ApiError;
use crate::models::MonthlyGoal;
use crate::pacing;
use crate::recompute::recompute_store_month;
use crate::routes::{non_negative, ok, parse_object_id};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/current", get(current))
        .route("/{id}", put(update))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGoalPayload {
    month: i64,
    year: i64,
    target_amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateGoalPayload {
    target_amount: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ListGoalsParams {
    year: Option<i64>,
}

fn goal_json(goal: &MonthlyGoal) -> Value {
    json!({
        "id": goal.id.map(|id| id.to_hex()),
        "month": goal.month,
        "year": goal.year,
        "targetAmount": goal.target_amount,
        "cachedTotal": goal.cached_total,
    })
}

async fn list(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<ListGoalsParams>,
) -> Result<Json<Value>, ApiError> {
    let mut filter = doc! { "store_id": manager.store_id };
    if let Some(year) = params.year {
        filter.insert("year", year as i32);
    }

    let goals: Vec<MonthlyGoal> = state
        .db
        .goals()
        .find(filter)
        .sort(doc! { "year": -1, "month": 1 })
        .await?
        .try_collect()
        .await?;

    let data: Vec<Value> = goals.iter().map(goal_json).collect();
    Ok(ok(json!(data)))
}

async fn create(
    manager: Manager,
    State(state): State<SharedState>,
    Json(payload): Json<CreateGoalPayload>,
) -> Result<Json<Value>, ApiError> {
    let month = dates::validate_month(payload.month)?;
    if !(1970..=9999).contains(&payload.year) {
        return Err(ApiError::validation(format!(
            "year out of range: {}",
            payload.year
        )));
    }
    let year = payload.year as i32;
    let target_amount = non_negative(payload.target_amount, "targetAmount")?;

    let mut goal = MonthlyGoal {
        id: None,
        store_id: manager.store_id,
        month: month as i32,
        year,
        target_amount,
        cached_total: 0.0,
        created_at: DateTime::now(),
    };

    let inserted = state.db.goals().insert_one(&goal).await.map_err(|err| {
        let mapped: ApiError = err.into();
        match mapped {
            ApiError::Conflict(_) => {
                ApiError::conflict(format!("goal already exists for {month:02}/{year}"))
            }
            other => other,
        }
    })?;
    goal.id = inserted.inserted_id.as_object_id();

    // Sales recorded before the goal existed count immediately.
    goal.cached_total = recompute_store_month(&state.db, manager.store_id, month, year).await?;

    info!(store = %manager.store_id, month, year, target_amount, "Created monthly goal");
    Ok(ok(goal_json(&goal)))
}

async fn update(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateGoalPayload>,
) -> Result<Json<Value>, ApiError> {
    let goal_id = parse_object_id(&id)?;
    let target_amount = non_negative(payload.target_amount, "targetAmount")?;

    let updated = state
        .db
        .goals()
        .find_one_and_update(
            doc! { "_id": goal_id, "store_id": manager.store_id },
            doc! { "$set": { "target_amount": target_amount } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::not_found("goal not found"))?;

    Ok(ok(goal_json(&updated)))
}

async fn current(
    manager: Manager,
    State(state): State<SharedState>,
) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let (month, year) = (now.month(), now.year());

    let goal = state
        .db
        .goals()
        .find_one(doc! {
            "store_id": manager.store_id,
            "month": month as i32,
            "year": year,
        })
        .await?;

    // No goal for the month: report that plainly, never evaluate
    // against a synthetic zero target.
    let Some(goal) = goal else {
        return Ok(ok(json!({ "month": month, "year": year, "goal": null })));
    };

    let evaluation = pacing::evaluate(
        goal.cached_total,
        goal.target_amount,
        month,
        year,
        now.date_naive(),
    );

    Ok(ok(json!({
        "month": month,
        "year": year,
        "goal": goal_json(&goal),
        "pacing": evaluation,
    })))
}
