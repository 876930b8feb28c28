//! Store-direct and commercial sales ledgers.
//!
//! Same lifecycle as employee sales: add and edit only, with a full
//! recomputation of the affected month after every write. The two
//! channels share one handler body parameterized by source.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::Datelike;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime, Document};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::aggregate::SaleSource;
use crate::auth::Manager;
use crate::dates;
use crate::error::ApiError;
use crate::models::SaleDoc;
use crate::recompute::recompute_store_month;
use crate::routes::employees::sale_json;
use crate::routes::{non_negative, ok, parse_object_id, MonthYearParams};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/direct", get(list_direct).post(add_direct))
        .route("/direct/{id}", put(edit_direct))
        .route("/commercial", get(list_commercial).post(add_commercial))
        .route("/commercial/{id}", put(edit_commercial))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddSalePayload {
    date: String,
    amount: f64,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditSalePayload {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    note: Option<String>,
}

async fn list_for_source(
    manager: Manager,
    state: SharedState,
    params: MonthYearParams,
    source: SaleSource,
) -> Result<Json<Value>, ApiError> {
    let (month, year) = params.resolve()?;
    let (start, end) = dates::month_range(month, year);

    let sales: Vec<SaleDoc> = state
        .db
        .sales(source)
        .find(doc! {
            "store_id": manager.store_id,
            "date": {
                "$gte": DateTime::from_chrono(start),
                "$lt": DateTime::from_chrono(end),
            },
        })
        .sort(doc! { "date": 1 })
        .await?
        .try_collect()
        .await?;

    let total: f64 = sales.iter().map(|sale| sale.amount).sum();
    let data: Vec<Value> = sales.iter().map(sale_json).collect();
    Ok(ok(json!({
        "month": month,
        "year": year,
        "source": source.as_str(),
        "total": total,
        "sales": data,
    })))
}

async fn add_for_source(
    manager: Manager,
    state: SharedState,
    payload: AddSalePayload,
    source: SaleSource,
) -> Result<Json<Value>, ApiError> {
    let date = dates::normalize_date(&payload.date)?;
    let amount = non_negative(payload.amount, "amount")?;

    let mut sale = SaleDoc {
        id: None,
        store_id: manager.store_id,
        employee_id: None,
        date: DateTime::from_chrono(date),
        amount,
        note: payload
            .note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty()),
        created_at: DateTime::now(),
    };

    let inserted = state.db.sales(source).insert_one(&sale).await?;
    sale.id = inserted.inserted_id.as_object_id();

    recompute_store_month(&state.db, manager.store_id, date.month(), date.year()).await?;

    info!(
        store = %manager.store_id,
        source = source.as_str(),
        amount,
        "Recorded sale"
    );
    Ok(ok(sale_json(&sale)))
}

async fn edit_for_source(
    manager: Manager,
    state: SharedState,
    id: String,
    payload: EditSalePayload,
    source: SaleSource,
) -> Result<Json<Value>, ApiError> {
    let sale_oid = parse_object_id(&id)?;
    let existing = state
        .db
        .sales(source)
        .find_one(doc! { "_id": sale_oid, "store_id": manager.store_id })
        .await?
        .ok_or_else(|| ApiError::not_found("sale not found"))?;

    let mut set = Document::new();
    let old_date = existing.date.to_chrono();
    let mut new_date = old_date;
    if let Some(raw) = payload.date.as_deref() {
        new_date = dates::normalize_date(raw)?;
        set.insert("date", DateTime::from_chrono(new_date));
    }
    if let Some(amount) = payload.amount {
        set.insert("amount", non_negative(amount, "amount")?);
    }
    if let Some(note) = payload.note.as_deref() {
        let trimmed = note.trim();
        if trimmed.is_empty() {
            set.insert("note", bson::Bson::Null);
        } else {
            set.insert("note", trimmed);
        }
    }
    if set.is_empty() {
        return Err(ApiError::validation("nothing to update"));
    }

    let updated = state
        .db
        .sales(source)
        .find_one_and_update(
            doc! { "_id": sale_oid, "store_id": manager.store_id },
            doc! { "$set": set },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::not_found("sale not found"))?;

    recompute_store_month(&state.db, manager.store_id, old_date.month(), old_date.year()).await?;
    if (new_date.year(), new_date.month()) != (old_date.year(), old_date.month()) {
        recompute_store_month(&state.db, manager.store_id, new_date.month(), new_date.year())
            .await?;
    }

    Ok(ok(sale_json(&updated)))
}

async fn list_direct(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    list_for_source(manager, state, params, SaleSource::StoreDirect).await
}

async fn add_direct(
    manager: Manager,
    State(state): State<SharedState>,
    Json(payload): Json<AddSalePayload>,
) -> Result<Json<Value>, ApiError> {
    add_for_source(manager, state, payload, SaleSource::StoreDirect).await
}

async fn edit_direct(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<EditSalePayload>,
) -> Result<Json<Value>, ApiError> {
    edit_for_source(manager, state, id, payload, SaleSource::StoreDirect).await
}

async fn list_commercial(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    list_for_source(manager, state, params, SaleSource::Commercial).await
}

async fn add_commercial(
    manager: Manager,
    State(state): State<SharedState>,
    Json(payload): Json<AddSalePayload>,
) -> Result<Json<Value>, ApiError> {
    add_for_source(manager, state, payload, SaleSource::Commercial).await
}

async fn edit_commercial(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<EditSalePayload>,
) -> Result<Json<Value>, ApiError> {
    edit_for_source(manager, state, id, payload, SaleSource::Commercial).await
}
