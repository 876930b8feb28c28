//! Stock evaluation CRUD.
//!
//! Each check records an expected and a counted quantity for an item on
//! a given day; the response carries the derived shortage.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime, Document};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Manager;
use crate::dates;
use crate::error::ApiError;
use crate::models::StockCheck;
use crate::pagination::{self, PageParams};
use crate::routes::{non_empty, non_negative, ok, parse_object_id, stored_day};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCheckPayload {
    item: String,
    expected_qty: f64,
    counted_qty: f64,
    date: String,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCheckPayload {
    #[serde(default)]
    item: Option<String>,
    #[serde(default)]
    expected_qty: Option<f64>,
    #[serde(default)]
    counted_qty: Option<f64>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

fn check_json(check: &StockCheck) -> Value {
    json!({
        "id": check.id.map(|id| id.to_hex()),
        "item": check.item,
        "expectedQty": check.expected_qty,
        "countedQty": check.counted_qty,
        "shortage": check.shortage(),
        "date": stored_day(&check.date),
        "note": check.note,
    })
}

async fn list(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    let page = pagination::resolve(&params, state.config.max_page_size);
    let filter = doc! { "store_id": manager.store_id };

    let total = state
        .db
        .stock_checks()
        .count_documents(filter.clone())
        .await?;
    let checks: Vec<StockCheck> = state
        .db
        .stock_checks()
        .find(filter)
        .sort(doc! { "date": -1 })
        .skip(page.skip())
        .limit(page.limit())
        .await?
        .try_collect()
        .await?;

    let data: Vec<Value> = checks.iter().map(check_json).collect();
    Ok(Json(pagination::envelope(json!(data), &page, total)))
}

async fn create(
    manager: Manager,
    State(state): State<SharedState>,
    Json(payload): Json<CreateCheckPayload>,
) -> Result<Json<Value>, ApiError> {
    let item = non_empty(&payload.item, "item")?;
    let expected_qty = non_negative(payload.expected_qty, "expectedQty")?;
    let counted_qty = non_negative(payload.counted_qty, "countedQty")?;
    let date = dates::normalize_date(&payload.date)?;

    let mut check = StockCheck {
        id: None,
        store_id: manager.store_id,
        item,
        expected_qty,
        counted_qty,
        date: DateTime::from_chrono(date),
        note: payload
            .note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty()),
        created_at: DateTime::now(),
    };

    let inserted = state.db.stock_checks().insert_one(&check).await?;
    check.id = inserted.inserted_id.as_object_id();

    Ok(ok(check_json(&check)))
}

async fn update(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCheckPayload>,
) -> Result<Json<Value>, ApiError> {
    let check_id = parse_object_id(&id)?;

    let mut set = Document::new();
    if let Some(item) = payload.item.as_deref() {
        set.insert("item", non_empty(item, "item")?);
    }
    if let Some(expected) = payload.expected_qty {
        set.insert("expected_qty", non_negative(expected, "expectedQty")?);
    }
    if let Some(counted) = payload.counted_qty {
        set.insert("counted_qty", non_negative(counted, "countedQty")?);
    }
    if let Some(raw) = payload.date.as_deref() {
        set.insert("date", DateTime::from_chrono(dates::normalize_date(raw)?));
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
        .stock_checks()
        .find_one_and_update(
            doc! { "_id": check_id, "store_id": manager.store_id },
            doc! { "$set": set },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::not_found("stock check not found"))?;

    Ok(ok(check_json(&updated)))
}

async fn remove(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let check_id = parse_object_id(&id)?;
    let deleted = state
        .db
        .stock_checks()
        .delete_one(doc! { "_id": check_id, "store_id": manager.store_id })
        .await?;
    if deleted.deleted_count == 0 {
        return Err(ApiError::not_found("stock check not found"));
    }
    Ok(ok(json!({ "id": check_id.to_hex(), "deleted": true })))
}
