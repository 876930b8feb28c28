//! Calendar / agenda CRUD.
//!
//! Event dates go through the same noon-pinning as sales so that a
//! month view built on UTC fields never drifts a day against what the
//! manager typed in.

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
use crate::models::CalendarEvent;
use crate::pagination::{self, PageParams};
use crate::routes::{non_empty, ok, parse_object_id, stored_day, MonthYearParams};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/month", get(month_view))
        .route("/{id}", put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventPayload {
    title: String,
    date: String,
    #[serde(default)]
    time_label: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEventPayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    time_label: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn event_json(event: &CalendarEvent) -> Value {
    json!({
        "id": event.id.map(|id| id.to_hex()),
        "title": event.title,
        "date": stored_day(&event.date),
        "timeLabel": event.time_label,
        "description": event.description,
    })
}

fn clean_opt(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
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
        .calendar_events()
        .count_documents(filter.clone())
        .await?;
    let events: Vec<CalendarEvent> = state
        .db
        .calendar_events()
        .find(filter)
        .sort(doc! { "date": 1 })
        .skip(page.skip())
        .limit(page.limit())
        .await?
        .try_collect()
        .await?;

    let data: Vec<Value> = events.iter().map(event_json).collect();
    Ok(Json(pagination::envelope(json!(data), &page, total)))
}

async fn month_view(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    let (month, year) = params.resolve()?;
    let (start, end) = dates::month_range(month, year);

    let events: Vec<CalendarEvent> = state
        .db
        .calendar_events()
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

    let data: Vec<Value> = events.iter().map(event_json).collect();
    Ok(ok(json!({ "month": month, "year": year, "events": data })))
}

async fn create(
    manager: Manager,
    State(state): State<SharedState>,
    Json(payload): Json<CreateEventPayload>,
) -> Result<Json<Value>, ApiError> {
    let title = non_empty(&payload.title, "title")?;
    let date = dates::normalize_date(&payload.date)?;

    let mut event = CalendarEvent {
        id: None,
        store_id: manager.store_id,
        title,
        date: DateTime::from_chrono(date),
        time_label: clean_opt(payload.time_label),
        description: clean_opt(payload.description),
        created_at: DateTime::now(),
    };

    let inserted = state.db.calendar_events().insert_one(&event).await?;
    event.id = inserted.inserted_id.as_object_id();

    Ok(ok(event_json(&event)))
}

async fn update(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateEventPayload>,
) -> Result<Json<Value>, ApiError> {
    let event_id = parse_object_id(&id)?;

    let mut set = Document::new();
    if let Some(title) = payload.title.as_deref() {
        set.insert("title", non_empty(title, "title")?);
    }
    if let Some(raw) = payload.date.as_deref() {
        set.insert("date", DateTime::from_chrono(dates::normalize_date(raw)?));
    }
    if let Some(label) = payload.time_label.as_deref() {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            set.insert("time_label", bson::Bson::Null);
        } else {
            set.insert("time_label", trimmed);
        }
    }
    if let Some(description) = payload.description.as_deref() {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            set.insert("description", bson::Bson::Null);
        } else {
            set.insert("description", trimmed);
        }
    }
    if set.is_empty() {
        return Err(ApiError::validation("nothing to update"));
    }

    let updated = state
        .db
        .calendar_events()
        .find_one_and_update(
            doc! { "_id": event_id, "store_id": manager.store_id },
            doc! { "$set": set },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::not_found("event not found"))?;

    Ok(ok(event_json(&updated)))
}

async fn remove(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let event_id = parse_object_id(&id)?;
    let deleted = state
        .db
        .calendar_events()
        .delete_one(doc! { "_id": event_id, "store_id": manager.store_id })
        .await?;
    if deleted.deleted_count == 0 {
        return Err(ApiError::not_found("event not found"));
    }
    Ok(ok(json!({ "id": event_id.to_hex(), "deleted": true })))
}
