//! Cleaning schedule CRUD.
//!
//! Assignees are either a registered employee (validated against the
//! tenant's employee list) or an ad-hoc name typed in by the manager.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, DateTime, Document};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Manager;
use crate::error::ApiError;
use crate::models::{Assignee, CleaningTask};
use crate::pagination::{self, PageParams};
use crate::routes::{non_empty, ok, parse_object_id};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssigneePayload {
    kind: String,
    #[serde(default)]
    employee_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskPayload {
    area: String,
    weekday: i64,
    assignee: AssigneePayload,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTaskPayload {
    #[serde(default)]
    area: Option<String>,
    #[serde(default)]
    weekday: Option<i64>,
    #[serde(default)]
    assignee: Option<AssigneePayload>,
    #[serde(default)]
    note: Option<String>,
}

fn validate_weekday(weekday: i64) -> Result<i32, ApiError> {
    if (0..=6).contains(&weekday) {
        Ok(weekday as i32)
    } else {
        Err(ApiError::validation(format!(
            "weekday must be between 0 (Sunday) and 6 (Saturday), got {weekday}"
        )))
    }
}

async fn resolve_assignee(
    state: &SharedState,
    manager: &Manager,
    payload: &AssigneePayload,
) -> Result<Assignee, ApiError> {
    match payload.kind.as_str() {
        "registered" => {
            let raw = payload
                .employee_id
                .as_deref()
                .ok_or_else(|| ApiError::validation("registered assignee needs employeeId"))?;
            let employee_id = parse_object_id(raw)?;
            state
                .db
                .employees()
                .find_one(doc! { "_id": employee_id, "store_id": manager.store_id })
                .await?
                .ok_or_else(|| ApiError::not_found("assignee employee not found"))?;
            Ok(Assignee::Registered { employee_id })
        }
        "adHoc" => {
            let name = payload
                .name
                .as_deref()
                .ok_or_else(|| ApiError::validation("adHoc assignee needs a name"))?;
            Ok(Assignee::AdHoc {
                name: non_empty(name, "assignee name")?,
            })
        }
        other => Err(ApiError::validation(format!(
            "assignee kind must be 'registered' or 'adHoc', got '{other}'"
        ))),
    }
}

fn assignee_json(assignee: &Assignee) -> Value {
    match assignee {
        Assignee::Registered { employee_id } => json!({
            "kind": "registered",
            "employeeId": employee_id.to_hex(),
        }),
        Assignee::AdHoc { name } => json!({
            "kind": "adHoc",
            "name": name,
        }),
    }
}

fn task_json(task: &CleaningTask) -> Value {
    json!({
        "id": task.id.map(|id| id.to_hex()),
        "area": task.area,
        "weekday": task.weekday,
        "assignee": assignee_json(&task.assignee),
        "note": task.note,
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
        .cleaning_tasks()
        .count_documents(filter.clone())
        .await?;
    let tasks: Vec<CleaningTask> = state
        .db
        .cleaning_tasks()
        .find(filter)
        .sort(doc! { "weekday": 1, "area": 1 })
        .skip(page.skip())
        .limit(page.limit())
        .await?
        .try_collect()
        .await?;

    let data: Vec<Value> = tasks.iter().map(task_json).collect();
    Ok(Json(pagination::envelope(json!(data), &page, total)))
}

async fn create(
    manager: Manager,
    State(state): State<SharedState>,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<Json<Value>, ApiError> {
    let area = non_empty(&payload.area, "area")?;
    let weekday = validate_weekday(payload.weekday)?;
    let assignee = resolve_assignee(&state, &manager, &payload.assignee).await?;

    let mut task = CleaningTask {
        id: None,
        store_id: manager.store_id,
        area,
        weekday,
        assignee,
        note: payload
            .note
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty()),
        created_at: DateTime::now(),
    };

    let inserted = state.db.cleaning_tasks().insert_one(&task).await?;
    task.id = inserted.inserted_id.as_object_id();

    Ok(ok(task_json(&task)))
}

async fn update(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<Json<Value>, ApiError> {
    let task_id = parse_object_id(&id)?;

    let mut set = Document::new();
    if let Some(area) = payload.area.as_deref() {
        set.insert("area", non_empty(area, "area")?);
    }
    if let Some(weekday) = payload.weekday {
        set.insert("weekday", validate_weekday(weekday)?);
    }
    if let Some(assignee_payload) = payload.assignee.as_ref() {
        let assignee = resolve_assignee(&state, &manager, assignee_payload).await?;
        set.insert(
            "assignee",
            to_bson(&assignee).map_err(|err| ApiError::internal(format!("encode assignee: {err}")))?,
        );
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
        .cleaning_tasks()
        .find_one_and_update(
            doc! { "_id": task_id, "store_id": manager.store_id },
            doc! { "$set": set },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::not_found("cleaning task not found"))?;

    Ok(ok(task_json(&updated)))
}

async fn remove(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task_id = parse_object_id(&id)?;
    let deleted = state
        .db
        .cleaning_tasks()
        .delete_one(doc! { "_id": task_id, "store_id": manager.store_id })
        .await?;
    if deleted.deleted_count == 0 {
        return Err(ApiError::not_found("cleaning task not found"));
    }
    Ok(ok(json!({ "id": task_id.to_hex(), "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_bounds_are_enforced() {
        assert_eq!(validate_weekday(0).unwrap(), 0);
        assert_eq!(validate_weekday(6).unwrap(), 6);
        assert!(validate_weekday(7).is_err());
        assert!(validate_weekday(-1).is_err());
    }

    #[test]
    fn assignee_json_shapes_both_variants() {
        let employee_id = mongodb::bson::oid::ObjectId::new();
        let registered = assignee_json(&Assignee::Registered { employee_id });
        assert_eq!(registered["kind"], "registered");
        assert_eq!(registered["employeeId"], employee_id.to_hex());

        let ad_hoc = assignee_json(&Assignee::AdHoc {
            name: "Weekend crew".to_string(),
        });
        assert_eq!(ad_hoc["kind"], "adHoc");
        assert_eq!(ad_hoc["name"], "Weekend crew");
    }
}
