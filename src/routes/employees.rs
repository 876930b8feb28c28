//! Employee CRUD and employee-attributed sales.
//!
//! Sales have no delete: records are added and edited in place, and
//! every mutation triggers a full recomputation of the owning month's
//! cached totals. Removing an employee is a soft delete (`active =
//! false`) so historical sales keep their attribution.

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
use crate::models::{Employee, SaleDoc};
use crate::pagination::{self, PageParams};
use crate::recompute::recompute_store_month;
use crate::routes::{non_empty, non_negative, ok, parse_object_id, stored_day, MonthYearParams};
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_one).put(update).delete(remove))
        .route("/{id}/sales", get(list_sales).post(add_sale))
        .route("/{id}/sales/{sale_id}", put(edit_sale))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEmployeePayload {
    name: String,
    role_label: String,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    monthly_target: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEmployeePayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    role_label: Option<String>,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    monthly_target: Option<f64>,
    #[serde(default)]
    active: Option<bool>,
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

fn employee_json(employee: &Employee) -> Value {
    json!({
        "id": employee.id.map(|id| id.to_hex()),
        "name": employee.name,
        "roleLabel": employee.role_label,
        "birthDate": employee.birth_date.as_ref().map(stored_day),
        "monthlyTarget": employee.monthly_target,
        "rollup": employee.rollup.as_ref().map(|rollup| json!({
            "month": rollup.month,
            "year": rollup.year,
            "amount": rollup.amount,
        })),
        "active": employee.active,
    })
}

pub(crate) fn sale_json(sale: &SaleDoc) -> Value {
    json!({
        "id": sale.id.map(|id| id.to_hex()),
        "employeeId": sale.employee_id.map(|id| id.to_hex()),
        "date": stored_day(&sale.date),
        "amount": sale.amount,
        "note": sale.note,
    })
}

async fn find_owned_employee(
    state: &SharedState,
    manager: &Manager,
    id: &str,
) -> Result<Employee, ApiError> {
    let employee_id = parse_object_id(id)?;
    state
        .db
        .employees()
        .find_one(doc! { "_id": employee_id, "store_id": manager.store_id })
        .await?
        .ok_or_else(|| ApiError::not_found("employee not found"))
}

async fn list(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, ApiError> {
    let page = pagination::resolve(&params, state.config.max_page_size);
    let filter = doc! { "store_id": manager.store_id };

    let total = state.db.employees().count_documents(filter.clone()).await?;
    let employees: Vec<Employee> = state
        .db
        .employees()
        .find(filter)
        .sort(doc! { "name": 1 })
        .skip(page.skip())
        .limit(page.limit())
        .await?
        .try_collect()
        .await?;

    let data: Vec<Value> = employees.iter().map(employee_json).collect();
    Ok(Json(pagination::envelope(json!(data), &page, total)))
}

async fn create(
    manager: Manager,
    State(state): State<SharedState>,
    Json(payload): Json<CreateEmployeePayload>,
) -> Result<Json<Value>, ApiError> {
    let name = non_empty(&payload.name, "name")?;
    let role_label = non_empty(&payload.role_label, "roleLabel")?;
    let monthly_target = non_negative(payload.monthly_target.unwrap_or(0.0), "monthlyTarget")?;
    let birth_date = payload
        .birth_date
        .as_deref()
        .map(dates::normalize_date)
        .transpose()?
        .map(DateTime::from_chrono);

    let mut employee = Employee {
        id: None,
        store_id: manager.store_id,
        name,
        role_label,
        birth_date,
        monthly_target,
        rollup: None,
        active: true,
        created_at: DateTime::now(),
    };

    let inserted = state.db.employees().insert_one(&employee).await?;
    employee.id = inserted.inserted_id.as_object_id();

    info!(store = %manager.store_id, employee = %employee.name, "Created employee");
    Ok(ok(employee_json(&employee)))
}

async fn get_one(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let employee = find_owned_employee(&state, &manager, &id).await?;
    Ok(ok(employee_json(&employee)))
}

async fn update(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateEmployeePayload>,
) -> Result<Json<Value>, ApiError> {
    let employee = find_owned_employee(&state, &manager, &id).await?;
    let employee_id = employee.id.ok_or_else(|| ApiError::internal("employee missing id"))?;

    let mut set = Document::new();
    if let Some(name) = payload.name.as_deref() {
        set.insert("name", non_empty(name, "name")?);
    }
    if let Some(role_label) = payload.role_label.as_deref() {
        set.insert("role_label", non_empty(role_label, "roleLabel")?);
    }
    if let Some(birth_date) = payload.birth_date.as_deref() {
        set.insert(
            "birth_date",
            DateTime::from_chrono(dates::normalize_date(birth_date)?),
        );
    }
    if let Some(target) = payload.monthly_target {
        set.insert("monthly_target", non_negative(target, "monthlyTarget")?);
    }
    if let Some(active) = payload.active {
        set.insert("active", active);
    }
    if set.is_empty() {
        return Err(ApiError::validation("nothing to update"));
    }

    let updated = state
        .db
        .employees()
        .find_one_and_update(
            doc! { "_id": employee_id, "store_id": manager.store_id },
            doc! { "$set": set },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| ApiError::not_found("employee not found"))?;

    Ok(ok(employee_json(&updated)))
}

async fn remove(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let employee = find_owned_employee(&state, &manager, &id).await?;
    let employee_id = employee.id.ok_or_else(|| ApiError::internal("employee missing id"))?;

    state
        .db
        .employees()
        .update_one(
            doc! { "_id": employee_id, "store_id": manager.store_id },
            doc! { "$set": { "active": false } },
        )
        .await?;

    info!(store = %manager.store_id, employee = %employee_id, "Deactivated employee");
    Ok(ok(json!({ "id": employee_id.to_hex(), "active": false })))
}

async fn list_sales(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<MonthYearParams>,
) -> Result<Json<Value>, ApiError> {
    let employee = find_owned_employee(&state, &manager, &id).await?;
    let employee_id = employee.id.ok_or_else(|| ApiError::internal("employee missing id"))?;
    let (month, year) = params.resolve()?;
    let (start, end) = dates::month_range(month, year);

    let sales: Vec<SaleDoc> = state
        .db
        .sales(SaleSource::Employee)
        .find(doc! {
            "store_id": manager.store_id,
            "employee_id": employee_id,
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
        "total": total,
        "sales": data,
    })))
}

async fn add_sale(
    manager: Manager,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(payload): Json<AddSalePayload>,
) -> Result<Json<Value>, ApiError> {
    let employee = find_owned_employee(&state, &manager, &id).await?;
    if !employee.active {
        return Err(ApiError::validation("employee is inactive"));
    }
    let employee_id = employee.id.ok_or_else(|| ApiError::internal("employee missing id"))?;

    let date = dates::normalize_date(&payload.date)?;
    let amount = non_negative(payload.amount, "amount")?;

    let mut sale = SaleDoc {
        id: None,
        store_id: manager.store_id,
        employee_id: Some(employee_id),
        date: DateTime::from_chrono(date),
        amount,
        note: payload.note.map(|note| note.trim().to_string()).filter(|note| !note.is_empty()),
        created_at: DateTime::now(),
    };

    let inserted = state.db.sales(SaleSource::Employee).insert_one(&sale).await?;
    sale.id = inserted.inserted_id.as_object_id();

    recompute_store_month(&state.db, manager.store_id, date.month(), date.year()).await?;

    info!(
        store = %manager.store_id,
        employee = %employee_id,
        amount,
        "Recorded employee sale"
    );
    Ok(ok(sale_json(&sale)))
}

async fn edit_sale(
    manager: Manager,
    State(state): State<SharedState>,
    Path((id, sale_id)): Path<(String, String)>,
    Json(payload): Json<EditSalePayload>,
) -> Result<Json<Value>, ApiError> {
    let employee = find_owned_employee(&state, &manager, &id).await?;
    let employee_id = employee.id.ok_or_else(|| ApiError::internal("employee missing id"))?;
    let sale_oid = parse_object_id(&sale_id)?;

    let existing = state
        .db
        .sales(SaleSource::Employee)
        .find_one(doc! {
            "_id": sale_oid,
            "store_id": manager.store_id,
            "employee_id": employee_id,
        })
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
        .sales(SaleSource::Employee)
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
