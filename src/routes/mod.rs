//! HTTP route wiring and shared handler helpers.
//!
//! One file per resource. Handlers authenticate through the `Manager` /
//! `Owner` extractors, scope every query to the tenant and answer with
//! the `{ "success": true, "data": ... }` envelope.

use axum::{routing::get, Json, Router};
use chrono::{Datelike, Utc};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dates;
use crate::db::MonthSales;
use crate::error::ApiError;
use crate::models::Employee;
use crate::presenters::EmployeeMonth;
use crate::state::SharedState;

pub mod agenda;
pub mod alerts;
pub mod auth;
pub mod backup;
pub mod cleaning;
pub mod dashboard;
pub mod employees;
pub mod export;
pub mod goals;
pub mod owner;
pub mod sales;
pub mod stock;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .nest("/api/auth", auth::routes())
        .nest("/api/employees", employees::routes())
        .nest("/api/goals", goals::routes())
        .nest("/api/sales", sales::routes())
        .nest("/api/dashboard", dashboard::routes())
        .nest("/api/alerts", alerts::routes())
        .nest("/api/owner", owner::routes())
        .nest("/api/cleaning", cleaning::routes())
        .nest("/api/stock", stock::routes())
        .nest("/api/agenda", agenda::routes())
        .nest("/api/export", export::routes())
        .nest("/api/backup", backup::routes())
        .route("/api/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Success envelope every handler answers with.
pub(crate) fn ok(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub(crate) fn parse_object_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| ApiError::validation(format!("invalid id '{}'", raw.trim())))
}

pub(crate) fn non_empty(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn non_negative(amount: f64, field: &str) -> Result<f64, ApiError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(amount)
}

/// `?month=&year=` query pair, defaulting to the current UTC month.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MonthYearParams {
    pub month: Option<i64>,
    pub year: Option<i64>,
}

impl MonthYearParams {
    pub fn resolve(&self) -> Result<(u32, i32), ApiError> {
        let now = Utc::now();
        let month = match self.month {
            Some(raw) => dates::validate_month(raw)?,
            None => now.month(),
        };
        let year = match self.year {
            Some(raw) if (1970..=9999).contains(&raw) => raw as i32,
            Some(raw) => {
                return Err(ApiError::validation(format!("year out of range: {raw}")));
            }
            None => now.year(),
        };
        Ok((month, year))
    }
}

/// Day-key (`YYYY-MM-DD`) of a stored noon-pinned date.
pub(crate) fn stored_day(date: &bson::DateTime) -> String {
    dates::day_key(&date.to_chrono())
}

/// Build the per-employee month summaries the presenters consume.
pub(crate) fn employee_month_summaries(
    employees: &[Employee],
    sales: &MonthSales,
) -> Vec<EmployeeMonth> {
    let totals = sales.employee_totals();
    employees
        .iter()
        .filter(|employee| employee.active)
        .filter_map(|employee| {
            let id = employee.id?;
            let (total, count) = totals.get(&id).copied().unwrap_or((0.0, 0));
            Some(EmployeeMonth {
                id: id.to_hex(),
                name: employee.name.clone(),
                role_label: employee.role_label.clone(),
                monthly_total: total,
                monthly_target: employee.monthly_target,
                sale_count: count,
                birth_date: employee
                    .birth_date
                    .map(|date| date.to_chrono().date_naive()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_year_params_validate_ranges() {
        let params = MonthYearParams {
            month: Some(13),
            year: Some(2024),
        };
        assert!(params.resolve().is_err());

        let params = MonthYearParams {
            month: Some(6),
            year: Some(-5),
        };
        assert!(params.resolve().is_err());

        let params = MonthYearParams {
            month: Some(6),
            year: Some(2024),
        };
        assert_eq!(params.resolve().unwrap(), (6, 2024));
    }

    #[test]
    fn month_year_params_default_to_today() {
        let (month, year) = MonthYearParams::default().resolve().unwrap();
        let now = Utc::now();
        assert_eq!(month, now.month());
        assert_eq!(year, now.year());
    }

    #[test]
    fn object_id_parsing_rejects_junk() {
        assert!(parse_object_id("not-an-id").is_err());
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn non_negative_rejects_nan_and_negatives() {
        assert!(non_negative(f64::NAN, "amount").is_err());
        assert!(non_negative(-1.0, "amount").is_err());
        assert_eq!(non_negative(0.0, "amount").unwrap(), 0.0);
    }
}
