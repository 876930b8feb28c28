//! CSV export endpoint.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::TryStreamExt;
use mongodb::bson::doc;
use std::collections::HashMap;

use crate::auth::Manager;
use crate::error::ApiError;
use crate::export::sales_csv;
use crate::models::Employee;
use crate::routes::MonthYearParams;
use crate::state::SharedState;

pub fn routes() -> Router<SharedState> {
    Router::new().route("/sales.csv", get(sales_export))
}

async fn sales_export(
    manager: Manager,
    State(state): State<SharedState>,
    Query(params): Query<MonthYearParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (month, year) = params.resolve()?;

    let sales = state
        .db
        .sales_for_month(manager.store_id, month, year)
        .await?;
    let records = sales.to_records();

    let employees: Vec<Employee> = state
        .db
        .employees()
        .find(doc! { "store_id": manager.store_id })
        .await?
        .try_collect()
        .await?;
    let names: HashMap<String, String> = employees
        .into_iter()
        .filter_map(|employee| employee.id.map(|id| (id.to_hex(), employee.name)))
        .collect();

    let csv = sales_csv(&records, &names);
    let file_name = format!("sales-{year}-{month:02}.csv");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        csv,
    ))
}
