//! Post-mutation recomputation of denormalized totals.
//!
//! The single write-back path for `MonthlyGoal.cached_total` and the
//! employee rollups. Every handler that mutates a daily sale calls
//! `recompute_store_month` afterwards instead of patching totals
//! incrementally. Idempotent: running it twice with no intervening
//! writes produces the same stored values.
//!
//! The sale write and this recomputation are two sequential,
//! independently-committed writes with no multi-document transaction;
//! a crash in between leaves the cache stale until the next mutation
//! recomputes it.

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use tracing::info;

use crate::aggregate;
use crate::db::Db;
use crate::error::ApiError;

/// Recompute the cached month total and the employee rollups for one
/// store and month. Returns the recomputed month total.
pub async fn recompute_store_month(
    db: &Db,
    store_id: ObjectId,
    month: u32,
    year: i32,
) -> Result<f64, ApiError> {
    let sales = db.sales_for_month(store_id, month, year).await?;
    let records = sales.to_records();
    let agg = aggregate::aggregate(&records, month, year);

    // The cache is overwritten, never merged. A missing goal for the
    // month simply matches nothing.
    db.goals()
        .update_one(
            doc! { "store_id": store_id, "month": month as i32, "year": year },
            doc! { "$set": { "cached_total": agg.month_total } },
        )
        .await?;

    let totals = sales.employee_totals();
    let employee_ids: Vec<ObjectId> = db
        .employees()
        .find(doc! { "store_id": store_id })
        .await?
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .filter_map(|employee| employee.id)
        .collect();

    for employee_id in employee_ids {
        let (amount, _count) = totals.get(&employee_id).copied().unwrap_or((0.0, 0));
        db.employees()
            .update_one(
                doc! { "_id": employee_id, "store_id": store_id },
                doc! { "$set": { "rollup": {
                    "month": month as i32,
                    "year": year,
                    "amount": amount,
                } } },
            )
            .await?;
    }

    info!(
        store = %store_id,
        month,
        year,
        total = agg.month_total,
        "Recomputed monthly totals"
    );

    Ok(agg.month_total)
}
