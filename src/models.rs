//! MongoDB document models.
//!
//! Every document except the accounts themselves carries `store_id`,
//! the tenant key. A manager account *is* the store: its `_id` doubles
//! as the tenant identifier on all owned documents.

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_OWNER: &str = "owner";

/// Manager or owner account. Managers own one store each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub store_name: String,
    pub created_at: DateTime,
}

/// Denormalized current-month rollup kept in sync with the employee's
/// sale records; recomputed after every sale mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rollup {
    pub month: i32,
    pub year: i32,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub store_id: ObjectId,
    pub name: String,
    pub role_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<DateTime>,
    pub monthly_target: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollup: Option<Rollup>,
    pub active: bool,
    pub created_at: DateTime,
}

/// One daily sale record. Lives in one of three collections depending
/// on its source; `employee_id` is set only for employee-attributed
/// sales. Dates are pinned to 12:00 UTC before they get here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub store_id: ObjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<ObjectId>,
    pub date: DateTime,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime,
}

/// A store's sales target for one calendar month. Unique per
/// `(store_id, month, year)`. `cached_total` is a cache recomputed
/// after every contributing sale mutation, never a source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyGoal {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub store_id: ObjectId,
    pub month: i32,
    pub year: i32,
    pub target_amount: f64,
    pub cached_total: f64,
    pub created_at: DateTime,
}

/// Cleaning-task assignee: either a registered employee or an ad-hoc
/// name typed in by the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Assignee {
    Registered {
        #[serde(rename = "employeeId")]
        employee_id: ObjectId,
    },
    AdHoc {
        name: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningTask {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub store_id: ObjectId,
    pub area: String,
    /// 0 = Sunday .. 6 = Saturday.
    pub weekday: i32,
    pub assignee: Assignee,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCheck {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub store_id: ObjectId,
    pub item: String,
    pub expected_qty: f64,
    pub counted_qty: f64,
    pub date: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime,
}

impl StockCheck {
    /// Missing quantity, floored at zero (overcounts are not negative
    /// shortages).
    pub fn shortage(&self) -> f64 {
        (self.expected_qty - self.counted_qty).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub store_id: ObjectId,
    pub title: String,
    pub date: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime,
}

/// Single-use password-reset token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetToken {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub account_id: ObjectId,
    pub token: String,
    pub expires_at: DateTime,
    pub created_at: DateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignee_round_trips_through_tagged_json() {
        let registered = Assignee::Registered {
            employee_id: ObjectId::new(),
        };
        let json = serde_json::to_value(&registered).unwrap();
        assert_eq!(json["kind"], "registered");
        let back: Assignee = serde_json::from_value(json).unwrap();
        assert_eq!(back, registered);

        let ad_hoc = Assignee::AdHoc {
            name: "Weekend crew".to_string(),
        };
        let json = serde_json::to_value(&ad_hoc).unwrap();
        assert_eq!(json["kind"], "adHoc");
        assert_eq!(json["name"], "Weekend crew");
        let back: Assignee = serde_json::from_value(json).unwrap();
        assert_eq!(back, ad_hoc);
    }

    #[test]
    fn stock_shortage_floors_at_zero() {
        let check = StockCheck {
            id: None,
            store_id: ObjectId::new(),
            item: "espresso beans".to_string(),
            expected_qty: 10.0,
            counted_qty: 12.0,
            date: DateTime::now(),
            note: None,
            created_at: DateTime::now(),
        };
        assert_eq!(check.shortage(), 0.0);

        let short = StockCheck {
            counted_qty: 4.0,
            ..check
        };
        assert_eq!(short.shortage(), 6.0);
    }
}
