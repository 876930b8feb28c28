//! Monthly sales aggregation.
//!
//! The single place that buckets daily sales by UTC calendar date. Sale
//! records from the three sources (employee-attributed, store-direct,
//! commercial) are folded into per-day buckets keyed `"YYYY-MM-DD"` plus
//! a month total. Pure compute over already-fetched records; the
//! write-back of cached totals lives in `recompute`.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dates;

/// Origin of a daily sale record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaleSource {
    Employee,
    StoreDirect,
    Commercial,
}

impl SaleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::StoreDirect => "storeDirect",
            Self::Commercial => "commercial",
        }
    }
}

/// One dated, amount-bearing sale from any source.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub note: Option<String>,
    pub source: SaleSource,
    /// Hex id of the owning employee, for employee-attributed sales.
    pub employee_id: Option<String>,
}

/// Per-source item retained in a bucket for audit display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketItem {
    pub source: SaleSource,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub total: f64,
    pub count: u64,
    pub items: Vec<BucketItem>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthAggregate {
    /// Buckets keyed `"YYYY-MM-DD"`; BTreeMap keeps days ordered.
    pub per_day: BTreeMap<String, DayBucket>,
    pub month_total: f64,
}

/// Fold sale records into per-day buckets and a month total.
///
/// Inclusion is decided on UTC calendar fields only: a record counts
/// when `UTC_month(date) == month && UTC_year(date) == year`. Records
/// outside the month are skipped, never an error; no input yields an
/// empty bucket map and a zero total.
pub fn aggregate(records: &[SaleRecord], month: u32, year: i32) -> MonthAggregate {
    let mut agg = MonthAggregate::default();
    for record in records {
        if record.date.month() != month || record.date.year() != year {
            continue;
        }
        let bucket = agg.per_day.entry(dates::day_key(&record.date)).or_default();
        bucket.total += record.amount;
        bucket.count += 1;
        bucket.items.push(BucketItem {
            source: record.source,
            amount: record.amount,
            note: record.note.clone(),
            employee_id: record.employee_id.clone(),
        });
        agg.month_total += record.amount;
    }
    agg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::normalize_date;

    fn sale(date: &str, amount: f64, source: SaleSource) -> SaleRecord {
        SaleRecord {
            date: normalize_date(date).expect("test date should parse"),
            amount,
            note: None,
            source,
            employee_id: None,
        }
    }

    #[test]
    fn empty_input_yields_empty_buckets_and_zero_total() {
        let agg = aggregate(&[], 3, 2024);
        assert!(agg.per_day.is_empty());
        assert_eq!(agg.month_total, 0.0);
    }

    #[test]
    fn month_total_equals_sum_of_qualifying_amounts() {
        let records = vec![
            sale("2024-03-01", 100.0, SaleSource::Employee),
            sale("2024-03-15", 250.5, SaleSource::StoreDirect),
            sale("2024-03-15", 49.5, SaleSource::Commercial),
            sale("2024-04-01", 999.0, SaleSource::Employee),
            sale("2023-03-10", 888.0, SaleSource::Employee),
        ];
        let agg = aggregate(&records, 3, 2024);
        assert_eq!(agg.month_total, 400.0);
        assert_eq!(agg.per_day.len(), 2);
    }

    #[test]
    fn buckets_accumulate_total_count_and_tagged_items() {
        let records = vec![
            sale("2024-03-15", 250.5, SaleSource::StoreDirect),
            sale("2024-03-15", 49.5, SaleSource::Commercial),
        ];
        let agg = aggregate(&records, 3, 2024);
        let bucket = agg.per_day.get("2024-03-15").expect("bucket should exist");
        assert_eq!(bucket.total, 300.0);
        assert_eq!(bucket.count, 2);
        assert_eq!(bucket.items.len(), 2);
        assert_eq!(bucket.items[0].source, SaleSource::StoreDirect);
        assert_eq!(bucket.items[1].source, SaleSource::Commercial);
    }

    #[test]
    fn filtering_uses_utc_fields_not_local_time() {
        // 23:30 at UTC-10 on March 31st is 09:30 UTC on April 1st; the
        // record must land in April regardless of host timezone.
        let record = SaleRecord {
            date: normalize_date("2024-03-31T23:30:00-10:00").expect("should parse"),
            amount: 50.0,
            note: None,
            source: SaleSource::Employee,
            employee_id: None,
        };
        let march = aggregate(std::slice::from_ref(&record), 3, 2024);
        let april = aggregate(std::slice::from_ref(&record), 4, 2024);
        assert_eq!(march.month_total, 0.0);
        assert_eq!(april.month_total, 50.0);
        assert!(april.per_day.contains_key("2024-04-01"));
    }

    #[test]
    fn aggregation_is_idempotent_for_identical_input() {
        let records = vec![
            sale("2024-03-01", 10.0, SaleSource::Employee),
            sale("2024-03-02", 20.0, SaleSource::Commercial),
        ];
        let first = aggregate(&records, 3, 2024);
        let second = aggregate(&records, 3, 2024);
        assert_eq!(first.month_total, second.month_total);
        assert_eq!(
            first.per_day.keys().collect::<Vec<_>>(),
            second.per_day.keys().collect::<Vec<_>>()
        );
        for (key, bucket) in &first.per_day {
            let other = &second.per_day[key];
            assert_eq!(bucket.total, other.total);
            assert_eq!(bucket.count, other.count);
        }
    }

    #[test]
    fn zero_amount_records_still_count() {
        let records = vec![sale("2024-03-05", 0.0, SaleSource::Employee)];
        let agg = aggregate(&records, 3, 2024);
        assert_eq!(agg.month_total, 0.0);
        assert_eq!(agg.per_day["2024-03-05"].count, 1);
    }
}
