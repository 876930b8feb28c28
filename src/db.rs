//! MongoDB access layer.
//!
//! Owns the database handle, typed collection accessors, and startup
//! index creation. Every collection except `accounts` is tenant-scoped
//! on `store_id`; the unique `(store_id, month, year)` index on goals
//! is what turns a duplicate goal insert into a 409.

use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::IndexOptions,
    Client, Collection, Database, IndexModel,
};
use std::collections::HashMap;
use tracing::info;

use crate::aggregate::{SaleRecord, SaleSource};
use crate::dates;
use crate::models::{
    Account, CalendarEvent, CleaningTask, Employee, MonthlyGoal, ResetToken, SaleDoc, StockCheck,
};

pub const COLL_ACCOUNTS: &str = "accounts";
pub const COLL_EMPLOYEES: &str = "employees";
pub const COLL_EMPLOYEE_SALES: &str = "employee_sales";
pub const COLL_DIRECT_SALES: &str = "direct_sales";
pub const COLL_COMMERCIAL_SALES: &str = "commercial_sales";
pub const COLL_GOALS: &str = "goals";
pub const COLL_CLEANING_TASKS: &str = "cleaning_tasks";
pub const COLL_STOCK_CHECKS: &str = "stock_checks";
pub const COLL_CALENDAR_EVENTS: &str = "calendar_events";
pub const COLL_RESET_TOKENS: &str = "reset_tokens";

/// Collections included in tenant backups, in dump order.
pub const TENANT_COLLECTIONS: &[&str] = &[
    COLL_EMPLOYEES,
    COLL_GOALS,
    COLL_EMPLOYEE_SALES,
    COLL_DIRECT_SALES,
    COLL_COMMERCIAL_SALES,
    COLL_CLEANING_TASKS,
    COLL_STOCK_CHECKS,
    COLL_CALENDAR_EVENTS,
];

#[derive(Clone)]
pub struct Db {
    database: Database,
}

impl Db {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, mongodb::error::Error> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(db_name);
        info!(db = %db_name, "Connected to MongoDB");
        Ok(Self { database })
    }

    pub fn accounts(&self) -> Collection<Account> {
        self.database.collection(COLL_ACCOUNTS)
    }

    pub fn employees(&self) -> Collection<Employee> {
        self.database.collection(COLL_EMPLOYEES)
    }

    pub fn goals(&self) -> Collection<MonthlyGoal> {
        self.database.collection(COLL_GOALS)
    }

    pub fn cleaning_tasks(&self) -> Collection<CleaningTask> {
        self.database.collection(COLL_CLEANING_TASKS)
    }

    pub fn stock_checks(&self) -> Collection<StockCheck> {
        self.database.collection(COLL_STOCK_CHECKS)
    }

    pub fn calendar_events(&self) -> Collection<CalendarEvent> {
        self.database.collection(COLL_CALENDAR_EVENTS)
    }

    pub fn reset_tokens(&self) -> Collection<ResetToken> {
        self.database.collection(COLL_RESET_TOKENS)
    }

    /// The sale collection backing one source.
    pub fn sales(&self, source: SaleSource) -> Collection<SaleDoc> {
        let name = match source {
            SaleSource::Employee => COLL_EMPLOYEE_SALES,
            SaleSource::StoreDirect => COLL_DIRECT_SALES,
            SaleSource::Commercial => COLL_COMMERCIAL_SALES,
        };
        self.database.collection(name)
    }

    /// Untyped handle, used by backup dump/restore.
    pub fn raw_collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    pub async fn ping(&self) -> Result<(), mongodb::error::Error> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
    }

    /// Create the indexes the API relies on. Safe to call on every start.
    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        let unique = IndexOptions::builder().unique(true).build();

        self.accounts()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;

        self.goals()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "store_id": 1, "month": 1, "year": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        for source in [
            SaleSource::Employee,
            SaleSource::StoreDirect,
            SaleSource::Commercial,
        ] {
            self.sales(source)
                .create_index(
                    IndexModel::builder()
                        .keys(doc! { "store_id": 1, "date": 1 })
                        .build(),
                )
                .await?;
        }

        self.employees()
            .create_index(IndexModel::builder().keys(doc! { "store_id": 1 }).build())
            .await?;

        info!("Database indexes ensured");
        Ok(())
    }

    /// Fetch one month of sales from the three source collections,
    /// range-bounded on the stored (noon-pinned) dates.
    pub async fn sales_for_month(
        &self,
        store_id: ObjectId,
        month: u32,
        year: i32,
    ) -> Result<MonthSales, mongodb::error::Error> {
        let (start, end) = dates::month_range(month, year);
        let filter = doc! {
            "store_id": store_id,
            "date": {
                "$gte": bson::DateTime::from_chrono(start),
                "$lt": bson::DateTime::from_chrono(end),
            },
        };

        let employee: Vec<SaleDoc> = self
            .sales(SaleSource::Employee)
            .find(filter.clone())
            .await?
            .try_collect()
            .await?;
        let direct: Vec<SaleDoc> = self
            .sales(SaleSource::StoreDirect)
            .find(filter.clone())
            .await?
            .try_collect()
            .await?;
        let commercial: Vec<SaleDoc> = self
            .sales(SaleSource::Commercial)
            .find(filter)
            .await?
            .try_collect()
            .await?;

        Ok(MonthSales {
            employee,
            direct,
            commercial,
        })
    }
}

/// One fetched month of sales, still split by source.
#[derive(Debug, Clone, Default)]
pub struct MonthSales {
    pub employee: Vec<SaleDoc>,
    pub direct: Vec<SaleDoc>,
    pub commercial: Vec<SaleDoc>,
}

impl MonthSales {
    /// Flatten into aggregator input, tagged by origin.
    pub fn to_records(&self) -> Vec<SaleRecord> {
        let mut records =
            Vec::with_capacity(self.employee.len() + self.direct.len() + self.commercial.len());
        for (docs, source) in [
            (&self.employee, SaleSource::Employee),
            (&self.direct, SaleSource::StoreDirect),
            (&self.commercial, SaleSource::Commercial),
        ] {
            for sale in docs.iter() {
                records.push(SaleRecord {
                    date: sale.date.to_chrono(),
                    amount: sale.amount,
                    note: sale.note.clone(),
                    source,
                    employee_id: sale.employee_id.map(|id| id.to_hex()),
                });
            }
        }
        records
    }

    /// Per-employee `(total, count)` over the employee-attributed sales.
    pub fn employee_totals(&self) -> HashMap<ObjectId, (f64, u64)> {
        let mut totals: HashMap<ObjectId, (f64, u64)> = HashMap::new();
        for sale in &self.employee {
            if let Some(employee_id) = sale.employee_id {
                let entry = totals.entry(employee_id).or_insert((0.0, 0));
                entry.0 += sale.amount;
                entry.1 += 1;
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::DateTime;

    fn sale(employee_id: Option<ObjectId>, amount: f64) -> SaleDoc {
        SaleDoc {
            id: Some(ObjectId::new()),
            store_id: ObjectId::new(),
            employee_id,
            date: DateTime::now(),
            amount,
            note: None,
            created_at: DateTime::now(),
        }
    }

    #[test]
    fn month_sales_flatten_tags_sources() {
        let sales = MonthSales {
            employee: vec![sale(Some(ObjectId::new()), 10.0)],
            direct: vec![sale(None, 20.0)],
            commercial: vec![sale(None, 30.0), sale(None, 40.0)],
        };
        let records = sales.to_records();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].source, SaleSource::Employee);
        assert!(records[0].employee_id.is_some());
        assert_eq!(records[1].source, SaleSource::StoreDirect);
        assert_eq!(records[3].source, SaleSource::Commercial);
    }

    #[test]
    fn employee_totals_accumulate_per_employee() {
        let alice = ObjectId::new();
        let bob = ObjectId::new();
        let sales = MonthSales {
            employee: vec![
                sale(Some(alice), 100.0),
                sale(Some(alice), 50.0),
                sale(Some(bob), 25.0),
            ],
            direct: vec![sale(None, 999.0)],
            commercial: vec![],
        };
        let totals = sales.employee_totals();
        assert_eq!(totals[&alice], (150.0, 2));
        assert_eq!(totals[&bob], (25.0, 1));
        assert_eq!(totals.len(), 2);
    }
}
