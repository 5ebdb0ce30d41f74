// crates/bundy-core/src/store/mod.rs
//
// The engine is written against these contracts, not a database. Every
// write is an upsert keyed by a composite key, so retrying a failed chunk
// is always safe.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use thiserror::Error;

use crate::types::{
    AttendanceRecord, Employee, ImportBatch, PayrollResult, PayrollRole, PayrollRule,
    PayrollSummary, Punch, RuleAssignment,
};

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "runtime")]
mod postgres;
#[cfg(feature = "runtime")]
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "runtime")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn active_employees(&self) -> Result<Vec<Employee>, StoreError>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find_record(
        &self,
        employee_id: i64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Find-or-create keyed by (employee, day); existing rows are replaced.
    async fn upsert_records(&self, records: &[AttendanceRecord]) -> Result<(), StoreError>;

    async fn record_keys_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<(i64, NaiveDate)>, StoreError>;

    async fn records_in_period(
        &self,
        employee_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    async fn insert_punches(&self, punches: &[Punch]) -> Result<(), StoreError>;

    async fn insert_batch(&self, batch: &ImportBatch) -> Result<(), StoreError>;

    async fn find_batch_by_checksum(
        &self,
        checksum: &str,
    ) -> Result<Option<ImportBatch>, StoreError>;
}

#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn active_rules(&self) -> Result<Vec<PayrollRule>, StoreError>;

    async fn rule_assignments(&self) -> Result<Vec<RuleAssignment>, StoreError>;

    async fn active_roles(&self) -> Result<Vec<PayrollRole>, StoreError>;

    /// Find-or-create keyed by (employee, period_start, period_end).
    async fn upsert_result(&self, result: &PayrollResult) -> Result<(), StoreError>;

    async fn append_summary(&self, summary: &PayrollSummary) -> Result<(), StoreError>;
}

/// External work-calendar collaborator.
pub trait WorkCalendar: Send + Sync {
    fn working_days(&self, year: i32, month: u32) -> BTreeSet<NaiveDate>;
}

/// Monday-to-Friday calendar minus an explicit holiday list. Good enough
/// for tests and the CLI; campuses with Saturday classes plug in their own.
#[derive(Debug, Clone, Default)]
pub struct WeekdayCalendar {
    pub non_working: Vec<NaiveDate>,
}

impl WorkCalendar for WeekdayCalendar {
    fn working_days(&self, year: i32, month: u32) -> BTreeSet<NaiveDate> {
        let mut days = BTreeSet::new();
        let mut cursor = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(first) => first,
            None => return days,
        };
        while cursor.month() == month {
            let weekday = cursor.weekday();
            if weekday != Weekday::Sat
                && weekday != Weekday::Sun
                && !self.non_working.contains(&cursor)
            {
                days.insert(cursor);
            }
            cursor = match cursor.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_calendar_excludes_weekends_and_holidays() {
        let calendar = WeekdayCalendar {
            non_working: vec![NaiveDate::from_ymd_opt(2025, 7, 4).unwrap()],
        };
        let days = calendar.working_days(2025, 7);

        // July 2025 has 23 weekdays; one is marked non-working.
        assert_eq!(days.len(), 22);
        assert!(!days.contains(&NaiveDate::from_ymd_opt(2025, 7, 5).unwrap()));
        assert!(!days.contains(&NaiveDate::from_ymd_opt(2025, 7, 4).unwrap()));
        assert!(days.contains(&NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));
    }

    #[test]
    fn weekday_calendar_tolerates_bad_month() {
        let calendar = WeekdayCalendar::default();
        assert!(calendar.working_days(2025, 13).is_empty());
    }
}
