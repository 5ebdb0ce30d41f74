// crates/bundy-core/src/store/memory.rs

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{AttendanceStore, EmployeeDirectory, PayrollStore, StoreError};
use crate::types::{
    AttendanceRecord, Employee, ImportBatch, PayrollResult, PayrollRole, PayrollRule,
    PayrollSummary, Punch, RuleAssignment,
};

#[derive(Debug, Default)]
struct Inner {
    employees: Vec<Employee>,
    punches: Vec<Punch>,
    records: HashMap<(i64, NaiveDate), AttendanceRecord>,
    batches: Vec<ImportBatch>,
    rules: Vec<PayrollRule>,
    assignments: Vec<RuleAssignment>,
    roles: Vec<PayrollRole>,
    results: HashMap<(i64, NaiveDate, NaiveDate), PayrollResult>,
    summaries: Vec<PayrollSummary>,
}

/// Single-process store backed by maps. The mutex gives live punches the
/// same serialize-per-key guarantee the SQL store gets from its upsert.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_employee(&self, employee: Employee) {
        self.inner.lock().unwrap().employees.push(employee);
    }

    pub fn add_rule(&self, rule: PayrollRule) {
        self.inner.lock().unwrap().rules.push(rule);
    }

    pub fn add_assignment(&self, assignment: RuleAssignment) {
        self.inner.lock().unwrap().assignments.push(assignment);
    }

    pub fn add_role(&self, role: PayrollRole) {
        self.inner.lock().unwrap().roles.push(role);
    }

    pub fn record_count(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn punch_count(&self) -> usize {
        self.inner.lock().unwrap().punches.len()
    }

    pub fn summaries(&self) -> Vec<PayrollSummary> {
        self.inner.lock().unwrap().summaries.clone()
    }

    pub fn result_count(&self) -> usize {
        self.inner.lock().unwrap().results.len()
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryStore {
    async fn active_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .employees
            .iter()
            .filter(|employee| employee.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn find_record(
        &self,
        employee_id: i64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.get(&(employee_id, day)).cloned())
    }

    async fn upsert_records(&self, records: &[AttendanceRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for record in records {
            inner.records.insert(record.key(), record.clone());
        }
        Ok(())
    }

    async fn record_keys_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<(i64, NaiveDate)>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .keys()
            .filter(|(_, day)| *day >= start && *day <= end)
            .copied()
            .collect())
    }

    async fn records_in_period(
        &self,
        employee_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<AttendanceRecord> = inner
            .records
            .values()
            .filter(|record| {
                record.employee_id == employee_id && record.day >= start && record.day <= end
            })
            .cloned()
            .collect();
        records.sort_by_key(|record| record.day);
        Ok(records)
    }

    async fn insert_punches(&self, punches: &[Punch]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.punches.extend_from_slice(punches);
        Ok(())
    }

    async fn insert_batch(&self, batch: &ImportBatch) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.batches.push(batch.clone());
        Ok(())
    }

    async fn find_batch_by_checksum(
        &self,
        checksum: &str,
    ) -> Result<Option<ImportBatch>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .batches
            .iter()
            .find(|batch| batch.checksum == checksum)
            .cloned())
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn active_rules(&self) -> Result<Vec<PayrollRule>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rules
            .iter()
            .filter(|rule| rule.is_active)
            .cloned()
            .collect())
    }

    async fn rule_assignments(&self) -> Result<Vec<RuleAssignment>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.assignments.clone())
    }

    async fn active_roles(&self) -> Result<Vec<PayrollRole>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .roles
            .iter()
            .filter(|role| role.is_active)
            .cloned()
            .collect())
    }

    async fn upsert_result(&self, result: &PayrollResult) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (result.employee_id, result.period_start, result.period_end);
        inner.results.insert(key, result.clone());
        Ok(())
    }

    async fn append_summary(&self, summary: &PayrollSummary) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.summaries.push(summary.clone());
        Ok(())
    }
}
