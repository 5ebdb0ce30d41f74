// crates/bundy-core/src/store/postgres.rs

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use super::{AttendanceStore, EmployeeDirectory, PayrollStore, StoreError};
use crate::types::{
    ApprovalStatus, AttendanceRecord, Employee, ImportBatch, PayrollResult, PayrollRole,
    PayrollRule, PayrollSummary, Punch, RuleKind, SessionType,
};

/// Postgres-backed store. Every write is an `ON CONFLICT` upsert on the
/// composite key, which is what makes chunk retries and concurrent live
/// punches safe.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id BIGINT PRIMARY KEY,
        external_id TEXT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        department TEXT,
        position TEXT,
        is_active BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS import_batches (
        id UUID PRIMARY KEY,
        source_file_name TEXT NOT NULL,
        source_size BIGINT NOT NULL,
        checksum TEXT NOT NULL,
        uploaded_by TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS punches (
        id BIGSERIAL PRIMARY KEY,
        employee_id BIGINT NOT NULL,
        instant TIMESTAMPTZ NOT NULL,
        direction TEXT NOT NULL,
        raw_status TEXT NOT NULL,
        location TEXT,
        department TEXT,
        batch_id UUID
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance_records (
        employee_id BIGINT NOT NULL,
        day DATE NOT NULL,
        morning_in TIME,
        morning_out TIME,
        afternoon_in TIME,
        afternoon_out TIME,
        time_in TIME,
        time_out TIME,
        hours_worked DOUBLE PRECISION,
        is_late BOOLEAN NOT NULL,
        is_absent BOOLEAN NOT NULL,
        is_half_day BOOLEAN NOT NULL,
        is_early_out BOOLEAN NOT NULL,
        total_sessions INTEGER NOT NULL,
        session_type TEXT,
        approval TEXT NOT NULL,
        batch_id UUID,
        PRIMARY KEY (employee_id, day)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payroll_rules (
        id BIGINT PRIMARY KEY,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        amount DOUBLE PRECISION NOT NULL,
        is_percentage BOOLEAN NOT NULL,
        applies_to_all BOOLEAN NOT NULL,
        is_active BOOLEAN NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS rule_assignments (
        rule_id BIGINT NOT NULL,
        employee_id BIGINT NOT NULL,
        PRIMARY KEY (rule_id, employee_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payroll_roles (
        employee_id BIGINT PRIMARY KEY,
        daily_rate DOUBLE PRECISION NOT NULL,
        department TEXT,
        position TEXT,
        is_active BOOLEAN NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payroll_results (
        employee_id BIGINT NOT NULL,
        period_start DATE NOT NULL,
        period_end DATE NOT NULL,
        daily_rate DOUBLE PRECISION NOT NULL,
        hourly_rate DOUBLE PRECISION NOT NULL,
        days_worked DOUBLE PRECISION NOT NULL,
        hours_worked DOUBLE PRECISION NOT NULL,
        overtime_hours DOUBLE PRECISION NOT NULL,
        undertime_hours DOUBLE PRECISION NOT NULL,
        late_hours DOUBLE PRECISION NOT NULL,
        holiday_hours DOUBLE PRECISION NOT NULL,
        regular_pay DOUBLE PRECISION NOT NULL,
        overtime_pay DOUBLE PRECISION NOT NULL,
        holiday_pay DOUBLE PRECISION NOT NULL,
        allowances DOUBLE PRECISION NOT NULL,
        bonuses DOUBLE PRECISION NOT NULL,
        total_earnings DOUBLE PRECISION NOT NULL,
        gross_pay DOUBLE PRECISION NOT NULL,
        sss DOUBLE PRECISION NOT NULL,
        philhealth DOUBLE PRECISION NOT NULL,
        pagibig DOUBLE PRECISION NOT NULL,
        taxable_income DOUBLE PRECISION NOT NULL,
        withholding_tax DOUBLE PRECISION NOT NULL,
        late_deductions DOUBLE PRECISION NOT NULL,
        undertime_deductions DOUBLE PRECISION NOT NULL,
        loan_deductions DOUBLE PRECISION NOT NULL,
        other_deductions DOUBLE PRECISION NOT NULL,
        total_deductions DOUBLE PRECISION NOT NULL,
        net_pay DOUBLE PRECISION NOT NULL,
        status TEXT NOT NULL,
        applied_rules_snapshot JSONB NOT NULL,
        PRIMARY KEY (employee_id, period_start, period_end)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payroll_summaries (
        id BIGSERIAL PRIMARY KEY,
        employee_id BIGINT NOT NULL,
        period_start DATE NOT NULL,
        period_end DATE NOT NULL,
        gross_pay DOUBLE PRECISION NOT NULL,
        total_deductions DOUBLE PRECISION NOT NULL,
        net_pay DOUBLE PRECISION NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_import_batches_checksum
        ON import_batches (checksum)
    "#,
];

fn map_record(row: &PgRow) -> Result<AttendanceRecord, StoreError> {
    let session_type: Option<String> = row.try_get("session_type")?;
    let session_type = match session_type.as_deref() {
        Some(value) => Some(
            SessionType::from_str(value)
                .ok_or_else(|| StoreError::InvalidValue(format!("session_type '{value}'")))?,
        ),
        None => None,
    };
    let approval: String = row.try_get("approval")?;
    let approval = ApprovalStatus::from_str(&approval)
        .ok_or_else(|| StoreError::InvalidValue(format!("approval '{approval}'")))?;
    let total_sessions: i32 = row.try_get("total_sessions")?;

    Ok(AttendanceRecord {
        employee_id: row.try_get("employee_id")?,
        day: row.try_get("day")?,
        morning_in: row.try_get("morning_in")?,
        morning_out: row.try_get("morning_out")?,
        afternoon_in: row.try_get("afternoon_in")?,
        afternoon_out: row.try_get("afternoon_out")?,
        time_in: row.try_get("time_in")?,
        time_out: row.try_get("time_out")?,
        hours_worked: row.try_get("hours_worked")?,
        is_late: row.try_get("is_late")?,
        is_absent: row.try_get("is_absent")?,
        is_half_day: row.try_get("is_half_day")?,
        is_early_out: row.try_get("is_early_out")?,
        total_sessions: total_sessions.max(0) as u32,
        session_type,
        approval,
        batch_id: row.try_get("batch_id")?,
    })
}

fn map_employee(row: &PgRow) -> Result<Employee, StoreError> {
    Ok(Employee {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        department: row.try_get("department")?,
        position: row.try_get("position")?,
        is_active: row.try_get("is_active")?,
    })
}

fn map_batch(row: &PgRow) -> Result<ImportBatch, StoreError> {
    let source_size: i64 = row.try_get("source_size")?;
    Ok(ImportBatch {
        id: row.try_get("id")?,
        source_file_name: row.try_get("source_file_name")?,
        source_size: source_size.max(0) as u64,
        checksum: row.try_get("checksum")?,
        uploaded_by: row.try_get("uploaded_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_rule(row: &PgRow) -> Result<PayrollRule, StoreError> {
    let kind: String = row.try_get("kind")?;
    Ok(PayrollRule {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        kind: RuleKind::from_str(&kind)
            .ok_or_else(|| StoreError::InvalidValue(format!("rule kind '{kind}'")))?,
        amount: row.try_get("amount")?,
        is_percentage: row.try_get("is_percentage")?,
        applies_to_all: row.try_get("applies_to_all")?,
        is_active: row.try_get("is_active")?,
    })
}

#[async_trait]
impl EmployeeDirectory for PgStore {
    async fn active_employees(&self) -> Result<Vec<Employee>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, external_id, first_name, last_name, department, position, is_active
            FROM employees
            WHERE is_active
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_employee).collect()
    }
}

#[async_trait]
impl AttendanceStore for PgStore {
    async fn find_record(
        &self,
        employee_id: i64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM attendance_records
            WHERE employee_id = $1 AND day = $2
            "#,
        )
        .bind(employee_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_record).transpose()
    }

    async fn upsert_records(&self, records: &[AttendanceRecord]) -> Result<(), StoreError> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO attendance_records (
                    employee_id, day,
                    morning_in, morning_out, afternoon_in, afternoon_out,
                    time_in, time_out, hours_worked,
                    is_late, is_absent, is_half_day, is_early_out,
                    total_sessions, session_type, approval, batch_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
                ON CONFLICT (employee_id, day) DO UPDATE SET
                    morning_in = EXCLUDED.morning_in,
                    morning_out = EXCLUDED.morning_out,
                    afternoon_in = EXCLUDED.afternoon_in,
                    afternoon_out = EXCLUDED.afternoon_out,
                    time_in = EXCLUDED.time_in,
                    time_out = EXCLUDED.time_out,
                    hours_worked = EXCLUDED.hours_worked,
                    is_late = EXCLUDED.is_late,
                    is_absent = EXCLUDED.is_absent,
                    is_half_day = EXCLUDED.is_half_day,
                    is_early_out = EXCLUDED.is_early_out,
                    total_sessions = EXCLUDED.total_sessions,
                    session_type = EXCLUDED.session_type,
                    approval = EXCLUDED.approval,
                    batch_id = EXCLUDED.batch_id
                "#,
            )
            .bind(record.employee_id)
            .bind(record.day)
            .bind(record.morning_in)
            .bind(record.morning_out)
            .bind(record.afternoon_in)
            .bind(record.afternoon_out)
            .bind(record.time_in)
            .bind(record.time_out)
            .bind(record.hours_worked)
            .bind(record.is_late)
            .bind(record.is_absent)
            .bind(record.is_half_day)
            .bind(record.is_early_out)
            .bind(record.total_sessions as i32)
            .bind(record.session_type.map(|value| value.as_str()))
            .bind(record.approval.as_str())
            .bind(record.batch_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn record_keys_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<(i64, NaiveDate)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT employee_id, day FROM attendance_records
            WHERE day BETWEEN $1 AND $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut keys = HashSet::with_capacity(rows.len());
        for row in &rows {
            keys.insert((row.try_get("employee_id")?, row.try_get("day")?));
        }
        Ok(keys)
    }

    async fn records_in_period(
        &self,
        employee_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM attendance_records
            WHERE employee_id = $1 AND day BETWEEN $2 AND $3
            ORDER BY day
            "#,
        )
        .bind(employee_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_record).collect()
    }

    async fn insert_punches(&self, punches: &[Punch]) -> Result<(), StoreError> {
        for punch in punches {
            sqlx::query(
                r#"
                INSERT INTO punches
                    (employee_id, instant, direction, raw_status, location, department, batch_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(punch.employee_id)
            .bind(punch.instant)
            .bind(punch.direction.as_str())
            .bind(&punch.raw_status)
            .bind(&punch.location)
            .bind(&punch.department)
            .bind(punch.batch_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn insert_batch(&self, batch: &ImportBatch) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO import_batches
                (id, source_file_name, source_size, checksum, uploaded_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(batch.id)
        .bind(&batch.source_file_name)
        .bind(batch.source_size as i64)
        .bind(&batch.checksum)
        .bind(&batch.uploaded_by)
        .bind(batch.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_batch_by_checksum(
        &self,
        checksum: &str,
    ) -> Result<Option<ImportBatch>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM import_batches
            WHERE checksum = $1
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(checksum)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_batch).transpose()
    }
}

#[async_trait]
impl PayrollStore for PgStore {
    async fn active_rules(&self) -> Result<Vec<PayrollRule>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, kind, amount, is_percentage, applies_to_all, is_active
            FROM payroll_rules
            WHERE is_active
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_rule).collect()
    }

    async fn rule_assignments(&self) -> Result<Vec<crate::types::RuleAssignment>, StoreError> {
        let rows = sqlx::query("SELECT rule_id, employee_id FROM rule_assignments")
            .fetch_all(&self.pool)
            .await?;
        let mut assignments = Vec::with_capacity(rows.len());
        for row in &rows {
            assignments.push(crate::types::RuleAssignment {
                rule_id: row.try_get("rule_id")?,
                employee_id: row.try_get("employee_id")?,
            });
        }
        Ok(assignments)
    }

    async fn active_roles(&self) -> Result<Vec<PayrollRole>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT employee_id, daily_rate, department, position, is_active
            FROM payroll_roles
            WHERE is_active
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let mut roles = Vec::with_capacity(rows.len());
        for row in &rows {
            roles.push(PayrollRole {
                employee_id: row.try_get("employee_id")?,
                daily_rate: row.try_get("daily_rate")?,
                department: row.try_get("department")?,
                position: row.try_get("position")?,
                is_active: row.try_get("is_active")?,
            });
        }
        Ok(roles)
    }

    async fn upsert_result(&self, result: &PayrollResult) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payroll_results (
                employee_id, period_start, period_end,
                daily_rate, hourly_rate,
                days_worked, hours_worked, overtime_hours, undertime_hours,
                late_hours, holiday_hours,
                regular_pay, overtime_pay, holiday_pay, allowances, bonuses,
                total_earnings, gross_pay,
                sss, philhealth, pagibig, taxable_income, withholding_tax,
                late_deductions, undertime_deductions, loan_deductions,
                other_deductions, total_deductions, net_pay,
                status, applied_rules_snapshot
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
                    $27, $28, $29, $30, $31)
            ON CONFLICT (employee_id, period_start, period_end) DO UPDATE SET
                daily_rate = EXCLUDED.daily_rate,
                hourly_rate = EXCLUDED.hourly_rate,
                days_worked = EXCLUDED.days_worked,
                hours_worked = EXCLUDED.hours_worked,
                overtime_hours = EXCLUDED.overtime_hours,
                undertime_hours = EXCLUDED.undertime_hours,
                late_hours = EXCLUDED.late_hours,
                holiday_hours = EXCLUDED.holiday_hours,
                regular_pay = EXCLUDED.regular_pay,
                overtime_pay = EXCLUDED.overtime_pay,
                holiday_pay = EXCLUDED.holiday_pay,
                allowances = EXCLUDED.allowances,
                bonuses = EXCLUDED.bonuses,
                total_earnings = EXCLUDED.total_earnings,
                gross_pay = EXCLUDED.gross_pay,
                sss = EXCLUDED.sss,
                philhealth = EXCLUDED.philhealth,
                pagibig = EXCLUDED.pagibig,
                taxable_income = EXCLUDED.taxable_income,
                withholding_tax = EXCLUDED.withholding_tax,
                late_deductions = EXCLUDED.late_deductions,
                undertime_deductions = EXCLUDED.undertime_deductions,
                loan_deductions = EXCLUDED.loan_deductions,
                other_deductions = EXCLUDED.other_deductions,
                total_deductions = EXCLUDED.total_deductions,
                net_pay = EXCLUDED.net_pay,
                status = EXCLUDED.status,
                applied_rules_snapshot = EXCLUDED.applied_rules_snapshot
            "#,
        )
        .bind(result.employee_id)
        .bind(result.period_start)
        .bind(result.period_end)
        .bind(result.daily_rate)
        .bind(result.hourly_rate)
        .bind(result.days_worked)
        .bind(result.hours_worked)
        .bind(result.overtime_hours)
        .bind(result.undertime_hours)
        .bind(result.late_hours)
        .bind(result.holiday_hours)
        .bind(result.regular_pay)
        .bind(result.overtime_pay)
        .bind(result.holiday_pay)
        .bind(result.allowances)
        .bind(result.bonuses)
        .bind(result.total_earnings)
        .bind(result.gross_pay)
        .bind(result.sss)
        .bind(result.philhealth)
        .bind(result.pagibig)
        .bind(result.taxable_income)
        .bind(result.withholding_tax)
        .bind(result.late_deductions)
        .bind(result.undertime_deductions)
        .bind(result.loan_deductions)
        .bind(result.other_deductions)
        .bind(result.total_deductions)
        .bind(result.net_pay)
        .bind(result.status.as_str())
        .bind(&result.applied_rules_snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_summary(&self, summary: &PayrollSummary) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO payroll_summaries
                (employee_id, period_start, period_end, gross_pay, total_deductions, net_pay)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(summary.employee_id)
        .bind(summary.period_start)
        .bind(summary.period_end)
        .bind(summary.gross_pay)
        .bind(summary.total_deductions)
        .bind(summary.net_pay)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
