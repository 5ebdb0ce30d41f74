// crates/bundy-core/src/types.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use bundy_parser::PunchDirection;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    /// Badge / AC number assigned by the biometric terminal, when enrolled.
    pub external_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A single raw clock event. Immutable once stored; many punches fold into
/// one attendance record per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Punch {
    pub employee_id: i64,
    pub instant: DateTime<Utc>,
    pub direction: PunchDirection,
    pub raw_status: String,
    pub location: Option<String>,
    pub department: Option<String>,
    pub batch_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    HalfDay,
    FullDay,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::HalfDay => "half_day",
            SessionType::FullDay => "full_day",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "half_day" => Some(Self::HalfDay),
            "full_day" => Some(Self::FullDay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One reconciled day for one employee. Times are wall-clock in the
/// reference timezone; `day` is the business-day key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub employee_id: i64,
    pub day: NaiveDate,
    pub morning_in: Option<NaiveTime>,
    pub morning_out: Option<NaiveTime>,
    pub afternoon_in: Option<NaiveTime>,
    pub afternoon_out: Option<NaiveTime>,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub hours_worked: Option<f64>,
    pub is_late: bool,
    pub is_absent: bool,
    pub is_half_day: bool,
    pub is_early_out: bool,
    pub total_sessions: u32,
    pub session_type: Option<SessionType>,
    pub approval: ApprovalStatus,
    pub batch_id: Option<Uuid>,
}

impl AttendanceRecord {
    /// Synthetic record for a working day with no punches at all.
    pub fn absent(employee_id: i64, day: NaiveDate) -> Self {
        Self {
            employee_id,
            day,
            morning_in: None,
            morning_out: None,
            afternoon_in: None,
            afternoon_out: None,
            time_in: None,
            time_out: None,
            hours_worked: None,
            is_late: false,
            is_absent: true,
            is_half_day: false,
            is_early_out: false,
            total_sessions: 0,
            session_type: None,
            approval: ApprovalStatus::Pending,
            batch_id: None,
        }
    }

    pub fn key(&self) -> (i64, NaiveDate) {
        (self.employee_id, self.day)
    }
}

/// One bulk-upload event. Write-once; the checksum makes re-uploads
/// detectable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: Uuid,
    pub source_file_name: String,
    pub source_size: u64,
    pub checksum: String,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Base,
    Allowance,
    Bonus,
    Deduction,
    Loan,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Base => "base",
            RuleKind::Allowance => "allowance",
            RuleKind::Bonus => "bonus",
            RuleKind::Deduction => "deduction",
            RuleKind::Loan => "loan",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "base" => Some(Self::Base),
            "allowance" => Some(Self::Allowance),
            "bonus" => Some(Self::Bonus),
            "deduction" => Some(Self::Deduction),
            "loan" => Some(Self::Loan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRule {
    pub id: i64,
    pub name: String,
    pub kind: RuleKind,
    /// Currency amount, or a percentage when `is_percentage` is set.
    pub amount: f64,
    pub is_percentage: bool,
    pub applies_to_all: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RuleAssignment {
    pub rule_id: i64,
    pub employee_id: i64,
}

/// Fixed daily-rate override for one employee, optionally scoped to a
/// department/position. Wins over rule-derived rates while active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRole {
    pub employee_id: i64,
    pub daily_rate: f64,
    pub department: Option<String>,
    pub position: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollStatus {
    Computed,
    Approved,
    Paid,
}

impl PayrollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayrollStatus::Computed => "computed",
            PayrollStatus::Approved => "approved",
            PayrollStatus::Paid => "paid",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "computed" => Some(Self::Computed),
            "approved" => Some(Self::Approved),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// Fully itemized pay computation for one employee and one period.
/// Field names carry units: `_pay`/`_deductions` are currency,
/// `_hours` are hours, `days_worked` is days.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollResult {
    pub employee_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,

    pub daily_rate: f64,
    pub hourly_rate: f64,

    pub days_worked: f64,
    pub hours_worked: f64,
    pub overtime_hours: f64,
    pub undertime_hours: f64,
    pub late_hours: f64,
    pub holiday_hours: f64,

    pub regular_pay: f64,
    pub overtime_pay: f64,
    pub holiday_pay: f64,
    pub allowances: f64,
    pub bonuses: f64,
    pub total_earnings: f64,
    pub gross_pay: f64,

    pub sss: f64,
    pub philhealth: f64,
    pub pagibig: f64,
    pub taxable_income: f64,
    pub withholding_tax: f64,
    pub late_deductions: f64,
    pub undertime_deductions: f64,
    pub loan_deductions: f64,
    pub other_deductions: f64,
    pub total_deductions: f64,

    pub net_pay: f64,
    pub status: PayrollStatus,
    pub applied_rules_snapshot: serde_json::Value,
}

/// Flattened row appended alongside each payroll upsert for the legacy
/// reporting exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollSummary {
    pub employee_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub gross_pay: f64,
    pub total_deductions: f64,
    pub net_pay: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayKind {
    Regular,
    Special,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    pub day: NaiveDate,
    pub kind: HolidayKind,
    pub name: String,
}
