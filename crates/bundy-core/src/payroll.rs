// crates/bundy-core/src/payroll.rs

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::PolicyConfig;
use crate::deductions::calculate_deductions;
use crate::earnings::calculate_earnings;
use crate::error::Result;
use crate::rates::{resolve_rate, RateSource};
use crate::store::{AttendanceStore, EmployeeDirectory, PayrollStore};
use crate::types::{
    AttendanceRecord, HolidayKind, PayrollResult, PayrollRole, PayrollRule, PayrollStatus,
    PayrollSummary, RuleAssignment, SessionType,
};

/// Attendance summary over a pay period, in hours/days/counts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AttendanceTotals {
    pub days_worked: f64,
    pub hours_worked: f64,
    pub overtime_hours: f64,
    pub undertime_hours: f64,
    pub late_hours: f64,
    pub holiday_regular_hours: f64,
    pub holiday_special_hours: f64,
    pub late_instances: u32,
    pub undertime_instances: u32,
}

impl AttendanceTotals {
    pub fn holiday_hours(&self) -> f64 {
        self.holiday_regular_hours + self.holiday_special_hours
    }
}

/// Folds a period's attendance records into totals. Absent days
/// contribute nothing; a half day counts as half a day worked.
pub fn attendance_totals(records: &[AttendanceRecord], policy: &PolicyConfig) -> AttendanceTotals {
    let mut totals = AttendanceTotals::default();

    for record in records {
        if record.is_absent {
            continue;
        }
        let day_hours = record.hours_worked.unwrap_or(0.0);
        totals.hours_worked += day_hours;
        totals.days_worked += match record.session_type {
            Some(SessionType::FullDay) => 1.0,
            Some(SessionType::HalfDay) => 0.5,
            None => 0.0,
        };
        totals.overtime_hours += (day_hours - policy.standard_day_hours).max(0.0);

        if record.is_late {
            if let Some(morning_in) = record.morning_in {
                let lateness =
                    (morning_in - policy.morning_window_start).num_seconds() as f64 / 3600.0;
                totals.late_hours += lateness.max(0.0);
                totals.late_instances += 1;
            }
        }

        if record.is_early_out {
            if let Some(time_out) = record.time_out {
                let shortfall =
                    (policy.day_end_cutoff - time_out).num_seconds() as f64 / 3600.0;
                totals.undertime_hours += shortfall.max(0.0);
                totals.undertime_instances += 1;
            }
        }

        if let Some(holiday) = policy.holidays.iter().find(|holiday| holiday.day == record.day) {
            match holiday.kind {
                HolidayKind::Regular => totals.holiday_regular_hours += day_hours,
                HolidayKind::Special => totals.holiday_special_hours += day_hours,
            }
        }
    }

    totals
}

/// Rules applicable to one employee: global rules plus explicit
/// assignments. Iterating the rule list once means a rule assigned both
/// ways is never counted twice.
pub fn applicable_rules(
    rules: &[PayrollRule],
    assignments: &[RuleAssignment],
    employee_id: i64,
) -> Vec<PayrollRule> {
    rules
        .iter()
        .filter(|rule| {
            rule.applies_to_all
                || assignments.iter().any(|assignment| {
                    assignment.rule_id == rule.id && assignment.employee_id == employee_id
                })
        })
        .cloned()
        .collect()
}

/// Pre-fetched inputs for one employee's computation; everything the pure
/// calculation needs besides the policy.
#[derive(Debug, Clone, Default)]
pub struct PayrollInputs {
    pub records: Vec<AttendanceRecord>,
    pub role: Option<PayrollRole>,
    pub rules: Vec<PayrollRule>,
}

/// Pure payroll computation. No attendance and no resolvable rate is a
/// valid zero result, never a crash; a negative net pay is surfaced as-is
/// for human review.
pub fn compute_payroll_result(
    employee_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
    inputs: &PayrollInputs,
    policy: &PolicyConfig,
) -> PayrollResult {
    let totals = attendance_totals(&inputs.records, policy);
    let rate = resolve_rate(inputs.role.as_ref(), &inputs.rules, policy);

    if rate.source == RateSource::Unset {
        tracing::warn!(employee_id, "no role override or base rule; rate is zero");
    }
    if inputs.records.is_empty() {
        tracing::warn!(
            employee_id,
            %period_start,
            %period_end,
            "no attendance records in period; computing zero pay"
        );
    }

    let earnings = calculate_earnings(&totals, &rate, &inputs.rules, policy);
    let gross_pay = earnings.total_earnings;
    let deductions =
        calculate_deductions(&totals, rate.hourly_rate, gross_pay, &inputs.rules, policy);
    let net_pay = gross_pay - deductions.total_deductions;

    if net_pay < 0.0 {
        tracing::warn!(employee_id, net_pay, "negative net pay; flag for review");
    }

    PayrollResult {
        employee_id,
        period_start,
        period_end,
        daily_rate: rate.daily_rate,
        hourly_rate: rate.hourly_rate,
        days_worked: totals.days_worked,
        hours_worked: totals.hours_worked,
        overtime_hours: totals.overtime_hours,
        undertime_hours: totals.undertime_hours,
        late_hours: totals.late_hours,
        holiday_hours: totals.holiday_hours(),
        regular_pay: earnings.regular_pay,
        overtime_pay: earnings.overtime_pay,
        holiday_pay: earnings.holiday_pay,
        allowances: earnings.allowances,
        bonuses: earnings.bonuses,
        total_earnings: earnings.total_earnings,
        gross_pay,
        sss: deductions.sss,
        philhealth: deductions.philhealth,
        pagibig: deductions.pagibig,
        taxable_income: deductions.taxable_income,
        withholding_tax: deductions.withholding_tax,
        late_deductions: deductions.late_deductions,
        undertime_deductions: deductions.undertime_deductions,
        loan_deductions: deductions.loan_deductions,
        other_deductions: deductions.other_deductions,
        total_deductions: deductions.total_deductions,
        net_pay,
        status: PayrollStatus::Computed,
        applied_rules_snapshot: serde_json::to_value(&inputs.rules).unwrap_or_default(),
    }
}

/// Fetches inputs, computes, and upserts the result for one employee,
/// appending the compatibility summary row as a side effect.
pub async fn compute_payroll<S>(
    store: &S,
    policy: &PolicyConfig,
    employee_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<PayrollResult>
where
    S: AttendanceStore + PayrollStore,
{
    let rules = store.active_rules().await?;
    let assignments = store.rule_assignments().await?;
    let roles = store.active_roles().await?;

    let inputs = PayrollInputs {
        records: store
            .records_in_period(employee_id, period_start, period_end)
            .await?,
        role: roles
            .into_iter()
            .find(|role| role.employee_id == employee_id),
        rules: applicable_rules(&rules, &assignments, employee_id),
    };

    let result = compute_payroll_result(employee_id, period_start, period_end, &inputs, policy);
    persist_result(store, &result).await?;
    Ok(result)
}

/// Runs payroll for every active employee over one period. Rules, roles
/// and assignments are fetched once up front; each employee computes
/// independently with no shared mutable state.
pub async fn run_payroll<S>(
    store: &S,
    policy: &PolicyConfig,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> Result<Vec<PayrollResult>>
where
    S: AttendanceStore + PayrollStore + EmployeeDirectory,
{
    let employees = store.active_employees().await?;
    let rules = store.active_rules().await?;
    let assignments = store.rule_assignments().await?;
    let roles = store.active_roles().await?;

    let mut results = Vec::with_capacity(employees.len());
    for employee in &employees {
        let inputs = PayrollInputs {
            records: store
                .records_in_period(employee.id, period_start, period_end)
                .await?,
            role: roles
                .iter()
                .find(|role| role.employee_id == employee.id)
                .cloned(),
            rules: applicable_rules(&rules, &assignments, employee.id),
        };
        let result =
            compute_payroll_result(employee.id, period_start, period_end, &inputs, policy);
        persist_result(store, &result).await?;
        results.push(result);
    }

    tracing::info!(
        employees = results.len(),
        %period_start,
        %period_end,
        "payroll run complete"
    );
    Ok(results)
}

async fn persist_result<S: PayrollStore>(store: &S, result: &PayrollResult) -> Result<()> {
    store.upsert_result(result).await?;
    store
        .append_summary(&PayrollSummary {
            employee_id: result.employee_id,
            period_start: result.period_start,
            period_end: result.period_end,
            gross_pay: result.gross_pay,
            total_deductions: result.total_deductions,
            net_pay: result.net_pay,
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DaySlots;
    use crate::types::{Holiday, RuleKind};
    use chrono::{Datelike, NaiveTime};

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn full_day(employee_id: i64, day: NaiveDate) -> AttendanceRecord {
        let slots = DaySlots {
            morning_in: Some(time(8, 0)),
            afternoon_out: Some(time(17, 0)),
            ..DaySlots::default()
        };
        crate::attendance::build_record(employee_id, day, &slots, None, &PolicyConfig::default())
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap()
    }

    #[test]
    fn totals_skip_absent_days() {
        let policy = PolicyConfig::default();
        let records = vec![
            full_day(1, date(1)),
            AttendanceRecord::absent(1, date(2)),
            full_day(1, date(3)),
        ];
        let totals = attendance_totals(&records, &policy);
        assert_eq!(totals.days_worked, 2.0);
        assert_eq!(totals.hours_worked, 18.0);
        // Two 9-hour spans over an 8-hour standard day.
        assert_eq!(totals.overtime_hours, 2.0);
    }

    #[test]
    fn totals_accumulate_lateness_and_undertime() {
        let policy = PolicyConfig::default();
        let late_slots = DaySlots {
            morning_in: Some(time(9, 0)),
            afternoon_out: Some(time(16, 0)),
            ..DaySlots::default()
        };
        let record = crate::attendance::build_record(1, date(1), &late_slots, None, &policy);
        assert!(record.is_late);
        assert!(record.is_early_out);

        let totals = attendance_totals(&[record], &policy);
        assert!((totals.late_hours - 1.0).abs() < 1e-9);
        assert_eq!(totals.late_instances, 1);
        assert!((totals.undertime_hours - 1.0).abs() < 1e-9);
        assert_eq!(totals.undertime_instances, 1);
    }

    #[test]
    fn totals_split_holiday_hours_by_kind() {
        let mut policy = PolicyConfig::default();
        policy.holidays = vec![Holiday {
            day: date(1),
            kind: HolidayKind::Regular,
            name: "Founding Day".to_string(),
        }];
        let totals = attendance_totals(&[full_day(1, date(1))], &policy);
        assert_eq!(totals.holiday_regular_hours, 9.0);
        assert_eq!(totals.holiday_special_hours, 0.0);
    }

    #[test]
    fn rule_assigned_both_ways_counts_once() {
        let rule = PayrollRule {
            id: 9,
            name: "rice subsidy".to_string(),
            kind: RuleKind::Allowance,
            amount: 1_000.0,
            is_percentage: false,
            applies_to_all: true,
            is_active: true,
        };
        let assignment = RuleAssignment {
            rule_id: 9,
            employee_id: 1,
        };
        let applicable = applicable_rules(&[rule], &[assignment], 1);
        assert_eq!(applicable.len(), 1);
    }

    #[test]
    fn assigned_rules_are_per_employee() {
        let rule = PayrollRule {
            id: 9,
            name: "salary loan".to_string(),
            kind: RuleKind::Loan,
            amount: 500.0,
            is_percentage: false,
            applies_to_all: false,
            is_active: true,
        };
        let assignment = RuleAssignment {
            rule_id: 9,
            employee_id: 1,
        };
        assert_eq!(applicable_rules(&[rule.clone()], &[assignment], 1).len(), 1);
        assert!(applicable_rules(&[rule], &[assignment], 2).is_empty());
    }

    #[test]
    fn zero_inputs_compute_zero_pay() {
        let policy = PolicyConfig::default();
        let result = compute_payroll_result(1, date(1), date(31), &PayrollInputs::default(), &policy);

        assert_eq!(result.gross_pay, 0.0);
        assert_eq!(result.net_pay, 0.0);
        assert_eq!(result.days_worked, 0.0);
        assert_eq!(result.net_pay, result.gross_pay - result.total_deductions);
    }

    #[test]
    fn invariants_hold_for_a_worked_period() {
        let policy = PolicyConfig::default();
        let inputs = PayrollInputs {
            records: (1..=23)
                .filter(|day| date(*day).weekday().num_days_from_monday() < 5)
                .map(|day| full_day(1, date(day)))
                .collect(),
            role: Some(PayrollRole {
                employee_id: 1,
                daily_rate: 800.0,
                department: None,
                position: None,
                is_active: true,
            }),
            rules: Vec::new(),
        };
        let result = compute_payroll_result(1, date(1), date(31), &inputs, &policy);

        assert!(result.gross_pay > 0.0);
        assert_eq!(result.gross_pay, result.total_earnings);
        assert_eq!(result.net_pay, result.gross_pay - result.total_deductions);
        assert_eq!(result.daily_rate, 800.0);
        assert_eq!(result.hourly_rate, 100.0);
    }

    #[test]
    fn negative_net_pay_is_not_clamped() {
        let policy = PolicyConfig::default();
        let inputs = PayrollInputs {
            records: vec![full_day(1, date(1))],
            role: Some(PayrollRole {
                employee_id: 1,
                daily_rate: 100.0,
                department: None,
                position: None,
                is_active: true,
            }),
            rules: vec![PayrollRule {
                id: 1,
                name: "emergency loan".to_string(),
                kind: RuleKind::Loan,
                amount: 5_000.0,
                is_percentage: false,
                applies_to_all: true,
                is_active: true,
            }],
        };
        let result = compute_payroll_result(1, date(1), date(15), &inputs, &policy);

        assert!(result.net_pay < 0.0);
        assert_eq!(result.net_pay, result.gross_pay - result.total_deductions);
    }
}
