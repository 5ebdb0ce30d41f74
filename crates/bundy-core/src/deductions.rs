// crates/bundy-core/src/deductions.rs

use serde::Serialize;

use crate::config::{self, DeductionBasis, PolicyConfig};
use crate::earnings::round_centavos;
use crate::payroll::AttendanceTotals;
use crate::types::{PayrollRule, RuleKind};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DeductionsBreakdown {
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
}

/// Statutory contributions, withholding, conduct deductions and rule-based
/// deductions for one period. Deductions may exceed gross pay; that is
/// surfaced, not clamped.
pub fn calculate_deductions(
    totals: &AttendanceTotals,
    hourly_rate: f64,
    gross_pay: f64,
    rules: &[PayrollRule],
    policy: &PolicyConfig,
) -> DeductionsBreakdown {
    let late_deductions = round_centavos(conduct_deduction(
        policy.late_deduction,
        totals.late_hours,
        totals.late_instances,
        hourly_rate,
    ));
    let undertime_deductions = round_centavos(conduct_deduction(
        policy.undertime_deduction,
        totals.undertime_hours,
        totals.undertime_instances,
        hourly_rate,
    ));

    // Three independent schemes, each from its own bracket table. A period
    // with no pay maps to no bracket row, which resolves to zero.
    let (sss, philhealth, pagibig) = if gross_pay > 0.0 {
        (
            round_centavos(policy.sss.contribution_for(gross_pay)),
            round_centavos(policy.philhealth.contribution_for(gross_pay)),
            round_centavos(policy.pagibig.contribution_for(gross_pay)),
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    // Withholding applies after the pre-tax statutory contributions.
    let taxable_income = round_centavos(gross_pay - sss - philhealth - pagibig);
    let withholding_tax =
        round_centavos(config::withholding_for(taxable_income, &policy.tax_brackets));

    let loan_deductions = round_centavos(sum_rules(rules, RuleKind::Loan, gross_pay));
    let other_deductions = round_centavos(sum_rules(rules, RuleKind::Deduction, gross_pay));

    let total_deductions = late_deductions
        + undertime_deductions
        + sss
        + philhealth
        + pagibig
        + withholding_tax
        + loan_deductions
        + other_deductions;

    DeductionsBreakdown {
        sss,
        philhealth,
        pagibig,
        taxable_income,
        withholding_tax,
        late_deductions,
        undertime_deductions,
        loan_deductions,
        other_deductions,
        total_deductions,
    }
}

fn conduct_deduction(basis: DeductionBasis, hours: f64, instances: u32, hourly_rate: f64) -> f64 {
    match basis {
        DeductionBasis::HourlyRate => hours * hourly_rate,
        DeductionBasis::FixedPerInstance(amount) => f64::from(instances) * amount,
    }
}

fn sum_rules(rules: &[PayrollRule], kind: RuleKind, gross_pay: f64) -> f64 {
    rules
        .iter()
        .filter(|rule| rule.is_active && rule.kind == kind)
        .map(|rule| {
            if rule.is_percentage {
                gross_pay * rule.amount / 100.0
            } else {
                rule.amount
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals() -> AttendanceTotals {
        AttendanceTotals {
            hours_worked: 160.0,
            late_hours: 2.0,
            late_instances: 3,
            undertime_hours: 1.5,
            undertime_instances: 2,
            ..AttendanceTotals::default()
        }
    }

    fn loan(id: i64, amount: f64) -> PayrollRule {
        PayrollRule {
            id,
            name: format!("loan-{id}"),
            kind: RuleKind::Loan,
            amount,
            is_percentage: false,
            applies_to_all: false,
            is_active: true,
        }
    }

    #[test]
    fn hourly_basis_uses_recorded_hours() {
        let policy = PolicyConfig::default();
        let deductions = calculate_deductions(&totals(), 100.0, 20_000.0, &[], &policy);
        assert!((deductions.late_deductions - 200.0).abs() < 1e-9);
        assert!((deductions.undertime_deductions - 150.0).abs() < 1e-9);
    }

    #[test]
    fn fixed_basis_uses_instance_counts() {
        let mut policy = PolicyConfig::default();
        policy.late_deduction = DeductionBasis::FixedPerInstance(50.0);
        policy.undertime_deduction = DeductionBasis::FixedPerInstance(25.0);

        let deductions = calculate_deductions(&totals(), 100.0, 20_000.0, &[], &policy);
        assert!((deductions.late_deductions - 150.0).abs() < 1e-9);
        assert!((deductions.undertime_deductions - 50.0).abs() < 1e-9);
    }

    #[test]
    fn statutory_schemes_are_independent() {
        let policy = PolicyConfig::default();
        let deductions = calculate_deductions(
            &AttendanceTotals::default(),
            0.0,
            20_000.0,
            &[],
            &policy,
        );

        assert!((deductions.sss - 900.0).abs() < 1e-9);
        assert!((deductions.philhealth - 500.0).abs() < 1e-9);
        assert!((deductions.pagibig - 200.0).abs() < 1e-9);
        assert!(
            (deductions.taxable_income - (20_000.0 - 900.0 - 500.0 - 200.0)).abs() < 1e-9
        );
        // Below the first taxed bracket.
        assert_eq!(deductions.withholding_tax, 0.0);
    }

    #[test]
    fn withholding_applies_above_the_exempt_band() {
        let policy = PolicyConfig::default();
        let deductions = calculate_deductions(
            &AttendanceTotals::default(),
            0.0,
            40_000.0,
            &[],
            &policy,
        );
        assert!(deductions.withholding_tax > 0.0);
        assert!(deductions.taxable_income < 40_000.0);
    }

    #[test]
    fn loan_and_other_rules_stay_separate() {
        let policy = PolicyConfig::default();
        let mut other = loan(2, 300.0);
        other.kind = RuleKind::Deduction;
        let rules = vec![loan(1, 1_200.0), other];

        let deductions = calculate_deductions(
            &AttendanceTotals::default(),
            0.0,
            10_000.0,
            &rules,
            &policy,
        );
        assert_eq!(deductions.loan_deductions, 1_200.0);
        assert_eq!(deductions.other_deductions, 300.0);
    }

    #[test]
    fn total_is_the_sum_of_all_parts() {
        let policy = PolicyConfig::default();
        let deductions =
            calculate_deductions(&totals(), 100.0, 25_000.0, &[loan(1, 500.0)], &policy);
        let expected = deductions.late_deductions
            + deductions.undertime_deductions
            + deductions.sss
            + deductions.philhealth
            + deductions.pagibig
            + deductions.withholding_tax
            + deductions.loan_deductions
            + deductions.other_deductions;
        assert_eq!(deductions.total_deductions, expected);
    }
}
