// crates/bundy-core/src/earnings.rs

use serde::Serialize;

use crate::config::PolicyConfig;
use crate::payroll::AttendanceTotals;
use crate::rates::ResolvedRate;
use crate::types::{PayrollRule, RuleKind};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EarningsBreakdown {
    pub regular_pay: f64,
    pub overtime_pay: f64,
    pub holiday_pay: f64,
    pub allowances: f64,
    pub bonuses: f64,
    pub total_earnings: f64,
}

/// Attendance summary + rate -> itemized earnings. All currency outputs
/// are rounded to centavos; the total is the sum of the rounded parts so
/// downstream invariants hold exactly.
pub fn calculate_earnings(
    totals: &AttendanceTotals,
    rate: &ResolvedRate,
    rules: &[PayrollRule],
    policy: &PolicyConfig,
) -> EarningsBreakdown {
    let hourly = rate.hourly_rate;
    let holiday_hours = totals.holiday_regular_hours + totals.holiday_special_hours;

    let regular_hours =
        (totals.hours_worked - totals.overtime_hours - holiday_hours).max(0.0);
    let regular_pay = round_centavos(regular_hours * hourly);

    let tier_one = totals.overtime_hours.min(policy.overtime_tier_cap_hours);
    let tier_two = (totals.overtime_hours - policy.overtime_tier_cap_hours).max(0.0);
    let overtime_pay = round_centavos(
        tier_one * hourly * policy.overtime_rate_1 + tier_two * hourly * policy.overtime_rate_2,
    );

    let holiday_pay = round_centavos(
        totals.holiday_regular_hours * hourly * (policy.regular_holiday_multiplier - 1.0)
            + totals.holiday_special_hours * hourly * (policy.special_holiday_multiplier - 1.0),
    );

    // Percentage allowances and bonuses resolve against the pay computed
    // so far, not against themselves.
    let pay_base = regular_pay + overtime_pay + holiday_pay;
    let allowances = round_centavos(sum_rules(rules, RuleKind::Allowance, pay_base));
    let bonuses = round_centavos(sum_rules(rules, RuleKind::Bonus, pay_base));

    let total_earnings = regular_pay + overtime_pay + holiday_pay + allowances + bonuses;

    EarningsBreakdown {
        regular_pay,
        overtime_pay,
        holiday_pay,
        allowances,
        bonuses,
        total_earnings,
    }
}

fn sum_rules(rules: &[PayrollRule], kind: RuleKind, pay_base: f64) -> f64 {
    rules
        .iter()
        .filter(|rule| rule.is_active && rule.kind == kind)
        .map(|rule| {
            if rule.is_percentage {
                pay_base * rule.amount / 100.0
            } else {
                rule.amount
            }
        })
        .sum()
}

pub(crate) fn round_centavos(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::RateSource;

    fn rate(hourly: f64) -> ResolvedRate {
        ResolvedRate {
            daily_rate: hourly * 8.0,
            hourly_rate: hourly,
            source: RateSource::RoleOverride,
        }
    }

    fn totals(hours: f64, overtime: f64) -> AttendanceTotals {
        AttendanceTotals {
            hours_worked: hours,
            overtime_hours: overtime,
            ..AttendanceTotals::default()
        }
    }

    fn rule(kind: RuleKind, amount: f64, is_percentage: bool) -> PayrollRule {
        PayrollRule {
            id: 1,
            name: "r".to_string(),
            kind,
            amount,
            is_percentage,
            applies_to_all: true,
            is_active: true,
        }
    }

    #[test]
    fn overtime_splits_across_the_tier_cap() {
        let policy = PolicyConfig::default();
        let earnings = calculate_earnings(&totals(160.0, 10.0), &rate(100.0), &[], &policy);

        // 8 hours at 1.25x, 2 hours at 1.5x; never one flat multiplier.
        assert!((earnings.overtime_pay - (8.0 * 125.0 + 2.0 * 150.0)).abs() < 1e-9);
        assert!((earnings.regular_pay - 150.0 * 100.0).abs() < 1e-9);
        assert_eq!(
            earnings.total_earnings,
            earnings.regular_pay + earnings.overtime_pay
        );
    }

    #[test]
    fn overtime_below_cap_uses_first_tier_only() {
        let policy = PolicyConfig::default();
        let earnings = calculate_earnings(&totals(84.0, 4.0), &rate(100.0), &[], &policy);
        assert!((earnings.overtime_pay - 4.0 * 125.0).abs() < 1e-9);
    }

    #[test]
    fn regular_pay_floors_at_zero() {
        let policy = PolicyConfig::default();
        // Pathological data: more overtime than hours.
        let earnings = calculate_earnings(&totals(4.0, 10.0), &rate(100.0), &[], &policy);
        assert_eq!(earnings.regular_pay, 0.0);
    }

    #[test]
    fn holiday_pay_uses_kind_multiplier_premium() {
        let policy = PolicyConfig::default();
        let mut t = totals(16.0, 0.0);
        t.holiday_regular_hours = 8.0;
        t.holiday_special_hours = 8.0;

        let earnings = calculate_earnings(&t, &rate(100.0), &[], &policy);
        // Premium over the base rate: (2.0 - 1) and (1.3 - 1).
        assert!((earnings.holiday_pay - (8.0 * 100.0 * 1.0 + 8.0 * 100.0 * 0.3)).abs() < 1e-9);
        assert_eq!(earnings.regular_pay, 0.0);
    }

    #[test]
    fn percentage_allowance_resolves_against_pay_base() {
        let policy = PolicyConfig::default();
        let rules = vec![
            rule(RuleKind::Allowance, 10.0, true),
            rule(RuleKind::Allowance, 500.0, false),
            rule(RuleKind::Bonus, 1_000.0, false),
        ];
        let earnings = calculate_earnings(&totals(80.0, 0.0), &rate(100.0), &rules, &policy);

        assert!((earnings.allowances - (800.0 + 500.0)).abs() < 1e-9);
        assert_eq!(earnings.bonuses, 1_000.0);
        assert_eq!(
            earnings.total_earnings,
            earnings.regular_pay + earnings.allowances + earnings.bonuses
        );
    }

    #[test]
    fn inactive_rules_are_ignored() {
        let policy = PolicyConfig::default();
        let mut inactive = rule(RuleKind::Bonus, 1_000.0, false);
        inactive.is_active = false;
        let earnings = calculate_earnings(&totals(80.0, 0.0), &rate(100.0), &[inactive], &policy);
        assert_eq!(earnings.bonuses, 0.0);
    }
}
