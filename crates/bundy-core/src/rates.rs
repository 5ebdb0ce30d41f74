// crates/bundy-core/src/rates.rs

use serde::Serialize;

use crate::config::PolicyConfig;
use crate::types::{PayrollRole, PayrollRule, RuleKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    RoleOverride,
    BaseRules,
    Unset,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ResolvedRate {
    pub daily_rate: f64,
    pub hourly_rate: f64,
    pub source: RateSource,
}

/// Daily rate, in priority order: active per-employee role override, then
/// the applicable Base rules, then zero. A zero rate is a valid outcome
/// the caller surfaces as a diagnostic, not an error.
pub fn resolve_rate(
    role: Option<&PayrollRole>,
    rules: &[PayrollRule],
    policy: &PolicyConfig,
) -> ResolvedRate {
    let (daily_rate, source) = match role.filter(|role| role.is_active) {
        Some(role) => (role.daily_rate, RateSource::RoleOverride),
        None => {
            let base_rules: Vec<&PayrollRule> = rules
                .iter()
                .filter(|rule| rule.is_active && rule.kind == RuleKind::Base)
                .collect();
            if base_rules.is_empty() {
                (0.0, RateSource::Unset)
            } else {
                let fixed: f64 = base_rules
                    .iter()
                    .filter(|rule| !rule.is_percentage)
                    .map(|rule| rule.amount)
                    .sum();
                // A percentage Base rule scales the fixed base.
                let scaled: f64 = base_rules
                    .iter()
                    .filter(|rule| rule.is_percentage)
                    .map(|rule| fixed * rule.amount / 100.0)
                    .sum();
                (fixed + scaled, RateSource::BaseRules)
            }
        }
    };

    let hourly_rate = if policy.standard_day_hours > 0.0 {
        daily_rate / policy.standard_day_hours
    } else {
        0.0
    };

    ResolvedRate {
        daily_rate,
        hourly_rate,
        source,
    }
}
