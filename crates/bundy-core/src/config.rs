// crates/bundy-core/src/config.rs

use std::path::Path;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::Holiday;

/// Every threshold, rate and statutory table the engine consults. One value
/// of this is threaded into every component call; nothing is read as
/// ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Reference timezone all punches and day boundaries resolve against.
    #[serde(with = "tz_serde")]
    pub timezone: Tz,

    pub standard_day_hours: f64,
    pub morning_window_start: NaiveTime,
    pub late_grace_minutes: i64,
    pub noon_boundary: NaiveTime,
    pub afternoon_start: NaiveTime,
    pub day_end_cutoff: NaiveTime,

    /// An IN between noon and the afternoon start counts as an afternoon
    /// arrival. Adjustable; the terminals at the gate see plenty of
    /// lunch-hour returns.
    pub lunch_gap_counts_as_afternoon: bool,
    /// Treat a single span from a morning IN to an afternoon OUT as one
    /// full day instead of a half-day pair with a missing lunch break.
    pub fold_full_day_single_session: bool,

    /// Minimum counted hours for a single-session day to qualify as a
    /// half-day session.
    pub half_day_minimum_hours: f64,

    pub auto_approve_late_limit_hours: f64,
    pub duplicate_punch_window_minutes: i64,
    pub persist_chunk_size: usize,

    pub overtime_tier_cap_hours: f64,
    pub overtime_rate_1: f64,
    pub overtime_rate_2: f64,
    pub regular_holiday_multiplier: f64,
    pub special_holiday_multiplier: f64,

    pub late_deduction: DeductionBasis,
    pub undertime_deduction: DeductionBasis,

    pub holidays: Vec<Holiday>,

    pub sss: ContributionTable,
    pub philhealth: ContributionTable,
    pub pagibig: ContributionTable,
    pub tax_brackets: Vec<TaxBracket>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "basis", content = "amount", rename_all = "snake_case")]
pub enum DeductionBasis {
    /// Deduct the recorded hours at the employee's hourly rate.
    HourlyRate,
    /// Flat amount per offending day, regardless of duration.
    FixedPerInstance(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BracketAmount {
    Fixed(f64),
    RateOfPay(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContributionBracket {
    pub min_pay: f64,
    pub max_pay: Option<f64>,
    pub amount: BracketAmount,
}

/// One statutory scheme: ordered brackets keyed by period pay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionTable {
    pub name: String,
    pub brackets: Vec<ContributionBracket>,
}

impl ContributionTable {
    /// Employee-share contribution for the given period pay. Pay below the
    /// first bracket or an empty table contributes nothing.
    pub fn contribution_for(&self, pay: f64) -> f64 {
        for bracket in &self.brackets {
            let above_min = pay >= bracket.min_pay;
            let below_max = bracket.max_pay.map(|max| pay < max).unwrap_or(true);
            if above_min && below_max {
                return match bracket.amount {
                    BracketAmount::Fixed(amount) => amount,
                    BracketAmount::RateOfPay(rate) => pay * rate,
                };
            }
        }
        0.0
    }
}

/// Progressive withholding bracket: tax = base_tax + rate over the excess
/// above `over`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaxBracket {
    pub over: f64,
    pub base_tax: f64,
    pub rate_over_excess: f64,
}

pub fn withholding_for(taxable: f64, brackets: &[TaxBracket]) -> f64 {
    if taxable <= 0.0 {
        return 0.0;
    }
    let mut applicable: Option<&TaxBracket> = None;
    for bracket in brackets {
        if taxable > bracket.over {
            applicable = Some(bracket);
        }
    }
    match applicable {
        Some(bracket) => bracket.base_tax + (taxable - bracket.over) * bracket.rate_over_excess,
        None => 0.0,
    }
}

impl PolicyConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PolicyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.standard_day_hours <= 0.0 {
            return Err(EngineError::Config(
                "standard_day_hours must be positive".to_string(),
            ));
        }
        if self.noon_boundary >= self.afternoon_start {
            return Err(EngineError::Config(
                "noon_boundary must precede afternoon_start".to_string(),
            ));
        }
        if self.persist_chunk_size == 0 {
            return Err(EngineError::Config(
                "persist_chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Manila,
            standard_day_hours: 8.0,
            morning_window_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            late_grace_minutes: 15,
            noon_boundary: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            afternoon_start: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            day_end_cutoff: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            lunch_gap_counts_as_afternoon: true,
            fold_full_day_single_session: true,
            half_day_minimum_hours: 4.0,
            auto_approve_late_limit_hours: 2.0,
            duplicate_punch_window_minutes: 5,
            persist_chunk_size: 250,
            overtime_tier_cap_hours: 8.0,
            overtime_rate_1: 1.25,
            overtime_rate_2: 1.5,
            regular_holiday_multiplier: 2.0,
            special_holiday_multiplier: 1.3,
            late_deduction: DeductionBasis::HourlyRate,
            undertime_deduction: DeductionBasis::HourlyRate,
            holidays: Vec::new(),
            sss: default_sss_table(),
            philhealth: default_philhealth_table(),
            pagibig: default_pagibig_table(),
            tax_brackets: default_tax_brackets(),
        }
    }
}

/// SSS monthly schedule, employee share. Salary credits step by 500 between
/// the floor and ceiling; the share is 4.5% of the credit midpoint.
fn default_sss_table() -> ContributionTable {
    const EMPLOYEE_SHARE: f64 = 0.045;
    const FLOOR: f64 = 4_000.0;
    const CEILING: f64 = 30_000.0;
    const STEP: f64 = 500.0;

    let mut brackets = vec![ContributionBracket {
        min_pay: 0.0,
        max_pay: Some(FLOOR + STEP / 2.0),
        amount: BracketAmount::Fixed(FLOOR * EMPLOYEE_SHARE),
    }];

    let mut credit = FLOOR + STEP;
    while credit < CEILING {
        brackets.push(ContributionBracket {
            min_pay: credit - STEP / 2.0,
            max_pay: Some(credit + STEP / 2.0),
            amount: BracketAmount::Fixed(credit * EMPLOYEE_SHARE),
        });
        credit += STEP;
    }

    brackets.push(ContributionBracket {
        min_pay: CEILING - STEP / 2.0,
        max_pay: None,
        amount: BracketAmount::Fixed(CEILING * EMPLOYEE_SHARE),
    });

    ContributionTable {
        name: "sss".to_string(),
        brackets,
    }
}

/// PhilHealth premium, employee half of the 5% rate with the 10k floor and
/// 100k ceiling.
fn default_philhealth_table() -> ContributionTable {
    ContributionTable {
        name: "philhealth".to_string(),
        brackets: vec![
            ContributionBracket {
                min_pay: 0.0,
                max_pay: Some(10_000.0),
                amount: BracketAmount::Fixed(250.0),
            },
            ContributionBracket {
                min_pay: 10_000.0,
                max_pay: Some(100_000.0),
                amount: BracketAmount::RateOfPay(0.025),
            },
            ContributionBracket {
                min_pay: 100_000.0,
                max_pay: None,
                amount: BracketAmount::Fixed(2_500.0),
            },
        ],
    }
}

/// Pag-IBIG employee share: 1% up to 1,500, 2% above, capped at the 10k
/// fund salary.
fn default_pagibig_table() -> ContributionTable {
    ContributionTable {
        name: "pagibig".to_string(),
        brackets: vec![
            ContributionBracket {
                min_pay: 0.0,
                max_pay: Some(1_500.0),
                amount: BracketAmount::RateOfPay(0.01),
            },
            ContributionBracket {
                min_pay: 1_500.0,
                max_pay: Some(10_000.0),
                amount: BracketAmount::RateOfPay(0.02),
            },
            ContributionBracket {
                min_pay: 10_000.0,
                max_pay: None,
                amount: BracketAmount::Fixed(200.0),
            },
        ],
    }
}

/// Monthly withholding schedule under the current revenue regulations.
fn default_tax_brackets() -> Vec<TaxBracket> {
    vec![
        TaxBracket {
            over: 0.0,
            base_tax: 0.0,
            rate_over_excess: 0.0,
        },
        TaxBracket {
            over: 20_833.0,
            base_tax: 0.0,
            rate_over_excess: 0.15,
        },
        TaxBracket {
            over: 33_333.0,
            base_tax: 1_875.0,
            rate_over_excess: 0.20,
        },
        TaxBracket {
            over: 66_667.0,
            base_tax: 8_541.80,
            rate_over_excess: 0.25,
        },
        TaxBracket {
            over: 166_667.0,
            base_tax: 33_541.80,
            rate_over_excess: 0.30,
        },
        TaxBracket {
            over: 666_667.0,
            base_tax: 183_541.80,
            rate_over_excess: 0.35,
        },
    ]
}

mod tz_serde {
    use chrono_tz::Tz;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Tz, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse::<Tz>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = PolicyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timezone, chrono_tz::Asia::Manila);
    }

    #[test]
    fn loads_partial_toml_over_defaults() {
        let config = PolicyConfig::from_toml_str(
            r#"
            timezone = "Asia/Singapore"
            late_grace_minutes = 10
            late_deduction = { basis = "fixed_per_instance", amount = 50.0 }
            "#,
        )
        .unwrap();

        assert_eq!(config.timezone, chrono_tz::Asia::Singapore);
        assert_eq!(config.late_grace_minutes, 10);
        assert_eq!(
            config.late_deduction,
            DeductionBasis::FixedPerInstance(50.0)
        );
        // Untouched fields keep their defaults.
        assert_eq!(config.standard_day_hours, 8.0);
    }

    #[test]
    fn rejects_zero_standard_hours() {
        let err = PolicyConfig::from_toml_str("standard_day_hours = 0.0").unwrap_err();
        assert!(err.to_string().contains("standard_day_hours"));
    }

    #[test]
    fn contribution_table_picks_bracket() {
        let config = PolicyConfig::default();
        // Below the floor: fixed share on the floor credit.
        assert!((config.sss.contribution_for(3_000.0) - 180.0).abs() < 1e-9);
        // Above the ceiling: capped.
        assert!((config.sss.contribution_for(95_000.0) - 1_350.0).abs() < 1e-9);
        // Rate-of-pay bracket.
        assert!((config.philhealth.contribution_for(20_000.0) - 500.0).abs() < 1e-9);
        // Empty pay contributes the lowest fixed bracket, not a crash.
        assert!(config.pagibig.contribution_for(0.0).abs() < 1e-9);
    }

    #[test]
    fn withholding_is_progressive() {
        let brackets = default_tax_brackets();
        assert_eq!(withholding_for(-100.0, &brackets), 0.0);
        assert_eq!(withholding_for(15_000.0, &brackets), 0.0);
        let tax = withholding_for(30_000.0, &brackets);
        assert!((tax - (30_000.0 - 20_833.0) * 0.15).abs() < 1e-6);
    }
}
