// crates/bundy-core/src/timeclock.rs

use chrono::{DateTime, Utc};

use crate::attendance::{build_record, slots_of};
use crate::clock;
use crate::config::PolicyConfig;
use crate::error::Result;
use crate::store::AttendanceStore;
use crate::types::{AttendanceRecord, Punch, PunchDirection};

#[derive(Debug, Clone)]
pub struct PunchOutcome {
    pub accepted: bool,
    pub reason: Option<String>,
    pub record: Option<AttendanceRecord>,
}

impl PunchOutcome {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
            record: None,
        }
    }
}

/// Records a live clock action against the employee's day.
///
/// Rejecting a second time-in is a business rule for the kiosk, distinct
/// from the idempotent reconciliation the bulk import does. The store's
/// upsert is atomic per (employee, day), which serializes two racing
/// punches for the same employee.
pub async fn record_punch<S: AttendanceStore>(
    store: &S,
    policy: &PolicyConfig,
    employee_id: i64,
    direction: PunchDirection,
    now: DateTime<Utc>,
) -> Result<PunchOutcome> {
    let tz = policy.timezone;
    let day = clock::business_day(now, tz);
    let local = clock::local_time(now, tz);

    let existing = store.find_record(employee_id, day).await?;
    let mut slots = existing.as_ref().map(slots_of).unwrap_or_default();

    match direction {
        PunchDirection::In => {
            let window = chrono::Duration::minutes(policy.duplicate_punch_window_minutes);
            let duplicate = [slots.morning_in, slots.afternoon_in]
                .into_iter()
                .flatten()
                .any(|time| time <= local && local - time < window);
            if duplicate {
                return Ok(PunchOutcome::rejected(format!(
                    "duplicate time-in within {} minutes",
                    policy.duplicate_punch_window_minutes
                )));
            }

            let afternoon = if local < policy.noon_boundary {
                false
            } else if local >= policy.afternoon_start {
                true
            } else {
                policy.lunch_gap_counts_as_afternoon
            };

            if afternoon {
                if slots.afternoon_in.is_some() {
                    return Ok(PunchOutcome::rejected(
                        "already timed in for the afternoon session",
                    ));
                }
                slots.afternoon_in = Some(local);
            } else {
                if slots.morning_in.is_some() {
                    return Ok(PunchOutcome::rejected(
                        "already timed in for the morning session",
                    ));
                }
                slots.morning_in = Some(local);
            }
        }
        PunchDirection::Out => {
            if slots.afternoon_in.is_some() && slots.afternoon_out.is_none() {
                slots.afternoon_out = Some(local);
            } else if slots.morning_in.is_some() && slots.morning_out.is_none() {
                if local >= policy.afternoon_start && policy.fold_full_day_single_session {
                    // Worked straight through: close the day as one span.
                    slots.afternoon_out = Some(local);
                } else {
                    slots.morning_out = Some(local);
                }
            } else {
                return Ok(PunchOutcome::rejected("no open time-in found for today"));
            }
        }
    }

    let batch_id = existing.as_ref().and_then(|record| record.batch_id);
    let record = build_record(employee_id, day, &slots, batch_id, policy);

    store
        .insert_punches(&[Punch {
            employee_id,
            instant: now,
            direction,
            raw_status: match direction {
                PunchDirection::In => "clock-in".to_string(),
                PunchDirection::Out => "clock-out".to_string(),
            },
            location: None,
            department: None,
            batch_id: None,
        }])
        .await?;
    store.upsert_records(&[record.clone()]).await?;

    tracing::info!(
        employee_id,
        %day,
        direction = direction.as_str(),
        "recorded live punch"
    );

    Ok(PunchOutcome {
        accepted: true,
        reason: None,
        record: Some(record),
    })
}
