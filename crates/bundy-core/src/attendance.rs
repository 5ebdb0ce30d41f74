// crates/bundy-core/src/attendance.rs

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::classifier::{self, DaySlots};
use crate::config::PolicyConfig;
use crate::types::AttendanceRecord;

/// Builds the day's record from assigned slots. Flags are derived, never
/// carried in from the caller.
pub fn build_record(
    employee_id: i64,
    day: NaiveDate,
    slots: &DaySlots,
    batch_id: Option<Uuid>,
    policy: &PolicyConfig,
) -> AttendanceRecord {
    let derived = classifier::derive_flags(slots, policy);
    let mut record = AttendanceRecord {
        employee_id,
        day,
        morning_in: slots.morning_in,
        morning_out: slots.morning_out,
        afternoon_in: slots.afternoon_in,
        afternoon_out: slots.afternoon_out,
        time_in: derived.time_in,
        time_out: derived.time_out,
        hours_worked: derived.hours_worked,
        is_late: derived.is_late,
        is_absent: derived.is_absent,
        is_half_day: derived.is_half_day,
        is_early_out: derived.is_early_out,
        total_sessions: derived.total_sessions,
        session_type: derived.session_type,
        approval: crate::types::ApprovalStatus::Pending,
        batch_id,
    };
    record.approval = classifier::classify_approval(&record, policy);
    record
}

pub fn slots_of(record: &AttendanceRecord) -> DaySlots {
    DaySlots {
        morning_in: record.morning_in,
        morning_out: record.morning_out,
        afternoon_in: record.afternoon_in,
        afternoon_out: record.afternoon_out,
    }
}

/// Merges freshly classified slots into an existing record.
///
/// Slot-preserving: a slot the current event does not touch keeps its
/// stored value, so a later afternoon punch never erases an earlier
/// morning punch. Everything derived is recomputed from the merged slots.
pub fn merge_record(
    existing: &AttendanceRecord,
    fresh_slots: &DaySlots,
    batch_id: Option<Uuid>,
    policy: &PolicyConfig,
) -> AttendanceRecord {
    let merged = DaySlots {
        morning_in: fresh_slots.morning_in.or(existing.morning_in),
        morning_out: fresh_slots.morning_out.or(existing.morning_out),
        afternoon_in: fresh_slots.afternoon_in.or(existing.afternoon_in),
        afternoon_out: fresh_slots.afternoon_out.or(existing.afternoon_out),
    };
    build_record(
        existing.employee_id,
        existing.day,
        &merged,
        batch_id.or(existing.batch_id),
        policy,
    )
}

/// Explicit absence records for every working day in scope with no punch
/// and no existing record. `occupied` must already contain both the
/// persisted keys and the in-flight batch keys.
pub fn synthesize_absences(
    employee_ids: &[i64],
    working_days: &BTreeSet<NaiveDate>,
    occupied: &HashSet<(i64, NaiveDate)>,
) -> Vec<AttendanceRecord> {
    let mut seen = HashSet::new();
    let mut absences = Vec::new();

    for &employee_id in employee_ids {
        for &day in working_days {
            let key = (employee_id, day);
            if occupied.contains(&key) || !seen.insert(key) {
                continue;
            }
            absences.push(AttendanceRecord::absent(employee_id, day));
        }
    }

    absences
}
