// crates/bundy-core/src/classifier.rs

use chrono::NaiveTime;

use crate::clock;
use crate::config::PolicyConfig;
use crate::sequencer::Session;
use crate::types::{ApprovalStatus, AttendanceRecord, SessionType};

/// The four time slots of one attendance day, wall-clock in the reference
/// timezone. A full-day span fills morning-IN and afternoon-OUT only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaySlots {
    pub morning_in: Option<NaiveTime>,
    pub morning_out: Option<NaiveTime>,
    pub afternoon_in: Option<NaiveTime>,
    pub afternoon_out: Option<NaiveTime>,
}

impl DaySlots {
    /// One span from a morning arrival to an afternoon departure, with no
    /// lunch punches in between.
    pub fn is_full_day_span(&self) -> bool {
        self.morning_in.is_some()
            && self.afternoon_out.is_some()
            && self.morning_out.is_none()
            && self.afternoon_in.is_none()
    }
}

/// Everything derivable from the slots alone. Recomputed whenever slots
/// change, so merged records never carry stale flags.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFlags {
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub hours_worked: Option<f64>,
    pub is_late: bool,
    pub is_absent: bool,
    pub is_half_day: bool,
    pub is_early_out: bool,
    pub total_sessions: u32,
    pub session_type: Option<SessionType>,
}

#[derive(Debug, Clone)]
pub struct DayClassification {
    pub slots: DaySlots,
    pub derived: DerivedFlags,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Morning,
    Afternoon,
}

/// Assigns ordered sessions to the morning/afternoon slots.
///
/// In sequence order: the first session becomes a full-day span when it
/// runs from before noon to at/after the afternoon start; otherwise each
/// session lands in the slot its IN (or lone OUT) falls in, the second
/// session takes whichever slot is still empty, and anything further is
/// recorded as a warning.
pub fn assign_slots(sessions: &[Session], policy: &PolicyConfig) -> (DaySlots, Vec<String>) {
    let tz = policy.timezone;
    let mut slots = DaySlots::default();
    let mut warnings = Vec::new();
    let mut morning_taken = false;
    let mut afternoon_taken = false;

    for (index, session) in sessions.iter().enumerate() {
        let in_local = session.time_in.map(|instant| clock::local_time(instant, tz));
        let out_local = session.time_out.map(|instant| clock::local_time(instant, tz));

        if index == 0 && policy.fold_full_day_single_session {
            if let (Some(time_in), Some(time_out)) = (in_local, out_local) {
                if time_in < policy.noon_boundary && time_out >= policy.afternoon_start {
                    slots.morning_in = Some(time_in);
                    slots.afternoon_out = Some(time_out);
                    morning_taken = true;
                    afternoon_taken = true;
                    continue;
                }
            }
        }

        let reference = match in_local.or(out_local) {
            Some(time) => time,
            None => continue,
        };

        let natural = if reference < policy.noon_boundary {
            Slot::Morning
        } else if reference >= policy.afternoon_start {
            Slot::Afternoon
        } else if policy.lunch_gap_counts_as_afternoon {
            Slot::Afternoon
        } else {
            Slot::Morning
        };

        let target = match natural {
            Slot::Morning if !morning_taken => Some(Slot::Morning),
            Slot::Afternoon if !afternoon_taken => Some(Slot::Afternoon),
            // The other slot, when still empty, takes the leftover session.
            _ if !morning_taken => Some(Slot::Morning),
            _ if !afternoon_taken => Some(Slot::Afternoon),
            _ => None,
        };

        match target {
            Some(Slot::Morning) => {
                slots.morning_in = in_local;
                slots.morning_out = out_local;
                morning_taken = true;
            }
            Some(Slot::Afternoon) => {
                slots.afternoon_in = in_local;
                slots.afternoon_out = out_local;
                afternoon_taken = true;
            }
            None => warnings.push(format!(
                "session {} ignored: both slots already assigned",
                index + 1
            )),
        }
    }

    (slots, warnings)
}

/// Derives hours, flags, session count and type from the slots.
pub fn derive_flags(slots: &DaySlots, policy: &PolicyConfig) -> DerivedFlags {
    let time_in = [slots.morning_in, slots.afternoon_in]
        .into_iter()
        .flatten()
        .min();
    let time_out = [slots.morning_out, slots.afternoon_out]
        .into_iter()
        .flatten()
        .max();

    let (hours, total_sessions) = if slots.is_full_day_span() {
        (
            span_hours(slots.morning_in, slots.afternoon_out),
            2,
        )
    } else {
        let morning = span_hours(slots.morning_in, slots.morning_out);
        let afternoon = span_hours(slots.afternoon_in, slots.afternoon_out);
        let count = morning.is_some() as u32 + afternoon.is_some() as u32;
        match (morning, afternoon) {
            (None, None) => (None, count),
            (a, b) => (Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)), count),
        }
    };

    let grace = chrono::Duration::minutes(policy.late_grace_minutes);
    let is_late = slots
        .morning_in
        .map(|time| time > policy.morning_window_start + grace)
        .unwrap_or(false);

    let is_absent = time_in.is_none() || time_out.is_none();
    let is_early_out = time_out
        .map(|time| time < policy.day_end_cutoff)
        .unwrap_or(false);
    let is_half_day = total_sessions <= 1
        && time_out
            .map(|time| time < policy.day_end_cutoff)
            .unwrap_or(false);

    let session_type = match total_sessions {
        0 => None,
        1 => {
            let qualifies = hours
                .map(|worked| worked >= policy.half_day_minimum_hours)
                .unwrap_or(false);
            qualifies.then_some(SessionType::HalfDay)
        }
        _ => Some(SessionType::FullDay),
    };

    DerivedFlags {
        time_in,
        time_out,
        hours_worked: hours,
        is_late,
        is_absent,
        is_half_day,
        is_early_out,
        total_sessions,
        session_type,
    }
}

pub fn classify_day(sessions: &[Session], policy: &PolicyConfig) -> DayClassification {
    let (slots, warnings) = assign_slots(sessions, policy);
    let derived = derive_flags(&slots, policy);
    DayClassification {
        slots,
        derived,
        warnings,
    }
}

/// Auto-approval: an on-time or mildly late day needs no human eye; an
/// absence or a lateness past the limit stays pending.
pub fn classify_approval(record: &AttendanceRecord, policy: &PolicyConfig) -> ApprovalStatus {
    if record.is_absent {
        return ApprovalStatus::Pending;
    }
    if !record.is_late {
        return ApprovalStatus::Approved;
    }
    let lateness_hours = record
        .morning_in
        .map(|time| {
            (time - policy.morning_window_start).num_seconds() as f64 / 3600.0
        })
        .unwrap_or(0.0);
    if lateness_hours <= policy.auto_approve_late_limit_hours {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Pending
    }
}

fn span_hours(start: Option<NaiveTime>, end: Option<NaiveTime>) -> Option<f64> {
    match (start, end) {
        // A reversed pair (merged from garbage device data) counts zero,
        // never negative hours.
        (Some(start), Some(end)) => {
            Some(((end - start).num_seconds() as f64 / 3600.0).max(0.0))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::fold_sessions;
    use crate::types::{Punch, PunchDirection};
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::Tz;

    const MANILA: Tz = chrono_tz::Asia::Manila;

    fn manila_punch(hour: u32, minute: u32, direction: PunchDirection) -> Punch {
        let local = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        let instant = MANILA
            .from_local_datetime(&local)
            .single()
            .unwrap()
            .with_timezone(&Utc);
        Punch {
            employee_id: 1,
            instant,
            direction,
            raw_status: direction.as_str().to_string(),
            location: None,
            department: None,
            batch_id: None,
        }
    }

    fn classify(punches: &[Punch], policy: &PolicyConfig) -> DayClassification {
        classify_day(&fold_sessions(punches), policy)
    }

    #[test]
    fn single_span_becomes_full_day() {
        let policy = PolicyConfig::default();
        let result = classify(
            &[
                manila_punch(7, 55, PunchDirection::In),
                manila_punch(17, 5, PunchDirection::Out),
            ],
            &policy,
        );

        assert!(result.slots.is_full_day_span());
        assert_eq!(result.derived.total_sessions, 2);
        assert_eq!(result.derived.session_type, Some(SessionType::FullDay));
        assert!(!result.derived.is_late);
        assert!(!result.derived.is_half_day);
        assert!(!result.derived.is_early_out);
        let hours = result.derived.hours_worked.unwrap();
        assert!((hours - 9.1666).abs() < 0.001);
    }

    #[test]
    fn grace_period_bounds_lateness() {
        let policy = PolicyConfig::default();

        let late = classify(&[manila_punch(8, 20, PunchDirection::In)], &policy);
        assert!(late.derived.is_late);

        let on_time = classify(&[manila_punch(8, 10, PunchDirection::In)], &policy);
        assert!(!on_time.derived.is_late);

        // Exactly at the grace boundary is still on time.
        let boundary = classify(&[manila_punch(8, 15, PunchDirection::In)], &policy);
        assert!(!boundary.derived.is_late);
    }

    #[test]
    fn morning_only_session_is_half_day() {
        let policy = PolicyConfig::default();
        let result = classify(
            &[
                manila_punch(7, 58, PunchDirection::In),
                manila_punch(12, 30, PunchDirection::Out),
            ],
            &policy,
        );

        assert!(result.derived.is_half_day);
        assert!(!result.derived.is_absent);
        assert!(result.derived.is_early_out);
        assert_eq!(result.derived.total_sessions, 1);
        assert_eq!(result.derived.session_type, Some(SessionType::HalfDay));
        let hours = result.derived.hours_worked.unwrap();
        assert!((hours - 4.533).abs() < 0.001);
    }

    #[test]
    fn lunch_hour_in_goes_to_afternoon_by_policy() {
        let mut policy = PolicyConfig::default();
        let punches = [
            manila_punch(12, 30, PunchDirection::In),
            manila_punch(17, 0, PunchDirection::Out),
        ];

        let result = classify(&punches, &policy);
        assert!(result.slots.afternoon_in.is_some());
        assert!(result.slots.morning_in.is_none());

        policy.lunch_gap_counts_as_afternoon = false;
        let result = classify(&punches, &policy);
        assert!(result.slots.morning_in.is_some());
    }

    #[test]
    fn two_sessions_fill_both_slots() {
        let policy = PolicyConfig::default();
        let result = classify(
            &[
                manila_punch(8, 0, PunchDirection::In),
                manila_punch(12, 0, PunchDirection::Out),
                manila_punch(13, 0, PunchDirection::In),
                manila_punch(17, 30, PunchDirection::Out),
            ],
            &policy,
        );

        assert_eq!(result.derived.total_sessions, 2);
        assert_eq!(result.derived.session_type, Some(SessionType::FullDay));
        assert_eq!(result.derived.hours_worked, Some(8.5));
        assert!(!result.derived.is_half_day);
        assert!(!result.derived.is_early_out);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn third_session_is_warned_and_ignored() {
        let policy = PolicyConfig::default();
        let result = classify(
            &[
                manila_punch(8, 0, PunchDirection::In),
                manila_punch(10, 0, PunchDirection::Out),
                manila_punch(13, 0, PunchDirection::In),
                manila_punch(15, 0, PunchDirection::Out),
                manila_punch(15, 30, PunchDirection::In),
                manila_punch(17, 0, PunchDirection::Out),
            ],
            &policy,
        );

        assert_eq!(result.derived.total_sessions, 2);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.derived.hours_worked, Some(4.0));
    }

    #[test]
    fn one_sided_out_is_absent_but_recorded() {
        let policy = PolicyConfig::default();
        let result = classify(&[manila_punch(17, 0, PunchDirection::Out)], &policy);

        assert!(result.derived.is_absent);
        assert!(result.derived.time_in.is_none());
        assert_eq!(result.derived.time_out, NaiveTime::from_hms_opt(17, 0, 0));
        assert_eq!(result.derived.total_sessions, 0);
        assert!(result.derived.hours_worked.is_none());
    }

    #[test]
    fn no_sessions_is_fully_empty() {
        let policy = PolicyConfig::default();
        let result = classify(&[], &policy);
        assert!(result.derived.is_absent);
        assert_eq!(result.derived.total_sessions, 0);
        assert!(result.derived.session_type.is_none());
    }

    #[test]
    fn approval_auto_approves_mild_lateness() {
        let policy = PolicyConfig::default();
        let mut record = AttendanceRecord::absent(1, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(classify_approval(&record, &policy), ApprovalStatus::Pending);

        record.is_absent = false;
        record.is_late = true;
        record.morning_in = NaiveTime::from_hms_opt(9, 30, 0);
        assert_eq!(classify_approval(&record, &policy), ApprovalStatus::Approved);

        record.morning_in = NaiveTime::from_hms_opt(10, 30, 0);
        assert_eq!(classify_approval(&record, &policy), ApprovalStatus::Pending);

        record.is_late = false;
        assert_eq!(classify_approval(&record, &policy), ApprovalStatus::Approved);
    }
}
