// crates/bundy-core/src/sequencer.rs

use chrono::{DateTime, Utc};

use crate::types::{Punch, PunchDirection};

/// One resolved (IN, OUT) pair, possibly one-sided. No punch is ever
/// dropped: an unmatched side stays as a session with the other side null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub time_in: Option<DateTime<Utc>>,
    pub time_out: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_complete(&self) -> bool {
        self.time_in.is_some() && self.time_out.is_some()
    }

    pub fn duration_hours(&self) -> Option<f64> {
        match (self.time_in, self.time_out) {
            (Some(time_in), Some(time_out)) => {
                Some((time_out - time_in).num_seconds() as f64 / 3600.0)
            }
            _ => None,
        }
    }
}

/// Folds one employee-day's raw punches into ordered sessions.
///
/// Punches are sorted by instant and scanned once, keeping an "open IN":
/// a second IN closes the previous session one-sided, an OUT with no open
/// IN becomes a (null, OUT) session, a trailing open IN stays (IN, null).
pub fn fold_sessions(punches: &[Punch]) -> Vec<Session> {
    let mut ordered: Vec<&Punch> = punches.iter().collect();
    ordered.sort_by_key(|punch| punch.instant);

    let mut sessions = Vec::new();
    let mut open_in: Option<DateTime<Utc>> = None;

    for punch in ordered {
        match punch.direction {
            PunchDirection::In => {
                if let Some(time_in) = open_in.take() {
                    sessions.push(Session {
                        time_in: Some(time_in),
                        time_out: None,
                    });
                }
                open_in = Some(punch.instant);
            }
            PunchDirection::Out => match open_in.take() {
                Some(time_in) => sessions.push(Session {
                    time_in: Some(time_in),
                    time_out: Some(punch.instant),
                }),
                None => sessions.push(Session {
                    time_in: None,
                    time_out: Some(punch.instant),
                }),
            },
        }
    }

    if let Some(time_in) = open_in {
        sessions.push(Session {
            time_in: Some(time_in),
            time_out: None,
        });
    }

    sessions
}
