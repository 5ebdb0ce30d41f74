// crates/bundy-core/src/import.rs

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use bundy_parser::RawPunchRow;

use crate::attendance::{build_record, merge_record, synthesize_absences};
use crate::classifier;
use crate::clock;
use crate::config::PolicyConfig;
use crate::error::{EngineError, Result};
use crate::sequencer::fold_sessions;
use crate::store::{AttendanceStore, EmployeeDirectory, WorkCalendar};
use crate::types::{AttendanceRecord, Employee, ImportBatch, Punch};

#[derive(Debug)]
pub struct ImportRequest<'a> {
    pub source_file_name: String,
    pub uploaded_by: String,
    pub contents: &'a [u8],
}

#[derive(Debug, Clone, Serialize)]
pub struct RowDiagnostic {
    pub line_index: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub warnings: usize,
    pub absences_created: usize,
}

/// Everything the caller needs to render the import outcome and decide
/// repeat-upload policy. A duplicate checksum is flagged, never enforced.
#[derive(Debug, Serialize)]
pub struct ImportReceipt {
    pub batch_id: Uuid,
    pub checksum: String,
    pub duplicate_of: Option<Uuid>,
    pub format: String,
    pub summary: ImportSummary,
    pub errors: Vec<RowDiagnostic>,
    pub warnings: Vec<RowDiagnostic>,
}

enum Resolution {
    Matched(i64),
    Ambiguous(usize),
    Unknown,
}

struct EmployeeIndex {
    by_external: HashMap<String, i64>,
    by_name: HashMap<String, Vec<i64>>,
}

impl EmployeeIndex {
    fn build(employees: &[Employee]) -> Self {
        let mut by_external = HashMap::new();
        let mut by_name: HashMap<String, Vec<i64>> = HashMap::new();

        for employee in employees {
            if let Some(external) = &employee.external_id {
                let key = external.trim().to_ascii_lowercase();
                if !key.is_empty() {
                    by_external.insert(key, employee.id);
                }
            }

            let first_last = normalize_name(&format!(
                "{} {}",
                employee.first_name, employee.last_name
            ));
            let last_first = normalize_name(&format!(
                "{} {}",
                employee.last_name, employee.first_name
            ));
            for key in [first_last, last_first] {
                if key.is_empty() {
                    continue;
                }
                let ids = by_name.entry(key).or_default();
                if !ids.contains(&employee.id) {
                    ids.push(employee.id);
                }
            }
        }

        Self {
            by_external,
            by_name,
        }
    }

    /// Exact terminal-ID match wins; the display name is the fallback for
    /// terminals enrolled before badge numbers were assigned.
    fn resolve(&self, row: &RawPunchRow) -> Resolution {
        let external = row.employee_no.trim().to_ascii_lowercase();
        if let Some(&id) = self.by_external.get(&external) {
            return Resolution::Matched(id);
        }

        match self.by_name.get(&normalize_name(&row.display_name)) {
            Some(ids) if ids.len() == 1 => Resolution::Matched(ids[0]),
            Some(ids) if ids.len() > 1 => Resolution::Ambiguous(ids.len()),
            _ => Resolution::Unknown,
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drives one bulk import end to end: parse, resolve, group, reconcile,
/// synthesize absences, persist in bounded chunks. Row failures collect as
/// diagnostics; the batch itself never aborts over a bad row.
pub async fn import_export<S>(
    store: &S,
    calendar: &dyn WorkCalendar,
    policy: &PolicyConfig,
    request: ImportRequest<'_>,
) -> Result<ImportReceipt>
where
    S: AttendanceStore + EmployeeDirectory,
{
    let checksum = blake3::hash(request.contents).to_hex().to_string();
    let duplicate_of = store
        .find_batch_by_checksum(&checksum)
        .await?
        .map(|batch| batch.id);
    if duplicate_of.is_some() {
        tracing::warn!(
            file = %request.source_file_name,
            %checksum,
            "import content matches an earlier batch"
        );
    }

    let text = std::str::from_utf8(request.contents).map_err(|_| EngineError::NotUtf8)?;
    let parsed = bundy_parser::parse_export(text)?;

    let batch = ImportBatch {
        id: Uuid::new_v4(),
        source_file_name: request.source_file_name.clone(),
        source_size: request.contents.len() as u64,
        checksum: checksum.clone(),
        uploaded_by: request.uploaded_by.clone(),
        created_at: Utc::now(),
    };

    let mut summary = ImportSummary {
        total_rows: parsed.rows.len() + parsed.row_errors.len(),
        ..ImportSummary::default()
    };
    let mut errors: Vec<RowDiagnostic> = parsed
        .row_errors
        .iter()
        .map(|row_error| RowDiagnostic {
            line_index: Some(row_error.line_index),
            message: row_error.message.clone(),
        })
        .collect();
    let mut warnings: Vec<RowDiagnostic> = Vec::new();
    summary.skipped += errors.len();

    let employees = store.active_employees().await?;
    let index = EmployeeIndex::build(&employees);

    let mut groups: BTreeMap<(i64, NaiveDate), Vec<Punch>> = BTreeMap::new();

    for row in &parsed.rows {
        let employee_id = match index.resolve(row) {
            Resolution::Matched(id) => id,
            Resolution::Ambiguous(count) => {
                warnings.push(RowDiagnostic {
                    line_index: Some(row.line_index),
                    message: format!(
                        "name '{}' matches {count} employees; row skipped",
                        row.display_name
                    ),
                });
                summary.skipped += 1;
                continue;
            }
            Resolution::Unknown => {
                errors.push(RowDiagnostic {
                    line_index: Some(row.line_index),
                    message: format!(
                        "no employee matches id '{}' or name '{}'",
                        row.employee_no, row.display_name
                    ),
                });
                summary.skipped += 1;
                continue;
            }
        };

        let (instant, day) = match clock::normalize_device_timestamp(
            &row.timestamp_raw,
            policy.timezone,
        ) {
            Ok(normalized) => normalized,
            Err(err) => {
                errors.push(RowDiagnostic {
                    line_index: Some(row.line_index),
                    message: err.to_string(),
                });
                summary.skipped += 1;
                continue;
            }
        };

        groups.entry((employee_id, day)).or_default().push(Punch {
            employee_id,
            instant,
            direction: row.direction,
            raw_status: row.status_raw.clone(),
            location: row.location.clone(),
            department: row.department.clone(),
            batch_id: Some(batch.id),
        });
    }

    // Reconcile each employee-day independently, preserving whatever an
    // earlier batch already wrote for slots this one does not touch.
    let mut records: Vec<AttendanceRecord> = Vec::with_capacity(groups.len());
    let mut punches: Vec<Punch> = Vec::new();

    for ((employee_id, day), group) in &groups {
        let sessions = fold_sessions(group);
        let (slots, slot_warnings) = classifier::assign_slots(&sessions, policy);
        for message in slot_warnings {
            warnings.push(RowDiagnostic {
                line_index: None,
                message: format!("employee {employee_id} on {day}: {message}"),
            });
        }

        let record = match store.find_record(*employee_id, *day).await? {
            Some(existing) => {
                summary.updated += 1;
                merge_record(&existing, &slots, Some(batch.id), policy)
            }
            None => {
                summary.imported += 1;
                build_record(*employee_id, *day, &slots, Some(batch.id), policy)
            }
        };
        records.push(record);
        punches.extend(group.iter().cloned());
    }

    // Absence synthesis over the span the batch covers.
    if let (Some(&(_, first_day)), Some(&(_, last_day))) =
        (groups.keys().next(), groups.keys().last())
    {
        let working_days = working_days_between(calendar, first_day, last_day);
        let mut occupied = store.record_keys_in_range(first_day, last_day).await?;
        occupied.extend(records.iter().map(AttendanceRecord::key));

        let employee_ids: Vec<i64> = employees.iter().map(|employee| employee.id).collect();
        let absences = synthesize_absences(&employee_ids, &working_days, &occupied);
        summary.absences_created = absences.len();
        records.extend(absences);
    }

    store.insert_batch(&batch).await?;
    for chunk in punches.chunks(policy.persist_chunk_size) {
        store.insert_punches(chunk).await?;
    }
    for chunk in records.chunks(policy.persist_chunk_size) {
        store.upsert_records(chunk).await?;
        tracing::debug!(batch_id = %batch.id, rows = chunk.len(), "persisted record chunk");
    }

    summary.errors = errors.len();
    summary.warnings = warnings.len();

    tracing::info!(
        batch_id = %batch.id,
        file = %request.source_file_name,
        imported = summary.imported,
        updated = summary.updated,
        skipped = summary.skipped,
        absences = summary.absences_created,
        "import batch complete"
    );

    Ok(ImportReceipt {
        batch_id: batch.id,
        checksum,
        duplicate_of,
        format: parsed.format.to_string(),
        summary,
        errors,
        warnings,
    })
}

fn working_days_between(
    calendar: &dyn WorkCalendar,
    first: NaiveDate,
    last: NaiveDate,
) -> BTreeSet<NaiveDate> {
    let mut days = BTreeSet::new();
    let mut year = first.year();
    let mut month = first.month();

    loop {
        days.extend(
            calendar
                .working_days(year, month)
                .into_iter()
                .filter(|day| *day >= first && *day <= last),
        );
        if year == last.year() && month == last.month() {
            break;
        }
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }

    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::WeekdayCalendar;

    struct NoCalendar;
    impl WorkCalendar for NoCalendar {
        fn working_days(&self, _year: i32, _month: u32) -> BTreeSet<NaiveDate> {
            BTreeSet::new()
        }
    }

    #[test]
    fn name_normalization_ignores_case_and_punctuation() {
        assert_eq!(normalize_name("  Santos,   Maria "), "santos maria");
        assert_eq!(normalize_name("MARIA-SANTOS"), "maria santos");
        assert_eq!(normalize_name("...,"), "");
    }

    #[test]
    fn index_resolves_both_name_orders() {
        let employees = vec![
            Employee {
                id: 1,
                external_id: Some("1001".to_string()),
                first_name: "Maria".to_string(),
                last_name: "Santos".to_string(),
                department: None,
                position: None,
                is_active: true,
            },
            Employee {
                id: 2,
                external_id: None,
                first_name: "Jose".to_string(),
                last_name: "Cruz".to_string(),
                department: None,
                position: None,
                is_active: true,
            },
        ];
        let index = EmployeeIndex::build(&employees);

        let row = |no: &str, name: &str| RawPunchRow {
            line_index: 2,
            employee_no: no.to_string(),
            display_name: name.to_string(),
            timestamp_raw: "01/07/2025 08:00".to_string(),
            status_raw: "C/In".to_string(),
            direction: bundy_parser::PunchDirection::In,
            location: None,
            department: None,
        };

        assert!(matches!(
            index.resolve(&row("1001", "wrong name")),
            Resolution::Matched(1)
        ));
        assert!(matches!(
            index.resolve(&row("9999", "Cruz, Jose")),
            Resolution::Matched(2)
        ));
        assert!(matches!(
            index.resolve(&row("9999", "JOSE CRUZ")),
            Resolution::Matched(2)
        ));
        assert!(matches!(
            index.resolve(&row("9999", "Nobody Here")),
            Resolution::Unknown
        ));
    }

    #[test]
    fn ambiguous_names_are_flagged() {
        let twin = |id: i64| Employee {
            id,
            external_id: None,
            first_name: "Juan".to_string(),
            last_name: "Dela Cruz".to_string(),
            department: None,
            position: None,
            is_active: true,
        };
        let index = EmployeeIndex::build(&[twin(1), twin(2)]);

        let row = RawPunchRow {
            line_index: 2,
            employee_no: "9999".to_string(),
            display_name: "Juan Dela Cruz".to_string(),
            timestamp_raw: "01/07/2025 08:00".to_string(),
            status_raw: "C/In".to_string(),
            direction: bundy_parser::PunchDirection::In,
            location: None,
            department: None,
        };
        assert!(matches!(index.resolve(&row), Resolution::Ambiguous(2)));
    }

    #[test]
    fn working_days_between_spans_months() {
        let calendar = WeekdayCalendar::default();
        let days = working_days_between(
            &calendar,
            NaiveDate::from_ymd_opt(2025, 6, 27).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 2).unwrap(),
        );
        // Fri 27 Jun, Mon 30 Jun, Tue 1 Jul, Wed 2 Jul.
        assert_eq!(days.len(), 4);
    }

    #[test]
    fn empty_calendar_yields_no_days() {
        let days = working_days_between(
            &NoCalendar,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
        );
        assert!(days.is_empty());
    }
}
