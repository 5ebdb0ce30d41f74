use csv::{ReaderBuilder, StringRecord, Trim};

use crate::errors::ParserError;
use crate::model::{ParsedExport, PunchDirection, RawPunchRow, RowError};
use crate::registry::ExportParser;

/// Comma-delimited attendance-log export (the usual "download as CSV"
/// output of biometric terminal software).
pub struct CommaAttlogParser;

impl ExportParser for CommaAttlogParser {
    fn name(&self) -> &'static str {
        "attlog_csv"
    }

    fn parse(&self, content: &str) -> Result<ParsedExport, ParserError> {
        parse_delimited(self.name(), b',', content)
    }
}

/// Tab-delimited variant. Some terminal firmwares export .txt dumps with
/// tabs; the column set is identical.
pub struct TabAttlogParser;

impl ExportParser for TabAttlogParser {
    fn name(&self) -> &'static str {
        "attlog_tsv"
    }

    fn parse(&self, content: &str) -> Result<ParsedExport, ParserError> {
        parse_delimited(self.name(), b'\t', content)
    }
}

struct ColumnMap {
    employee_no: usize,
    display_name: usize,
    timestamp: usize,
    status: usize,
    location: Option<usize>,
    department: Option<usize>,
}

const EMPLOYEE_NO_HEADERS: &[&str] = &[
    "acno",
    "no",
    "empno",
    "empcode",
    "employeeid",
    "empid",
    "badgenumber",
    "id",
];
const NAME_HEADERS: &[&str] = &["name", "empname", "employeename"];
const TIMESTAMP_HEADERS: &[&str] = &[
    "time",
    "datetime",
    "dateandtime",
    "date",
    "punchtime",
    "clockingtime",
];
const STATUS_HEADERS: &[&str] = &[
    "state",
    "status",
    "punchstate",
    "inout",
    "checktype",
    "clockingstatus",
];
const LOCATION_HEADERS: &[&str] = &["location", "area", "areaalias", "terminal", "station"];
const DEPARTMENT_HEADERS: &[&str] = &["department", "dept"];

fn parse_delimited(
    parser: &'static str,
    delimiter: u8,
    content: &str,
) -> Result<ParsedExport, ParserError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let header = loop {
        match records.next() {
            Some(Ok(record)) => {
                if record.iter().any(|cell| !cell.is_empty()) {
                    break record;
                }
            }
            Some(Err(source)) => return Err(ParserError::Csv { parser, source }),
            None => {
                return Err(ParserError::FormatMismatch {
                    parser,
                    reason: "file is empty".to_string(),
                })
            }
        }
    };

    let columns = resolve_columns(parser, &header)?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();

    // Physical line numbering: header was line 1.
    for (offset, record) in records.enumerate() {
        let line_index = offset + 2;
        let record = match record {
            Ok(record) => record,
            Err(source) => return Err(ParserError::Csv { parser, source }),
        };
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        match extract_row(line_index, &record, &columns) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError {
                line_index,
                message,
            }),
        }
    }

    if rows.is_empty() && row_errors.is_empty() {
        return Err(ParserError::EmptyData { parser });
    }

    Ok(ParsedExport {
        format: parser,
        rows,
        row_errors,
    })
}

fn resolve_columns(parser: &'static str, header: &StringRecord) -> Result<ColumnMap, ParserError> {
    let normalized: Vec<String> = header.iter().map(normalize_header).collect();

    let find = |candidates: &[&str]| {
        candidates
            .iter()
            .find_map(|candidate| normalized.iter().position(|cell| cell == candidate))
    };

    let mut missing = Vec::new();
    let employee_no = find(EMPLOYEE_NO_HEADERS);
    let display_name = find(NAME_HEADERS);
    let timestamp = find(TIMESTAMP_HEADERS);
    let status = find(STATUS_HEADERS);

    if employee_no.is_none() {
        missing.push("employee no");
    }
    if display_name.is_none() {
        missing.push("name");
    }
    if timestamp.is_none() {
        missing.push("date/time");
    }
    if status.is_none() {
        missing.push("status");
    }

    if !missing.is_empty() {
        return Err(ParserError::FormatMismatch {
            parser,
            reason: format!("header is missing required columns: {}", missing.join(", ")),
        });
    }

    Ok(ColumnMap {
        employee_no: employee_no.unwrap(),
        display_name: display_name.unwrap(),
        timestamp: timestamp.unwrap(),
        status: status.unwrap(),
        location: find(LOCATION_HEADERS),
        department: find(DEPARTMENT_HEADERS),
    })
}

fn normalize_header(cell: &str) -> String {
    cell.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn extract_row(
    line_index: usize,
    record: &StringRecord,
    columns: &ColumnMap,
) -> Result<RawPunchRow, String> {
    let required = |index: usize, label: &str| -> Result<String, String> {
        match record.get(index).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(format!("missing required column '{label}'")),
        }
    };

    let employee_no = required(columns.employee_no, "employee no")?;
    let display_name = required(columns.display_name, "name")?;
    let timestamp_raw = required(columns.timestamp, "date/time")?;
    let status_raw = required(columns.status, "status")?;

    let direction = PunchDirection::try_from(status_raw.as_str())?;

    Ok(RawPunchRow {
        line_index,
        employee_no,
        display_name,
        timestamp_raw,
        status_raw,
        direction,
        location: optional(record, columns.location),
        department: optional(record, columns.department),
    })
}

fn optional(record: &StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
