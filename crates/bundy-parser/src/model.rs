use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a punch opens or closes a session. Derived from the free-text
/// status column of the device export ("C/In", "OverTime Out", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PunchDirection {
    In,
    Out,
}

impl PunchDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchDirection::In => "in",
            PunchDirection::Out => "out",
        }
    }
}

impl fmt::Display for PunchDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PunchDirection {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lowered = value.trim().to_ascii_lowercase();
        // "out" first: a status like "check out" must not fall through, and
        // no OUT spelling the terminals emit contains "in".
        if lowered.contains("out") {
            Ok(PunchDirection::Out)
        } else if lowered.contains("in") {
            Ok(PunchDirection::In)
        } else {
            Err(format!("status '{}' is neither IN nor OUT", value.trim()))
        }
    }
}

/// One row of a device export, column-split but otherwise untouched.
/// Timestamp text stays raw here; the engine owns normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPunchRow {
    pub line_index: usize,
    pub employee_no: String,
    pub display_name: String,
    pub timestamp_raw: String,
    pub status_raw: String,
    pub direction: PunchDirection,
    pub location: Option<String>,
    pub department: Option<String>,
}

/// A row the parser could not extract. Collected, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub line_index: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ParsedExport {
    pub format: &'static str,
    pub rows: Vec<RawPunchRow>,
    pub row_errors: Vec<RowError>,
}
