pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{ParserAttempt, ParserError};
pub use model::{ParsedExport, PunchDirection, RawPunchRow, RowError};
pub use registry::{parse_export, parse_with_parsers, ExportParser};
