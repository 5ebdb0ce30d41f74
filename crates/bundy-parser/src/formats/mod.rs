mod attlog;

pub use attlog::{CommaAttlogParser, TabAttlogParser};
