// crates/bundy-core/src/error.rs

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("export parsing failed: {0}")]
    Parser(#[from] bundy_parser::ParserError),

    #[error("import file was not valid UTF-8")]
    NotUtf8,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
