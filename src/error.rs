use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Input file {path} contains no data rows")]
    EmptyInput { path: PathBuf },

    #[error("Input file {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("No valid rows left for {country} after cleaning")]
    NoValidRows { country: String },

    #[error("Insufficient input: {0}")]
    InsufficientInput(String),

    #[error("Column mismatch: expected {expected}, found {found}")]
    ColumnMismatch { expected: String, found: String },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Statistics error: {0}")]
    Statistics(String),
}
