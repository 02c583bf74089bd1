use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Workbook could not be read: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("Required sheet '{sheet}' is missing from the extract")]
    MissingSheet { sheet: String },

    #[error("Required column '{column}' is missing from sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    #[error("Row {row} is structurally invalid: {reason}")]
    Normalization { row: usize, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
