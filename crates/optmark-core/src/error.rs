use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptmarkError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Malformed row {row}: {field} — {reason}")]
    MalformedRow {
        row: usize,
        field: String,
        reason: String,
    },

    #[error("Unrecognized option type '{token}' in row {row} (expected CE or PE)")]
    UnknownOptionKind { row: usize, token: String },

    #[error("Calibration error for {key}: {reason}")]
    Calibration { key: String, reason: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for OptmarkError {
    fn from(e: serde_json::Error) -> Self {
        OptmarkError::SerializationError(e.to_string())
    }
}
