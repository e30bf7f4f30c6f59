use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed for '{code}': {details}")]
    Validation { code: String, details: String },

    #[error("Invalid numeric input '{input}': {details}")]
    InvalidInput { input: String, details: String },

    #[error("Cell '{code}' for year {year} is read-only (rollup-derived)")]
    ReadOnlyCell { code: String, year: i32 },

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalyticsError {
    /// True for failures of an external collaborator (workbook codec, file
    /// store, exporter). These never reflect a corrupted in-memory statement.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Workbook(_) | Self::Csv(_) | Self::SerializationError(_) | Self::IoError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let io = AnalyticsError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_io());
        assert!(AnalyticsError::Workbook("missing sheet".to_string()).is_io());
        assert!(!AnalyticsError::NotFound("balance".to_string()).is_io());
        assert!(!AnalyticsError::ReadOnlyCell {
            code: "1100".to_string(),
            year: 2015
        }
        .is_io());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = AnalyticsError::Validation {
            code: "1600".to_string(),
            details: "total rows are rollup-derived".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation failed for '1600': total rows are rollup-derived"
        );
    }
}
