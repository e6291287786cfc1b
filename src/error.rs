// Error taxonomy for the residuals pipeline
// Schema violations are fatal; parse coercions never surface here

use thiserror::Error;

/// Errors that abort a pipeline run.
///
/// Malformed cell values (bad dates, non-numeric amounts) are NOT errors;
/// they coerce to empty/zero at the stage that reads them. Only structural
/// problems with an input table terminate the run, so that no partial or
/// corrupt output is ever emitted.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("missing expected column {column:?} in source {input}")]
    MissingColumn { column: String, input: String },

    #[error("source {input} has no column at position {index}")]
    ColumnOutOfRange { index: usize, input: String },

    #[error("CSV error in {input}: {message}")]
    Csv { input: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn missing_column(column: &str, input: &str) -> Self {
        PipelineError::MissingColumn {
            column: column.to_string(),
            input: input.to_string(),
        }
    }
}

/// Result type for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message_names_source_and_column() {
        let err = PipelineError::missing_column("Merchant ID", "TSYS roster");
        let msg = err.to_string();
        assert!(msg.contains("Merchant ID"));
        assert!(msg.contains("TSYS roster"));
    }
}
