//! Error taxonomy for the image-to-calendar pipeline.
//!
//! Every stage returns [`ScheduleError`]. Nothing is retried or downgraded to a
//! warning: the variant travels unchanged to the CLI or HTTP caller, which turns
//! it into a message (and, for HTTP, a status code).

use thiserror::Error;

/// Result type alias for pipeline stages.
pub type Result<T> = std::result::Result<T, ScheduleError>;

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// OCR service or network failure, or an image that could not be read.
    #[error("OCR failed: {0}")]
    Ocr(String),

    /// The schedule parser returned output that is not the expected JSON.
    #[error("Could not parse schedule: {0}")]
    Parse(String),

    /// Entries that cannot become events (inverted times, no weekdays at all).
    #[error("{0}")]
    Validation(String),

    /// OCR ran but found no words in the image.
    #[error("No text detected in image")]
    EmptyTable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScheduleError {
    pub fn ocr(message: impl Into<String>) -> Self {
        Self::Ocr(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable identifier used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ocr(_) => "ocr_error",
            Self::Parse(_) => "parse_error",
            Self::Validation(_) => "validation_error",
            Self::EmptyTable => "empty_table",
            Self::Io(_) => "io_error",
        }
    }

    /// HTTP status reported by the upload endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Ocr(_) | Self::Parse(_) => 502,
            Self::Validation(_) | Self::EmptyTable => 422,
            Self::Io(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(ScheduleError::ocr("timeout").status_code(), 502);
        assert_eq!(ScheduleError::parse("not json").status_code(), 502);
        assert_eq!(ScheduleError::validation("bad").status_code(), 422);
        assert_eq!(ScheduleError::EmptyTable.status_code(), 422);
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            ScheduleError::ocr("service unavailable").to_string(),
            "OCR failed: service unavailable"
        );
        assert_eq!(
            ScheduleError::validation("No schedule entries found").to_string(),
            "No schedule entries found"
        );
        assert_eq!(ScheduleError::EmptyTable.to_string(), "No text detected in image");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ScheduleError = io.into();
        assert_eq!(err.kind(), "io_error");
        assert_eq!(err.status_code(), 500);
    }
}
