use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the time-of-use analyzer.
#[derive(Error, Debug)]
pub enum TouError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be read.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// An energy quantity was not a number.
    #[error("Invalid quantity {value:?}: {source}")]
    QuantityParse {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// A required CSV column is absent from the header row.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A rate-plan identifier is not one of the predefined plans.
    #[error("Unknown rate plan: {0}")]
    UnknownRatePlan(String),

    /// A `YYYYMMDD` date argument could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A boolean command-line literal could not be interpreted.
    #[error("Invalid boolean literal: {0}")]
    InvalidBool(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the analyzer crates.
pub type Result<T> = std::result::Result<T, TouError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = TouError::FileRead {
            path: PathBuf::from("/data/UsageData_2018.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/UsageData_2018.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = TouError::TimestampParse("not-a-timestamp".to_string());
        assert_eq!(err.to_string(), "Invalid timestamp format: not-a-timestamp");
    }

    #[test]
    fn test_error_display_quantity_parse() {
        let source = "abc".parse::<f64>().unwrap_err();
        let err = TouError::QuantityParse {
            value: "abc".to_string(),
            source,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid quantity \"abc\""));
    }

    #[test]
    fn test_error_display_unknown_rate_plan() {
        let err = TouError::UnknownRatePlan("7".to_string());
        assert_eq!(err.to_string(), "Unknown rate plan: 7");
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = TouError::MissingColumn("Quantity".to_string());
        assert_eq!(err.to_string(), "Missing column: Quantity");
    }

    #[test]
    fn test_error_display_invalid_date() {
        let err = TouError::InvalidDate("2018-13-01".to_string());
        assert_eq!(err.to_string(), "Invalid date: 2018-13-01");
    }

    #[test]
    fn test_error_display_invalid_bool() {
        let err = TouError::InvalidBool("maybe".to_string());
        assert_eq!(err.to_string(), "Invalid boolean literal: maybe");
    }

    #[test]
    fn test_error_display_config() {
        let err = TouError::Config("no home directory".to_string());
        assert_eq!(err.to_string(), "Configuration error: no home directory");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: TouError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
