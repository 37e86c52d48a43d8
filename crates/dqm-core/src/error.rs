//! Error types for the DQM monitors

use thiserror::Error;

/// DQM error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be read or is inconsistent
    #[error("Config error: {0}")]
    Config(String),

    /// Detector geometry is not available for the current run
    #[error("Geometry unavailable: {0}")]
    GeometryUnavailable(String),

    /// The event source reported a collection as invalid for this event
    #[error("Data source invalid: {0}")]
    DataSourceInvalid(String),

    /// Histogram booking failed (bad binning, duplicate name)
    #[error("Booking error: {0}")]
    Booking(String),

    /// Object selection expression failed to compile
    #[error("Selection error: {0}")]
    Selection(String),

    /// Two accumulators could not be merged
    #[error("Merge error: {0}")]
    Merge(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let e = Error::GeometryUnavailable("run 1".into());
        assert_eq!(e.to_string(), "Geometry unavailable: run 1");
    }

    #[test]
    fn io_converts() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(open(), Err(Error::Io(_))));
    }
}
