//! Error taxonomy for the nightly build.

use std::path::PathBuf;

/// Errors produced while configuring the run or assembling its report.
#[derive(Debug, thiserror::Error)]
pub enum NightlyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("required path missing: {}", .0.display())]
    MissingPath(PathBuf),

    #[error("malformed test log at line {line}: {reason}")]
    MalformedTestLog { line: usize, reason: String },

    #[error("stylesheet transform failed for {}: {reason}", source_file.display())]
    Transform { source_file: PathBuf, reason: String },

    #[error("another run holds the lock at {}", .0.display())]
    RunInProgress(PathBuf),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for nightly core operations.
pub type Result<T> = std::result::Result<T, NightlyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_log_display_names_line() {
        let err = NightlyError::MalformedTestLog {
            line: 12,
            reason: "module core has no statistics line".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("malformed test log"));
        assert!(msg.contains("line 12"));
        assert!(msg.contains("core"));
    }

    #[test]
    fn test_missing_path_display() {
        let err = NightlyError::MissingPath(PathBuf::from("/srv/nightly/src"));
        assert!(err.to_string().contains("/srv/nightly/src"));
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: NightlyError = io.into();
        assert!(matches!(err, NightlyError::Io(_)));
    }
}
