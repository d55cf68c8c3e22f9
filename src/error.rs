use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum ZiptreeError {
    #[error("{label} contains no usable entries")]
    EmptyInput { label: String },
    #[error("Could not decode archive {name}: {reason}")]
    CorruptArchive { name: String, reason: String },
    #[error("Archive {name} has no entries")]
    EmptyArchive { name: String },
    #[error("Could not read {name}: {reason}")]
    PayloadRead { name: String, reason: String },
    #[error("Archive {name} is nested more than {limit} levels deep")]
    TooDeeplyNested { name: String, limit: usize },
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Walk error: {0}")]
    Walk(String),
    #[error("No node at {0}")]
    UnknownNode(String),
    #[error("{0} is not a PDF")]
    NotAPdf(String),
    #[error("No PDFs selected")]
    NothingSelected,
    #[error("Export failed: {0}")]
    Export(String),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
impl ZiptreeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ZiptreeError::Io {
            path: path.into(),
            source,
        }
    }
    pub(crate) fn corrupt(name: impl Into<String>, reason: impl ToString) -> Self {
        ZiptreeError::CorruptArchive {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
    pub(crate) fn payload(name: impl Into<String>, reason: impl ToString) -> Self {
        ZiptreeError::PayloadRead {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
    /// Whether the failure should stop every pending operation, not just the current one.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ZiptreeError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_path() {
        let err = ZiptreeError::io(
            "/tmp/missing.zip",
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        );
        let text = err.to_string();
        assert!(text.contains("/tmp/missing.zip"));
        assert!(text.contains("file not found"));
    }

    #[test]
    fn corrupt_archive_display() {
        let err = ZiptreeError::corrupt("inner.zip", "invalid Zip archive");
        assert_eq!(
            err.to_string(),
            "Could not decode archive inner.zip: invalid Zip archive"
        );
    }

    #[test]
    fn only_cancelled_is_cancellation() {
        assert!(ZiptreeError::Cancelled.is_cancellation());
        assert!(!ZiptreeError::NothingSelected.is_cancellation());
    }
}
