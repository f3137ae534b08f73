use std::io;

use thiserror::Error;

/// Failures of the streaming array parser
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error while streaming {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },

    /// The batch handler asked the parser to stop
    #[error("Stream interrupted after {processed} records")]
    Interrupted { processed: usize },
}

/// A single raw record that cannot become a typed row
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record is not an array")]
    NotAnArray,

    #[error("Record has a blank term")]
    BlankTerm,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dictionary not found: {0}")]
    NotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Store task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    /// Corrupt or incompatible file, not a zip archive
    #[error("Archive unreadable (corrupt or incompatible file): {0}")]
    ArchiveUnreadable(String),

    #[error("Invalid index.json: {0}")]
    InvalidIndex(String),

    /// Raised only when the archive has neither term nor term meta banks;
    /// a meta-only archive (e.g. a frequency list) still imports.
    #[error("Archive contains no term bank files")]
    NoTermBanks,

    /// The archive was readable but nothing survived normalization
    #[error("No valid records found among {records_seen} records (wrong dictionary format?)")]
    NoValidRecords { records_seen: usize },

    #[error("Import cancelled")]
    Cancelled,

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Import task failed: {0}")]
    Join(String),
}

impl From<zip::result::ZipError> for ImportError {
    fn from(err: zip::result::ZipError) -> Self {
        ImportError::ArchiveUnreadable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_records_and_unreadable_are_distinct() {
        let empty = ImportError::NoValidRecords { records_seen: 3 }.to_string();
        let corrupt = ImportError::ArchiveUnreadable("bad magic".into()).to_string();
        assert!(empty.contains("No valid records"));
        assert!(corrupt.contains("corrupt or incompatible"));
        assert_ne!(empty, corrupt);
    }
}
