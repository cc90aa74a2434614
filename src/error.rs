//! Application error types

use thiserror::Error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Why a storage key is not a valid backup artifact path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseKeyError {
    #[error("expected YYYY/MM/DD/<database>_<HHMMSS>.<ext>, got {0} path segment(s)")]
    SegmentCount(usize),

    #[error("malformed {field} component {value:?}")]
    Component { field: &'static str, value: String },

    #[error("file name {0:?} has no _HHMMSS.<ext> suffix")]
    FileName(String),

    #[error("empty database name")]
    EmptyDatabase,

    #[error("date {0} does not exist")]
    InvalidDate(String),

    #[error("time {0} does not exist")]
    InvalidTime(String),
}
