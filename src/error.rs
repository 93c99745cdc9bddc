use std::io;
use thiserror::Error;

/// Errors surfaced by the scan engine and its probes.
///
/// Closed, filtered and timed-out ports are not errors; the probe reports
/// them as `open = false`.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The shared cancellation token fired before the work finished.
    #[error("scan cancelled")]
    Cancelled,

    #[error("invalid scan configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("operation timed out")]
    Timeout,

    #[error("service sent no data")]
    EmptyBanner,
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, ScanError>;
