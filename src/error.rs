use thiserror::Error;

/// Errors surfaced by the scanner library.
///
/// Per-port connect and banner failures are never errors; they fold into a
/// closed port or an empty banner. What remains is bad invocation input and
/// external cancellation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("invalid port value: {0:?}")]
    InvalidPort(String),

    #[error("port out of range: {0} (expected 1-65535)")]
    PortOutOfRange(u32),

    #[error("invalid port range {start}-{end} (start > end)")]
    InvalidRange { start: u16, end: u16 },

    #[error("invalid concurrency: {0:?} (expected a positive integer)")]
    InvalidConcurrency(String),

    #[error("scan cancelled after {probed} of {total} ports")]
    Cancelled { probed: usize, total: usize },
}

impl ScanError {
    /// True for errors caused by malformed invocation input.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidPort(_)
                | ScanError::PortOutOfRange(_)
                | ScanError::InvalidRange { .. }
                | ScanError::InvalidConcurrency(_)
        )
    }
}
