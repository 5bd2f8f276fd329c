//! Custom error types for rustpaper.
//!
//! Every fallible library function returns `Result<T, PaperError>`.
//! [`PaperError::kind`] collapses the variants onto the failure kinds a run
//! reports to the user.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rustpaper operations.
#[derive(Debug, Error)]
pub enum PaperError {
    /// Upstream unreachable, timed out or the transfer failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-success HTTP status
    #[error("Network error: upstream returned HTTP {code}: {message}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Status text or response excerpt
        message: String,
    },

    /// Response body could not be decoded into work records
    #[error("Parse error: {0}")]
    Parse(String),

    /// Output destination could not be created or written
    #[error("Write error: {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Coarse failure kind surfaced by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Parse,
    Write,
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Write => "WriteError",
            ErrorKind::Config => "ConfigError",
        };
        f.write_str(name)
    }
}

impl PaperError {
    /// Failure kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaperError::Network(_) | PaperError::Status { .. } => ErrorKind::Network,
            PaperError::Parse(_) => ErrorKind::Parse,
            PaperError::Write { .. } => ErrorKind::Write,
            PaperError::Config(_) | PaperError::Validation(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PaperError::Write {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using `PaperError`
pub type Result<T> = std::result::Result<T, PaperError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| PaperError::Parse(msg.to_string()))
    }
}
