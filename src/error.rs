//! Error types for the JioSaavn downloader.

use std::fmt;

use thiserror::Error;

/// Underlying cause of a failed metadata call.
#[derive(Debug, Error)]
pub enum MetadataCause {
    /// The request never produced a response (connect, timeout, body read).
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The provider answered with a non-200 status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The body was not valid JSON for the expected shape.
    #[error("malformed JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The body parsed but lacked a field this client depends on.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// Main error type for all downloader operations.
#[derive(Debug, Error)]
pub enum SaavnError {
    /// The URL matched none of the known path segments.
    #[error("Unrecognised link: {0}")]
    ClassificationAmbiguous(String),

    /// A metadata call against the provider API failed.
    #[error("Metadata error in {operation}: {cause}")]
    Metadata {
        /// Name of the client operation, e.g. `fetch_album`.
        operation: &'static str,
        /// What went wrong.
        #[source]
        cause: MetadataCause,
    },

    /// The encrypted media locator could not be decoded into a URL.
    #[error("Malformed locator: {0}")]
    MalformedLocator(String),

    /// Media retrieval request failed.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Media retrieval answered with a non-success status.
    #[error("Media request returned status {0}")]
    Status(u16),

    /// Directory creation, file creation or copy failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The batch was cancelled before this task finished.
    #[error("Download cancelled")]
    Cancelled,

    /// A download worker panicked before reporting back.
    #[error("Download task panicked: {0}")]
    TaskPanicked(String),

    /// Invalid link format (no usable token).
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(String),
}

impl SaavnError {
    pub(crate) fn metadata(operation: &'static str, cause: MetadataCause) -> Self {
        SaavnError::Metadata { operation, cause }
    }

    pub(crate) fn missing(operation: &'static str, field: &'static str) -> Self {
        SaavnError::Metadata {
            operation,
            cause: MetadataCause::MissingField(field),
        }
    }

    /// Short machine-friendly tag for the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SaavnError::ClassificationAmbiguous(_) => ErrorKind::ClassificationAmbiguous,
            SaavnError::Metadata { .. } => ErrorKind::Metadata,
            SaavnError::MalformedLocator(_) => ErrorKind::MalformedLocator,
            SaavnError::Request(_) | SaavnError::Status(_) => ErrorKind::Network,
            SaavnError::Io(_) => ErrorKind::Io,
            SaavnError::Cancelled => ErrorKind::Cancelled,
            SaavnError::TaskPanicked(_) => ErrorKind::Internal,
            SaavnError::InvalidLink(_) | SaavnError::Config(_) => ErrorKind::Input,
        }
    }
}

/// Coarse classification of [`SaavnError`], used to group failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    ClassificationAmbiguous,
    Metadata,
    MalformedLocator,
    Network,
    Io,
    Cancelled,
    Input,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ClassificationAmbiguous => "classification",
            ErrorKind::Metadata => "metadata",
            ErrorKind::MalformedLocator => "locator",
            ErrorKind::Network => "network",
            ErrorKind::Io => "io",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Input => "input",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Result type alias for downloader operations.
pub type Result<T> = std::result::Result<T, SaavnError>;
