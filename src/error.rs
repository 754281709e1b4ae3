//! Error types for Shopfront.
//!
//! Two layers live here: [`ShopfrontError`] for failures that abort a whole
//! batch (configuration, input, I/O), and [`ProviderError`] for failures of a
//! single provider call, which the orchestrator turns into data instead of
//! propagating.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an operation as a whole.
#[derive(Error, Debug)]
pub enum ShopfrontError {
    /// Failed to read a configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ConfigFileRead {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a prompt input file.
    #[error("failed to read input file '{path}': {source}")]
    InputFileRead {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the batch report.
    #[error("failed to write to output file '{path}': {source}")]
    OutputFileWrite {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON.
    #[error("failed to parse JSON at line {line}: {source}")]
    JsonParse {
        /// Line number where the error occurred (0 when the whole document failed).
        line: usize,
        /// The underlying JSON parsing error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to serialize JSON for output.
    #[error("failed to serialize JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// No image provider credential is configured.
    #[error(
        "no image provider configured - set SILICONFLOW_API_KEY, HF_TOKEN or REPLICATE_API_TOKEN"
    )]
    NoProviderConfigured,

    /// A batch was submitted without prompts.
    #[error("prompt list is empty - at least one prompt is required")]
    EmptyBatch,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Prompt input could not be interpreted.
    #[error("invalid prompt input: {0}")]
    InvalidPromptInput(String),
}

/// Result type alias for Shopfront operations.
pub type Result<T> = std::result::Result<T, ShopfrontError>;

/// Transport failures that are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// The peer reset the connection mid-request.
    ConnectionReset,
    /// The connection could not be established in time.
    ConnectTimeout,
    /// The request was aborted after the client timeout elapsed.
    RequestTimeout,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConnectionReset => "connection reset",
            Self::ConnectTimeout => "connect timeout",
            Self::RequestTimeout => "request timeout",
        };
        f.write_str(name)
    }
}

/// Failure of one provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport-level failure that may heal on its own.
    #[error("{message}")]
    Transient {
        /// Which transient condition was observed.
        kind: TransientKind,
        /// Human readable description.
        message: String,
    },

    /// Transport-level failure that will not heal by retrying (DNS, refused, TLS).
    #[error("{message}")]
    Network {
        /// Human readable description.
        message: String,
    },

    /// The provider answered, but with an error status or an unusable payload.
    #[error("{message}")]
    Application {
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// Message extracted from the provider's response.
        message: String,
    },
}

impl ProviderError {
    /// Build an application error from a status and message.
    pub fn application(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Application {
            status,
            message: message.into(),
        }
    }

    /// Whether the retry policy may attempt the call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// HTTP status attached to the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Application { status, .. } => *status,
            _ => None,
        }
    }
}
