//! Error types for qb-migrate.

use thiserror::Error;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while migrating an app.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error in the working directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML encoding or decoding failed.
    #[error("XML error: {0}")]
    Xml(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with an unexpected HTTP status.
    #[error("Request failed with status {status}: {message}")]
    Request {
        /// HTTP status code.
        status: u16,
        /// Operation and response body.
        message: String,
    },

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limited by the platform (retry after N seconds).
    #[error("Rate limited, retry after {0}s")]
    RateLimit(u64),

    /// The legacy API returned a non-zero error code.
    #[error("{action} failed with code {code}: {text}")]
    Api {
        /// Legacy action name, e.g. `API_GetDBPage`.
        action: String,
        /// Error code reported in `errcode`.
        code: String,
        /// Error text reported in `errtext`.
        text: String,
    },

    /// A stage needed a mapping entry that does not exist.
    #[error("No mapping for '{0}'")]
    MissingMapping(String),
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Xml(err.to_string())
    }
}

impl From<quick_xml::SeError> for Error {
    fn from(err: quick_xml::SeError) -> Self {
        Self::Xml(err.to_string())
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
