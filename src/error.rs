//! Error types for the preview pipeline

use thiserror::Error;

/// Result type alias for preview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while cataloguing, rendering or snapshotting units
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or unknown unit type, or a missing required parameter
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The slug resolved to no content
    #[error("Not found: {0}")]
    NotFound(String),

    /// Privileged mutation without the capability or a valid token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// An external tool (screenshot script, test runner) exited non-zero
    #[error("{tool} exited with status {code}")]
    UpstreamTool { tool: String, code: i32 },

    /// The discovery manifest could not be fetched or decoded
    #[error("Discovery fetch failed: {0}")]
    UpstreamFetch(String),

    /// Block expansion or document assembly failed
    #[error("Rendering failed: {0}")]
    Render(String),

    /// The host content or option store rejected an operation
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid configuration or fixture
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status a routed request answers with for this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound(_) => 404,
            Error::Unauthorized(_) => 403,
            Error::UpstreamTool { .. } | Error::UpstreamFetch(_) => 502,
            _ => 500,
        }
    }

    /// Short title used on error pages.
    pub fn title(&self) -> &'static str {
        match self {
            Error::Validation(_) => "Invalid Request",
            Error::NotFound(_) => "Not Found",
            Error::Unauthorized(_) => "Forbidden",
            _ => "Error",
        }
    }
}
