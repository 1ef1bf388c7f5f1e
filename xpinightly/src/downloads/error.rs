//! Error types for the hosted-downloads client.

use std::io;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Result type for downloads operations.
pub type DownloadsResult<T> = Result<T, DownloadsError>;

/// Error code the hosting API reports when a download name is taken.
pub const ALREADY_EXISTS_CODE: &str = "already_exists";

/// Errors that can occur while talking to the hosting API or storage endpoint.
#[derive(Debug, Error)]
pub enum DownloadsError {
    /// Connection, DNS, TLS or timeout failure below the HTTP layer.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// No download matched the requested id or name.
    #[error("download not found: {0}")]
    NotFound(String),

    /// The caller broke a precondition (for example, no file name).
    #[error("invalid request: {0}")]
    Configuration(String),

    /// A response body could not be decoded.
    #[error("malformed response from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading an upload source from disk failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    code: Option<String>,
}

impl DownloadsError {
    /// HTTP status code, if this is a status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            DownloadsError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured error codes from a `{"errors": [{"code": ...}]}` body.
    ///
    /// Bodies in any other shape yield an empty list.
    pub fn error_codes(&self) -> Vec<String> {
        let DownloadsError::Status { body, .. } = self else {
            return Vec::new();
        };
        serde_json::from_str::<ErrorPayload>(body)
            .map(|payload| payload.errors.into_iter().filter_map(|e| e.code).collect())
            .unwrap_or_default()
    }

    /// Whether the server rejected a create because the name is taken.
    pub fn is_already_exists(&self) -> bool {
        self.error_codes().iter().any(|c| c == ALREADY_EXISTS_CODE)
    }

    /// Whether this error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DownloadsError::NotFound(_)) || self.status() == Some(404)
    }
}
