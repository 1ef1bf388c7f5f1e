use thiserror::Error;

/// Result type for manifest editing.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors from reading or rewriting RDF manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed XML: {0}")]
    Parse(String),

    #[error("manifest has no <{0}> element")]
    MissingElement(String),

    #[error("<{0}> has no parent element")]
    Detached(String),

    #[error("failed to serialize XML: {0}")]
    Write(String),
}
