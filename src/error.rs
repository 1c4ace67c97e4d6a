//! Error types for the CA mirror controller

use thiserror::Error;

/// Main error type for mirror operations
///
/// A ConfigMap that does not exist is not an error: store lookups return
/// `Ok(None)` for absence, and only genuine API failures surface here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Validation error for mirror configuration
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Check if this error is a write conflict (the object changed between
    /// read and write)
    ///
    /// Conflicts resolve themselves on the next reconcile, which starts from
    /// a fresh read, so callers requeue them quickly instead of backing off.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(ae)) if ae.code == 409)
    }

    /// Check if this error is retryable
    ///
    /// Validation errors require a config fix and never retry. API errors in
    /// the 4xx range (forbidden, invalid, ...) only resolve through external
    /// change, with the exception of write conflicts, which a fresh read
    /// clears. Everything else is assumed transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(kube::Error::Api(ae)) => ae.code == 409 || !(400..500).contains(&ae.code),
            Error::Kube(_) => true,
            Error::Validation(_) => false,
        }
    }
}
