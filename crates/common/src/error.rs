//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::DecryptionFailure`] → 400
/// - [`ServiceError::Internal`] → 500
///
/// The message carried by each variant is safe to expose to callers; internal
/// detail stays in the logs.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed — invalid JSON, empty input, or a ciphertext
    /// that is not a well-formed envelope.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The envelope was well-formed but could not be decrypted. Covers both
    /// authentication and padding failures so callers cannot tell them apart.
    #[error("decryption failure: {0}")]
    DecryptionFailure(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::DecryptionFailure(_) => 400,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::DecryptionFailure(_) => "decryption_failed",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// The caller-safe message without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::BadRequest(m)
            | ServiceError::DecryptionFailure(m)
            | ServiceError::Internal(m) => m,
        }
    }
}
