//! Authentication error types.

/// Errors from acquiring or using a bearer credential.
///
/// Cloneable because a single failed acquisition is shared by every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint could not be reached
    #[error("token request failed: {message}")]
    Request { message: String },

    /// The token endpoint answered with a non-success status
    #[error("token endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The token endpoint answered 2xx but the body was unusable
    #[error("malformed token response: {message}")]
    Malformed { message: String },

    /// Client id/secret cannot be encoded into a header
    #[error("invalid client credentials: {0}")]
    InvalidCredentials(&'static str),

    /// The API kept rejecting requests after a fresh token was acquired
    #[error("API rejected credential with status {status} after refresh")]
    Rejected { status: u16 },
}
