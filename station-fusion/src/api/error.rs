//! API client error types.

use std::fmt;

use crate::auth::AuthError;

/// Terminal failures of a logical API call.
#[derive(Debug)]
pub enum ApiError {
    /// Credential could not be acquired, or was rejected after a refresh
    Auth(AuthError),

    /// Still throttled after exhausting the retry budget
    RateLimited { attempts: u32 },

    /// Network failure or a non-recoverable HTTP status
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The body of a successful response was not valid JSON
    Json {
        message: String,
        body: Option<String>,
    },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Auth(e) => write!(f, "authentication failed: {e}"),
            ApiError::RateLimited { attempts } => {
                write!(f, "rate limited after {attempts} attempts")
            }
            ApiError::Transport {
                status: Some(status),
                message,
            } => write!(f, "HTTP error {status}: {message}"),
            ApiError::Transport {
                status: None,
                message,
            } => write!(f, "transport error: {message}"),
            ApiError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Auth(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
