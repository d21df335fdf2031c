//! Station pipeline error types.

use std::path::PathBuf;

use crate::api::ApiError;

/// Why a single (scale, region) partition could not be fetched.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The API call failed terminally
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The API answered 204 for this partition
    #[error("204 No Content")]
    NoContent,

    /// The body was valid JSON but not an array of stations
    #[error("expected a JSON array of stations, got {0}")]
    UnexpectedShape(&'static str),

    /// The partition could not be written to disk
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors reading or writing persisted station data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("{action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or parsing failed
    #[error("JSON error for '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FetchError::NoContent;
        assert_eq!(err.to_string(), "204 No Content");

        let err = FetchError::UnexpectedShape("object");
        assert_eq!(err.to_string(), "expected a JSON array of stations, got object");

        let err = FetchError::from(ApiError::RateLimited { attempts: 4 });
        assert_eq!(err.to_string(), "rate limited after 4 attempts");

        let err = StoreError::io(
            "failed to write",
            "/tmp/x.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "failed to write '/tmp/x.json': denied");
    }
}
