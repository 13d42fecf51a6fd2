// Error taxonomy shared by the acquisition and publication stages.
// Acquisition errors are returned to the caller; publication errors are
// captured into a `PublishOutcome` instead (see `bluesky`).

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The rover listing came back with no photos.
    #[error("no recent photos available for rover `{rover}`")]
    EmptyResult { rover: String },

    /// Transport-level failure (DNS, connect, TLS, body read).
    #[error("{operation}: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The remote answered with a non-success status.
    #[error("{operation}: {status} - {message}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        message: String,
    },

    /// The social service refused the credentials.
    #[error("authentication failed: {status} - {message}")]
    Authentication { status: StatusCode, message: String },

    /// A JSON body did not have the expected shape.
    #[error("{operation}: unexpected response body: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("image url `{url}` has no file name")]
    InvalidImageUrl { url: String },

    #[error("{operation} `{}`: {source}", path.display())]
    Filesystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn network(operation: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Network { operation, source }
    }

    pub(crate) fn decode(operation: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Decode { operation, source }
    }

    pub(crate) fn filesystem(
        operation: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Filesystem {
            operation,
            path,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_error_names_operation_and_path() {
        let err = Error::filesystem("failed to write image", "/tmp/a.jpg")(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.to_string(), "failed to write image `/tmp/a.jpg`: denied");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn status_error_includes_remote_message() {
        let err = Error::Status {
            operation: "upload blob",
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "blob too big".into(),
        };
        assert_eq!(
            err.to_string(),
            "upload blob: 413 Payload Too Large - blob too big"
        );
    }
}
