use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of [`Error`], for callers that only care about
/// which kind of failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Configuration,
    NotFound,
    Backend,
    Unsupported,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid base path '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("'{}' does not exist or is not a directory", .0.display())]
    ParentNotDirectory(PathBuf),

    #[error("{op} {coordinate} failed: {source}")]
    Backend {
        op: &'static str,
        coordinate: String,
        #[source]
        source: BoxError,
    },

    #[error("{0}")]
    Unsupported(&'static str),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::ParentNotDirectory(_) | Error::Backend { .. } => ErrorKind::Backend,
            Error::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn parse(path: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn backend(
        op: &'static str,
        coordinate: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::Backend {
            op,
            coordinate: coordinate.into(),
            source: source.into(),
        }
    }

    /// Non-2xx response from an HTTP-speaking backend, 404 excluded.
    pub(crate) fn status(
        op: &'static str,
        coordinate: impl Into<String>,
        status: u16,
        body: &str,
    ) -> Self {
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Error::backend(op, coordinate, message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_not_directory_message() {
        let err = Error::ParentNotDirectory(PathBuf::from("/nope/dir"));
        assert_eq!(err.to_string(), "'/nope/dir' does not exist or is not a directory");
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn backend_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::backend("read", "/tmp/x", io);
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.to_string().contains("denied"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn status_error_formats_body() {
        let err = Error::status("GET", "https://example.com/a", 500, "boom");
        assert_eq!(
            err.to_string(),
            "GET https://example.com/a failed: HTTP 500: boom"
        );
        let err = Error::status("GET", "https://example.com/a", 403, "");
        assert!(err.to_string().ends_with("HTTP 403"));
    }

    #[test]
    fn not_found_classification() {
        assert!(Error::NotFound("k".into()).is_not_found());
        assert!(!Error::Unsupported("nope").is_not_found());
    }
}
