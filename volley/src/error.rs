//! Error types for local (pre-transmission) send failures.
//!
//! Failures discovered by the transport while a send is in flight are not
//! errors in this sense; they are reported through
//! [`SendResult::status`](crate::SendResult::status).

use std::path::PathBuf;

/// Alias for `Result<T, volley::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised before any I/O is issued.
///
/// Every variant describes a defect in how the caller used the API, so
/// none of them is worth retrying unchanged.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A required argument was missing or malformed.
    #[error("invalid argument `{param}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter (e.g. `request`, `descriptors[2]`).
        param: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// The socket is not in a state that permits the operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// The socket has already been closed.
    #[error("socket has been disposed")]
    ObjectDisposed,

    /// The parent directory of a file region does not exist.
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A file region names a file that does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An I/O error raised while checking local preconditions.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds an [`Error::InvalidArgument`].
    pub(crate) fn invalid_argument(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Returns the parameter name for [`Error::InvalidArgument`].
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::InvalidArgument { param, .. } => Some(param),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_names_parameter() {
        let err = Error::invalid_argument("descriptors", "must not be null");
        assert_eq!(err.param(), Some("descriptors"));
        assert_eq!(
            err.to_string(),
            "invalid argument `descriptors`: must not be null"
        );
    }

    #[test]
    fn not_found_messages_include_path() {
        let err = Error::FileNotFound(PathBuf::from("/nope/file.bin"));
        assert!(err.to_string().contains("/nope/file.bin"));
        assert_eq!(err.param(), None);
    }
}
