//! Error types for wallpaper-dl
//!
//! Errors are split by how far they are allowed to travel:
//! - [`Error`] is the run-level error. Only configuration faults (and the I/O
//!   needed to prepare the output directory) surface from a run.
//! - [`FetchError`] and [`VerificationError`] describe what went wrong for a
//!   single candidate. They are captured into the outcome list as a
//!   [`FailureKind`] and never abort the batch.

use crate::resolution::Resolution;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wallpaper-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for wallpaper-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "resolution")
        key: Option<String>,
    },

    /// I/O error while preparing the run (e.g., creating the output directory)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A site adapter failed to produce candidates
    #[error("site adapter '{site}' failed: {message}")]
    Adapter {
        /// Source identifier of the adapter
        site: String,
        /// Failure description
        message: String,
    },
}

impl Error {
    /// Build a configuration error for the given key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failure of a single HTTP fetch attempt, or the definitive failure once
/// retries are exhausted
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Server answered with a status other than 200
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL
        url: String,
        /// Observed HTTP status code
        status: u16,
    },

    /// Request exceeded the configured timeout
    #[error("timeout fetching {url}")]
    Timeout {
        /// Requested URL
        url: String,
    },

    /// Connection could not be established
    #[error("connection failed for {url}: {message}")]
    Connect {
        /// Requested URL
        url: String,
        /// Underlying transport message
        message: String,
    },

    /// Headers arrived but the body could not be read completely
    #[error("failed to read body from {url}: {message}")]
    Body {
        /// Requested URL
        url: String,
        /// Underlying transport message
        message: String,
    },

    /// Any other transport-level failure
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying transport message
        message: String,
    },

    /// The request can never succeed (unparsable URL, unsupported scheme, bad header)
    #[error("invalid request for {url}: {message}")]
    InvalidRequest {
        /// Requested URL
        url: String,
        /// Why the request is invalid
        message: String,
    },
}

impl FetchError {
    /// HTTP status carried by this error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a reqwest error raised while sending a request
    pub(crate) fn from_send(url: &str, e: reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_timeout() {
            FetchError::Timeout { url }
        } else if e.is_connect() {
            FetchError::Connect {
                url,
                message: e.to_string(),
            }
        } else if e.is_builder() {
            FetchError::InvalidRequest {
                url,
                message: e.to_string(),
            }
        } else {
            FetchError::Transport {
                url,
                message: e.to_string(),
            }
        }
    }

    /// Classify a reqwest error raised while reading a response body
    pub(crate) fn from_body(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Body {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

/// Downloaded or existing content failed post-download verification
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Content is not a decodable image
    #[error("{path} is not a readable image: {message}")]
    Decode {
        /// File that was probed
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// Image decoded but is smaller than the target in at least one dimension
    #[error("resolution {width}x{height} is unacceptable for target {target}")]
    Unacceptable {
        /// Actual width
        width: u32,
        /// Actual height
        height: u32,
        /// Requested target
        target: Resolution,
    },
}

/// Serializable description of why a candidate failed, recorded in
/// [`DownloadOutcome`](crate::types::DownloadOutcome)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Retries exhausted (or request invalid)
    Fetch {
        /// Last observed HTTP status, if any
        status: Option<u16>,
        /// Last observed error message
        message: String,
    },
    /// Content failed image decoding or resolution check
    Verification {
        /// Verification message
        message: String,
    },
    /// Writing, renaming or removing the file failed
    Io {
        /// I/O message
        message: String,
    },
    /// No usable filename could be derived from the URL
    InvalidFilename,
    /// Another candidate in the same run already owns the derived filename
    FilenameCollision {
        /// The earlier URL that owns the filename
        owner: String,
    },
    /// The worker task itself failed (panicked or was cancelled)
    Worker {
        /// Join error message
        message: String,
    },
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Fetch { message, .. } => write!(f, "fetch failed: {}", message),
            FailureKind::Verification { message } => write!(f, "verification failed: {}", message),
            FailureKind::Io { message } => write!(f, "I/O error: {}", message),
            FailureKind::InvalidFilename => write!(f, "no usable filename in URL"),
            FailureKind::FilenameCollision { owner } => {
                write!(f, "filename already claimed by {}", owner)
            }
            FailureKind::Worker { message } => write!(f, "worker failed: {}", message),
        }
    }
}

impl From<FetchError> for FailureKind {
    fn from(e: FetchError) -> Self {
        FailureKind::Fetch {
            status: e.status(),
            message: e.to_string(),
        }
    }
}

impl From<VerificationError> for FailureKind {
    fn from(e: VerificationError) -> Self {
        FailureKind::Verification {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for FailureKind {
    fn from(e: std::io::Error) -> Self {
        FailureKind::Io {
            message: e.to_string(),
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_carries_key() {
        let err = Error::config("workers", "must be at least 1");
        match &err {
            Error::Config { key, message } => {
                assert_eq!(key.as_deref(), Some("workers"));
                assert_eq!(message, "must be at least 1");
            }
            other => panic!("expected Config, got {other:?}"),
        }
        assert_eq!(err.to_string(), "configuration error: must be at least 1");
    }

    #[test]
    fn fetch_error_into_failure_kind_keeps_status() {
        let kind: FailureKind = FetchError::Status {
            url: "http://x/a.jpg".into(),
            status: 503,
        }
        .into();
        assert_eq!(
            kind,
            FailureKind::Fetch {
                status: Some(503),
                message: "HTTP 503 from http://x/a.jpg".into()
            }
        );
    }

    #[test]
    fn timeout_has_no_status() {
        let err = FetchError::Timeout {
            url: "http://x".into(),
        };
        assert_eq!(err.status(), None);
    }

    #[test]
    fn failure_kind_serializes_with_tag() {
        let kind = FailureKind::FilenameCollision {
            owner: "http://a/x.jpg".into(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["kind"], "filename_collision");
        assert_eq!(json["owner"], "http://a/x.jpg");
    }
}
