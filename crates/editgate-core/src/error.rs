//! Error types for editgate
//!
//! Provides one structured error for every component boundary:
//! - Proposal validation failures
//! - Missing files and unknown tokens
//! - Expired proposals
//! - Fingerprint mismatches (optimistic concurrency)
//! - Read, write and backup failures

use crate::collaborators::CollaboratorError;
use crate::token::ProposalToken;
use chrono::{DateTime, Utc};
use editgate_fingerprint::{Fingerprint, FingerprintError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main editgate error type
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// Bad range, empty pattern, malformed fingerprint, etc.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Target file does not exist
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// No live proposal with this token
    #[error("no pending proposal for token {}", token.short())]
    ProposalNotFound { token: ProposalToken },

    /// Proposal outlived its TTL
    #[error("proposal {} expired at {expired_at}; propose the change again", token.short())]
    Expired {
        token: ProposalToken,
        expired_at: DateTime<Utc>,
    },

    /// File changed since the fingerprint was captured
    #[error(
        "version conflict on {}: expected {}, found {}",
        path.display(),
        expected.short(),
        actual.short()
    )]
    VersionConflict {
        path: PathBuf,
        expected: Fingerprint,
        actual: Fingerprint,
    },

    /// Search pattern does not compile
    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    /// Read or write failure
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backup collaborator failed before the write
    #[error("backup of {} failed: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: CollaboratorError,
    },

    /// Could not find an unused token after repeated collisions
    #[error("could not allocate a unique proposal token after {attempts} attempts")]
    TokenSpaceExhausted { attempts: usize },

    /// Invalid engine configuration
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl EditError {
    /// Create an invalid argument error
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an IO error for path
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable classification of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) => ErrorKind::InvalidArgument,
            Self::FileNotFound { .. } | Self::ProposalNotFound { .. } => ErrorKind::NotFound,
            Self::Expired { .. } => ErrorKind::Expired,
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            Self::Regex(_) => ErrorKind::RegexError,
            Self::Io { .. } | Self::Backup { .. } => ErrorKind::IoFailure,
            Self::TokenSpaceExhausted { .. } => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same call could succeed
    ///
    /// Always false: a consumed or conflicting token must be re-proposed
    /// against the current file state.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Whether the caller should start over with a fresh proposal
    #[inline]
    #[must_use]
    pub fn requires_repropose(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Expired | ErrorKind::VersionConflict | ErrorKind::IoFailure
        )
    }

    /// Convert into the structured failure returned to tool callers
    #[must_use]
    pub fn to_failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

impl From<FingerprintError> for EditError {
    fn from(err: FingerprintError) -> Self {
        match err {
            FingerprintError::NotFound { path } => Self::FileNotFound { path },
            FingerprintError::NotAFile { path } => {
                Self::InvalidArgument(format!("not a regular file: {}", path.display()))
            }
            too_large @ FingerprintError::TooLarge { .. } => {
                Self::InvalidArgument(too_large.to_string())
            }
            FingerprintError::Io { path, source } => Self::Io { path, source },
        }
    }
}

/// Error classification exposed at the external interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input
    InvalidArgument,
    /// File or token missing
    NotFound,
    /// Token past its TTL
    Expired,
    /// Fingerprint mismatch
    VersionConflict,
    /// Malformed regular expression
    RegexError,
    /// Read, write or backup failure
    IoFailure,
    /// Unexpected internal condition
    Internal,
}

impl ErrorKind {
    /// Stable snake_case name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::VersionConflict => "version_conflict",
            Self::RegexError => "regex_error",
            Self::IoFailure => "io_failure",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure: error kind plus human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Failure {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
}

impl From<EditError> for Failure {
    fn from(err: EditError) -> Self {
        err.to_failure()
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result type alias for editgate operations
pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_taxonomy() {
        let token = ProposalToken::from("abc");
        let fp = Fingerprint::of_bytes(b"x");

        assert_eq!(
            EditError::invalid_argument("bad").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            EditError::ProposalNotFound {
                token: token.clone()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EditError::FileNotFound {
                path: "/tmp/x".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            EditError::Expired {
                token,
                expired_at: Utc::now()
            }
            .kind(),
            ErrorKind::Expired
        );
        assert_eq!(
            EditError::VersionConflict {
                path: "/tmp/x".into(),
                expected: fp,
                actual: fp
            }
            .kind(),
            ErrorKind::VersionConflict
        );
        assert_eq!(
            EditError::io("/tmp/x", std::io::Error::other("disk")).kind(),
            ErrorKind::IoFailure
        );
    }

    #[test]
    fn regex_errors_convert() {
        let err: EditError = regex::Regex::new("(").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::RegexError);
    }

    #[test]
    fn fingerprint_not_found_maps_to_file_not_found() {
        let err: EditError = FingerprintError::NotFound {
            path: "/tmp/missing".into(),
        }
        .into();
        assert!(matches!(err, EditError::FileNotFound { .. }));
    }

    #[test]
    fn too_large_maps_to_invalid_argument() {
        let err: EditError = FingerprintError::TooLarge {
            path: "/tmp/big".into(),
            size: 10,
            limit: 5,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn nothing_is_retryable() {
        let err = EditError::io("/tmp/x", std::io::Error::other("disk"));
        assert!(!err.is_retryable());
        assert!(err.requires_repropose());
        assert!(!EditError::invalid_argument("x").requires_repropose());
    }

    #[test]
    fn failure_serializes_snake_case_kind() {
        let failure = EditError::invalid_argument("start_line must be >= 1").to_failure();
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "invalid_argument");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .contains("start_line must be >= 1"));
    }
}
