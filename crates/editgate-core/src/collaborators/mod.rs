//! External collaborator contracts
//!
//! The applier talks to two optional services:
//! - [`BackupService`] snapshots a file before it is overwritten
//! - [`ChangeTrackingService`] records each committed change
//!
//! One concrete implementation of each ships here: [`DirectoryBackupService`]
//! and the hash-chained [`ChangeLog`].

mod backup;
mod changelog;

pub use backup::{BackupManifest, DirectoryBackupService};
pub use changelog::{ChangeLog, ChangeRecord};

use crate::proposal::MutationKind;
use crate::token::ProposalToken;
use chrono::{DateTime, Utc};
use editgate_fingerprint::Fingerprint;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of a stored backup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct BackupId(String);

impl BackupId {
    /// Fresh, lexicographically time-ordered id
    #[must_use]
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BackupId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Errors raised by collaborators
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Filesystem failure
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest encoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown backup id
    #[error("backup not found: {0}")]
    BackupNotFound(BackupId),

    /// Hash chain broken at the given record
    #[error("change log integrity violation at sequence {sequence}")]
    IntegrityViolation { sequence: u64 },

    /// Service-specific failure
    #[error("{0}")]
    Other(String),
}

impl CollaboratorError {
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A committed change, as reported to the change tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub token: ProposalToken,
    pub file_path: PathBuf,
    pub kind: MutationKind,
    pub description: String,
    pub before: Fingerprint,
    pub after: Fingerprint,
    pub before_content: String,
    pub after_content: String,
    pub backup_id: Option<BackupId>,
    pub applied_at: DateTime<Utc>,
}

/// Creates backups of files about to be overwritten
#[async_trait::async_trait]
pub trait BackupService: Send + Sync {
    /// Back up `path`, returning an id that identifies the copy
    async fn create_backup(
        &self,
        path: &Path,
        description: &str,
    ) -> Result<BackupId, CollaboratorError>;
}

/// Records committed changes
#[async_trait::async_trait]
pub trait ChangeTrackingService: Send + Sync {
    /// Record one applied change
    async fn track_change(&self, event: ChangeEvent) -> Result<(), CollaboratorError>;
}
