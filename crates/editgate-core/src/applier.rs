//! Mutation applier
//!
//! Commits an approved proposal. The token is consumed before any I/O; from
//! then on the proposal is privately owned and every failure is terminal:
//! nothing is ever re-inserted into the store.

use crate::collaborators::{BackupId, BackupService, ChangeEvent, ChangeTrackingService};
use crate::error::{EditError, EditResult};
use crate::proposal::PendingProposal;
use crate::store::{Lookup, PendingProposalStore};
use crate::token::ProposalToken;
use editgate_fingerprint::{Fingerprint, FingerprintService};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of a successful apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub success: bool,
    pub file_path: PathBuf,
    pub new_fingerprint: Fingerprint,
    pub lines_affected: usize,
    pub backup_id: Option<BackupId>,
}

/// Applies pending proposals to disk
pub struct MutationApplier {
    store: Arc<PendingProposalStore>,
    fingerprints: FingerprintService,
    backup: Option<Arc<dyn BackupService>>,
    change_tracker: Option<Arc<dyn ChangeTrackingService>>,
}

impl fmt::Debug for MutationApplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationApplier")
            .field("fingerprints", &self.fingerprints)
            .field("backup", &self.backup.is_some())
            .field("change_tracker", &self.change_tracker.is_some())
            .finish_non_exhaustive()
    }
}

impl MutationApplier {
    #[must_use]
    pub fn new(store: Arc<PendingProposalStore>, fingerprints: FingerprintService) -> Self {
        Self {
            store,
            fingerprints,
            backup: None,
            change_tracker: None,
        }
    }

    #[must_use]
    pub fn with_backup_service(mut self, backup: Arc<dyn BackupService>) -> Self {
        self.backup = Some(backup);
        self
    }

    #[must_use]
    pub fn with_change_tracker(mut self, tracker: Arc<dyn ChangeTrackingService>) -> Self {
        self.change_tracker = Some(tracker);
        self
    }

    /// Apply the proposal behind `token`
    ///
    /// `expected` is an optional caller-side fingerprint; when given it must
    /// match the live file too.
    ///
    /// # Errors
    /// - `ProposalNotFound` / `Expired` from the store
    /// - `VersionConflict` when the file changed since the proposal
    /// - `Backup` / `Io` when the backup or the write fails
    pub async fn apply(
        &self,
        token: &ProposalToken,
        expected: Option<&Fingerprint>,
    ) -> EditResult<ApplyResult> {
        let proposal = match self.store.take(token) {
            Lookup::Found(proposal) => proposal,
            Lookup::Expired { token, expired_at } => {
                tracing::debug!(token = %token.short(), %expired_at, "apply on expired proposal");
                return Err(EditError::Expired { token, expired_at });
            }
            Lookup::NotFound => {
                return Err(EditError::ProposalNotFound {
                    token: token.clone(),
                })
            }
        };
        self.commit(&proposal, expected).await
    }

    async fn commit(
        &self,
        proposal: &PendingProposal,
        expected: Option<&Fingerprint>,
    ) -> EditResult<ApplyResult> {
        let path = &proposal.file_path;
        let live = self.fingerprints.snapshot(path).await?;

        for wanted in std::iter::once(&proposal.original_fingerprint).chain(expected) {
            if *wanted != live.fingerprint {
                tracing::warn!(
                    token = %proposal.token.short(),
                    path = %path.display(),
                    expected = %wanted.short(),
                    actual = %live.fingerprint.short(),
                    "version conflict, proposal discarded"
                );
                return Err(EditError::VersionConflict {
                    path: path.clone(),
                    expected: *wanted,
                    actual: live.fingerprint,
                });
            }
        }

        let description = proposal.mutation.describe();
        let backup_id = if proposal.backup_requested {
            let Some(backup) = &self.backup else {
                return Err(EditError::invalid_argument(
                    "backup requested but no backup service is configured",
                ));
            };
            let id = backup
                .create_backup(path, &description)
                .await
                .map_err(|source| EditError::Backup {
                    path: path.clone(),
                    source,
                })?;
            Some(id)
        } else {
            None
        };

        write_atomic(path, proposal.preview_content.as_bytes().to_vec())
            .await
            .map_err(|e| EditError::io(path, e))?;
        let new_fingerprint = Fingerprint::of_bytes(proposal.preview_content.as_bytes());

        tracing::info!(
            token = %proposal.token.short(),
            path = %path.display(),
            kind = %proposal.kind(),
            lines_affected = proposal.lines_affected,
            fingerprint = %new_fingerprint.short(),
            backup_id = backup_id.as_ref().map(BackupId::as_str),
            "proposal applied"
        );

        if let Some(tracker) = &self.change_tracker {
            let event = ChangeEvent {
                token: proposal.token.clone(),
                file_path: path.clone(),
                kind: proposal.kind(),
                description,
                before: live.fingerprint,
                after: new_fingerprint,
                before_content: String::from_utf8_lossy(&live.bytes).into_owned(),
                after_content: proposal.preview_content.clone(),
                backup_id: backup_id.clone(),
                applied_at: self.store.clock().now(),
            };
            if let Err(e) = tracker.track_change(event).await {
                tracing::warn!(
                    token = %proposal.token.short(),
                    path = %path.display(),
                    error = %e,
                    "change tracking failed; write stands"
                );
            }
        }

        Ok(ApplyResult {
            success: true,
            file_path: path.clone(),
            new_fingerprint,
            lines_affected: proposal.lines_affected,
            backup_id,
        })
    }
}

/// Replace `path` with `bytes` atomically
///
/// Writes a temp file in the same directory, fsyncs it, copies the original
/// permissions and renames it over the target. A symlinked `path` is
/// resolved first: the link target is replaced and the link stays a link.
pub async fn write_atomic(path: &Path, bytes: Vec<u8>) -> io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &bytes))
        .await
        .map_err(io::Error::other)?
}

fn write_atomic_blocking(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let resolved = match std::fs::canonicalize(path) {
        Ok(real) => real,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    let path = resolved.as_path();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
