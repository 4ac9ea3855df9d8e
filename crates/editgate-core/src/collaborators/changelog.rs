use super::{BackupId, ChangeEvent, ChangeTrackingService, CollaboratorError};
use crate::proposal::MutationKind;
use crate::token::ProposalToken;
use chrono::{DateTime, Utc};
use editgate_fingerprint::Fingerprint;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// One entry of the change log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub sequence: u64,
    pub applied_at: DateTime<Utc>,
    pub token: ProposalToken,
    pub file_path: PathBuf,
    pub kind: MutationKind,
    pub description: String,
    pub before: Fingerprint,
    pub after: Fingerprint,
    pub backup_id: Option<BackupId>,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

/// In-memory, append-only change log
///
/// Every record hashes its predecessor, so editing or dropping an earlier
/// record breaks [`ChangeLog::verify_integrity`].
#[derive(Debug, Default)]
pub struct ChangeLog {
    inner: Mutex<Vec<ChangeRecord>>,
}

impl ChangeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning its sequence number
    pub fn append(&self, event: &ChangeEvent) -> u64 {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or([0u8; 32], |r| r.hash);
        let mut record = ChangeRecord {
            sequence: guard.len() as u64,
            applied_at: event.applied_at,
            token: event.token.clone(),
            file_path: event.file_path.clone(),
            kind: event.kind,
            description: event.description.clone(),
            before: event.before,
            after: event.after,
            backup_id: event.backup_id.clone(),
            prev_hash,
            hash: [0u8; 32],
        };
        record.hash = compute_hash(&record);
        let sequence = record.sequence;
        guard.push(record);
        sequence
    }

    /// Snapshot of all records
    #[must_use]
    pub fn records(&self) -> Vec<ChangeRecord> {
        self.inner.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Walk the chain and recompute every hash
    ///
    /// # Errors
    /// Returns `IntegrityViolation` at the first record that does not verify
    pub fn verify_integrity(&self) -> Result<(), CollaboratorError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for (idx, record) in guard.iter().enumerate() {
            if record.sequence != idx as u64
                || record.prev_hash != prev
                || record.hash != compute_hash(record)
            {
                return Err(CollaboratorError::IntegrityViolation {
                    sequence: idx as u64,
                });
            }
            prev = record.hash;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChangeTrackingService for ChangeLog {
    async fn track_change(&self, event: ChangeEvent) -> Result<(), CollaboratorError> {
        let sequence = self.append(&event);
        tracing::debug!(
            sequence,
            token = %event.token.short(),
            path = %event.file_path.display(),
            "change recorded"
        );
        Ok(())
    }
}

fn compute_hash(record: &ChangeRecord) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.applied_at.timestamp().to_le_bytes());
    hasher.update(record.applied_at.timestamp_subsec_nanos().to_le_bytes());
    hasher.update(record.token.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(record.file_path.to_string_lossy().as_bytes());
    hasher.update([0]);
    hasher.update(record.kind.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(record.description.as_bytes());
    hasher.update([0]);
    hasher.update(record.before.as_bytes());
    hasher.update(record.after.as_bytes());
    if let Some(id) = &record.backup_id {
        hasher.update(id.as_str().as_bytes());
    }
    hasher.update([0]);
    hasher.update(record.prev_hash);
    hasher.finalize().into()
}
