//! Directory-backed backups
//!
//! Each backup is a byte-for-byte copy `<id>.bak` next to a `<id>.json`
//! manifest describing where it came from.

use super::{BackupId, BackupService, CollaboratorError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manifest stored alongside each backup copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub id: BackupId,
    pub original_path: PathBuf,
    pub description: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Stores backups as plain files under one directory
#[derive(Debug, Clone)]
pub struct DirectoryBackupService {
    root: PathBuf,
}

impl DirectoryBackupService {
    /// Keep backups under `root`; the directory is created on first use
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the copied bytes for `id`
    #[must_use]
    pub fn backup_path(&self, id: &BackupId) -> PathBuf {
        self.root.join(format!("{id}.bak"))
    }

    fn manifest_path(&self, id: &BackupId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Read the manifest of an existing backup
    ///
    /// # Errors
    /// Returns `BackupNotFound` for an unknown id, or an IO/decode error
    pub async fn manifest(&self, id: &BackupId) -> Result<BackupManifest, CollaboratorError> {
        let path = self.manifest_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CollaboratorError::BackupNotFound(id.clone()));
            }
            Err(e) => return Err(CollaboratorError::io(path, e)),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Copy a backup back over its original path
    ///
    /// # Errors
    /// Returns error if the backup is missing or the copy fails
    pub async fn restore(&self, id: &BackupId) -> Result<PathBuf, CollaboratorError> {
        let manifest = self.manifest(id).await?;
        let source = self.backup_path(id);
        tokio::fs::copy(&source, &manifest.original_path)
            .await
            .map_err(|e| CollaboratorError::io(&manifest.original_path, e))?;
        tracing::info!(backup_id = %id, path = %manifest.original_path.display(), "backup restored");
        Ok(manifest.original_path)
    }
}

#[async_trait::async_trait]
impl BackupService for DirectoryBackupService {
    async fn create_backup(
        &self,
        path: &Path,
        description: &str,
    ) -> Result<BackupId, CollaboratorError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CollaboratorError::io(&self.root, e))?;

        let id = BackupId::generate();
        let copy_path = self.backup_path(&id);
        let size = tokio::fs::copy(path, &copy_path)
            .await
            .map_err(|e| CollaboratorError::io(path, e))?;

        let manifest = BackupManifest {
            id: id.clone(),
            original_path: path.to_path_buf(),
            description: description.to_owned(),
            size,
            created_at: Utc::now(),
        };
        let manifest_path = self.manifest_path(&id);
        tokio::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)
            .await
            .map_err(|e| CollaboratorError::io(&manifest_path, e))?;

        tracing::debug!(backup_id = %id, path = %path.display(), size, "backup created");
        Ok(id)
    }
}
