//! Testing utilities for the editgate workspace
//!
//! Shared fixtures: temp workspaces, numbered files, collaborator doubles and
//! engines driven by a manual clock.

#![allow(missing_docs)]

use anyhow::Context;
use editgate_core::collaborators::{
    BackupId, BackupService, ChangeEvent, ChangeTrackingService, CollaboratorError,
};
use editgate_core::{EditEngine, EngineConfig, ManualClock};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// `line 1\nline 2\n...line n\n`
#[must_use]
pub fn numbered_lines(n: usize) -> String {
    (1..=n).map(|i| format!("line {i}\n")).collect()
}

/// Temporary directory that is removed on drop
#[derive(Debug)]
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    /// # Panics
    /// Panics if the temp directory cannot be created
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp workspace"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `content` to `name`, returning the full path
    ///
    /// # Panics
    /// Panics if the write fails
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.join(name);
        std::fs::write(&path, content).expect("write fixture file");
        path
    }

    /// # Errors
    /// Returns error if the file cannot be read as UTF-8
    pub fn read(&self, path: &Path) -> anyhow::Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// One recorded backup call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCall {
    pub id: BackupId,
    pub path: PathBuf,
    pub description: String,
    /// File contents at the moment of the call
    pub content: Vec<u8>,
}

/// Backup double that remembers what it was asked to save
#[derive(Debug, Default)]
pub struct RecordingBackupService {
    calls: Mutex<Vec<BackupCall>>,
}

impl RecordingBackupService {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn calls(&self) -> Vec<BackupCall> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl BackupService for RecordingBackupService {
    async fn create_backup(
        &self,
        path: &Path,
        description: &str,
    ) -> Result<BackupId, CollaboratorError> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| CollaboratorError::io(path, e))?;
        let id = BackupId::generate();
        self.calls.lock().push(BackupCall {
            id: id.clone(),
            path: path.to_path_buf(),
            description: description.to_owned(),
            content,
        });
        Ok(id)
    }
}

/// Backup double that always fails
#[derive(Debug, Default)]
pub struct FailingBackupService;

#[async_trait::async_trait]
impl BackupService for FailingBackupService {
    async fn create_backup(
        &self,
        _path: &Path,
        _description: &str,
    ) -> Result<BackupId, CollaboratorError> {
        Err(CollaboratorError::Other("backup volume unavailable".into()))
    }
}

/// Change tracker double that keeps every event
#[derive(Debug, Default)]
pub struct RecordingChangeTracker {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingChangeTracker {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    #[must_use]
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }
}

#[async_trait::async_trait]
impl ChangeTrackingService for RecordingChangeTracker {
    async fn track_change(&self, event: ChangeEvent) -> Result<(), CollaboratorError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Change tracker double that always fails
#[derive(Debug, Default)]
pub struct FailingChangeTracker;

#[async_trait::async_trait]
impl ChangeTrackingService for FailingChangeTracker {
    async fn track_change(&self, _event: ChangeEvent) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Other("audit sink offline".into()))
    }
}

/// Config with the reaper off and the given TTL
#[must_use]
pub fn config_with_ttl(ttl: Duration) -> EngineConfig {
    EngineConfig::default()
        .with_proposal_ttl(ttl)
        .with_reaper_enabled(false)
}

/// Engine on a manual clock, reaper off, default TTL
///
/// # Panics
/// Panics if the engine cannot be built
#[must_use]
pub fn manual_engine() -> (Arc<EditEngine>, ManualClock) {
    let clock = ManualClock::starting_now();
    let engine = EditEngine::builder()
        .with_config(EngineConfig::default().with_reaper_enabled(false))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .expect("build engine");
    (Arc::new(engine), clock)
}

/// Engine on the system clock with both recording collaborators attached
///
/// # Panics
/// Panics if the engine cannot be built
#[must_use]
pub fn engine_with_collaborators() -> (
    Arc<EditEngine>,
    Arc<RecordingBackupService>,
    Arc<RecordingChangeTracker>,
) {
    let backup = RecordingBackupService::new();
    let tracker = RecordingChangeTracker::new();
    let engine = EditEngine::builder()
        .with_config(EngineConfig::default().with_reaper_enabled(false))
        .with_backup_service(backup.clone())
        .with_change_tracker(tracker.clone())
        .build()
        .expect("build engine");
    (Arc::new(engine), backup, tracker)
}
