//! Engine composition root
//!
//! [`EditEngine`] wires one store, planner, applier and (optionally) reaper
//! together. Build it with [`EditEngine::builder`].

use crate::applier::{ApplyResult, MutationApplier};
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{BackupService, ChangeTrackingService};
use crate::config::EngineConfig;
use crate::error::{EditError, EditResult};
use crate::planner::{MutationPlanner, ProposalResult, ProposeRequest};
use crate::proposal::{PendingProposal, ProposalSummary};
use crate::reaper::{ExpiryReaper, ReaperStats};
use crate::store::{Lookup, PendingProposalStore};
use crate::token::ProposalToken;
use editgate_fingerprint::{Fingerprint, FingerprintService};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Builder for [`EditEngine`]
#[derive(Default)]
pub struct EditEngineBuilder {
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    backup: Option<Arc<dyn BackupService>>,
    change_tracker: Option<Arc<dyn ChangeTrackingService>>,
}

impl fmt::Debug for EditEngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditEngineBuilder")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("backup", &self.backup.is_some())
            .field("change_tracker", &self.change_tracker.is_some())
            .finish()
    }
}

impl EditEngineBuilder {
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the system clock, typically with a `ManualClock` in tests
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
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

    /// Validate the configuration and assemble the engine
    ///
    /// Starts the reaper when enabled, which requires a Tokio runtime.
    ///
    /// # Errors
    /// Returns `EditError::Config` if the configuration is invalid
    pub fn build(self) -> EditResult<EditEngine> {
        self.config.validate()?;
        let ttl = self.config.proposal_ttl_chrono()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let store = Arc::new(PendingProposalStore::new(clock));
        let fingerprints = FingerprintService::new().with_max_file_size(self.config.max_file_size);

        let planner = MutationPlanner::new(Arc::clone(&store), fingerprints, ttl)
            .with_context_lines(self.config.diff_context_lines)
            .with_backup_available(self.backup.is_some());

        let mut applier = MutationApplier::new(Arc::clone(&store), fingerprints);
        if let Some(backup) = self.backup {
            applier = applier.with_backup_service(backup);
        }
        if let Some(tracker) = self.change_tracker {
            applier = applier.with_change_tracker(tracker);
        }

        let reaper = self
            .config
            .reaper_enabled
            .then(|| ExpiryReaper::spawn(Arc::clone(&store), self.config.reap_interval()));

        tracing::debug!(
            ttl_ms = self.config.proposal_ttl_ms,
            reaper = reaper.is_some(),
            "edit engine ready"
        );

        Ok(EditEngine {
            config: self.config,
            store,
            planner,
            applier,
            reaper: Mutex::new(reaper),
        })
    }
}

/// Approval-gated file mutation engine
#[derive(Debug)]
pub struct EditEngine {
    config: EngineConfig,
    store: Arc<PendingProposalStore>,
    planner: MutationPlanner,
    applier: MutationApplier,
    reaper: Mutex<Option<ExpiryReaper>>,
}

impl EditEngine {
    #[must_use]
    pub fn builder() -> EditEngineBuilder {
        EditEngineBuilder::default()
    }

    /// Engine with default configuration and no collaborators
    ///
    /// # Errors
    /// See [`EditEngineBuilder::build`]
    pub fn new() -> EditResult<Self> {
        Self::builder().build()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<PendingProposalStore> {
        &self.store
    }

    /// Create a proposal; the file is not touched
    ///
    /// # Errors
    /// See [`MutationPlanner::propose`]
    pub async fn propose(&self, request: ProposeRequest) -> EditResult<ProposalResult> {
        self.planner.propose(request).await
    }

    /// Apply a proposal, consuming its token
    ///
    /// # Errors
    /// See [`MutationApplier::apply`]
    pub async fn apply(
        &self,
        token: &ProposalToken,
        expected: Option<&Fingerprint>,
    ) -> EditResult<ApplyResult> {
        self.applier.apply(token, expected).await
    }

    /// Inspect a live proposal without consuming it
    ///
    /// # Errors
    /// `ProposalNotFound` or `Expired`
    pub fn peek(&self, token: &ProposalToken) -> EditResult<Arc<PendingProposal>> {
        match self.store.peek(token) {
            Lookup::Found(proposal) => Ok(proposal),
            Lookup::Expired { token, expired_at } => Err(EditError::Expired { token, expired_at }),
            Lookup::NotFound => Err(EditError::ProposalNotFound {
                token: token.clone(),
            }),
        }
    }

    /// Discard a proposal
    ///
    /// Cancelling an expired proposal reclaims it and still succeeds.
    ///
    /// # Errors
    /// `ProposalNotFound` if no entry exists under `token`
    pub fn cancel(&self, token: &ProposalToken) -> EditResult<()> {
        if self.store.cancel(token) {
            tracing::info!(token = %token.short(), "proposal cancelled");
            Ok(())
        } else {
            Err(EditError::ProposalNotFound {
                token: token.clone(),
            })
        }
    }

    /// Summaries of every live proposal, oldest first
    #[must_use]
    pub fn list_pending(&self) -> Vec<ProposalSummary> {
        self.store
            .list_all()
            .iter()
            .map(|proposal| proposal.summary())
            .collect()
    }

    /// Reaper statistics, if the reaper is running
    #[must_use]
    pub fn reaper_stats(&self) -> Option<ReaperStats> {
        self.reaper.lock().as_ref().map(ExpiryReaper::stats)
    }

    /// Stop the reaper; pending proposals are simply dropped with the engine
    pub async fn shutdown(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.shutdown().await;
        }
        tracing::debug!(pending = self.store.len(), "edit engine shut down");
    }
}
