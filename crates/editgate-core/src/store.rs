//! Pending proposal store
//!
//! Concurrent keyed registry of outstanding proposals with per-entry expiry.
//!
//! `take` removes the entry first and inspects expiry second. The removal is
//! the single synchronization point of the engine: among concurrent takes of
//! one token exactly one observes the entry. No file I/O happens while a map
//! guard is held.

use crate::clock::Clock;
use crate::proposal::PendingProposal;
use crate::token::ProposalToken;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Result of looking up a token
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Live proposal
    Found(Arc<PendingProposal>),
    /// Proposal existed but is past its expiry; it has been removed
    Expired {
        token: ProposalToken,
        expired_at: DateTime<Utc>,
    },
    /// No proposal under this token
    NotFound,
}

impl Lookup {
    /// Live proposal, if any
    #[inline]
    #[must_use]
    pub fn found(self) -> Option<Arc<PendingProposal>> {
        match self {
            Self::Found(p) => Some(p),
            Self::Expired { .. } | Self::NotFound => None,
        }
    }

    /// Whether a live proposal was found
    #[inline]
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Errors raised by the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A live proposal already uses this token
    #[error("token collision: {}", token.short())]
    TokenCollision { token: ProposalToken },
}

/// Registry of pending proposals
#[derive(Debug)]
pub struct PendingProposalStore {
    entries: DashMap<ProposalToken, Arc<PendingProposal>>,
    clock: Arc<dyn Clock>,
}

impl PendingProposalStore {
    /// Create an empty store reading time from `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Clock used for expiry checks
    #[inline]
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Register a proposal
    ///
    /// # Errors
    /// Returns `StoreError::TokenCollision` if the token is already registered
    pub fn insert(&self, proposal: PendingProposal) -> Result<Arc<PendingProposal>, StoreError> {
        match self.entries.entry(proposal.token.clone()) {
            Entry::Occupied(occupied) => Err(StoreError::TokenCollision {
                token: occupied.key().clone(),
            }),
            Entry::Vacant(vacant) => {
                let proposal = Arc::new(proposal);
                vacant.insert(Arc::clone(&proposal));
                Ok(proposal)
            }
        }
    }

    /// Atomically remove and return a live proposal
    ///
    /// An expired entry is removed as well and reported as `Lookup::Expired`.
    pub fn take(&self, token: &ProposalToken) -> Lookup {
        let Some((token, proposal)) = self.entries.remove(token) else {
            return Lookup::NotFound;
        };
        if proposal.is_expired_at(self.clock.now()) {
            tracing::debug!(token = %token.short(), "took expired proposal");
            return Lookup::Expired {
                token,
                expired_at: proposal.expires_at,
            };
        }
        Lookup::Found(proposal)
    }

    /// Inspect a proposal without consuming it
    ///
    /// An expired entry is reported as `Lookup::Expired` and lazily removed.
    pub fn peek(&self, token: &ProposalToken) -> Lookup {
        let now = self.clock.now();
        let current = self.entries.get(token).map(|entry| Arc::clone(entry.value()));
        match current {
            None => Lookup::NotFound,
            Some(proposal) if proposal.is_expired_at(now) => {
                self.entries
                    .remove_if(token, |_, p| p.is_expired_at(now));
                Lookup::Expired {
                    token: token.clone(),
                    expired_at: proposal.expires_at,
                }
            }
            Some(proposal) => Lookup::Found(proposal),
        }
    }

    /// All live proposals, oldest first
    #[must_use]
    pub fn list_all(&self) -> Vec<Arc<PendingProposal>> {
        let now = self.clock.now();
        let mut live: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired_at(now))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        live.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.token.cmp(&b.token))
        });
        live
    }

    /// Remove a proposal, discarding it
    ///
    /// Returns whether an entry (live or expired) was removed.
    pub fn cancel(&self, token: &ProposalToken) -> bool {
        !matches!(self.take(token), Lookup::NotFound)
    }

    /// Remove every expired entry, returning how many were reclaimed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, proposal| {
            let keep = !proposal.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of entries, including expired ones not yet reclaimed
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
