//! editgate Core
//!
//! Approval-gated mutation of text files. A caller proposes a change, reviews
//! a unified diff, and applies it with a single-use token only if the file is
//! byte-for-byte unchanged since the proposal.
//!
//! # Components
//!
//! - [`PendingProposalStore`]: concurrent registry with per-entry expiry
//! - [`ExpiryReaper`]: background task reclaiming abandoned proposals
//! - [`MutationPlanner`]: validates a mutation and computes its preview
//! - [`MutationApplier`]: consumes a token and writes atomically
//! - [`EditEngine`]: wires the above together
//! - [`EditTools`]: typed and JSON tool surface
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use editgate_core::prelude::*;
//!
//! let engine = EditEngine::new()?;
//! let proposal = engine
//!     .propose(ProposeRequest::new(
//!         "src/main.rs",
//!         Mutation::DeleteLineRange { start_line: 3, end_line: 4 },
//!     ))
//!     .await?;
//! println!("{}", proposal.diff_preview.unified);
//!
//! let applied = engine.apply(&proposal.token, None).await?;
//! assert!(applied.success);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod applier;
pub mod clock;
pub mod collaborators;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod planner;
pub mod proposal;
pub mod reaper;
pub mod store;
pub mod text;
pub mod token;
pub mod tools;

pub use applier::{ApplyResult, MutationApplier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    BackupId, BackupService, ChangeEvent, ChangeLog, ChangeTrackingService, CollaboratorError,
    DirectoryBackupService,
};
pub use config::{ConfigError, EngineConfig};
pub use diff::{unified_diff, DiffPreview};
pub use engine::{EditEngine, EditEngineBuilder};
pub use error::{EditError, EditResult, ErrorKind, Failure};
pub use planner::{MutationPlanner, ProposalResult, ProposeRequest};
pub use proposal::{Mutation, MutationKind, PendingProposal, ProposalSummary};
pub use reaper::{ExpiryReaper, ReaperStats};
pub use store::{Lookup, PendingProposalStore, StoreError};
pub use token::ProposalToken;
pub use tools::{EditTools, APPROVE_LITERAL};

pub use editgate_fingerprint::{Fingerprint, FingerprintService};

/// Commonly used types
pub mod prelude {
    pub use crate::collaborators::{BackupService, ChangeTrackingService};
    pub use crate::engine::{EditEngine, EditEngineBuilder};
    pub use crate::error::{EditError, EditResult, ErrorKind};
    pub use crate::planner::{ProposalResult, ProposeRequest};
    pub use crate::proposal::Mutation;
    pub use crate::token::ProposalToken;
    pub use crate::tools::EditTools;
    pub use editgate_fingerprint::Fingerprint;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
