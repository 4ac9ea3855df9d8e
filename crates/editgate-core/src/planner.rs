//! Mutation planner
//!
//! Turns a proposal request into a [`PendingProposal`]:
//! 1. Static validation (pattern, backup availability)
//! 2. Path resolution: the stored path is absolute with symlinks resolved
//! 3. One snapshot read: content and fingerprint together
//! 4. Optional pre-check against a caller-supplied fingerprint
//! 5. Range validation and content computation
//! 6. Diff preview, token allocation, store insert
//!
//! The planner never writes to the target file.

use crate::config::ConfigError;
use crate::diff::{unified_diff, DiffPreview};
use crate::error::{EditError, EditResult};
use crate::proposal::{Mutation, MutationKind, PendingProposal};
use crate::store::{PendingProposalStore, StoreError};
use crate::text::{leading_whitespace, reindent, split_block, TextDocument};
use crate::token::ProposalToken;
use chrono::{DateTime, Utc};
use editgate_fingerprint::{Fingerprint, FingerprintService};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Attempts at allocating an unused token before giving up
pub const MAX_TOKEN_ATTEMPTS: usize = 3;

/// Input to [`MutationPlanner::propose`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposeRequest {
    pub path: PathBuf,
    pub mutation: Mutation,
    pub pre_check_fingerprint: Option<Fingerprint>,
    pub backup_requested: bool,
}

impl ProposeRequest {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mutation: Mutation) -> Self {
        Self {
            path: path.into(),
            mutation,
            pre_check_fingerprint: None,
            backup_requested: false,
        }
    }

    /// Fail early if the file no longer matches `fingerprint`
    #[must_use]
    pub fn with_pre_check(mut self, fingerprint: Fingerprint) -> Self {
        self.pre_check_fingerprint = Some(fingerprint);
        self
    }

    /// Back the file up before applying
    #[must_use]
    pub fn with_backup(mut self, requested: bool) -> Self {
        self.backup_requested = requested;
        self
    }
}

/// What the caller gets back from a successful proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResult {
    pub token: ProposalToken,
    pub file_path: PathBuf,
    pub kind: MutationKind,
    pub diff_preview: DiffPreview,
    pub lines_affected: usize,
    pub original_fingerprint: Fingerprint,
    pub expires_at: DateTime<Utc>,
}

impl From<&PendingProposal> for ProposalResult {
    fn from(proposal: &PendingProposal) -> Self {
        Self {
            token: proposal.token.clone(),
            file_path: proposal.file_path.clone(),
            kind: proposal.kind(),
            diff_preview: proposal.diff_preview.clone(),
            lines_affected: proposal.lines_affected,
            original_fingerprint: proposal.original_fingerprint,
            expires_at: proposal.expires_at,
        }
    }
}

/// Result of applying a mutation to in-memory content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedContent {
    pub content: String,
    pub lines_affected: usize,
}

/// Builds proposals and registers them in the store
#[derive(Debug)]
pub struct MutationPlanner {
    store: Arc<PendingProposalStore>,
    fingerprints: FingerprintService,
    ttl: chrono::Duration,
    context_lines: usize,
    backup_available: bool,
}

impl MutationPlanner {
    #[must_use]
    pub fn new(
        store: Arc<PendingProposalStore>,
        fingerprints: FingerprintService,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            store,
            fingerprints,
            ttl,
            context_lines: crate::config::DEFAULT_DIFF_CONTEXT_LINES,
            backup_available: false,
        }
    }

    #[must_use]
    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Whether a backup service is configured; requests asking for a backup
    /// are rejected otherwise
    #[must_use]
    pub fn with_backup_available(mut self, available: bool) -> Self {
        self.backup_available = available;
        self
    }

    /// Validate, preview and register a mutation
    ///
    /// # Errors
    /// - `InvalidArgument` for bad ranges, empty patterns, zero matches,
    ///   non-UTF-8 files, or a backup request with no backup service
    /// - `Regex` when the search pattern does not compile
    /// - `FileNotFound` / `Io` when the file cannot be read
    /// - `VersionConflict` when the pre-check fingerprint does not match
    pub async fn propose(&self, request: ProposeRequest) -> EditResult<ProposalResult> {
        let ProposeRequest {
            path,
            mutation,
            pre_check_fingerprint,
            backup_requested,
        } = request;

        if backup_requested && !self.backup_available {
            return Err(EditError::invalid_argument(
                "backup requested but no backup service is configured",
            ));
        }
        let pattern = compile_pattern(&mutation)?;

        let path = resolve_path(&path).await?;
        let snapshot = self.fingerprints.snapshot(&path).await?;
        if let Some(expected) = pre_check_fingerprint {
            if expected != snapshot.fingerprint {
                tracing::warn!(
                    path = %path.display(),
                    expected = %expected.short(),
                    actual = %snapshot.fingerprint.short(),
                    "pre-check fingerprint mismatch"
                );
                return Err(EditError::VersionConflict {
                    path,
                    expected,
                    actual: snapshot.fingerprint,
                });
            }
        }

        let original_fingerprint = snapshot.fingerprint;
        let original = String::from_utf8(snapshot.bytes).map_err(|_| {
            EditError::invalid_argument(format!("{} is not valid UTF-8 text", path.display()))
        })?;

        let planned = plan_content(&original, &mutation, pattern.as_ref())?;
        let diff_preview = unified_diff(
            &diff_label(&path),
            &original,
            &planned.content,
            self.context_lines,
        );

        let proposal = self.register(PendingProposalDraft {
            file_path: path,
            mutation,
            original_fingerprint,
            preview_content: planned.content,
            diff_preview,
            lines_affected: planned.lines_affected,
            backup_requested,
        })?;

        tracing::info!(
            token = %proposal.token.short(),
            path = %proposal.file_path.display(),
            kind = %proposal.kind(),
            lines_affected = proposal.lines_affected,
            fingerprint = %proposal.original_fingerprint.short(),
            "proposal created"
        );
        Ok(ProposalResult::from(proposal.as_ref()))
    }

    fn register(&self, draft: PendingProposalDraft) -> EditResult<Arc<PendingProposal>> {
        let clock = Arc::clone(self.store.clock());
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let created_at = clock.now();
            let expires_at = created_at
                .checked_add_signed(self.ttl)
                .ok_or_else(|| ConfigError::OutOfRange {
                    field: "proposal_ttl_ms",
                    value: u64::try_from(self.ttl.num_milliseconds()).unwrap_or(u64::MAX),
                })?;
            let proposal = draft.clone().into_proposal(
                ProposalToken::generate(created_at),
                created_at,
                expires_at,
            );
            match self.store.insert(proposal) {
                Ok(stored) => return Ok(stored),
                Err(StoreError::TokenCollision { token }) => {
                    tracing::warn!(token = %token.short(), attempt, "token collision, regenerating");
                }
            }
        }
        Err(EditError::TokenSpaceExhausted {
            attempts: MAX_TOKEN_ATTEMPTS,
        })
    }
}

#[derive(Debug, Clone)]
struct PendingProposalDraft {
    file_path: PathBuf,
    mutation: Mutation,
    original_fingerprint: Fingerprint,
    preview_content: String,
    diff_preview: DiffPreview,
    lines_affected: usize,
    backup_requested: bool,
}

impl PendingProposalDraft {
    fn into_proposal(
        self,
        token: ProposalToken,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> PendingProposal {
        PendingProposal {
            token,
            file_path: self.file_path,
            mutation: self.mutation,
            original_fingerprint: self.original_fingerprint,
            preview_content: self.preview_content,
            diff_preview: self.diff_preview,
            lines_affected: self.lines_affected,
            created_at,
            expires_at,
            backup_requested: self.backup_requested,
        }
    }
}

/// Absolute, symlink-free form of `path`
async fn resolve_path(path: &Path) -> EditResult<PathBuf> {
    tokio::fs::canonicalize(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EditError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EditError::io(path, e)
        }
    })
}

fn diff_label(path: &Path) -> String {
    path.to_string_lossy().trim_start_matches('/').to_owned()
}

/// Compile the search pattern of a pattern replacement
///
/// Literal patterns are escaped so a single regex engine handles both modes.
///
/// # Errors
/// `InvalidArgument` for an empty pattern, `Regex` if it does not compile
pub fn compile_pattern(mutation: &Mutation) -> EditResult<Option<Regex>> {
    let Mutation::PatternReplace {
        search_pattern,
        case_sensitive,
        use_regex,
        ..
    } = mutation
    else {
        return Ok(None);
    };
    if search_pattern.is_empty() {
        return Err(EditError::invalid_argument("search pattern must not be empty"));
    }
    let source = if *use_regex {
        search_pattern.clone()
    } else {
        regex::escape(search_pattern)
    };
    let regex = RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .build()?;
    Ok(Some(regex))
}

/// Apply `mutation` to `original` in memory
///
/// `pattern` must be the compiled pattern for a pattern replacement (see
/// [`compile_pattern`]); it is ignored for line mutations.
///
/// # Errors
/// `InvalidArgument` for out-of-range lines or a pattern with no matches
pub fn plan_content(
    original: &str,
    mutation: &Mutation,
    pattern: Option<&Regex>,
) -> EditResult<PlannedContent> {
    match mutation {
        Mutation::ReplaceLineRange {
            start_line,
            end_line,
            new_content,
        } => {
            let mut doc = TextDocument::parse(original);
            check_range(*start_line, *end_line, doc.line_count())?;
            doc.splice(*start_line..=*end_line, split_block(new_content));
            Ok(PlannedContent {
                content: doc.render(),
                lines_affected: end_line - start_line + 1,
            })
        }
        Mutation::InsertAfterLine {
            after_line,
            content,
            maintain_indentation,
        } => {
            let mut doc = TextDocument::parse(original);
            if *after_line > doc.line_count() {
                return Err(EditError::invalid_argument(format!(
                    "after_line {after_line} is beyond the end of the file ({} lines)",
                    doc.line_count()
                )));
            }
            let mut block = split_block(content);
            if *maintain_indentation {
                if let Some(anchor) = doc.line(*after_line) {
                    block = reindent(&block, leading_whitespace(anchor));
                }
            }
            let inserted = block.len();
            doc.insert_after(*after_line, block);
            Ok(PlannedContent {
                content: doc.render(),
                lines_affected: inserted,
            })
        }
        Mutation::DeleteLineRange {
            start_line,
            end_line,
        } => {
            let mut doc = TextDocument::parse(original);
            check_range(*start_line, *end_line, doc.line_count())?;
            doc.remove(*start_line..=*end_line);
            Ok(PlannedContent {
                content: doc.render(),
                lines_affected: end_line - start_line + 1,
            })
        }
        Mutation::PatternReplace {
            search_pattern,
            replace_with,
            use_regex,
            ..
        } => {
            let owned;
            let regex = match pattern {
                Some(regex) => regex,
                None => {
                    owned = compile_pattern(mutation)?.ok_or_else(|| {
                        EditError::invalid_argument("search pattern must not be empty")
                    })?;
                    &owned
                }
            };
            let matches = regex.find_iter(original).count();
            if matches == 0 {
                return Err(EditError::invalid_argument(format!(
                    "pattern {search_pattern:?} has no matches"
                )));
            }
            let content = if *use_regex {
                regex.replace_all(original, replace_with.as_str()).into_owned()
            } else {
                regex
                    .replace_all(original, NoExpand(replace_with.as_str()))
                    .into_owned()
            };
            Ok(PlannedContent {
                content,
                lines_affected: matches,
            })
        }
    }
}

fn check_range(start: usize, end: usize, total: usize) -> EditResult<()> {
    if start == 0 {
        return Err(EditError::invalid_argument(
            "start_line must be at least 1 (lines are 1-based)",
        ));
    }
    if start > end {
        return Err(EditError::invalid_argument(format!(
            "start_line {start} is after end_line {end}"
        )));
    }
    if end > total {
        return Err(EditError::invalid_argument(format!(
            "end_line {end} is beyond the end of the file ({total} lines)"
        )));
    }
    Ok(())
}
