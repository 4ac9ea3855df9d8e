//! Proposal data model
//!
//! Defines the four mutation kinds and [`PendingProposal`], the in-flight,
//! not-yet-applied intent held by the store.

use crate::diff::DiffPreview;
use crate::token::ProposalToken;
use chrono::{DateTime, Utc};
use editgate_fingerprint::Fingerprint;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A requested change to a text file
///
/// Line numbers are 1-based and ranges are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    /// Replace lines `start_line..=end_line` with `new_content` (zero or more lines)
    ReplaceLineRange {
        start_line: usize,
        end_line: usize,
        new_content: String,
    },

    /// Insert `content` after line `after_line`; 0 inserts before the first line
    InsertAfterLine {
        after_line: usize,
        content: String,
        maintain_indentation: bool,
    },

    /// Remove lines `start_line..=end_line`
    DeleteLineRange { start_line: usize, end_line: usize },

    /// Replace every occurrence of a literal or regex pattern
    PatternReplace {
        search_pattern: String,
        replace_with: String,
        case_sensitive: bool,
        use_regex: bool,
    },
}

impl Mutation {
    /// Discriminant of this mutation
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::ReplaceLineRange { .. } => MutationKind::ReplaceLineRange,
            Self::InsertAfterLine { .. } => MutationKind::InsertAfterLine,
            Self::DeleteLineRange { .. } => MutationKind::DeleteLineRange,
            Self::PatternReplace { .. } => MutationKind::PatternReplace,
        }
    }

    /// One-line description used for backups and audit records
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::ReplaceLineRange {
                start_line,
                end_line,
                ..
            } => format!("replace lines {start_line}-{end_line}"),
            Self::InsertAfterLine { after_line, .. } => format!("insert after line {after_line}"),
            Self::DeleteLineRange {
                start_line,
                end_line,
            } => format!("delete lines {start_line}-{end_line}"),
            Self::PatternReplace {
                search_pattern,
                use_regex,
                ..
            } => {
                let mode = if *use_regex { "regex" } else { "literal" };
                format!("replace {mode} pattern {search_pattern:?}")
            }
        }
    }
}

/// Kind of mutation, without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    ReplaceLineRange,
    InsertAfterLine,
    DeleteLineRange,
    PatternReplace,
}

impl MutationKind {
    /// Stable snake_case name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReplaceLineRange => "replace_line_range",
            Self::InsertAfterLine => "insert_after_line",
            Self::DeleteLineRange => "delete_line_range",
            Self::PatternReplace => "pattern_replace",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An in-flight mutation awaiting approval
///
/// # Invariants
/// - `expires_at > created_at`
/// - `preview_content` is exactly what a successful apply writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProposal {
    /// Only handle on this proposal
    pub token: ProposalToken,
    /// Target file
    pub file_path: PathBuf,
    /// Requested change
    pub mutation: Mutation,
    /// Fingerprint of the file when the proposal was captured
    pub original_fingerprint: Fingerprint,
    /// Full resulting file content
    pub preview_content: String,
    /// Diff shown to the approver
    pub diff_preview: DiffPreview,
    /// Lines touched (match count for pattern replacements)
    pub lines_affected: usize,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// Whether apply must back up the file first
    pub backup_requested: bool,
}

impl PendingProposal {
    /// Whether the proposal has expired at `now`
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Mutation kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        self.mutation.kind()
    }

    /// Content-free summary for listings
    #[must_use]
    pub fn summary(&self) -> ProposalSummary {
        ProposalSummary {
            token: self.token.clone(),
            file_path: self.file_path.clone(),
            kind: self.kind(),
            description: self.mutation.describe(),
            lines_affected: self.lines_affected,
            original_fingerprint: self.original_fingerprint,
            created_at: self.created_at,
            expires_at: self.expires_at,
            backup_requested: self.backup_requested,
        }
    }
}

/// Serializable view of a pending proposal, without its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSummary {
    pub token: ProposalToken,
    pub file_path: PathBuf,
    pub kind: MutationKind,
    pub description: String,
    pub lines_affected: usize,
    pub original_fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub backup_requested: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_serde_is_tagged() {
        let mutation = Mutation::DeleteLineRange {
            start_line: 2,
            end_line: 4,
        };
        let json = serde_json::to_value(&mutation).unwrap();
        assert_eq!(json["kind"], "delete_line_range");
        assert_eq!(json["start_line"], 2);

        let back: Mutation = serde_json::from_value(json).unwrap();
        assert_eq!(back, mutation);
    }

    #[test]
    fn describe_mentions_parameters() {
        let m = Mutation::ReplaceLineRange {
            start_line: 3,
            end_line: 5,
            new_content: "X".into(),
        };
        assert_eq!(m.describe(), "replace lines 3-5");
        assert_eq!(m.kind().as_str(), "replace_line_range");

        let p = Mutation::PatternReplace {
            search_pattern: "foo".into(),
            replace_with: "bar".into(),
            case_sensitive: false,
            use_regex: false,
        };
        assert_eq!(p.describe(), "replace literal pattern \"foo\"");
    }
}
