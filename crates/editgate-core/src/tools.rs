//! Tool-invocation surface
//!
//! Typed request structs for every external operation, plus a JSON
//! [`EditTools::dispatch`] entry point for tool-calling hosts. Every outcome,
//! including decode failures and unknown tools, comes back as a structured
//! JSON value: `{"status":"ok","result":...}` or
//! `{"status":"error","error":{"kind":...,"message":...}}`.

use crate::applier::ApplyResult;
use crate::engine::EditEngine;
use crate::error::{EditError, EditResult, ErrorKind, Failure};
use crate::planner::{ProposalResult, ProposeRequest};
use crate::proposal::{Mutation, ProposalSummary};
use crate::token::ProposalToken;
use editgate_fingerprint::Fingerprint;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Literal a caller must pass to `approve`
pub const APPROVE_LITERAL: &str = "APPROVE";

pub const PROPOSE_REPLACE_LINES: &str = "propose_replace_lines";
pub const PROPOSE_INSERT_AFTER_LINE: &str = "propose_insert_after_line";
pub const PROPOSE_DELETE_LINES: &str = "propose_delete_lines";
pub const PROPOSE_PATTERN_REPLACE: &str = "propose_pattern_replace";
pub const APPROVE: &str = "approve";
pub const CANCEL: &str = "cancel";
pub const LIST_PENDING: &str = "list_pending";

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProposeReplaceLinesRequest {
    /// File to edit
    pub path: PathBuf,
    /// First line to replace (1-based)
    pub start_line: usize,
    /// Last line to replace (inclusive)
    pub end_line: usize,
    /// Replacement text; may span zero or more lines
    pub new_content: String,
    /// Abort unless the file still has this fingerprint (hex)
    #[serde(default)]
    pub pre_check_fingerprint: Option<String>,
    /// Back the file up before applying
    #[serde(default)]
    pub create_backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProposeInsertAfterLineRequest {
    pub path: PathBuf,
    /// Insert after this line; 0 inserts before the first line
    pub after_line: usize,
    pub content: String,
    #[serde(default)]
    pub pre_check_fingerprint: Option<String>,
    /// Re-indent the block to match the line it follows
    #[serde(default = "default_true")]
    pub maintain_indentation: bool,
    #[serde(default)]
    pub create_backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProposeDeleteLinesRequest {
    pub path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub pre_check_fingerprint: Option<String>,
    #[serde(default)]
    pub create_backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProposePatternReplaceRequest {
    pub path: PathBuf,
    /// Literal text, or a regular expression when `use_regex` is set
    pub search_pattern: String,
    /// Replacement; `$1`-style groups expand only in regex mode
    pub replace_with: String,
    #[serde(default)]
    pub pre_check_fingerprint: Option<String>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub use_regex: bool,
    #[serde(default)]
    pub create_backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApproveRequest {
    pub token: ProposalToken,
    /// Must be exactly `APPROVE`
    pub confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CancelRequest {
    pub token: ProposalToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListPendingRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub token: ProposalToken,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPendingResponse {
    pub count: usize,
    pub proposals: Vec<ProposalSummary>,
}

/// Name, description and input schema of one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    fn of<T: JsonSchema>(name: &str, description: &str) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            input_schema: serde_json::to_value(schema_for!(T)).unwrap_or_default(),
        }
    }
}

/// Every tool exposed by [`EditTools`]
#[must_use]
pub fn tool_schemas() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::of::<ProposeReplaceLinesRequest>(
            PROPOSE_REPLACE_LINES,
            "Propose replacing an inclusive line range. Returns a diff preview and an approval token.",
        ),
        ToolDefinition::of::<ProposeInsertAfterLineRequest>(
            PROPOSE_INSERT_AFTER_LINE,
            "Propose inserting text after a line (0 = start of file).",
        ),
        ToolDefinition::of::<ProposeDeleteLinesRequest>(
            PROPOSE_DELETE_LINES,
            "Propose deleting an inclusive line range.",
        ),
        ToolDefinition::of::<ProposePatternReplaceRequest>(
            PROPOSE_PATTERN_REPLACE,
            "Propose replacing every occurrence of a literal or regex pattern.",
        ),
        ToolDefinition::of::<ApproveRequest>(
            APPROVE,
            "Apply a pending proposal. The confirmation must be the literal APPROVE.",
        ),
        ToolDefinition::of::<CancelRequest>(CANCEL, "Discard a pending proposal."),
        ToolDefinition::of::<ListPendingRequest>(LIST_PENDING, "List live pending proposals."),
    ]
}

/// Tool facade over an [`EditEngine`]
#[derive(Debug, Clone)]
pub struct EditTools {
    engine: Arc<EditEngine>,
}

impl EditTools {
    #[must_use]
    pub fn new(engine: Arc<EditEngine>) -> Self {
        Self { engine }
    }

    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Arc<EditEngine> {
        &self.engine
    }

    pub async fn propose_replace_lines(
        &self,
        req: ProposeReplaceLinesRequest,
    ) -> EditResult<ProposalResult> {
        let request = ProposeRequest::new(
            req.path,
            Mutation::ReplaceLineRange {
                start_line: req.start_line,
                end_line: req.end_line,
                new_content: req.new_content,
            },
        );
        self.propose(request, req.pre_check_fingerprint.as_deref(), req.create_backup)
            .await
    }

    pub async fn propose_insert_after_line(
        &self,
        req: ProposeInsertAfterLineRequest,
    ) -> EditResult<ProposalResult> {
        let request = ProposeRequest::new(
            req.path,
            Mutation::InsertAfterLine {
                after_line: req.after_line,
                content: req.content,
                maintain_indentation: req.maintain_indentation,
            },
        );
        self.propose(request, req.pre_check_fingerprint.as_deref(), req.create_backup)
            .await
    }

    pub async fn propose_delete_lines(
        &self,
        req: ProposeDeleteLinesRequest,
    ) -> EditResult<ProposalResult> {
        let request = ProposeRequest::new(
            req.path,
            Mutation::DeleteLineRange {
                start_line: req.start_line,
                end_line: req.end_line,
            },
        );
        self.propose(request, req.pre_check_fingerprint.as_deref(), req.create_backup)
            .await
    }

    pub async fn propose_pattern_replace(
        &self,
        req: ProposePatternReplaceRequest,
    ) -> EditResult<ProposalResult> {
        let request = ProposeRequest::new(
            req.path,
            Mutation::PatternReplace {
                search_pattern: req.search_pattern,
                replace_with: req.replace_with,
                case_sensitive: req.case_sensitive,
                use_regex: req.use_regex,
            },
        );
        self.propose(request, req.pre_check_fingerprint.as_deref(), req.create_backup)
            .await
    }

    async fn propose(
        &self,
        mut request: ProposeRequest,
        pre_check: Option<&str>,
        create_backup: bool,
    ) -> EditResult<ProposalResult> {
        if let Some(hex) = pre_check {
            let fingerprint: Fingerprint = hex.parse().map_err(|e| {
                EditError::invalid_argument(format!("malformed pre_check_fingerprint: {e}"))
            })?;
            request = request.with_pre_check(fingerprint);
        }
        self.engine
            .propose(request.with_backup(create_backup))
            .await
    }

    /// Apply a proposal after checking the confirmation literal
    ///
    /// A wrong literal is rejected before the token is touched.
    ///
    /// # Errors
    /// `InvalidArgument` for a wrong literal; otherwise as `EditEngine::apply`
    pub async fn approve(&self, req: ApproveRequest) -> EditResult<ApplyResult> {
        if req.confirmation != APPROVE_LITERAL {
            return Err(EditError::invalid_argument(format!(
                "confirmation must be the literal {APPROVE_LITERAL:?}"
            )));
        }
        self.engine.apply(&req.token, None).await
    }

    /// # Errors
    /// `ProposalNotFound` when no entry exists under the token
    pub fn cancel(&self, req: CancelRequest) -> EditResult<CancelResponse> {
        self.engine.cancel(&req.token)?;
        Ok(CancelResponse {
            token: req.token,
            cancelled: true,
        })
    }

    #[must_use]
    pub fn list_pending(&self) -> ListPendingResponse {
        let proposals = self.engine.list_pending();
        ListPendingResponse {
            count: proposals.len(),
            proposals,
        }
    }

    /// Decode `args`, run `tool` and encode the outcome
    pub async fn dispatch(&self, tool: &str, args: Value) -> Value {
        let outcome = match tool {
            PROPOSE_REPLACE_LINES => match decode(tool, args) {
                Ok(req) => encode(self.propose_replace_lines(req).await),
                Err(e) => Err(e),
            },
            PROPOSE_INSERT_AFTER_LINE => match decode(tool, args) {
                Ok(req) => encode(self.propose_insert_after_line(req).await),
                Err(e) => Err(e),
            },
            PROPOSE_DELETE_LINES => match decode(tool, args) {
                Ok(req) => encode(self.propose_delete_lines(req).await),
                Err(e) => Err(e),
            },
            PROPOSE_PATTERN_REPLACE => match decode(tool, args) {
                Ok(req) => encode(self.propose_pattern_replace(req).await),
                Err(e) => Err(e),
            },
            APPROVE => match decode(tool, args) {
                Ok(req) => encode(self.approve(req).await),
                Err(e) => Err(e),
            },
            CANCEL => decode(tool, args).and_then(|req| encode(self.cancel(req))),
            LIST_PENDING => decode::<ListPendingRequest>(tool, args)
                .and_then(|_| encode(Ok(self.list_pending()))),
            unknown => Err(EditError::invalid_argument(format!("unknown tool {unknown:?}")).into()),
        };

        match outcome {
            Ok(result) => json!({ "status": "ok", "result": result }),
            Err(failure) => {
                tracing::debug!(tool, kind = %failure.kind, "tool call failed");
                json!({ "status": "error", "error": failure })
            }
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, Failure> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| {
        EditError::invalid_argument(format!("invalid arguments for {tool}: {e}")).into()
    })
}

fn encode<T: Serialize>(result: EditResult<T>) -> Result<Value, Failure> {
    let value = result.map_err(Failure::from)?;
    serde_json::to_value(value).map_err(|e| Failure {
        kind: ErrorKind::Internal,
        message: format!("failed to encode result: {e}"),
    })
}
