//! Pipeline from source text to every view of a workflow.
//!
//! ```text
//! source ──parse──► AST ──┬──► Steps (SemanticNode tree)
//!                         ├──► Actions (WorkflowAction list)
//!                         └──► Diagnostics
//! source ──strip──► Raw
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::actions::{group_actions, ExplainOptions, WorkflowAction};
use crate::config::Config;
use crate::diagnostics::{check_workflow, Diagnostic};
use crate::i18n::Localizer;
use crate::parser::ast::Span;
use crate::parser::strip::strip_types;
use crate::parser::{parse_workflow, ParseError};
use crate::steps::{render_steps, RenderOptions, SemanticNode};


#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    pub render: RenderOptions,
    pub explain: ExplainOptions,
}

impl From<&Config> for AnalyzeOptions {
    fn from(config: &Config) -> Self {
        Self {
            render: config.render.clone(),
            explain: config.explain.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// Lowercase hex SHA-256 of the source
    pub revision: String,
    pub steps: Vec<SemanticNode>,
    pub actions: Vec<WorkflowAction>,
    pub raw: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Why a source could not be analyzed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Span>,
}

impl From<ParseError> for Failure {
    fn from(err: ParseError) -> Self {
        Self {
            message: err.message(),
            location: err.span(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(span) => write!(
                f,
                "{} (line {}, col {})",
                self.message,
                span.start_line + 1,
                span.start_col + 1
            ),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Failure {}

pub fn revision(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run the whole pipeline once, without memoization
pub fn analyze(
    source: &str,
    options: &AnalyzeOptions,
    localizer: &dyn Localizer,
) -> Result<Analysis, Failure> {
    let revision = revision(source);
    debug!(revision = %revision, bytes = source.len(), "analyzing workflow");

    let workflow = parse_workflow(source).map_err(|err| {
        debug!(error = %err, "parse failed");
        Failure::from(err)
    })?;
    debug!(statements = workflow.body.len(), "parsed workflow");

    let steps = render_steps(&workflow.body, 0, &options.render, localizer);
    debug!(nodes = steps.len(), "rendered steps");

    let actions = group_actions(&workflow.body, &options.explain, localizer);
    debug!(actions = actions.len(), "grouped actions");

    let raw = strip_types(source);
    let diagnostics = check_workflow(&workflow, source);
    debug!(diagnostics = diagnostics.len(), "checked workflow");

    Ok(Analysis {
        revision,
        steps,
        actions,
        raw,
        diagnostics,
    })
}

struct Memo {
    source: String,
    options: AnalyzeOptions,
    result: Result<Analysis, Failure>,
}

/// Analyzes sources with a fixed localizer, remembering the latest result.
///
/// Only one entry is kept; any change to the source or options recomputes.
pub struct Analyzer<L: Localizer> {
    localizer: L,
    memo: Option<Memo>,
}

impl<L: Localizer> Analyzer<L> {
    pub fn new(localizer: L) -> Self {
        Self {
            localizer,
            memo: None,
        }
    }

    pub fn localizer(&self) -> &L {
        &self.localizer
    }

    pub fn analyze(
        &mut self,
        source: &str,
        options: &AnalyzeOptions,
    ) -> Result<Analysis, Failure> {
        if let Some(memo) = &self.memo {
            if memo.source == source && &memo.options == options {
                debug!("analysis served from memo");
                return memo.result.clone();
            }
        }

        let result = analyze(source, options, &self.localizer);
        self.memo = Some(Memo {
            source: source.to_string(),
            options: options.clone(),
            result: result.clone(),
        });
        result
    }

    /// Drop the remembered result
    pub fn evict(&mut self) {
        self.memo = None;
    }

    pub fn is_memoized(&self, source: &str, options: &AnalyzeOptions) -> bool {
        self.memo
            .as_ref()
            .is_some_and(|memo| memo.source == source && &memo.options == options)
    }
}
