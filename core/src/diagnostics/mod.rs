//! Structural lint for workflow scripts.
//!
//! Runs after parsing and reports problems the grammar accepts but the
//! views can only flag locally: empty conditions, `try` blocks without
//! handlers, code after an exit, and very deep nesting. Diagnostics are
//! reported next to the views and never stop them from rendering.
//!
//! # Usage
//!
//! ```ignore
//! use scriptlens_core::parser::parse_workflow;
//! use scriptlens_core::diagnostics::check_workflow;
//!
//! let workflow = parse_workflow(source)?;
//! for diagnostic in check_workflow(&workflow, source) {
//!     eprintln!("{}", diagnostic);
//! }
//! ```
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `diagnostics/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Add it to `Validator::new()`

pub mod rules;

use serde::Serialize;

use crate::parser::ast::{Span, Stmt};
use crate::parser::WorkflowDef;

// ============================================================================
// Diagnostic Types
// ============================================================================

/// A problem found in a parsed workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub message: String,
    pub severity: Severity,
    /// Which rule produced this diagnostic
    pub rule_id: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The statement cannot be explained as written
    Error,
    /// Probably a mistake
    Warning,
    /// Suggestion for improvement
    Hint,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Hint => "hint",
        }
    }
}

impl Diagnostic {
    pub fn error(span: Span, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            span,
            message: message.into(),
            severity: Severity::Error,
            rule_id,
        }
    }

    pub fn warning(span: Span, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            span,
            message: message.into(),
            severity: Severity::Warning,
            rule_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at line {}, col {}: {} [{}]",
            self.severity.as_str(),
            self.span.start_line + 1,
            self.span.start_col + 1,
            self.message,
            self.rule_id
        )
    }
}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// One independent check over a parsed workflow
pub trait ValidationRule: Send + Sync {
    /// Unique identifier, e.g. "unreachable-code"
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Empty when the workflow passes
    fn validate(&self, workflow: &WorkflowDef, source: &str) -> Vec<Diagnostic>;
}

// ============================================================================
// Validator
// ============================================================================

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// All built-in rules
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(rules::MissingConditionRule),
                Box::new(rules::UnreachableCodeRule),
                Box::new(rules::MaxNestingDepthRule::default()),
            ],
        }
    }

    /// Diagnostics from every rule, ordered by position
    pub fn validate(&self, workflow: &WorkflowDef, source: &str) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(workflow, source))
            .collect();
        diagnostics.sort_by_key(|diagnostic| (diagnostic.span.start, diagnostic.rule_id));
        diagnostics
    }

    /// `(id, description)` of every registered rule
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Public API
// ============================================================================

pub fn check_workflow(workflow: &WorkflowDef, source: &str) -> Vec<Diagnostic> {
    Validator::new().validate(workflow, source)
}

pub fn has_errors(workflow: &WorkflowDef, source: &str) -> bool {
    check_workflow(workflow, source)
        .iter()
        .any(|d| d.is_error())
}

// ============================================================================
// AST Traversal
// ============================================================================

/// Statement lists directly nested inside `stmt`
pub(crate) fn nested_bodies(stmt: &Stmt) -> Vec<&[Stmt]> {
    match stmt {
        Stmt::Block { body, .. } => vec![body.as_slice()],
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            let mut bodies = vec![branch(consequent)];
            if let Some(alternate) = alternate {
                bodies.push(branch(alternate));
            }
            bodies
        }
        Stmt::For { body, .. }
        | Stmt::ForEach { body, .. }
        | Stmt::While { body, .. }
        | Stmt::DoWhile { body, .. } => vec![branch(body)],
        Stmt::Try {
            block,
            handler,
            finalizer,
            ..
        } => {
            let mut bodies = vec![block.as_slice()];
            if let Some(handler) = handler {
                bodies.push(handler.body.as_slice());
            }
            if let Some(finalizer) = finalizer {
                bodies.push(finalizer.as_slice());
            }
            bodies
        }
        Stmt::Switch { cases, .. } => cases.iter().map(|case| case.body.as_slice()).collect(),
        Stmt::Function { func, .. } => vec![func.body.as_slice()],
        _ => Vec::new(),
    }
}

/// A branch body; a single statement stands alone
fn branch(stmt: &Stmt) -> &[Stmt] {
    match stmt {
        Stmt::Block { body, .. } => body,
        other => std::slice::from_ref(other),
    }
}

#[cfg(test)]
mod tests;
