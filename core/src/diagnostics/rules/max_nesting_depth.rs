//! Rule: Max Nesting Depth
//!
//! Reports a warning for each statement nested more than
//! [`MAX_NEST_DEPTH`] levels deep. Descendants of a reported statement are
//! not reported again.

use crate::parser::ast::Stmt;
use crate::parser::WorkflowDef;

use super::super::{nested_bodies, Diagnostic, ValidationRule};

/// Deepest nesting that reads comfortably in the Steps view
pub const MAX_NEST_DEPTH: usize = 10;

pub struct MaxNestingDepthRule {
    pub max_depth: usize,
}

impl Default for MaxNestingDepthRule {
    fn default() -> Self {
        Self {
            max_depth: MAX_NEST_DEPTH,
        }
    }
}

impl ValidationRule for MaxNestingDepthRule {
    fn id(&self) -> &'static str {
        "max-nesting-depth"
    }

    fn description(&self) -> &'static str {
        "Statements should not be nested too deeply"
    }

    fn validate(&self, workflow: &WorkflowDef, _source: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.check_list(&workflow.body, 0, &mut diagnostics);
        diagnostics
    }
}

impl MaxNestingDepthRule {
    fn check_list(&self, body: &[Stmt], depth: usize, diagnostics: &mut Vec<Diagnostic>) {
        for stmt in body {
            if depth > self.max_depth {
                diagnostics.push(Diagnostic::warning(
                    stmt.span(),
                    format!(
                        "Nesting depth {} exceeds the maximum of {}",
                        depth, self.max_depth
                    ),
                    self.id(),
                ));
                continue;
            }
            for nested in nested_bodies(stmt) {
                self.check_list(nested, depth + 1, diagnostics);
            }
        }
    }
}
