//! Rule: Unreachable Code
//!
//! Reports a warning for statements that follow an unconditional exit in
//! the same statement list. Function declarations are hoisted and empty
//! statements do nothing, so neither counts.
//!
//! ```text
//! return result
//! log("done")        // warning: unreachable
//! ```

use crate::parser::ast::Stmt;
use crate::parser::WorkflowDef;

use super::super::{nested_bodies, Diagnostic, ValidationRule};

pub struct UnreachableCodeRule;

impl ValidationRule for UnreachableCodeRule {
    fn id(&self) -> &'static str {
        "unreachable-code"
    }

    fn description(&self) -> &'static str {
        "Statements after return, throw, break or continue never run"
    }

    fn validate(&self, workflow: &WorkflowDef, _source: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        check_list(&workflow.body, &mut diagnostics, self.id());
        diagnostics
    }
}

fn is_exit(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Return { .. } | Stmt::Throw { .. } | Stmt::Break { .. } | Stmt::Continue { .. }
    )
}

fn is_executable(stmt: &Stmt) -> bool {
    !matches!(
        stmt,
        Stmt::Empty { .. } | Stmt::Function { .. } | Stmt::TypeOnly { .. }
    )
}

fn check_list(body: &[Stmt], diagnostics: &mut Vec<Diagnostic>, rule_id: &'static str) {
    if let Some(exit) = body.iter().position(is_exit) {
        let dead: Vec<&Stmt> = body[exit + 1..]
            .iter()
            .filter(|stmt| is_executable(stmt))
            .collect();
        if let (Some(first), Some(last)) = (dead.first(), dead.last()) {
            diagnostics.push(Diagnostic::warning(
                first.span().merge(&last.span()),
                format!("Unreachable code after `{}`", body[exit].kind_name()),
                rule_id,
            ));
        }
    }

    for stmt in body {
        for nested in nested_bodies(stmt) {
            check_list(nested, diagnostics, rule_id);
        }
    }
}
