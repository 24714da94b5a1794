//! Rule: Missing Condition
//!
//! Reports an error for control flow whose required part was left out.
//!
//! # Invalid
//!
//! ```text
//! if () { step() }          // empty condition
//! while () { step() }       // empty condition
//! try { step() }            // neither catch nor finally
//! ```

use crate::parser::ast::Stmt;
use crate::parser::WorkflowDef;

use super::super::{nested_bodies, Diagnostic, ValidationRule};

pub struct MissingConditionRule;

impl ValidationRule for MissingConditionRule {
    fn id(&self) -> &'static str {
        "missing-condition"
    }

    fn description(&self) -> &'static str {
        "Conditions and error handlers must not be empty"
    }

    fn validate(&self, workflow: &WorkflowDef, _source: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        check_list(&workflow.body, &mut diagnostics, self.id());
        diagnostics
    }
}

fn check_list(body: &[Stmt], diagnostics: &mut Vec<Diagnostic>, rule_id: &'static str) {
    for stmt in body {
        check_stmt(stmt, diagnostics, rule_id);
    }
}

fn check_stmt(stmt: &Stmt, diagnostics: &mut Vec<Diagnostic>, rule_id: &'static str) {
    let construct = match stmt {
        Stmt::If { test: None, .. } => Some("if"),
        Stmt::While { test: None, .. } => Some("while"),
        Stmt::DoWhile { test: None, .. } => Some("do...while"),
        _ => None,
    };
    if let Some(construct) = construct {
        diagnostics.push(Diagnostic::error(
            stmt.span(),
            format!("`{}` has an empty condition", construct),
            rule_id,
        ));
    }

    if let Stmt::Try {
        handler: None,
        finalizer: None,
        ..
    } = stmt
    {
        diagnostics.push(Diagnostic::error(
            stmt.span(),
            "`try` has neither `catch` nor `finally`",
            rule_id,
        ));
    }

    for body in nested_bodies(stmt) {
        check_list(body, diagnostics, rule_id);
    }
}
