//! Tests for the diagnostics rules

use super::*;
use crate::parser::parse_workflow;

// ============================================================================
// Helper Functions
// ============================================================================

fn wrap(body: &str) -> String {
    format!("async function workflow() {{\n{}\n}}", body)
}

/// Parse a workflow body and run every rule
fn check(body: &str) -> Vec<Diagnostic> {
    let source = wrap(body);
    let workflow = parse_workflow(&source).expect("Parse should succeed");
    check_workflow(&workflow, &source)
}

fn has_rule(diagnostics: &[Diagnostic], rule_id: &str) -> bool {
    diagnostics.iter().any(|d| d.rule_id == rule_id)
}

fn for_rule<'a>(diagnostics: &'a [Diagnostic], rule_id: &str) -> Vec<&'a Diagnostic> {
    diagnostics.iter().filter(|d| d.rule_id == rule_id).collect()
}

// ============================================================================
// Missing Condition Tests
// ============================================================================

#[test]
fn test_missing_condition_if() {
    let diagnostics = check("if () { step(); }");

    let found = for_rule(&diagnostics, "missing-condition");
    assert_eq!(found.len(), 1);
    assert!(found[0].is_error());
    assert!(found[0].message.contains("`if`"));
    assert_eq!(found[0].span.start_line, 1);
}

#[test]
fn test_missing_condition_loops_and_try() {
    let diagnostics = check("while () {}\ndo {} while ()\ntry { a(); }");

    let messages: Vec<_> = for_rule(&diagnostics, "missing-condition")
        .iter()
        .map(|d| d.message.clone())
        .collect();
    assert_eq!(
        messages,
        vec![
            "`while` has an empty condition",
            "`do...while` has an empty condition",
            "`try` has neither `catch` nor `finally`",
        ]
    );
}

#[test]
fn test_missing_condition_nested() {
    let diagnostics = check("for (const x of xs) { if (x) { if () {} } }");
    assert_eq!(for_rule(&diagnostics, "missing-condition").len(), 1);
}

#[test]
fn test_complete_conditions_ok() {
    let diagnostics = check("if (a) {} else {}\nwhile (b) {}\ntry { c(); } finally {}");
    assert!(!has_rule(&diagnostics, "missing-condition"));
}

// ============================================================================
// Unreachable Code Tests
// ============================================================================

#[test]
fn test_unreachable_after_return() {
    let diagnostics = check("return 1;\nlog('a');\nlog('b');");

    let found = for_rule(&diagnostics, "unreachable-code");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].severity, Severity::Warning);
    assert_eq!(found[0].message, "Unreachable code after `return`");
    assert_eq!(found[0].span.start_line, 2);
    assert_eq!(found[0].span.end_line, 3);
}

#[test]
fn test_unreachable_in_loop_body() {
    let diagnostics = check("for (const x of xs) { if (x) { continue; step(); } }");

    let found = for_rule(&diagnostics, "unreachable-code");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "Unreachable code after `continue`");
}

#[test]
fn test_hoisted_functions_and_empty_statements_ok() {
    let diagnostics = check("return run();;\nfunction run() { return 1; }");
    assert!(!has_rule(&diagnostics, "unreachable-code"));
}

#[test]
fn test_exit_as_last_statement_ok() {
    let diagnostics = check("const x = 1;\nif (x) { throw new Error('x'); }\nreturn x;");
    assert!(diagnostics.is_empty(), "Unexpected: {:?}", diagnostics);
}

// ============================================================================
// Max Nesting Depth Tests
// ============================================================================

fn nested_ifs(levels: usize) -> String {
    let mut body = String::from("step();");
    for level in 0..levels {
        body = format!("if (c{}) {{ {} }}", level, body);
    }
    body
}

#[test]
fn test_nesting_within_limit_ok() {
    let diagnostics = check(&nested_ifs(rules::MAX_NEST_DEPTH));
    assert!(!has_rule(&diagnostics, "max-nesting-depth"));
}

#[test]
fn test_nesting_beyond_limit_reported_once() {
    let diagnostics = check(&nested_ifs(rules::MAX_NEST_DEPTH + 3));

    let found = for_rule(&diagnostics, "max-nesting-depth");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "Nesting depth 11 exceeds the maximum of 10");
}

#[test]
fn test_custom_max_depth() {
    let source = wrap("if (a) { if (b) { step(); } }");
    let workflow = parse_workflow(&source).expect("Parse should succeed");
    let rule = rules::MaxNestingDepthRule { max_depth: 1 };

    let found = rule.validate(&workflow, &source);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "Nesting depth 2 exceeds the maximum of 1");
}

// ============================================================================
// Validator Tests
// ============================================================================

#[test]
fn test_diagnostics_sorted_by_position() {
    let diagnostics = check("try { a(); }\nreturn 1;\nif () {}");

    let rules: Vec<_> = diagnostics.iter().map(|d| d.rule_id).collect();
    assert_eq!(
        rules,
        vec!["missing-condition", "missing-condition", "unreachable-code"]
    );
}

#[test]
fn test_has_errors() {
    let source = wrap("if () {}");
    let workflow = parse_workflow(&source).expect("Parse should succeed");
    assert!(has_errors(&workflow, &source));

    let source = wrap("return 1;\nlog(1);");
    let workflow = parse_workflow(&source).expect("Parse should succeed");
    assert!(!has_errors(&workflow, &source));
}

#[test]
fn test_rules_listed() {
    let validator = Validator::new();
    let ids: Vec<_> = validator.rules().map(|(id, _)| id).collect();
    assert_eq!(
        ids,
        vec!["missing-condition", "unreachable-code", "max-nesting-depth"]
    );
}

#[test]
fn test_display_uses_one_based_positions() {
    let diagnostics = check("if () {}");
    assert_eq!(
        diagnostics[0].to_string(),
        "error at line 2, col 1: `if` has an empty condition [missing-condition]"
    );
}
