//! Parser tests - verify parsing and AST structure
//!
//! Stripping behaviour is covered next to the stripper in `strip.rs`.

use super::ast::{ArrowBody, BinaryOp, Expr, ForHead, ForInit, ForLoopKind, Pattern, Stmt};
use super::{parse_module, parse_workflow, ParseError, MAX_SOURCE_NESTING};

fn body(source: &str) -> Vec<Stmt> {
    parse_workflow(source).expect("Should parse").body
}

fn single_expr(source: &str) -> Expr {
    let wrapped = format!("function workflow() {{ {} }}", source);
    match body(&wrapped).into_iter().next() {
        Some(Stmt::Expr { expr, .. }) => expr,
        other => panic!("Expected expression statement, got {:?}", other),
    }
}

/* ===================== Entry Point ===================== */

#[test]
fn test_parse_snapshot_program() {
    let stmts = body(
        r#"function workflow() { const x = 1; if (x > 0) { console.log("positive"); } else { console.log("non-positive"); } return x; }"#,
    );

    assert_eq!(stmts.len(), 3);
    assert!(matches!(stmts[0], Stmt::VarDecl { .. }));
    match &stmts[1] {
        Stmt::If {
            test: Some(Expr::Binary { op, .. }),
            alternate: Some(_),
            ..
        } => assert_eq!(*op, BinaryOp::Gt),
        other => panic!("Expected If with binary test, got {:?}", other),
    }
    match &stmts[2] {
        Stmt::Return {
            value: Some(Expr::Ident { name, .. }),
            ..
        } => assert_eq!(name, "x"),
        other => panic!("Expected Return x, got {:?}", other),
    }
}

#[test]
fn test_parse_async_entry_point() {
    let def = parse_workflow("async function workflow() { await page.goto('https://a.test'); }")
        .expect("Should parse");
    assert!(def.is_async);
    assert_eq!(def.body.len(), 1);
}

#[test]
fn test_missing_entry_point() {
    let err = parse_workflow("function main() { return 1; }").unwrap_err();
    assert_eq!(err, ParseError::MissingEntryPoint);
    assert_eq!(err.message(), "workflow() function not found.");
    assert_eq!(err.span(), None);
}

#[test]
fn test_exported_or_parameterised_workflow_is_missing() {
    let exported = parse_workflow("export function workflow() { return 1; }");
    assert_eq!(exported.unwrap_err(), ParseError::MissingEntryPoint);

    let with_params = parse_workflow("function workflow(page) { return page; }");
    assert_eq!(with_params.unwrap_err(), ParseError::MissingEntryPoint);
}

#[test]
fn test_entry_point_among_other_items() {
    let source = r#"
import { chromium } from "playwright";
interface Options { headless: boolean }
function helper(a: number): number { return a * 2; }
function workflow() {
  return helper(21);
}
"#;
    let stmts = body(source);
    assert_eq!(stmts.len(), 1);
}

/* ===================== Syntax Errors ===================== */

#[test]
fn test_syntax_error_carries_location() {
    let err = parse_workflow("function workflow() {\n  const = 1;\n}").unwrap_err();
    match &err {
        ParseError::Syntax(message, Some(span)) => {
            assert!(!message.is_empty());
            assert_eq!(span.start_line, 1);
        }
        other => panic!("Expected syntax error with span, got {:?}", other),
    }
}

#[test]
fn test_unterminated_block_is_syntax_error() {
    let err = parse_workflow("function workflow() { if (x) {").unwrap_err();
    assert!(matches!(err, ParseError::Syntax(_, Some(_))));
}

#[test]
fn test_nesting_limit() {
    let depth = MAX_SOURCE_NESTING + 10;
    let source = format!(
        "function workflow() {{ return {}1{}; }}",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    let err = parse_workflow(&source).unwrap_err();
    match err {
        ParseError::TooDeep { limit, span } => {
            assert_eq!(limit, MAX_SOURCE_NESTING);
            assert!(span.start > 0);
        }
        other => panic!("Expected TooDeep, got {:?}", other),
    }
}

fn nested_ifs(levels: usize) -> String {
    let mut body = String::from("step();");
    for level in 0..levels {
        body = format!("if (c{}) {{ {} }}", level, body);
    }
    format!("function workflow() {{ {} }}", body)
}

fn assert_too_deep(source: &str) {
    match parse_workflow(source) {
        Err(ParseError::TooDeep { limit, .. }) => assert_eq!(limit, MAX_SOURCE_NESTING),
        other => panic!("Expected TooDeep, got {:?}", other.map(|w| w.body.len())),
    }
}

#[test]
fn test_nested_blocks_just_under_limit_parse() {
    // each `if (…) {` counts twice: the keyword and its block
    let source = nested_ifs(MAX_SOURCE_NESTING / 2 - 1);
    let stmts = body(&source);
    assert_eq!(stmts.len(), 1);

    assert_too_deep(&nested_ifs(MAX_SOURCE_NESTING / 2 + 1));
}

#[test]
fn test_nesting_without_brackets_is_counted() {
    let unbraced = format!(
        "function workflow() {{ {}step(); }}",
        "if (a) ".repeat(MAX_SOURCE_NESTING + 1)
    );
    assert_too_deep(&unbraced);

    let ternaries = format!(
        "function workflow() {{ return {}c; }}",
        "a ? b : ".repeat(MAX_SOURCE_NESTING + 1)
    );
    assert_too_deep(&ternaries);

    let else_ifs = format!(
        "function workflow() {{ if (a) {{}} {} }}",
        "else if (a) {} ".repeat(MAX_SOURCE_NESTING)
    );
    assert_too_deep(&else_ifs);
}

#[test]
fn test_sequential_statements_do_not_accumulate_nesting() {
    let count = MAX_SOURCE_NESTING * 2;
    let source = format!(
        "function workflow() {{\n{}{}{}}}",
        "if (a) { step() }\n".repeat(count),
        "const v = a ? b : c\n".repeat(count),
        "items.map(x => x)\n".repeat(count)
    );
    assert_eq!(body(&source).len(), count * 3);
}

#[test]
fn test_nesting_check_ignores_strings_and_comments() {
    let brackets = "(".repeat(MAX_SOURCE_NESTING + 1);
    let source = format!(
        "function workflow() {{\n  // {}\n  const s = \"{}\";\n  return s;\n}}",
        brackets, brackets
    );
    assert_eq!(body(&source).len(), 2);
}

/* ===================== Statements ===================== */

#[test]
fn test_parse_empty_if_condition() {
    let stmts = body("function workflow() { if () { step(); } next(); }");
    assert_eq!(stmts.len(), 2);
    match &stmts[0] {
        Stmt::If { test, .. } => assert!(test.is_none()),
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_parse_bare_try() {
    let stmts = body("function workflow() { try { risky(); } }");
    match &stmts[0] {
        Stmt::Try {
            handler, finalizer, ..
        } => {
            assert!(handler.is_none());
            assert!(finalizer.is_none());
        }
        other => panic!("Expected Try, got {:?}", other),
    }
}

#[test]
fn test_parse_try_catch_finally() {
    let stmts = body(
        "function workflow() { try { a(); } catch (err: unknown) { b(err); } finally { c(); } }",
    );
    match &stmts[0] {
        Stmt::Try {
            block,
            handler: Some(handler),
            finalizer: Some(finalizer),
            ..
        } => {
            assert_eq!(block.len(), 1);
            assert!(matches!(&handler.param, Some(Pattern::Ident { name, .. }) if name == "err"));
            assert_eq!(finalizer.len(), 1);
        }
        other => panic!("Expected Try with all clauses, got {:?}", other),
    }
}

#[test]
fn test_parse_optional_catch_binding() {
    let stmts = body("function workflow() { try { a(); } catch { b(); } }");
    match &stmts[0] {
        Stmt::Try {
            handler: Some(handler),
            ..
        } => assert!(handler.param.is_none()),
        other => panic!("Expected Try, got {:?}", other),
    }
}

#[test]
fn test_parse_loops() {
    let stmts = body(
        r#"function workflow() {
  for (let i = 0; i < 3; i++) { tick(i); }
  for (const item of items) { use(item); }
  for (key in record) { use(key); }
  while (busy) wait();
  do { poll(); } while (pending)
}"#,
    );
    assert_eq!(stmts.len(), 5);

    match &stmts[0] {
        Stmt::For {
            init: Some(ForInit::Decl { declarations, .. }),
            test: Some(_),
            update: Some(Expr::Update { prefix: false, .. }),
            ..
        } => assert_eq!(declarations.len(), 1),
        other => panic!("Expected classic for, got {:?}", other),
    }
    match &stmts[1] {
        Stmt::ForEach {
            kind: ForLoopKind::Of,
            left: ForHead::Decl { target, .. },
            ..
        } => assert_eq!(target.bound_names(), vec!["item"]),
        other => panic!("Expected for-of, got {:?}", other),
    }
    assert!(matches!(
        &stmts[2],
        Stmt::ForEach {
            kind: ForLoopKind::In,
            left: ForHead::Target { .. },
            ..
        }
    ));
    assert!(matches!(&stmts[3], Stmt::While { test: Some(_), .. }));
    assert!(matches!(&stmts[4], Stmt::DoWhile { test: Some(_), .. }));
    assert!(stmts.iter().all(Stmt::is_loop));
}

#[test]
fn test_parse_for_await() {
    let stmts = body("async function workflow() { for await (const chunk of stream) { push(chunk); } }");
    assert!(matches!(&stmts[0], Stmt::ForEach { is_await: true, .. }));
}

#[test]
fn test_parse_switch() {
    let stmts = body(
        "function workflow() { switch (mode) { case 'a': run(); break; default: skip(); } }",
    );
    match &stmts[0] {
        Stmt::Switch { cases, .. } => {
            assert_eq!(cases.len(), 2);
            assert!(cases[0].test.is_some());
            assert_eq!(cases[0].body.len(), 2);
            assert!(cases[1].test.is_none());
        }
        other => panic!("Expected Switch, got {:?}", other),
    }
    assert!(stmts[0].is_control_flow());
}

#[test]
fn test_parse_optional_semicolons() {
    let stmts = body("function workflow() {\n  const a = 1\n  const b = a + 1\n  return b\n}");
    assert_eq!(stmts.len(), 3);
}

#[test]
fn test_parse_destructuring() {
    let stmts = body(
        "function workflow() { const { a, b: [c, , d = 2], ...rest } = source(); }",
    );
    match &stmts[0] {
        Stmt::VarDecl { declarations, .. } => {
            assert_eq!(
                declarations[0].target.bound_names(),
                vec!["a", "c", "d", "rest"]
            );
        }
        other => panic!("Expected VarDecl, got {:?}", other),
    }
}

#[test]
fn test_parse_array_pattern_holes() {
    let stmts = body("function workflow() { const [, second, ] = pair; }");
    match &stmts[0] {
        Stmt::VarDecl { declarations, .. } => match &declarations[0].target {
            Pattern::Array { elements, .. } => {
                assert_eq!(elements.len(), 2);
                assert!(elements[0].is_none());
            }
            other => panic!("Expected array pattern, got {:?}", other),
        },
        other => panic!("Expected VarDecl, got {:?}", other),
    }
}

#[test]
fn test_parse_type_only_declarations() {
    let module = parse_module(
        "interface A { x: number }\ntype B = A | null;\nenum C { One, Two }\ndeclare const D: string;\n",
    )
    .expect("Should parse");
    let keywords: Vec<&str> = module
        .items
        .iter()
        .filter_map(|item| match item {
            Stmt::TypeOnly { keyword, .. } => Some(keyword.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(keywords, vec!["interface", "type", "enum", "declare"]);
    assert_eq!(module.type_edits.len(), 4);
}

#[test]
fn test_spans_are_zero_indexed() {
    let stmts = body("function workflow() {\n  step();\n}");
    let span = stmts[0].span();
    assert_eq!(span.start_line, 1);
    assert_eq!(span.start_col, 2);
}

/* ===================== Expressions ===================== */

#[test]
fn test_parse_template_literal() {
    match single_expr("log(`hello ${name}, you are ${age + 1}`);") {
        Expr::Call { args, .. } => match &args[0] {
            Expr::Template { quasis, exprs, .. } => {
                assert_eq!(quasis, &vec!["hello ".to_string(), ", you are ".to_string(), String::new()]);
                assert_eq!(exprs.len(), 2);
            }
            other => panic!("Expected template, got {:?}", other),
        },
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_optional_chaining() {
    match single_expr("user?.profile?.name;") {
        Expr::Member {
            property,
            optional,
            object,
            ..
        } => {
            assert_eq!(property, "name");
            assert!(optional);
            assert!(matches!(*object, Expr::Member { optional: true, .. }));
        }
        other => panic!("Expected optional member, got {:?}", other),
    }
}

#[test]
fn test_parse_arrow_functions() {
    match single_expr("items.map((item: Item) => item.id);") {
        Expr::Call { args, .. } => match &args[0] {
            Expr::Arrow {
                params,
                body: ArrowBody::Expr { .. },
                is_async: false,
                ..
            } => assert_eq!(params.len(), 1),
            other => panic!("Expected arrow, got {:?}", other),
        },
        other => panic!("Expected call, got {:?}", other),
    }

    match single_expr("run(async x => { await x; });") {
        Expr::Call { args, .. } => assert!(matches!(
            &args[0],
            Expr::Arrow {
                is_async: true,
                body: ArrowBody::Block { .. },
                ..
            }
        )),
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_binary_is_left_associative() {
    match single_expr("a - b - c;") {
        Expr::Binary { op, left, .. } => {
            assert_eq!(op, BinaryOp::Sub);
            assert!(matches!(*left, Expr::Binary { op: BinaryOp::Sub, .. }));
        }
        other => panic!("Expected binary, got {:?}", other),
    }
}

#[test]
fn test_parse_logical_precedence() {
    match single_expr("a || b && c;") {
        Expr::Binary { op, right, .. } => {
            assert_eq!(op, BinaryOp::Or);
            assert!(matches!(*right, Expr::Binary { op: BinaryOp::And, .. }));
        }
        other => panic!("Expected binary, got {:?}", other),
    }
}

#[test]
fn test_parse_assertions_leave_operand() {
    match single_expr("(value as unknown as string)!.trim();") {
        Expr::Call { callee, .. } => match *callee {
            Expr::Member { object, property, .. } => {
                assert_eq!(property, "trim");
                match *object {
                    Expr::Paren { expr, .. } => {
                        assert!(matches!(*expr, Expr::Ident { ref name, .. } if name == "value"))
                    }
                    other => panic!("Expected paren, got {:?}", other),
                }
            }
            other => panic!("Expected member, got {:?}", other),
        },
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_generic_call_and_new() {
    let stmts = body("function workflow() { const m = new Map<string, number>(); pick<string>(m); }");
    match &stmts[0] {
        Stmt::VarDecl { declarations, .. } => assert!(matches!(
            &declarations[0].init,
            Some(Expr::New { args: Some(args), .. }) if args.is_empty()
        )),
        other => panic!("Expected VarDecl, got {:?}", other),
    }
    match &stmts[1] {
        Stmt::Expr {
            expr: Expr::Call { args, .. },
            ..
        } => assert_eq!(args.len(), 1),
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_compound_assignment() {
    match single_expr("total += price * qty;") {
        Expr::Assign { op, .. } => assert_eq!(op, "+="),
        other => panic!("Expected assignment, got {:?}", other),
    }
}

#[test]
fn test_parse_string_escapes() {
    match single_expr(r#"say("line\nnext A");"#) {
        Expr::Call { args, .. } => match &args[0] {
            Expr::Str { value, raw, .. } => {
                assert_eq!(value, "line\nnext A");
                assert_eq!(raw, r#""line\nnext A""#);
            }
            other => panic!("Expected string, got {:?}", other),
        },
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_object_literal_members() {
    match single_expr("send({ id, [key]: 1, 'quoted': true, ...rest, run() { return 1; } });") {
        Expr::Call { args, .. } => match &args[0] {
            Expr::Object { props, .. } => assert_eq!(props.len(), 5),
            other => panic!("Expected object, got {:?}", other),
        },
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_regex_and_division() {
    match single_expr("ratio = a / b / 2;") {
        Expr::Assign { value, .. } => {
            assert!(matches!(*value, Expr::Binary { op: BinaryOp::Div, .. }))
        }
        other => panic!("Expected assignment, got {:?}", other),
    }
    match single_expr("text.replace(/\\s+/g, ' ');") {
        Expr::Call { args, .. } => assert!(matches!(&args[0], Expr::Regex { .. })),
        other => panic!("Expected call, got {:?}", other),
    }
}

#[test]
fn test_parse_await_unwraps() {
    let stmts = body("async function workflow() { await (page.close()); }");
    match &stmts[0] {
        Stmt::Expr { expr, .. } => assert!(matches!(expr.unwrap_await(), Expr::Call { .. })),
        other => panic!("Expected expression statement, got {:?}", other),
    }
}
