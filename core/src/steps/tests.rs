use super::*;
use crate::i18n::Catalog;
use crate::parser::parse_workflow;

fn steps_with(body: &str, options: &RenderOptions) -> Vec<SemanticNode> {
    let workflow = parse_workflow(&format!("async function workflow() {{\n{}\n}}", body))
        .expect("Should parse");
    render_steps(&workflow.body, 0, options, &Catalog::english())
}

fn steps(body: &str) -> Vec<SemanticNode> {
    steps_with(body, &RenderOptions::default())
}

fn titles(nodes: &[SemanticNode]) -> Vec<&str> {
    nodes.iter().map(|node| node.title.as_str()).collect()
}

#[test]
fn test_snapshot_program() {
    let nodes = steps(
        r#"const x = 1;
if (x > 0) { console.log("positive"); } else { console.log("non-positive"); }
return x;"#,
    );

    assert_eq!(nodes.len(), 3);

    assert_eq!(nodes[0].kind, NodeKind::Variable);
    assert_eq!(nodes[0].title, "prepare variable");
    assert_eq!(nodes[0].summary.as_deref(), Some("const x = 1"));
    assert_eq!(nodes[0].color, Color::Purple);
    assert!(!nodes[0].collapsible);

    let condition = &nodes[1];
    assert_eq!(condition.kind, NodeKind::Condition);
    assert_eq!(condition.summary.as_deref(), Some("if (x > 0)"));
    assert!(condition.collapsible);
    assert!(!condition.default_collapsed);
    assert_eq!(titles(&condition.children), vec!["Then", "Else"]);
    for section in &condition.children {
        assert_eq!(section.kind, NodeKind::Block);
        assert_eq!(section.depth, 1);
        assert!(!section.collapsible);
        assert_eq!(section.children.len(), 1);
        let call = &section.children[0];
        assert_eq!(call.kind, NodeKind::Call);
        assert_eq!(call.depth, 2);
        assert_eq!(call.summary.as_deref(), Some("console.log(…) args=1"));
        assert!(!call.important);
    }

    assert_eq!(nodes[2].kind, NodeKind::Return);
    assert_eq!(nodes[2].summary.as_deref(), Some("return x"));
    assert_eq!(nodes[2].color, Color::Green);
}

#[test]
fn test_bare_return() {
    let nodes = steps("return;");
    assert_eq!(nodes[0].summary.as_deref(), Some("return"));
}

#[test]
fn test_error_isolation() {
    let nodes = steps("a();\nif () { b(); }\nc();");

    assert_eq!(nodes.len(), 3);
    let errors: Vec<_> = nodes
        .iter()
        .filter(|node| node.kind == NodeKind::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(nodes[1].title, "If (invalid)");
    assert_eq!(nodes[1].message.as_deref(), Some("Missing test or consequent"));
    assert_eq!(nodes[1].color, Color::Red);
    assert!(nodes[1].children.is_empty());
    assert_eq!(nodes[0].summary.as_deref(), Some("a(…) args=0"));
    assert_eq!(nodes[2].summary.as_deref(), Some("c(…) args=0"));
}

#[test]
fn test_invalid_try_and_loops() {
    let nodes = steps("try { a(); }\nwhile () { b(); }\ndo { c(); } while ()\nd();");

    assert_eq!(
        titles(&nodes),
        vec!["Try...Catch (invalid)", "Loop (invalid)", "Loop (invalid)", "run tool"]
    );
    assert_eq!(
        nodes[0].message.as_deref(),
        Some("Missing catch or finally clause")
    );
    assert_eq!(nodes[1].message.as_deref(), Some("Missing loop condition"));
}

#[test]
fn test_bare_blocks_splice() {
    let nodes = steps("a();\n{ b(); { c(); } }\nd();");

    let summaries: Vec<_> = nodes
        .iter()
        .map(|node| (node.summary.as_deref().unwrap_or(""), node.depth))
        .collect();
    assert_eq!(
        summaries,
        vec![
            ("a(…) args=0", 0),
            ("b(…) args=0", 1),
            ("c(…) args=0", 2),
            ("d(…) args=0", 0),
        ]
    );
}

#[test]
fn test_try_sections() {
    let nodes = steps("try { a(); } catch (err) { b(err); } finally { c(); }");
    let node = &nodes[0];
    assert_eq!(node.kind, NodeKind::ErrorHandling);
    assert_eq!(node.summary.as_deref(), Some("try … catch … finally"));
    assert_eq!(titles(&node.children), vec!["Try", "Catch (err)", "Finally"]);

    let nodes = steps("try { a(); } catch { b(); }");
    assert_eq!(nodes[0].summary.as_deref(), Some("try … catch"));
    assert_eq!(titles(&nodes[0].children), vec!["Try", "Catch"]);

    let nodes = steps("try { a(); } finally { c(); }");
    assert_eq!(nodes[0].summary.as_deref(), Some("try … finally"));
    assert_eq!(titles(&nodes[0].children), vec!["Try", "Finally"]);
}

#[test]
fn test_catch_label_truncated() {
    let nodes = steps("try { a(); } catch ({ code, message, detail, extra }) { b(); }");
    assert_eq!(nodes[0].children[1].title, "Catch ({ code, message, detail…)");
}

#[test]
fn test_loops() {
    let nodes = steps(
        "for (let i = 0; i < 3; i++) { tick(); }
for (const item of items) { use(item); }
for (const key in record) use(key);
while (busy) wait();
do { poll(); } while (pending)",
    );

    let summaries: Vec<_> = nodes
        .iter()
        .map(|node| node.summary.as_deref().unwrap_or(""))
        .collect();
    assert_eq!(
        summaries,
        vec![
            "for (let i = 0; i < 3; i++)",
            "for (const item of items)",
            "for (const key in record)",
            "while (busy)",
            "do … while (pending)",
        ]
    );
    for node in &nodes {
        assert_eq!(node.kind, NodeKind::Loop);
        assert_eq!(node.color, Color::Blue);
        assert_eq!(titles(&node.children), vec!["Loop"]);
        assert_eq!(node.children[0].children.len(), 1);
    }
    assert_eq!(nodes[0].detail.as_deref(), Some("tick"));

    let waiting = &nodes[3].children[0].children[0];
    assert!(waiting.important);
    assert_eq!(waiting.title, "important operation");
}

#[test]
fn test_nested_containers_start_collapsed() {
    let nodes = steps("if (a) { if (b) { c(); } }");
    assert!(!nodes[0].default_collapsed);

    let inner = SemanticNode::at(&nodes, &[0, 0, 0]).expect("Should find inner condition");
    assert_eq!(inner.kind, NodeKind::Condition);
    assert_eq!(inner.depth, 2);
    assert!(inner.default_collapsed);
}

#[test]
fn test_depth_limit() {
    let options = RenderOptions {
        max_depth: 1,
        ..RenderOptions::default()
    };
    let nodes = steps_with("if (a) { if (b) { c(); } }", &options);

    let then_section = &nodes[0].children[0];
    assert_eq!(then_section.children.len(), 1);
    let error = &then_section.children[0];
    assert_eq!(error.kind, NodeKind::Error);
    assert_eq!(error.title, "Nesting too deep");
    assert_eq!(
        error.message.as_deref(),
        Some("Statements nested deeper than 1 levels are not shown")
    );
}

#[test]
fn test_important_only_filter() {
    let options = RenderOptions {
        important_only: true,
        ..RenderOptions::default()
    };
    let nodes = steps_with(
        "const total = 1 + 2;\nawait page.goto(url);\nlog(total);",
        &options,
    );

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind, NodeKind::Call);
    assert_eq!(nodes[0].title, "important operation");
    assert_eq!(nodes[0].color, Color::Orange);
    assert_eq!(nodes[0].summary.as_deref(), Some("page.goto(…) args=1"));
}

#[test]
fn test_unknown_statements() {
    let nodes = steps("throw new Error('x');\nswitch (m) { case 1: a(); }");

    assert_eq!(titles(&nodes), vec!["Unknown: throw", "Unknown: switch"]);
    assert_eq!(nodes[0].kind, NodeKind::Unknown);
    assert_eq!(nodes[0].color, Color::Pink);
    assert_eq!(nodes[0].summary.as_deref(), Some("throw new Error('x');"));
}

#[test]
fn test_expression_statement() {
    let nodes = steps("x = 1;\nawait delay;");
    assert_eq!(nodes[0].kind, NodeKind::Expression);
    assert_eq!(nodes[0].title, "execute");
    assert_eq!(nodes[0].summary.as_deref(), Some("x = 1"));
    assert_eq!(nodes[1].summary.as_deref(), Some("await delay"));
}

#[test]
fn test_condition_outline() {
    let nodes = steps(
        "if (ok) { await page.goto(u); await page.click('#a'); const v = 1; return v; }",
    );
    assert_eq!(
        nodes[0].detail.as_deref(),
        Some("go to page → click element → prepare variable v → +1 more")
    );

    let nodes = steps("if (ok) { a(); } else { }");
    assert_eq!(
        nodes[0].detail.as_deref(),
        Some("then: a | else: (no processing)")
    );
}

#[test]
fn test_summary_truncation() {
    let options = RenderOptions {
        summary_max_len: 10,
        ..RenderOptions::default()
    };
    let nodes = steps_with("const message = 'a fairly long string';", &options);
    let summary = nodes[0].summary.as_deref().unwrap_or("");
    assert_eq!(summary.chars().count(), 10);
    assert!(summary.ends_with('…'));
}

#[test]
fn test_spans_point_at_statements() {
    let nodes = steps("a();\nb();");
    let span = nodes[1].span.expect("Should carry a span");
    assert_eq!(span.start_line, 2);
}

#[test]
fn test_custom_localizer() {
    let workflow = parse_workflow("function workflow() { const a = 1; if (a) {} }")
        .expect("Should parse");
    let keys = |key: &str, _args: &[(&str, &str)]| key.to_string();
    let nodes = render_steps(&workflow.body, 0, &RenderOptions::default(), &keys);

    assert_eq!(nodes[0].title, "steps.variable");
    assert_eq!(nodes[1].title, "steps.condition");
    assert_eq!(nodes[1].children[0].title, "steps.then");
}

#[test]
fn test_serializes_with_kebab_case_tags() {
    let nodes = steps("try { a(); } catch (e) {}");
    let value = serde_json::to_value(&nodes[0]).expect("Should serialize");
    assert_eq!(value["kind"], "error-handling");
    assert_eq!(value["color"], "red");
    assert_eq!(value["children"][0]["kind"], "block");
}
