//! Steps view: one display node per statement.
//!
//! Every statement form maps to a [`NodeKind`]; anything without a
//! dedicated rendering falls back to [`NodeKind::Unknown`]. A statement
//! that lacks a structurally required child renders as a single
//! [`NodeKind::Error`] node and its siblings are unaffected.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::codegen::render_compact;
use crate::codegen::render_loop_head;
use crate::codegen::text::one_line;
use crate::i18n::{Localizer, Message};
use crate::parser::ast::{Expr, Pattern, Span, Stmt};

#[cfg(test)]
mod tests;

/// Callee substrings that mark a call as an important operation
pub const IMPORTANT_KEYWORDS: &[&str] = &[
    "page", "navigate", "goto", "access", "plugin", "click", "type", "select", "submit", "wait",
];

/// Statements listed in a condition or loop outline
const OUTLINE_LIMIT: usize = 3;

const BRIEF_MAX_LEN: usize = 40;

/* ===================== Types ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Variable,
    Return,
    Expression,
    Call,
    Condition,
    Loop,
    ErrorHandling,
    Block,
    Unknown,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Color {
    Purple,
    Green,
    Teal,
    Orange,
    Cyan,
    Amber,
    Blue,
    Red,
    Pink,
    Gray,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Purple => "purple",
            Color::Green => "green",
            Color::Teal => "teal",
            Color::Orange => "orange",
            Color::Cyan => "cyan",
            Color::Amber => "amber",
            Color::Blue => "blue",
            Color::Red => "red",
            Color::Pink => "pink",
            Color::Gray => "gray",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticNode {
    pub kind: NodeKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Outline of the body for conditions and loops
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Why an error node is invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SemanticNode>,
    pub depth: usize,
    pub collapsible: bool,
    pub default_collapsed: bool,
    pub color: Color,
    pub important: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl SemanticNode {
    fn new(kind: NodeKind, title: String, depth: usize, color: Color) -> Self {
        Self {
            kind,
            title,
            summary: None,
            detail: None,
            message: None,
            children: Vec::new(),
            depth,
            collapsible: false,
            default_collapsed: false,
            color,
            important: false,
            span: None,
        }
    }

    fn with_summary(mut self, summary: String) -> Self {
        self.summary = Some(summary);
        self
    }

    fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Collapsible container; nested containers start collapsed
    fn container(mut self, children: Vec<SemanticNode>) -> Self {
        self.collapsible = true;
        self.default_collapsed = self.depth > 0;
        self.children = children;
        self
    }

    /// Follow an index path from a root list
    pub fn at<'a>(roots: &'a [SemanticNode], path: &[usize]) -> Option<&'a SemanticNode> {
        let (first, rest) = path.split_first()?;
        let mut node = roots.get(*first)?;
        for idx in rest {
            node = node.children.get(*idx)?;
        }
        Some(node)
    }

    /// Depth-first walk over this node and its descendants
    pub fn walk(&self, visit: &mut dyn FnMut(&SemanticNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub summary_max_len: usize,
    pub callee_max_len: usize,
    pub catch_label_max_len: usize,
    pub max_depth: usize,
    /// Drop statements whose code mentions no important keyword
    pub important_only: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            summary_max_len: 80,
            callee_max_len: 40,
            catch_label_max_len: 24,
            max_depth: 64,
            important_only: false,
        }
    }
}

/// Why a statement rendered as an error node
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeRenderError {
    #[error("variable declaration has no declarators")]
    NoDeclarations,
    #[error("if statement has no condition")]
    MissingCondition,
    #[error("loop has no condition")]
    MissingLoopCondition,
    #[error("try statement has neither catch nor finally")]
    MissingHandler,
    #[error("statements nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

impl NodeRenderError {
    fn title(&self) -> Message {
        match self {
            NodeRenderError::NoDeclarations => Message::new("steps.variable_invalid"),
            NodeRenderError::MissingCondition => Message::new("steps.condition_invalid"),
            NodeRenderError::MissingLoopCondition => Message::new("steps.loop_invalid"),
            NodeRenderError::MissingHandler => Message::new("steps.try_invalid"),
            NodeRenderError::TooDeep { .. } => Message::new("steps.too_deep"),
        }
    }

    fn message(&self) -> Message {
        match self {
            NodeRenderError::NoDeclarations => Message::new("steps.no_declarations"),
            NodeRenderError::MissingCondition => Message::new("steps.missing_test"),
            NodeRenderError::MissingLoopCondition => Message::new("steps.missing_loop_test"),
            NodeRenderError::MissingHandler => Message::new("steps.missing_handler"),
            NodeRenderError::TooDeep { limit } => {
                Message::new("steps.too_deep_message").arg("limit", limit.to_string())
            }
        }
    }
}

/* ===================== Public API ===================== */

/// Render a statement sequence as Steps nodes starting at `depth`
pub fn render_steps(
    statements: &[Stmt],
    depth: usize,
    options: &RenderOptions,
    localizer: &dyn Localizer,
) -> Vec<SemanticNode> {
    let renderer = Renderer { options, localizer };
    let mut nodes = Vec::new();
    renderer.sequence(statements, depth, &mut nodes);
    debug!(statements = statements.len(), nodes = nodes.len(), "rendered steps");
    nodes
}

/// Whether the statement's code mentions an important keyword
pub fn has_important(stmt: &Stmt) -> bool {
    is_important(&render_compact(stmt).to_lowercase())
}

fn is_important(lowercase_code: &str) -> bool {
    IMPORTANT_KEYWORDS
        .iter()
        .any(|keyword| lowercase_code.contains(keyword))
}

/* ===================== Renderer ===================== */

struct Renderer<'a> {
    options: &'a RenderOptions,
    localizer: &'a dyn Localizer,
}

impl Renderer<'_> {
    fn t(&self, message: Message) -> String {
        message.localize(self.localizer)
    }

    fn sequence(&self, statements: &[Stmt], depth: usize, out: &mut Vec<SemanticNode>) {
        if depth > self.options.max_depth {
            if let (Some(first), Some(last)) = (statements.first(), statements.last()) {
                let err = NodeRenderError::TooDeep {
                    limit: self.options.max_depth,
                };
                out.push(self.error_node(&err, first.span().merge(&last.span()), depth));
            }
            return;
        }

        for stmt in statements {
            if self.options.important_only && !has_important(stmt) {
                continue;
            }
            match stmt {
                Stmt::Block { body, .. } => self.sequence(body, depth + 1, out),
                _ => match self.node(stmt, depth) {
                    Ok(node) => out.push(node),
                    Err(err) => {
                        debug!(error = %err, kind = stmt.kind_name(), "invalid statement");
                        out.push(self.error_node(&err, stmt.span(), depth));
                    }
                },
            }
        }
    }

    fn error_node(&self, err: &NodeRenderError, span: Span, depth: usize) -> SemanticNode {
        let mut node = SemanticNode::new(NodeKind::Error, self.t(err.title()), depth, Color::Red)
            .with_span(span);
        node.message = Some(self.t(err.message()));
        node
    }

    fn summary(&self, code: &str) -> String {
        one_line(code, self.options.summary_max_len)
    }

    fn node(&self, stmt: &Stmt, depth: usize) -> Result<SemanticNode, NodeRenderError> {
        let span = stmt.span();
        let node = match stmt {
            Stmt::VarDecl { declarations, .. } => {
                if declarations.is_empty() {
                    return Err(NodeRenderError::NoDeclarations);
                }
                SemanticNode::new(
                    NodeKind::Variable,
                    self.t(Message::new("steps.variable")),
                    depth,
                    Color::Purple,
                )
                .with_summary(self.summary(statement_code(stmt).as_str()))
            }

            Stmt::Return { .. } => SemanticNode::new(
                NodeKind::Return,
                self.t(Message::new("steps.return")),
                depth,
                Color::Green,
            )
            .with_summary(self.summary(statement_code(stmt).as_str())),

            Stmt::Expr { expr, .. } => match expr.unwrap_await() {
                Expr::Call { callee, args, .. } => {
                    let callee = one_line(&render_compact(&**callee), self.options.callee_max_len);
                    let important = is_important(&callee.to_lowercase());
                    let (title, color) = if important {
                        ("steps.important_call", Color::Orange)
                    } else {
                        ("steps.call", Color::Teal)
                    };
                    let mut node =
                        SemanticNode::new(NodeKind::Call, self.t(Message::new(title)), depth, color)
                            .with_summary(self.summary(&format!("{}(…) args={}", callee, args.len())));
                    node.important = important;
                    node
                }
                _ => SemanticNode::new(
                    NodeKind::Expression,
                    self.t(Message::new("steps.expression")),
                    depth,
                    Color::Cyan,
                )
                .with_summary(self.summary(&render_compact(expr))),
            },

            Stmt::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                let Some(test) = test else {
                    return Err(NodeRenderError::MissingCondition);
                };
                let then_body = body_of(consequent);
                let mut sections = vec![self.section(Message::new("steps.then"), then_body, depth)];
                let mut detail = self.outline(then_body);
                if let Some(alternate) = alternate {
                    let else_body = body_of(alternate);
                    sections.push(self.section(Message::new("steps.else"), else_body, depth));
                    detail = self.t(
                        Message::new("steps.then_else")
                            .arg("then", detail)
                            .arg("else", self.outline(else_body)),
                    );
                }
                let mut node = SemanticNode::new(
                    NodeKind::Condition,
                    self.t(Message::new("steps.condition")),
                    depth,
                    Color::Amber,
                )
                .with_summary(self.summary(&format!("if ({})", render_compact(test))))
                .container(sections);
                node.detail = Some(detail);
                node
            }

            Stmt::For { body, .. } | Stmt::ForEach { body, .. } => self.loop_node(stmt, body, depth),
            Stmt::While { test, body, .. } | Stmt::DoWhile { test, body, .. } => {
                if test.is_none() {
                    return Err(NodeRenderError::MissingLoopCondition);
                }
                self.loop_node(stmt, body, depth)
            }

            Stmt::Try {
                block,
                handler,
                finalizer,
                ..
            } => {
                if handler.is_none() && finalizer.is_none() {
                    return Err(NodeRenderError::MissingHandler);
                }
                let mut sections = vec![self.section(Message::new("steps.try"), block, depth)];
                let mut summary = String::from("try");
                if let Some(handler) = handler {
                    let label = match &handler.param {
                        Some(param) => Message::new("steps.catch_binding").arg(
                            "binding",
                            one_line(&render_compact(param), self.options.catch_label_max_len),
                        ),
                        None => Message::new("steps.catch"),
                    };
                    sections.push(self.section(label, &handler.body, depth));
                    summary.push_str(" … catch");
                }
                if let Some(finalizer) = finalizer {
                    sections.push(self.section(Message::new("steps.finally"), finalizer, depth));
                    summary.push_str(" … finally");
                }
                SemanticNode::new(
                    NodeKind::ErrorHandling,
                    self.t(Message::new("steps.error_handling")),
                    depth,
                    Color::Red,
                )
                .with_summary(summary)
                .container(sections)
            }

            _ => SemanticNode::new(
                NodeKind::Unknown,
                self.t(Message::new("steps.unknown").arg("kind", stmt.kind_name())),
                depth,
                Color::Pink,
            )
            .with_summary(self.summary(&render_compact(stmt))),
        };
        Ok(node.with_span(span))
    }

    fn loop_node(&self, stmt: &Stmt, body: &Stmt, depth: usize) -> SemanticNode {
        let body = body_of(body);
        let section = self.section(Message::new("steps.loop_body"), body, depth);
        let mut node = SemanticNode::new(
            NodeKind::Loop,
            self.t(Message::new("steps.loop")),
            depth,
            Color::Blue,
        )
        .with_summary(self.summary(&render_loop_head(stmt)))
        .container(vec![section]);
        node.detail = Some(self.outline(body));
        node
    }

    /// Labelled group of child statements one level below `depth`
    fn section(&self, label: Message, body: &[Stmt], depth: usize) -> SemanticNode {
        let mut children = Vec::new();
        self.sequence(body, depth + 2, &mut children);
        let mut node = SemanticNode::new(NodeKind::Block, self.t(label), depth + 1, Color::Gray);
        node.children = children;
        node
    }

    /// First few statements described briefly, then `+N more`
    fn outline(&self, body: &[Stmt]) -> String {
        if body.is_empty() {
            return self.t(Message::new("steps.no_processing"));
        }
        let mut parts: Vec<String> = body
            .iter()
            .take(OUTLINE_LIMIT)
            .map(|stmt| self.brief(stmt))
            .collect();
        if body.len() > OUTLINE_LIMIT {
            parts.push(self.t(
                Message::new("steps.more").arg("count", (body.len() - OUTLINE_LIMIT).to_string()),
            ));
        }
        parts.join(" → ")
    }

    fn brief(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expr { expr, .. } => match expr.unwrap_await() {
                Expr::Call { callee, .. } => {
                    let callee = render_compact(&**callee);
                    let key = if callee.contains("goto") || callee.contains("navigate") {
                        Some("steps.brief_navigate")
                    } else if callee.contains("click") {
                        Some("steps.brief_click")
                    } else if callee.contains("type") || callee.contains("fill") {
                        Some("steps.brief_type")
                    } else if callee.contains("textContent") || callee.contains("innerHTML") {
                        Some("steps.brief_read")
                    } else {
                        None
                    };
                    match key {
                        Some(key) => self.t(Message::new(key)),
                        None => one_line(&callee, BRIEF_MAX_LEN),
                    }
                }
                _ => one_line(&render_compact(expr), BRIEF_MAX_LEN),
            },
            Stmt::VarDecl { declarations, .. } => {
                let name = match declarations.first().map(|decl| &decl.target) {
                    Some(Pattern::Ident { name, .. }) => name.clone(),
                    _ => String::new(),
                };
                self.t(Message::new("steps.brief_variable").arg("name", name))
                    .trim_end()
                    .to_string()
            }
            Stmt::Return { .. } => self.t(Message::new("steps.brief_return")),
            _ => one_line(&render_compact(stmt), BRIEF_MAX_LEN),
        }
    }
}

/// Statements of a branch or loop body; a single statement stands alone
fn body_of(stmt: &Stmt) -> &[Stmt] {
    match stmt {
        Stmt::Block { body, .. } => body,
        other => std::slice::from_ref(other),
    }
}

/// Compact code without the trailing semicolon
fn statement_code(stmt: &Stmt) -> String {
    let code = render_compact(stmt);
    code.strip_suffix(';').unwrap_or(&code).to_string()
}
