//! Natural-language descriptions of statements.
//!
//! Descriptions are built as [`Message`] templates and localized at the
//! end. Each fragment is computed on its own: when rendering one fails it
//! becomes an empty string and the surrounding text still renders.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::keywords::first_string_literal;
use crate::codegen::{
    try_render_code, try_render_with_operator_words, CodeGenError, CodeStyle, MAX_RENDER_DEPTH,
};
use crate::i18n::{Localizer, Message};
use crate::parser::ast::{BinaryOp, Expr, ForLoopKind, Pattern, Stmt};

const THEN_MARK: &str = "  ✓ ";
const LOOP_MARK: &str = "  ↻ ";
const TRY_MARK: &str = "  ▸ ";
const CATCH_MARK: &str = "  ⚠ ";
const ELSE_IF_INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainOptions {
    /// Longest code echoed in an "execute `…`" line
    pub inline_code_max_len: usize,
    pub return_value_max_len: usize,
}

impl Default for ExplainOptions {
    fn default() -> Self {
        Self {
            inline_code_max_len: 60,
            return_value_max_len: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplainError {
    #[error("cannot describe statement: {0}")]
    Render(#[from] CodeGenError),
    #[error("statements nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

pub struct Explainer<'a> {
    options: &'a ExplainOptions,
    localizer: &'a dyn Localizer,
}

impl<'a> Explainer<'a> {
    pub fn new(options: &'a ExplainOptions, localizer: &'a dyn Localizer) -> Self {
        Self { options, localizer }
    }

    fn t(&self, message: Message) -> String {
        message.localize(self.localizer)
    }

    /// Unwrap a fragment, logging and blanking failures
    fn fragment(&self, result: Result<String, ExplainError>) -> String {
        match result {
            Ok(text) => text,
            Err(err) => {
                debug!(error = %err, "description fragment dropped");
                String::new()
            }
        }
    }

    /* ===================== One-line descriptions ===================== */

    /// One sentence for a statement, empty when it cannot be produced
    pub fn describe(&self, stmt: &Stmt) -> String {
        let text = self.describe_message(stmt).map(|message| self.t(message));
        self.fragment(text)
    }

    pub fn describe_message(&self, stmt: &Stmt) -> Result<Message, ExplainError> {
        let code = try_render_code(stmt, CodeStyle::COMPACT)?;
        let message = match stmt {
            Stmt::VarDecl { declarations, .. } => {
                match declarations.first().map(|declarator| &declarator.target) {
                    Some(Pattern::Ident { name, .. }) => declaration(name, &code),
                    _ => Message::new("explain.execute"),
                }
            }
            Stmt::Expr { .. } => self.expression(&code),
            Stmt::Return { .. } => {
                match return_value(&code, self.options.return_value_max_len) {
                    Some(value) => Message::new("explain.return_value").arg("value", value),
                    None => Message::new("explain.return_plain"),
                }
            }
            Stmt::If { .. } => Message::new("explain.check_condition"),
            loop_stmt if loop_stmt.is_loop() => Message::new("explain.loop"),
            Stmt::Try { .. } => Message::new("explain.error_handling"),
            _ => Message::new("explain.execute"),
        };
        Ok(message)
    }

    fn expression(&self, code: &str) -> Message {
        if code.contains("goto") {
            return match first_string_literal(code) {
                Some(url) => Message::new("explain.navigate_to").arg("url", url),
                None => Message::new("explain.navigate_given"),
            };
        }
        if code.contains("click") {
            return Message::new("explain.click");
        }
        if code.contains("type") || code.contains("fill") {
            return Message::new("explain.fill");
        }
        if code.contains("console.log") {
            return match console_args(code) {
                Some(args) => Message::new("explain.log").arg("args", args),
                None => Message::new("explain.log_plain"),
            };
        }
        if code.contains(".push(") {
            return match push_parts(code) {
                Some((array, value)) => Message::new("explain.append")
                    .arg("array", array)
                    .arg("value", value),
                None => Message::new("explain.append_plain"),
            };
        }

        let simplified = code.strip_suffix(';').unwrap_or(code);
        if simplified.chars().count() < self.options.inline_code_max_len {
            Message::new("explain.execute_code").arg("code", simplified)
        } else {
            Message::new("explain.execute")
        }
    }

    /// Condition in backticks with comparison and logical operators
    /// spelled out
    pub fn condition(&self, test: Option<&Expr>) -> Result<String, ExplainError> {
        let Some(test) = test else {
            return Ok("``".to_string());
        };
        let words = |op: BinaryOp| operator_key(op).map(|key| self.localizer.t(key, &[]));
        let text = try_render_with_operator_words(test, &words)?;
        Ok(format!("`{}`", text.trim()))
    }

    /* ===================== Detail lines ===================== */

    /// Outline of a statement; compound statements expand into indented
    /// lines for their bodies
    pub fn details(&self, stmt: &Stmt) -> Vec<String> {
        let mut lines = Vec::new();
        self.push_details(stmt, 0, &mut lines);
        lines
    }

    fn push_details(&self, stmt: &Stmt, depth: usize, out: &mut Vec<String>) {
        if depth > MAX_RENDER_DEPTH {
            let err = ExplainError::TooDeep {
                limit: MAX_RENDER_DEPTH,
            };
            debug!(error = %err, "description fragment dropped");
            return;
        }

        match stmt {
            Stmt::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                let condition = self.fragment(self.condition(test.as_ref()));
                out.push(self.t(Message::new("explain.if_then").arg("condition", condition)));
                self.block_lines(body_of(consequent), THEN_MARK, depth, out);
                match alternate.as_deref() {
                    Some(nested @ Stmt::If { .. }) => {
                        out.push(self.t(Message::new("explain.else_if")));
                        let mut lines = Vec::new();
                        self.push_details(nested, depth + 1, &mut lines);
                        out.extend(lines.into_iter().map(|line| format!("{ELSE_IF_INDENT}{line}")));
                    }
                    Some(alternate) => {
                        out.push(self.t(Message::new("explain.else")));
                        self.block_lines(body_of(alternate), THEN_MARK, depth, out);
                    }
                    None => {}
                }
            }

            Stmt::For { init, body, .. } => {
                let key = if init.is_some() {
                    "explain.repeat_fixed"
                } else {
                    "explain.repeat"
                };
                out.push(self.t(Message::new(key)));
                self.block_lines(body_of(body), LOOP_MARK, depth, out);
            }

            Stmt::While { test, body, .. } | Stmt::DoWhile { test, body, .. } => {
                let head = match test {
                    Some(test) => {
                        let condition = self.fragment(self.condition(Some(test)));
                        Message::new("explain.repeat_while").arg("condition", condition)
                    }
                    None => Message::new("explain.repeat"),
                };
                out.push(self.t(head));
                self.block_lines(body_of(body), LOOP_MARK, depth, out);
            }

            Stmt::ForEach { kind, body, .. } => {
                let key = match kind {
                    ForLoopKind::Of => "explain.repeat_each",
                    ForLoopKind::In => "explain.repeat_each_property",
                };
                out.push(self.t(Message::new(key)));
                self.block_lines(body_of(body), LOOP_MARK, depth, out);
            }

            Stmt::Try {
                block,
                handler,
                finalizer,
                ..
            } => {
                out.push(self.t(Message::new("explain.try")));
                self.block_lines(block, TRY_MARK, depth, out);
                if let Some(handler) = handler {
                    let name = match &handler.param {
                        Some(Pattern::Ident { name, .. }) => name.clone(),
                        _ => self.t(Message::new("explain.catch_default_name")),
                    };
                    out.push(self.t(Message::new("explain.catch").arg("name", name)));
                    self.block_lines(&handler.body, CATCH_MARK, depth, out);
                }
                if let Some(finalizer) = finalizer {
                    out.push(self.t(Message::new("explain.finally")));
                    self.block_lines(finalizer, THEN_MARK, depth, out);
                }
            }

            _ => {
                let text = self.describe(stmt);
                if !text.is_empty() {
                    out.push(text);
                }
            }
        }
    }

    /// Body lines under a marker; continuation lines of nested compound
    /// statements line up with the marker's text
    fn block_lines(&self, body: &[Stmt], marker: &str, depth: usize, out: &mut Vec<String>) {
        let pad = " ".repeat(marker.chars().count());
        for stmt in body {
            let mut lines = Vec::new();
            self.push_details(stmt, depth + 1, &mut lines);
            for (idx, line) in lines.into_iter().enumerate() {
                if idx == 0 {
                    out.push(format!("{marker}{line}"));
                } else {
                    out.push(format!("{pad}{line}"));
                }
            }
        }
    }
}

/* ===================== Helpers ===================== */

fn declaration(name: &str, code: &str) -> Message {
    if code.contains("newPage") {
        Message::new("explain.create_page").arg("name", name)
    } else if code.contains("title") {
        Message::new("explain.store_title").arg("name", name)
    } else if code.contains("textContent") || code.contains("innerHTML") {
        Message::new("explain.store_text").arg("name", name)
    } else if let Some(value) = init_value(code) {
        Message::new("explain.assign")
            .arg("name", name)
            .arg("value", value)
    } else {
        Message::new("explain.prepare").arg("name", name)
    }
}

fn operator_key(op: BinaryOp) -> Option<&'static str> {
    match op {
        BinaryOp::StrictEq | BinaryOp::Eq => Some("operators.equals"),
        BinaryOp::StrictNe | BinaryOp::Ne => Some("operators.differs"),
        BinaryOp::Gte => Some("operators.at_least"),
        BinaryOp::Lte => Some("operators.at_most"),
        BinaryOp::Gt => Some("operators.greater_than"),
        BinaryOp::Lt => Some("operators.less_than"),
        BinaryOp::And => Some("operators.and"),
        BinaryOp::Or => Some("operators.or"),
        _ => None,
    }
}

fn body_of(stmt: &Stmt) -> &[Stmt] {
    match stmt {
        Stmt::Block { body, .. } => body,
        other => std::slice::from_ref(other),
    }
}

/// Text after the first `=` up to the next `;`
pub(crate) fn init_value(code: &str) -> Option<&str> {
    let (_, rest) = code.split_once('=')?;
    let value = match rest.find(';') {
        Some(end) => &rest[..end],
        None => rest,
    };
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Arguments of the first `console.log(` up to the last `)`
fn console_args(code: &str) -> Option<&str> {
    const CALL: &str = "console.log(";
    let start = code.find(CALL)? + CALL.len();
    let rest = &code[start..];
    let end = rest.rfind(')')?;
    Some(&rest[..end])
}

/// `(array, value)` from the first `name.push(value)`
fn push_parts(code: &str) -> Option<(&str, &str)> {
    const CALL: &str = ".push(";
    for (idx, _) in code.match_indices(CALL) {
        let before = &code[..idx];
        let word_start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
            .last()
            .map(|(start, _)| start);
        let Some(start) = word_start else {
            continue;
        };
        let rest = &code[idx + CALL.len()..];
        let end = rest.rfind(')')?;
        return Some((&before[start..], &rest[..end]));
    }
    None
}

/// Returned expression with whitespace collapsed, cut to `max` chars
/// with `...`
fn return_value(code: &str, max: usize) -> Option<String> {
    let value = code.strip_prefix("return")?.trim().trim_end_matches(';');
    let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if value.is_empty() {
        return None;
    }
    if value.chars().count() > max {
        let kept: String = value.chars().take(max.saturating_sub(3)).collect();
        return Some(format!("{kept}..."));
    }
    Some(value)
}
