//! PEST-based parser for workflow scripts
//!
//! Produces the AST in [`ast`] with span information for diagnostics, and
//! records the byte ranges of every piece of type-only syntax so the
//! [`strip`] pass can remove them from the original text.

use std::thread;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod ast;
pub mod strip;

#[cfg(test)]
mod tests;

use ast::{
    ArrowBody, BinaryOp, CatchClause, Declarator, Edit, Expr, ForHead, ForInit, ForLoopKind,
    Function, ObjectProp, Pattern, PatternProp, PropKey, Span, Stmt, SwitchCase, UnaryOp,
    UpdateOp, VarKind,
};

/// Name of the entry-point function whose body is analysed
pub const ENTRY_POINT: &str = "workflow";

/// Deepest nesting accepted before parsing starts, counted by
/// `check_nesting`
pub const MAX_SOURCE_NESTING: usize = 128;

/// The grammar recurses through dozens of frames per nesting level
const PARSER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Keywords whose body may nest without a bracket
const CHAIN_WORDS: &[&str] = &["if", "else", "for", "while", "do"];

/// Keywords that continue the statement before them
const CONTINUATION_WORDS: &[&str] = &["else", "catch", "finally", "while"];

/* ===================== Workflow Definition ===================== */

/// A parsed source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub items: Vec<Stmt>,
    /// Removals and rewrites that turn the source into plain script
    #[serde(skip)]
    pub type_edits: Vec<Edit>,
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

/// The `workflow()` entry point of a script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDef {
    /// Top-level statements of the entry-point body
    pub body: Vec<Stmt>,
    pub is_async: bool,
    /// Span of the whole function declaration
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

fn is_default_span(span: &Span) -> bool {
    *span == Span::default()
}

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "parser/script.pest"]
struct ScriptParser;

/* ===================== Error Types ===================== */

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(String, Option<Span>),
    #[error("{0}")]
    Build(String, Option<Span>),
    #[error("workflow() function not found.")]
    MissingEntryPoint,
    #[error("nesting deeper than {limit} levels")]
    TooDeep { limit: usize, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Syntax(_, span) => *span,
            ParseError::Build(_, span) => *span,
            ParseError::MissingEntryPoint => None,
            ParseError::TooDeep { span, .. } => Some(*span),
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => Some(Span {
                start: 0,
                end: 0,
                start_line: line.saturating_sub(1),
                start_col: col.saturating_sub(1),
                end_line: line.saturating_sub(1),
                end_col: col,
            }),
            pest::error::LineColLocation::Span((start_line, start_col), (end_line, end_col)) => {
                Some(Span {
                    start: 0,
                    end: 0,
                    start_line: start_line.saturating_sub(1),
                    start_col: start_col.saturating_sub(1),
                    end_line: end_line.saturating_sub(1),
                    end_col: end_col.saturating_sub(1),
                })
            }
        };
        let (start, end) = match err.location {
            pest::error::InputLocation::Pos(pos) => (pos, pos),
            pest::error::InputLocation::Span((start, end)) => (start, end),
        };
        let span = span.map(|s| Span { start, end, ..s });
        let err = err.renamed_rules(rule_label);
        ParseError::Syntax(err.to_string(), span)
    }
}

/// Human-facing names for the rules that show up in "expected ..." lists
fn rule_label(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input".to_string(),
        Rule::identifier | Rule::identifier_name => "identifier".to_string(),
        Rule::statement => "statement".to_string(),
        Rule::expression | Rule::assign_expr => "expression".to_string(),
        Rule::block => "block".to_string(),
        Rule::ts_type => "type".to_string(),
        Rule::string => "string".to_string(),
        Rule::number => "number".to_string(),
        Rule::assign_op => "`=`".to_string(),
        other => format!("{:?}", other),
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/* ===================== Span Helpers ===================== */

/// Per-parse state: line table for spans and collected type edits
struct BuildContext<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
    edits: Vec<Edit>,
}

impl<'s> BuildContext<'s> {
    fn new(source: &'s str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .char_indices()
                .filter(|(_, ch)| *ch == '\n')
                .map(|(idx, _)| idx + 1),
        );
        Self {
            source,
            line_starts,
            edits: Vec::new(),
        }
    }

    /// Convert a PEST pair's span to our Span type
    fn span(&self, pair: &Pair<Rule>) -> Span {
        let pest_span = pair.as_span();
        self.span_of(pest_span.start(), pest_span.end())
    }

    fn span_of(&self, start: usize, end: usize) -> Span {
        let (start_line, start_col) = self.line_col(start);
        let (end_line, end_col) = self.line_col(end);
        Span::new(start, end, start_line, start_col, end_line, end_col)
    }

    /// Convert byte offset to (line, column) - 0-indexed, columns in chars
    fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        let col = self
            .source
            .get(line_start..offset)
            .map(|text| text.chars().count())
            .unwrap_or(0);
        (line, col)
    }

    /// Drop a pair's text from the stripped output
    fn strip(&mut self, pair: &Pair<Rule>) {
        self.edits
            .push(Edit::remove(pair.as_span().start(), content_end(pair)));
    }

    fn strip_line(&mut self, span: Span) {
        let end = span.start + trim_trivia(self.source.get(span.start..span.end).unwrap_or("")).len();
        self.edits.push(Edit::remove_line(span.start, end));
    }
}

/// A pair's text without the whitespace and comments skipped after its last
/// token. Pest folds those into any rule that ends in an optional or repeated
/// part; removing them would join lines that rely on automatic semicolons.
fn pair_text<'i>(pair: &Pair<'i, Rule>) -> &'i str {
    trim_trivia(pair.as_span().as_str())
}

fn content_end(pair: &Pair<Rule>) -> usize {
    pair.as_span().start() + pair_text(pair).len()
}

fn trim_trivia(text: &str) -> &str {
    let mut text = text;
    loop {
        text = text.trim_end();
        if text.ends_with("*/") {
            match text.rfind("/*") {
                Some(open) => {
                    text = &text[..open];
                    continue;
                }
                None => return text,
            }
        }
        let line_start = text.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        match line_comment_start(&text[line_start..]) {
            Some(idx) => text = &text[..line_start + idx],
            None => return text,
        }
    }
}

/// Byte offset of a `//` comment in a single line, ignoring quoted text
fn line_comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut quote = None;
    let mut i = 0;
    while i < bytes.len() {
        match (quote, bytes[i]) {
            (Some(_), b'\\') => i += 1,
            (Some(open), byte) if byte == open => quote = None,
            (Some(_), _) => {}
            (None, byte @ (b'"' | b'\'' | b'`')) => quote = Some(byte),
            (None, b'/') if bytes.get(i + 1) == Some(&b'/') => return Some(i),
            (None, _) => {}
        }
        i += 1;
    }
    None
}

/* ===================== Public API ===================== */

/// Parse a whole source file
///
/// Parsing runs on a scoped thread with its own stack so that nesting up to
/// [`MAX_SOURCE_NESTING`] cannot exhaust the caller's stack.
pub fn parse_module(source: &str) -> ParseResult<Module> {
    check_nesting(source)?;

    thread::scope(|scope| {
        thread::Builder::new()
            .name("scriptlens-parser".to_string())
            .stack_size(PARSER_STACK_SIZE)
            .spawn_scoped(scope, || build_module(source))
            .map_err(|err| ParseError::Build(format!("Failed to start parser: {}", err), None))?
            .join()
            .map_err(|_| ParseError::Build("Parser thread panicked".to_string(), None))?
    })
}

fn build_module(source: &str) -> ParseResult<Module> {
    let mut pairs = ScriptParser::parse(Rule::program, source)?;
    let mut cx = BuildContext::new(source);

    let program = pairs
        .next()
        .ok_or_else(|| ParseError::Build("Empty parse result".to_string(), None))?;
    let span = cx.span(&program);

    let mut items = Vec::new();
    for pair in program.into_inner() {
        match pair.as_rule() {
            Rule::EOI => {}
            Rule::import_decl => items.push(build_import(pair, &mut cx)?),
            Rule::export_decl => items.push(build_export(pair, &mut cx)?),
            _ => items.push(build_statement(pair, &mut cx)?),
        }
    }

    debug!(
        items = items.len(),
        type_edits = cx.edits.len(),
        "parsed module"
    );

    Ok(Module {
        items,
        type_edits: cx.edits,
        span,
    })
}

/// Parse a script and return its `workflow()` entry point.
///
/// Only a plain top-level declaration with no parameters qualifies; an
/// exported or parameterised `workflow` is treated as missing.
pub fn parse_workflow(source: &str) -> ParseResult<WorkflowDef> {
    let module = parse_module(source)?;

    let func = module
        .items
        .into_iter()
        .find_map(|item| match item {
            Stmt::Function { func, .. }
                if func.name.as_deref() == Some(ENTRY_POINT) && func.params.is_empty() =>
            {
                Some(func)
            }
            _ => None,
        })
        .ok_or(ParseError::MissingEntryPoint)?;

    debug!(statements = func.body.len(), "found workflow entry point");

    Ok(WorkflowDef {
        body: func.body,
        is_async: func.is_async,
        span: func.span,
    })
}

/// Where a new statement may begin; the next word decides
#[derive(Clone, Copy, PartialEq, Eq)]
enum Boundary {
    None,
    /// After `;` or a closing `}`
    Statement,
    /// After a line break
    Line,
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

/// Reject nesting the recursive-descent parser cannot survive.
///
/// The weight at any point is the bracket depth plus the bracketless nesting
/// (`if`, `else`, loops, `?`, `=>`) still open at each level. Bracketless
/// nesting ends with the statement: at `;`, after a closing `}` or at a line
/// break, unless the next word continues the chain. String, template and
/// comment contents are skipped.
fn check_nesting(source: &str) -> ParseResult<()> {
    let bytes = source.as_bytes();
    // bracketless nesting saved by each open bracket
    let mut levels: Vec<usize> = Vec::new();
    let mut saved = 0usize;
    let mut chain = 0usize;
    let mut boundary = Boundary::None;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        match byte {
            b'\n' => {
                if boundary == Boundary::None {
                    boundary = Boundary::Line;
                }
                i += 1;
                continue;
            }
            b' ' | b'\t' | b'\r' => {
                i += 1;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
                continue;
            }
            _ => {}
        }

        let start = i;
        if is_word_byte(byte) {
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            let word = source.get(start..i).unwrap_or("");
            let continues = CONTINUATION_WORDS.contains(&word);
            let ends_statement = match boundary {
                Boundary::Statement => !continues,
                Boundary::Line => !continues && !CHAIN_WORDS.contains(&word),
                Boundary::None => false,
            };
            if ends_statement {
                chain = 0;
            }
            if CHAIN_WORDS.contains(&word) {
                chain += 1;
            }
            boundary = Boundary::None;
        } else {
            boundary = Boundary::None;
            i += 1;
            match byte {
                b'(' | b'[' | b'{' => {
                    levels.push(chain);
                    saved += chain;
                    chain = 0;
                }
                b')' | b']' | b'}' => {
                    if let Some(outer) = levels.pop() {
                        saved -= outer;
                        chain = outer;
                    }
                    if byte == b'}' {
                        boundary = Boundary::Statement;
                    }
                }
                b';' => boundary = Boundary::Statement,
                b'?' => match bytes.get(i) {
                    Some(b'?') => i += 1,
                    Some(b'.') if !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => i += 1,
                    _ => chain += 1,
                },
                b'=' if bytes.get(i) == Some(&b'>') => {
                    i += 1;
                    chain += 1;
                }
                quote @ (b'"' | b'\'' | b'`') => {
                    while i < bytes.len() && bytes[i] != quote {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                    i += 1;
                }
                _ => {}
            }
        }

        if levels.len() + saved + chain > MAX_SOURCE_NESTING {
            let cx = BuildContext::new(source);
            return Err(ParseError::TooDeep {
                limit: MAX_SOURCE_NESTING,
                span: cx.span_of(start, i.min(bytes.len())),
            });
        }
    }

    Ok(())
}

/* ===================== AST Builder ===================== */

fn missing(what: &str, span: Span) -> ParseError {
    ParseError::Build(format!("Missing {}", what), Some(span))
}

fn unexpected(context: &str, pair: &Pair<Rule>, cx: &BuildContext) -> ParseError {
    ParseError::Build(
        format!("Unexpected {} rule: {:?}", context, pair.as_rule()),
        Some(cx.span(pair)),
    )
}

fn first_inner<'i>(pair: Pair<'i, Rule>, what: &str, cx: &BuildContext) -> ParseResult<Pair<'i, Rule>> {
    let span = cx.span(&pair);
    pair.into_inner().next().ok_or_else(|| missing(what, span))
}

fn first_identifier(pair: &Pair<Rule>) -> String {
    pair.clone()
        .into_inner()
        .flatten()
        .find(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

fn build_statement(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);

    match pair.as_rule() {
        Rule::statement => {
            let inner = first_inner(pair, "statement", cx)?;
            build_statement(inner, cx)
        }
        Rule::block => Ok(Stmt::Block {
            body: build_block_body(pair, cx)?,
            span,
        }),
        Rule::empty_stmt => Ok(Stmt::Empty { span }),
        Rule::var_stmt => {
            let decl = first_inner(pair, "declaration", cx)?;
            let (kind, declarations) = build_var_decl(decl, cx)?;
            Ok(Stmt::VarDecl {
                kind,
                declarations,
                span,
            })
        }
        Rule::function_decl => Ok(Stmt::Function {
            func: build_function(pair, cx)?,
            span,
        }),
        Rule::function_sig => build_type_only("function", pair, cx),
        Rule::interface_decl => build_type_only("interface", pair, cx),
        Rule::type_alias_decl => build_type_only("type", pair, cx),
        Rule::enum_decl => build_type_only("enum", pair, cx),
        Rule::ambient_decl => build_type_only("declare", pair, cx),
        Rule::if_stmt => build_if_stmt(pair, cx),
        Rule::for_stmt => build_for_stmt(pair, cx),
        Rule::for_in_of_stmt => build_for_each_stmt(pair, cx),
        Rule::while_stmt => build_while_stmt(pair, cx),
        Rule::do_while_stmt => build_do_while_stmt(pair, cx),
        Rule::try_stmt => build_try_stmt(pair, cx),
        Rule::switch_stmt => build_switch_stmt(pair, cx),
        Rule::return_stmt => {
            let value = pair
                .into_inner()
                .find(|p| p.as_rule() == Rule::expression)
                .map(|p| build_expression(p, cx))
                .transpose()?;
            Ok(Stmt::Return { value, span })
        }
        Rule::throw_stmt => {
            let expr = pair
                .into_inner()
                .find(|p| p.as_rule() == Rule::expression)
                .ok_or_else(|| missing("thrown value", span))?;
            Ok(Stmt::Throw {
                value: build_expression(expr, cx)?,
                span,
            })
        }
        Rule::break_stmt => Ok(Stmt::Break { span }),
        Rule::continue_stmt => Ok(Stmt::Continue { span }),
        Rule::expr_stmt => {
            let expr_pair = first_inner(pair, "expression", cx)?;
            let expr = build_expression(expr_pair, cx)?;
            Ok(Stmt::Expr { expr, span })
        }
        _ => Err(unexpected("statement", &pair, cx)),
    }
}

fn build_block_body(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Vec<Stmt>> {
    pair.into_inner()
        .map(|stmt_pair| build_statement(stmt_pair, cx))
        .collect()
}

fn build_type_only(keyword: &str, pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    cx.strip_line(span);
    Ok(Stmt::TypeOnly {
        keyword: keyword.to_string(),
        name: first_identifier(&pair),
        span,
    })
}

fn build_var_kind(pair: &Pair<Rule>, cx: &BuildContext) -> ParseResult<VarKind> {
    match pair.as_str() {
        "const" => Ok(VarKind::Const),
        "let" => Ok(VarKind::Let),
        "var" => Ok(VarKind::Var),
        other => Err(ParseError::Build(
            format!("Expected 'const', 'let' or 'var', got: {}", other),
            Some(cx.span(pair)),
        )),
    }
}

fn build_var_decl(
    pair: Pair<Rule>,
    cx: &mut BuildContext,
) -> ParseResult<(VarKind, Vec<Declarator>)> {
    let span = cx.span(&pair);
    let mut kind = None;
    let mut declarations = Vec::new();

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::var_kind => kind = Some(build_var_kind(&child, cx)?),
            Rule::declarator => declarations.push(build_declarator(child, cx)?),
            _ => return Err(unexpected("declaration", &child, cx)),
        }
    }

    let kind = kind.ok_or_else(|| missing("declaration kind", span))?;
    Ok((kind, declarations))
}

fn build_declarator(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Declarator> {
    let span = cx.span(&pair);
    let mut target = None;
    let mut init = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::identifier | Rule::object_pattern | Rule::array_pattern => {
                target = Some(build_pattern(child, cx)?)
            }
            Rule::definite_mark | Rule::type_annotation => cx.strip(&child),
            Rule::assign_expr => init = Some(build_expression(child, cx)?),
            _ => return Err(unexpected("declarator", &child, cx)),
        }
    }

    Ok(Declarator {
        target: target.ok_or_else(|| missing("binding", span))?,
        init,
        span,
    })
}

fn build_function(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Function> {
    let span = cx.span(&pair);
    let mut name = None;
    let mut is_async = false;
    let mut params = Vec::new();
    let mut body = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_async => is_async = true,
            Rule::kw_function => {}
            Rule::identifier => name = Some(child.as_str().to_string()),
            Rule::ts_type_params | Rule::return_type => cx.strip(&child),
            Rule::params => params = build_params(child, cx)?,
            Rule::block => body = Some(build_block_body(child, cx)?),
            _ => return Err(unexpected("function", &child, cx)),
        }
    }

    Ok(Function {
        name,
        is_async,
        params,
        body: body.ok_or_else(|| missing("function body", span))?,
        span,
    })
}

fn build_params(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Vec<Pattern>> {
    pair.into_inner().map(|param| build_param(param, cx)).collect()
}

fn build_param(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Pattern> {
    let span = cx.span(&pair);
    let mut target = None;
    let mut default = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::rest_param => {
                let rest_span = cx.span(&child);
                let mut arg = None;
                for part in child.into_inner() {
                    match part.as_rule() {
                        Rule::type_annotation => cx.strip(&part),
                        _ => arg = Some(build_pattern(part, cx)?),
                    }
                }
                target = Some(Pattern::Rest {
                    arg: Box::new(arg.ok_or_else(|| missing("rest binding", rest_span))?),
                    span: rest_span,
                });
            }
            Rule::identifier | Rule::object_pattern | Rule::array_pattern => {
                target = Some(build_pattern(child, cx)?)
            }
            Rule::optional_mark | Rule::type_annotation => cx.strip(&child),
            Rule::assign_expr => default = Some(build_expression(child, cx)?),
            _ => return Err(unexpected("parameter", &child, cx)),
        }
    }

    let target = target.ok_or_else(|| missing("parameter binding", span))?;
    Ok(match default {
        Some(default) => Pattern::Assign {
            target: Box::new(target),
            default: Box::new(default),
            span,
        },
        None => target,
    })
}

fn build_if_stmt(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut test = None;
    let mut consequent = None;
    let mut alternate = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_if => {}
            Rule::expression => test = Some(build_expression(child, cx)?),
            Rule::statement => consequent = Some(build_statement(child, cx)?),
            Rule::else_clause => {
                let inner = child
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::statement)
                    .ok_or_else(|| missing("else branch", span))?;
                alternate = Some(Box::new(build_statement(inner, cx)?));
            }
            _ => return Err(unexpected("if", &child, cx)),
        }
    }

    Ok(Stmt::If {
        test,
        consequent: Box::new(consequent.ok_or_else(|| missing("then branch", span))?),
        alternate,
        span,
    })
}

fn build_for_stmt(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut init = None;
    let mut test = None;
    let mut update = None;
    let mut body = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_for => {}
            Rule::for_init => {
                let inner = first_inner(child, "loop initializer", cx)?;
                init = Some(match inner.as_rule() {
                    Rule::var_decl => {
                        let (kind, declarations) = build_var_decl(inner, cx)?;
                        ForInit::Decl { kind, declarations }
                    }
                    _ => ForInit::Expr {
                        expr: build_expression(inner, cx)?,
                    },
                });
            }
            Rule::for_test => {
                test = Some(build_expression(first_inner(child, "loop test", cx)?, cx)?)
            }
            Rule::for_update => {
                update = Some(build_expression(first_inner(child, "loop update", cx)?, cx)?)
            }
            Rule::statement => body = Some(build_statement(child, cx)?),
            _ => return Err(unexpected("for", &child, cx)),
        }
    }

    Ok(Stmt::For {
        init,
        test,
        update,
        body: Box::new(body.ok_or_else(|| missing("loop body", span))?),
        span,
    })
}

fn build_for_each_stmt(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut kind = None;
    let mut is_await = false;
    let mut left = None;
    let mut right = None;
    let mut body = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_for => {}
            Rule::kw_await => is_await = true,
            Rule::for_left => left = Some(build_for_head(child, cx)?),
            Rule::for_kind => {
                kind = Some(match child.as_str() {
                    "of" => ForLoopKind::Of,
                    "in" => ForLoopKind::In,
                    other => {
                        return Err(ParseError::Build(
                            format!("Expected 'of' or 'in', got: {}", other),
                            Some(cx.span(&child)),
                        ))
                    }
                })
            }
            Rule::expression => right = Some(build_expression(child, cx)?),
            Rule::statement => body = Some(build_statement(child, cx)?),
            _ => return Err(unexpected("for-each", &child, cx)),
        }
    }

    Ok(Stmt::ForEach {
        kind: kind.ok_or_else(|| missing("loop kind", span))?,
        is_await,
        left: left.ok_or_else(|| missing("loop binding", span))?,
        right: right.ok_or_else(|| missing("loop iterable", span))?,
        body: Box::new(body.ok_or_else(|| missing("loop body", span))?),
        span,
    })
}

fn build_for_head(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<ForHead> {
    let span = cx.span(&pair);
    let mut kind = None;
    let mut target = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::var_kind => kind = Some(build_var_kind(&child, cx)?),
            Rule::call_expr => {
                return Ok(ForHead::Target {
                    expr: build_expression(child, cx)?,
                })
            }
            _ => target = Some(build_pattern(child, cx)?),
        }
    }

    Ok(ForHead::Decl {
        kind: kind.ok_or_else(|| missing("declaration kind", span))?,
        target: target.ok_or_else(|| missing("loop binding", span))?,
    })
}

fn build_while_stmt(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut test = None;
    let mut body = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_while => {}
            Rule::expression => test = Some(build_expression(child, cx)?),
            Rule::statement => body = Some(build_statement(child, cx)?),
            _ => return Err(unexpected("while", &child, cx)),
        }
    }

    Ok(Stmt::While {
        test,
        body: Box::new(body.ok_or_else(|| missing("loop body", span))?),
        span,
    })
}

fn build_do_while_stmt(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut test = None;
    let mut body = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_do | Rule::kw_while => {}
            Rule::statement => body = Some(build_statement(child, cx)?),
            Rule::expression => test = Some(build_expression(child, cx)?),
            _ => return Err(unexpected("do-while", &child, cx)),
        }
    }

    Ok(Stmt::DoWhile {
        body: Box::new(body.ok_or_else(|| missing("loop body", span))?),
        test,
        span,
    })
}

fn build_try_stmt(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut block = None;
    let mut handler = None;
    let mut finalizer = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_try => {}
            Rule::block => block = Some(build_block_body(child, cx)?),
            Rule::catch_clause => {
                let catch_span = cx.span(&child);
                let mut param = None;
                let mut body = None;
                for part in child.into_inner() {
                    match part.as_rule() {
                        Rule::kw_catch => {}
                        Rule::type_annotation => cx.strip(&part),
                        Rule::block => body = Some(build_block_body(part, cx)?),
                        _ => param = Some(build_pattern(part, cx)?),
                    }
                }
                handler = Some(CatchClause {
                    param,
                    body: body.ok_or_else(|| missing("catch body", catch_span))?,
                    span: catch_span,
                });
            }
            Rule::finally_clause => {
                let inner = child
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::block)
                    .ok_or_else(|| missing("finally body", span))?;
                finalizer = Some(build_block_body(inner, cx)?);
            }
            _ => return Err(unexpected("try", &child, cx)),
        }
    }

    Ok(Stmt::Try {
        block: block.ok_or_else(|| missing("try block", span))?,
        handler,
        finalizer,
        span,
    })
}

fn build_switch_stmt(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut discriminant = None;
    let mut cases = Vec::new();

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_switch => {}
            Rule::expression => discriminant = Some(build_expression(child, cx)?),
            Rule::switch_case => {
                let case_span = cx.span(&child);
                let mut test = None;
                let mut body = Vec::new();
                for part in child.into_inner() {
                    match part.as_rule() {
                        Rule::kw_default => {}
                        Rule::case_test => {
                            let expr = part
                                .into_inner()
                                .find(|p| p.as_rule() == Rule::expression)
                                .ok_or_else(|| missing("case value", case_span))?;
                            test = Some(build_expression(expr, cx)?);
                        }
                        _ => body.push(build_statement(part, cx)?),
                    }
                }
                cases.push(SwitchCase {
                    test,
                    body,
                    span: case_span,
                });
            }
            _ => return Err(unexpected("switch", &child, cx)),
        }
    }

    Ok(Stmt::Switch {
        discriminant: discriminant.ok_or_else(|| missing("switch value", span))?,
        cases,
        span,
    })
}

/* ===================== Modules ===================== */

fn build_import(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut source = String::new();
    let mut type_only = false;
    let mut clause = None;
    let mut clause_text = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_type => type_only = true,
            Rule::import_clause => {
                clause_text = Some(child.as_str().to_string());
                clause = Some(child);
            }
            Rule::string => source = child.as_str().to_string(),
            _ => {}
        }
    }

    if type_only {
        cx.strip_line(span);
    } else if let Some(clause) = clause {
        let mut has_binding = false;
        for part in clause.into_inner() {
            match part.as_rule() {
                Rule::import_default | Rule::import_namespace => has_binding = true,
                Rule::import_named => {
                    if !rewrite_specifiers(part, cx) {
                        has_binding = true;
                    }
                }
                _ => {}
            }
        }
        if !has_binding {
            // every binding was a type: the import disappears entirely
            cx.strip_line(span);
        }
    }

    Ok(Stmt::Import {
        clause: clause_text,
        source,
        span,
    })
}

/// Drop `type` specifiers from a `{ ... }` list.
///
/// Returns true when nothing but type specifiers were listed.
fn rewrite_specifiers(list: Pair<Rule>, cx: &mut BuildContext) -> bool {
    let list_span = list.as_span();
    let specs: Vec<Pair<Rule>> = list.into_inner().collect();
    let kept: Vec<&str> = specs
        .iter()
        .filter(|spec| {
            !Pair::clone(spec)
                .into_inner()
                .any(|p| p.as_rule() == Rule::kw_type)
        })
        .map(pair_text)
        .collect();

    if kept.len() == specs.len() {
        return false;
    }
    if kept.is_empty() {
        return true;
    }
    cx.edits.push(Edit::replace(
        list_span.start(),
        list_span.end(),
        format!("{{ {} }}", kept.join(", ")),
    ));
    false
}

fn build_export(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Stmt> {
    let span = cx.span(&pair);
    let mut declaration = None;
    let mut clause = None;
    let mut is_default = false;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_export => {}
            Rule::export_type_list => cx.strip_line(span),
            Rule::export_list => {
                clause = Some(child.as_str().trim_end_matches(';').trim_end().to_string());
                strip_export_specifiers(child, span, cx);
            }
            Rule::export_all => {
                clause = Some(child.as_str().trim_end_matches(';').trim_end().to_string())
            }
            Rule::export_default => {
                is_default = true;
                for part in child.into_inner() {
                    match part.as_rule() {
                        Rule::function_decl => {
                            let func_span = cx.span(&part);
                            declaration = Some(Box::new(Stmt::Function {
                                func: build_function(part, cx)?,
                                span: func_span,
                            }));
                        }
                        Rule::assign_expr => {
                            let expr_span = cx.span(&part);
                            declaration = Some(Box::new(Stmt::Expr {
                                expr: build_expression(part, cx)?,
                                span: expr_span,
                            }));
                        }
                        _ => {}
                    }
                }
            }
            Rule::statement => {
                let stmt = build_statement(child, cx)?;
                if matches!(stmt, Stmt::TypeOnly { .. }) {
                    cx.strip_line(span);
                }
                declaration = Some(Box::new(stmt));
            }
            _ => return Err(unexpected("export", &child, cx)),
        }
    }

    Ok(Stmt::Export {
        declaration,
        clause,
        is_default,
        span,
    })
}

/// `export { type A, b }` keeps only the value specifiers
fn strip_export_specifiers(list: Pair<Rule>, export_span: Span, cx: &mut BuildContext) {
    let specs: Vec<Pair<Rule>> = list
        .clone()
        .into_inner()
        .filter(|p| p.as_rule() == Rule::export_spec)
        .collect();
    let kept: Vec<&str> = specs
        .iter()
        .filter(|spec| {
            !Pair::clone(spec)
                .into_inner()
                .any(|p| p.as_rule() == Rule::kw_type)
        })
        .map(pair_text)
        .collect();

    if kept.len() == specs.len() {
        return;
    }
    if kept.is_empty() {
        cx.strip_line(export_span);
        return;
    }

    // the list opens with `{`; the closing brace follows the last specifier
    let base = list.as_span().start();
    let last_end = specs.last().map(|spec| spec.as_span().end()).unwrap_or(base);
    let Some(close) = cx.source.get(last_end..).and_then(|rest| rest.find('}')) else {
        return;
    };
    cx.edits.push(Edit::replace(
        base,
        last_end + close + 1,
        format!("{{ {} }}", kept.join(", ")),
    ));
}

/* ===================== Patterns ===================== */

fn build_pattern(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Pattern> {
    let span = cx.span(&pair);

    match pair.as_rule() {
        Rule::identifier => Ok(Pattern::Ident {
            name: pair.as_str().to_string(),
            span,
        }),
        Rule::object_pattern => {
            let mut props = Vec::new();
            for child in pair.into_inner() {
                props.push(build_pattern_prop(child, cx)?);
            }
            Ok(Pattern::Object { props, span })
        }
        Rule::array_pattern => {
            let mut elements = Vec::new();
            for child in pair.into_inner() {
                match child.as_rule() {
                    Rule::pattern_hole => elements.push(None),
                    _ => elements.push(Some(build_pattern(child, cx)?)),
                }
            }
            // `[a, ]` has no trailing hole
            if matches!(elements.last(), Some(None)) {
                elements.pop();
            }
            Ok(Pattern::Array { elements, span })
        }
        Rule::rest_pattern => {
            let arg = build_pattern(first_inner(pair, "rest binding", cx)?, cx)?;
            Ok(Pattern::Rest {
                arg: Box::new(arg),
                span,
            })
        }
        Rule::binding_element => {
            let mut target = None;
            let mut default = None;
            for child in pair.into_inner() {
                match child.as_rule() {
                    Rule::assign_expr => default = Some(build_expression(child, cx)?),
                    _ => target = Some(build_pattern(child, cx)?),
                }
            }
            let target = target.ok_or_else(|| missing("binding", span))?;
            Ok(match default {
                Some(default) => Pattern::Assign {
                    target: Box::new(target),
                    default: Box::new(default),
                    span,
                },
                None => target,
            })
        }
        _ => Err(unexpected("pattern", &pair, cx)),
    }
}

fn build_pattern_prop(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<PatternProp> {
    let span = cx.span(&pair);

    match pair.as_rule() {
        Rule::rest_pattern => {
            let arg = build_pattern(first_inner(pair, "rest binding", cx)?, cx)?;
            Ok(PatternProp::Rest { arg })
        }
        Rule::pattern_pair => {
            let mut inner = pair.into_inner();
            let key = build_prop_key(inner.next().ok_or_else(|| missing("key", span))?, cx)?;
            let value = build_pattern(inner.next().ok_or_else(|| missing("binding", span))?, cx)?;
            Ok(PatternProp::KeyValue { key, value })
        }
        Rule::pattern_shorthand => {
            let mut inner = pair.into_inner();
            let name = inner
                .next()
                .ok_or_else(|| missing("binding", span))?
                .as_str()
                .to_string();
            let default = inner.next().map(|p| build_expression(p, cx)).transpose()?;
            Ok(PatternProp::Shorthand { name, default })
        }
        _ => Err(unexpected("pattern property", &pair, cx)),
    }
}

fn build_prop_key(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<PropKey> {
    let inner = match pair.as_rule() {
        Rule::property_key => first_inner(pair, "property key", cx)?,
        _ => pair,
    };

    match inner.as_rule() {
        Rule::identifier_name | Rule::identifier => Ok(PropKey::Ident {
            name: inner.as_str().to_string(),
        }),
        Rule::string => Ok(PropKey::Str {
            raw: inner.as_str().to_string(),
        }),
        Rule::number => Ok(PropKey::Num {
            raw: inner.as_str().to_string(),
        }),
        Rule::computed_key => {
            let expr = build_expression(first_inner(inner, "computed key", cx)?, cx)?;
            Ok(PropKey::Computed {
                expr: Box::new(expr),
            })
        }
        _ => Err(unexpected("property key", &inner, cx)),
    }
}

/* ===================== Expressions ===================== */

fn binary_op(rule: Rule) -> Option<BinaryOp> {
    Some(match rule {
        Rule::op_nullish => BinaryOp::Nullish,
        Rule::op_or => BinaryOp::Or,
        Rule::op_and => BinaryOp::And,
        Rule::op_bit_or => BinaryOp::BitOr,
        Rule::op_bit_xor => BinaryOp::BitXor,
        Rule::op_bit_and => BinaryOp::BitAnd,
        Rule::op_strict_eq => BinaryOp::StrictEq,
        Rule::op_strict_ne => BinaryOp::StrictNe,
        Rule::op_eq => BinaryOp::Eq,
        Rule::op_ne => BinaryOp::Ne,
        Rule::op_lt => BinaryOp::Lt,
        Rule::op_lte => BinaryOp::Lte,
        Rule::op_gt => BinaryOp::Gt,
        Rule::op_gte => BinaryOp::Gte,
        Rule::op_instanceof => BinaryOp::InstanceOf,
        Rule::op_in => BinaryOp::In,
        Rule::op_shl => BinaryOp::Shl,
        Rule::op_shr => BinaryOp::Shr,
        Rule::op_ushr => BinaryOp::UShr,
        Rule::op_add => BinaryOp::Add,
        Rule::op_sub => BinaryOp::Sub,
        Rule::op_mul => BinaryOp::Mul,
        Rule::op_div => BinaryOp::Div,
        Rule::op_mod => BinaryOp::Mod,
        Rule::op_exp => BinaryOp::Exp,
        _ => return None,
    })
}

/// Left-fold `operand (op operand)*`; `as`/`satisfies` suffixes are
/// stripped and leave the operand untouched
fn build_binary_expr(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Expr> {
    let span = cx.span(&pair);
    let mut inner = pair.into_inner();

    let first = inner
        .next()
        .ok_or_else(|| ParseError::Build("Empty binary expression".to_string(), Some(span)))?;
    let mut prev_end = content_end(&first);
    let mut left = build_expression(first, cx)?;

    while let Some(op_pair) = inner.next() {
        if op_pair.as_rule() == Rule::ts_as_suffix {
            let end = content_end(&op_pair);
            cx.edits.push(Edit::remove(prev_end, end));
            prev_end = end;
            continue;
        }

        let op = binary_op(op_pair.as_rule()).ok_or_else(|| {
            ParseError::Build(
                format!("Expected operator rule, got {:?}", op_pair.as_rule()),
                Some(cx.span(&op_pair)),
            )
        })?;
        let right_pair = inner.next().ok_or_else(|| {
            ParseError::Build(
                "Missing right operand after operator".to_string(),
                Some(span),
            )
        })?;
        prev_end = content_end(&right_pair);
        let right = build_expression(right_pair, cx)?;
        let new_span = left.span().merge(&right.span());

        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: new_span,
        };
    }

    Ok(left)
}

fn build_expression(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Expr> {
    let span = cx.span(&pair);

    match pair.as_rule() {
        Rule::expression => {
            let mut exprs = pair
                .into_inner()
                .map(|p| build_expression(p, cx))
                .collect::<ParseResult<Vec<_>>>()?;
            match exprs.len() {
                0 => Err(missing("expression", span)),
                1 => Ok(exprs.remove(0)),
                _ => Ok(Expr::Sequence { exprs, span }),
            }
        }
        Rule::assign_expr => {
            let mut inner = pair.into_inner();
            let target_pair = inner.next().ok_or_else(|| missing("expression", span))?;
            let target = build_expression(target_pair, cx)?;
            match (inner.next(), inner.next()) {
                (Some(op), Some(value)) => Ok(Expr::Assign {
                    op: op.as_str().to_string(),
                    target: Box::new(target),
                    value: Box::new(build_expression(value, cx)?),
                    span,
                }),
                _ => Ok(target),
            }
        }
        Rule::arrow_fn => build_arrow(pair, cx),
        Rule::conditional_expr => {
            let mut inner = pair.into_inner();
            let test_pair = inner.next().ok_or_else(|| missing("condition", span))?;
            let test = build_expression(test_pair, cx)?;
            match (inner.next(), inner.next()) {
                (Some(consequent), Some(alternate)) => Ok(Expr::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(build_expression(consequent, cx)?),
                    alternate: Box::new(build_expression(alternate, cx)?),
                    span,
                }),
                _ => Ok(test),
            }
        }
        Rule::nullish_expr
        | Rule::logical_or_expr
        | Rule::logical_and_expr
        | Rule::bit_or_expr
        | Rule::bit_xor_expr
        | Rule::bit_and_expr
        | Rule::equality_expr
        | Rule::relational_expr
        | Rule::shift_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => build_binary_expr(pair, cx),
        Rule::exponent_expr => {
            let mut inner = pair.into_inner();
            let base_pair = inner.next().ok_or_else(|| missing("operand", span))?;
            let base = build_expression(base_pair, cx)?;
            match (inner.next(), inner.next()) {
                (Some(_), Some(exponent)) => Ok(Expr::Binary {
                    op: BinaryOp::Exp,
                    left: Box::new(base),
                    right: Box::new(build_expression(exponent, cx)?),
                    span,
                }),
                _ => Ok(base),
            }
        }
        Rule::unary_expr => {
            let mut inner = pair.into_inner();
            let first = inner.next().ok_or_else(|| missing("operand", span))?;

            match first.as_rule() {
                Rule::unary_op => {
                    let op = match first.as_str() {
                        "!" => UnaryOp::Not,
                        "~" => UnaryOp::BitNot,
                        "+" => UnaryOp::Plus,
                        "-" => UnaryOp::Minus,
                        "typeof" => UnaryOp::Typeof,
                        "void" => UnaryOp::Void,
                        "delete" => UnaryOp::Delete,
                        other => {
                            return Err(ParseError::Build(
                                format!("Unknown unary operator: {}", other),
                                Some(cx.span(&first)),
                            ))
                        }
                    };
                    let operand = inner.next().ok_or_else(|| missing("operand", span))?;
                    Ok(Expr::Unary {
                        op,
                        arg: Box::new(build_expression(operand, cx)?),
                        span,
                    })
                }
                Rule::update_op => {
                    let op = update_op(&first);
                    let operand = inner.next().ok_or_else(|| missing("operand", span))?;
                    Ok(Expr::Update {
                        op,
                        prefix: true,
                        arg: Box::new(build_expression(operand, cx)?),
                        span,
                    })
                }
                _ => build_expression(first, cx),
            }
        }
        Rule::await_expr => {
            let operand = pair
                .into_inner()
                .find(|p| p.as_rule() == Rule::unary_expr)
                .ok_or_else(|| missing("awaited value", span))?;
            Ok(Expr::Await {
                arg: Box::new(build_expression(operand, cx)?),
                span,
            })
        }
        Rule::postfix_expr => {
            let mut inner = pair.into_inner();
            let operand_pair = inner.next().ok_or_else(|| missing("operand", span))?;
            let operand = build_expression(operand_pair, cx)?;
            match inner.next() {
                Some(op) => Ok(Expr::Update {
                    op: update_op(&op),
                    prefix: false,
                    arg: Box::new(operand),
                    span,
                }),
                None => Ok(operand),
            }
        }
        Rule::call_expr => build_call_expr(pair, cx),
        Rule::new_expr => build_new_expr(pair, cx),
        Rule::paren_expr => {
            let inner = first_inner(pair, "expression", cx)?;
            Ok(Expr::Paren {
                expr: Box::new(build_expression(inner, cx)?),
                span,
            })
        }
        Rule::function_expr => Ok(Expr::Function {
            func: Box::new(build_function(pair, cx)?),
            span,
        }),
        Rule::template => build_template(pair, cx),
        Rule::regex => Ok(Expr::Regex {
            raw: pair.as_str().to_string(),
            span,
        }),
        Rule::number => Ok(Expr::Num {
            raw: pair.as_str().to_string(),
            span,
        }),
        Rule::string => {
            let raw = pair.as_str();
            Ok(Expr::Str {
                raw: raw.to_string(),
                value: unescape(raw.get(1..raw.len().saturating_sub(1)).unwrap_or("")),
                span,
            })
        }
        Rule::boolean => Ok(Expr::Bool {
            v: pair.as_str() == "true",
            span,
        }),
        Rule::null_lit => Ok(Expr::Null { span }),
        Rule::this_expr => Ok(Expr::This { span }),
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
            span,
        }),
        Rule::array_lit => build_array_literal(pair, cx),
        Rule::object_lit => build_object_literal(pair, cx),
        Rule::spread_elem => {
            let inner = first_inner(pair, "spread value", cx)?;
            Ok(Expr::Spread {
                arg: Box::new(build_expression(inner, cx)?),
                span,
            })
        }
        _ => Err(unexpected("expression", &pair, cx)),
    }
}

fn update_op(pair: &Pair<Rule>) -> UpdateOp {
    if pair.as_str() == "--" {
        UpdateOp::Decrement
    } else {
        UpdateOp::Increment
    }
}

fn build_arrow(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Expr> {
    let span = cx.span(&pair);
    let mut is_async = false;
    let mut params = Vec::new();
    let mut body = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_async => is_async = true,
            Rule::ts_type_params | Rule::return_type => cx.strip(&child),
            Rule::arrow_params => {
                for part in child.into_inner() {
                    match part.as_rule() {
                        Rule::identifier => params.push(build_pattern(part, cx)?),
                        Rule::params => params = build_params(part, cx)?,
                        _ => return Err(unexpected("arrow parameter", &part, cx)),
                    }
                }
            }
            Rule::arrow_body => {
                let inner = first_inner(child, "arrow body", cx)?;
                body = Some(match inner.as_rule() {
                    Rule::block => ArrowBody::Block {
                        body: build_block_body(inner, cx)?,
                    },
                    _ => ArrowBody::Expr {
                        expr: Box::new(build_expression(inner, cx)?),
                    },
                });
            }
            _ => return Err(unexpected("arrow function", &child, cx)),
        }
    }

    Ok(Expr::Arrow {
        is_async,
        params,
        body: body.ok_or_else(|| missing("arrow body", span))?,
        span,
    })
}

fn build_args(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Vec<Expr>> {
    let mut args = Vec::new();
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::ts_type_args => cx.strip(&child),
            Rule::arg_list => {
                for arg in child.into_inner() {
                    args.push(build_expression(arg, cx)?);
                }
            }
            _ => return Err(unexpected("argument", &child, cx)),
        }
    }
    Ok(args)
}

fn property_name(pair: Pair<Rule>, cx: &BuildContext) -> ParseResult<String> {
    let span = cx.span(&pair);
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| missing("property name", span))
}

fn build_call_expr(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Expr> {
    let span = cx.span(&pair);
    let mut inner = pair.into_inner();
    let head = inner.next().ok_or_else(|| missing("callee", span))?;
    let mut expr = build_expression(head, cx)?;

    for postfix_pair in inner {
        let postfix_span = cx.span(&postfix_pair);
        let new_span = expr.span().merge(&postfix_span);

        expr = match postfix_pair.as_rule() {
            Rule::call_args | Rule::optional_call => {
                let optional = postfix_pair.as_rule() == Rule::optional_call;
                Expr::Call {
                    callee: Box::new(expr),
                    args: build_args(postfix_pair, cx)?,
                    optional,
                    span: new_span,
                }
            }
            Rule::member_access | Rule::optional_member => {
                let optional = postfix_pair.as_rule() == Rule::optional_member;
                Expr::Member {
                    object: Box::new(expr),
                    property: property_name(postfix_pair, cx)?,
                    optional,
                    span: new_span,
                }
            }
            Rule::index_access | Rule::optional_index => {
                let optional = postfix_pair.as_rule() == Rule::optional_index;
                let index = build_expression(first_inner(postfix_pair, "index", cx)?, cx)?;
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional,
                    span: new_span,
                }
            }
            Rule::non_null => {
                cx.strip(&postfix_pair);
                expr
            }
            Rule::tagged_template => {
                let quasi = build_template(first_inner(postfix_pair, "template", cx)?, cx)?;
                Expr::TaggedTemplate {
                    tag: Box::new(expr),
                    quasi: Box::new(quasi),
                    span: new_span,
                }
            }
            _ => return Err(unexpected("postfix", &postfix_pair, cx)),
        };
    }

    Ok(expr)
}

fn build_new_expr(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Expr> {
    let span = cx.span(&pair);
    let mut callee = None;
    let mut args = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::kw_new => {}
            Rule::new_callee => {
                let callee_span = cx.span(&child);
                let mut inner = child.into_inner();
                let head = inner.next().ok_or_else(|| missing("constructor", callee_span))?;
                let mut expr = build_expression(head, cx)?;
                for access in inner {
                    let new_span = expr.span().merge(&cx.span(&access));
                    expr = match access.as_rule() {
                        Rule::member_access => Expr::Member {
                            object: Box::new(expr),
                            property: property_name(access, cx)?,
                            optional: false,
                            span: new_span,
                        },
                        _ => Expr::Index {
                            object: Box::new(expr),
                            index: Box::new(build_expression(
                                first_inner(access, "index", cx)?,
                                cx,
                            )?),
                            optional: false,
                            span: new_span,
                        },
                    };
                }
                callee = Some(expr);
            }
            Rule::new_args => args = Some(build_args(child, cx)?),
            _ => return Err(unexpected("new", &child, cx)),
        }
    }

    Ok(Expr::New {
        callee: Box::new(callee.ok_or_else(|| missing("constructor", span))?),
        args,
        span,
    })
}

fn build_template(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Expr> {
    let span = cx.span(&pair);
    let mut quasis = Vec::new();
    let mut exprs = Vec::new();
    let mut chunk = String::new();

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::template_chunk => chunk.push_str(child.as_str()),
            Rule::template_subst => {
                quasis.push(std::mem::take(&mut chunk));
                exprs.push(build_expression(first_inner(child, "substitution", cx)?, cx)?);
            }
            _ => return Err(unexpected("template", &child, cx)),
        }
    }
    quasis.push(chunk);

    Ok(Expr::Template {
        quasis,
        exprs,
        span,
    })
}

fn build_array_literal(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Expr> {
    let span = cx.span(&pair);
    let mut elements = Vec::new();

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::array_hole => elements.push(None),
            _ => elements.push(Some(build_expression(child, cx)?)),
        }
    }
    // the elision before `]` is the trailing comma, not a hole
    if matches!(elements.last(), Some(None)) {
        elements.pop();
    }

    Ok(Expr::Array { elements, span })
}

fn build_object_literal(pair: Pair<Rule>, cx: &mut BuildContext) -> ParseResult<Expr> {
    let span = cx.span(&pair);
    let mut props = Vec::new();

    for child in pair.into_inner() {
        let child_span = cx.span(&child);
        let prop = match child.as_rule() {
            Rule::spread_elem => ObjectProp::Spread {
                arg: build_expression(first_inner(child, "spread value", cx)?, cx)?,
            },
            Rule::object_pair => {
                let mut inner = child.into_inner();
                let key = build_prop_key(inner.next().ok_or_else(|| missing("key", child_span))?, cx)?;
                let value =
                    build_expression(inner.next().ok_or_else(|| missing("value", child_span))?, cx)?;
                ObjectProp::KeyValue { key, value }
            }
            Rule::object_shorthand => {
                let mut inner = child.into_inner();
                let name = inner
                    .next()
                    .ok_or_else(|| missing("property", child_span))?
                    .as_str()
                    .to_string();
                let default = inner
                    .next()
                    .map(|p| build_expression(p, cx).map(Box::new))
                    .transpose()?;
                ObjectProp::Shorthand { name, default }
            }
            Rule::object_method => {
                let mut key = None;
                let mut is_async = false;
                let mut params = Vec::new();
                let mut body = None;
                for part in child.into_inner() {
                    match part.as_rule() {
                        Rule::kw_async => is_async = true,
                        Rule::property_key => key = Some(build_prop_key(part, cx)?),
                        Rule::ts_type_params | Rule::return_type => cx.strip(&part),
                        Rule::params => params = build_params(part, cx)?,
                        Rule::block => body = Some(build_block_body(part, cx)?),
                        _ => return Err(unexpected("method", &part, cx)),
                    }
                }
                ObjectProp::Method {
                    key: key.ok_or_else(|| missing("method name", child_span))?,
                    func: Function {
                        name: None,
                        is_async,
                        params,
                        body: body.ok_or_else(|| missing("method body", child_span))?,
                        span: child_span,
                    },
                }
            }
            _ => return Err(unexpected("object member", &child, cx)),
        };
        props.push(prop);
    }

    Ok(Expr::Object { props, span })
}

/// Resolve escape sequences of a string literal body
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('v') => out.push('\u{000B}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => out.push_str(&hex),
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|c| *c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => out.push_str(&hex),
                }
            }
            // line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}
