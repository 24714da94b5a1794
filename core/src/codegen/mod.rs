//! Source rendering for AST nodes.
//!
//! Renders statements, expressions and binding patterns back to script
//! text. Output is deterministic for identical input. Two presets cover
//! every caller: [`CodeStyle::COMPACT`] puts everything on one line (node
//! summaries, action grouping) and [`CodeStyle::READABLE`] produces
//! indented multi-line code.
//!
//! Rendering never fails from the caller's point of view: when a tree is
//! too deep to print, [`render_code`] logs a warning and returns
//! [`CODEGEN_FAILED`].

use thiserror::Error;
use tracing::warn;

use crate::parser::ast::{
    ArrowBody, BinaryOp, Declarator, Expr, ForHead, ForInit, Function, ObjectProp, Pattern,
    PatternProp, PropKey, Stmt, UnaryOp, VarKind,
};

pub mod text;


/// Text substituted for a node that could not be rendered
pub const CODEGEN_FAILED: &str = "[code generation failed]";

/// Deepest node nesting the printer follows
pub const MAX_RENDER_DEPTH: usize = 256;

const INDENT: &str = "  ";

/* ===================== Style ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeStyle {
    /// Single line output
    pub compact: bool,
    /// Comments are not kept in the AST, so this has no effect
    pub comments: bool,
    /// Keep object literals on one line in multi-line output
    pub concise: bool,
}

impl CodeStyle {
    pub const COMPACT: CodeStyle = CodeStyle {
        compact: true,
        comments: false,
        concise: true,
    };

    pub const READABLE: CodeStyle = CodeStyle {
        compact: false,
        comments: false,
        concise: false,
    };
}

impl Default for CodeStyle {
    fn default() -> Self {
        CodeStyle::COMPACT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeGenError {
    #[error("node nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
}

/// Anything the printer can render
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Pattern(&'a Pattern),
}

impl<'a> From<&'a Stmt> for Node<'a> {
    fn from(stmt: &'a Stmt) -> Self {
        Node::Stmt(stmt)
    }
}

impl<'a> From<&'a Expr> for Node<'a> {
    fn from(expr: &'a Expr) -> Self {
        Node::Expr(expr)
    }
}

impl<'a> From<&'a Pattern> for Node<'a> {
    fn from(pattern: &'a Pattern) -> Self {
        Node::Pattern(pattern)
    }
}

/// Replacement text for a binary operator, `None` keeps the symbol
pub type OperatorWords<'w> = &'w dyn Fn(BinaryOp) -> Option<String>;

/* ===================== Public API ===================== */

/// Render a node, substituting [`CODEGEN_FAILED`] on failure
pub fn render_code<'a>(node: impl Into<Node<'a>>, style: CodeStyle) -> String {
    match try_render_code(node, style) {
        Ok(code) => code,
        Err(err) => {
            warn!(error = %err, "code generation failed");
            CODEGEN_FAILED.to_string()
        }
    }
}

pub fn try_render_code<'a>(
    node: impl Into<Node<'a>>,
    style: CodeStyle,
) -> Result<String, CodeGenError> {
    let mut printer = Printer::new(style);
    printer.node(node.into())?;
    Ok(printer.finish())
}

pub fn render_compact<'a>(node: impl Into<Node<'a>>) -> String {
    render_code(node, CodeStyle::COMPACT)
}

pub fn render_readable<'a>(node: impl Into<Node<'a>>) -> String {
    render_code(node, CodeStyle::READABLE)
}

/// Render an expression on one line with some binary operators spelled
/// out, e.g. `count greater than 3`
pub fn render_with_operator_words(expr: &Expr, words: OperatorWords<'_>) -> String {
    match try_render_with_operator_words(expr, words) {
        Ok(code) => code,
        Err(err) => {
            warn!(error = %err, "code generation failed");
            CODEGEN_FAILED.to_string()
        }
    }
}

pub fn try_render_with_operator_words(
    expr: &Expr,
    words: OperatorWords<'_>,
) -> Result<String, CodeGenError> {
    let mut printer = Printer::new(CodeStyle::COMPACT).with_operator_words(words);
    printer.expr(expr)?;
    Ok(printer.finish())
}

/// Header of a loop statement on one line, empty for anything else
pub fn render_loop_head(stmt: &Stmt) -> String {
    let mut printer = Printer::new(CodeStyle::COMPACT);
    match printer.loop_head(stmt) {
        Ok(()) => printer.finish(),
        Err(err) => {
            warn!(error = %err, "code generation failed");
            CODEGEN_FAILED.to_string()
        }
    }
}

/* ===================== Printer ===================== */

type PrintResult = Result<(), CodeGenError>;

pub struct Printer<'w> {
    style: CodeStyle,
    out: String,
    indent: usize,
    depth: usize,
    operator_words: Option<OperatorWords<'w>>,
}

impl<'w> Printer<'w> {
    pub fn new(style: CodeStyle) -> Self {
        Self {
            style,
            out: String::new(),
            indent: 0,
            depth: 0,
            operator_words: None,
        }
    }

    pub fn with_operator_words(mut self, words: OperatorWords<'w>) -> Self {
        self.operator_words = Some(words);
        self
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn node(&mut self, node: Node<'_>) -> PrintResult {
        match node {
            Node::Stmt(stmt) => self.stmt(stmt),
            Node::Expr(expr) => self.expr(expr),
            Node::Pattern(pattern) => self.pattern(pattern),
        }
    }

    fn enter(&mut self) -> PrintResult {
        self.depth += 1;
        if self.depth > MAX_RENDER_DEPTH {
            return Err(CodeGenError::TooDeep {
                limit: MAX_RENDER_DEPTH,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn push(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Statement separator: a line break in readable output, a space
    /// otherwise
    fn newline(&mut self) {
        if self.style.compact {
            self.out.push(' ');
        } else {
            self.out.push('\n');
            for _ in 0..self.indent {
                self.out.push_str(INDENT);
            }
        }
    }

    /* ---------- statements ---------- */

    pub fn stmt(&mut self, stmt: &Stmt) -> PrintResult {
        self.enter()?;
        self.stmt_inner(stmt)?;
        self.leave();
        Ok(())
    }

    fn stmt_inner(&mut self, stmt: &Stmt) -> PrintResult {
        match stmt {
            Stmt::Block { body, .. } => self.block(body)?,
            Stmt::Empty { .. } => self.push(";"),
            Stmt::VarDecl {
                kind, declarations, ..
            } => {
                self.declarations(*kind, declarations)?;
                self.push(";");
            }
            Stmt::Function { func, .. } => self.function(func)?,
            Stmt::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.push("if (");
                self.opt_expr(test.as_ref())?;
                self.push(") ");
                self.stmt(consequent)?;
                if let Some(alternate) = alternate {
                    self.push(" else ");
                    self.stmt(alternate)?;
                }
            }
            Stmt::For { body, .. } | Stmt::ForEach { body, .. } | Stmt::While { body, .. } => {
                self.loop_head(stmt)?;
                self.push(" ");
                self.stmt(body)?;
            }
            Stmt::DoWhile { body, test, .. } => {
                self.push("do ");
                self.stmt(body)?;
                self.push(" while (");
                self.opt_expr(test.as_ref())?;
                self.push(");");
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
                ..
            } => {
                self.push("try ");
                self.block(block)?;
                if let Some(handler) = handler {
                    self.push(" catch ");
                    if let Some(param) = &handler.param {
                        self.push("(");
                        self.pattern(param)?;
                        self.push(") ");
                    }
                    self.block(&handler.body)?;
                }
                if let Some(finalizer) = finalizer {
                    self.push(" finally ");
                    self.block(finalizer)?;
                }
            }
            Stmt::Switch {
                discriminant,
                cases,
                ..
            } => {
                self.push("switch (");
                self.expr(discriminant)?;
                self.push(") {");
                if cases.is_empty() {
                    self.push("}");
                    return Ok(());
                }
                self.indent += 1;
                for case in cases {
                    self.newline();
                    match &case.test {
                        Some(test) => {
                            self.push("case ");
                            self.expr(test)?;
                            self.push(":");
                        }
                        None => self.push("default:"),
                    }
                    self.indent += 1;
                    for stmt in &case.body {
                        self.newline();
                        self.stmt(stmt)?;
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.newline();
                self.push("}");
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => {
                    self.push("return ");
                    self.expr(value)?;
                    self.push(";");
                }
                None => self.push("return;"),
            },
            Stmt::Throw { value, .. } => {
                self.push("throw ");
                self.expr(value)?;
                self.push(";");
            }
            Stmt::Break { .. } => self.push("break;"),
            Stmt::Continue { .. } => self.push("continue;"),
            Stmt::Expr { expr, .. } => {
                self.expr(expr)?;
                self.push(";");
            }
            Stmt::Import { clause, source, .. } => {
                self.push("import ");
                if let Some(clause) = clause {
                    self.push(clause);
                    self.push(" from ");
                }
                self.push(source);
                self.push(";");
            }
            Stmt::Export {
                declaration,
                clause,
                is_default,
                ..
            } => {
                self.push(if *is_default { "export default " } else { "export " });
                if let Some(declaration) = declaration {
                    self.stmt(declaration)?;
                } else if let Some(clause) = clause {
                    self.push(clause);
                    self.push(";");
                }
            }
            Stmt::TypeOnly { keyword, name, .. } => {
                self.push(keyword);
                if !name.is_empty() {
                    self.push(" ");
                    self.push(name);
                }
            }
        }
        Ok(())
    }

    /// Loop header without its body: `for (…)`, `while (…)`, or
    /// `do … while (…)`
    pub fn loop_head(&mut self, stmt: &Stmt) -> PrintResult {
        match stmt {
            Stmt::For {
                init, test, update, ..
            } => {
                self.push("for (");
                match init {
                    Some(ForInit::Decl { kind, declarations }) => {
                        self.declarations(*kind, declarations)?
                    }
                    Some(ForInit::Expr { expr }) => self.expr(expr)?,
                    None => {}
                }
                self.push(";");
                if let Some(test) = test {
                    self.push(" ");
                    self.expr(test)?;
                }
                self.push(";");
                if let Some(update) = update {
                    self.push(" ");
                    self.expr(update)?;
                }
                self.push(")");
            }
            Stmt::ForEach {
                kind,
                is_await,
                left,
                right,
                ..
            } => {
                self.push(if *is_await { "for await (" } else { "for (" });
                self.for_head(left)?;
                self.push(" ");
                self.push(kind.as_str());
                self.push(" ");
                self.expr(right)?;
                self.push(")");
            }
            Stmt::While { test, .. } => {
                self.push("while (");
                self.opt_expr(test.as_ref())?;
                self.push(")");
            }
            Stmt::DoWhile { test, .. } => {
                self.push("do … while (");
                self.opt_expr(test.as_ref())?;
                self.push(")");
            }
            _ => {}
        }
        Ok(())
    }

    fn block(&mut self, body: &[Stmt]) -> PrintResult {
        if body.is_empty() {
            self.push("{}");
            return Ok(());
        }
        self.push("{");
        self.indent += 1;
        for stmt in body {
            self.newline();
            self.stmt(stmt)?;
        }
        self.indent -= 1;
        self.newline();
        self.push("}");
        Ok(())
    }

    fn declarations(&mut self, kind: VarKind, declarations: &[Declarator]) -> PrintResult {
        self.push(kind.as_str());
        self.push(" ");
        for (idx, declarator) in declarations.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.pattern(&declarator.target)?;
            if let Some(init) = &declarator.init {
                self.push(" = ");
                self.expr(init)?;
            }
        }
        Ok(())
    }

    fn for_head(&mut self, head: &ForHead) -> PrintResult {
        match head {
            ForHead::Decl { kind, target } => {
                self.push(kind.as_str());
                self.push(" ");
                self.pattern(target)
            }
            ForHead::Target { expr } => self.expr(expr),
        }
    }

    fn function(&mut self, func: &Function) -> PrintResult {
        if func.is_async {
            self.push("async ");
        }
        self.push("function");
        if let Some(name) = &func.name {
            self.push(" ");
            self.push(name);
        }
        self.params(&func.params)?;
        self.push(" ");
        self.block(&func.body)
    }

    fn params(&mut self, params: &[Pattern]) -> PrintResult {
        self.push("(");
        for (idx, param) in params.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.pattern(param)?;
        }
        self.push(")");
        Ok(())
    }

    fn opt_expr(&mut self, expr: Option<&Expr>) -> PrintResult {
        match expr {
            Some(expr) => self.expr(expr),
            None => Ok(()),
        }
    }

    /* ---------- patterns ---------- */

    pub fn pattern(&mut self, pattern: &Pattern) -> PrintResult {
        self.enter()?;
        match pattern {
            Pattern::Ident { name, .. } => self.push(name),
            Pattern::Object { props, .. } => {
                if props.is_empty() {
                    self.push("{}");
                } else {
                    self.push("{ ");
                    for (idx, prop) in props.iter().enumerate() {
                        if idx > 0 {
                            self.push(", ");
                        }
                        match prop {
                            PatternProp::KeyValue { key, value } => {
                                self.prop_key(key)?;
                                self.push(": ");
                                self.pattern(value)?;
                            }
                            PatternProp::Shorthand { name, default } => {
                                self.push(name);
                                if let Some(default) = default {
                                    self.push(" = ");
                                    self.expr(default)?;
                                }
                            }
                            PatternProp::Rest { arg } => {
                                self.push("...");
                                self.pattern(arg)?;
                            }
                        }
                    }
                    self.push(" }");
                }
            }
            Pattern::Array { elements, .. } => {
                self.push("[");
                self.elements(elements, |printer, element| printer.pattern(element))?;
                self.push("]");
            }
            Pattern::Rest { arg, .. } => {
                self.push("...");
                self.pattern(arg)?;
            }
            Pattern::Assign {
                target, default, ..
            } => {
                self.pattern(target)?;
                self.push(" = ");
                self.expr(default)?;
            }
        }
        self.leave();
        Ok(())
    }

    /// Comma list with elision holes; a hole in last position needs its own
    /// trailing comma
    fn elements<T>(
        &mut self,
        elements: &[Option<T>],
        mut each: impl FnMut(&mut Self, &T) -> PrintResult,
    ) -> PrintResult {
        for (idx, element) in elements.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            if let Some(element) = element {
                each(self, element)?;
            }
        }
        if matches!(elements.last(), Some(None)) {
            self.push(",");
        }
        Ok(())
    }

    fn prop_key(&mut self, key: &PropKey) -> PrintResult {
        match key {
            PropKey::Ident { name } => self.push(name),
            PropKey::Str { raw } | PropKey::Num { raw } => self.push(raw),
            PropKey::Computed { expr } => {
                self.push("[");
                self.expr(expr)?;
                self.push("]");
            }
        }
        Ok(())
    }

    /* ---------- expressions ---------- */

    pub fn expr(&mut self, expr: &Expr) -> PrintResult {
        self.enter()?;
        self.expr_inner(expr)?;
        self.leave();
        Ok(())
    }

    fn expr_inner(&mut self, expr: &Expr) -> PrintResult {
        match expr {
            Expr::Ident { name, .. } => self.push(name),
            Expr::This { .. } => self.push("this"),
            Expr::Num { raw, .. } | Expr::Str { raw, .. } | Expr::Regex { raw, .. } => {
                self.push(raw)
            }
            Expr::Bool { v, .. } => self.push(if *v { "true" } else { "false" }),
            Expr::Null { .. } => self.push("null"),
            Expr::Template { quasis, exprs, .. } => self.template(quasis, exprs)?,
            Expr::TaggedTemplate { tag, quasi, .. } => {
                self.expr(tag)?;
                self.expr(quasi)?;
            }
            Expr::Array { elements, .. } => {
                self.push("[");
                self.elements(elements, |printer, element| printer.expr(element))?;
                self.push("]");
            }
            Expr::Object { props, .. } => self.object(props)?,
            Expr::Spread { arg, .. } => {
                self.push("...");
                self.expr(arg)?;
            }
            Expr::Function { func, .. } => self.function(func)?,
            Expr::Arrow {
                is_async,
                params,
                body,
                ..
            } => {
                if *is_async {
                    self.push("async ");
                }
                self.params(params)?;
                self.push(" => ");
                match body {
                    ArrowBody::Block { body } => self.block(body)?,
                    ArrowBody::Expr { expr } => self.expr(expr)?,
                }
            }
            Expr::Unary { op, arg, .. } => {
                let symbol = op.as_str();
                self.push(symbol);
                if op.is_word() {
                    self.push(" ");
                }
                let mark = self.out.len();
                self.expr(arg)?;
                // `- -x` must not collapse into a decrement
                if matches!(op, UnaryOp::Plus | UnaryOp::Minus)
                    && self.out[mark..].starts_with(symbol)
                {
                    self.out.insert(mark, ' ');
                }
            }
            Expr::Update {
                op, prefix, arg, ..
            } => {
                if *prefix {
                    self.push(op.as_str());
                    self.expr(arg)?;
                } else {
                    self.expr(arg)?;
                    self.push(op.as_str());
                }
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                self.expr(left)?;
                let word = self.operator_words.and_then(|words| words(*op));
                self.push(" ");
                match word {
                    Some(word) => self.push(&word),
                    None => self.push(op.as_str()),
                }
                self.push(" ");
                self.expr(right)?;
            }
            Expr::Assign {
                op, target, value, ..
            } => {
                self.expr(target)?;
                self.push(" ");
                self.push(op);
                self.push(" ");
                self.expr(value)?;
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.expr(test)?;
                self.push(" ? ");
                self.expr(consequent)?;
                self.push(" : ");
                self.expr(alternate)?;
            }
            Expr::Call {
                callee,
                args,
                optional,
                ..
            } => {
                self.expr(callee)?;
                if *optional {
                    self.push("?.");
                }
                self.args(args)?;
            }
            Expr::New { callee, args, .. } => {
                self.push("new ");
                self.expr(callee)?;
                if let Some(args) = args {
                    self.args(args)?;
                }
            }
            Expr::Member {
                object,
                property,
                optional,
                ..
            } => {
                self.expr(object)?;
                self.push(if *optional { "?." } else { "." });
                self.push(property);
            }
            Expr::Index {
                object,
                index,
                optional,
                ..
            } => {
                self.expr(object)?;
                self.push(if *optional { "?.[" } else { "[" });
                self.expr(index)?;
                self.push("]");
            }
            Expr::Await { arg, .. } => {
                self.push("await ");
                self.expr(arg)?;
            }
            Expr::Sequence { exprs, .. } => {
                for (idx, expr) in exprs.iter().enumerate() {
                    if idx > 0 {
                        self.push(", ");
                    }
                    self.expr(expr)?;
                }
            }
            Expr::Paren { expr, .. } => {
                self.push("(");
                self.expr(expr)?;
                self.push(")");
            }
        }
        Ok(())
    }

    fn args(&mut self, args: &[Expr]) -> PrintResult {
        self.push("(");
        for (idx, arg) in args.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.expr(arg)?;
        }
        self.push(")");
        Ok(())
    }

    fn template(&mut self, quasis: &[String], exprs: &[Expr]) -> PrintResult {
        self.push("`");
        for (idx, quasi) in quasis.iter().enumerate() {
            self.push(quasi);
            if let Some(expr) = exprs.get(idx) {
                self.push("${");
                self.expr(expr)?;
                self.push("}");
            }
        }
        self.push("`");
        Ok(())
    }

    fn object(&mut self, props: &[ObjectProp]) -> PrintResult {
        if props.is_empty() {
            self.push("{}");
            return Ok(());
        }

        let multiline = !self.style.compact && !self.style.concise;
        self.push("{");
        self.indent += 1;
        for (idx, prop) in props.iter().enumerate() {
            if idx > 0 {
                self.push(",");
            }
            if multiline {
                self.newline();
            } else {
                self.push(" ");
            }
            self.object_prop(prop)?;
        }
        self.indent -= 1;
        if multiline {
            self.newline();
        } else {
            self.push(" ");
        }
        self.push("}");
        Ok(())
    }

    fn object_prop(&mut self, prop: &ObjectProp) -> PrintResult {
        match prop {
            ObjectProp::KeyValue { key, value } => {
                self.prop_key(key)?;
                self.push(": ");
                self.expr(value)?;
            }
            ObjectProp::Shorthand { name, default } => {
                self.push(name);
                if let Some(default) = default {
                    self.push(" = ");
                    self.expr(default)?;
                }
            }
            ObjectProp::Method { key, func } => {
                if func.is_async {
                    self.push("async ");
                }
                self.prop_key(key)?;
                self.params(&func.params)?;
                self.push(" ");
                self.block(&func.body)?;
            }
            ObjectProp::Spread { arg } => {
                self.push("...");
                self.expr(arg)?;
            }
        }
        Ok(())
    }
}
