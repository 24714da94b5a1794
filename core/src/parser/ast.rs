//! Abstract syntax tree for workflow scripts.
//!
//! Type syntax never reaches this tree: the builder skips it and records its
//! byte ranges separately (see [`Edit`]).

use serde::{Deserialize, Serialize};

/// Source location span for diagnostics and node addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset
    pub end: usize,
    /// Start line (0-indexed)
    pub start_line: usize,
    /// Start column (0-indexed)
    pub start_col: usize,
    /// End line (0-indexed)
    pub end_line: usize,
    /// End column (0-indexed)
    pub end_col: usize,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        start_line: usize,
        start_col: usize,
        end_line: usize,
        end_col: usize,
    ) -> Self {
        Self {
            start,
            end,
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a span that covers both self and other
    pub fn merge(&self, other: &Span) -> Span {
        let (start, start_line, start_col) = if self.start <= other.start {
            (self.start, self.start_line, self.start_col)
        } else {
            (other.start, other.start_line, other.start_col)
        };
        let (end, end_line, end_col) = if self.end >= other.end {
            (self.end, self.end_line, self.end_col)
        } else {
            (other.end, other.end_line, other.end_col)
        };
        Span::new(start, end, start_line, start_col, end_line, end_col)
    }

    /// Slice the covered text out of the source it was built from
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

fn is_default_span(span: &Span) -> bool {
    *span == Span::default()
}

/// A replacement of a byte range of the original source.
///
/// Produced by the AST builder for every piece of type-only syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
    /// Also swallow the rest of the line when it is otherwise blank
    pub whole_line: bool,
}

impl Edit {
    pub fn remove(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            replacement: String::new(),
            whole_line: false,
        }
    }

    pub fn remove_line(start: usize, end: usize) -> Self {
        Self {
            whole_line: true,
            ..Self::remove(start, end)
        }
    }

    pub fn replace(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
            whole_line: false,
        }
    }
}

/* ===================== Declarations ===================== */

/// Variable declaration kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Const => "const",
            VarKind::Let => "let",
            VarKind::Var => "var",
        }
    }
}

/// For loop kind (in vs of)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForLoopKind {
    /// for (k in obj) - iterates over keys
    In,
    /// for (v of arr) - iterates over values
    Of,
}

impl ForLoopKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForLoopKind::In => "in",
            ForLoopKind::Of => "of",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<Expr>,
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

/// Binding pattern for declarations, parameters and catch clauses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Pattern {
    Ident {
        name: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Object {
        props: Vec<PatternProp>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Array {
        /// `None` marks an elision hole
        elements: Vec<Option<Pattern>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Rest {
        arg: Box<Pattern>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// Target with a default value
    Assign {
        target: Box<Pattern>,
        default: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Ident { span, .. } => *span,
            Pattern::Object { span, .. } => *span,
            Pattern::Array { span, .. } => *span,
            Pattern::Rest { span, .. } => *span,
            Pattern::Assign { span, .. } => *span,
        }
    }

    /// Every name bound by this pattern, in source order
    pub fn bound_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        match self {
            Pattern::Ident { name, .. } => names.push(name.clone()),
            Pattern::Object { props, .. } => {
                for prop in props {
                    match prop {
                        PatternProp::KeyValue { value, .. } => value.collect_names(names),
                        PatternProp::Shorthand { name, .. } => names.push(name.clone()),
                        PatternProp::Rest { arg } => arg.collect_names(names),
                    }
                }
            }
            Pattern::Array { elements, .. } => {
                for element in elements.iter().flatten() {
                    element.collect_names(names);
                }
            }
            Pattern::Rest { arg, .. } => arg.collect_names(names),
            Pattern::Assign { target, .. } => target.collect_names(names),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum PatternProp {
    KeyValue { key: PropKey, value: Pattern },
    Shorthand { name: String, default: Option<Expr> },
    Rest { arg: Pattern },
}

/// Property key in object literals and object patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum PropKey {
    Ident { name: String },
    /// String literal key, raw text including quotes
    Str { raw: String },
    Num { raw: String },
    Computed { expr: Box<Expr> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: Option<String>,
    pub is_async: bool,
    pub params: Vec<Pattern>,
    pub body: Vec<Stmt>,
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

/* ===================== Statements ===================== */

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ForInit {
    Decl {
        kind: VarKind,
        declarations: Vec<Declarator>,
    },
    Expr {
        expr: Expr,
    },
}

/// Left side of `for…in` / `for…of`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ForHead {
    Decl { kind: VarKind, target: Pattern },
    Target { expr: Expr },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    #[serde(default, skip_serializing_if = "is_default_span")]
    pub span: Span,
}

/// Statement AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Stmt {
    Block {
        body: Vec<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Empty {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    VarDecl {
        kind: VarKind,
        declarations: Vec<Declarator>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Function {
        func: Function,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// A test of `None` means the condition was left empty
    If {
        test: Option<Expr>,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    ForEach {
        kind: ForLoopKind,
        is_await: bool,
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    While {
        test: Option<Expr>,
        body: Box<Stmt>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Option<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Return {
        value: Option<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Throw {
        value: Expr,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Break {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Continue {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Expr {
        expr: Expr,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Import {
        /// Binding list as written, `None` for side-effect imports
        clause: Option<String>,
        /// Module specifier, raw text including quotes
        source: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Export {
        declaration: Option<Box<Stmt>>,
        /// `{ a, b } from "m"` or `* from "m"` as written
        clause: Option<String>,
        #[serde(default)]
        is_default: bool,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// `interface`, `type`, `enum`, `declare` and overload signatures
    TypeOnly {
        keyword: String,
        name: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
}

impl Stmt {
    /// Get the span of this statement
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block { span, .. } => *span,
            Stmt::Empty { span } => *span,
            Stmt::VarDecl { span, .. } => *span,
            Stmt::Function { span, .. } => *span,
            Stmt::If { span, .. } => *span,
            Stmt::For { span, .. } => *span,
            Stmt::ForEach { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::DoWhile { span, .. } => *span,
            Stmt::Try { span, .. } => *span,
            Stmt::Switch { span, .. } => *span,
            Stmt::Return { span, .. } => *span,
            Stmt::Throw { span, .. } => *span,
            Stmt::Break { span } => *span,
            Stmt::Continue { span } => *span,
            Stmt::Expr { span, .. } => *span,
            Stmt::Import { span, .. } => *span,
            Stmt::Export { span, .. } => *span,
            Stmt::TypeOnly { span, .. } => *span,
        }
    }

    /// Whether this is a loop of any flavour
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Stmt::For { .. } | Stmt::ForEach { .. } | Stmt::While { .. } | Stmt::DoWhile { .. }
        )
    }

    /// Whether this statement branches or repeats
    pub fn is_control_flow(&self) -> bool {
        self.is_loop() || matches!(self, Stmt::If { .. } | Stmt::Try { .. } | Stmt::Switch { .. })
    }

    /// Short lowercase name of the statement form
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Block { .. } => "block",
            Stmt::Empty { .. } => "empty",
            Stmt::VarDecl { .. } => "declaration",
            Stmt::Function { .. } => "function",
            Stmt::If { .. } => "if",
            Stmt::For { .. } => "for",
            Stmt::ForEach { .. } => "for-each",
            Stmt::While { .. } => "while",
            Stmt::DoWhile { .. } => "do-while",
            Stmt::Try { .. } => "try",
            Stmt::Switch { .. } => "switch",
            Stmt::Return { .. } => "return",
            Stmt::Throw { .. } => "throw",
            Stmt::Break { .. } => "break",
            Stmt::Continue { .. } => "continue",
            Stmt::Expr { .. } => "expression",
            Stmt::Import { .. } => "import",
            Stmt::Export { .. } => "export",
            Stmt::TypeOnly { .. } => "type",
        }
    }
}

/* ===================== Expressions ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    BitNot,
    Plus,
    Minus,
    Typeof,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }

    /// Keyword operators need a space before their operand
    pub fn is_word(&self) -> bool {
        matches!(self, UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Nullish,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    StrictEq,
    StrictNe,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    InstanceOf,
    In,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Nullish => "??",
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::InstanceOf => "instanceof",
            BinaryOp::In => "in",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ArrowBody {
    Block { body: Vec<Stmt> },
    Expr { expr: Box<Expr> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ObjectProp {
    KeyValue {
        key: PropKey,
        value: Expr,
    },
    Shorthand {
        name: String,
        /// Only meaningful when the literal is reinterpreted as a pattern
        default: Option<Box<Expr>>,
    },
    Method {
        key: PropKey,
        func: Function,
    },
    Spread {
        arg: Expr,
    },
}

/// Expression AST node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Expr {
    Ident {
        name: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    This {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Num {
        raw: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Str {
        /// Source text including quotes
        raw: String,
        /// Unescaped value
        value: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Bool {
        v: bool,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Null {
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Regex {
        raw: String,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    /// `quasis.len() == exprs.len() + 1`; quasis hold raw text
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    TaggedTemplate {
        tag: Box<Expr>,
        quasi: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Array {
        /// `None` marks an elision hole
        elements: Vec<Option<Expr>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Object {
        props: Vec<ObjectProp>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Spread {
        arg: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Function {
        func: Box<Function>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Arrow {
        is_async: bool,
        params: Vec<Pattern>,
        body: ArrowBody,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        arg: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Assign {
        op: String,
        target: Box<Expr>,
        value: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        optional: bool,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    New {
        callee: Box<Expr>,
        /// `None` when written without parentheses
        args: Option<Vec<Expr>>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Await {
        arg: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Sequence {
        exprs: Vec<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
    Paren {
        expr: Box<Expr>,
        #[serde(default, skip_serializing_if = "is_default_span")]
        span: Span,
    },
}

impl Expr {
    /// Get the span of this expression
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident { span, .. } => *span,
            Expr::This { span } => *span,
            Expr::Num { span, .. } => *span,
            Expr::Str { span, .. } => *span,
            Expr::Bool { span, .. } => *span,
            Expr::Null { span } => *span,
            Expr::Regex { span, .. } => *span,
            Expr::Template { span, .. } => *span,
            Expr::TaggedTemplate { span, .. } => *span,
            Expr::Array { span, .. } => *span,
            Expr::Object { span, .. } => *span,
            Expr::Spread { span, .. } => *span,
            Expr::Function { span, .. } => *span,
            Expr::Arrow { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Update { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Assign { span, .. } => *span,
            Expr::Conditional { span, .. } => *span,
            Expr::Call { span, .. } => *span,
            Expr::New { span, .. } => *span,
            Expr::Member { span, .. } => *span,
            Expr::Index { span, .. } => *span,
            Expr::Await { span, .. } => *span,
            Expr::Sequence { span, .. } => *span,
            Expr::Paren { span, .. } => *span,
        }
    }

    /// Look through `await` and parentheses
    pub fn unwrap_await(&self) -> &Expr {
        match self {
            Expr::Await { arg, .. } => arg.unwrap_await(),
            Expr::Paren { expr, .. } => expr.unwrap_await(),
            other => other,
        }
    }
}
