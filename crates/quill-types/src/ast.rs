//! AST node types for the Quill language.
//!
//! Every node carries a [`Span`] for error reporting. Definition nodes and
//! block literals sit behind `Rc` so the evaluator can keep method bodies and
//! closures alive after the tree that produced them is dropped; the tree
//! itself is never mutated after parsing.

use crate::Span;
use std::fmt;
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete Quill program: a sequence of top-level expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Expr>,
    pub span: Span,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Quill has no separate statement category.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// `nil`, `true`, `42`, `1.5`, `"text"`, `:sym`
    Literal(Literal),
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// `self`
    SelfRef,

    // ── Names ──
    /// `name`: a local or a zero-argument call on `self`
    Identifier(String),
    /// `Name`
    Constant(String),
    /// `@name`
    Attribute(String),

    // ── Calls ──
    /// `recv.name(args) { block }`, `name(args)`, `recv[i]`
    Call(Box<Call>),
    /// `super` / `super(args)`
    Super(Box<SuperCall>),
    /// `yield(args)`
    Yield(Vec<Expr>),
    /// A standalone block literal, evaluated to a Lambda.
    Block(Rc<BlockLit>),

    // ── Operators ──
    /// Operators that dispatch to a method on the left operand.
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `-x` dispatches `-@`; `!x` negates truthiness.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Short-circuit `&&` / `||`, returning the deciding operand.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `value =: pattern`
    MatchTest { value: Box<Expr>, pattern: Pattern },

    // ── Assignment ──
    /// `target = value`
    Assign { target: Box<Target>, value: Box<Expr> },
    /// `target += value`, `target ||= value`, ...
    OpAssign {
        target: Box<Target>,
        op: AssignOp,
        value: Box<Expr>,
    },
    /// `[a, *rest] = value`
    Destructure { pattern: Pattern, value: Box<Expr> },

    // ── Control Flow ──
    If(Box<IfExpr>),
    While(Box<WhileExpr>),
    For(Box<ForExpr>),
    Case(Box<CaseExpr>),
    /// `begin ... rescue ... else ... ensure ... end`
    Begin(Box<Body>),
    Raise(Option<Box<Expr>>),
    Return(Option<Box<Expr>>),
    Break(Option<Box<Expr>>),
    Next(Option<Box<Expr>>),

    // ── Definitions ──
    Def(Rc<MethodDef>),
    TypeDef(Rc<TypeDef>),
    /// `include Module`
    Include(Box<Expr>),
}

/// A literal value, shared between expressions and patterns.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Nil => f.write_str("nil"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(n) => write!(f, "{n:?}"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Symbol(s) => write!(f, ":{s}"),
        }
    }
}

/// A method call. `receiver: None` means an implicit-`self` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub receiver: Option<Expr>,
    pub method: Ident,
    pub args: Vec<Expr>,
    pub block: Option<BlockArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuperCall {
    /// `None` for bare `super`, which forwards the current arguments.
    pub args: Option<Vec<Expr>>,
    pub block: Option<BlockArg>,
}

/// The block attached to a call.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockArg {
    /// `{ |x| ... }` or `do |x| ... end`
    Literal(Rc<BlockLit>),
    /// `&expr` in the argument list
    Pass(Box<Expr>),
}

/// `{ |params| body }`
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLit {
    pub params: ParamList,
    pub body: Vec<Expr>,
    pub span: Span,
}

/// Binary operators that desugar to method calls on the left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl BinOp {
    /// The operator symbol, as written in source.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::LessEq => "<=",
            BinOp::Greater => ">",
            BinOp::GreaterEq => ">=",
        }
    }

    /// The method dispatched for this operator. `!=` dispatches `==` and
    /// negates the result.
    pub fn method_name(&self) -> &'static str {
        match self {
            BinOp::NotEq => "==",
            other => other.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// The operator part of a compound assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `+=`, `-=`, `*=`, `/=`, `%=`
    Arith(BinOp),
    /// `&&=`
    And,
    /// `||=`
    Or,
}

/// The left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Local(Ident),
    Attribute(Ident),
    Constant(Ident),
    /// `recv[args] = v` → `recv.[]=(args..., v)`
    Index { receiver: Expr, args: Vec<Expr> },
    /// `recv.name = v` → `recv.name=(v)`
    Member { receiver: Expr, name: Ident },
}

// ── Control Flow ──────────────────────────────────────────────────────────────

/// `if cond ... elsif ... else ... end`; `elsif` nests as an `If` in `else_body`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Expr,
    pub then_body: Vec<Expr>,
    pub else_body: Option<Vec<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileExpr {
    pub condition: Expr,
    pub body: Vec<Expr>,
    pub span: Span,
}

/// `for pattern in iterable ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct ForExpr {
    pub pattern: Pattern,
    pub iterable: Expr,
    pub body: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub subject: Expr,
    pub arms: Vec<CaseArm>,
    pub else_body: Option<Vec<Expr>>,
    pub span: Span,
}

/// `when pattern [if guard]` followed by a body.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Vec<Expr>,
    pub span: Span,
}

/// A protected body: the statements plus their `rescue`/`else`/`ensure` parts.
/// Used by `begin ... end` and by method bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub stmts: Vec<Expr>,
    pub rescues: Vec<RescueClause>,
    pub else_body: Option<Vec<Expr>>,
    pub ensure: Option<Vec<Expr>>,
    pub span: Span,
}

impl Body {
    pub fn plain(stmts: Vec<Expr>, span: Span) -> Self {
        Self {
            stmts,
            rescues: Vec::new(),
            else_body: None,
            ensure: None,
            span,
        }
    }

    pub fn is_protected(&self) -> bool {
        !self.rescues.is_empty() || self.else_body.is_some() || self.ensure.is_some()
    }
}

/// `rescue [pattern] [if guard]`. A missing pattern matches every value.
#[derive(Debug, Clone, PartialEq)]
pub struct RescueClause {
    pub pattern: Option<Pattern>,
    pub guard: Option<Expr>,
    pub body: Vec<Expr>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Definitions
// ══════════════════════════════════════════════════════════════════════════════

/// `def [self.]name(params) [if guard] body end`: one clause of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub name: Ident,
    /// `def self.name` defines a class-side method.
    pub singleton: bool,
    pub params: ParamList,
    pub guard: Option<Expr>,
    pub body: Body,
    /// Leading comment text.
    pub doc: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDefKind {
    Type,
    Module,
}

impl TypeDefKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            TypeDefKind::Type => "type",
            TypeDefKind::Module => "module",
        }
    }
}

/// `type Name [< Super] ... end` or `module Name ... end`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub kind: TypeDefKind,
    pub name: Ident,
    pub superclass: Option<Expr>,
    pub body: Vec<Expr>,
    /// Leading comment text.
    pub doc: Option<String>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Parameters & Patterns
// ══════════════════════════════════════════════════════════════════════════════

/// A parameter list: positional patterns (at most one splat) and an optional
/// `&block` parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamList {
    pub items: Vec<Pattern>,
    pub block: Option<Ident>,
}

impl ParamList {
    /// Number of positional arguments the list requires.
    pub fn required(&self) -> usize {
        self.items
            .iter()
            .filter(|p| !matches!(p, Pattern::Splat { .. }))
            .count()
    }

    pub fn is_variadic(&self) -> bool {
        self.items.iter().any(|p| matches!(p, Pattern::Splat { .. }))
    }

    /// Whether both lists accept exactly the same arguments. Binding names
    /// and the block parameter are ignored.
    pub fn same_shape(&self, other: &ParamList) -> bool {
        self.items.len() == other.items.len()
            && self.items.iter().zip(&other.items).all(|(a, b)| a.same_shape(b))
    }
}

impl fmt::Display for ParamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.items.iter().map(|p| p.to_string()).collect();
        if let Some(block) = &self.block {
            parts.push(format!("&{}", block.name));
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// A dotted constant path used as a type guard: `Shape`, `Geo.Point`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypePath {
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.segments.iter().map(|s| s.name.as_str()).collect();
        f.write_str(&names.join("."))
    }
}

/// A structural pattern, used by parameters, destructuring, `=:`, `case`
/// arms and `rescue` clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// `_`
    Wildcard(Span),
    /// `name` or `name: Type`
    Bind {
        name: Ident,
        type_path: Option<TypePath>,
    },
    /// `Type`: an ancestry test when the constant is a type or module,
    /// otherwise equality with the constant's value.
    Const(TypePath),
    /// Equality with a literal.
    Literal(Literal, Span),
    /// `[p1, p2, *rest]`
    List { items: Vec<Pattern>, span: Span },
    /// `*name` / `*`: only inside a list pattern or a parameter list.
    Splat { name: Option<Ident>, span: Span },
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Wildcard(span) | Pattern::Literal(_, span) => *span,
            Pattern::Bind { name, type_path } => match type_path {
                Some(path) => name.span.merge(path.span),
                None => name.span,
            },
            Pattern::Const(path) => path.span,
            Pattern::List { span, .. } | Pattern::Splat { span, .. } => *span,
        }
    }

    /// Whether both patterns match the same values, whatever they bind.
    pub fn same_shape(&self, other: &Pattern) -> bool {
        match (self, other) {
            (
                Pattern::Wildcard(_) | Pattern::Bind { type_path: None, .. },
                Pattern::Wildcard(_) | Pattern::Bind { type_path: None, .. },
            ) => true,
            (
                Pattern::Bind { type_path: Some(a), .. },
                Pattern::Bind { type_path: Some(b), .. },
            )
            | (Pattern::Const(a), Pattern::Const(b)) => a.to_string() == b.to_string(),
            (Pattern::Literal(a, _), Pattern::Literal(b, _)) => a == b,
            (Pattern::List { items: a, .. }, Pattern::List { items: b, .. }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_shape(y))
            }
            (Pattern::Splat { .. }, Pattern::Splat { .. }) => true,
            _ => false,
        }
    }

    /// Names this pattern binds, in source order.
    pub fn bound_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pattern::Bind { name, .. } => out.push(&name.name),
            Pattern::Splat { name: Some(name), .. } => out.push(&name.name),
            Pattern::List { items, .. } => items.iter().for_each(|p| p.collect_names(out)),
            _ => {}
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Wildcard(_) => f.write_str("_"),
            Pattern::Bind {
                name,
                type_path: Some(path),
            } => write!(f, "{}: {path}", name.name),
            Pattern::Bind { name, type_path: None } => f.write_str(&name.name),
            Pattern::Const(path) => write!(f, "{path}"),
            Pattern::Literal(lit, _) => write!(f, "{lit}"),
            Pattern::List { items, .. } => {
                let parts: Vec<String> = items.iter().map(|p| p.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Pattern::Splat { name: Some(name), .. } => write!(f, "*{}", name.name),
            Pattern::Splat { name: None, .. } => f.write_str("*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::default())
    }

    #[test]
    fn param_list_arity() {
        let params = ParamList {
            items: vec![
                Pattern::Bind {
                    name: ident("a"),
                    type_path: None,
                },
                Pattern::Splat {
                    name: Some(ident("rest")),
                    span: Span::default(),
                },
            ],
            block: Some(ident("blk")),
        };
        assert_eq!(params.required(), 1);
        assert!(params.is_variadic());
        assert_eq!(params.to_string(), "(a, *rest, &blk)");
    }

    #[test]
    fn pattern_display_is_canonical() {
        let pattern = Pattern::List {
            items: vec![
                Pattern::Literal(Literal::Int(0), Span::default()),
                Pattern::Bind {
                    name: ident("x"),
                    type_path: Some(TypePath {
                        segments: vec![ident("Geo"), ident("Point")],
                        span: Span::default(),
                    }),
                },
                Pattern::Wildcard(Span::default()),
            ],
            span: Span::default(),
        };
        assert_eq!(pattern.to_string(), "[0, x: Geo.Point, _]");
        assert_eq!(pattern.bound_names(), vec!["x"]);
    }

    #[test]
    fn same_shape_ignores_binding_names() {
        let bind = |name: &str| Pattern::Bind {
            name: ident(name),
            type_path: None,
        };
        let typed = |name: &str, ty: &str| Pattern::Bind {
            name: ident(name),
            type_path: Some(TypePath {
                segments: vec![ident(ty)],
                span: Span::default(),
            }),
        };
        let params = |items: Vec<Pattern>| ParamList { items, block: None };

        assert!(params(vec![bind("name")]).same_shape(&params(vec![bind("who")])));
        assert!(params(vec![bind("x")]).same_shape(&params(vec![Pattern::Wildcard(Span::default())])));
        assert!(params(vec![typed("a", "Int")]).same_shape(&params(vec![typed("b", "Int")])));
        assert!(!params(vec![typed("a", "Int")]).same_shape(&params(vec![typed("a", "Float")])));
        assert!(!params(vec![typed("a", "Int")]).same_shape(&params(vec![bind("a")])));
        assert!(!params(vec![bind("a")]).same_shape(&params(vec![bind("a"), bind("b")])));
        assert!(!params(vec![Pattern::Literal(Literal::Int(0), Span::default())])
            .same_shape(&params(vec![Pattern::Literal(Literal::Int(1), Span::default())])));
    }

    #[test]
    fn not_equal_dispatches_equality() {
        assert_eq!(BinOp::NotEq.method_name(), "==");
        assert_eq!(BinOp::LessEq.method_name(), "<=");
    }
}
