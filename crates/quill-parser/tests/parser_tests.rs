//! Parser tests for Quill.
//!
//! Covers: operator precedence and associativity, calls and blocks,
//! assignment targets and destructuring, control flow, protected bodies,
//! definitions with doc comments, patterns and parameter lists, and
//! determinism.

use pretty_assertions::assert_eq;
use quill_parser::{parse_source, parse_str};
use quill_types::ast::*;
use quill_types::outline::{outline, DefinitionKind};
use quill_types::SourceFile;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Parse source and return the program, panicking on errors.
fn parse_ok(source: &str) -> Program {
    parse_str(source).unwrap_or_else(|e| panic!("unexpected error for {source:?}: {e}"))
}

/// Parse a single expression statement.
fn expr(source: &str) -> Expr {
    let mut program = parse_ok(source);
    assert_eq!(program.body.len(), 1, "expected one statement in {source:?}");
    program.body.remove(0)
}

/// Render an expression as a fully parenthesised string.
fn show(e: &Expr) -> String {
    match &e.kind {
        ExprKind::Literal(lit) => lit.to_string(),
        ExprKind::List(items) => format!("[{}]", join(items)),
        ExprKind::SelfRef => "self".into(),
        ExprKind::Identifier(name) | ExprKind::Constant(name) => name.clone(),
        ExprKind::Attribute(name) => format!("@{name}"),
        ExprKind::Call(call) => {
            let mut out = match &call.receiver {
                Some(recv) => format!("{}.{}", show(recv), call.method.name),
                None => call.method.name.clone(),
            };
            out.push_str(&format!("({})", join(&call.args)));
            match &call.block {
                Some(BlockArg::Literal(block)) => {
                    out.push_str(&format!(" {{{} {}}}", block.params, join(&block.body)))
                }
                Some(BlockArg::Pass(e)) => out.push_str(&format!(" &{}", show(e))),
                None => {}
            }
            out
        }
        ExprKind::Binary { op, left, right } => {
            format!("({} {} {})", show(left), op.as_str(), show(right))
        }
        ExprKind::Unary { op, operand } => {
            let sym = if *op == UnaryOp::Neg { "-" } else { "!" };
            format!("({sym}{})", show(operand))
        }
        ExprKind::Logical { op, left, right } => {
            let sym = if *op == LogicalOp::And { "&&" } else { "||" };
            format!("({} {sym} {})", show(left), show(right))
        }
        ExprKind::MatchTest { value, pattern } => format!("({} =: {pattern})", show(value)),
        ExprKind::Assign { target, value } => format!("({} = {})", target_str(target), show(value)),
        ExprKind::OpAssign { target, op, value } => {
            let sym = match op {
                AssignOp::Arith(op) => format!("{}=", op.as_str()),
                AssignOp::And => "&&=".into(),
                AssignOp::Or => "||=".into(),
            };
            format!("({} {sym} {})", target_str(target), show(value))
        }
        ExprKind::Destructure { pattern, value } => format!("({pattern} = {})", show(value)),
        ExprKind::Block(block) => format!("{{{} {}}}", block.params, join(&block.body)),
        ExprKind::Yield(args) => format!("yield({})", join(args)),
        ExprKind::Super(s) => match &s.args {
            Some(args) => format!("super({})", join(args)),
            None => "super".into(),
        },
        ExprKind::Raise(v) => format!("raise {}", v.as_ref().map(|v| show(v)).unwrap_or_default()),
        ExprKind::Return(v) => format!("return {}", v.as_ref().map(|v| show(v)).unwrap_or_default()),
        other => format!("{other:?}").split(['(', ' ', '{']).next().unwrap_or("?").to_string(),
    }
}

fn join(items: &[Expr]) -> String {
    items.iter().map(show).collect::<Vec<_>>().join(", ")
}

fn target_str(target: &Target) -> String {
    match target {
        Target::Local(id) | Target::Constant(id) => id.name.clone(),
        Target::Attribute(id) => format!("@{}", id.name),
        Target::Index { receiver, args } => format!("{}[{}]", show(receiver), join(args)),
        Target::Member { receiver, name } => format!("{}.{}", show(receiver), name.name),
    }
}

fn shown(source: &str) -> String {
    show(&expr(source))
}

fn method_def(e: &Expr) -> &MethodDef {
    match &e.kind {
        ExprKind::Def(def) => def,
        other => panic!("expected def, got {other:?}"),
    }
}

fn type_def(e: &Expr) -> &TypeDef {
    match &e.kind {
        ExprKind::TypeDef(def) => def,
        other => panic!("expected type definition, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Precedence & associativity
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_multiplicative_binds_tighter_than_additive() {
    assert_eq!(shown("1 + 2 * 3"), "(1 + (2 * 3))");
    assert_eq!(shown("1 * 2 + 3"), "((1 * 2) + 3)");
}

#[test]
fn test_left_associativity() {
    assert_eq!(shown("a - b - c"), "((a - b) - c)");
    assert_eq!(shown("a / b % c"), "((a / b) % c)");
}

#[test]
fn test_full_precedence_ladder() {
    assert_eq!(
        shown("x = a || b && c == d + e * -f.g"),
        "(x = (a || (b && (c == (d + (e * (-f.g())))))))"
    );
}

#[test]
fn test_relational_below_equality() {
    assert_eq!(shown("a < b == c > d"), "((a < b) == (c > d))");
}

#[test]
fn test_not_equal_and_bang() {
    assert_eq!(shown("!a != b"), "((!a) != b)");
}

#[test]
fn test_negative_literal_folds() {
    assert_eq!(shown("-5.abs"), "-5.abs()");
    assert_eq!(shown("- 5"), "(-5)");
    assert_eq!(shown("a -1"), "(a - 1)");
}

#[test]
fn test_assignment_is_right_associative() {
    assert_eq!(shown("a = b = 1"), "(a = (b = 1))");
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(shown("(1 + 2) * 3"), "((1 + 2) * 3)");
}

#[test]
fn test_match_operator() {
    assert_eq!(shown("x =: [a, *rest]"), "(x =: [a, *rest])");
    assert_eq!(shown("v =: n: Int"), "(v =: n: Int)");
}

// ─────────────────────────────────────────────────────────────────────
// Calls & blocks
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_method_chain() {
    assert_eq!(shown("a.b.c(1, 2)"), "a.b().c(1, 2)");
}

#[test]
fn test_self_call_with_args() {
    assert_eq!(shown("puts(1, \"x\")"), "puts(1, \"x\")");
}

#[test]
fn test_bare_identifier_is_not_a_call() {
    assert!(matches!(expr("name").kind, ExprKind::Identifier(ref n) if n == "name"));
}

#[test]
fn test_brace_block() {
    assert_eq!(shown("xs.map { |x| x * 2 }"), "xs.map() {(x) (x * 2)}");
}

#[test]
fn test_do_block_with_args() {
    let src = "xs.each_with_index(1) do |x, i|\n  puts(x)\nend";
    assert_eq!(shown(src), "xs.each_with_index(1) {(x, i) puts(x)}");
}

#[test]
fn test_block_without_params() {
    assert_eq!(shown("3.times { puts(1) }"), "3.times() {() puts(1)}");
    assert_eq!(shown("loop { || 1 }"), "loop() {() 1}");
}

#[test]
fn test_block_pass_argument() {
    assert_eq!(shown("xs.each(&printer)"), "xs.each() &printer");
}

#[test]
fn test_standalone_block_is_lambda_literal() {
    assert_eq!(shown("{ |a, *rest, &blk| a }"), "{(a, *rest, &blk) a}");
}

#[test]
fn test_index_and_operator_method_names() {
    assert_eq!(shown("xs[0]"), "xs.[](0)");
    assert_eq!(shown("a.+(1)"), "a.+(1)");
    assert_eq!(shown("T.new.class"), "T.new().class()");
}

#[test]
fn test_constant_member_access() {
    assert_eq!(shown("Geo.Point.new(1, 2)"), "Geo.Point().new(1, 2)");
}

#[test]
fn test_leading_dot_continues_chain() {
    let src = "assert(1)\n  .less_than(2)\n  .is_a(Int)";
    assert_eq!(shown(src), "assert(1).less_than(2).is_a(Int)");
}

#[test]
fn test_multiline_arguments() {
    assert_eq!(shown("f(\n  1,\n  2,\n)"), "f(1, 2)");
    assert_eq!(shown("[\n1,\n2\n]"), "[1, 2]");
}

#[test]
fn test_yield_and_super() {
    let def = expr("def f(x)\n  yield(x, 1)\n  super\n  super(x)\nend");
    let body = &method_def(&def).body.stmts;
    assert_eq!(show(&body[0]), "yield(x, 1)");
    assert_eq!(show(&body[1]), "super");
    assert_eq!(show(&body[2]), "super(x)");
}

// ─────────────────────────────────────────────────────────────────────
// Assignment targets & destructuring
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_assignment_targets() {
    assert_eq!(shown("@count += 1"), "(@count += 1)");
    assert_eq!(shown("xs[0] = 5"), "(xs[0] = 5)");
    assert_eq!(shown("obj.name = \"n\""), "(obj.name = \"n\")");
    assert_eq!(shown("Limit = 10"), "(Limit = 10)");
    assert_eq!(shown("x ||= []"), "(x ||= [])");
    assert_eq!(shown("x &&= y"), "(x &&= y)");
}

#[test]
fn test_destructuring_assignment() {
    assert_eq!(shown("[a, [b, _], *rest] = xs"), "([a, [b, _], *rest] = xs)");
}

#[test]
fn test_list_literal_is_not_destructuring() {
    assert_eq!(shown("[1, 2].size"), "[1, 2].size()");
    assert_eq!(shown("[a, b] == c"), "([a, b] == c)");
    assert_eq!(shown("[a + 1]"), "[(a + 1)]");
}

// ─────────────────────────────────────────────────────────────────────
// Control flow
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_if_elsif_else() {
    let e = expr("if a\n  1\nelsif b\n  2\nelse\n  3\nend");
    let ExprKind::If(outer) = &e.kind else {
        panic!("expected if")
    };
    assert_eq!(show(&outer.condition), "a");
    let else_body = outer.else_body.as_ref().expect("else branch");
    let ExprKind::If(inner) = &else_body[0].kind else {
        panic!("elsif should nest as if")
    };
    assert_eq!(show(&inner.condition), "b");
    assert_eq!(show(&inner.else_body.as_ref().unwrap()[0]), "3");
}

#[test]
fn test_single_line_if_with_semicolons() {
    let e = expr("if x; 1; else; 2; end");
    assert!(matches!(e.kind, ExprKind::If(_)));
}

#[test]
fn test_while_and_for() {
    let program = parse_ok("while i < 3\n  i += 1\nend\nfor [k, v] in pairs\n  puts(k)\nend");
    let ExprKind::While(w) = &program.body[0].kind else {
        panic!("expected while")
    };
    assert_eq!(show(&w.condition), "(i < 3)");
    let ExprKind::For(f) = &program.body[1].kind else {
        panic!("expected for")
    };
    assert_eq!(f.pattern.to_string(), "[k, v]");
    assert_eq!(show(&f.iterable), "pairs");
}

#[test]
fn test_case_with_guards() {
    let src = "case x\nwhen 0\n  :zero\nwhen n: Int if n < 0\n  :neg\nwhen [_, *]\n  :list\nelse\n  :other\nend";
    let e = expr(src);
    let ExprKind::Case(case) = &e.kind else {
        panic!("expected case")
    };
    assert_eq!(case.arms.len(), 3);
    assert_eq!(case.arms[0].pattern.to_string(), "0");
    assert_eq!(case.arms[1].pattern.to_string(), "n: Int");
    assert_eq!(show(case.arms[1].guard.as_ref().unwrap()), "(n < 0)");
    assert_eq!(case.arms[2].pattern.to_string(), "[_, *]");
    assert!(case.else_body.is_some());
}

#[test]
fn test_jump_values() {
    let def = expr("def f\n  return\n  return 1\n  raise \"x\"\n  raise\nend");
    let stmts = &method_def(&def).body.stmts;
    assert!(matches!(stmts[0].kind, ExprKind::Return(None)));
    assert!(matches!(stmts[1].kind, ExprKind::Return(Some(_))));
    assert!(matches!(stmts[2].kind, ExprKind::Raise(Some(_))));
    assert!(matches!(stmts[3].kind, ExprKind::Raise(None)));
}

#[test]
fn test_break_and_next_in_block() {
    let e = expr("xs.each { |x| next x\nbreak 5 }");
    let ExprKind::Call(call) = &e.kind else {
        panic!("expected call")
    };
    let Some(BlockArg::Literal(block)) = &call.block else {
        panic!("expected block")
    };
    assert!(matches!(block.body[0].kind, ExprKind::Next(Some(_))));
    assert!(matches!(block.body[1].kind, ExprKind::Break(Some(_))));
}

// ─────────────────────────────────────────────────────────────────────
// Protected bodies
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_begin_rescue_else_ensure() {
    let src = "begin\n  risky\nrescue e: NoMatch if e.message\n  1\nrescue \"oops\"\n  2\nrescue\n  3\nelse\n  4\nensure\n  cleanup\nend";
    let e = expr(src);
    let ExprKind::Begin(body) = &e.kind else {
        panic!("expected begin")
    };
    assert_eq!(body.rescues.len(), 3);
    assert_eq!(
        body.rescues[0].pattern.as_ref().map(|p| p.to_string()),
        Some("e: NoMatch".to_string())
    );
    assert!(body.rescues[0].guard.is_some());
    assert_eq!(
        body.rescues[1].pattern.as_ref().map(|p| p.to_string()),
        Some("\"oops\"".to_string())
    );
    assert!(body.rescues[2].pattern.is_none());
    assert!(body.else_body.is_some());
    assert!(body.ensure.is_some());
    assert!(body.is_protected());
}

#[test]
fn test_def_body_with_rescue() {
    let def = expr("def safe\n  work\nrescue\n  nil\nend");
    let def = method_def(&def);
    assert_eq!(def.body.rescues.len(), 1);
    assert!(def.body.rescues[0].pattern.is_none());
}

// ─────────────────────────────────────────────────────────────────────
// Definitions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_def_with_patterns_and_guard() {
    let e = expr("def fact(n: Int) if n > 0\n  n * fact(n - 1)\nend");
    let def = method_def(&e);
    assert_eq!(def.name.name, "fact");
    assert!(!def.singleton);
    assert_eq!(def.params.to_string(), "(n: Int)");
    assert_eq!(show(def.guard.as_ref().unwrap()), "(n > 0)");
}

#[test]
fn test_def_literal_and_splat_params() {
    let def = expr("def f(0, [h, *t], *rest, &blk)\nend");
    let def = method_def(&def);
    assert_eq!(def.params.to_string(), "(0, [h, *t], *rest, &blk)");
    assert_eq!(def.params.required(), 2);
    assert!(def.params.is_variadic());
}

#[test]
fn test_def_special_names() {
    let program = parse_ok(
        "def self.create\nend\ndef ==(o)\nend\ndef [](i)\nend\ndef []=(i, v)\nend\ndef name=(v)\nend\ndef -@\nend\ndef empty?\nend",
    );
    let names: Vec<(String, bool)> = program
        .body
        .iter()
        .map(|e| {
            let d = method_def(e);
            (d.name.name.clone(), d.singleton)
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("create".to_string(), true),
            ("==".to_string(), false),
            ("[]".to_string(), false),
            ("[]=".to_string(), false),
            ("name=".to_string(), false),
            ("-@".to_string(), false),
            ("empty?".to_string(), false),
        ]
    );
}

#[test]
fn test_type_with_superclass_and_include() {
    let e = expr("type Circle < Geo.Shape\n  include Comparable\n  def area\n    3\n  end\nend");
    let def = type_def(&e);
    assert_eq!(def.kind, TypeDefKind::Type);
    assert_eq!(def.name.name, "Circle");
    assert_eq!(show(def.superclass.as_ref().unwrap()), "Geo.Shape()");
    assert!(matches!(def.body[0].kind, ExprKind::Include(_)));
    assert_eq!(method_def(&def.body[1]).name.name, "area");
}

#[test]
fn test_module_definition() {
    let def = expr("module Util\n  Version = 1\nend");
    let def = type_def(&def);
    assert_eq!(def.kind, TypeDefKind::Module);
    assert!(def.superclass.is_none());
    assert_eq!(def.body.len(), 1);
}

#[test]
fn test_doc_comments_attach_to_definitions() {
    let src = "\
# Shapes with area.
module Geo
  # A round shape.
  # Radius in metres.
  type Circle
    # Area of the circle.
    def area
      1
    end

    # detached

    def perimeter
      2
    end
  end
end
";
    let geo = expr(src);
    let geo = type_def(&geo);
    assert_eq!(geo.doc.as_deref(), Some("Shapes with area."));
    let circle = type_def(&geo.body[0]);
    assert_eq!(circle.doc.as_deref(), Some("A round shape.\nRadius in metres."));
    assert_eq!(method_def(&circle.body[0]).doc.as_deref(), Some("Area of the circle."));
    assert_eq!(method_def(&circle.body[1]).doc, None);
}

#[test]
fn test_outline_of_definitions() {
    let program = parse_ok(
        "# Counts.\ntype Counter\n  # Makes one.\n  def self.zero\n  end\n  def inc(by)\n  end\nend",
    );
    let defs = outline(&program);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].kind, DefinitionKind::Type);
    assert_eq!(defs[0].name, "Counter");
    assert_eq!(defs[0].doc.as_deref(), Some("Counts."));
    let children: Vec<(&str, DefinitionKind)> = defs[0]
        .children
        .iter()
        .map(|d| (d.name.as_str(), d.kind))
        .collect();
    assert_eq!(
        children,
        vec![
            ("zero", DefinitionKind::ClassMethod),
            ("inc", DefinitionKind::Method)
        ]
    );
    assert_eq!(defs[0].children[0].doc.as_deref(), Some("Makes one."));
}

// ─────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_pattern_forms_in_params() {
    let def = expr("def f(_, x, y: A.B, C, nil, :s, \"t\", -1, 2.5, true)\nend");
    assert_eq!(
        method_def(&def).params.to_string(),
        "(_, x, y: A.B, C, nil, :s, \"t\", -1, 2.5, true)"
    );
}

#[test]
fn test_pattern_bound_names() {
    let e = expr("[a, [b, _], *rest] = xs");
    let ExprKind::Destructure { pattern, .. } = &e.kind else {
        panic!("expected destructure")
    };
    assert_eq!(pattern.bound_names(), vec!["a", "b", "rest"]);
}

// ─────────────────────────────────────────────────────────────────────
// Whole programs
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_statement_separators() {
    let program = parse_ok("a = 1; b = 2\n\n\nc = a + b\n");
    assert_eq!(program.body.len(), 3);
}

#[test]
fn test_empty_program() {
    assert!(parse_ok("").body.is_empty());
    assert!(parse_ok("\n\n# only a comment\n").body.is_empty());
}

#[test]
fn test_parse_source_file() {
    let file = SourceFile::new("demo.ql", "type Point\nend\n");
    let program = parse_source(&file).unwrap();
    assert_eq!(type_def(&program.body[0]).name.name, "Point");
}

#[test]
fn test_spans_cover_expressions() {
    let e = expr("foo + barbaz");
    assert_eq!(e.span.start.column, 1);
    assert_eq!(e.span.end.column, 12);
}

#[test]
fn test_parser_determinism_100_iterations() {
    let source = "\
# Ordering helpers.
module Ordered
  def max(other)
    if self < other; other; else; self; end
  end
end

type Money < Object
  include Ordered
  def initialize(cents: Int)
    @cents = cents
  end
  def <(other) = nil
end
";
    // The last def is malformed on purpose: the result must be the same error every time.
    let first = parse_str(source);
    for i in 0..100 {
        assert_eq!(parse_str(source), first, "iteration {i}");
    }

    let valid = "xs.map { |x| x * 2 }.select do |y|\n  y > 2\nend\n";
    let first = parse_str(valid).unwrap();
    for _ in 0..100 {
        assert_eq!(parse_str(valid).unwrap(), first);
    }
}
