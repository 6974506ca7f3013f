//! Integration tests for the Quill evaluator.
//!
//! Covers:
//! - dispatch over multi-clause methods, guards and patterns
//! - blocks, closures, `yield` and non-local exits
//! - `super`, modules and the method-resolution order
//! - exceptions raised through native iteration
//! - the prelude's assertions
//! - reflection
//! - step and call-depth limits

use pretty_assertions::assert_eq;
use quill_eval::{run_source, EvalConfig, Interpreter, RunError, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn eval(source: &str) -> Value {
    match run_source(source) {
        Ok(value) => value,
        Err(err) => panic!("evaluation failed: {err}\n--- source ---\n{source}"),
    }
}

/// `(type name, message)` of the value that escaped.
fn uncaught(source: &str) -> (String, String) {
    match run_source(source) {
        Err(RunError::Uncaught {
            type_name, message, ..
        }) => (type_name, message),
        other => panic!("expected an uncaught raise, got {other:?}"),
    }
}

fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().map(|n| Value::Int(*n)).collect())
}

fn syms(names: &[&str]) -> Value {
    Value::list(names.iter().map(|n| Value::symbol(n)).collect())
}

// ══════════════════════════════════════════════════════════════════════════════
// Dispatch
// ══════════════════════════════════════════════════════════════════════════════

const CLASSIFY: &str = "
def classify(0)
  :zero
end

def classify(n: Int) if n < 0
  :negative
end

def classify(n: Int)
  :positive
end

def classify(_)
  :other
end
";

#[test]
fn clauses_are_tried_in_declaration_order() {
    let source = format!("{CLASSIFY}\n[classify(0), classify(-3), classify(7), classify(\"x\")]");
    assert_eq!(
        eval(&source),
        syms(&["zero", "negative", "positive", "other"])
    );
}

#[test]
fn dispatch_is_deterministic() {
    let source = format!("{CLASSIFY}\n[classify(0), classify(-3), classify(7), classify(nil)]");
    let first = eval(&source);

    let mut interp = Interpreter::new().unwrap();
    interp.eval_str(CLASSIFY).unwrap();
    for _ in 0..100 {
        assert_eq!(eval(&source), first);
        let again = interp
            .eval_str("[classify(0), classify(-3), classify(7), classify(nil)]")
            .unwrap();
        assert_eq!(again, first);
    }
}

#[test]
fn redefinition_replaces_the_same_signature() {
    let source = "
def greet(name)
  \"hello \" + name
end

def greet(name)
  \"hi \" + name
end

greet(\"ann\")";
    assert_eq!(eval(source), Value::str("hi ann"));
}

#[test]
fn redefinition_ignores_parameter_names() {
    let mut interp = Interpreter::new().unwrap();
    let result = interp
        .eval_str("def greet(name)\n  :old\nend\n\ndef greet(who)\n  :new\nend\n\ngreet(1)")
        .unwrap();
    assert_eq!(result, Value::symbol("new"));
    let object = interp.reflect("Object").unwrap();
    assert_eq!(object.instance_method("greet").unwrap().clauses.len(), 1);
}

#[test]
fn redefinition_keeps_clauses_of_a_different_shape() {
    let source = "
def size_of(n: Int)
  :int
end

def size_of(n: Float)
  :float
end

[size_of(1), size_of(1.5)]";
    assert_eq!(eval(source), syms(&["int", "float"]));
}

#[test]
fn recursion_with_guards() {
    let source = "
def fact(0)
  1
end

def fact(n: Int) if n > 0
  n * fact(n - 1)
end

fact(10)";
    assert_eq!(eval(source), Value::Int(3_628_800));
}

#[test]
fn no_matching_clause_is_method_missing() {
    let (type_name, message) = uncaught("def only_ints(n: Int)\n  n\nend\nonly_ints(\"x\")");
    assert_eq!(type_name, "MethodMissing");
    assert!(message.starts_with("no clause of"), "{message}");
}

#[test]
fn method_missing_carries_name_and_receiver() {
    let source = "
begin
  5.frobnicate(1)
rescue e: MethodMissing
  e
end";
    let Value::Instance(error) = eval(source) else {
        panic!("expected the rescued error instance");
    };
    assert_eq!(error.get("name"), Value::symbol("frobnicate"));
    assert_eq!(error.get("receiver"), Value::Int(5));
    assert_eq!(
        error.get("message"),
        Value::str("undefined method 'frobnicate' for 5")
    );
}

#[test]
fn native_argument_errors_are_rescuable() {
    let source = "
begin
  [1][\"a\"]
rescue ArgumentTypeError
  :bad_arguments
end";
    assert_eq!(eval(source), Value::symbol("bad_arguments"));
}

#[test]
fn class_methods_are_inherited() {
    let source = "
type Base
  def self.make
    new
  end
end

type Child < Base
end

[Child.make.class == Child, Base.make.class == Base]";
    assert_eq!(
        eval(source),
        Value::list(vec![Value::Bool(true), Value::Bool(true)])
    );
}

#[test]
fn setters_and_index_operators() {
    let source = "
type Grid
  def initialize
    @cells = [0, 0, 0]
    @label = nil
  end

  def [](i)
    @cells[i]
  end

  def []=(i, v)
    @cells[i] = v
  end

  def label=(text)
    @label = text
  end

  def label
    @label
  end
end

g = Grid.new
g[1] = 5
g[1] += 2
g.label = \"main\"
[g[1], g.label]";
    assert_eq!(
        eval(source),
        Value::list(vec![Value::Int(7), Value::str("main")])
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Blocks and closures
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn closures_capture_their_scope() {
    let source = "
def make_counter
  count = 0
  lambda { count += 1 }
end

c = make_counter
c.call
c.call
c.call";
    assert_eq!(eval(source), Value::Int(3));
}

#[test]
fn yield_calls_the_block() {
    let source = "
def twice
  yield(1) + yield(2)
end

twice { |x| x * 10 }";
    assert_eq!(eval(source), Value::Int(30));
}

#[test]
fn explicit_block_parameter() {
    let source = "
def apply(x, &f)
  f.call(x)
end

apply(4) do |n|
  n * n
end";
    assert_eq!(eval(source), Value::Int(16));
}

#[test]
fn return_in_a_block_leaves_the_block() {
    assert_eq!(eval("[1, 2, 3].map { |x| return x * 2 }"), ints(&[2, 4, 6]));
}

#[test]
fn block_parameters_destructure_pairs() {
    assert_eq!(
        eval("[[1, 2], [3, 4]].map { |a, b| a + b }"),
        ints(&[3, 7])
    );
}

#[test]
fn break_ends_the_receiving_call() {
    let source = "
found = [5, 8, 13].each do |x|
  if x > 6
    break x
  end
end
found";
    assert_eq!(eval(source), Value::Int(8));
}

// ══════════════════════════════════════════════════════════════════════════════
// Types, modules and super
// ══════════════════════════════════════════════════════════════════════════════

const ANIMALS: &str = "
type Animal
  def initialize(name)
    @name = name
  end

  def describe
    \"animal \" + @name
  end
end

type Dog < Animal
  def initialize(name)
    super
    @tricks = 0
  end

  def describe
    super() + \" (dog)\"
  end
end

module Loud
  def describe
    super().upcase
  end
end

type Cat < Animal
  include Loud
end
";

#[test]
fn super_continues_up_the_chain() {
    let source = format!("{ANIMALS}\nDog.new(\"rex\").describe");
    assert_eq!(eval(&source), Value::str("animal rex (dog)"));
}

#[test]
fn included_module_sits_between_type_and_superclass() {
    let source = format!("{ANIMALS}\nCat.new(\"tom\").describe");
    assert_eq!(eval(&source), Value::str("ANIMAL TOM"));
    let source = format!("{ANIMALS}\nCat.ancestors.map {{ |t| t.name }}");
    assert_eq!(
        eval(&source),
        Value::list(vec![
            Value::str("Cat"),
            Value::str("Loud"),
            Value::str("Animal"),
            Value::str("Object"),
        ])
    );
}

#[test]
fn ancestors_are_idempotent_and_duplicate_free() {
    let source = "
module A
end

module B
  include A
end

type Base
  include A
end

type D < Base
  include B
  include A
end";
    let mut interp = Interpreter::new().unwrap();
    interp.eval_str(source).unwrap();
    let first = interp.reflect("D").unwrap().ancestors;
    assert_eq!(first, vec!["D", "A", "B", "Base", "Object"]);
    for _ in 0..100 {
        assert_eq!(interp.reflect("D").unwrap().ancestors, first);
    }
    assert_eq!(
        interp.eval_str("D.ancestors == D.ancestors").unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn reopening_a_type_adds_methods() {
    let source = "
type Box
  def initialize(v)
    @v = v
  end
end

type Box
  def value
    @v
  end
end

Box.new(3).value";
    assert_eq!(eval(source), Value::Int(3));
}

#[test]
fn superclass_mismatch_on_reopen() {
    let source = "
type Shape
end

type Circle < Shape
end

type Circle < Object
end";
    let (type_name, message) = uncaught(source);
    assert_eq!(type_name, "RuntimeError");
    assert_eq!(message, "superclass mismatch for Circle");
}

#[test]
fn nested_types_resolve_through_their_module() {
    let source = "
module Geo
  type Point
    def initialize(x, y)
      @x = x
      @y = y
    end

    def sum
      @x + @y
    end
  end

  def self.origin
    Point.new(0, 0)
  end
end

[Geo.Point.new(2, 3).sum, Geo.origin.sum, Geo.Point.name]";
    assert_eq!(
        eval(source),
        Value::list(vec![Value::Int(5), Value::Int(0), Value::str("Geo.Point")])
    );
}

#[test]
fn unknown_constant_is_a_name_error() {
    let (type_name, message) = uncaught("Nowhere");
    assert_eq!(type_name, "NameError");
    assert_eq!(message, "uninitialized constant Nowhere");
}

// ══════════════════════════════════════════════════════════════════════════════
// Patterns and case
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn case_arms_match_patterns() {
    let source = "
def kind(v)
  case v
  when 0
    :zero
  when n: Int if n < 0
    :negative
  when Int
    :positive
  when [first, *rest]
    first
  when []
    :empty
  else
    :other
  end
end

[kind(0), kind(-2), kind(5), kind([9, 8]), kind([]), kind(\"s\")]";
    assert_eq!(
        eval(source),
        Value::list(vec![
            Value::symbol("zero"),
            Value::symbol("negative"),
            Value::symbol("positive"),
            Value::Int(9),
            Value::symbol("empty"),
            Value::symbol("other"),
        ])
    );
}

#[test]
fn destructuring_assignment() {
    assert_eq!(eval("[a, *rest, z] = [1, 2, 3, 4]\n[a, rest, z]"), Value::list(vec![
        Value::Int(1),
        ints(&[2, 3]),
        Value::Int(4),
    ]));
    let (type_name, _) = uncaught("[a, b] = [1]");
    assert_eq!(type_name, "NoMatch");
}

#[test]
fn match_test_binds_on_success() {
    assert_eq!(eval("r = [1, 2] =: [x, y]\n[r, x + y]"), Value::list(vec![
        Value::Bool(true),
        Value::Int(3),
    ]));
    assert_eq!(eval("5 =: s: String"), Value::Bool(false));
}

// ══════════════════════════════════════════════════════════════════════════════
// Exceptions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn raise_inside_each_is_rescued_at_the_call_site() {
    let source = "
seen = []
result = begin
  [1, 2, 3].each do |x|
    if x == 2
      raise \"boom\"
    end
    seen.push(x)
  end
  :finished
rescue \"boom\"
  :rescued
end
[result, seen]";
    assert_eq!(
        eval(source),
        Value::list(vec![Value::symbol("rescued"), ints(&[1])])
    );
}

#[test]
fn rescue_clauses_are_tried_in_order() {
    let source = "
def attempt(v)
  raise v
rescue n: Int if n > 10
  :big
rescue Int
  :small
rescue e: RuntimeError
  e.message
end

[attempt(50), attempt(1), attempt(RuntimeError.new(\"bad\"))]";
    assert_eq!(
        eval(source),
        Value::list(vec![
            Value::symbol("big"),
            Value::symbol("small"),
            Value::str("bad"),
        ])
    );
}

#[test]
fn ensure_runs_and_else_runs_without_raise() {
    let source = "
log = []
begin
  log.push(:body)
rescue
  log.push(:rescue)
else
  log.push(:else)
ensure
  log.push(:ensure)
end
begin
  1 / 0
rescue ZeroDivisionError
  log.push(:divided)
ensure
  log.push(:ensure)
end
log";
    assert_eq!(
        eval(source),
        syms(&["body", "else", "ensure", "divided", "ensure"])
    );
}

#[test]
fn uncaught_errors_report_their_message() {
    let (type_name, message) = uncaught("raise RuntimeError.new(\"disk full\")");
    assert_eq!(type_name, "RuntimeError");
    assert_eq!(message, "disk full");

    let (type_name, message) = uncaught("raise 42");
    assert_eq!(type_name, "Int");
    assert_eq!(message, "42");
}

#[test]
fn backtrace_lists_innermost_call_first() {
    let source = "def inner\n  raise :oops\nend\ndef outer\n  inner\nend\nouter";
    match run_source(source) {
        Err(RunError::Uncaught { backtrace, .. }) => {
            assert_eq!(backtrace.len(), 2);
            assert!(backtrace[0].starts_with("Object#inner"), "{backtrace:?}");
            assert!(backtrace[1].starts_with("Object#outer"), "{backtrace:?}");
        }
        other => panic!("expected an uncaught raise, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Prelude assertions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn assertions_chain() {
    assert_eq!(eval("assert(1).less_than(2).is_a?(Assertion)"), Value::Bool(true));
    assert_eq!(
        eval("a = assert(1)\na.less_than(2).greater_than(0).equals(1).equal?(a)"),
        Value::Bool(true)
    );
}

#[test]
fn failed_assertion_carries_left_and_right() {
    let source = "
begin
  assert(2).less_than(1)
rescue f: AssertionFailure
  [f.left, f.right, f.description]
end";
    assert_eq!(
        eval(source),
        Value::list(vec![
            Value::Int(2),
            Value::Int(1),
            Value::str("expected 2 to be less than 1"),
        ])
    );
    let (type_name, message) = uncaught("assert(2).less_than(1)");
    assert_eq!(type_name, "AssertionFailure");
    assert_eq!(message, "expected 2 to be less than 1");
}

#[test]
fn raises_assertions() {
    assert_eq!(
        eval("assert(lambda { 1 / 0 }).raises(ZeroDivisionError).is_a?(Assertion)"),
        Value::Bool(true)
    );
    assert_eq!(
        eval("assert(lambda { raise :x }).raises.is_a?(Assertion)"),
        Value::Bool(true)
    );
    let (type_name, _) = uncaught("assert(lambda { 1 }).raises");
    assert_eq!(type_name, "AssertionFailure");
}

// ══════════════════════════════════════════════════════════════════════════════
// Lists
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn list_equality_checks_size_before_elements() {
    let source = "
CALLS = []

type Probe
  def ==(other)
    CALLS.push(1)
    true
  end
end

short = [Probe.new]
long = [Probe.new, Probe.new]
first = long == short
after_mismatch = CALLS.size
second = [Probe.new] == short
[first, after_mismatch, second, CALLS.size]";
    assert_eq!(
        eval(source),
        Value::list(vec![
            Value::Bool(false),
            Value::Int(0),
            Value::Bool(true),
            Value::Int(1),
        ])
    );
}

#[test]
fn sort_with_a_comparison_block() {
    assert_eq!(eval("[3, 1, 2].sort"), ints(&[1, 2, 3]));
    assert_eq!(eval("[3, 1, 2].sort { |a, b| a > b }"), ints(&[3, 2, 1]));
}

// ══════════════════════════════════════════════════════════════════════════════
// Reflection
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn reflection_exposes_method_docs() {
    let source = "
# Simple arithmetic.
type Calc
  # Adds one.
  def inc(x)
    x + 1
  end
end";
    let mut interp = Interpreter::new().unwrap();
    interp.eval_str(source).unwrap();
    let info = interp.reflect("Calc").unwrap();
    assert_eq!(info.doc.as_deref(), Some("Simple arithmetic."));
    let inc = info.instance_method("inc").unwrap();
    assert_eq!(inc.clauses.len(), 1);
    assert_eq!(inc.clauses[0].arity, 1);
    assert_eq!(inc.clauses[0].doc.as_deref(), Some("Adds one."));
    assert_eq!(
        interp.eval_str("Calc.method_doc(:inc)").unwrap(),
        Value::str("Adds one.")
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Limits and configuration
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn step_limit_halts_and_cannot_be_rescued() {
    let config = EvalConfig::default().with_step_limit(10_000);
    let mut interp = Interpreter::with_config(config).unwrap();
    let result = interp.eval_str("begin\n  while true\n  end\nrescue\n  :caught\nend");
    assert!(matches!(
        result,
        Err(RunError::StepLimitExceeded { limit: 10_000 })
    ));
}

#[test]
fn halting_skips_ensure() {
    let config = EvalConfig::default().with_step_limit(10_000);
    let mut interp = Interpreter::with_config(config).unwrap();
    let result = interp.eval_str("def spin\n  while true\n  end\nensure\n  puts(\"cleanup\")\nend\nspin");
    assert!(matches!(result, Err(RunError::StepLimitExceeded { .. })));
    assert_eq!(interp.output(), "");
}

#[test]
fn call_depth_limit() {
    let config = EvalConfig::default().with_max_call_depth(50);
    let mut interp = Interpreter::with_config(config).unwrap();
    let result = interp.eval_str("def down(n)\n  down(n + 1)\nend\ndown(0)");
    assert!(matches!(
        result,
        Err(RunError::CallDepthExceeded { limit: 50 })
    ));
    // The interpreter stays usable after a halt.
    assert_eq!(interp.eval_str("1 + 1").unwrap(), Value::Int(2));
}

#[test]
fn deep_recursion_within_the_limit() {
    let source = "
def count_down(0)
  :done
end

def count_down(n)
  count_down(n - 1)
end

count_down(2000)";
    assert_eq!(eval(source), Value::symbol("done"));
}

#[test]
fn config_from_json() {
    let config = EvalConfig::from_json(r#"{ "step_limit": 20000, "max_call_depth": 64 }"#).unwrap();
    assert_eq!(
        config,
        EvalConfig::default()
            .with_step_limit(20_000)
            .with_max_call_depth(64)
    );
    assert!(EvalConfig::from_json(r#"{ "unknown": 1 }"#).is_err());
    let interp = Interpreter::with_config(config).unwrap();
    assert_eq!(interp.config().max_call_depth, 64);
}

// ══════════════════════════════════════════════════════════════════════════════
// Front end
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn runs_a_program_parsed_from_tokens() {
    let tokens = quill_lexer::tokenize("x = 20\nx + 22").unwrap();
    let program = quill_parser::parse(tokens).unwrap();
    let mut interp = Interpreter::new().unwrap();
    assert_eq!(interp.run(&program).unwrap(), Value::Int(42));
}

#[test]
fn syntax_errors_surface_as_run_errors() {
    assert!(matches!(run_source("def"), Err(RunError::Syntax(_))));
    assert!(matches!(run_source("1 $ 2"), Err(RunError::Syntax(_))));
}
