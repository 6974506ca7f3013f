//! Canonical programs, run end to end.
//!
//! Each program exercises several features at once: user types and error
//! types, modules, blocks over lists, pattern-driven `case`, and captured
//! output. The determinism check reruns a program 100 times.

use pretty_assertions::assert_eq;
use quill_eval::{Interpreter, RunError, Value};
use quill_types::SourceFile;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Run a program and return its value and captured output.
fn run(name: &str, source: &str) -> (Value, String) {
    let mut interp = Interpreter::new().unwrap();
    let file = SourceFile::new(name, source);
    match interp.eval_source(&file) {
        Ok(value) => (value, interp.take_output()),
        Err(err) => panic!("{name} failed: {err}"),
    }
}

fn s(v: &str) -> Value {
    Value::str(v)
}

// ══════════════════════════════════════════════════════════════════════════════
// Programs
// ══════════════════════════════════════════════════════════════════════════════

const BANK: &str = r#"
# Raised when a withdrawal exceeds the balance.
type InsufficientFunds < Error
  def initialize(needed)
    @needed = needed
    @message = "insufficient funds: need " + needed.to_s
  end

  def needed
    @needed
  end
end

type Account
  def initialize(owner)
    @owner = owner
    @balance = 0
    @history = []
  end

  def balance
    @balance
  end

  def history
    @history
  end

  def deposit(amount: Int) if amount > 0
    @balance += amount
    @history.push([:deposit, amount])
    self
  end

  def withdraw(amount: Int)
    if amount > @balance
      raise InsufficientFunds.new(amount - @balance)
    end
    @balance -= amount
    @history.push([:withdraw, amount])
    self
  end
end

acct = Account.new("ann")
acct.deposit(100).withdraw(30)
shortfall = begin
  acct.withdraw(500)
rescue e: InsufficientFunds
  e.needed
end
puts(acct.balance)
puts(shortfall)
acct.history.map { |kind, amount| kind.to_s + ":" + amount.to_s }.join(",")
"#;

const STACK: &str = r#"
module Summable
  def total
    items.reduce(0) { |acc, x| acc + x }
  end
end

type Stack
  include Summable

  def initialize
    @items = []
  end

  def items
    @items
  end

  def push(x)
    @items.push(x)
    self
  end

  def pop
    if @items.empty?
      raise RuntimeError.new("stack is empty")
    end
    @items.pop
  end

  def size
    @items.size
  end
end
"#;

const SHAPES: &str = r#"
type Shape
  def <(other)
    area < other.area
  end
end

type Rect < Shape
  def initialize(w, h)
    @w = w
    @h = h
  end

  def area
    @w * @h
  end

  def to_s
    "Rect(" + @w.to_s + "x" + @h.to_s + ")"
  end
end

type Square < Rect
  def initialize(side)
    super(side, side)
  end

  def to_s
    "Square(" + area.to_s + ")"
  end
end

shapes = [Rect.new(2, 5), Square.new(2), Rect.new(1, 1)]
puts(Square.new(3))
shapes.sort.map { |shape| shape.to_s }.join(" ")
"#;

const WORDS: &str = r#"
def tally(words)
  counts = []
  words.each do |w|
    entry = counts.find { |pair| pair[0] == w }
    if entry
      entry[1] += 1
    else
      counts.push([w, 1])
    end
  end
  counts
end

counts = tally("the cat and the hat and the bat".split)
best = counts.reduce do |a, b|
  if b[1] > a[1]
    b
  else
    a
  end
end
[best[0], best[1], counts.size]
"#;

const FIZZBUZZ: &str = r#"
def fizz(n)
  case [n % 3, n % 5]
  when [0, 0]
    "FizzBuzz"
  when [0, _]
    "Fizz"
  when [_, 0]
    "Buzz"
  else
    n.to_s
  end
end

15.times do |i|
  puts(fizz(i + 1))
end
"#;

// ══════════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn bank_account() {
    let (value, output) = run("bank.ql", BANK);
    assert_eq!(value, s("deposit:100,withdraw:30"));
    assert_eq!(output, "70\n430\n");
}

#[test]
fn bank_account_rejects_non_positive_deposits() {
    let source = format!("{BANK}\nAccount.new(\"bob\").deposit(0)");
    match Interpreter::new().unwrap().eval_str(&source) {
        Err(RunError::Uncaught { type_name, .. }) => assert_eq!(type_name, "MethodMissing"),
        other => panic!("expected MethodMissing, got {other:?}"),
    }
}

#[test]
fn stack_with_module() {
    let source = format!(
        "{STACK}\ns = Stack.new\ns.push(3).push(4).push(5)\ntop = s.pop\n[top, s.size, s.total, Stack.include?(Summable)]"
    );
    let (value, _) = run("stack.ql", &source);
    assert_eq!(
        value,
        Value::list(vec![
            Value::Int(5),
            Value::Int(2),
            Value::Int(7),
            Value::Bool(true),
        ])
    );
}

#[test]
fn empty_stack_pop_reports_where_it_failed() {
    let source = format!("{STACK}\nStack.new.pop");
    match Interpreter::new().unwrap().eval_str(&source) {
        Err(RunError::Uncaught {
            type_name,
            message,
            backtrace,
            ..
        }) => {
            assert_eq!(type_name, "RuntimeError");
            assert_eq!(message, "stack is empty");
            assert!(backtrace[0].starts_with("Stack#pop at "), "{backtrace:?}");
        }
        other => panic!("expected an uncaught raise, got {other:?}"),
    }
}

#[test]
fn shapes_sort_by_user_comparison() {
    let (value, output) = run("shapes.ql", SHAPES);
    assert_eq!(value, s("Rect(1x1) Square(4) Rect(2x5)"));
    assert_eq!(output, "Square(9)\n");
}

#[test]
fn word_tally() {
    let (value, _) = run("words.ql", WORDS);
    assert_eq!(
        value,
        Value::list(vec![s("the"), Value::Int(3), Value::Int(5)])
    );
}

#[test]
fn fizzbuzz_output() {
    let (value, output) = run("fizzbuzz.ql", FIZZBUZZ);
    assert_eq!(value, Value::Int(15));
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 15);
    assert_eq!(lines[2], "Fizz");
    assert_eq!(lines[4], "Buzz");
    assert_eq!(lines[14], "FizzBuzz");
    assert_eq!(lines[6], "7");
}

#[test]
fn programs_are_deterministic() {
    let programs = [BANK, SHAPES, WORDS, FIZZBUZZ];
    for (index, source) in programs.iter().enumerate() {
        let name = format!("program_{index}.ql");
        let first = run(&name, source);
        for _ in 0..100 {
            assert_eq!(run(&name, source), first);
        }
    }
}
