//! `List` natives.
//!
//! Iterating natives read the list one element at a time through a fresh
//! borrow, so a block may push to or pop from the list it is iterating.
//! Element comparisons go through `==` and `<` dispatch.

use std::rc::Rc;

use quill_types::Span;

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::native::{checked_len, unexpected, BlockUse, Expect, NativeCall, Signature};
use crate::value::{item_at, ListRef, Value};

pub(super) fn install(interp: &mut Interpreter) {
    let list = interp.core.list.clone();
    let l = || Signature::new(Expect::List);
    let with_block = || l().block(BlockUse::Required);

    interp.define_class_native(&list, "new", Signature::new(Expect::Type), new_empty);
    interp.define_class_native(
        &list,
        "new",
        Signature::new(Expect::Type).param(Expect::Int).rest(Expect::Any),
        new_filled,
    );

    interp.define_native(&list, "size", l(), size);
    interp.define_native(&list, "length", l(), size);
    interp.define_native(&list, "empty?", l(), is_empty);
    interp.define_native(&list, "push", l().rest(Expect::Any), push);
    interp.define_native(&list, "pop", l(), pop);
    interp.define_native(&list, "first", l(), first);
    interp.define_native(&list, "last", l(), last);
    interp.define_native(&list, "[]", l().param(Expect::Int), get);
    interp.define_native(&list, "[]=", l().param(Expect::Int).param(Expect::Any), set);
    interp.define_native(&list, "each", with_block(), each);
    interp.define_native(&list, "each_with_index", with_block(), each_with_index);
    interp.define_native(&list, "map", with_block(), map);
    interp.define_native(&list, "select", with_block(), select);
    interp.define_native(&list, "reject", with_block(), reject);
    interp.define_native(&list, "reduce", with_block(), reduce_first);
    interp.define_native(&list, "reduce", with_block().param(Expect::Any), reduce);
    interp.define_native(&list, "find", with_block(), find);
    let maybe_block = || l().block(BlockUse::Optional);
    interp.define_native(&list, "any?", maybe_block(), any);
    interp.define_native(&list, "all?", maybe_block(), all);
    interp.define_native(&list, "count", maybe_block(), count);
    interp.define_native(&list, "include?", l().param(Expect::Any), includes);
    interp.define_native(&list, "index_of", l().param(Expect::Any), index_of);
    interp.define_native(&list, "concat", l().param(Expect::List), concat);
    interp.define_native(&list, "+", l().param(Expect::List), plus);
    interp.define_native(&list, "reverse", l(), reverse);
    interp.define_native(&list, "join", l(), join_plain);
    interp.define_native(&list, "join", l().param(Expect::String), join);
    interp.define_native(&list, "sort", maybe_block(), sort);
    interp.define_native(&list, "==", l().param(Expect::Any), list_eq);
    interp.define_native(&list, "<", l().param(Expect::List), less);
    interp.define_native(&list, "subset?", l().param(Expect::List), is_subset);
    interp.define_native(&list, "same_elements?", l().param(Expect::List), same_elements);
    interp.define_native(&list, "to_s", l(), inspect);
    interp.define_native(&list, "inspect", l(), inspect);
}

// ── Helpers ───────────────────────────────────────────────────────────────

fn receiver(interp: &mut Interpreter, call: &NativeCall) -> EvalResult<ListRef> {
    match &call.receiver {
        Value::List(items) => Ok(items.clone()),
        _ => Err(unexpected(interp, call, "a List")),
    }
}

fn list_arg(interp: &mut Interpreter, call: &NativeCall) -> EvalResult<ListRef> {
    match call.arg(0) {
        Value::List(items) => Ok(items),
        _ => Err(unexpected(interp, call, "a List argument")),
    }
}

fn block(interp: &mut Interpreter, call: &NativeCall) -> EvalResult<Value> {
    call.block
        .clone()
        .ok_or_else(|| unexpected(interp, call, "a block"))
}

/// A snapshot of the elements.
fn items(list: &ListRef) -> Vec<Value> {
    list.borrow().clone()
}

/// Index from the start, or from the end when negative.
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    usize::try_from(resolved).ok()
}

/// Call `block` on each element in turn.
fn each_item(
    interp: &mut Interpreter,
    list: &ListRef,
    block: &Value,
    span: Span,
    mut f: impl FnMut(&mut Interpreter, Value, Value) -> EvalResult<bool>,
) -> EvalResult<()> {
    let mut index = 0;
    while let Some(item) = item_at(list, index) {
        index += 1;
        let result = interp.call_value(block, vec![item.clone()], None, span)?;
        if !f(interp, item, result)? {
            break;
        }
    }
    Ok(())
}

fn contains(interp: &mut Interpreter, haystack: &[Value], needle: &Value) -> EvalResult<bool> {
    for item in haystack {
        if interp.values_equal(item, needle)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ── Construction & access ─────────────────────────────────────────────────

fn new_empty(_: &mut Interpreter, _: NativeCall) -> EvalResult<Value> {
    Ok(Value::list(Vec::new()))
}

/// `List.new(n)` is `n` nils; `List.new(n, fill)` repeats `fill`.
fn new_filled(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    if call.args.len() > 2 {
        return Err(interp.argument_error(
            format!("List.new: wrong number of arguments (given {}, expected 0..2)", call.args.len()),
            call.span,
        ));
    }
    let size = call.arg(0).as_int().unwrap_or_default();
    let Ok(size) = usize::try_from(size) else {
        return Err(interp.argument_error("negative list size", call.span));
    };
    let size = checked_len(interp, Some(size), call.span)?;
    Ok(Value::list(vec![call.arg(1); size]))
}

fn size(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let len = list.borrow().len();
    Ok(Value::Int(len as i64))
}

fn is_empty(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let empty = list.borrow().is_empty();
    Ok(Value::Bool(empty))
}

fn push(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    list.borrow_mut().extend(call.args);
    Ok(call.receiver)
}

fn pop(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let popped = list.borrow_mut().pop();
    Ok(popped.unwrap_or(Value::Nil))
}

fn first(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    Ok(item_at(&list, 0).unwrap_or(Value::Nil))
}

fn last(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let last = list.borrow().last().cloned();
    Ok(last.unwrap_or(Value::Nil))
}

fn get(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let len = list.borrow().len();
    let index = call.arg(0).as_int().unwrap_or_default();
    Ok(resolve_index(len, index)
        .and_then(|i| item_at(&list, i))
        .unwrap_or(Value::Nil))
}

/// Assigning past the end pads with `nil`.
fn set(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let len = list.borrow().len();
    let index = call.arg(0).as_int().unwrap_or_default();
    let Some(index) = resolve_index(len, index) else {
        return Err(interp.argument_error(format!("index {index} out of range"), call.span));
    };
    if index >= len {
        checked_len(interp, index.checked_add(1), call.span)?;
    }
    let value = call.arg(1);
    let mut items = list.borrow_mut();
    if index >= items.len() {
        items.resize(index + 1, Value::Nil);
    }
    items[index] = value.clone();
    Ok(value)
}

// ── Iteration ─────────────────────────────────────────────────────────────

fn each(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let block = block(interp, &call)?;
    each_item(interp, &list, &block, call.span, |_, _, _| Ok(true))?;
    Ok(call.receiver)
}

fn each_with_index(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let block = block(interp, &call)?;
    let mut index = 0;
    while let Some(item) = item_at(&list, index) {
        interp.call_value(&block, vec![item, Value::Int(index as i64)], None, call.span)?;
        index += 1;
    }
    Ok(call.receiver)
}

fn map(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let block = block(interp, &call)?;
    let mut out = Vec::new();
    each_item(interp, &list, &block, call.span, |_, _, result| {
        out.push(result);
        Ok(true)
    })?;
    Ok(Value::list(out))
}

fn select(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    filter(interp, call, true)
}

fn reject(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    filter(interp, call, false)
}

fn filter(interp: &mut Interpreter, call: NativeCall, keep: bool) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let block = block(interp, &call)?;
    let mut out = Vec::new();
    each_item(interp, &list, &block, call.span, |_, item, result| {
        if result.is_truthy() == keep {
            out.push(item);
        }
        Ok(true)
    })?;
    Ok(Value::list(out))
}

/// `reduce { |acc, x| }` starts from the first element; `nil` when empty.
fn reduce_first(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let block = block(interp, &call)?;
    let Some(mut acc) = item_at(&list, 0) else {
        return Ok(Value::Nil);
    };
    let mut index = 1;
    while let Some(item) = item_at(&list, index) {
        acc = interp.call_value(&block, vec![acc, item], None, call.span)?;
        index += 1;
    }
    Ok(acc)
}

fn reduce(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let block = block(interp, &call)?;
    let mut acc = call.arg(0);
    let mut index = 0;
    while let Some(item) = item_at(&list, index) {
        acc = interp.call_value(&block, vec![acc, item], None, call.span)?;
        index += 1;
    }
    Ok(acc)
}

fn find(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let block = block(interp, &call)?;
    let mut found = Value::Nil;
    each_item(interp, &list, &block, call.span, |_, item, result| {
        if result.is_truthy() {
            found = item;
            return Ok(false);
        }
        Ok(true)
    })?;
    Ok(found)
}

/// Feed the truthiness of each element, or of the block's result for it, to
/// `f` until it returns `false`.
fn test_each(
    interp: &mut Interpreter,
    call: &NativeCall,
    mut f: impl FnMut(bool) -> bool,
) -> EvalResult<()> {
    let list = receiver(interp, call)?;
    let mut index = 0;
    while let Some(item) = item_at(&list, index) {
        index += 1;
        let passed = match &call.block {
            Some(block) => interp.call_value(block, vec![item], None, call.span)?,
            None => item,
        };
        if !f(passed.is_truthy()) {
            break;
        }
    }
    Ok(())
}

fn any(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let mut found = false;
    test_each(interp, &call, |passed| {
        found = passed;
        !passed
    })?;
    Ok(Value::Bool(found))
}

fn all(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let mut every = true;
    test_each(interp, &call, |passed| {
        every = passed;
        passed
    })?;
    Ok(Value::Bool(every))
}

/// The size, or with a block the number of elements it accepts.
fn count(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    if call.block.is_none() {
        return size(interp, call);
    }
    let mut count = 0;
    test_each(interp, &call, |passed| {
        count += i64::from(passed);
        true
    })?;
    Ok(Value::Int(count))
}

fn includes(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let found = contains(interp, &items(&list), &call.arg(0))?;
    Ok(Value::Bool(found))
}

fn index_of(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let needle = call.arg(0);
    for (index, item) in items(&list).iter().enumerate() {
        if interp.values_equal(item, &needle)? {
            return Ok(Value::Int(index as i64));
        }
    }
    Ok(Value::Nil)
}

// ── Combination ───────────────────────────────────────────────────────────

/// Appends in place and returns the receiver.
fn concat(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let other = items(&list_arg(interp, &call)?);
    list.borrow_mut().extend(other);
    Ok(call.receiver)
}

fn plus(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let mut out = items(&receiver(interp, &call)?);
    out.extend(items(&list_arg(interp, &call)?));
    Ok(Value::list(out))
}

fn reverse(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let mut out = items(&receiver(interp, &call)?);
    out.reverse();
    Ok(Value::list(out))
}

fn join_plain(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    join_with(interp, &call, "")
}

fn join(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let separator = call.arg(0).as_str().unwrap_or_default().to_string();
    join_with(interp, &call, &separator)
}

fn join_with(interp: &mut Interpreter, call: &NativeCall, separator: &str) -> EvalResult<Value> {
    let list = receiver(interp, call)?;
    let mut parts = Vec::new();
    for item in items(&list) {
        parts.push(interp.to_display(&item)?);
    }
    Ok(Value::str(parts.join(separator)))
}

// ── Ordering ──────────────────────────────────────────────────────────────

/// Stable merge sort. With a block, `block(a, b)` is truthy when `a` sorts
/// before `b`; without one, elements are compared with `<`.
fn sort(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let values = items(&receiver(interp, &call)?);
    let block = call.block.clone();
    let span = call.span;
    let mut before = |interp: &mut Interpreter, a: &Value, b: &Value| -> EvalResult<bool> {
        let result = match &block {
            Some(block) => interp.call_value(block, vec![a.clone(), b.clone()], None, span)?,
            None => interp.send(a.clone(), "<", vec![b.clone()], None, span)?,
        };
        Ok(result.is_truthy())
    };
    let sorted = merge_sort(interp, values, &mut before)?;
    Ok(Value::list(sorted))
}

fn merge_sort<F>(interp: &mut Interpreter, mut values: Vec<Value>, before: &mut F) -> EvalResult<Vec<Value>>
where
    F: FnMut(&mut Interpreter, &Value, &Value) -> EvalResult<bool>,
{
    if values.len() <= 1 {
        return Ok(values);
    }
    let right = values.split_off(values.len() / 2);
    let left = merge_sort(interp, values, before)?;
    let right = merge_sort(interp, right, before)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        // Take from the right only when it strictly sorts first.
        if before(interp, b, a)? {
            out.extend(right.next());
        } else {
            out.extend(left.next());
        }
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

/// `list_eq`: equal sizes, then pairwise `==`. Lists of different sizes
/// compare unequal without calling any element's `==`.
fn list_eq(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let Value::List(other) = call.arg(0) else {
        return Ok(Value::Bool(false));
    };
    if Rc::ptr_eq(&list, &other) {
        return Ok(Value::Bool(true));
    }
    let (left, right) = (items(&list), items(&other));
    if left.len() != right.len() {
        return Ok(Value::Bool(false));
    }
    for (a, b) in left.iter().zip(&right) {
        if !interp.values_equal(a, b)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// Lexicographic, element order decided by `==` then `<`.
fn less(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let left = items(&receiver(interp, &call)?);
    let right = items(&list_arg(interp, &call)?);
    for (a, b) in left.iter().zip(&right) {
        if interp.values_equal(a, b)? {
            continue;
        }
        let result = interp.send(a.clone(), "<", vec![b.clone()], None, call.span)?;
        return Ok(Value::Bool(result.is_truthy()));
    }
    Ok(Value::Bool(left.len() < right.len()))
}

/// Every element of the receiver occurs in the argument.
fn is_subset(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let left = items(&receiver(interp, &call)?);
    let right = items(&list_arg(interp, &call)?);
    for item in &left {
        if !contains(interp, &right, item)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

/// Equal as multisets: same size, and every element pairs with a distinct
/// equal element of the argument.
fn same_elements(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let left = items(&receiver(interp, &call)?);
    let mut right = items(&list_arg(interp, &call)?);
    if left.len() != right.len() {
        return Ok(Value::Bool(false));
    }
    for item in &left {
        let mut matched = None;
        for (index, candidate) in right.iter().enumerate() {
            if interp.values_equal(item, candidate)? {
                matched = Some(index);
                break;
            }
        }
        match matched {
            Some(index) => {
                right.swap_remove(index);
            }
            None => return Ok(Value::Bool(false)),
        }
    }
    Ok(Value::Bool(true))
}

fn inspect(interp: &mut Interpreter, call: NativeCall) -> EvalResult<Value> {
    let list = receiver(interp, &call)?;
    let mut parts = Vec::new();
    for item in items(&list) {
        if let Value::List(inner) = &item {
            if Rc::ptr_eq(inner, &list) {
                parts.push("[...]".to_string());
                continue;
            }
        }
        parts.push(interp.inspect(&item)?);
    }
    Ok(Value::str(format!("[{}]", parts.join(", "))))
}
