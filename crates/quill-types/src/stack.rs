//! Stack growth for deep recursion in the parser and the evaluator.
//!
//! Nesting depth in Quill is bounded by the evaluator's call-depth limit, not
//! by the size of the host thread's stack.

/// If less than this remains, the stack is grown before recursing.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Run `f`, first growing the stack if fewer than [`RED_ZONE`] bytes remain.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
