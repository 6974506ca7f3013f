//! Lexical scope chain for the Quill evaluator.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

/// A single scope level.
struct Frame {
    bindings: RefCell<IndexMap<String, Value>>,
    parent: Option<Scope>,
}

/// A handle to one frame of the scope chain.
///
/// Cloning a `Scope` shares the frame: a closure keeps its defining scope
/// alive and sees every later assignment made through it.
///
/// Variables are looked up from the innermost frame outward.
/// `define` always creates in this frame.
/// `set` updates the nearest frame that already binds the name.
#[derive(Clone)]
pub struct Scope(Rc<Frame>);

impl Scope {
    /// A root scope with no parent.
    pub fn new() -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(IndexMap::new()),
            parent: None,
        }))
    }

    /// A new, empty frame whose parent is this one.
    pub fn child(&self) -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(IndexMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Define a variable in this frame, shadowing any outer binding.
    pub fn define(&self, name: &str, value: Value) {
        self.0.bindings.borrow_mut().insert(name.to_string(), value);
    }

    /// Look up a variable, searching from this frame outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.0.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            scope = current.0.parent.as_ref();
        }
        None
    }

    /// Assign to the nearest frame that binds `name`, or define it here.
    pub fn set(&self, name: &str, value: Value) {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(slot) = current.0.bindings.borrow_mut().get_mut(name) {
                *slot = value;
                return;
            }
            scope = current.0.parent.as_ref();
        }
        self.define(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names bound directly in this frame, in definition order.
    pub fn local_names(&self) -> Vec<String> {
        self.0.bindings.borrow().keys().cloned().collect()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward() {
        let root = Scope::new();
        root.define("x", Value::Int(1));
        let inner = root.child().child();
        assert_eq!(inner.get("x"), Some(Value::Int(1)));
        assert_eq!(inner.get("y"), None);
    }

    #[test]
    fn set_updates_nearest_binding() {
        let root = Scope::new();
        root.define("x", Value::Int(1));
        let inner = root.child();
        inner.set("x", Value::Int(2));
        inner.set("y", Value::Int(3));
        assert_eq!(root.get("x"), Some(Value::Int(2)));
        assert_eq!(root.get("y"), None);
        assert_eq!(inner.local_names(), vec!["y".to_string()]);
    }

    #[test]
    fn define_shadows() {
        let root = Scope::new();
        root.define("x", Value::Int(1));
        let inner = root.child();
        inner.define("x", Value::Int(9));
        assert_eq!(inner.get("x"), Some(Value::Int(9)));
        assert_eq!(root.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn clones_share_the_frame() {
        let scope = Scope::new();
        let captured = scope.clone();
        scope.define("n", Value::Int(5));
        assert_eq!(captured.get("n"), Some(Value::Int(5)));
        assert!(captured.ptr_eq(&scope));
    }
}
