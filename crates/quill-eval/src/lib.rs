//! Quill tree-walking evaluator.
//!
//! Runs parsed Quill programs directly from the AST:
//!
//! ```text
//! source → quill-lexer → quill-parser → Interpreter::run → Value
//! ```
//!
//! An [`Interpreter`] owns one object space: the built-in type hierarchy,
//! the root scope, user-defined types and modules, and the prelude. Host
//! code extends it with native methods through [`Interpreter::define_native`]
//! and inspects it through [`Interpreter::reflect`].

mod config;
mod dispatch;
mod env;
mod error;
mod eval_expr;
mod interpreter;
pub mod native;
pub mod object;
mod pattern;
pub mod reflect;
mod value;

pub use config::EvalConfig;
pub use env::Scope;
pub use error::{EvalResult, Raised, RunError, Unwind};
pub use interpreter::Interpreter;
pub use native::{BlockUse, Expect, NativeCall, NativeFn, Signature};
pub use object::{CoreTypes, TypeKind, TypeObj, TypeRef};
pub use reflect::{ClauseInfo, ConstantInfo, MethodInfo, TypeInfo};
pub use value::{Instance, Lambda, ListRef, Value};

/// Run `source` in a fresh interpreter with the default configuration.
pub fn run_source(source: &str) -> Result<Value, RunError> {
    Interpreter::new()?.eval_str(source)
}
