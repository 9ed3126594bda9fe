//! Tracing interpreter
//!
//! [`trace`] runs a parsed program against its input bindings and returns the
//! complete step-by-step [`Trace`], or the single error that aborted it. No
//! partial trace is ever returned.

mod builtins;
mod env;
mod error;
mod eval;
mod frame;
mod limits;
mod ops;
mod value;

pub use builtins::BuiltinFn;
pub use env::Environment;
pub use error::*;
pub use eval::Interpreter;
pub use frame::{CallFrame, CallStack, GLOBAL_FRAME};
pub use limits::Limits;
pub use value::{ArrayRef, Value};

pub(crate) use value::python_float;

use crate::ast::Program;
use crate::trace::Trace;

/// Run `program` with `inputs` bound in the global frame
pub fn trace(program: &Program, inputs: &[(String, Value)], limits: Limits) -> InterpResult<Trace> {
    Interpreter::new(program, limits).run(inputs)
}
