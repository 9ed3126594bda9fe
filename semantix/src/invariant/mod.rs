//! Invariant inference
//!
//! Both miners are pure functions of a finished trace (the program is only
//! consulted for loop shapes and condition source text). They never fail:
//! a loop or function without a confident relation simply contributes
//! nothing.

mod loops;
mod probe;
mod recursion;
mod sequence;

pub use loops::{BoundEnd, Fold, LoopInvariant, Predicate, Rule};
pub use recursion::RecursionInvariant;
pub use sequence::Sequence;

use crate::ast::Program;
use crate::trace::Trace;

/// Relations that held at every header snapshot of each loop, in header-line order
pub fn infer_loop_invariants(trace: &Trace, program: &Program) -> Vec<LoopInvariant> {
    let found = loops::infer(trace, program);
    log::debug!("inferred {} loop invariant(s)", found.len());
    found
}

/// One invariant per self-recursive function observed in the trace
pub fn infer_recursion_invariants(trace: &Trace, program: &Program) -> Vec<RecursionInvariant> {
    let found = recursion::infer(trace, program);
    log::debug!("inferred {} recursion invariant(s)", found.len());
    found
}
