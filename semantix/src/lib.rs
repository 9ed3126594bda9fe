//! Semantix Library
//!
//! Deterministic execution tracer, invariant miner and complexity estimator
//! for a small imperative language written in Python, JavaScript, Java or
//! C++ syntax.

pub mod analysis;
pub mod ast;
pub mod complexity;
pub mod config;
pub mod error;
pub mod interp;
pub mod invariant;
pub mod lexer;
pub mod parser;
pub mod trace;

pub use analysis::{
    analyze, analyze_request, analyze_with_limits, AnalysisRequest, AnalysisResponse,
    AnalysisResult,
};
pub use ast::{Language, Program, Span};
pub use complexity::{estimate_complexity, ComplexityResult, Growth, SizedTrace};
pub use error::{AnalysisError, Result, SyntaxError};
pub use interp::{trace, Limits, Value};
pub use invariant::{
    infer_loop_invariants, infer_recursion_invariants, LoopInvariant, RecursionInvariant,
};
pub use parser::parse;
pub use trace::{Trace, TraceStep};
