//! Runtime errors for the tracer

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Runtime error raised by the program under analysis
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Line of the statement that raised it; filled in by the statement walker
    pub line: Option<u32>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Read of a name with no binding in the active frame
    UnboundVariable,
    /// Operation applied to values of the wrong type
    TypeMismatch,
    /// Integer or float division/modulo by zero
    DivisionByZero,
    /// Index or pop outside an array's bounds
    IndexOutOfBounds,
    /// Call of a name that is neither user-defined nor built in
    UndefinedFunction,
    /// Argument count mismatch
    ArityMismatch,
    /// Well-typed but unusable argument (e.g. `range` with step 0)
    InvalidArgument,
}

impl ErrorKind {
    /// Stable tag reported to callers
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnboundVariable => "unbound-variable",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::DivisionByZero => "division-by-zero",
            ErrorKind::IndexOutOfBounds => "index-out-of-bounds",
            ErrorKind::UndefinedFunction => "undefined-function",
            ErrorKind::ArityMismatch => "arity-mismatch",
            ErrorKind::InvalidArgument => "invalid-argument",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String) -> Self {
        RuntimeError {
            kind,
            message,
            line: None,
        }
    }

    pub fn unbound_variable(name: &str) -> Self {
        Self::new(
            ErrorKind::UnboundVariable,
            format!("name '{name}' is not bound in the current frame"),
        )
    }

    pub fn undefined_function(name: &str) -> Self {
        Self::new(
            ErrorKind::UndefinedFunction,
            format!("undefined function: {name}"),
        )
    }

    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("type mismatch: expected {expected}, got {got}"),
        )
    }

    pub fn unsupported_operands(op: &str, left: &str, right: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("unsupported operand types for {op}: {left} and {right}"),
        )
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero".to_string())
    }

    pub fn index_out_of_bounds(index: &str, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("index {index} out of bounds for length {len}"),
        )
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("function {name} expects {expected} argument(s), got {got}"),
        )
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, msg.into())
    }

    /// Attach the statement line unless an inner statement already did
    pub fn at(mut self, line: u32) -> Self {
        self.line.get_or_insert(line);
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Runtime error ({}) at line {line}: {}", self.kind, self.message),
            None => write!(f, "Runtime error ({}): {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Which analysis ceiling was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Steps,
    CallDepth,
    WallClock,
    TraceMemory,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Steps => write!(f, "executed-step limit"),
            Resource::CallDepth => write!(f, "call-depth limit"),
            Resource::WallClock => write!(f, "wall-clock budget (ms)"),
            Resource::TraceMemory => write!(f, "trace memory budget (bytes)"),
        }
    }
}

/// The analysis itself would exceed its configured bounds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resource exceeded at line {line}: {resource} of {limit} reached")]
pub struct ResourceExceeded {
    pub resource: Resource,
    pub limit: u64,
    pub line: u32,
}

/// Anything that aborts a trace
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraceError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    ResourceExceeded(#[from] ResourceExceeded),
}

impl TraceError {
    /// Attach a statement line to a runtime error
    pub fn at(self, line: u32) -> Self {
        match self {
            TraceError::Runtime(e) => TraceError::Runtime(e.at(line)),
            other => other,
        }
    }
}

/// Result type for tracer operations
pub type InterpResult<T> = Result<T, TraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_variable() {
        let err = RuntimeError::unbound_variable("foo");
        assert_eq!(err.kind, ErrorKind::UnboundVariable);
        assert!(err.message.contains("foo"));
        assert_eq!(err.line, None);
    }

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(ErrorKind::UnboundVariable.as_str(), "unbound-variable");
        assert_eq!(ErrorKind::TypeMismatch.as_str(), "type-mismatch");
        assert_eq!(ErrorKind::DivisionByZero.as_str(), "division-by-zero");
        assert_eq!(ErrorKind::IndexOutOfBounds.as_str(), "index-out-of-bounds");
    }

    #[test]
    fn test_kind_serializes_as_tag() {
        let json = serde_json::to_string(&ErrorKind::IndexOutOfBounds).unwrap();
        assert_eq!(json, "\"index-out-of-bounds\"");
    }

    #[test]
    fn test_at_keeps_innermost_line() {
        let err = RuntimeError::division_by_zero().at(7).at(3);
        assert_eq!(err.line, Some(7));
    }

    #[test]
    fn test_display_with_line() {
        let err = RuntimeError::index_out_of_bounds("5", 3).at(4);
        let display = err.to_string();
        assert!(display.starts_with("Runtime error (index-out-of-bounds) at line 4"));
        assert!(display.contains("index 5 out of bounds for length 3"));
    }

    #[test]
    fn test_arity_mismatch_message_format() {
        let err = RuntimeError::arity_mismatch("add", 2, 1);
        assert_eq!(err.message, "function add expects 2 argument(s), got 1");
    }

    #[test]
    fn test_trace_error_at_only_touches_runtime() {
        let err = TraceError::from(RuntimeError::division_by_zero()).at(9);
        assert!(matches!(err, TraceError::Runtime(ref e) if e.line == Some(9)));

        let limit = TraceError::from(ResourceExceeded {
            resource: Resource::Steps,
            limit: 10,
            line: 2,
        })
        .at(9);
        assert!(matches!(limit, TraceError::ResourceExceeded(ref e) if e.line == 2));
    }

    #[test]
    fn test_resource_exceeded_display() {
        let err = ResourceExceeded {
            resource: Resource::CallDepth,
            limit: 1000,
            line: 3,
        };
        assert_eq!(
            err.to_string(),
            "resource exceeded at line 3: call-depth limit of 1000 reached"
        );
    }
}
