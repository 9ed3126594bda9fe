//! Error types and reporting

use crate::ast::{LineIndex, Span};
use crate::interp::{ResourceExceeded, RuntimeError, TraceError};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Malformed source or input; parsing aborts and yields no AST
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span, lines: &LineIndex) -> Self {
        let (line, column) = lines.line_col(span.start);
        SyntaxError {
            line,
            column,
            message: message.into(),
            span,
        }
    }

    /// Error on a given line when no byte span is available (input bindings)
    pub fn on_line(message: impl Into<String>, line: u32) -> Self {
        SyntaxError {
            line,
            column: 1,
            message: message.into(),
            span: Span::default(),
        }
    }
}

/// The single structured error an analysis request can fail with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    ResourceExceeded(#[from] ResourceExceeded),
}

impl From<TraceError> for AnalysisError {
    fn from(e: TraceError) -> Self {
        match e {
            TraceError::Runtime(e) => AnalysisError::Runtime(e),
            TraceError::ResourceExceeded(e) => AnalysisError::ResourceExceeded(e),
        }
    }
}

impl AnalysisError {
    /// `syntax`, `runtime` or `resourceExceeded`
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Syntax(_) => "syntax",
            AnalysisError::Runtime(_) => "runtime",
            AnalysisError::ResourceExceeded(_) => "resourceExceeded",
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            AnalysisError::Syntax(e) => Some(e.line),
            AnalysisError::Runtime(e) => e.line,
            AnalysisError::ResourceExceeded(e) => Some(e.line),
        }
    }

    pub fn message(&self) -> String {
        match self {
            AnalysisError::Syntax(e) => e.message.clone(),
            AnalysisError::Runtime(e) => e.message.clone(),
            AnalysisError::ResourceExceeded(e) => {
                format!("{} of {} reached", e.resource, e.limit)
            }
        }
    }

    /// Source range to underline in a report
    fn range(&self, source: &str) -> std::ops::Range<usize> {
        if let AnalysisError::Syntax(e) = self {
            if e.span != Span::default() {
                let end = e.span.end.max(e.span.start + 1).min(source.len());
                return e.span.start.min(end)..end;
            }
        }
        match self.line() {
            Some(line) => line_range(source, line),
            None => 0..0,
        }
    }
}

/// Byte range of a 1-based line, without its newline
fn line_range(source: &str, line: u32) -> std::ops::Range<usize> {
    let mut start = 0;
    for (i, text) in source.split('\n').enumerate() {
        if i + 1 == line as usize {
            return start..start + text.len();
        }
        start += text.len() + 1;
    }
    source.len()..source.len()
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &AnalysisError) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = match error {
        AnalysisError::Syntax(_) => "Syntax".to_string(),
        AnalysisError::Runtime(e) => format!("Runtime ({})", e.kind),
        AnalysisError::ResourceExceeded(_) => "Resource".to_string(),
    };
    let range = error.range(source);

    let printed = Report::build(ReportKind::Error, (filename, range.clone()))
        .with_message(format!("{kind} error"))
        .with_label(
            Label::new((filename, range))
                .with_message(error.message())
                .with_color(Color::Red),
        )
        .finish()
        .eprint((filename, Source::from(source)));

    if printed.is_err() {
        eprintln!("{kind} error: {}", error.message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Resource;

    #[test]
    fn test_syntax_error_position() {
        let lines = LineIndex::new("a = 1\nb = (\n");
        let err = SyntaxError::new("unclosed paren", Span::new(10, 11), &lines);
        assert_eq!((err.line, err.column), (2, 5));
        assert_eq!(
            err.to_string(),
            "syntax error at line 2, column 5: unclosed paren"
        );
    }

    #[test]
    fn test_analysis_error_kinds() {
        let syntax = AnalysisError::from(SyntaxError::on_line("bad", 3));
        assert_eq!(syntax.kind(), "syntax");
        assert_eq!(syntax.line(), Some(3));

        let runtime = AnalysisError::from(RuntimeError::division_by_zero().at(5));
        assert_eq!(runtime.kind(), "runtime");
        assert_eq!(runtime.line(), Some(5));

        let resource = AnalysisError::from(TraceError::from(ResourceExceeded {
            resource: Resource::Steps,
            limit: 5,
            line: 1,
        }));
        assert_eq!(resource.kind(), "resourceExceeded");
        assert!(resource.message().contains("executed-step limit of 5"));
    }

    #[test]
    fn test_line_range() {
        let src = "first\nsecond\nthird";
        assert_eq!(&src[line_range(src, 2)], "second");
        assert_eq!(&src[line_range(src, 3)], "third");
        assert_eq!(line_range(src, 9), src.len()..src.len());
    }
}
