//! Indentation layout for Python sources
//!
//! Rewrites the raw token stream so that logical lines end with `Newline`
//! and indentation changes become `Indent`/`Dedent`. Line breaks inside
//! brackets and blank lines produce nothing.

use super::Token;
use crate::ast::{LineIndex, Span};
use crate::error::SyntaxError;

const TAB_WIDTH: usize = 8;

pub(super) fn apply(
    source: &str,
    raw: Vec<(Token, Span)>,
    lines: &LineIndex,
) -> Result<Vec<(Token, Span)>, SyntaxError> {
    let mut out = Vec::with_capacity(raw.len() + 16);
    let mut indents = vec![0usize];
    let mut depth = 0usize;
    let mut line_open = false;
    let mut last_end = 0usize;

    for (token, span) in raw {
        if token == Token::Newline {
            if depth == 0 && line_open {
                out.push((Token::Newline, Span::new(span.start, span.start)));
                line_open = false;
            }
            continue;
        }

        if !line_open && depth == 0 {
            let width = indent_width(source, span.start);
            let here = Span::new(span.start, span.start);
            let current = *indents.last().unwrap_or(&0);
            if width > current {
                indents.push(width);
                out.push((Token::Indent, here));
            } else {
                while width < *indents.last().unwrap_or(&0) {
                    indents.pop();
                    out.push((Token::Dedent, here));
                }
                if width != *indents.last().unwrap_or(&0) {
                    return Err(SyntaxError::new(
                        "unindent does not match any outer indentation level",
                        span,
                        lines,
                    ));
                }
            }
        }
        line_open = true;

        match token {
            Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => depth = depth.saturating_sub(1),
            _ => {}
        }
        last_end = span.end;
        out.push((token, span));
    }

    let eof = Span::new(last_end, last_end);
    if line_open {
        out.push((Token::Newline, eof));
    }
    while indents.len() > 1 {
        indents.pop();
        out.push((Token::Dedent, eof));
    }
    Ok(out)
}

/// Visual width of the whitespace before `offset` on its line
fn indent_width(source: &str, offset: usize) -> usize {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    source[line_start..offset].chars().fold(0, |width, c| match c {
        '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
        _ => width + 1,
    })
}
