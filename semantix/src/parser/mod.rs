//! Recursive-descent parser for every surface dialect
//!
//! Python, JavaScript, Java and C++ sources all lower into the statement
//! language in [`crate::ast`]; expressions are parsed by precedence climbing.
//! Parsing never partially succeeds: the first error aborts with a
//! [`SyntaxError`] and no AST.

mod decl;
mod expr;
mod stmt;

#[cfg(test)]
mod tests;

use crate::ast::{Expr, Function, Language, LineIndex, Program, Span, Spanned};
use crate::error::SyntaxError;
use crate::lexer::{tokenize, Token};

pub type ParseResult<T> = Result<T, SyntaxError>;

/// Parse a whole program
pub fn parse(source: &str, language: Language) -> ParseResult<Program> {
    let tokens = tokenize(source, language)?;
    let mut parser = Parser::new(source, tokens, language);
    let program = parser.program()?;
    log::debug!(
        "parsed {} program: {} function(s), {} top-level statement(s)",
        language,
        program.functions.len(),
        program.body.len()
    );
    Ok(program)
}

/// Parse a single expression, e.g. the right-hand side of an input binding
pub fn parse_expression(source: &str, language: Language) -> ParseResult<Spanned<Expr>> {
    let tokens = tokenize(source, language)?;
    let mut parser = Parser::new(source, tokens, language);
    let expr = parser.expression()?;
    while parser.eat(&Token::Newline) || parser.eat(&Token::Semi) {}
    if !parser.at_end() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expr)
}

pub(crate) struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
    lines: LineIndex,
    language: Language,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<(Token, Span)>, language: Language) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
            lines: LineIndex::new(source),
            language,
        }
    }

    fn program(&mut self) -> ParseResult<Program> {
        let mut functions: Vec<Function> = Vec::new();
        let mut body = Vec::new();

        while !self.at_end() {
            if self.eat(&Token::Newline) || self.eat(&Token::Semi) {
                continue;
            }
            match self.language {
                Language::Python | Language::JavaScript => {
                    if self.check(&Token::Def) || self.check(&Token::Function) {
                        functions.push(self.function()?);
                    } else {
                        body.push(self.statement()?);
                    }
                }
                Language::Java | Language::Cpp => self.member(&mut functions, &mut body)?,
            }
        }

        for (i, f) in functions.iter().enumerate() {
            if functions[..i].iter().any(|g| g.name == f.name) {
                return Err(self.error_at(
                    format!("function '{}' is defined more than once", f.name),
                    f.span,
                ));
            }
        }

        if self.language.has_entry_point() {
            if let Some(i) = functions.iter().position(|f| f.name == "main") {
                let main = functions.remove(i);
                body.extend(main.body);
            }
        }

        Ok(Program {
            language: self.language,
            functions,
            body,
        })
    }

    /// `def name(a, b):` or `function name(a, b) { ... }`
    fn function(&mut self) -> ParseResult<Function> {
        let start = self.span();
        self.advance();
        let (name, _) = self.ident()?;

        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            let (param, span) = self.ident()?;
            if params.contains(&param) {
                return Err(self.error_at(format!("duplicate parameter '{param}'"), span));
            }
            params.push(param);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        let body = self.block()?;
        Ok(Function {
            name,
            params,
            body,
            line: self.line_of(start),
            span: Span::new(start.start, self.prev_end()),
        })
    }

    // ---- token cursor ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn check_ident(&self, name: &str) -> bool {
        self.ident_at(0, name)
    }

    fn ident_at(&self, n: usize, name: &str) -> bool {
        matches!(self.peek_at(n), Some(Token::Ident(s)) if s == name)
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.check_ident(name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> ParseResult<Span> {
        if self.check(token) {
            let span = self.span();
            self.pos += 1;
            Ok(span)
        } else {
            Err(self.unexpected(&format!("'{token}'")))
        }
    }

    fn ident(&mut self) -> ParseResult<(String, Span)> {
        match self.tokens.get(self.pos) {
            Some((Token::Ident(name), span)) => {
                let out = (name.clone(), *span);
                self.pos += 1;
                Ok(out)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    /// Span of the current token, or an empty span at the end of input
    fn span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => *span,
            None => self.eof_span(),
        }
    }

    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map_or(0, |(_, span)| span.end);
        Span::new(end, end)
    }

    fn prev_end(&self) -> usize {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some((_, span)) => span.end,
            None => 0,
        }
    }

    // ---- diagnostics ----

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.tokens.get(self.pos) {
            Some((token, span)) => self.error_at(
                format!("expected {expected}, found '{token}'"),
                *span,
            ),
            None => self.error_at(
                format!("expected {expected}, found end of input"),
                self.eof_span(),
            ),
        }
    }

    fn error_at(&self, message: impl Into<String>, span: Span) -> SyntaxError {
        SyntaxError::new(message, span, &self.lines)
    }

    fn line_of(&self, span: Span) -> u32 {
        self.lines.line(span.start)
    }

    /// Verbatim source text of a span
    fn text(&self, span: Span) -> String {
        self.source
            .get(span.start..span.end)
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    fn spanned<T>(&self, node: T, start: usize) -> Spanned<T> {
        Spanned::new(node, Span::new(start, self.prev_end().max(start)))
    }
}
