//! Typed declarations for Java and C++
//!
//! Types are only read far enough to pick a default value and to size
//! allocations; the interpreter itself is untyped.

use super::{ParseResult, Parser};
use crate::ast::{Block, Expr, Function, Language, Span, Spanned, StmtKind, Target};
use crate::lexer::Token;
use num_bigint::BigInt;

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "final",
    "abstract",
    "synchronized",
    "inline",
    "constexpr",
    "signed",
    "unsigned",
    "struct",
];

const INTEGER_TYPES: &[&str] = &[
    "int", "long", "short", "byte", "char", "size_t", "Integer", "Long", "Short", "Byte",
    "Character", "int64_t", "int32_t", "uint64_t", "uint32_t",
];

const FLOAT_TYPES: &[&str] = &["double", "float", "Double", "Float"];

/// Growable sequence types, all modelled as arrays
const LIST_TYPES: &[&str] = &[
    "vector",
    "List",
    "ArrayList",
    "LinkedList",
    "Vector",
    "Array",
    "deque",
    "Deque",
    "ArrayDeque",
    "Stack",
];

/// A declared type, e.g. `vector<vector<int>>` or `int[][]`
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct TypeName {
    pub name: String,
    pub args: Vec<TypeName>,
    pub dims: usize,
}

impl TypeName {
    fn scalar(name: &str) -> Self {
        TypeName {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn is_list(&self) -> bool {
        self.dims > 0 || LIST_TYPES.contains(&self.name.as_str())
    }

    /// Element type of an array or list type
    fn element(&self) -> TypeName {
        if self.dims > 0 {
            TypeName {
                dims: self.dims - 1,
                ..self.clone()
            }
        } else {
            self.args.first().cloned().unwrap_or_default()
        }
    }
}

impl Parser<'_> {
    /// Read a type if one starts here; on failure the cursor is restored
    pub(super) fn try_type(&mut self) -> Option<TypeName> {
        let save = self.pos;
        let ty = self.type_inner(&mut false);
        if ty.is_none() {
            self.pos = save;
        }
        ty
    }

    fn type_inner(&mut self, closed_parent: &mut bool) -> Option<TypeName> {
        while matches!(self.peek(), Some(Token::Const))
            || MODIFIERS.iter().any(|m| self.check_ident(m))
        {
            self.advance();
        }

        let mut name = match self.peek() {
            Some(Token::Ident(name)) => name.clone(),
            Some(Token::Var) if self.language == Language::Java => "var".to_string(),
            _ => return None,
        };
        self.advance();
        while self.check(&Token::ColonColon) {
            self.advance();
            match self.advance() {
                Some((Token::Ident(segment), _)) => name = segment,
                _ => return None,
            }
        }
        // `long long`, `unsigned int`, `long double`
        while ["long", "int", "short", "double", "char"]
            .iter()
            .any(|w| self.check_ident(w))
            && matches!(name.as_str(), "long" | "short")
        {
            self.advance();
        }

        let mut ty = TypeName::scalar(&name);
        if self.eat(&Token::Lt) {
            ty.args = self.generic_args(closed_parent)?;
        }
        if *closed_parent {
            return Some(ty);
        }

        loop {
            if self.check(&Token::LBracket) && self.peek_at(1) == Some(&Token::RBracket) {
                self.pos += 2;
                ty.dims += 1;
            } else if matches!(
                self.peek(),
                Some(Token::Amp | Token::AndAnd | Token::Star | Token::StarStar | Token::Const)
            ) {
                self.advance();
            } else {
                return Some(ty);
            }
        }
    }

    /// Arguments of `<...>` after the opening `<`. A closing `>>` also closes
    /// the enclosing list, which is reported through `closed_parent`.
    fn generic_args(&mut self, closed_parent: &mut bool) -> Option<Vec<TypeName>> {
        let mut args = Vec::new();
        if self.eat(&Token::Gt) {
            return Some(args);
        }
        loop {
            let mut closed_here = false;
            args.push(self.type_inner(&mut closed_here)?);
            if closed_here {
                return Some(args);
            }
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat(&Token::Gt) {
                return Some(args);
            }
            if self.eat(&Token::Shr) {
                *closed_parent = true;
                return Some(args);
            }
            return None;
        }
    }

    /// Does a `Type name ...` declaration start here?
    pub(super) fn looks_like_declaration(&mut self) -> bool {
        let save = self.pos;
        let found = self.try_type().is_some()
            && matches!(self.peek(), Some(Token::Ident(_)))
            && matches!(
                self.peek_at(1),
                None | Some(
                    Token::Assign
                        | Token::Semi
                        | Token::Comma
                        | Token::LBracket
                        | Token::LParen
                        | Token::LBrace
                        | Token::Colon
                )
            );
        self.pos = save;
        found
    }

    /// `int a = 1, b;` / `int arr[n];` / `vector<int> v(n, 0);`
    pub(super) fn declaration(&mut self) -> ParseResult<StmtKind> {
        let start = self.span();
        let ty = self
            .try_type()
            .ok_or_else(|| self.unexpected("a type"))?;

        let mut targets = Vec::new();
        let mut values = Vec::new();
        loop {
            let (name, name_span) = self.ident()?;
            let mut declared = ty.clone();
            let mut counts = Vec::new();
            while self.eat(&Token::LBracket) {
                declared.dims += 1;
                if !self.check(&Token::RBracket) {
                    counts.push(self.expression()?);
                }
                self.expect(&Token::RBracket)?;
            }

            let value = if self.eat(&Token::Assign) {
                self.initializer()?
            } else if self.check(&Token::LBrace) {
                self.initializer()?
            } else if self.check(&Token::LParen) {
                let args = self.call_args()?;
                self.constructed(&declared, args, name_span)?
            } else if !counts.is_empty() {
                let elem = TypeName {
                    dims: declared.dims - counts.len(),
                    ..declared.clone()
                };
                self.allocation(&elem, counts, name_span)
            } else {
                Spanned::new(default_value(&declared), name_span)
            };
            targets.push(Target::Var(name));
            values.push(value);
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        if targets.is_empty() {
            return Err(self.error_at("declaration without a name", start));
        }
        Ok(StmtKind::Assign {
            targets,
            op: None,
            values,
        })
    }

    /// An expression or a `{a, b}` initializer list
    pub(super) fn initializer(&mut self) -> ParseResult<Spanned<Expr>> {
        if self.language.uses_indentation() || !self.check(&Token::LBrace) {
            return self.expression();
        }
        let start = self.span().start;
        self.advance();
        let mut items = Vec::new();
        while !self.check(&Token::RBrace) {
            items.push(self.initializer()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(self.spanned(Expr::Array(items), start))
    }

    /// `vector<int>(n)` / `vector<int>(n, fill)`; other types take their argument as is
    pub(super) fn constructed(
        &self,
        ty: &TypeName,
        mut args: Vec<Spanned<Expr>>,
        span: Span,
    ) -> ParseResult<Spanned<Expr>> {
        if !ty.is_list() {
            return match args.len() {
                0 => Ok(Spanned::new(default_value(ty), span)),
                1 => Ok(args.remove(0)),
                _ => Err(self.error_at(
                    format!("cannot construct '{}' from several arguments", ty.name),
                    span,
                )),
            };
        }
        match args.len() {
            0 => Ok(Spanned::new(Expr::Array(Vec::new()), span)),
            1 => Ok(self.allocation(&ty.element(), args, span)),
            2 => {
                let fill = args.remove(1);
                let count = args.remove(0);
                Ok(Spanned::new(
                    Expr::Alloc {
                        fill: Box::new(fill),
                        count: Box::new(count),
                    },
                    span,
                ))
            }
            _ => Err(self.error_at("too many constructor arguments", span)),
        }
    }

    /// Nested allocation `counts[0] x counts[1] x ...` of default elements
    pub(super) fn allocation(
        &self,
        elem: &TypeName,
        counts: Vec<Spanned<Expr>>,
        span: Span,
    ) -> Spanned<Expr> {
        counts
            .into_iter()
            .rev()
            .fold(Spanned::new(default_value(elem), span), |fill, count| {
                Spanned::new(
                    Expr::Alloc {
                        fill: Box::new(fill),
                        count: Box::new(count),
                    },
                    span,
                )
            })
    }

    /// `new int[n][m]`, `new int[]{1, 2}`, `new ArrayList<>()`, `new Array(n)`
    pub(super) fn new_expr(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span();
        self.advance();
        let mut ty = TypeName::scalar(&self.ident()?.0);
        if self.eat(&Token::Lt) {
            ty.args = self
                .generic_args(&mut false)
                .ok_or_else(|| self.unexpected("a type argument"))?;
        }

        if self.check(&Token::LBracket) {
            let mut counts = Vec::new();
            let mut dims = 0;
            while self.eat(&Token::LBracket) {
                dims += 1;
                if !self.check(&Token::RBracket) {
                    counts.push(self.expression()?);
                }
                self.expect(&Token::RBracket)?;
            }
            if counts.is_empty() {
                return self.initializer();
            }
            let elem = TypeName {
                dims: dims - counts.len(),
                ..ty
            };
            let span = Span::new(start.start, self.prev_end());
            return Ok(self.allocation(&elem, counts, span));
        }

        let args = if self.check(&Token::LParen) {
            self.call_args()?
        } else {
            Vec::new()
        };
        let span = Span::new(start.start, self.prev_end());
        if ty.name == "Array" && args.len() == 1 {
            // `new Array(n)` holds `n` empty slots
            let mut args = args;
            return Ok(Spanned::new(
                Expr::Alloc {
                    fill: Box::new(Spanned::new(Expr::Null, span)),
                    count: Box::new(args.remove(0)),
                },
                span,
            ));
        }
        if ty.is_list() {
            return Ok(Spanned::new(Expr::Array(Vec::new()), span));
        }
        Err(self.error_at(format!("unsupported type '{}'", ty.name), span))
    }

    /// One top-level item of a Java or C++ source
    pub(super) fn member(
        &mut self,
        functions: &mut Vec<Function>,
        body: &mut Block,
    ) -> ParseResult<()> {
        if ["using", "import", "package", "typedef"]
            .iter()
            .any(|w| self.check_ident(w))
        {
            while !self.at_end() && !self.eat(&Token::Semi) {
                self.advance();
            }
            return Ok(());
        }

        let save = self.pos;
        while MODIFIERS.iter().any(|m| self.check_ident(m)) {
            self.advance();
        }
        if self.check(&Token::Class) {
            return self.class_body(functions, body);
        }
        // `public:` access labels
        if self.pos > save && self.eat(&Token::Colon) {
            return Ok(());
        }
        self.pos = save;

        match self.function_shape() {
            Some(true) => functions.push(self.typed_function()?),
            Some(false) => {
                // prototype
                while !self.at_end() && !self.eat(&Token::Semi) {
                    self.advance();
                }
            }
            None => body.push(self.statement()?),
        }
        Ok(())
    }

    /// `class Main { ... }`: members are flattened into the program
    fn class_body(&mut self, functions: &mut Vec<Function>, body: &mut Block) -> ParseResult<()> {
        self.advance();
        self.ident()?;
        while !self.check(&Token::LBrace) {
            if self.advance().is_none() {
                return Err(self.unexpected("'{'"));
            }
        }
        let open = self.expect(&Token::LBrace)?;
        loop {
            if self.eat(&Token::RBrace) {
                self.eat(&Token::Semi);
                return Ok(());
            }
            if self.at_end() {
                return Err(self.error_at("unterminated block: '{' is never closed", open));
            }
            if self.eat(&Token::Semi) {
                continue;
            }
            self.member(functions, body)?;
        }
    }

    /// `Some(true)` for a definition `T name(...) {`, `Some(false)` for a
    /// prototype `T name(T x);`, `None` for anything else
    fn function_shape(&mut self) -> Option<bool> {
        let save = self.pos;
        let shape = self.function_shape_inner();
        self.pos = save;
        shape
    }

    fn function_shape_inner(&mut self) -> Option<bool> {
        self.try_type()?;
        if !matches!(self.peek(), Some(Token::Ident(_))) || self.peek_at(1) != Some(&Token::LParen) {
            return None;
        }
        self.pos += 2;
        let params_typed = self.check(&Token::RParen)
            || self.check_ident("void")
            || (self.try_type().is_some() && matches!(self.peek(), Some(Token::Ident(_))));

        let mut depth = 1;
        while depth > 0 {
            match self.advance()?.0 {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                _ => {}
            }
        }
        self.skip_signature_tail();
        match self.peek() {
            Some(Token::LBrace) => Some(true),
            Some(Token::Semi) if params_typed => Some(false),
            _ => None,
        }
    }

    /// `const`, `throws A, B` after a parameter list
    fn skip_signature_tail(&mut self) {
        while self.eat(&Token::Const) {}
        if self.eat_ident("throws") {
            while matches!(self.peek(), Some(Token::Ident(_) | Token::Comma | Token::Dot)) {
                self.advance();
            }
        }
    }

    /// `int fib(int n) { ... }`
    fn typed_function(&mut self) -> ParseResult<Function> {
        let start = self.span();
        self.try_type()
            .ok_or_else(|| self.unexpected("a return type"))?;
        let (name, _) = self.ident()?;

        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if self.check_ident("void") && self.peek_at(1) == Some(&Token::RParen) {
            self.advance();
        }
        while !self.check(&Token::RParen) {
            if self.try_type().is_none() {
                return Err(self.unexpected("a parameter type"));
            }
            let (param, span) = self.ident()?;
            while self.check(&Token::LBracket) && self.peek_at(1) == Some(&Token::RBracket) {
                self.pos += 2;
            }
            if params.contains(&param) {
                return Err(self.error_at(format!("duplicate parameter '{param}'"), span));
            }
            params.push(param);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        self.skip_signature_tail();

        let body = self.braced_block()?;
        Ok(Function {
            name,
            params,
            body,
            line: self.line_of(start),
            span: Span::new(start.start, self.prev_end()),
        })
    }
}

/// Value of a declared but uninitialised variable
fn default_value(ty: &TypeName) -> Expr {
    if ty.dims > 0 {
        return Expr::Null;
    }
    let name = ty.name.as_str();
    if INTEGER_TYPES.contains(&name) {
        Expr::Int(BigInt::from(0))
    } else if FLOAT_TYPES.contains(&name) {
        Expr::Float(0.0)
    } else if matches!(name, "bool" | "boolean" | "Boolean") {
        Expr::Bool(false)
    } else if matches!(name, "string" | "String") {
        Expr::Str(String::new())
    } else if ty.is_list() {
        Expr::Array(Vec::new())
    } else {
        Expr::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_value(&TypeName::scalar("int")), Expr::Int(BigInt::from(0)));
        assert_eq!(default_value(&TypeName::scalar("double")), Expr::Float(0.0));
        assert_eq!(default_value(&TypeName::scalar("boolean")), Expr::Bool(false));
        assert_eq!(default_value(&TypeName::scalar("vector")), Expr::Array(Vec::new()));
        let array = TypeName {
            dims: 1,
            ..TypeName::scalar("int")
        };
        assert_eq!(default_value(&array), Expr::Null);
    }

    #[test]
    fn test_element_type() {
        let nested = TypeName {
            name: "vector".into(),
            args: vec![TypeName {
                name: "vector".into(),
                args: vec![TypeName::scalar("int")],
                dims: 0,
            }],
            dims: 0,
        };
        assert_eq!(nested.element().name, "vector");
        assert_eq!(nested.element().element().name, "int");
    }
}
