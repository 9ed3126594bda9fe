//! Expressions, by precedence climbing
//!
//! Method calls and dialect spellings of the built-ins are lowered here, so
//! `v.push_back(x)`, `xs.push(x)` and `xs.append(x)` all become
//! `append(v, x)` and `arr.length` becomes `len(arr)`.

use super::{ParseResult, Parser};
use crate::ast::{BinOp, Expr, Language, Span, Spanned, UnOp};
use crate::lexer::Token;
use num_bigint::BigInt;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Receivers whose methods are plain built-ins (`Math.max(a, b)` is `max(a, b)`)
const NAMESPACES: &[&str] = &[
    "Math", "math", "Integer", "Long", "Double", "String", "Character", "std", "Number",
];

type Boxed = Box<Spanned<Expr>>;

fn boxed(e: Spanned<Expr>) -> Boxed {
    Box::new(e)
}

impl Parser<'_> {
    pub(super) fn expression(&mut self) -> ParseResult<Spanned<Expr>> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.ternary())
    }

    /// Python `return a, b` packs into an array
    pub(super) fn expression_list(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let first = self.expression()?;
        if !self.language.uses_indentation() || !self.check(&Token::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&Token::Comma) {
            if matches!(self.peek(), None | Some(Token::Newline | Token::Semi)) {
                break;
            }
            items.push(self.expression()?);
        }
        Ok(self.spanned(Expr::Array(items), start))
    }

    fn ternary(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let first = self.or_expr()?;

        if self.language.uses_indentation() && self.check(&Token::If) {
            self.advance();
            let cond = self.or_expr()?;
            self.expect(&Token::Else)?;
            let otherwise = self.ternary()?;
            return Ok(self.spanned(
                Expr::Conditional {
                    cond: boxed(cond),
                    then: boxed(first),
                    otherwise: boxed(otherwise),
                },
                start,
            ));
        }

        if !self.language.uses_indentation() && self.eat(&Token::Question) {
            let then = self.ternary()?;
            self.expect(&Token::Colon)?;
            let otherwise = self.ternary()?;
            return Ok(self.spanned(
                Expr::Conditional {
                    cond: boxed(first),
                    then: boxed(then),
                    otherwise: boxed(otherwise),
                },
                start,
            ));
        }
        Ok(first)
    }

    fn or_expr(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let mut left = self.and_expr()?;
        while self.eat(&Token::Or) || self.eat(&Token::OrOr) {
            let right = self.and_expr()?;
            left = self.binary(left, BinOp::Or, right, start);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let mut left = self.not_expr()?;
        while self.eat(&Token::And) || self.eat(&Token::AndAnd) {
            let right = self.not_expr()?;
            left = self.binary(left, BinOp::And, right, start);
        }
        Ok(left)
    }

    /// Python `not` binds looser than comparisons
    fn not_expr(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        if self.eat(&Token::Not) {
            let expr = self.not_expr()?;
            return Ok(self.spanned(
                Expr::Unary {
                    op: UnOp::Not,
                    expr: boxed(expr),
                },
                start,
            ));
        }
        self.comparison()
    }

    fn comparison_op(&mut self) -> Option<BinOp> {
        let op = match self.peek()? {
            Token::EqEq => BinOp::Eq,
            Token::NotEq => BinOp::Ne,
            Token::Lt => BinOp::Lt,
            Token::Gt => BinOp::Gt,
            Token::LtEq => BinOp::Le,
            Token::GtEq => BinOp::Ge,
            Token::In => BinOp::In,
            Token::Not if self.peek_at(1) == Some(&Token::In) => {
                self.pos += 2;
                return Some(BinOp::NotIn);
            }
            Token::Ident(word) if word == "is" && self.language == Language::Python => {
                self.advance();
                return Some(if self.eat(&Token::Not) {
                    BinOp::Ne
                } else {
                    BinOp::Eq
                });
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// Comparisons; Python chains `a < b < c` into `a < b and b < c`
    fn comparison(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let mut left = self.shift()?;
        let mut last = left.clone();
        let mut chained = false;
        while let Some(op) = self.comparison_op() {
            let right = self.shift()?;
            if self.language.uses_indentation() && chained {
                let link_start = last.span.start;
                let link = self.binary(last, op, right.clone(), link_start);
                left = self.binary(left, BinOp::And, link, start);
            } else {
                left = self.binary(left, op, right.clone(), start);
            }
            last = right;
            chained = true;
        }
        Ok(left)
    }

    fn shift(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Shl) => BinOp::Shl,
                Some(Token::Shr) => BinOp::Shr,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.additive()?;
            left = self.binary(left, op, right, start);
        }
    }

    pub(super) fn additive(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = self.binary(left, op, right, start);
        }
    }

    fn multiplicative(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => self.slash_op(),
                Some(Token::SlashSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => self.percent_op(),
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;

            // `[fill] * count`
            left = match left.node {
                Expr::Array(mut items) if op == BinOp::Mul && items.len() == 1 => self.spanned(
                    Expr::Alloc {
                        fill: boxed(items.remove(0)),
                        count: boxed(right),
                    },
                    start,
                ),
                node => self.binary(Spanned::new(node, left.span), op, right, start),
            };
        }
    }

    pub(super) fn slash_op(&self) -> BinOp {
        match self.language {
            Language::Python => BinOp::TrueDiv,
            Language::JavaScript => BinOp::NumDiv,
            Language::Java | Language::Cpp => BinOp::Div,
        }
    }

    pub(super) fn percent_op(&self) -> BinOp {
        match self.language {
            Language::Python => BinOp::FloorMod,
            _ => BinOp::Mod,
        }
    }

    fn unary(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnOp::Neg),
            Some(Token::Bang) => Some(UnOp::Not),
            Some(Token::Plus) => None,
            Some(Token::PlusPlus | Token::MinusMinus) => {
                return Err(self.error_at(
                    "increment and decrement are only supported as statements",
                    self.span(),
                ))
            }
            _ => return self.power(),
        };
        self.advance();
        let expr = self.unary()?;
        Ok(match op {
            Some(op) => self.spanned(
                Expr::Unary {
                    op,
                    expr: boxed(expr),
                },
                start,
            ),
            None => expr,
        })
    }

    /// `**` is right-associative and binds tighter than a unary minus on its left
    fn power(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let base = self.postfix()?;
        if self.eat(&Token::StarStar) {
            let exponent = self.unary()?;
            return Ok(self.binary(base, BinOp::Pow, exponent, start));
        }
        Ok(base)
    }

    pub(super) fn postfix(&mut self) -> ParseResult<Spanned<Expr>> {
        let start = self.span().start;
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    let Expr::Var(func) = &expr.node else {
                        return Err(self.error_at("only named functions can be called", expr.span));
                    };
                    let func = func.clone();
                    let args = self.call_args()?;
                    expr = self.spanned(Expr::Call { func, args }, start);
                }
                Some(Token::LBracket) => {
                    self.advance();
                    expr = self.subscript(expr, start)?;
                }
                Some(Token::Dot) => {
                    self.advance();
                    let (member, member_span) = self.ident()?;
                    expr = if self.check(&Token::LParen) {
                        let args = self.call_args()?;
                        self.method(expr, &member, args, start)?
                    } else {
                        self.field(expr, &member, member_span, start)?
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `base[index]` or `base[start:end]`, after the `[`
    fn subscript(&mut self, base: Spanned<Expr>, start: usize) -> ParseResult<Spanned<Expr>> {
        let lower = if self.check(&Token::Colon) {
            None
        } else {
            Some(self.expression()?)
        };
        if self.language.uses_indentation() && self.eat(&Token::Colon) {
            let upper = if self.check(&Token::RBracket) {
                None
            } else {
                Some(self.expression()?)
            };
            self.expect(&Token::RBracket)?;
            return Ok(self.spanned(
                Expr::Slice {
                    base: boxed(base),
                    start: lower.map(boxed),
                    end: upper.map(boxed),
                },
                start,
            ));
        }
        let index = lower.ok_or_else(|| self.unexpected("an index"))?;
        self.expect(&Token::RBracket)?;
        Ok(self.spanned(
            Expr::Index {
                base: boxed(base),
                index: boxed(index),
            },
            start,
        ))
    }

    /// `recv.name(args)`
    fn method(
        &mut self,
        receiver: Spanned<Expr>,
        name: &str,
        mut args: Vec<Spanned<Expr>>,
        start: usize,
    ) -> ParseResult<Spanned<Expr>> {
        if let Expr::Var(ns) = &receiver.node {
            if NAMESPACES.contains(&ns.as_str()) {
                let func = match name {
                    "parseInt" | "parseLong" | "trunc" => "int",
                    "parseDouble" | "parseFloat" => "float",
                    "valueOf" | "toString" => "str",
                    other => other,
                };
                return Ok(self.call(func, args, start));
            }
        }

        let arity = args.len();
        let expr = match (name, arity) {
            ("append" | "push" | "push_back" | "add" | "addLast" | "offer", 1) => {
                args.insert(0, receiver);
                Expr::Call {
                    func: "append".into(),
                    args,
                }
            }
            ("pop" | "pop_back" | "removeLast" | "remove", _) => {
                args.insert(0, receiver);
                Expr::Call {
                    func: "pop".into(),
                    args,
                }
            }
            ("size" | "length" | "len", 0) => Expr::Call {
                func: "len".into(),
                args: vec![receiver],
            },
            ("get" | "charAt" | "at", 1) => Expr::Index {
                base: boxed(receiver),
                index: boxed(args.remove(0)),
            },
            ("slice" | "substring" | "subList", 1 | 2) => {
                let end = if arity == 2 { Some(boxed(args.remove(1))) } else { None };
                Expr::Slice {
                    base: boxed(receiver),
                    start: Some(boxed(args.remove(0))),
                    end,
                }
            }
            ("isEmpty" | "empty", 0) => {
                let span = receiver.span;
                let len = Spanned::new(
                    Expr::Call {
                        func: "len".into(),
                        args: vec![receiver],
                    },
                    span,
                );
                let zero = Spanned::new(Expr::Int(BigInt::from(0)), span);
                Expr::Binary {
                    left: boxed(len),
                    op: BinOp::Eq,
                    right: boxed(zero),
                }
            }
            ("contains" | "includes", 1) => Expr::Binary {
                left: boxed(args.remove(0)),
                op: BinOp::In,
                right: boxed(receiver),
            },
            ("equals", 1) => Expr::Binary {
                left: boxed(receiver),
                op: BinOp::Eq,
                right: boxed(args.remove(0)),
            },
            ("fill", 1) => match receiver.node {
                // `new Array(n).fill(0)`
                Expr::Alloc { count, .. } => Expr::Alloc {
                    fill: boxed(args.remove(0)),
                    count,
                },
                node => {
                    args.insert(0, Spanned::new(node, receiver.span));
                    Expr::Call {
                        func: "fill".into(),
                        args,
                    }
                }
            },
            ("toString", 0) => Expr::Call {
                func: "str".into(),
                args: vec![receiver],
            },
            ("indexOf" | "index", 1) => {
                args.insert(0, receiver);
                Expr::Call {
                    func: "index".into(),
                    args,
                }
            }
            (other, _) => {
                args.insert(0, receiver);
                Expr::Call {
                    func: other.to_string(),
                    args,
                }
            }
        };
        Ok(self.spanned(expr, start))
    }

    /// `recv.name` without a call
    fn field(
        &self,
        receiver: Spanned<Expr>,
        name: &str,
        name_span: Span,
        start: usize,
    ) -> ParseResult<Spanned<Expr>> {
        let constant = match (&receiver.node, name) {
            (Expr::Var(ns), "MAX_VALUE") if ns == "Integer" => Some(Expr::Int(BigInt::from(i32::MAX))),
            (Expr::Var(ns), "MIN_VALUE") if ns == "Integer" => Some(Expr::Int(BigInt::from(i32::MIN))),
            (Expr::Var(ns), "MAX_VALUE") if ns == "Long" => Some(Expr::Int(BigInt::from(i64::MAX))),
            (Expr::Var(ns), "MIN_VALUE") if ns == "Long" => Some(Expr::Int(BigInt::from(i64::MIN))),
            (Expr::Var(ns), "MAX_SAFE_INTEGER") if ns == "Number" => {
                Some(Expr::Int(BigInt::from((1i64 << 53) - 1)))
            }
            (Expr::Var(ns), "PI") if ns == "Math" => Some(Expr::Float(std::f64::consts::PI)),
            (Expr::Var(ns), "pi") if ns == "math" => Some(Expr::Float(std::f64::consts::PI)),
            (Expr::Var(ns), "inf") if ns == "math" => Some(Expr::Float(f64::INFINITY)),
            (Expr::Var(ns), _) if NAMESPACES.contains(&ns.as_str()) => {
                return Err(self.error_at(format!("unsupported constant '{ns}.{name}'"), name_span))
            }
            (_, "length" | "size") => {
                return Ok(self.call("len", vec![receiver], start));
            }
            _ => None,
        };
        match constant {
            Some(value) => Ok(self.spanned(value, start)),
            None => Err(self.error_at(format!("unsupported member access '.{name}'"), name_span)),
        }
    }

    fn primary(&mut self) -> ParseResult<Spanned<Expr>> {
        let Some((token, span)) = self.advance() else {
            return Err(self.unexpected("an expression"));
        };
        let start = span.start;
        let node = match token {
            Token::IntLit(n) => Expr::Int(n),
            Token::FloatLit(x) => Expr::Float(x),
            Token::StringLit(s) => Expr::Str(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::Ident(name) => return self.name(name, span),
            Token::LParen => return self.parenthesized(start),
            Token::LBracket => return self.array_literal(start),
            Token::LBrace if !self.language.uses_indentation() => {
                self.pos -= 1;
                return self.initializer();
            }
            Token::New => {
                self.pos -= 1;
                return self.new_expr();
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("an expression"));
            }
        };
        Ok(Spanned::new(node, span))
    }

    /// Identifier in expression position, including `std::` paths and the
    /// dialects' named constants
    fn name(&mut self, mut name: String, span: Span) -> ParseResult<Spanned<Expr>> {
        let start = span.start;
        while self.check(&Token::ColonColon) {
            self.advance();
            name = self.ident()?.0;
        }

        match (self.language, name.as_str()) {
            (Language::Cpp, "INT_MAX") => return Ok(self.spanned(Expr::Int(BigInt::from(i32::MAX)), start)),
            (Language::Cpp, "INT_MIN") => return Ok(self.spanned(Expr::Int(BigInt::from(i32::MIN)), start)),
            (Language::Cpp, "LLONG_MAX" | "LONG_MAX") => {
                return Ok(self.spanned(Expr::Int(BigInt::from(i64::MAX)), start))
            }
            (Language::Cpp, "LLONG_MIN" | "LONG_MIN") => {
                return Ok(self.spanned(Expr::Int(BigInt::from(i64::MIN)), start))
            }
            (Language::JavaScript, "Infinity") => {
                return Ok(self.spanned(Expr::Float(f64::INFINITY), start))
            }
            // `vector<int>(n, 0)`
            (Language::Cpp, _) if self.check(&Token::Lt) && name == "vector" => {
                self.pos -= 1;
                let ty = self
                    .try_type()
                    .ok_or_else(|| self.unexpected("a type"))?;
                let args = self.call_args()?;
                let span = Span::new(start, self.prev_end());
                return self.constructed(&ty, args, span);
            }
            // `static_cast<int>(x)`
            (Language::Cpp, "static_cast") => {
                self.expect(&Token::Lt)?;
                let target = self.ident()?.0;
                self.expect(&Token::Gt)?;
                self.expect(&Token::LParen)?;
                let value = self.expression()?;
                self.expect(&Token::RParen)?;
                return Ok(self.cast(&target, value, start));
            }
            _ => {}
        }
        Ok(self.spanned(Expr::Var(name), start))
    }

    /// `( ... )`: grouping, a Python tuple, or a Java/C++ cast
    fn parenthesized(&mut self, start: usize) -> ParseResult<Spanned<Expr>> {
        if matches!(self.language, Language::Java | Language::Cpp)
            && self.peek_at(1) == Some(&Token::RParen)
        {
            if let Some(Token::Ident(ty)) = self.peek() {
                if matches!(
                    ty.as_str(),
                    "int" | "long" | "short" | "char" | "double" | "float"
                ) {
                    let ty = ty.clone();
                    self.pos += 2;
                    let value = self.unary()?;
                    return Ok(self.cast(&ty, value, start));
                }
            }
        }

        let inner = self.expression()?;
        if self.language.uses_indentation() && self.check(&Token::Comma) {
            let mut items = vec![inner];
            while self.eat(&Token::Comma) {
                if self.check(&Token::RParen) {
                    break;
                }
                items.push(self.expression()?);
            }
            self.expect(&Token::RParen)?;
            return Ok(self.spanned(Expr::Array(items), start));
        }
        self.expect(&Token::RParen)?;
        Ok(self.spanned(inner.node, start))
    }

    fn cast(&self, ty: &str, value: Spanned<Expr>, start: usize) -> Spanned<Expr> {
        let func = match ty {
            "double" | "float" => "float",
            _ => "int",
        };
        self.call(func, vec![value], start)
    }

    /// `[a, b]` or `[fill for _ in range(n)]`, after the `[`
    fn array_literal(&mut self, start: usize) -> ParseResult<Spanned<Expr>> {
        let mut items = Vec::new();
        while !self.check(&Token::RBracket) {
            items.push(self.expression()?);
            if self.language.uses_indentation() && items.len() == 1 && self.check(&Token::For) {
                return self.comprehension(items.remove(0), start);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(self.spanned(Expr::Array(items), start))
    }

    /// Only the allocation form `[fill for _ in range(count)]` is supported
    fn comprehension(&mut self, fill: Spanned<Expr>, start: usize) -> ParseResult<Spanned<Expr>> {
        let for_span = self.span();
        self.advance();
        let (var, _) = self.ident()?;
        self.expect(&Token::In)?;
        let iterable = self.or_expr()?;
        self.expect(&Token::RBracket)?;

        let unsupported = || {
            self.error_at(
                "only `[value for _ in range(n)]` comprehensions are supported",
                for_span,
            )
        };
        if fill.node.variables().contains(&var.as_str()) {
            return Err(unsupported());
        }
        match iterable.node {
            Expr::Call { func, mut args } if func == "range" && args.len() == 1 => Ok(self.spanned(
                Expr::Alloc {
                    fill: boxed(fill),
                    count: boxed(args.remove(0)),
                },
                start,
            )),
            _ => Err(unsupported()),
        }
    }

    pub(super) fn call_args(&mut self) -> ParseResult<Vec<Spanned<Expr>>> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            args.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn call(&self, func: &str, args: Vec<Spanned<Expr>>, start: usize) -> Spanned<Expr> {
        self.spanned(
            Expr::Call {
                func: func.to_string(),
                args,
            },
            start,
        )
    }

    fn binary(
        &self,
        left: Spanned<Expr>,
        op: BinOp,
        right: Spanned<Expr>,
        start: usize,
    ) -> Spanned<Expr> {
        self.spanned(
            Expr::Binary {
                left: boxed(left),
                op,
                right: boxed(right),
            },
            start,
        )
    }
}
