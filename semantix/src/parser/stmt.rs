//! Statements and blocks

use super::{ParseResult, Parser};
use crate::ast::{
    BinOp, Block, CondBranch, Condition, Expr, Language, Span, Spanned, Stmt, StmtKind, Target,
};
use crate::lexer::Token;
use num_bigint::BigInt;

impl Parser<'_> {
    pub(super) fn statement(&mut self) -> ParseResult<Stmt> {
        let start = self.span();
        let kind = match self.peek() {
            None => return Err(self.unexpected("a statement")),
            Some(Token::If) => self.if_stmt()?,
            Some(Token::While) => self.while_stmt()?,
            Some(Token::For) => self.for_stmt()?,
            Some(Token::Return) => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.expression_list()?)
                };
                self.end_statement()?;
                StmtKind::Return(value)
            }
            Some(Token::Break) => {
                self.advance();
                self.end_statement()?;
                StmtKind::Break
            }
            Some(Token::Continue) => {
                self.advance();
                self.end_statement()?;
                StmtKind::Continue
            }
            Some(Token::Pass) => {
                self.advance();
                self.end_statement()?;
                StmtKind::Pass
            }
            Some(Token::Def | Token::Function) => {
                return Err(self.error_at("nested function definitions are not supported", start))
            }
            Some(Token::Class) => {
                return Err(self.error_at("class definitions are not supported here", start))
            }
            Some(Token::Indent) => return Err(self.error_at("unexpected indent", start)),
            _ => {
                let kind = self.simple_kind()?;
                self.end_statement()?;
                kind
            }
        };
        Ok(Stmt::new(
            kind,
            self.line_of(start),
            Span::new(start.start, self.prev_end()),
        ))
    }

    /// A simple statement without its terminator, as used in `for (...)` headers
    fn inline_statement(&mut self) -> ParseResult<Stmt> {
        let start = self.span();
        let kind = self.simple_kind()?;
        Ok(Stmt::new(
            kind,
            self.line_of(start),
            Span::new(start.start, self.prev_end()),
        ))
    }

    fn simple_kind(&mut self) -> ParseResult<StmtKind> {
        if let Some(print) = self.output_statement()? {
            return Ok(print);
        }

        let language = self.language;
        match language {
            Language::Python if self.check_ident("import") || self.check_ident("from") => {
                while !self.at_statement_end() {
                    self.advance();
                }
                return Ok(StmtKind::Pass);
            }
            Language::JavaScript
                if matches!(self.peek(), Some(Token::Let | Token::Var | Token::Const)) =>
            {
                return self.js_declaration();
            }
            Language::Java | Language::Cpp if self.looks_like_declaration() => {
                return self.declaration();
            }
            _ => {}
        }

        // `++i` / `--i`
        if let Some(op) = self.increment_op() {
            self.advance();
            let target = self.postfix()?;
            let target = self.target(target)?;
            return Ok(self.increment(target, op));
        }

        let first = self.expression()?;
        let mut lhs = vec![first];
        if self.language.uses_indentation() {
            while self.eat(&Token::Comma) {
                if self.check(&Token::Assign) {
                    break;
                }
                lhs.push(self.expression()?);
            }
        }

        if self.eat(&Token::Assign) {
            let targets = self.targets(lhs)?;
            let values = self.assigned_values(targets.len())?;
            return Ok(StmtKind::Assign {
                targets,
                op: None,
                values,
            });
        }

        if let Some(op) = self.compound_op() {
            let span = self.span();
            self.advance();
            if lhs.len() != 1 {
                return Err(self.error_at("compound assignment needs a single target", span));
            }
            let target = self.target(lhs.remove(0))?;
            let value = self.expression()?;
            return Ok(StmtKind::Assign {
                targets: vec![target],
                op: Some(op),
                values: vec![value],
            });
        }

        if let Some(op) = self.increment_op() {
            self.advance();
            let target = self.target(lhs.remove(0))?;
            return Ok(self.increment(target, op));
        }

        if lhs.len() > 1 {
            return Err(self.unexpected("'=' after a list of targets"));
        }
        Ok(StmtKind::Expr(lhs.remove(0)))
    }

    /// Right-hand side of `=` for `n` targets
    fn assigned_values(&mut self, n: usize) -> ParseResult<Vec<Spanned<Expr>>> {
        let start = self.span();
        let mut values = vec![self.initializer()?];
        if self.language.uses_indentation() {
            while self.eat(&Token::Comma) {
                if self.at_statement_end() {
                    break;
                }
                values.push(self.expression()?);
            }
        }

        // `[a, b] = [b, a + b]` assigns element-wise
        if n > 1 && values.len() == 1 {
            if let Expr::Array(items) = &values[0].node {
                if items.len() == n {
                    return Ok(items.clone());
                }
            }
        }
        if n == 1 && values.len() > 1 {
            let span = Span::new(start.start, self.prev_end());
            return Ok(vec![Spanned::new(Expr::Array(values), span)]);
        }
        if n > 1 && values.len() > 1 && values.len() != n {
            return Err(self.error_at(
                format!("cannot assign {} values to {} targets", values.len(), n),
                Span::new(start.start, self.prev_end()),
            ));
        }
        Ok(values)
    }

    fn targets(&self, exprs: Vec<Spanned<Expr>>) -> ParseResult<Vec<Target>> {
        // `[a, b] = ...` destructures like `a, b = ...`
        if let [Spanned {
            node: Expr::Array(items),
            ..
        }] = exprs.as_slice()
        {
            return items.iter().cloned().map(|e| self.target(e)).collect();
        }
        exprs.into_iter().map(|e| self.target(e)).collect()
    }

    pub(super) fn target(&self, expr: Spanned<Expr>) -> ParseResult<Target> {
        match expr.node {
            Expr::Var(name) => Ok(Target::Var(name)),
            Expr::Index { base, index } => Ok(Target::Index {
                base: *base,
                index: *index,
            }),
            _ => Err(self.error_at("cannot assign to this expression", expr.span)),
        }
    }

    fn increment_op(&self) -> Option<BinOp> {
        match self.peek() {
            Some(Token::PlusPlus) => Some(BinOp::Add),
            Some(Token::MinusMinus) => Some(BinOp::Sub),
            _ => None,
        }
    }

    fn increment(&self, target: Target, op: BinOp) -> StmtKind {
        let one = Spanned::new(Expr::Int(BigInt::from(1)), Span::new(self.prev_end(), self.prev_end()));
        StmtKind::Assign {
            targets: vec![target],
            op: Some(op),
            values: vec![one],
        }
    }

    fn compound_op(&self) -> Option<BinOp> {
        match self.peek()? {
            Token::PlusEq => Some(BinOp::Add),
            Token::MinusEq => Some(BinOp::Sub),
            Token::StarEq => Some(BinOp::Mul),
            Token::SlashEq => Some(self.slash_op()),
            Token::SlashSlashEq => Some(BinOp::FloorDiv),
            Token::PercentEq => Some(self.percent_op()),
            _ => None,
        }
    }

    /// `print(...)`, `console.log(...)`, `System.out.println(...)`, `cout << ...`
    fn output_statement(&mut self) -> ParseResult<Option<StmtKind>> {
        match self.language {
            Language::Python if self.check_ident("print") && self.peek_at(1) == Some(&Token::LParen) => {
                self.advance();
                self.python_print().map(Some)
            }
            Language::JavaScript
                if self.check_ident("console")
                    && self.peek_at(1) == Some(&Token::Dot)
                    && ["log", "info", "warn", "error"]
                        .iter()
                        .any(|m| self.ident_at(2, m)) =>
            {
                self.pos += 3;
                let args = self.call_args()?;
                Ok(Some(StmtKind::Print {
                    args,
                    separator: " ".to_string(),
                }))
            }
            Language::Java
                if self.check_ident("System")
                    && self.peek_at(1) == Some(&Token::Dot)
                    && self.ident_at(2, "out")
                    && self.peek_at(3) == Some(&Token::Dot)
                    && (self.ident_at(4, "println") || self.ident_at(4, "print")) =>
            {
                self.pos += 5;
                let args = self.call_args()?;
                if args.len() > 1 {
                    return Err(self.error_at(
                        "System.out.println takes at most one argument",
                        args[1].span,
                    ));
                }
                Ok(Some(StmtKind::Print {
                    args,
                    separator: String::new(),
                }))
            }
            Language::Cpp
                if self.check_ident("cout")
                    || (self.check_ident("std") && self.ident_at(2, "cout")) =>
            {
                if self.eat_ident("std") {
                    self.expect(&Token::ColonColon)?;
                }
                self.advance();
                let mut args = Vec::new();
                while self.eat(&Token::Shl) {
                    if self.eat_ident("endl") {
                        continue;
                    }
                    if self.check_ident("std") && self.ident_at(2, "endl") {
                        self.pos += 3;
                        continue;
                    }
                    args.push(self.additive()?);
                }
                Ok(Some(StmtKind::Print {
                    args,
                    separator: String::new(),
                }))
            }
            _ => Ok(None),
        }
    }

    fn python_print(&mut self) -> ParseResult<StmtKind> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        let mut separator = " ".to_string();
        while !self.check(&Token::RParen) {
            if matches!(self.peek(), Some(Token::Ident(_))) && self.peek_at(1) == Some(&Token::Assign) {
                let (keyword, span) = self.ident()?;
                self.advance();
                let value = self.expression()?;
                match (keyword.as_str(), value.node) {
                    ("sep", Expr::Str(s)) => separator = s,
                    ("sep", _) => {
                        return Err(self.error_at("sep must be a string literal", value.span))
                    }
                    ("end" | "flush" | "file", _) => {}
                    _ => {
                        return Err(
                            self.error_at(format!("unexpected keyword argument '{keyword}'"), span)
                        )
                    }
                }
            } else {
                args.push(self.expression()?);
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        Ok(StmtKind::Print { args, separator })
    }

    /// `let a = 1, b;` / `const [x, y] = pair;`
    fn js_declaration(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        if self.check(&Token::LBracket) {
            let pattern = self.postfix()?;
            self.expect(&Token::Assign)?;
            let targets = self.targets(vec![pattern])?;
            let values = self.assigned_values(targets.len())?;
            return Ok(StmtKind::Assign {
                targets,
                op: None,
                values,
            });
        }

        let mut targets = Vec::new();
        let mut values = Vec::new();
        loop {
            let (name, span) = self.ident()?;
            let value = if self.eat(&Token::Assign) {
                self.expression()?
            } else {
                Spanned::new(Expr::Null, span)
            };
            targets.push(Target::Var(name));
            values.push(value);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(StmtKind::Assign {
            targets,
            op: None,
            values,
        })
    }

    // ---- compound statements ----

    fn if_stmt(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let mut branches = vec![self.branch()?];
        let mut else_body = None;
        loop {
            if self.language.uses_indentation() {
                if self.eat(&Token::Elif) {
                    branches.push(self.branch()?);
                    continue;
                }
                if self.eat(&Token::Else) {
                    else_body = Some(self.block()?);
                }
            } else if self.check(&Token::Else) {
                self.advance();
                if self.eat(&Token::If) {
                    branches.push(self.branch()?);
                    continue;
                }
                else_body = Some(self.body()?);
            }
            break;
        }
        Ok(StmtKind::If {
            branches,
            else_body,
        })
    }

    fn branch(&mut self) -> ParseResult<CondBranch> {
        let cond = self.condition()?;
        let body = self.body()?;
        Ok(CondBranch { cond, body })
    }

    fn while_stmt(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let cond = self.condition()?;
        let body = self.body()?;
        Ok(StmtKind::While { cond, body })
    }

    /// Condition of `if`/`while`; parenthesised in brace dialects
    fn condition(&mut self) -> ParseResult<Condition> {
        let parens = !self.language.uses_indentation();
        if parens {
            self.expect(&Token::LParen)?;
        }
        let expr = self.expression()?;
        if parens {
            self.expect(&Token::RParen)?;
        }
        Ok(self.make_condition(expr))
    }

    fn make_condition(&self, expr: Spanned<Expr>) -> Condition {
        Condition {
            text: self.text(expr.span),
            line: self.line_of(expr.span),
            expr,
        }
    }

    fn for_stmt(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        if self.language.uses_indentation() {
            return self.python_for();
        }

        self.expect(&Token::LParen)?;
        if let Some(kind) = self.for_each()? {
            return Ok(kind);
        }

        let init = if self.check(&Token::Semi) {
            Vec::new()
        } else {
            vec![self.inline_statement()?]
        };
        self.expect(&Token::Semi)?;

        let cond = if self.check(&Token::Semi) {
            None
        } else {
            let expr = self.expression()?;
            Some(self.make_condition(expr))
        };
        self.expect(&Token::Semi)?;

        let mut update = Vec::new();
        while !self.check(&Token::RParen) {
            update.push(self.inline_statement()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;

        let body = self.body()?;
        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    /// `for (x of xs)`, `for (k in xs)`, `for (T x : xs)`; leaves the cursor
    /// untouched when the header is C-style
    fn for_each(&mut self) -> ParseResult<Option<StmtKind>> {
        let save = self.pos;
        match self.language {
            Language::JavaScript => {
                if matches!(self.peek(), Some(Token::Let | Token::Var | Token::Const)) {
                    self.advance();
                }
            }
            _ => {
                if self.try_type().is_none() {
                    self.pos = save;
                }
            }
        }

        let is_each = matches!(self.peek(), Some(Token::Ident(_)))
            && (self.ident_at(1, "of")
                || self.peek_at(1) == Some(&Token::In)
                || self.peek_at(1) == Some(&Token::Colon));
        if !is_each {
            self.pos = save;
            return Ok(None);
        }

        let (var, var_span) = self.ident()?;
        let over_keys = self.eat(&Token::In);
        if !over_keys {
            self.advance();
        }
        let iterable = self.expression()?;
        self.expect(&Token::RParen)?;
        let body = self.body()?;

        if over_keys {
            // `for (k in xs)` walks the indices
            let span = iterable.span;
            let len = Spanned::new(
                Expr::Call {
                    func: "len".into(),
                    args: vec![iterable],
                },
                span,
            );
            let zero = Spanned::new(Expr::Int(BigInt::from(0)), var_span);
            return Ok(Some(StmtKind::ForRange {
                var,
                start: zero,
                end: len,
                step: None,
                body,
            }));
        }
        Ok(Some(StmtKind::ForEach {
            var,
            iterable,
            body,
        }))
    }

    /// `for x in range(...)` or `for x in xs`
    fn python_for(&mut self) -> ParseResult<StmtKind> {
        let (var, _) = self.ident()?;
        if self.check(&Token::Comma) {
            return Err(self.unexpected("'in' (tuple loop targets are not supported)"));
        }
        self.expect(&Token::In)?;
        let iterable = self.expression()?;
        let body = self.block()?;

        if let Expr::Call { func, args } = &iterable.node {
            if func == "range" {
                let mut args = args.clone();
                let zero = || Spanned::new(Expr::Int(BigInt::from(0)), iterable.span);
                let (start, end, step) = match args.len() {
                    1 => (zero(), args.remove(0), None),
                    2 => {
                        let end = args.remove(1);
                        (args.remove(0), end, None)
                    }
                    3 => {
                        let step = args.remove(2);
                        let end = args.remove(1);
                        (args.remove(0), end, Some(step))
                    }
                    n => {
                        return Err(self.error_at(
                            format!("range expects 1 to 3 arguments, got {n}"),
                            iterable.span,
                        ))
                    }
                };
                return Ok(StmtKind::ForRange {
                    var,
                    start,
                    end,
                    step,
                    body,
                });
            }
        }
        Ok(StmtKind::ForEach {
            var,
            iterable,
            body,
        })
    }

    // ---- blocks ----

    /// Function or compound-statement body in the dialect's block syntax
    pub(super) fn block(&mut self) -> ParseResult<Block> {
        if self.language.uses_indentation() {
            self.indented_block()
        } else {
            self.braced_block()
        }
    }

    /// Body of a control statement; brace dialects also accept one bare statement
    fn body(&mut self) -> ParseResult<Block> {
        if self.language.uses_indentation() || self.check(&Token::LBrace) {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn indented_block(&mut self) -> ParseResult<Block> {
        self.expect(&Token::Colon)?;
        if !self.eat(&Token::Newline) {
            // `if x: return 1`
            return Ok(vec![self.statement()?]);
        }
        if !self.eat(&Token::Indent) {
            return Err(self.unexpected("an indented block"));
        }
        let mut body = Vec::new();
        while !self.eat(&Token::Dedent) {
            if self.at_end() {
                return Err(self.unexpected("a dedent"));
            }
            if self.eat(&Token::Newline) {
                continue;
            }
            body.push(self.statement()?);
        }
        Ok(body)
    }

    pub(super) fn braced_block(&mut self) -> ParseResult<Block> {
        let open = self.expect(&Token::LBrace)?;
        let mut body = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(body);
            }
            if self.at_end() {
                return Err(self.error_at("unterminated block: '{' is never closed", open));
            }
            if self.eat(&Token::Semi) {
                continue;
            }
            body.push(self.statement()?);
        }
    }

    fn at_statement_end(&self) -> bool {
        match self.peek() {
            None | Some(Token::Semi) => true,
            Some(Token::Newline | Token::Dedent) => self.language.uses_indentation(),
            Some(Token::RBrace) => !self.language.uses_indentation(),
            _ => false,
        }
    }

    fn end_statement(&mut self) -> ParseResult<()> {
        let had_semi = self.eat(&Token::Semi);
        if !self.language.uses_indentation() {
            return Ok(());
        }
        if self.eat(&Token::Newline) || self.at_end() || self.check(&Token::Dedent) || had_semi {
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }
}
