//! Statement AST nodes
//!
//! Every surface dialect lowers into this one statement language, so the
//! tracer never sees indentation, braces or declaration syntax.

use super::{BinOp, Expr, Span, Spanned};
use serde::{Deserialize, Serialize};

/// A sequence of statements
pub type Block = Vec<Stmt>;

/// Statement with the 1-based line of its first token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
    pub span: Span,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `a = e`, `a += e`, `a, b = b, a + b`, `arr[i] = e`
    ///
    /// With several targets and one value the value is destructured.
    Assign {
        targets: Vec<Target>,
        op: Option<BinOp>,
        values: Vec<Spanned<Expr>>,
    },

    /// Expression evaluated for its effect
    Expr(Spanned<Expr>),

    /// Output primitive; rendered values are joined with `separator`
    Print {
        args: Vec<Spanned<Expr>>,
        separator: String,
    },

    /// `if` / `elif` / `else`
    If {
        branches: Vec<CondBranch>,
        else_body: Option<Block>,
    },

    While {
        cond: Condition,
        body: Block,
    },

    /// `for var in range(start, end, step)`.
    ///
    /// The bounds are evaluated once; the direction follows the sign of `step`.
    ForRange {
        var: String,
        start: Spanned<Expr>,
        end: Spanned<Expr>,
        step: Option<Spanned<Expr>>,
        body: Block,
    },

    /// C-style `for (init; cond; update)`. `init` runs once before the loop,
    /// `update` after every iteration including ones left by `continue`.
    For {
        init: Vec<Stmt>,
        cond: Option<Condition>,
        update: Vec<Stmt>,
        body: Block,
    },

    /// `for x in arr` / `for (x of arr)` / `for (T x : arr)`
    ForEach {
        var: String,
        iterable: Spanned<Expr>,
        body: Block,
    },

    Break,
    Continue,
    Pass,
    Return(Option<Spanned<Expr>>),
}

/// Assignment target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Var(String),
    Index {
        base: Spanned<Expr>,
        index: Spanned<Expr>,
    },
}

impl Target {
    /// Variable at the root of the target (`arr` for `arr[i][j]`)
    pub fn root(&self) -> Option<&str> {
        match self {
            Target::Var(name) => Some(name),
            Target::Index { base, .. } => {
                let mut expr = &base.node;
                loop {
                    match expr {
                        Expr::Var(name) => return Some(name),
                        Expr::Index { base, .. } => expr = &base.node,
                        _ => return None,
                    }
                }
            }
        }
    }
}

/// Branch or loop condition together with its verbatim source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub expr: Spanned<Expr>,
    pub text: String,
    pub line: u32,
}

/// One `if`/`elif` arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondBranch {
    pub cond: Condition,
    pub body: Block,
}

impl Stmt {
    pub fn new(kind: StmtKind, line: u32, span: Span) -> Self {
        Stmt { kind, line, span }
    }

    /// Is this a loop statement?
    pub fn is_loop(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::While { .. }
                | StmtKind::ForRange { .. }
                | StmtKind::For { .. }
                | StmtKind::ForEach { .. }
        )
    }

    /// Nested statement lists (a C-style `for` yields init, body, update)
    pub fn blocks(&self) -> Vec<&Block> {
        match &self.kind {
            StmtKind::If {
                branches,
                else_body,
            } => {
                let mut out: Vec<&Block> = branches.iter().map(|b| &b.body).collect();
                if let Some(body) = else_body {
                    out.push(body);
                }
                out
            }
            StmtKind::While { body, .. }
            | StmtKind::ForRange { body, .. }
            | StmtKind::ForEach { body, .. } => vec![body],
            StmtKind::For {
                init, update, body, ..
            } => vec![init, body, update],
            _ => Vec::new(),
        }
    }

    /// Expressions evaluated directly by this statement (not by nested blocks)
    pub fn exprs(&self) -> Vec<&Spanned<Expr>> {
        match &self.kind {
            StmtKind::Assign {
                targets, values, ..
            } => {
                let mut out: Vec<&Spanned<Expr>> = values.iter().collect();
                for target in targets {
                    if let Target::Index { base, index } = target {
                        out.push(base);
                        out.push(index);
                    }
                }
                out
            }
            StmtKind::Expr(e) => vec![e],
            StmtKind::Print { args, .. } => args.iter().collect(),
            StmtKind::If { branches, .. } => branches.iter().map(|b| &b.cond.expr).collect(),
            StmtKind::While { cond, .. } => vec![&cond.expr],
            StmtKind::ForRange {
                start, end, step, ..
            } => {
                let mut out = vec![start, end];
                if let Some(step) = step {
                    out.push(step);
                }
                out
            }
            StmtKind::For { cond, .. } => cond.iter().map(|c| &c.expr).collect(),
            StmtKind::ForEach { iterable, .. } => vec![iterable],
            StmtKind::Return(Some(e)) => vec![e],
            StmtKind::Return(None)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Pass => Vec::new(),
        }
    }

    /// Visit this statement and every nested statement, outermost first
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Stmt)) {
        f(self);
        for block in self.blocks() {
            for stmt in block {
                stmt.walk(f);
            }
        }
    }

    /// Does every path through this statement leave the enclosing block
    /// (via `return`, `break` or `continue`)?
    pub fn always_exits(&self) -> bool {
        match &self.kind {
            StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue => true,
            StmtKind::If {
                branches,
                else_body: Some(else_body),
            } => {
                branches.iter().all(|b| block_exits(&b.body)) && block_exits(else_body)
            }
            _ => false,
        }
    }
}

/// Does the block end by leaving its enclosing construct on every path?
pub fn block_exits(block: &[Stmt]) -> bool {
    block.iter().any(Stmt::always_exits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(kind: StmtKind, line: u32) -> Stmt {
        Stmt::new(kind, line, Span::default())
    }

    fn var(name: &str) -> Spanned<Expr> {
        Spanned::new(Expr::Var(name.into()), Span::default())
    }

    #[test]
    fn test_target_root_through_nested_index() {
        let target = Target::Index {
            base: Spanned::new(
                Expr::Index {
                    base: Box::new(var("grid")),
                    index: Box::new(var("i")),
                },
                Span::default(),
            ),
            index: var("j"),
        };
        assert_eq!(target.root(), Some("grid"));
    }

    #[test]
    fn test_always_exits_requires_else() {
        let cond = Condition {
            expr: var("x"),
            text: "x".into(),
            line: 1,
        };
        let only_then = stmt(
            StmtKind::If {
                branches: vec![CondBranch {
                    cond: cond.clone(),
                    body: vec![stmt(StmtKind::Return(None), 2)],
                }],
                else_body: None,
            },
            1,
        );
        assert!(!only_then.always_exits());

        let both = stmt(
            StmtKind::If {
                branches: vec![CondBranch {
                    cond,
                    body: vec![stmt(StmtKind::Return(None), 2)],
                }],
                else_body: Some(vec![stmt(StmtKind::Break, 4)]),
            },
            1,
        );
        assert!(both.always_exits());
    }

    #[test]
    fn test_walk_visits_nested() {
        let body = vec![stmt(StmtKind::Pass, 2), stmt(StmtKind::Break, 3)];
        let loop_stmt = stmt(
            StmtKind::While {
                cond: Condition {
                    expr: var("x"),
                    text: "x".into(),
                    line: 1,
                },
                body,
            },
            1,
        );
        let mut lines = Vec::new();
        loop_stmt.walk(&mut |s| lines.push(s.line));
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(loop_stmt.is_loop());
    }
}
