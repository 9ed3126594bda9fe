//! Expression AST nodes

use super::Spanned;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal (unbounded)
    Int(BigInt),
    /// Float literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
    /// String literal
    Str(String),
    /// `None` / `null` / `nullptr`
    Null,

    /// Array literal: `[a, b]` or `{a, b}`
    Array(Vec<Spanned<Expr>>),

    /// Sized allocation: `[fill] * count`, `new int[count]`, `vector<T> v(count)`
    Alloc {
        fill: Box<Spanned<Expr>>,
        count: Box<Spanned<Expr>>,
    },

    /// Variable reference
    Var(String),

    /// Indexing: `base[index]`
    Index {
        base: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },

    /// Python slice: `base[start:end]`
    Slice {
        base: Box<Spanned<Expr>>,
        start: Option<Box<Spanned<Expr>>>,
        end: Option<Box<Spanned<Expr>>>,
    },

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// `then if cond else otherwise` / `cond ? then : otherwise`
    Conditional {
        cond: Box<Spanned<Expr>>,
        then: Box<Spanned<Expr>>,
        otherwise: Box<Spanned<Expr>>,
    },

    /// Function call; method calls are lowered to calls with the receiver first
    Call {
        func: String,
        args: Vec<Spanned<Expr>>,
    },
}

impl Expr {
    /// Visit this expression and every sub-expression, outermost first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Array(items) => items.iter().for_each(|e| e.node.walk(f)),
            Expr::Alloc { fill, count } => {
                fill.node.walk(f);
                count.node.walk(f);
            }
            Expr::Index { base, index } => {
                base.node.walk(f);
                index.node.walk(f);
            }
            Expr::Slice { base, start, end } => {
                base.node.walk(f);
                if let Some(start) = start {
                    start.node.walk(f);
                }
                if let Some(end) = end {
                    end.node.walk(f);
                }
            }
            Expr::Binary { left, right, .. } => {
                left.node.walk(f);
                right.node.walk(f);
            }
            Expr::Unary { expr, .. } => expr.node.walk(f),
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.node.walk(f);
                then.node.walk(f);
                otherwise.node.walk(f);
            }
            Expr::Call { args, .. } => args.iter().for_each(|e| e.node.walk(f)),
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::Bool(_)
            | Expr::Str(_)
            | Expr::Null
            | Expr::Var(_) => {}
        }
    }

    /// Names of all variables read by this expression
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Var(name) = e {
                if !out.contains(&name.as_str()) {
                    out.push(name.as_str());
                }
            }
        });
        out
    }

    /// Operands of a chain of `and`s, left to right
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::Binary {
                left,
                op: BinOp::And,
                right,
            } => {
                let mut out = left.node.conjuncts();
                out.extend(right.node.conjuncts());
                out
            }
            other => vec![other],
        }
    }

    /// Does this expression call `func` anywhere?
    pub fn calls(&self, func: &str) -> usize {
        let mut count = 0;
        self.walk(&mut |e| {
            if let Expr::Call { func: name, .. } = e {
                if name == func {
                    count += 1;
                }
            }
        });
        count
    }
}

/// Binding strength, for re-printing without redundant parentheses
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Conditional { .. } => 0,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { op: UnOp::Not, .. } => 3,
        Expr::Unary { .. } => 8,
        _ => 10,
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let child = |f: &mut std::fmt::Formatter<'_>, e: &Expr, min: u8| {
            if precedence(e) < min {
                write!(f, "({e})")
            } else {
                write!(f, "{e}")
            }
        };
        match self {
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Float(x) => write!(f, "{x:?}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Str(s) => write!(f, "{s:?}"),
            Expr::Null => write!(f, "null"),
            Expr::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.node)?;
                }
                write!(f, "]")
            }
            Expr::Alloc { fill, count } => write!(f, "[{}] * {}", fill.node, count.node),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Index { base, index } => {
                child(f, &base.node, 10)?;
                write!(f, "[{}]", index.node)
            }
            Expr::Slice { base, start, end } => {
                child(f, &base.node, 10)?;
                write!(f, "[")?;
                if let Some(start) = start {
                    write!(f, "{}", start.node)?;
                }
                write!(f, ":")?;
                if let Some(end) = end {
                    write!(f, "{}", end.node)?;
                }
                write!(f, "]")
            }
            Expr::Binary { left, op, right } => {
                let p = op.precedence();
                // `**` groups to the right, everything else to the left
                let (lmin, rmin) = if *op == BinOp::Pow { (p + 1, p) } else { (p, p + 1) };
                child(f, &left.node, lmin)?;
                write!(f, " {op} ")?;
                child(f, &right.node, rmin)
            }
            Expr::Unary { op, expr } => {
                match op {
                    UnOp::Neg => write!(f, "-")?,
                    UnOp::Not => write!(f, "not ")?,
                }
                child(f, &expr.node, precedence(self))
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => write!(f, "{} if {} else {}", then.node, cond.node, otherwise.node),
            Expr::Call { func, args } => {
                write!(f, "{func}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg.node)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    /// `/` on Java/C++: truncates when both sides are integers
    Div,
    /// `/` on Python: always a float
    TrueDiv,
    /// `/` on JavaScript: integer when exact, float otherwise
    NumDiv,
    /// `//`
    FloorDiv,
    /// `%` with the sign of the dividend
    Mod,
    /// Python `%` with the sign of the divisor
    FloorMod,
    /// `**`
    Pow,
    Shl,
    Shr,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// Membership: `x in arr`
    In,
    NotIn,

    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
        )
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq
            | BinOp::Ne
            | BinOp::Lt
            | BinOp::Gt
            | BinOp::Le
            | BinOp::Ge
            | BinOp::In
            | BinOp::NotIn => 4,
            BinOp::Shl | BinOp::Shr => 5,
            BinOp::Add | BinOp::Sub => 6,
            BinOp::Mul
            | BinOp::Div
            | BinOp::TrueDiv
            | BinOp::NumDiv
            | BinOp::FloorDiv
            | BinOp::Mod
            | BinOp::FloorMod => 7,
            BinOp::Pow => 9,
        }
    }

    /// Division-like operators, used to recognise halving updates
    pub fn is_division(self) -> bool {
        matches!(
            self,
            BinOp::Div | BinOp::TrueDiv | BinOp::NumDiv | BinOp::FloorDiv | BinOp::Shr
        )
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div | BinOp::TrueDiv | BinOp::NumDiv => write!(f, "/"),
            BinOp::FloorDiv => write!(f, "//"),
            BinOp::Mod | BinOp::FloorMod => write!(f, "%"),
            BinOp::Pow => write!(f, "**"),
            BinOp::Shl => write!(f, "<<"),
            BinOp::Shr => write!(f, ">>"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
            BinOp::In => write!(f, "in"),
            BinOp::NotIn => write!(f, "not in"),
            BinOp::And => write!(f, "and"),
            BinOp::Or => write!(f, "or"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "not"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn sp(e: Expr) -> Box<Spanned<Expr>> {
        Box::new(Spanned::new(e, Span::default()))
    }

    #[test]
    fn test_variables_deduplicated_in_order() {
        let e = Expr::Binary {
            left: sp(Expr::Var("lo".into())),
            op: BinOp::Add,
            right: sp(Expr::Binary {
                left: sp(Expr::Var("hi".into())),
                op: BinOp::Sub,
                right: sp(Expr::Var("lo".into())),
            }),
        };
        assert_eq!(e.variables(), vec!["lo", "hi"]);
    }

    #[test]
    fn test_calls_counts_nested() {
        let inner = Expr::Call {
            func: "fib".into(),
            args: vec![Spanned::new(Expr::Var("n".into()), Span::default())],
        };
        let e = Expr::Binary {
            left: sp(inner.clone()),
            op: BinOp::Add,
            right: sp(inner),
        };
        assert_eq!(e.calls("fib"), 2);
        assert_eq!(e.calls("len"), 0);
    }

    #[test]
    fn test_expr_display_parenthesizes_only_when_needed() {
        let n = || sp(Expr::Var("n".into()));
        let one = || sp(Expr::Int(1.into()));
        let sum = Expr::Binary {
            left: n(),
            op: BinOp::Add,
            right: one(),
        };
        let product = Expr::Binary {
            left: sp(sum.clone()),
            op: BinOp::Mul,
            right: n(),
        };
        assert_eq!(sum.to_string(), "n + 1");
        assert_eq!(product.to_string(), "(n + 1) * n");
        let diff = Expr::Binary {
            left: n(),
            op: BinOp::Sub,
            right: sp(sum),
        };
        assert_eq!(diff.to_string(), "n - (n + 1)");
        let call = Expr::Call {
            func: "len".into(),
            args: vec![Spanned::new(Expr::Var("arr".into()), Span::default())],
        };
        assert_eq!(call.to_string(), "len(arr)");
    }

    #[test]
    fn test_binop_display() {
        assert_eq!(BinOp::FloorDiv.to_string(), "//");
        assert_eq!(BinOp::TrueDiv.to_string(), "/");
        assert_eq!(BinOp::NotIn.to_string(), "not in");
    }

    #[test]
    fn test_division_classification() {
        assert!(BinOp::FloorDiv.is_division());
        assert!(BinOp::Shr.is_division());
        assert!(!BinOp::Mod.is_division());
        assert!(BinOp::Le.is_comparison());
        assert!(!BinOp::And.is_comparison());
    }
}
