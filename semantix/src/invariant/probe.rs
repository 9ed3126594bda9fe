//! Evaluating condition and bound expressions over recorded variables
//!
//! Invariant candidates are phrased as source expressions (`n`, `len(arr)`,
//! `lo <= hi`). To confirm one against a snapshot the expression is
//! re-evaluated here, without the interpreter and without side effects. Any
//! construct the probe cannot evaluate yields `None`, which callers treat as
//! "does not hold".

use crate::ast::{BinOp, Expr, UnOp};
use crate::trace::Snapshot;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use std::collections::BTreeMap;

pub type Vars = BTreeMap<String, Snapshot>;

/// Evaluate `expr` against the bindings of one snapshot
pub fn eval(expr: &Expr, vars: &Vars) -> Option<Snapshot> {
    match expr {
        Expr::Int(n) => Some(Snapshot::Int(n.clone())),
        Expr::Float(x) => Some(Snapshot::Float(*x)),
        Expr::Bool(b) => Some(Snapshot::Bool(*b)),
        Expr::Str(s) => Some(Snapshot::Str(s.as_str().into())),
        Expr::Null => Some(Snapshot::Null),
        Expr::Var(name) => vars.get(name).cloned(),
        Expr::Array(items) => items
            .iter()
            .map(|e| eval(&e.node, vars))
            .collect::<Option<Vec<_>>>()
            .map(|items| Snapshot::Array(items.into())),
        Expr::Index { base, index } => {
            let base = eval(&base.node, vars)?;
            let index = eval(&index.node, vars)?.as_int()?.to_i64()?;
            let items = base.as_array()?;
            let len = items.len() as i64;
            let at = if index < 0 { len + index } else { index };
            if (0..len).contains(&at) {
                items.get(at as usize).cloned()
            } else {
                None
            }
        }
        Expr::Unary { op, expr } => {
            let value = eval(&expr.node, vars)?;
            match op {
                UnOp::Not => Some(Snapshot::Bool(!truthy(&value))),
                UnOp::Neg => match value {
                    Snapshot::Int(n) => Some(Snapshot::Int(-n)),
                    Snapshot::Float(x) => Some(Snapshot::Float(-x)),
                    _ => None,
                },
            }
        }
        Expr::Binary { left, op, right } => {
            let l = eval(&left.node, vars)?;
            match op {
                BinOp::And if !truthy(&l) => return Some(Snapshot::Bool(false)),
                BinOp::Or if truthy(&l) => return Some(Snapshot::Bool(true)),
                _ => {}
            }
            let r = eval(&right.node, vars)?;
            binary(*op, &l, &r)
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            if truthy(&eval(&cond.node, vars)?) {
                eval(&then.node, vars)
            } else {
                eval(&otherwise.node, vars)
            }
        }
        Expr::Call { func, args } => {
            let args = args
                .iter()
                .map(|a| eval(&a.node, vars))
                .collect::<Option<Vec<_>>>()?;
            call(func, &args)
        }
        Expr::Alloc { .. } | Expr::Slice { .. } => None,
    }
}

/// Evaluate a condition; unevaluable conditions count as false
pub fn holds(expr: &Expr, vars: &Vars) -> bool {
    eval(expr, vars).is_some_and(|v| truthy(&v))
}

pub fn truthy(value: &Snapshot) -> bool {
    match value {
        Snapshot::Bool(b) => *b,
        Snapshot::Int(n) => !n.is_zero(),
        Snapshot::Float(x) => *x != 0.0,
        Snapshot::Str(s) => !s.is_empty(),
        Snapshot::Array(items) => !items.is_empty(),
        Snapshot::Null => false,
    }
}

fn binary(op: BinOp, l: &Snapshot, r: &Snapshot) -> Option<Snapshot> {
    use Snapshot::{Bool, Float, Int};

    if let (Int(a), Int(b)) = (l, r) {
        let value = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div | BinOp::NumDiv if !b.is_zero() && (op == BinOp::Div || (a % b).is_zero()) => {
                a / b
            }
            BinOp::FloorDiv if !b.is_zero() => a.div_floor(b),
            BinOp::Mod if !b.is_zero() => a % b,
            BinOp::FloorMod if !b.is_zero() => a.mod_floor(b),
            BinOp::Pow if !b.is_negative() => num_traits::pow(a.clone(), b.to_usize()?.min(4096)),
            BinOp::Shl => a << b.to_usize()?.min(4096),
            BinOp::Shr => a >> b.to_usize()?,
            BinOp::Eq => return Some(Bool(a == b)),
            BinOp::Ne => return Some(Bool(a != b)),
            BinOp::Lt => return Some(Bool(a < b)),
            BinOp::Le => return Some(Bool(a <= b)),
            BinOp::Gt => return Some(Bool(a > b)),
            BinOp::Ge => return Some(Bool(a >= b)),
            BinOp::And | BinOp::Or => return Some(r.clone()),
            _ => return float_binary(op, a.to_f64()?, b.to_f64()?),
        };
        return Some(Int(value));
    }

    match op {
        BinOp::And | BinOp::Or => Some(r.clone()),
        BinOp::Eq => Some(Bool(l == r)),
        BinOp::Ne => Some(Bool(l != r)),
        BinOp::In | BinOp::NotIn => {
            let found = r.as_array()?.contains(l);
            Some(Bool(found == (op == BinOp::In)))
        }
        _ => match (l, r) {
            (Int(_) | Float(_), Int(_) | Float(_)) => float_binary(op, l.as_f64()?, r.as_f64()?),
            (Snapshot::Str(a), Snapshot::Str(b)) => match op {
                BinOp::Lt => Some(Bool(a < b)),
                BinOp::Le => Some(Bool(a <= b)),
                BinOp::Gt => Some(Bool(a > b)),
                BinOp::Ge => Some(Bool(a >= b)),
                _ => None,
            },
            _ => None,
        },
    }
}

fn float_binary(op: BinOp, a: f64, b: f64) -> Option<Snapshot> {
    use Snapshot::{Bool, Float};

    Some(match op {
        BinOp::Add => Float(a + b),
        BinOp::Sub => Float(a - b),
        BinOp::Mul => Float(a * b),
        BinOp::Div | BinOp::TrueDiv | BinOp::NumDiv if b != 0.0 => Float(a / b),
        BinOp::FloorDiv if b != 0.0 => Float((a / b).floor()),
        BinOp::Pow => Float(a.powf(b)),
        BinOp::Eq => Bool(a == b),
        BinOp::Ne => Bool(a != b),
        BinOp::Lt => Bool(a < b),
        BinOp::Le => Bool(a <= b),
        BinOp::Gt => Bool(a > b),
        BinOp::Ge => Bool(a >= b),
        _ => return None,
    })
}

fn call(func: &str, args: &[Snapshot]) -> Option<Snapshot> {
    match (func, args) {
        ("len", [Snapshot::Array(items)]) => Some(Snapshot::Int(BigInt::from(items.len()))),
        ("len", [Snapshot::Str(s)]) => Some(Snapshot::Int(BigInt::from(s.chars().count()))),
        ("abs", [Snapshot::Int(n)]) => Some(Snapshot::Int(n.abs())),
        ("abs", [Snapshot::Float(x)]) => Some(Snapshot::Float(x.abs())),
        ("min" | "max", [Snapshot::Array(items)]) => extreme(func, items),
        ("min" | "max", _) if args.len() >= 2 => extreme(func, args),
        _ => None,
    }
}

fn extreme(func: &str, items: &[Snapshot]) -> Option<Snapshot> {
    let mut best: Option<&Snapshot> = None;
    for item in items {
        let value = item.as_f64()?;
        let better = match best.and_then(Snapshot::as_f64) {
            None => true,
            Some(current) if func == "min" => value < current,
            Some(current) => value > current,
        };
        if better {
            best = Some(item);
        }
    }
    best.cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Language;
    use crate::parser::parse_expression;

    fn vars(pairs: &[(&str, Snapshot)]) -> Vars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn int(n: i64) -> Snapshot {
        Snapshot::Int(BigInt::from(n))
    }

    fn probe(src: &str, vars: &Vars) -> Option<Snapshot> {
        let expr = parse_expression(src, Language::Python).unwrap();
        eval(&expr.node, vars)
    }

    #[test]
    fn test_arithmetic_and_comparison() {
        let env = vars(&[("i", int(3)), ("n", int(6))]);
        assert_eq!(probe("n + 1", &env), Some(int(7)));
        assert_eq!(probe("n // 4", &env), Some(int(1)));
        assert_eq!(probe("i <= n", &env), Some(Snapshot::Bool(true)));
        assert_eq!(probe("i > n or i == 3", &env), Some(Snapshot::Bool(true)));
    }

    #[test]
    fn test_len_and_index() {
        let env = vars(&[
            ("arr", Snapshot::Array(vec![int(4), int(9)].into())),
            ("i", int(1)),
        ]);
        assert_eq!(probe("len(arr)", &env), Some(int(2)));
        assert_eq!(probe("arr[i]", &env), Some(int(9)));
        assert_eq!(probe("arr[i + 1]", &env), None);
    }

    #[test]
    fn test_unbound_and_zero_division_do_not_hold() {
        let env = vars(&[("i", int(0))]);
        let expr = parse_expression("j < 3", Language::Python).unwrap();
        assert!(!holds(&expr.node, &env));
        let expr = parse_expression("1 // i == 0", Language::Python).unwrap();
        assert!(!holds(&expr.node, &env));
    }
}
