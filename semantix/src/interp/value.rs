//! Runtime values for the tracer

use crate::ast::{Expr, Language, UnOp};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared backing storage of an array; assignment and argument passing alias it
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Exact integer
    Int(BigInt),
    /// IEEE double
    Float(f64),
    Bool(bool),
    Str(String),
    Array(ArrayRef),
    Null,
}

impl Value {
    pub fn int(n: impl Into<BigInt>) -> Self {
        Value::Int(n.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    /// Check if value is truthy
    pub fn is_truthy(&self, language: Language) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => !n.is_zero(),
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            // `[]` is falsy only in Python
            Value::Array(items) => language != Language::Python || !items.borrow().is_empty(),
            Value::Null => false,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Integer or boolean as an integer, for arithmetic
    pub fn to_int(&self) -> Option<BigInt> {
        match self {
            Value::Int(n) => Some(n.clone()),
            Value::Bool(b) => Some(BigInt::from(u8::from(*b))),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => n.to_f64(),
            Value::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    /// Copy that shares no array storage with `self`
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Array(items) => {
                Value::array(items.borrow().iter().map(Value::deep_copy).collect())
            }
            other => other.clone(),
        }
    }

    /// Values reachable through nested arrays, `self` included. `None` once
    /// the count passes `cap` or an array contains itself.
    pub fn footprint(&self, cap: usize) -> Option<usize> {
        fn walk(
            value: &Value,
            open: &mut Vec<*const RefCell<Vec<Value>>>,
            total: &mut usize,
            cap: usize,
        ) -> bool {
            *total += 1;
            if *total > cap {
                return false;
            }
            let Value::Array(items) = value else {
                return true;
            };
            let ptr = Rc::as_ptr(items);
            if open.contains(&ptr) {
                return false;
            }
            open.push(ptr);
            let fits = items.borrow().iter().all(|item| walk(item, open, total, cap));
            open.pop();
            fits
        }

        let mut total = 0;
        walk(self, &mut Vec::new(), &mut total, cap).then_some(total)
    }

    /// Constant value of a literal expression (input bindings, fill values)
    pub fn from_literal(expr: &Expr) -> Option<Value> {
        match expr {
            Expr::Int(n) => Some(Value::Int(n.clone())),
            Expr::Float(f) => Some(Value::Float(*f)),
            Expr::Bool(b) => Some(Value::Bool(*b)),
            Expr::Str(s) => Some(Value::Str(s.clone())),
            Expr::Null => Some(Value::Null),
            Expr::Array(items) => items
                .iter()
                .map(|e| Value::from_literal(&e.node))
                .collect::<Option<Vec<_>>>()
                .map(Value::array),
            Expr::Unary {
                op: UnOp::Neg,
                expr,
            } => match Value::from_literal(&expr.node)? {
                Value::Int(n) => Some(Value::Int(-n)),
                Value::Float(f) => Some(Value::Float(-f)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Text produced when the value is printed by `language`'s output primitive
    pub fn render(&self, language: Language) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.render_nested(language),
        }
    }

    fn render_nested(&self, language: Language) -> String {
        match (self, language) {
            (Value::Int(n), _) => n.to_string(),
            (Value::Float(f), Language::Python | Language::Java) => python_float(*f),
            (Value::Float(f), Language::JavaScript) => js_number(*f),
            (Value::Float(f), Language::Cpp) => format!("{f}"),
            (Value::Bool(b), Language::Python) => (if *b { "True" } else { "False" }).into(),
            (Value::Bool(b), Language::Cpp) => u8::from(*b).to_string(),
            (Value::Bool(b), _) => b.to_string(),
            (Value::Null, Language::Python) => "None".into(),
            (Value::Null, _) => "null".into(),
            (Value::Str(s), Language::Python | Language::JavaScript) => format!("'{s}'"),
            (Value::Str(s), _) => s.clone(),
            (Value::Array(items), _) => {
                let items: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|v| v.render_nested(language))
                    .collect();
                if language == Language::JavaScript && !items.is_empty() {
                    format!("[ {} ]", items.join(", "))
                } else {
                    format!("[{}]", items.join(", "))
                }
            }
        }
    }
}

/// Python's `repr` of a float: integral values keep a `.0`
pub(crate) fn python_float(f: f64) -> String {
    if f.is_nan() {
        "nan".into()
    } else if f.is_infinite() {
        (if f > 0.0 { "inf" } else { "-inf" }).into()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn js_number(f: f64) -> String {
    if f.is_nan() {
        "NaN".into()
    } else if f.is_infinite() {
        (if f > 0.0 { "Infinity" } else { "-Infinity" }).into()
    } else {
        format!("{f}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{}", python_float(*x)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Null => write!(f, "null"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "{s:?}")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}

/// Structural equality; numbers compare across int and float
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_float() == b.as_float(),
            _ => false,
        }
    }
}
