//! Operator semantics shared by every dialect
//!
//! Integers are exact. Mixed int/float arithmetic promotes to float. Division
//! and modulo by zero are errors for both integers and floats.

use super::{RuntimeError, Value};
use crate::ast::{BinOp, Language, UnOp};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;

/// Largest result of `*`, `**` or `<<`, in bits, before it is refused
const MAX_RESULT_BITS: u64 = 1 << 20;
/// Longest string (in bytes) or array a single operation may build
pub(super) const MAX_ALLOCATION: usize = 1 << 22;

type OpResult = Result<Value, RuntimeError>;

/// Evaluate a non-short-circuiting binary operation
pub fn binary(op: BinOp, left: &Value, right: &Value, language: Language) -> OpResult {
    match op {
        BinOp::Add => add(left, right, language),
        BinOp::Mul => multiply(left, right, language),
        BinOp::Sub | BinOp::Pow => arithmetic(op, left, right, language),
        BinOp::Div | BinOp::TrueDiv | BinOp::NumDiv | BinOp::FloorDiv => {
            divide(op, left, right, language)
        }
        BinOp::Mod | BinOp::FloorMod => modulo(op, left, right, language),
        BinOp::Shl | BinOp::Shr => shift(op, left, right, language),
        BinOp::Eq => Ok(Value::Bool(equals(left, right, language))),
        BinOp::Ne => Ok(Value::Bool(!equals(left, right, language))),
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
            let ord = compare(left, right)
                .ok_or_else(|| mismatch(op, left, right))?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ord == Ordering::Less,
                BinOp::Gt => ord == Ordering::Greater,
                BinOp::Le => ord != Ordering::Greater,
                _ => ord != Ordering::Less,
            }))
        }
        BinOp::In => contains(right, left, language).map(Value::Bool),
        BinOp::NotIn => contains(right, left, language).map(|b| Value::Bool(!b)),
        // Short-circuiting operators are evaluated by the tracer; this is the
        // strict fallback.
        BinOp::And => Ok(if left.is_truthy(language) {
            right.clone()
        } else {
            left.clone()
        }),
        BinOp::Or => Ok(if left.is_truthy(language) {
            left.clone()
        } else {
            right.clone()
        }),
    }
}

pub fn unary(op: UnOp, value: &Value, language: Language) -> OpResult {
    match (op, value) {
        (UnOp::Not, v) => Ok(Value::Bool(!v.is_truthy(language))),
        (UnOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnOp::Neg, v) => match numeric_int(v, language) {
            Some(n) => Ok(Value::Int(-n)),
            None => Err(RuntimeError::type_mismatch("number", v.type_name())),
        },
    }
}

fn mismatch(op: BinOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::unsupported_operands(&op.to_string(), left.type_name(), right.type_name())
}

/// Integer view of an operand; booleans count as 0/1 except in Java
fn numeric_int(v: &Value, language: Language) -> Option<BigInt> {
    match v {
        Value::Bool(_) if language == Language::Java => None,
        other => other.to_int(),
    }
}

fn numeric_float(v: &Value, language: Language) -> Option<f64> {
    match v {
        Value::Bool(_) if language == Language::Java => None,
        Value::Str(_) | Value::Array(_) | Value::Null => None,
        other => other.as_float(),
    }
}

enum Operands {
    Ints(BigInt, BigInt),
    Floats(f64, f64),
}

fn operands(op: BinOp, left: &Value, right: &Value, language: Language) -> Result<Operands, RuntimeError> {
    if let (Some(a), Some(b)) = (numeric_int(left, language), numeric_int(right, language)) {
        return Ok(Operands::Ints(a, b));
    }
    match (numeric_float(left, language), numeric_float(right, language)) {
        (Some(a), Some(b)) => Ok(Operands::Floats(a, b)),
        _ => Err(mismatch(op, left, right)),
    }
}

/// Length of a string or array result, refused past [`MAX_ALLOCATION`]
pub(super) fn checked_length(op: &str, len: Option<usize>) -> Result<usize, RuntimeError> {
    len.filter(|n| *n <= MAX_ALLOCATION)
        .ok_or_else(|| RuntimeError::invalid_argument(format!("result of {op} is too large")))
}

fn concat(a: &str, b: &str) -> OpResult {
    checked_length("+", a.len().checked_add(b.len()))?;
    Ok(Value::Str(format!("{a}{b}")))
}

fn add(left: &Value, right: &Value, language: Language) -> OpResult {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => concat(a, b),
        // Java and JavaScript stringify the other operand
        (Value::Str(a), other) if language != Language::Python && language != Language::Cpp => {
            concat(a, &other.render(language))
        }
        (other, Value::Str(b)) if language != Language::Python && language != Language::Cpp => {
            concat(&other.render(language), b)
        }
        (Value::Array(a), Value::Array(b)) if language == Language::Python => {
            let (a, b) = (a.borrow(), b.borrow());
            checked_length("+", a.len().checked_add(b.len()))?;
            let mut items = a.clone();
            items.extend(b.iter().cloned());
            Ok(Value::array(items))
        }
        _ => arithmetic(BinOp::Add, left, right, language),
    }
}

/// Python repetition count; negative counts repeat zero times
fn repeat_count(n: &BigInt) -> Result<usize, RuntimeError> {
    if n.is_negative() {
        return Ok(0);
    }
    n.to_usize()
        .ok_or_else(|| RuntimeError::invalid_argument("result of * is too large"))
}

fn multiply(left: &Value, right: &Value, language: Language) -> OpResult {
    if language == Language::Python {
        match (left, right) {
            (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
                let times = repeat_count(n)?;
                checked_length("*", s.len().checked_mul(times))?;
                return Ok(Value::Str(s.repeat(times)));
            }
            (Value::Array(items), Value::Int(n)) | (Value::Int(n), Value::Array(items)) => {
                let times = repeat_count(n)?;
                let items = items.borrow();
                let len = checked_length("*", items.len().checked_mul(times))?;
                let mut out = Vec::with_capacity(len);
                for _ in 0..times {
                    out.extend(items.iter().cloned());
                }
                return Ok(Value::array(out));
            }
            _ => {}
        }
    }
    arithmetic(BinOp::Mul, left, right, language)
}

fn arithmetic(op: BinOp, left: &Value, right: &Value, language: Language) -> OpResult {
    match operands(op, left, right, language)? {
        Operands::Ints(a, b) => match op {
            BinOp::Add => Ok(Value::Int(a + b)),
            BinOp::Sub => Ok(Value::Int(a - b)),
            BinOp::Mul if a.bits().saturating_add(b.bits()) > MAX_RESULT_BITS => {
                Err(RuntimeError::invalid_argument("result of * is too large"))
            }
            BinOp::Mul => Ok(Value::Int(a * b)),
            _ => power(a, b),
        },
        Operands::Floats(a, b) => Ok(Value::Float(match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            _ => a.powf(b),
        })),
    }
}

fn power(base: BigInt, exp: BigInt) -> OpResult {
    if exp.is_negative() {
        let (b, e) = (base.to_f64(), exp.to_f64());
        return match (b, e) {
            (Some(_), _) if base.is_zero() => Err(RuntimeError::division_by_zero()),
            (Some(b), Some(e)) => Ok(Value::Float(b.powf(e))),
            _ => Err(RuntimeError::invalid_argument("exponent out of range")),
        };
    }
    let exp = exp
        .to_u32()
        .ok_or_else(|| RuntimeError::invalid_argument("exponent out of range"))?;
    if base.bits().saturating_mul(u64::from(exp)) > MAX_RESULT_BITS {
        return Err(RuntimeError::invalid_argument("result of ** is too large"));
    }
    Ok(Value::Int(num_traits::pow(base, exp as usize)))
}

fn divide(op: BinOp, left: &Value, right: &Value, language: Language) -> OpResult {
    match operands(op, left, right, language)? {
        Operands::Ints(_, b) if b.is_zero() => Err(RuntimeError::division_by_zero()),
        Operands::Floats(_, b) if b == 0.0 => Err(RuntimeError::division_by_zero()),
        Operands::Ints(a, b) => match op {
            BinOp::Div => Ok(Value::Int(a / b)),
            BinOp::FloorDiv => Ok(Value::Int(a.div_floor(&b))),
            BinOp::NumDiv if (&a % &b).is_zero() => Ok(Value::Int(a / b)),
            _ => match (a.to_f64(), b.to_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(a / b)),
                _ => Err(RuntimeError::invalid_argument("integer too large to divide as float")),
            },
        },
        Operands::Floats(a, b) => Ok(Value::Float(match op {
            BinOp::FloorDiv => (a / b).floor(),
            _ => a / b,
        })),
    }
}

fn modulo(op: BinOp, left: &Value, right: &Value, language: Language) -> OpResult {
    match operands(op, left, right, language)? {
        Operands::Ints(_, b) if b.is_zero() => Err(RuntimeError::division_by_zero()),
        Operands::Floats(_, b) if b == 0.0 => Err(RuntimeError::division_by_zero()),
        Operands::Ints(a, b) => Ok(Value::Int(if op == BinOp::FloorMod {
            a.mod_floor(&b)
        } else {
            a % b
        })),
        Operands::Floats(a, b) => Ok(Value::Float(if op == BinOp::FloorMod {
            a - b * (a / b).floor()
        } else {
            a % b
        })),
    }
}

fn shift(op: BinOp, left: &Value, right: &Value, language: Language) -> OpResult {
    let (a, b) = match (numeric_int(left, language), numeric_int(right, language)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(mismatch(op, left, right)),
    };
    let amount = b
        .to_u64()
        .ok_or_else(|| RuntimeError::invalid_argument("negative shift count"))?;
    match op {
        BinOp::Shl if a.bits().saturating_add(amount) > MAX_RESULT_BITS => {
            Err(RuntimeError::invalid_argument("result of << is too large"))
        }
        BinOp::Shl => Ok(Value::Int(a << amount as usize)),
        _ => {
            let amount = usize::try_from(amount).unwrap_or(usize::MAX);
            // Arithmetic shift: floor toward negative infinity
            Ok(Value::Int(if amount as u64 > a.bits() {
                if a.is_negative() {
                    BigInt::from(-1)
                } else {
                    BigInt::zero()
                }
            } else {
                a >> amount
            }))
        }
    }
}

/// `==` per dialect: JavaScript and Java compare arrays by identity
pub fn equals(left: &Value, right: &Value, language: Language) -> bool {
    match (left, right) {
        (Value::Array(a), Value::Array(b))
            if matches!(language, Language::JavaScript | Language::Java) =>
        {
            std::rc::Rc::ptr_eq(a, b)
        }
        _ => left == right,
    }
}

/// Ordering of two values, if they are comparable
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            for (x, y) in a.iter().zip(b.iter()) {
                match compare(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        (a, b) if a.is_numeric() && b.is_numeric() => {
            if let (Some(x), Some(y)) = (a.to_int(), b.to_int()) {
                return Some(x.cmp(&y));
            }
            a.as_float()?.partial_cmp(&b.as_float()?)
        }
        _ => None,
    }
}

/// Membership: element of an array or substring of a string
pub fn contains(container: &Value, item: &Value, language: Language) -> Result<bool, RuntimeError> {
    match (container, item) {
        (Value::Array(items), item) => Ok(items.borrow().iter().any(|v| equals(v, item, language))),
        (Value::Str(s), Value::Str(sub)) => Ok(s.contains(sub.as_str())),
        _ => Err(RuntimeError::unsupported_operands(
            "in",
            item.type_name(),
            container.type_name(),
        )),
    }
}

/// Resolve `index` against a sequence of length `len`. Python counts
/// negative indices from the end.
pub fn resolve_index(index: &Value, len: usize, language: Language) -> Result<usize, RuntimeError> {
    let n = match index {
        Value::Int(n) => n.clone(),
        Value::Float(f) if language == Language::JavaScript && f.fract() == 0.0 => {
            BigInt::from_f64(*f).unwrap_or_default()
        }
        other => return Err(RuntimeError::type_mismatch("int index", other.type_name())),
    };
    let adjusted = if n.is_negative() && language == Language::Python {
        &n + BigInt::from(len)
    } else {
        n.clone()
    };
    match adjusted.to_usize() {
        Some(i) if i < len => Ok(i),
        _ => Err(RuntimeError::index_out_of_bounds(&n.to_string(), len)),
    }
}

/// `base[index]`
pub fn index(base: &Value, index: &Value, language: Language) -> OpResult {
    match base {
        Value::Array(items) => {
            let items = items.borrow();
            let i = resolve_index(index, items.len(), language)?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = resolve_index(index, chars.len(), language)?;
            Ok(Value::Str(chars[i].to_string()))
        }
        other => Err(RuntimeError::type_mismatch("array or string", other.type_name())),
    }
}

/// Clamp a slice bound the way Python and JavaScript do
fn slice_bound(bound: Option<&Value>, len: usize, default: usize) -> Result<usize, RuntimeError> {
    let Some(bound) = bound else {
        return Ok(default);
    };
    let n = bound
        .to_int()
        .ok_or_else(|| RuntimeError::type_mismatch("int slice bound", bound.type_name()))?;
    let len_big = BigInt::from(len);
    let n = if n.is_negative() { n + &len_big } else { n };
    Ok(n.clamp(BigInt::zero(), len_big).to_usize().unwrap_or(len))
}

/// `base[start:end]`; always a fresh copy
pub fn slice(base: &Value, start: Option<&Value>, end: Option<&Value>) -> OpResult {
    match base {
        Value::Array(items) => {
            let items = items.borrow();
            let lo = slice_bound(start, items.len(), 0)?;
            let hi = slice_bound(end, items.len(), items.len())?;
            Ok(Value::array(items[lo..hi.max(lo)].to_vec()))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let lo = slice_bound(start, chars.len(), 0)?;
            let hi = slice_bound(end, chars.len(), chars.len())?;
            Ok(Value::Str(chars[lo..hi.max(lo)].iter().collect()))
        }
        other => Err(RuntimeError::type_mismatch("array or string", other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;

    fn int(n: i64) -> Value {
        Value::int(n)
    }

    #[test]
    fn test_division_per_dialect() {
        let (a, b) = (int(7), int(2));
        assert_eq!(binary(BinOp::Div, &a, &b, Language::Java).unwrap(), int(3));
        assert_eq!(binary(BinOp::TrueDiv, &a, &b, Language::Python).unwrap(), Value::Float(3.5));
        assert_eq!(binary(BinOp::NumDiv, &a, &b, Language::JavaScript).unwrap(), Value::Float(3.5));
        assert!(matches!(
            binary(BinOp::NumDiv, &int(8), &b, Language::JavaScript).unwrap(),
            Value::Int(_)
        ));
        assert_eq!(binary(BinOp::FloorDiv, &int(-7), &b, Language::Python).unwrap(), int(-4));
        assert_eq!(binary(BinOp::Div, &int(-7), &b, Language::Cpp).unwrap(), int(-3));
    }

    #[test]
    fn test_modulo_sign() {
        assert_eq!(binary(BinOp::FloorMod, &int(-7), &int(3), Language::Python).unwrap(), int(2));
        assert_eq!(binary(BinOp::Mod, &int(-7), &int(3), Language::Java).unwrap(), int(-1));
    }

    #[test]
    fn test_division_by_zero_is_error_for_ints_and_floats() {
        for (l, r) in [(int(1), int(0)), (Value::Float(1.0), Value::Float(0.0))] {
            let err = binary(BinOp::TrueDiv, &l, &r, Language::Python).unwrap_err();
            assert_eq!(err.kind, ErrorKind::DivisionByZero);
        }
        let err = binary(BinOp::Mod, &int(5), &int(0), Language::Cpp).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_integers_are_exact() {
        let big = binary(BinOp::Pow, &int(2), &int(100), Language::Python).unwrap();
        assert_eq!(big.to_string(), "1267650600228229401496703205376");
        let sum = binary(BinOp::Add, &int(i64::MAX), &int(1), Language::Java).unwrap();
        assert_eq!(sum.to_string(), "9223372036854775808");
    }

    #[test]
    fn test_string_concat_rules() {
        let s = Value::Str("n=".into());
        assert_eq!(
            binary(BinOp::Add, &s, &int(3), Language::Java).unwrap(),
            Value::Str("n=3".into())
        );
        let err = binary(BinOp::Add, &s, &int(3), Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_type_mismatch_string_plus_array() {
        let err = binary(
            BinOp::Add,
            &Value::Str("a".into()),
            &Value::array(vec![]),
            Language::Python,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_python_repetition() {
        let arr = Value::array(vec![int(0)]);
        let out = binary(BinOp::Mul, &arr, &int(3), Language::Python).unwrap();
        assert_eq!(out.to_string(), "[0, 0, 0]");
        let s = binary(BinOp::Mul, &Value::Str("ab".into()), &int(2), Language::Python).unwrap();
        assert_eq!(s, Value::Str("abab".into()));
    }

    #[test]
    fn test_oversized_repetition_is_refused() {
        let s = Value::Str("ab".into());
        let err = binary(BinOp::Mul, &s, &int(4_000_000_000), Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        let huge = Value::Int(BigInt::from(u64::MAX) * 4);
        let err = binary(BinOp::Mul, &huge, &Value::array(vec![int(0)]), Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        let none = binary(BinOp::Mul, &s, &int(-3), Language::Python).unwrap();
        assert_eq!(none, Value::Str(String::new()));
    }

    #[test]
    fn test_oversized_concatenation_is_refused() {
        let half = Value::Str("x".repeat(MAX_ALLOCATION / 2 + 1));
        let err = binary(BinOp::Add, &half, &half, Language::JavaScript).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        let fits = Value::Str("x".repeat(MAX_ALLOCATION / 2));
        assert!(binary(BinOp::Add, &fits, &fits, Language::Python).is_ok());
    }

    #[test]
    fn test_repeated_squaring_is_capped() {
        let mut x = int(3);
        let err = loop {
            match binary(BinOp::Mul, &x, &x, Language::Python) {
                Ok(next) => x = next,
                Err(e) => break e,
            }
        };
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(err.message.contains("too large"));
        assert!(x.as_int().unwrap().bits() <= MAX_RESULT_BITS);
    }

    #[test]
    fn test_comparisons_mix_int_and_float() {
        assert_eq!(binary(BinOp::Lt, &int(1), &Value::Float(1.5), Language::Cpp).unwrap(), Value::Bool(true));
        assert_eq!(binary(BinOp::Ge, &int(2), &int(2), Language::Cpp).unwrap(), Value::Bool(true));
        let err = binary(BinOp::Lt, &int(1), &Value::Str("x".into()), Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_array_equality_per_dialect() {
        let a = Value::array(vec![int(1)]);
        let b = Value::array(vec![int(1)]);
        assert!(equals(&a, &b, Language::Python));
        assert!(!equals(&a, &b, Language::JavaScript));
        assert!(equals(&a, &a.clone(), Language::Java));
    }

    #[test]
    fn test_index_bounds() {
        let arr = Value::array(vec![int(10), int(20), int(30)]);
        assert_eq!(index(&arr, &int(-1), Language::Python).unwrap(), int(30));
        let err = index(&arr, &int(-1), Language::Java).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
        let err = index(&arr, &int(3), Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
        assert!(err.message.contains("index 3 out of bounds for length 3"));
    }

    #[test]
    fn test_slices_clamp() {
        let arr = Value::array(vec![int(1), int(2), int(3), int(4)]);
        let s = slice(&arr, Some(&int(1)), Some(&int(10))).unwrap();
        assert_eq!(s.to_string(), "[2, 3, 4]");
        let s = slice(&arr, None, Some(&int(-1))).unwrap();
        assert_eq!(s.to_string(), "[1, 2, 3]");
        let s = slice(&Value::Str("hello".into()), Some(&int(1)), Some(&int(3))).unwrap();
        assert_eq!(s, Value::Str("el".into()));
    }

    #[test]
    fn test_membership_and_shift() {
        let arr = Value::array(vec![int(1), int(2)]);
        assert_eq!(binary(BinOp::In, &int(2), &arr, Language::Python).unwrap(), Value::Bool(true));
        assert_eq!(binary(BinOp::NotIn, &int(5), &arr, Language::Python).unwrap(), Value::Bool(true));
        assert_eq!(binary(BinOp::Shr, &int(-5), &int(1), Language::Cpp).unwrap(), int(-3));
        assert_eq!(binary(BinOp::Shl, &int(3), &int(2), Language::Cpp).unwrap(), int(12));
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(UnOp::Neg, &int(4), Language::Python).unwrap(), int(-4));
        assert_eq!(unary(UnOp::Not, &int(0), Language::Python).unwrap(), Value::Bool(true));
        assert!(unary(UnOp::Neg, &Value::Str("x".into()), Language::Python).is_err());
    }
}
