//! Built-in functions
//!
//! Method calls such as `arr.push(x)` or `s.length()` reach here after the
//! parser has lowered them to calls with the receiver as first argument.

use super::ops;
use super::{RuntimeError, Value};
use crate::ast::{BinOp, Language};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, Zero};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Builtin function type
pub type BuiltinFn = fn(&[Value], Language) -> Result<Value, RuntimeError>;

/// Name to implementation table
pub fn registry() -> HashMap<&'static str, BuiltinFn> {
    let mut builtins: HashMap<&'static str, BuiltinFn> = HashMap::new();
    builtins.insert("len", builtin_len);
    builtins.insert("abs", builtin_abs);
    builtins.insert("min", builtin_min);
    builtins.insert("max", builtin_max);
    builtins.insert("sum", builtin_sum);
    builtins.insert("int", builtin_int);
    builtins.insert("float", builtin_float);
    builtins.insert("str", builtin_str);
    builtins.insert("bool", builtin_bool);
    builtins.insert("append", builtin_append);
    builtins.insert("pop", builtin_pop);
    builtins.insert("index", builtin_index);
    builtins.insert("fill", builtin_fill);

    // Math
    builtins.insert("floor", builtin_floor);
    builtins.insert("ceil", builtin_ceil);
    builtins.insert("round", builtin_round);
    builtins.insert("sqrt", builtin_sqrt);
    builtins.insert("pow", builtin_pow);
    builtins
}

/// Whether the builtin may change an array it is given
pub fn mutates_arguments(name: &str) -> bool {
    matches!(name, "append" | "pop" | "fill")
}

fn expect_args(name: &str, args: &[Value], count: usize) -> Result<(), RuntimeError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(RuntimeError::arity_mismatch(name, count, args.len()))
    }
}

fn expect_array<'a>(name: &str, value: &'a Value) -> Result<&'a super::ArrayRef, RuntimeError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(RuntimeError::type_mismatch(
            &format!("array argument to {name}"),
            other.type_name(),
        )),
    }
}

fn float_arg(name: &str, value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => value
            .as_float()
            .ok_or_else(|| RuntimeError::invalid_argument(format!("{name}: number out of range"))),
        other => Err(RuntimeError::type_mismatch("number", other.type_name())),
    }
}

/// Float result of an integral-valued math function; Python returns an int
fn integral(f: f64, language: Language) -> Result<Value, RuntimeError> {
    if language != Language::Python {
        return Ok(Value::Float(f));
    }
    BigInt::from_f64(f)
        .map(Value::Int)
        .ok_or_else(|| RuntimeError::invalid_argument(format!("cannot convert {f} to int")))
}

fn builtin_len(args: &[Value], _: Language) -> Result<Value, RuntimeError> {
    expect_args("len", args, 1)?;
    match &args[0] {
        Value::Array(items) => Ok(Value::int(items.borrow().len())),
        Value::Str(s) => Ok(Value::int(s.chars().count())),
        other => Err(RuntimeError::type_mismatch("array or string", other.type_name())),
    }
}

fn builtin_abs(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("abs", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::Bool(b) if language != Language::Java => Ok(Value::int(u8::from(*b))),
        other => Err(RuntimeError::type_mismatch("number", other.type_name())),
    }
}

/// Shared body of `min` and `max`: one array argument or several values
fn extreme(name: &str, args: &[Value], keep: Ordering) -> Result<Value, RuntimeError> {
    let candidates: Vec<Value> = match args {
        [Value::Array(items)] => items.borrow().clone(),
        _ => args.to_vec(),
    };
    let mut iter = candidates.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| RuntimeError::invalid_argument(format!("{name}() of an empty sequence")))?;
    for candidate in iter {
        let ord = ops::compare(&candidate, &best).ok_or_else(|| {
            RuntimeError::unsupported_operands(name, candidate.type_name(), best.type_name())
        })?;
        if ord == keep {
            best = candidate;
        }
    }
    Ok(best)
}

fn builtin_min(args: &[Value], _: Language) -> Result<Value, RuntimeError> {
    extreme("min", args, Ordering::Less)
}

fn builtin_max(args: &[Value], _: Language) -> Result<Value, RuntimeError> {
    extreme("max", args, Ordering::Greater)
}

fn builtin_sum(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("sum", args, 1)?;
    let items = expect_array("sum", &args[0])?.borrow();
    items.iter().try_fold(Value::int(0), |acc, item| {
        ops::binary(BinOp::Add, &acc, item, language)
    })
}

fn builtin_int(args: &[Value], _: Language) -> Result<Value, RuntimeError> {
    expect_args("int", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.clone())),
        Value::Bool(b) => Ok(Value::int(u8::from(*b))),
        Value::Float(f) => BigInt::from_f64(f.trunc())
            .map(Value::Int)
            .ok_or_else(|| RuntimeError::invalid_argument(format!("cannot convert {f} to int"))),
        Value::Str(s) => s
            .trim()
            .parse::<BigInt>()
            .map(Value::Int)
            .map_err(|_| RuntimeError::invalid_argument(format!("invalid integer literal: {s:?}"))),
        other => Err(RuntimeError::type_mismatch("number or string", other.type_name())),
    }
}

fn builtin_float(args: &[Value], _: Language) -> Result<Value, RuntimeError> {
    expect_args("float", args, 1)?;
    match &args[0] {
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| RuntimeError::invalid_argument(format!("invalid float literal: {s:?}"))),
        other => float_arg("float", other).map(Value::Float),
    }
}

fn builtin_str(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("str", args, 1)?;
    Ok(Value::Str(args[0].render(language)))
}

fn builtin_bool(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("bool", args, 1)?;
    Ok(Value::Bool(args[0].is_truthy(language)))
}

fn builtin_append(args: &[Value], _: Language) -> Result<Value, RuntimeError> {
    expect_args("append", args, 2)?;
    expect_array("append", &args[0])?
        .borrow_mut()
        .push(args[1].clone());
    Ok(Value::Null)
}

/// `pop(arr)` removes the last element, `pop(arr, i)` the one at `i`
fn builtin_pop(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    if args.is_empty() || args.len() > 2 {
        return Err(RuntimeError::arity_mismatch("pop", 1, args.len()));
    }
    let mut items = expect_array("pop", &args[0])?.borrow_mut();
    let at = match args.get(1) {
        Some(index) => ops::resolve_index(index, items.len(), language)?,
        None if items.is_empty() => return Err(RuntimeError::index_out_of_bounds("-1", 0)),
        None => items.len() - 1,
    };
    Ok(items.remove(at))
}

/// Position of a value, or -1 when absent (Python raises instead)
fn builtin_index(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("index", args, 2)?;
    let position = match &args[0] {
        Value::Array(items) => items
            .borrow()
            .iter()
            .position(|v| ops::equals(v, &args[1], language)),
        Value::Str(s) => match &args[1] {
            Value::Str(sub) => s.find(sub.as_str()).map(|byte| s[..byte].chars().count()),
            other => return Err(RuntimeError::type_mismatch("string", other.type_name())),
        },
        other => return Err(RuntimeError::type_mismatch("array or string", other.type_name())),
    };
    match position {
        Some(i) => Ok(Value::int(i)),
        None if language == Language::Python => Err(RuntimeError::invalid_argument(format!(
            "{} is not in the sequence",
            args[1]
        ))),
        None => Ok(Value::int(-1)),
    }
}

fn builtin_fill(args: &[Value], _: Language) -> Result<Value, RuntimeError> {
    expect_args("fill", args, 2)?;
    for slot in expect_array("fill", &args[0])?.borrow_mut().iter_mut() {
        *slot = args[1].deep_copy();
    }
    Ok(args[0].clone())
}

fn builtin_floor(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("floor", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.clone())),
        other => integral(float_arg("floor", other)?.floor(), language),
    }
}

fn builtin_ceil(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("ceil", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.clone())),
        other => integral(float_arg("ceil", other)?.ceil(), language),
    }
}

fn builtin_round(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("round", args, 1)?;
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.clone())),
        other => {
            let f = float_arg("round", other)?;
            let rounded = if language == Language::Python {
                // Python rounds halves to even
                let r = f.round();
                if (f - f.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
                    r - f.signum()
                } else {
                    r
                }
            } else {
                (f + 0.5).floor()
            };
            integral(rounded, language)
        }
    }
}

fn builtin_sqrt(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("sqrt", args, 1)?;
    let f = float_arg("sqrt", &args[0])?;
    if f < 0.0 && language == Language::Python {
        return Err(RuntimeError::invalid_argument("math domain error"));
    }
    Ok(Value::Float(f.sqrt()))
}

/// Python's `pow` stays exact on integers; `Math.pow` and `std::pow` are floating
fn builtin_pow(args: &[Value], language: Language) -> Result<Value, RuntimeError> {
    expect_args("pow", args, 2)?;
    if language == Language::Python {
        return ops::binary(BinOp::Pow, &args[0], &args[1], language);
    }
    let base = float_arg("pow", &args[0])?;
    let exp = float_arg("pow", &args[1])?;
    if base == 0.0 && exp < 0.0 && exp.fract().is_zero() {
        return Ok(Value::Float(f64::INFINITY));
    }
    Ok(Value::Float(base.powf(exp)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::ErrorKind;

    fn call(name: &str, args: &[Value], language: Language) -> Result<Value, RuntimeError> {
        let builtins = registry();
        let f = builtins.get(name).expect("builtin registered");
        f(args, language)
    }

    fn ints(values: &[i64]) -> Value {
        Value::array(values.iter().map(|&n| Value::int(n)).collect())
    }

    #[test]
    fn test_len_of_array_and_string() {
        assert_eq!(call("len", &[ints(&[1, 2, 3])], Language::Python).unwrap(), Value::int(3));
        assert_eq!(
            call("len", &[Value::Str("héllo".into())], Language::Python).unwrap(),
            Value::int(5)
        );
        let err = call("len", &[Value::int(3)], Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_min_max_forms() {
        assert_eq!(call("max", &[ints(&[3, 9, 4])], Language::Python).unwrap(), Value::int(9));
        assert_eq!(
            call("min", &[Value::int(3), Value::int(-2)], Language::Java).unwrap(),
            Value::int(-2)
        );
        let err = call("max", &[ints(&[])], Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_append_mutates_shared_storage() {
        let arr = ints(&[1]);
        let alias = arr.clone();
        call("append", &[alias, Value::int(2)], Language::JavaScript).unwrap();
        assert_eq!(arr.to_string(), "[1, 2]");
    }

    #[test]
    fn test_pop_variants() {
        let arr = ints(&[1, 2, 3]);
        assert_eq!(call("pop", &[arr.clone()], Language::Python).unwrap(), Value::int(3));
        assert_eq!(
            call("pop", &[arr.clone(), Value::int(0)], Language::Python).unwrap(),
            Value::int(1)
        );
        assert_eq!(arr.to_string(), "[2]");
        call("pop", &[arr.clone()], Language::Python).unwrap();
        let err = call("pop", &[arr], Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::IndexOutOfBounds);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("int", &[Value::Float(-3.7)], Language::Python).unwrap(), Value::int(-3));
        assert_eq!(call("int", &[Value::Str(" 42 ".into())], Language::Python).unwrap(), Value::int(42));
        assert_eq!(call("float", &[Value::int(2)], Language::Python).unwrap(), Value::Float(2.0));
        assert_eq!(
            call("str", &[Value::Float(2.0)], Language::Python).unwrap(),
            Value::Str("2.0".into())
        );
        let err = call("int", &[Value::Str("x".into())], Language::Python).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_index_absent_per_dialect() {
        let arr = ints(&[5, 6]);
        assert_eq!(
            call("index", &[arr.clone(), Value::int(6)], Language::JavaScript).unwrap(),
            Value::int(1)
        );
        assert_eq!(
            call("index", &[arr.clone(), Value::int(7)], Language::Java).unwrap(),
            Value::int(-1)
        );
        assert!(call("index", &[arr, Value::int(7)], Language::Python).is_err());
    }

    #[test]
    fn test_math_helpers() {
        assert_eq!(call("floor", &[Value::Float(2.7)], Language::Python).unwrap(), Value::int(2));
        assert_eq!(call("ceil", &[Value::Float(2.1)], Language::Java).unwrap(), Value::Float(3.0));
        assert_eq!(call("round", &[Value::Float(2.5)], Language::Python).unwrap(), Value::int(2));
        assert_eq!(call("round", &[Value::Float(2.5)], Language::JavaScript).unwrap(), Value::Float(3.0));
        assert_eq!(call("sqrt", &[Value::int(16)], Language::Cpp).unwrap(), Value::Float(4.0));
        assert_eq!(call("pow", &[Value::int(2), Value::int(10)], Language::Python).unwrap(), Value::int(1024));
        assert_eq!(call("pow", &[Value::int(2), Value::int(10)], Language::Java).unwrap(), Value::Float(1024.0));
        assert_eq!(call("sum", &[ints(&[1, 2, 3])], Language::Python).unwrap(), Value::int(6));
    }

    #[test]
    fn test_fill_copies_value_into_every_slot() {
        let arr = ints(&[0, 0]);
        let row = ints(&[1]);
        call("fill", &[arr.clone(), row], Language::JavaScript).unwrap();
        if let Value::Array(items) = &arr {
            let items = items.borrow();
            match (&items[0], &items[1]) {
                (Value::Array(a), Value::Array(b)) => assert!(!std::rc::Rc::ptr_eq(a, b)),
                _ => panic!("expected nested arrays"),
            }
        }
    }
}
