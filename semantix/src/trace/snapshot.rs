//! Frozen copies of runtime values

use crate::interp::{ArrayRef, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::mem::size_of;
use std::rc::Rc;

/// Stand-in for an array found inside itself
const CYCLE: &str = "[...]";

/// Immutable copy of a value as it was when a step was recorded. Strings and
/// arrays are shared between steps that saw the same contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Int(BigInt),
    Float(f64),
    Bool(bool),
    Str(Rc<str>),
    Array(Rc<[Snapshot]>),
    Null,
}

impl Snapshot {
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Snapshot::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Snapshot]> {
        match self {
            Snapshot::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric view, for relations over numbers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Snapshot::Int(n) => n.to_f64(),
            Snapshot::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<&Value> for Snapshot {
    fn from(value: &Value) -> Self {
        Freezer::default().freeze(value, None)
    }
}

/// Freezes the values of one run.
///
/// The frozen copy of an array is cached by identity and handed out again
/// until [`Freezer::invalidate`] reports that some array may have changed.
/// Every byte of new snapshot storage is counted in [`Freezer::allocated`].
#[derive(Default)]
pub struct Freezer {
    arrays: HashMap<*const RefCell<Vec<Value>>, (ArrayRef, Snapshot)>,
    allocated: u64,
}

impl Freezer {
    /// Freeze `value`, reusing `previous` when it already holds the same string
    pub fn freeze(&mut self, value: &Value, previous: Option<&Snapshot>) -> Snapshot {
        if let (Value::Str(s), Some(Snapshot::Str(prev))) = (value, previous) {
            if **prev == **s {
                return Snapshot::Str(Rc::clone(prev));
            }
        }
        self.freeze_in(value, &mut Vec::new()).0
    }

    /// Forget every cached array copy
    pub fn invalidate(&mut self) {
        self.arrays.clear();
    }

    /// Bytes of snapshot storage created so far
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// The copy, and whether it is free of cycle stand-ins
    fn freeze_in(
        &mut self,
        value: &Value,
        open: &mut Vec<*const RefCell<Vec<Value>>>,
    ) -> (Snapshot, bool) {
        match value {
            Value::Int(n) => {
                self.allocated += n.bits() / 8;
                (Snapshot::Int(n.clone()), true)
            }
            Value::Float(f) => (Snapshot::Float(*f), true),
            Value::Bool(b) => (Snapshot::Bool(*b), true),
            Value::Str(s) => {
                self.allocated += s.len() as u64;
                (Snapshot::Str(s.as_str().into()), true)
            }
            Value::Null => (Snapshot::Null, true),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items);
                if let Some((_, frozen)) = self.arrays.get(&ptr) {
                    return (frozen.clone(), true);
                }
                if open.contains(&ptr) {
                    self.allocated += CYCLE.len() as u64;
                    return (Snapshot::Str(CYCLE.into()), false);
                }

                open.push(ptr);
                let mut whole = true;
                let copied: Vec<Snapshot> = items
                    .borrow()
                    .iter()
                    .map(|item| {
                        let (frozen, complete) = self.freeze_in(item, open);
                        whole &= complete;
                        frozen
                    })
                    .collect();
                open.pop();

                self.allocated += (copied.len() * size_of::<Snapshot>()) as u64;
                let frozen = Snapshot::Array(copied.into());
                // A copy cut short by a cycle depends on where the walk began
                if whole {
                    self.arrays.insert(ptr, (Rc::clone(items), frozen.clone()));
                }
                (frozen, whole)
            }
        }
    }
}

/// JSON numbers where they fit; oversized integers and non-finite floats as strings
impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Snapshot::Int(n) => match n.to_i64() {
                Some(small) => serializer.serialize_i64(small),
                None => serializer.serialize_str(&n.to_string()),
            },
            Snapshot::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Snapshot::Float(f) => serializer.serialize_str(&crate::interp::python_float(*f)),
            Snapshot::Bool(b) => serializer.serialize_bool(*b),
            Snapshot::Str(s) => serializer.serialize_str(s),
            Snapshot::Array(items) => serializer.collect_seq(items.iter()),
            Snapshot::Null => serializer.serialize_unit(),
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Snapshot::Int(n) => write!(f, "{n}"),
            Snapshot::Float(x) => write!(f, "{}", crate::interp::python_float(*x)),
            Snapshot::Bool(b) => write!(f, "{b}"),
            Snapshot::Str(s) => write!(f, "{s:?}"),
            Snapshot::Null => write!(f, "null"),
            Snapshot::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
