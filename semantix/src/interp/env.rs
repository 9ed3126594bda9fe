//! Environment for variable bindings

use super::Value;
use std::collections::BTreeMap;

/// Bindings of one call frame.
///
/// There is no parent chain: a lookup sees only the frame it belongs to.
/// Names iterate in sorted order so snapshots are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Create or overwrite a binding
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("x", Value::int(42));
        assert_eq!(env.get("x"), Some(&Value::int(42)));
        assert!(env.get("y").is_none());
    }

    #[test]
    fn test_redefine_overwrites() {
        let mut env = Environment::new();
        env.define("x", Value::int(1));
        env.define("x", Value::Str("one".into()));
        assert_eq!(env.get("x"), Some(&Value::Str("one".into())));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_iteration_is_name_sorted() {
        let mut env = Environment::new();
        env.define("b", Value::int(2));
        env.define("a", Value::int(1));
        env.define("i", Value::int(0));
        let names: Vec<&str> = env.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "i"]);
    }
}
