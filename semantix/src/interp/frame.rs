//! Call frames and the explicit call stack
//!
//! The global frame sits below every user frame and lives for the whole run.
//! User frames are pushed on function entry and popped on return or when an
//! error propagates out of the callee, so the host stack never mirrors the
//! analysed program's recursion on its own.

use super::{Environment, Value};
use crate::trace::CallPath;

/// Name of the global frame in call-stack listings
pub const GLOBAL_FRAME: &str = "main";

/// Activation record for one function invocation
#[derive(Debug)]
pub struct CallFrame {
    /// Unique per activation; the global frame is 0
    pub id: u64,
    pub function: String,
    /// Label shown in call-stack listings, e.g. `fact(3)`
    pub label: String,
    pub env: Environment,
    /// Value carried by the `return` that ended the frame
    pub return_value: Option<Value>,
}

impl CallFrame {
    fn global() -> Self {
        CallFrame {
            id: 0,
            function: GLOBAL_FRAME.to_string(),
            label: GLOBAL_FRAME.to_string(),
            env: Environment::new(),
            return_value: None,
        }
    }
}

/// Stack of call frames, index 0 is global
#[derive(Debug)]
pub struct CallStack {
    global: CallFrame,
    frames: Vec<CallFrame>,
    /// Labels of every frame, shared with the steps recorded under them
    path: CallPath,
    next_id: u64,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStack {
    pub fn new() -> Self {
        CallStack {
            global: CallFrame::global(),
            frames: Vec::new(),
            path: CallPath::root(GLOBAL_FRAME),
            next_id: 1,
        }
    }

    /// Push a frame for `function` with its parameters bound; returns its id
    pub fn push(&mut self, function: &str, params: &[String], args: Vec<Value>) -> u64 {
        let label = format!(
            "{function}({})",
            args.iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut env = Environment::new();
        for (param, arg) in params.iter().zip(args) {
            env.define(param.clone(), arg);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.path = self.path.child(label.clone());
        self.frames.push(CallFrame {
            id,
            function: function.to_string(),
            label,
            env,
            return_value: None,
        });
        id
    }

    /// Pop the innermost user frame; the global frame is never popped
    pub fn pop(&mut self) -> Option<CallFrame> {
        let frame = self.frames.pop()?;
        self.path = self.path.parent();
        Some(frame)
    }

    pub fn current(&self) -> &CallFrame {
        self.frames.last().unwrap_or(&self.global)
    }

    pub fn current_mut(&mut self) -> &mut CallFrame {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.global,
        }
    }

    /// Number of user frames (the global frame is not counted)
    pub fn user_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn in_global(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame labels from outermost to innermost
    pub fn path(&self) -> &CallPath {
        &self.path
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.current_mut().env.define(name, value);
    }

    /// Look up a variable in the active frame only
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.current().env.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_frame_always_present() {
        let mut stack = CallStack::new();
        assert!(stack.in_global());
        assert_eq!(stack.current().id, 0);
        assert!(stack.pop().is_none());
        assert_eq!(*stack.path(), vec!["main"]);
    }

    #[test]
    fn test_push_binds_params_and_labels() {
        let mut stack = CallStack::new();
        let id = stack.push("fact", &["n".to_string()], vec![Value::int(3)]);
        assert_eq!(id, 1);
        assert_eq!(stack.user_depth(), 1);
        assert_eq!(stack.get("n"), Some(&Value::int(3)));
        assert_eq!(*stack.path(), vec!["main", "fact(3)"]);
        stack.pop();
        assert_eq!(*stack.path(), vec!["main"]);
    }

    #[test]
    fn test_lookup_does_not_walk_outer_frames() {
        let mut stack = CallStack::new();
        stack.define("total", Value::int(10));
        stack.push("f", &[], Vec::new());
        assert!(stack.get("total").is_none());
        stack.pop();
        assert_eq!(stack.get("total"), Some(&Value::int(10)));
    }

    #[test]
    fn test_ids_are_unique_per_activation() {
        let mut stack = CallStack::new();
        let a = stack.push("f", &[], Vec::new());
        stack.pop();
        let b = stack.push("f", &[], Vec::new());
        assert_ne!(a, b);
    }
}
