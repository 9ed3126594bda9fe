//! Execution traces
//!
//! A [`Trace`] is the ordered list of steps one run produced. Steps are
//! immutable once appended; the invariant miner and the complexity estimator
//! only ever read them.

mod activation;
mod path;
mod snapshot;

pub use activation::Activation;
pub use path::CallPath;
pub use snapshot::{Freezer, Snapshot};

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// What kind of execution a step records
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StepEvent {
    /// A simple statement finished
    Statement,
    /// A branch condition was evaluated
    Condition { outcome: bool },
    /// A loop entered its `iteration`-th pass (1-based, per loop activation)
    LoopHeader { iteration: u64 },
    /// The caller's state just before a user function is entered
    Call { callee: String },
    /// First step inside a new frame, at the definition line
    Entry { function: String },
    /// A frame produced its return value; the frame is popped right after
    Return { function: String },
}

/// One recorded snapshot of program state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    pub line: u32,
    /// Bindings of the active frame, sorted by name
    pub variables: BTreeMap<String, Snapshot>,
    /// Frame labels, outermost first
    pub call_stack: CallPath,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub event: StepEvent,
    /// Activation id of the active frame (0 = global)
    pub frame: u64,
}

impl TraceStep {
    pub fn var(&self, name: &str) -> Option<&Snapshot> {
        self.variables.get(name)
    }

    pub fn is_loop_header(&self) -> bool {
        matches!(self.event, StepEvent::LoopHeader { .. })
    }

    /// Value carried by a return step
    pub fn return_value(&self) -> Option<&Snapshot> {
        match self.event {
            StepEvent::Return { .. } => self.variables.get("return"),
            _ => None,
        }
    }
}

/// Ordered steps of one complete run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace {
    steps: Vec<TraceStep>,
}

impl Trace {
    pub fn new() -> Self {
        Trace::default()
    }

    pub(crate) fn push(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceStep> {
        self.steps.iter()
    }

    /// Every emitted output, in order
    pub fn outputs(&self) -> Vec<&str> {
        self.steps.iter().filter_map(|s| s.output.as_deref()).collect()
    }

    /// Header lines of every loop that ran at least once, ascending
    pub fn loop_lines(&self) -> Vec<u32> {
        let mut lines: Vec<u32> = self
            .steps
            .iter()
            .filter(|s| s.is_loop_header())
            .map(|s| s.line)
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }

    /// Header snapshots of the loop at `line`, across all activations
    pub fn header_snapshots(&self, line: u32) -> Vec<&TraceStep> {
        self.steps
            .iter()
            .filter(|s| s.is_loop_header() && s.line == line)
            .collect()
    }

    /// Header snapshots of the loop at `line`, split per loop activation.
    ///
    /// A recursive call inside the body can start a nested run of the same
    /// loop in another frame, so runs are tracked per frame id.
    pub fn loop_runs(&self, line: u32) -> Vec<Vec<&TraceStep>> {
        let mut runs: Vec<Vec<&TraceStep>> = Vec::new();
        let mut open: HashMap<u64, usize> = HashMap::new();
        for step in self.header_snapshots(line) {
            let continues =
                matches!(step.event, StepEvent::LoopHeader { iteration } if iteration > 1);
            match open.get(&step.frame) {
                Some(&run) if continues => runs[run].push(step),
                _ => {
                    open.insert(step.frame, runs.len());
                    runs.push(vec![step]);
                }
            }
        }
        runs
    }

    /// Deepest simultaneous user-frame nesting observed
    pub fn max_call_depth(&self) -> usize {
        self.steps
            .iter()
            .map(|s| s.call_stack.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    /// Function activations reconstructed from entry/return steps
    pub fn activations(&self) -> Vec<Activation> {
        activation::reconstruct(&self.steps)
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a TraceStep;
    type IntoIter = std::slice::Iter<'a, TraceStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use num_bigint::BigInt;

    /// Test helper: a step with integer variables
    pub(crate) fn step(line: u32, event: StepEvent, vars: &[(&str, i64)]) -> TraceStep {
        TraceStep {
            line,
            variables: vars
                .iter()
                .map(|(k, v)| (k.to_string(), Snapshot::Int(BigInt::from(*v))))
                .collect(),
            call_stack: CallPath::root("main"),
            output: None,
            event,
            frame: 0,
        }
    }

    fn header(line: u32, iteration: u64, i: i64) -> TraceStep {
        step(line, StepEvent::LoopHeader { iteration }, &[("i", i)])
    }

    #[test]
    fn test_loop_runs_split_on_first_iteration() {
        let mut trace = Trace::new();
        for (it, i) in [(1, 0), (2, 1), (1, 0), (2, 1), (3, 2)] {
            trace.push(header(3, it, i));
        }
        trace.push(header(7, 1, 0));
        let runs = trace.loop_runs(3);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].len(), 3);
        assert_eq!(trace.loop_lines(), vec![3, 7]);
        assert_eq!(trace.header_snapshots(3).len(), 5);
    }

    #[test]
    fn test_loop_runs_keep_frames_apart() {
        let mut trace = Trace::new();
        let mut outer = header(3, 1, 0);
        outer.frame = 1;
        trace.push(outer.clone());
        let mut inner = header(3, 1, 5);
        inner.frame = 2;
        trace.push(inner.clone());
        inner.event = StepEvent::LoopHeader { iteration: 2 };
        trace.push(inner);
        outer.event = StepEvent::LoopHeader { iteration: 2 };
        trace.push(outer);
        let runs = trace.loop_runs(3);
        assert_eq!(runs.len(), 2);
        assert!(runs[0].iter().all(|s| s.frame == 1));
        assert!(runs[1].iter().all(|s| s.frame == 2));
    }

    #[test]
    fn test_step_serialization_shape() {
        let mut s = step(4, StepEvent::LoopHeader { iteration: 2 }, &[("b", 1), ("a", 0)]);
        s.output = Some("8".into());
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["line"], 4);
        assert_eq!(json["variables"]["a"], 0);
        assert_eq!(json["callStack"][0], "main");
        assert_eq!(json["output"], "8");
        assert_eq!(json["event"]["kind"], "loop-header");
        assert_eq!(json["event"]["iteration"], 2);
        let keys: Vec<&String> = json["variables"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_output_omitted_when_absent() {
        let s = step(1, StepEvent::Statement, &[]);
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("output"));
    }

    #[test]
    fn test_max_call_depth() {
        let mut trace = Trace::new();
        let mut s = step(1, StepEvent::Statement, &[]);
        s.call_stack = ["main", "f(2)", "f(1)"].into_iter().collect();
        trace.push(s);
        trace.push(step(2, StepEvent::Statement, &[]));
        assert_eq!(trace.max_call_depth(), 2);
        assert_eq!(trace.outputs(), Vec::<&str>::new());
    }
}
