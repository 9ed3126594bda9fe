//! Function activations recovered from a finished trace

use super::{Snapshot, StepEvent, TraceStep};
use std::collections::BTreeMap;

/// One function invocation as seen in the trace
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    /// Frame id of this activation
    pub id: u64,
    pub function: String,
    /// Frame id of the caller (0 = global)
    pub parent: u64,
    /// User-frame nesting depth, 1 for a call from the global frame
    pub depth: usize,
    /// Parameter bindings at entry
    pub args: BTreeMap<String, Snapshot>,
    pub return_value: Option<Snapshot>,
    pub return_line: Option<u32>,
    /// Conditions evaluated directly in this frame: (line, outcome)
    pub conditions: Vec<(u32, bool)>,
    /// Ids of the activations this one called, in call order
    pub children: Vec<u64>,
}

pub(super) fn reconstruct(steps: &[TraceStep]) -> Vec<Activation> {
    let mut out: Vec<Activation> = Vec::new();
    // Indices into `out` of the frames currently open
    let mut open: Vec<usize> = Vec::new();

    for step in steps {
        match &step.event {
            StepEvent::Entry { function } => {
                let parent = open.last().map_or(0, |&i| out[i].id);
                if let Some(&i) = open.last() {
                    out[i].children.push(step.frame);
                }
                out.push(Activation {
                    id: step.frame,
                    function: function.clone(),
                    parent,
                    depth: open.len() + 1,
                    args: step.variables.clone(),
                    return_value: None,
                    return_line: None,
                    conditions: Vec::new(),
                    children: Vec::new(),
                });
                open.push(out.len() - 1);
            }
            StepEvent::Condition { outcome } => {
                if let Some(&i) = open.last() {
                    if out[i].id == step.frame {
                        out[i].conditions.push((step.line, *outcome));
                    }
                }
            }
            StepEvent::Return { .. } => {
                if let Some(&i) = open.last() {
                    if out[i].id == step.frame {
                        out[i].return_value = step.return_value().cloned();
                        out[i].return_line = Some(step.line);
                        open.pop();
                    }
                }
            }
            _ => {}
        }
    }
    out
}
