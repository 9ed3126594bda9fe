//! Recursion invariants from nested activations of the same function

use crate::ast::Program;
use crate::trace::{Activation, Snapshot, Trace};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Base case and general step of one self-recursive function
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecursionInvariant {
    pub function: String,
    /// Source of the guard that held in the deepest leaf frame
    pub base_condition: Option<String>,
    /// What the base case returns: a constant, or the parameter it echoes
    pub base_return: Option<String>,
    /// `return = n * subcall.return` and friends
    pub relation: Option<String>,
    /// How each parameter changes from a frame to its recursive sub-calls
    pub argument_changes: BTreeMap<String, Vec<String>>,
    /// Deepest user-frame nesting reached by the function
    pub max_depth: usize,
    /// Frames of the function the invariant was derived from
    pub confirmed_by: usize,
}

/// One frame's return value next to its recursive sub-calls' return values
struct Row<'t> {
    frame: &'t Activation,
    result: BigInt,
    subcalls: Vec<BigInt>,
}

/// Activations indexed by frame id
struct CallGraph<'t> {
    by_id: HashMap<u64, &'t Activation>,
}

impl<'t> CallGraph<'t> {
    fn new(all: &'t [Activation]) -> Self {
        CallGraph {
            by_id: all.iter().map(|a| (a.id, a)).collect(),
        }
    }

    /// Direct sub-calls of `frame` to its own function
    fn self_calls(&self, frame: &Activation) -> Vec<&'t Activation> {
        frame
            .children
            .iter()
            .filter_map(|id| self.by_id.get(id).copied())
            .filter(|child| child.function == frame.function)
            .collect()
    }
}

pub fn infer(trace: &Trace, program: &Program) -> Vec<RecursionInvariant> {
    let all = trace.activations();
    let graph = CallGraph::new(&all);

    let mut out = Vec::new();
    for function in &program.functions {
        let frames: Vec<&Activation> = all
            .iter()
            .filter(|a| a.function == function.name && a.return_value.is_some())
            .collect();
        if frames.iter().all(|a| graph.self_calls(a).is_empty()) {
            continue;
        }
        let miner = RecursionMiner {
            program,
            params: &function.params,
            frames: &frames,
            graph: &graph,
        };
        if let Some(found) = miner.mine(&function.name) {
            log::trace!("recursion invariant for {}: {:?}", function.name, found.relation);
            out.push(found);
        }
    }
    out
}

struct RecursionMiner<'m, 't> {
    program: &'m Program,
    params: &'m [String],
    frames: &'m [&'t Activation],
    graph: &'m CallGraph<'t>,
}

impl<'t> RecursionMiner<'_, 't> {
    fn mine(&self, function: &str) -> Option<RecursionInvariant> {
        let leaves: Vec<&Activation> = self
            .frames
            .iter()
            .copied()
            .filter(|a| self.graph.self_calls(a).is_empty())
            .collect();
        // Deepest leaf; the earliest one on ties
        let deepest = leaves
            .iter()
            .copied()
            .max_by(|a, b| a.depth.cmp(&b.depth).then(b.id.cmp(&a.id)))?;

        Some(RecursionInvariant {
            function: function.to_string(),
            base_condition: self.base_condition(deepest),
            base_return: self.base_return(deepest, &leaves),
            relation: self.relation(),
            argument_changes: self.argument_changes(),
            max_depth: self.frames.iter().map(|a| a.depth).max().unwrap_or(0),
            confirmed_by: self.frames.len(),
        })
    }

    fn base_condition(&self, leaf: &Activation) -> Option<String> {
        if let Some((line, _)) = leaf.conditions.iter().rev().find(|(_, taken)| *taken) {
            return self.program.condition_text(*line).map(str::to_string);
        }
        let (line, _) = leaf.conditions.last()?;
        self.program
            .condition_text(*line)
            .map(|text| format!("not ({text})"))
    }

    /// The constant every matching leaf returns, or the parameter they all echo
    fn base_return(&self, deepest: &Activation, leaves: &[&Activation]) -> Option<String> {
        let value = deepest.return_value.as_ref()?;
        let exit = deepest.conditions.last();
        let same_exit: Vec<&Activation> = leaves
            .iter()
            .copied()
            .filter(|a| a.conditions.last() == exit)
            .collect();
        if same_exit.iter().all(|a| a.return_value.as_ref() == Some(value)) {
            return Some(value.to_string());
        }
        self.params
            .iter()
            .find(|p| {
                same_exit
                    .iter()
                    .all(|a| a.return_value.is_some() && a.return_value.as_ref() == a.args.get(*p))
            })
            .cloned()
            .or_else(|| Some(value.to_string()))
    }

    fn rows(&self) -> Option<Vec<Row<'t>>> {
        let mut rows = Vec::new();
        for &frame in self.frames {
            let subs = self.graph.self_calls(frame);
            if subs.is_empty() {
                continue;
            }
            let result = frame.return_value.as_ref()?.as_int()?.clone();
            let subcalls = subs
                .iter()
                .map(|s| s.return_value.as_ref()?.as_int().cloned())
                .collect::<Option<Vec<_>>>()?;
            rows.push(Row {
                frame,
                result,
                subcalls,
            });
        }
        (!rows.is_empty()).then_some(rows)
    }

    fn relation(&self) -> Option<String> {
        let rows = self.rows()?;
        if rows.iter().all(|r| r.subcalls.len() == 1) {
            self.single_relation(&rows)
        } else {
            aggregate_relation(&rows)
        }
    }

    /// One sub-call per frame: identity, offset, parameter sum or product, scaling
    fn single_relation(&self, rows: &[Row<'t>]) -> Option<String> {
        let pairs: Vec<(&BigInt, &BigInt)> =
            rows.iter().map(|r| (&r.result, &r.subcalls[0])).collect();
        if pairs.iter().all(|(r, s)| r == s) {
            return Some("return = subcall.return".to_string());
        }

        let (r0, s0) = pairs[0];
        let offset = r0 - s0;
        if !offset.is_zero() && pairs.iter().all(|(r, s)| *r - *s == offset) {
            return Some(match offset.cmp(&BigInt::zero()) {
                Ordering::Less => format!("return = subcall.return - {}", -offset),
                _ => format!("return = subcall.return + {offset}"),
            });
        }

        for p in self.params {
            if rows
                .iter()
                .all(|row| arg_int(row, p).is_some_and(|x| row.result == x + &row.subcalls[0]))
            {
                return Some(format!("return = {p} + subcall.return"));
            }
        }
        for p in self.params {
            if rows
                .iter()
                .all(|row| arg_int(row, p).is_some_and(|x| row.result == x * &row.subcalls[0]))
            {
                return Some(format!("return = {p} * subcall.return"));
            }
        }

        if s0.is_zero() || !(r0 % s0).is_zero() {
            return None;
        }
        let scale = (r0 / s0).to_i64()?;
        pairs
            .iter()
            .all(|(r, s)| **r == *s * scale)
            .then(|| format!("return = {scale} * subcall.return"))
    }

    fn argument_changes(&self) -> BTreeMap<String, Vec<String>> {
        let mut out = BTreeMap::new();
        for p in self.params {
            let mut pairs: Vec<(&Snapshot, &Snapshot)> = Vec::new();
            for &frame in self.frames {
                for child in self.graph.self_calls(frame) {
                    if let (Some(before), Some(after)) = (frame.args.get(p), child.args.get(p)) {
                        pairs.push((before, after));
                    }
                }
            }
            if !pairs.is_empty() {
                out.insert(p.clone(), describe_changes(p, &pairs));
            }
        }
        out
    }
}

fn arg_int(row: &Row<'_>, param: &str) -> Option<BigInt> {
    row.frame.args.get(param)?.as_int().cloned()
}

fn subcall_sum(row: &Row<'_>) -> BigInt {
    row.subcalls.iter().sum()
}

/// Several sub-calls per frame: sum (plus a constant), product, max or min
fn aggregate_relation(rows: &[Row<'_>]) -> Option<String> {
    let first = &rows[0];
    let offset = &first.result - subcall_sum(first);
    if rows.iter().all(|r| r.result.clone() - subcall_sum(r) == offset) {
        return Some(match offset.cmp(&BigInt::zero()) {
            Ordering::Equal => "return = sum(subcall.return)".to_string(),
            Ordering::Greater => format!("return = sum(subcall.return) + {offset}"),
            Ordering::Less => format!("return = sum(subcall.return) - {}", -offset),
        });
    }
    if rows
        .iter()
        .all(|r| r.result == r.subcalls.iter().product::<BigInt>())
    {
        return Some("return = product(subcall.return)".to_string());
    }
    if rows.iter().all(|r| r.subcalls.iter().max() == Some(&r.result)) {
        return Some("return = max(subcall.return)".to_string());
    }
    if rows.iter().all(|r| r.subcalls.iter().min() == Some(&r.result)) {
        return Some("return = min(subcall.return)".to_string());
    }
    None
}

/// `unchanged`, `n / 2`, or the distinct constant steps (`n - 1`, `n - 2`)
fn describe_changes(param: &str, pairs: &[(&Snapshot, &Snapshot)]) -> Vec<String> {
    if pairs.iter().all(|(before, after)| before == after) {
        return vec!["unchanged".to_string()];
    }
    let ints: Option<Vec<(&BigInt, &BigInt)>> = pairs
        .iter()
        .map(|(before, after)| Some((before.as_int()?, after.as_int()?)))
        .collect();
    let Some(ints) = ints else {
        return vec!["varies".to_string()];
    };
    if ints
        .iter()
        .all(|(before, after)| *after == &before.div_floor(&BigInt::from(2)))
    {
        return vec![format!("{param} / 2")];
    }

    let mut out: Vec<String> = Vec::new();
    for (before, after) in ints {
        let delta = after - before;
        let text = match delta.cmp(&BigInt::zero()) {
            Ordering::Equal => "unchanged".to_string(),
            Ordering::Less => format!("{param} - {}", -delta),
            Ordering::Greater => format!("{param} + {delta}"),
        };
        if !out.contains(&text) {
            out.push(text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Language;
    use crate::interp::{self, Limits};
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn mine(src: &str, language: Language) -> Vec<RecursionInvariant> {
        let program = parse(src, language).unwrap();
        let trace = interp::trace(&program, &[], Limits::default()).unwrap();
        infer(&trace, &program)
    }

    #[test]
    fn test_factorial() {
        let src = "\
def factorial(n):
    if n <= 1:
        return 1
    return n * factorial(n - 1)

print(factorial(5))
";
        let found = mine(src, Language::Python);
        assert_eq!(found.len(), 1);
        let inv = &found[0];
        assert_eq!(inv.function, "factorial");
        assert_eq!(inv.base_condition.as_deref(), Some("n <= 1"));
        assert_eq!(inv.base_return.as_deref(), Some("1"));
        assert_eq!(inv.relation.as_deref(), Some("return = n * subcall.return"));
        assert_eq!(inv.argument_changes["n"], vec!["n - 1"]);
        assert_eq!(inv.max_depth, 5);
        assert_eq!(inv.confirmed_by, 5);
    }

    #[test]
    fn test_tree_recursion_sums_subcalls() {
        let src = "\
function fib(n) {
  if (n < 2) {
    return n;
  }
  return fib(n - 1) + fib(n - 2);
}
console.log(fib(6));
";
        let found = mine(src, Language::JavaScript);
        let inv = &found[0];
        assert_eq!(inv.base_condition.as_deref(), Some("n < 2"));
        assert_eq!(inv.base_return.as_deref(), Some("n"));
        assert_eq!(inv.relation.as_deref(), Some("return = sum(subcall.return)"));
        assert_eq!(inv.argument_changes["n"], vec!["n - 1", "n - 2"]);
    }

    #[test]
    fn test_else_path_base_case_is_negated() {
        let src = "\
def count(n):
    if n > 0:
        return count(n - 1) + 2
    else:
        return 0

print(count(3))
";
        let found = mine(src, Language::Python);
        let inv = &found[0];
        assert_eq!(inv.base_condition.as_deref(), Some("not (n > 0)"));
        assert_eq!(inv.base_return.as_deref(), Some("0"));
        assert_eq!(inv.relation.as_deref(), Some("return = subcall.return + 2"));
    }

    #[test]
    fn test_halving_argument() {
        let src = "\
def bits(n):
    if n == 0:
        return 0
    return 1 + bits(n // 2)

print(bits(37))
";
        let found = mine(src, Language::Python);
        let inv = &found[0];
        assert_eq!(inv.argument_changes["n"], vec!["n / 2"]);
        assert_eq!(inv.relation.as_deref(), Some("return = subcall.return + 1"));
    }

    #[test]
    fn test_non_recursive_functions_are_skipped() {
        let src = "\
def square(x):
    return x * x

print(square(4))
";
        assert!(mine(src, Language::Python).is_empty());
    }
}
