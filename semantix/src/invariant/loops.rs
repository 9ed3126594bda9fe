//! Loop invariants mined from loop-header snapshots
//!
//! Every loop header records one snapshot per iteration. Candidate relations
//! are fitted to those snapshots and kept only if they hold at every one of
//! them (recurrences: at every consecutive pair within one loop activation).

use super::probe::{self, Vars};
use super::sequence::{offset_text, Sequence};
use crate::ast::{BinOp, Expr, Program, Stmt, StmtKind, Target, UnOp};
use crate::trace::{Snapshot, Trace, TraceStep};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;
use std::cmp::Ordering;

/// Snapshots needed before anything is asserted
const MIN_SNAPSHOTS: usize = 2;
/// Distinct points needed to fit a relation with free parameters
const MIN_FIT: usize = 3;
/// Index offsets tried for sequences and prefix folds, simplest first
const OFFSETS: [i64; 7] = [0, -1, 1, -2, 2, -3, 3];

/// A relation that held at every header snapshot of one loop
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopInvariant {
    /// Line of the loop header
    pub line: u32,
    pub predicate: Predicate,
    pub text: String,
    /// Snapshots (or transitions, for recurrences) the relation was checked on
    pub confirmed_by: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Predicate {
    /// `lower <= var < upper`, either end optional
    Bound {
        var: String,
        lower: Option<BoundEnd>,
        upper: Option<BoundEnd>,
    },
    /// `var == scale * of + offset`
    Affine {
        var: String,
        of: String,
        scale: i64,
        offset: i64,
    },
    /// `var == sequence(index + offset)`
    Sequence {
        var: String,
        sequence: Sequence,
        index: String,
        offset: i64,
    },
    /// `var == fold(array[0 : index + offset])`
    PrefixSum {
        var: String,
        array: String,
        index: String,
        offset: i64,
        op: Fold,
    },
    /// Relation between one iteration's value and the previous iteration's
    Recurrence { var: String, rule: Rule },
    /// The loop condition itself
    Guard {
        condition: String,
        #[serde(skip)]
        expr: Expr,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundEnd {
    pub text: String,
    pub strict: bool,
    #[serde(skip)]
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fold {
    Sum,
    Product,
}

/// `var'` in terms of the previous snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Rule {
    /// `var' == var + by`
    Step { by: i64 },
    /// `var' == var * by`
    Scale { by: i64 },
    /// `var' == from`
    Copy { from: String },
    /// `var' == var + from`
    Accumulate { from: String },
    /// `var' == left + right`
    Sum { left: String, right: String },
}

impl BoundEnd {
    fn new(expr: Expr, strict: bool) -> Self {
        BoundEnd {
            text: expr.to_string(),
            strict,
            expr,
        }
    }

    /// Does `value` sit on the correct side of this end in `vars`?
    fn admits(&self, value: &Snapshot, vars: &Vars, upper: bool) -> bool {
        let Some(end) = probe::eval(&self.expr, vars) else {
            return false;
        };
        let Some(order) = compare(value, &end) else {
            return false;
        };
        match (upper, self.strict) {
            (true, true) => order == Ordering::Less,
            (true, false) => order != Ordering::Greater,
            (false, true) => order == Ordering::Greater,
            (false, false) => order != Ordering::Less,
        }
    }
}

impl Predicate {
    /// Check against a single snapshot. Recurrences need two and always pass here.
    pub fn holds_at(&self, vars: &Vars) -> bool {
        match self {
            Predicate::Bound { var, lower, upper } => {
                let Some(value) = vars.get(var) else {
                    return false;
                };
                lower.as_ref().is_none_or(|end| end.admits(value, vars, false))
                    && upper.as_ref().is_none_or(|end| end.admits(value, vars, true))
            }
            Predicate::Affine {
                var,
                of,
                scale,
                offset,
            } => match (int(vars, var), int(vars, of)) {
                (Some(y), Some(x)) => *y == x * *scale + *offset,
                _ => false,
            },
            Predicate::Sequence {
                var,
                sequence,
                index,
                offset,
            } => {
                let term = shifted(vars, index, *offset).and_then(|m| sequence.term(m));
                matches!((term, int(vars, var)), (Some(t), Some(y)) if t == *y)
            }
            Predicate::PrefixSum {
                var,
                array,
                index,
                offset,
                op,
            } => {
                let folded = shifted(vars, index, *offset)
                    .and_then(|k| prefix_fold(vars.get(array)?, k as usize, *op));
                matches!((folded, int(vars, var)), (Some(f), Some(y)) if f == *y)
            }
            Predicate::Recurrence { .. } => true,
            Predicate::Guard { expr, .. } => probe::holds(expr, vars),
        }
    }
}

impl Rule {
    pub fn holds(&self, var: &str, prev: &Vars, next: &Vars) -> bool {
        let Some(after) = int(next, var) else {
            return false;
        };
        let expected = match self {
            Rule::Step { by } => int(prev, var).map(|x| x + *by),
            Rule::Scale { by } => int(prev, var).map(|x| x * *by),
            Rule::Copy { from } => int(prev, from).cloned(),
            Rule::Accumulate { from } => int(prev, var).zip(int(prev, from)).map(|(x, y)| x + y),
            Rule::Sum { left, right } => int(prev, left).zip(int(prev, right)).map(|(x, y)| x + y),
        };
        expected.as_ref() == Some(after)
    }

    fn render(&self, var: &str) -> String {
        match self {
            Rule::Step { by } if *by < 0 => format!("{var}' == {var} - {}", -by),
            Rule::Step { by } => format!("{var}' == {var} + {by}"),
            Rule::Scale { by } => format!("{var}' == {var} * {by}"),
            Rule::Copy { from } => format!("{var}' == {from}"),
            Rule::Accumulate { from } => format!("{var}' == {var} + {from}"),
            Rule::Sum { left, right } => format!("{var}' == {left} + {right}"),
        }
    }
}

impl LoopInvariant {
    fn new(line: u32, predicate: Predicate, text: String, confirmed_by: usize) -> Self {
        LoopInvariant {
            line,
            predicate,
            text,
            confirmed_by,
        }
    }

    /// Re-check this invariant against every header snapshot of its loop in `trace`
    pub fn holds(&self, trace: &Trace) -> bool {
        let runs = trace.loop_runs(self.line);
        match &self.predicate {
            Predicate::Recurrence { var, rule } => runs.iter().all(|run| {
                run.windows(2)
                    .all(|w| rule.holds(var, &w[0].variables, &w[1].variables))
            }),
            predicate => runs
                .iter()
                .flatten()
                .all(|step| predicate.holds_at(&step.variables)),
        }
    }
}

/// Mine every loop that ran in `trace`
pub fn infer(trace: &Trace, program: &Program) -> Vec<LoopInvariant> {
    let mut out = Vec::new();
    for line in trace.loop_lines() {
        let Some(stmt) = program.loop_at(line) else {
            continue;
        };
        let runs = trace.loop_runs(line);
        let miner = LoopMiner::new(line, stmt, &runs);
        if miner.snapshots.len() < MIN_SNAPSHOTS {
            continue;
        }
        let found = miner.mine();
        log::trace!("loop at line {line}: {} invariant(s)", found.len());
        out.extend(found);
    }
    out
}

struct LoopMiner<'a> {
    line: u32,
    stmt: &'a Stmt,
    runs: &'a [Vec<&'a TraceStep>],
    snapshots: Vec<&'a Vars>,
}

impl<'a> LoopMiner<'a> {
    fn new(line: u32, stmt: &'a Stmt, runs: &'a [Vec<&'a TraceStep>]) -> Self {
        let snapshots = runs.iter().flatten().map(|s| &s.variables).collect();
        LoopMiner {
            line,
            stmt,
            runs,
            snapshots,
        }
    }

    fn mine(&self) -> Vec<LoopInvariant> {
        let mut out = Vec::new();
        let counter = self.counter();
        let ints = self.varying_ints();

        let mut guard_subsumed = false;
        if let Some(counter) = &counter {
            if let Some((bound, subsumes)) = self.bound(counter) {
                guard_subsumed = subsumes;
                out.push(bound);
            }
        }

        for (pos, var) in ints.iter().enumerate() {
            if Some(var) == counter.as_ref() {
                if !matches!(self.stmt.kind, StmtKind::ForRange { .. }) {
                    out.extend(self.recurrence(var, &ints));
                }
                continue;
            }
            let closed = counter
                .as_deref()
                .and_then(|c| self.affine(var, c))
                .or_else(|| {
                    ints[..pos]
                        .iter()
                        .filter(|x| Some(*x) != counter.as_ref())
                        .find_map(|x| self.affine(var, x))
                })
                .or_else(|| counter.as_deref().and_then(|c| self.sequence(var, c)))
                .or_else(|| counter.as_deref().and_then(|c| self.prefix(var, c)));
            match closed {
                Some(inv) => out.push(inv),
                None => out.extend(self.recurrence(var, &ints)),
            }
        }

        if !guard_subsumed {
            out.extend(self.guard());
        }
        out
    }

    /// The variable that drives the loop
    fn counter(&self) -> Option<String> {
        match &self.stmt.kind {
            StmtKind::ForRange { var, .. } => Some(var.clone()),
            StmtKind::For { update, cond, .. } => update
                .iter()
                .find_map(assigned_var)
                .map(str::to_string)
                .or_else(|| cond.as_ref().and_then(|c| self.first_varying(&c.expr.node))),
            StmtKind::While { cond, .. } => self.first_varying(&cond.expr.node),
            _ => None,
        }
    }

    fn first_varying(&self, cond: &Expr) -> Option<String> {
        cond.variables()
            .into_iter()
            .find(|v| self.varies(v))
            .map(str::to_string)
    }

    /// Integer in every snapshot and not constant across them
    fn varies(&self, var: &str) -> bool {
        let mut values = self.snapshots.iter().map(|vars| int(vars, var));
        let Some(Some(first)) = values.next() else {
            return false;
        };
        let mut changed = false;
        for value in values {
            match value {
                Some(v) => changed |= v != first,
                None => return false,
            }
        }
        changed
    }

    fn varying_ints(&self) -> Vec<String> {
        self.snapshots
            .first()
            .map(|vars| {
                vars.keys()
                    .filter(|name| self.varies(name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn all_hold(&self, predicate: &Predicate) -> bool {
        self.snapshots.iter().all(|vars| predicate.holds_at(vars))
    }

    /// Number of distinct values `var` takes
    fn distinct(&self, var: &str) -> usize {
        let mut seen: Vec<&BigInt> = self.snapshots.iter().filter_map(|v| int(v, var)).collect();
        seen.sort();
        seen.dedup();
        seen.len()
    }

    fn observed_start(&self, counter: &str) -> Option<Expr> {
        let mut firsts = self
            .runs
            .iter()
            .filter_map(|run| run.first())
            .map(|step| int(&step.variables, counter));
        let first = firsts.next()??.clone();
        firsts
            .all(|v| v == Some(&first))
            .then_some(Expr::Int(first))
    }

    // ---- bounds ----

    /// Range bound of the counter, and whether it restates the whole loop condition
    fn bound(&self, counter: &str) -> Option<(LoopInvariant, bool)> {
        let (lower, upper, from_cond) = match &self.stmt.kind {
            StmtKind::ForRange {
                start, end, step, ..
            } => {
                let step = match step {
                    Some(step) => literal(&step.node)?,
                    None => 1,
                };
                let start = BoundEnd::new(start.node.clone(), false);
                match step.cmp(&0) {
                    Ordering::Greater => (
                        Some(start),
                        Some(exclusive_end(&end.node, BinOp::Add)),
                        CondEnd::Neither,
                    ),
                    Ordering::Less => (
                        Some(exclusive_end(&end.node, BinOp::Sub)),
                        Some(start),
                        CondEnd::Neither,
                    ),
                    Ordering::Equal => return None,
                }
            }
            StmtKind::For { init, cond, .. } => {
                let start = init
                    .iter()
                    .find_map(|s| initial_value(s, counter))
                    .or_else(|| self.observed_start(counter));
                cond_ends(&cond.as_ref()?.expr.node, counter, start)?
            }
            StmtKind::While { cond, .. } => {
                cond_ends(&cond.expr.node, counter, self.observed_start(counter))?
            }
            _ => return None,
        };

        let holds = |end: &BoundEnd, is_upper: bool| {
            self.snapshots.iter().all(|vars| {
                vars.get(counter)
                    .is_some_and(|value| end.admits(value, vars, is_upper))
            })
        };
        let lower = lower.filter(|end| holds(end, false));
        let upper = upper.filter(|end| holds(end, true));
        if lower.is_none() && upper.is_none() {
            return None;
        }

        let subsumes = match from_cond {
            CondEnd::Neither => false,
            CondEnd::Lower => lower.is_some(),
            CondEnd::Upper => upper.is_some(),
        };
        let text = bound_text(counter, lower.as_ref(), upper.as_ref());
        let predicate = Predicate::Bound {
            var: counter.to_string(),
            lower,
            upper,
        };
        Some((
            LoopInvariant::new(self.line, predicate, text, self.snapshots.len()),
            subsumes,
        ))
    }

    // ---- closed forms ----

    /// `var == k * of + c`, fitted from the first two distinct points
    fn affine(&self, var: &str, of: &str) -> Option<LoopInvariant> {
        if self.distinct(of) < MIN_FIT {
            return None;
        }
        let points: Vec<(&BigInt, &BigInt)> = self
            .snapshots
            .iter()
            .map(|vars| Some((int(vars, of)?, int(vars, var)?)))
            .collect::<Option<_>>()?;
        let (x1, y1) = points[0];
        let (x2, y2) = points.iter().find(|(x, _)| *x != x1)?;
        let dx = *x2 - x1;
        let dy = *y2 - y1;
        if !(&dy % &dx).is_zero() {
            return None;
        }
        let scale = (dy / dx).to_i64().filter(|k| *k != 0)?;
        let offset = (y1 - x1 * scale).to_i64()?;

        let predicate = Predicate::Affine {
            var: var.to_string(),
            of: of.to_string(),
            scale,
            offset,
        };
        if !self.all_hold(&predicate) {
            return None;
        }
        let rhs = match scale {
            1 => of.to_string(),
            -1 => format!("-{of}"),
            k => format!("{k} * {of}"),
        };
        let text = match offset.cmp(&0) {
            Ordering::Equal => format!("{var} == {rhs}"),
            Ordering::Greater => format!("{var} == {rhs} + {offset}"),
            Ordering::Less => format!("{var} == {rhs} - {}", -offset),
        };
        Some(LoopInvariant::new(self.line, predicate, text, self.snapshots.len()))
    }

    /// `var == fib(index + d)` and the other known sequences
    fn sequence(&self, var: &str, index: &str) -> Option<LoopInvariant> {
        if self.distinct(index) < MIN_FIT || self.distinct(var) < 2 {
            return None;
        }
        for sequence in Sequence::ALL {
            for offset in OFFSETS {
                let predicate = Predicate::Sequence {
                    var: var.to_string(),
                    sequence,
                    index: index.to_string(),
                    offset,
                };
                if self.all_hold(&predicate) {
                    let text = sequence.render(var, &offset_text(index, offset));
                    return Some(LoopInvariant::new(
                        self.line,
                        predicate,
                        text,
                        self.snapshots.len(),
                    ));
                }
            }
        }
        None
    }

    /// `var == sum(arr[0:index + d])` over any integer array in scope
    fn prefix(&self, var: &str, index: &str) -> Option<LoopInvariant> {
        let first = self.snapshots.first()?;
        let arrays = first.iter().filter_map(|(name, value)| {
            let items = value.as_array()?;
            items
                .iter()
                .all(|item| item.as_int().is_some())
                .then_some(name)
        });
        for array in arrays {
            for op in [Fold::Sum, Fold::Product] {
                for offset in OFFSETS {
                    let predicate = Predicate::PrefixSum {
                        var: var.to_string(),
                        array: array.clone(),
                        index: index.to_string(),
                        offset,
                        op,
                    };
                    if self.all_hold(&predicate) {
                        let fold = match op {
                            Fold::Sum => "sum",
                            Fold::Product => "product",
                        };
                        let text = format!(
                            "{var} == {fold}({array}[0:{}])",
                            offset_text(index, offset)
                        );
                        return Some(LoopInvariant::new(
                            self.line,
                            predicate,
                            text,
                            self.snapshots.len(),
                        ));
                    }
                }
            }
        }
        None
    }

    // ---- recurrences ----

    fn transitions(&self) -> Vec<(&'a Vars, &'a Vars)> {
        self.runs
            .iter()
            .flat_map(|run| run.windows(2).map(|w| (&w[0].variables, &w[1].variables)))
            .collect()
    }

    /// How `var` is obtained from the previous iteration
    fn recurrence(&self, var: &str, ints: &[String]) -> Option<LoopInvariant> {
        let pairs = self.transitions();
        if pairs.len() + 1 < MIN_FIT {
            return None;
        }
        let (prev, next) = pairs[0];
        let (before, after) = (int(prev, var)?, int(next, var)?);

        let others = || ints.iter().filter(|x| x.as_str() != var);
        let mut candidates = Vec::new();
        if let Some(by) = (after - before).to_i64().filter(|d| *d != 0) {
            candidates.push(Rule::Step { by });
        }
        if !before.is_zero() && (after % before).is_zero() {
            if let Some(by) = (after / before).to_i64().filter(|k| *k != 0 && *k != 1) {
                candidates.push(Rule::Scale { by });
            }
        }
        candidates.extend(others().map(|x| Rule::Copy { from: x.clone() }));
        candidates.extend(others().map(|x| Rule::Accumulate { from: x.clone() }));
        for (i, left) in others().enumerate() {
            for right in others().skip(i + 1) {
                candidates.push(Rule::Sum {
                    left: left.clone(),
                    right: right.clone(),
                });
            }
        }

        let rule = candidates
            .into_iter()
            .find(|rule| pairs.iter().all(|(p, n)| rule.holds(var, p, n)))?;
        let text = rule.render(var);
        let predicate = Predicate::Recurrence {
            var: var.to_string(),
            rule,
        };
        Some(LoopInvariant::new(self.line, predicate, text, pairs.len()))
    }

    // ---- guard ----

    fn guard(&self) -> Option<LoopInvariant> {
        let cond = match &self.stmt.kind {
            StmtKind::While { cond, .. } => cond,
            StmtKind::For {
                cond: Some(cond), ..
            } => cond,
            _ => return None,
        };
        if matches!(cond.expr.node, Expr::Bool(_) | Expr::Int(_)) {
            return None;
        }
        let predicate = Predicate::Guard {
            condition: cond.text.clone(),
            expr: cond.expr.node.clone(),
        };
        self.all_hold(&predicate).then(|| {
            LoopInvariant::new(self.line, predicate, cond.text.clone(), self.snapshots.len())
        })
    }
}

/// Which bound end, if any, restates the entire loop condition
#[derive(Debug, Clone, Copy)]
enum CondEnd {
    Neither,
    Lower,
    Upper,
}

/// Bound ends from a loop condition `counter <op> e` (possibly one conjunct of several)
fn cond_ends(
    cond: &Expr,
    counter: &str,
    start: Option<Expr>,
) -> Option<(Option<BoundEnd>, Option<BoundEnd>, CondEnd)> {
    let parts = cond.conjuncts();
    let whole = parts.len() == 1;
    let (op, other) = parts.iter().find_map(|c| normalize(c, counter))?;
    let start = start.map(|e| BoundEnd::new(e, false));
    let end = BoundEnd::new(other, matches!(op, BinOp::Lt | BinOp::Gt));
    match op {
        BinOp::Lt | BinOp::Le => Some((
            start,
            Some(end),
            if whole { CondEnd::Upper } else { CondEnd::Neither },
        )),
        BinOp::Gt | BinOp::Ge => Some((
            Some(end),
            start,
            if whole { CondEnd::Lower } else { CondEnd::Neither },
        )),
        _ => None,
    }
}

/// Rewrite a comparison as `counter <op> other`
fn normalize(expr: &Expr, counter: &str) -> Option<(BinOp, Expr)> {
    let Expr::Binary { left, op, right } = expr else {
        return None;
    };
    if !matches!(op, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge) {
        return None;
    }
    let is_counter = |e: &Expr| matches!(e, Expr::Var(name) if name == counter);
    let mentions = |e: &Expr| e.variables().contains(&counter);
    if is_counter(&left.node) && !mentions(&right.node) {
        Some((*op, right.node.clone()))
    } else if is_counter(&right.node) && !mentions(&left.node) {
        let flipped = match op {
            BinOp::Lt => BinOp::Gt,
            BinOp::Le => BinOp::Ge,
            BinOp::Gt => BinOp::Lt,
            _ => BinOp::Le,
        };
        Some((flipped, left.node.clone()))
    } else {
        None
    }
}

/// The far end of a range: `range(a, n + 1)` reads as `<= n`, anything else as `< end`
fn exclusive_end(end: &Expr, toward: BinOp) -> BoundEnd {
    if let Expr::Binary { left, op, right } = end {
        if *op == toward && literal(&right.node) == Some(1) {
            return BoundEnd::new(left.node.clone(), false);
        }
    }
    BoundEnd::new(end.clone(), true)
}

/// Value given to `counter` by a `for` initialiser
fn initial_value(stmt: &Stmt, counter: &str) -> Option<Expr> {
    match &stmt.kind {
        StmtKind::Assign {
            targets,
            op: None,
            values,
        } if targets.len() == 1 && values.len() == 1 => match &targets[0] {
            Target::Var(name) if name == counter => Some(values[0].node.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn assigned_var(stmt: &Stmt) -> Option<&str> {
    match &stmt.kind {
        StmtKind::Assign { targets, .. } => match targets.first()? {
            Target::Var(name) => Some(name),
            Target::Index { .. } => None,
        },
        _ => None,
    }
}

fn literal(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Int(n) => n.to_i64(),
        Expr::Unary {
            op: UnOp::Neg,
            expr,
        } => literal(&expr.node).map(|n| -n),
        _ => None,
    }
}

fn bound_text(var: &str, lower: Option<&BoundEnd>, upper: Option<&BoundEnd>) -> String {
    let mut text = String::new();
    if let Some(lower) = lower {
        let op = if lower.strict { "<" } else { "<=" };
        text.push_str(&format!("{} {op} ", lower.text));
    }
    text.push_str(var);
    if let Some(upper) = upper {
        let op = if upper.strict { "<" } else { "<=" };
        text.push_str(&format!(" {op} {}", upper.text));
    }
    text
}

fn int<'v>(vars: &'v Vars, name: &str) -> Option<&'v BigInt> {
    vars.get(name)?.as_int()
}

/// `vars[index] + offset` as a non-negative index
fn shifted(vars: &Vars, index: &str, offset: i64) -> Option<u64> {
    (int(vars, index)? + offset).to_u64()
}

fn prefix_fold(array: &Snapshot, len: usize, op: Fold) -> Option<BigInt> {
    let items = array.as_array()?.get(..len)?;
    items.iter().try_fold(
        match op {
            Fold::Sum => BigInt::zero(),
            Fold::Product => BigInt::from(1),
        },
        |acc, item| {
            let item = item.as_int()?;
            Some(match op {
                Fold::Sum => acc + item,
                Fold::Product => acc * item,
            })
        },
    )
}

fn compare(a: &Snapshot, b: &Snapshot) -> Option<Ordering> {
    match (a, b) {
        (Snapshot::Int(x), Snapshot::Int(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Language;
    use crate::interp::{self, Limits};
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn mine(src: &str, language: Language) -> (Trace, Vec<LoopInvariant>) {
        let program = parse(src, language).unwrap();
        let trace = interp::trace(&program, &[], Limits::default()).unwrap();
        let found = infer(&trace, &program);
        (trace, found)
    }

    fn texts(found: &[LoopInvariant]) -> Vec<&str> {
        found.iter().map(|inv| inv.text.as_str()).collect()
    }

    #[test]
    fn test_fibonacci_accumulator() {
        let src = "\
def fib(n):
    a, b = 0, 1
    for i in range(2, n + 1):
        a, b = b, a + b
    return b

print(fib(6))
";
        let (trace, found) = mine(src, Language::Python);
        assert_eq!(
            texts(&found),
            vec!["2 <= i <= n", "a == fib(i - 2)", "b == fib(i - 1)"]
        );
        assert!(found.iter().all(|inv| inv.line == 3 && inv.holds(&trace)));
        assert_eq!(found[0].confirmed_by, 5);
    }

    #[test]
    fn test_while_loop_guard_and_recurrences() {
        let src = "\
n = 20
total = 0
i = 0
while i < n and total < 50:
    total += i
    i += 1
";
        let (trace, found) = mine(src, Language::Python);
        assert_eq!(
            texts(&found),
            vec![
                "0 <= i < n",
                "i' == i + 1",
                "total' == total + i",
                "i < n and total < 50",
            ]
        );
        assert!(found.iter().all(|inv| inv.holds(&trace)));
    }

    #[test]
    fn test_c_style_loop_with_power_of_two() {
        let src = "\
let p = 1;
for (let k = 0; k < 5; k++) {
  p = p * 2;
}
";
        let (_, found) = mine(src, Language::JavaScript);
        assert_eq!(texts(&found), vec!["0 <= k < 5", "k' == k + 1", "p == 2 ** k"]);
    }

    #[test]
    fn test_prefix_sum_over_array() {
        let src = "\
arr = [3, 1, 4, 1, 5]
total = 0
for i in range(len(arr)):
    total += arr[i]
";
        let (trace, found) = mine(src, Language::Python);
        assert_eq!(
            texts(&found),
            vec!["0 <= i < len(arr)", "total == sum(arr[0:i])"]
        );
        assert!(matches!(
            &found[1].predicate,
            Predicate::PrefixSum { op: Fold::Sum, offset: 0, .. }
        ));
        assert!(found[1].holds(&trace));
    }

    #[test]
    fn test_single_iteration_asserts_nothing() {
        let src = "\
x = 0
for i in range(1):
    x += 1
";
        let (_, found) = mine(src, Language::Python);
        assert!(found.is_empty());
    }

    #[test]
    fn test_decreasing_counter_bound_is_mirrored() {
        let src = "\
i = 10
while i > 0:
    i -= 3
";
        let (trace, found) = mine(src, Language::Python);
        assert_eq!(texts(&found), vec!["0 < i <= 10", "i' == i - 3"]);
        assert!(found.iter().all(|inv| inv.holds(&trace)));
    }

    #[test]
    fn test_predicate_serialization_skips_expressions() {
        let src = "\
def fib(n):
    a, b = 0, 1
    for i in range(2, n + 1):
        a, b = b, a + b
    return b

print(fib(6))
";
        let (_, found) = mine(src, Language::Python);
        let json = serde_json::to_value(&found[0]).unwrap();
        assert_eq!(json["predicate"]["kind"], "bound");
        assert_eq!(json["predicate"]["upper"]["text"], "n");
        assert_eq!(json["predicate"]["upper"]["strict"], false);
        assert!(json["predicate"]["upper"].get("expr").is_none());
        let seq = serde_json::to_value(&found[2]).unwrap();
        assert_eq!(seq["predicate"]["sequence"], "fibonacci");
        assert_eq!(seq["predicate"]["offset"], -1);
        assert_eq!(seq["confirmedBy"], 5);
    }
}
