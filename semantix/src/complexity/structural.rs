//! Structural cost model
//!
//! Walks the AST once, composing loop iteration classes multiplicatively
//! and sequential statements additively. Recursive functions are solved
//! from the shape of their self-calls: how many there are per frame and
//! how the arguments shrink. The "size" of a run is any quantity derived
//! from a function parameter or a program input.

use super::growth::Growth;
use crate::ast::{block_exits, BinOp, CondBranch, Expr, Function, Program, Stmt, StmtKind, Target};
use num_traits::ToPrimitive;
use std::collections::{HashMap, HashSet};

/// What the structural pass concluded
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub best: Growth,
    pub worst: Growth,
    /// Deepest call stack, in frames
    pub stack: Growth,
    /// Size-dependent allocations live at once
    pub heap: Growth,
    /// Some loop with a size-dependent bound can stop before reaching it
    pub early_exit: bool,
    pub time_notes: Vec<String>,
    pub space_notes: Vec<String>,
}

/// How a guarded exit leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Loop,
    Function,
}

#[derive(Debug, Clone, Copy)]
struct Cost {
    best: Growth,
    worst: Growth,
    /// Best-case path ends at a guarded exit
    cut: Option<Exit>,
}

impl Cost {
    const FREE: Cost = Cost {
        best: Growth::CONSTANT,
        worst: Growth::CONSTANT,
        cut: None,
    };

    fn and(self, other: Cost) -> Cost {
        Cost {
            best: self.best.max(other.best),
            worst: self.worst.max(other.worst),
            cut: self.cut.or(other.cut),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FnCost {
    best: Growth,
    worst: Growth,
}

impl FnCost {
    const UNKNOWN: FnCost = FnCost {
        best: Growth::Unknown,
        worst: Growth::Unknown,
    };
}

#[derive(Debug, Clone, Copy)]
struct Ctx<'p> {
    function: Option<&'p str>,
    recursive: bool,
}

/// How a recursive function's arguments approach the base case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Subtractive,
    Halving,
    Unknown,
}

pub fn analyze(program: &Program) -> Structure {
    let mut analyzer = Analyzer::new(program);
    let top = Ctx {
        function: None,
        recursive: false,
    };
    let cost = analyzer.block(&program.body, top);
    let mut out = analyzer.out;
    out.best = cost.best;
    out.worst = cost.worst;
    out
}

struct Analyzer<'p> {
    program: &'p Program,
    sized: HashSet<&'p str>,
    data: HashSet<&'p str>,
    costs: HashMap<&'p str, FnCost>,
    active: Vec<&'p str>,
    /// Product of the iteration classes of the enclosing loops
    loop_factor: Growth,
    line: u32,
    out: Structure,
}

impl<'p> Analyzer<'p> {
    fn new(program: &'p Program) -> Self {
        Analyzer {
            program,
            sized: size_symbols(program),
            data: data_symbols(program),
            costs: HashMap::new(),
            active: Vec::new(),
            loop_factor: Growth::CONSTANT,
            line: 0,
            out: Structure {
                best: Growth::CONSTANT,
                worst: Growth::CONSTANT,
                stack: Growth::CONSTANT,
                heap: Growth::CONSTANT,
                early_exit: false,
                time_notes: Vec::new(),
                space_notes: Vec::new(),
            },
        }
    }

    fn block(&mut self, block: &'p [Stmt], ctx: Ctx<'p>) -> Cost {
        let mut total = Cost::FREE;
        for stmt in block {
            let cost = self.stmt(stmt, ctx);
            total.worst = total.worst.max(cost.worst);
            if total.cut.is_none() {
                total.best = total.best.max(cost.best);
                total.cut = cost.cut;
            }
            if stmt.always_exits() {
                break;
            }
        }
        total
    }

    fn stmt(&mut self, stmt: &'p Stmt, ctx: Ctx<'p>) -> Cost {
        self.line = stmt.line;
        match &stmt.kind {
            StmtKind::If {
                branches,
                else_body,
            } => self.branch(branches, else_body.as_deref(), ctx),
            _ if stmt.is_loop() => self.looped(stmt, ctx),
            _ => stmt
                .exprs()
                .into_iter()
                .fold(Cost::FREE, |acc, e| acc.and(self.expr(&e.node, ctx))),
        }
    }

    fn branch(
        &mut self,
        branches: &'p [CondBranch],
        else_body: Option<&'p [Stmt]>,
        ctx: Ctx<'p>,
    ) -> Cost {
        let mut head = Cost::FREE;
        let mut worst = Growth::CONSTANT;
        let mut cheapest: Option<Growth> = None;
        let mut cut: Option<(Growth, Exit)> = None;
        let mut any_cuts = false;

        for arm in branches {
            self.line = arm.cond.line;
            let cond = self.expr(&arm.cond.expr.node, ctx);
            head = head.and(cond);
            let guard = self.guard_cuts(&arm.cond.expr.node, ctx);
            any_cuts |= guard;
            let body = self.block(&arm.body, ctx);
            worst = worst.max(body.worst);
            cheapest = Some(cheapest.map_or(body.best, |c| c.min(body.best)));
            if cut.is_none() {
                match exit_kind(&arm.body) {
                    Some(exit) if guard => {
                        self.note_exit(exit, arm.cond.line, ctx);
                        cut = Some((body.best, exit));
                    }
                    _ => cut = body.cut.map(|exit| (body.best, exit)),
                }
            }
        }

        match else_body {
            Some(body) => {
                let cost = self.block(body, ctx);
                worst = worst.max(cost.worst);
                cheapest = Some(cheapest.map_or(cost.best, |c| c.min(cost.best)));
                if cut.is_none() {
                    match exit_kind(body) {
                        Some(exit) if any_cuts => cut = Some((cost.best, exit)),
                        _ => cut = cost.cut.map(|exit| (cost.best, exit)),
                    }
                }
            }
            None => cheapest = Some(Growth::CONSTANT),
        }

        let worst = head.worst.max(worst);
        match cut {
            Some((best, exit)) => Cost {
                best: head.best.max(best),
                worst,
                cut: Some(exit),
            },
            None => Cost {
                best: head.best.max(cheapest.unwrap_or(Growth::CONSTANT)),
                worst,
                cut: None,
            },
        }
    }

    fn looped(&mut self, stmt: &'p Stmt, ctx: Ctx<'p>) -> Cost {
        let (iterations, why) = self.iterations(stmt);
        let head = stmt
            .exprs()
            .into_iter()
            .fold(Cost::FREE, |acc, e| acc.and(self.expr(&e.node, ctx)));

        let (init, body, update) = match &stmt.kind {
            StmtKind::For {
                init, body, update, ..
            } => (init.as_slice(), body.as_slice(), update.as_slice()),
            StmtKind::While { body, .. }
            | StmtKind::ForRange { body, .. }
            | StmtKind::ForEach { body, .. } => (&[][..], body.as_slice(), &[][..]),
            _ => (&[][..], &[][..], &[][..]),
        };
        let init = self.block(init, ctx);

        let saved = self.loop_factor;
        self.loop_factor = saved.times(iterations);
        let inner = self.block(body, ctx);
        let update = self.block(update, ctx);
        self.loop_factor = saved;

        let per_iteration = Cost {
            best: head.best.max(inner.best).max(update.best),
            worst: head.worst.max(inner.worst).max(update.worst),
            cut: inner.cut,
        };
        let data_exit = match &stmt.kind {
            StmtKind::While { cond, .. } => {
                let parts = cond.expr.node.conjuncts();
                parts.len() > 1 && parts.iter().any(|c| self.data_dependent(c))
            }
            _ => false,
        };
        let early = inner.cut.is_some() || data_exit;

        let worst = init.worst.max(iterations.times(per_iteration.worst));
        let best = if early {
            init.best.max(per_iteration.best)
        } else {
            init.best.max(iterations.times(per_iteration.best))
        };

        if iterations.is_unknown() {
            self.out.time_notes.push(format!(
                "Loop at line {}: {why}, so its iteration count is not classified.",
                stmt.line
            ));
        } else if !iterations.is_constant() {
            self.out.time_notes.push(format!(
                "Loop at line {} runs {iterations} times because {why}.",
                stmt.line
            ));
            if early {
                self.out.early_exit = true;
                self.out.time_notes.push(format!(
                    "The loop at line {} can stop before its bound.",
                    stmt.line
                ));
            }
        }

        Cost {
            best,
            worst,
            cut: inner.cut.filter(|exit| *exit == Exit::Function),
        }
    }

    fn expr(&mut self, expr: &'p Expr, ctx: Ctx<'p>) -> Cost {
        let program = self.program;
        let sized = &self.sized;
        let mut callees: Vec<&'p str> = Vec::new();
        let mut linear = false;
        let mut allocates = false;
        let mut appends = false;

        expr.walk(&mut |e| match e {
            Expr::Call { func, args } => {
                if program.function(func).is_some() {
                    if Some(func.as_str()) != ctx.function && !callees.contains(&func.as_str()) {
                        callees.push(func);
                    }
                } else if func == "append" {
                    appends = true;
                } else if linear_builtin(func, args.len())
                    && args.iter().any(|a| mentions(&a.node, sized))
                {
                    linear = true;
                }
            }
            Expr::Slice { base, .. } if mentions(&base.node, sized) => {
                linear = true;
                allocates = true;
            }
            Expr::Alloc { count, .. } if mentions(&count.node, sized) => {
                linear = true;
                allocates = true;
            }
            Expr::Binary {
                op: BinOp::In | BinOp::NotIn,
                right,
                ..
            } if mentions(&right.node, sized) => linear = true,
            _ => {}
        });

        if allocates {
            let heap = self.loop_factor.times(Growth::LINEAR);
            if self.out.heap.max(heap) != self.out.heap {
                self.out.space_notes.push(format!(
                    "Line {} allocates storage proportional to the input, {heap} in total.",
                    self.line
                ));
            }
            self.out.heap = self.out.heap.max(heap);
        }
        if appends && !self.loop_factor.is_constant() {
            let heap = self.loop_factor;
            if self.out.heap.max(heap) != self.out.heap {
                self.out.space_notes.push(format!(
                    "Line {} appends inside a loop, growing a collection to {heap}.",
                    self.line
                ));
            }
            self.out.heap = self.out.heap.max(heap);
        }

        let local = if linear {
            Growth::LINEAR
        } else {
            Growth::CONSTANT
        };
        let mut cost = Cost {
            best: local,
            worst: local,
            cut: None,
        };
        for name in callees {
            let callee = self.function_cost(name);
            cost.best = cost.best.max(callee.best);
            cost.worst = cost.worst.max(callee.worst);
        }
        cost
    }

    fn function_cost(&mut self, name: &'p str) -> FnCost {
        if let Some(cost) = self.costs.get(name) {
            return *cost;
        }
        if self.active.contains(&name) {
            self.out.time_notes.push(format!(
                "{name} is reached through mutual recursion, which is not classified."
            ));
            return FnCost::UNKNOWN;
        }
        let Some(function) = self.program.function(name) else {
            return FnCost {
                best: Growth::CONSTANT,
                worst: Growth::CONSTANT,
            };
        };
        self.active.push(name);
        let saved = (self.loop_factor, self.line);
        self.loop_factor = Growth::CONSTANT;
        let cost = self.function(function);
        (self.loop_factor, self.line) = saved;
        self.active.pop();
        self.costs.insert(name, cost);
        cost
    }

    fn function(&mut self, function: &'p Function) -> FnCost {
        let name = function.name.as_str();
        let mut in_loop = false;
        let calls = self_calls(&function.body, name, &mut in_loop);
        let ctx = Ctx {
            function: Some(name),
            recursive: calls > 0,
        };
        let body = self.block(&function.body, ctx);
        if !ctx.recursive {
            return FnCost {
                best: body.best,
                worst: body.worst,
            };
        }

        let shape = recursion_shape(function);
        let (worst, stack, how) = if is_memoized(function) {
            (
                Growth::LINEAR.times(body.worst),
                Growth::LINEAR,
                "results are memoised, so each argument value is expanded once".to_string(),
            )
        } else if in_loop {
            (
                Growth::Exponential,
                stack_for(shape),
                "it recurses from inside a loop".to_string(),
            )
        } else {
            match shape {
                Shape::Subtractive if calls == 1 => (
                    Growth::LINEAR.times(body.worst),
                    Growth::LINEAR,
                    "one recursive call per frame shrinks the argument by a constant".to_string(),
                ),
                Shape::Subtractive => (
                    Growth::Exponential,
                    Growth::LINEAR,
                    format!("{calls} recursive calls per frame each shrink the argument by a constant"),
                ),
                Shape::Halving => (
                    master(calls, body.worst),
                    Growth::LOG,
                    format!(
                        "{calls} recursive call(s) per frame halve the argument with {} work per frame",
                        body.worst
                    ),
                ),
                Shape::Unknown => (
                    Growth::Unknown,
                    Growth::Unknown,
                    "its arguments do not shrink in a recognisable way".to_string(),
                ),
            }
        };

        self.out
            .time_notes
            .push(format!("{name} is recursive: {how}, giving {worst}."));
        if !stack.is_constant() {
            self.out.space_notes.push(format!(
                "Recursion in {name} keeps up to {stack} frames on the call stack."
            ));
        }
        self.out.stack = self.out.stack.max(stack);

        let best = match body.cut {
            Some(Exit::Function) => body.best,
            _ => worst,
        };
        FnCost { best, worst }
    }

    fn iterations(&self, stmt: &'p Stmt) -> (Growth, String) {
        match &stmt.kind {
            StmtKind::ForRange { start, end, .. } => {
                if mentions(&start.node, &self.sized) || mentions(&end.node, &self.sized) {
                    (
                        Growth::LINEAR,
                        format!("its range ends at `{}`", end.node),
                    )
                } else {
                    (Growth::CONSTANT, String::new())
                }
            }
            StmtKind::ForEach { iterable, .. } => {
                if mentions(&iterable.node, &self.sized) {
                    (Growth::LINEAR, format!("it walks `{}`", iterable.node))
                } else {
                    (Growth::CONSTANT, String::new())
                }
            }
            StmtKind::While { cond, body } => {
                self.conditional_iterations(Some(&cond.expr.node), body, &[])
            }
            StmtKind::For {
                cond, update, body, ..
            } => self.conditional_iterations(cond.as_ref().map(|c| &c.expr.node), body, update),
            _ => (Growth::CONSTANT, String::new()),
        }
    }

    fn conditional_iterations(
        &self,
        cond: Option<&'p Expr>,
        body: &'p [Stmt],
        update: &'p [Stmt],
    ) -> (Growth, String) {
        let Some(cond) = cond else {
            return (Growth::Unknown, "it has no condition".into());
        };
        let vars = cond.variables();
        if vars.is_empty() {
            return (Growth::Unknown, format!("its condition `{cond}` is constant"));
        }
        if !mentions(cond, &self.sized) {
            return (Growth::CONSTANT, String::new());
        }

        let halved = halved_vars(body.iter().chain(update));
        let mut found: Option<(Growth, String)> = None;
        let mut visit = |stmt: &'p Stmt| {
            for (name, op, value) in assignment_pairs(stmt) {
                if !vars.contains(&name) {
                    continue;
                }
                let Some(step) = classify_update(name, op, value, &halved) else {
                    continue;
                };
                let why = if step == Growth::LOG {
                    format!("`{name}` shrinks geometrically")
                } else {
                    format!("`{name}` steps by a constant")
                };
                match &found {
                    Some((g, _)) if *g == Growth::LOG => {}
                    _ => found = Some((step, why)),
                }
            }
        };
        for stmt in body.iter().chain(update) {
            stmt.walk(&mut visit);
        }
        found.unwrap_or((
            Growth::Unknown,
            format!("nothing in its body moves `{cond}` toward false"),
        ))
    }

    /// May a guarded exit end the best case here? Inside recursion only
    /// data-dependent guards count: a size guard is the base case.
    fn guard_cuts(&self, cond: &Expr, ctx: Ctx<'p>) -> bool {
        !ctx.recursive || self.data_dependent(cond)
    }

    fn data_dependent(&self, cond: &Expr) -> bool {
        let mut found = false;
        cond.walk(&mut |e| match e {
            Expr::Index { .. }
            | Expr::Binary {
                op: BinOp::In | BinOp::NotIn,
                ..
            } => found = true,
            Expr::Var(name) if self.data.contains(name.as_str()) => found = true,
            _ => {}
        });
        found
    }

    fn note_exit(&mut self, exit: Exit, line: u32, ctx: Ctx<'p>) {
        let what = match exit {
            Exit::Loop => "break",
            Exit::Function => "return",
        };
        let whom = ctx.function.unwrap_or("the program");
        self.out.time_notes.push(format!(
            "Best case: the guarded {what} at line {line} can end {whom} early."
        ));
    }
}

/// Builtins whose cost is linear in a collection argument
fn linear_builtin(func: &str, arity: usize) -> bool {
    match func {
        "sum" | "index" | "fill" => true,
        "min" | "max" => arity == 1,
        _ => false,
    }
}

fn mentions(expr: &Expr, set: &HashSet<&str>) -> bool {
    expr.variables().iter().any(|v| set.contains(v))
}

fn int_literal(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::Int(n) => n.to_i64(),
        _ => None,
    }
}

/// `x // 2`, `(lo + hi) / 2`, `x >> 1`, possibly wrapped in a call
fn is_halving(expr: &Expr) -> bool {
    let mut found = false;
    expr.walk(&mut |e| {
        if let Expr::Binary { op, right, .. } = e {
            let by = int_literal(&right.node);
            found |= match op {
                BinOp::Shr => by == Some(1),
                op if op.is_division() => by == Some(2),
                _ => false,
            };
        }
    });
    found
}

/// Variables assigned a halving expression somewhere in the statements
fn halved_vars<'a>(stmts: impl Iterator<Item = &'a Stmt>) -> HashSet<&'a str> {
    let mut out = HashSet::new();
    for stmt in stmts {
        stmt.walk(&mut |s| {
            for (name, _, value) in assignment_pairs(s) {
                if is_halving(value) {
                    out.insert(name);
                }
            }
        });
    }
    out
}

/// `(variable, compound operator, value)` for each plain-variable target
fn assignment_pairs(stmt: &Stmt) -> Vec<(&str, Option<BinOp>, &Expr)> {
    let StmtKind::Assign {
        targets,
        op,
        values,
    } = &stmt.kind
    else {
        return Vec::new();
    };
    let values: Vec<&Expr> = match values.as_slice() {
        [single] if targets.len() > 1 => match &single.node {
            Expr::Array(items) => items.iter().map(|e| &e.node).collect(),
            _ => return Vec::new(),
        },
        many => many.iter().map(|e| &e.node).collect(),
    };
    targets
        .iter()
        .zip(values)
        .filter_map(|(target, value)| match target {
            Target::Var(name) => Some((name.as_str(), *op, value)),
            Target::Index { .. } => None,
        })
        .collect()
}

/// Growth in iterations implied by one update of a loop-condition variable
fn classify_update(
    name: &str,
    op: Option<BinOp>,
    value: &Expr,
    halved: &HashSet<&str>,
) -> Option<Growth> {
    let geometric = |op: BinOp| {
        op.is_division() || matches!(op, BinOp::Mul | BinOp::Shl | BinOp::Mod | BinOp::FloorMod)
    };
    let mentions_halved = value.variables().iter().any(|v| *v != name && halved.contains(v));
    match op {
        Some(op) if geometric(op) => Some(Growth::LOG),
        Some(BinOp::Add | BinOp::Sub) if mentions_halved => Some(Growth::LOG),
        Some(BinOp::Add | BinOp::Sub) => Some(Growth::LINEAR),
        Some(_) => None,
        None => {
            if is_halving(value) || mentions_halved {
                return Some(Growth::LOG);
            }
            match value {
                Expr::Binary { op, .. } if geometric(*op) => Some(Growth::LOG),
                Expr::Binary {
                    left,
                    op: BinOp::Add | BinOp::Sub,
                    right,
                } if matches!(&left.node, Expr::Var(v) if v == name)
                    || matches!(&right.node, Expr::Var(v) if v == name) =>
                {
                    Some(Growth::LINEAR)
                }
                _ => None,
            }
        }
    }
}

/// Leaves the enclosing block on every path of `block`, and how
fn exit_kind(block: &[Stmt]) -> Option<Exit> {
    for stmt in block {
        match &stmt.kind {
            StmtKind::Return(_) => return Some(Exit::Function),
            StmtKind::Break => return Some(Exit::Loop),
            StmtKind::Continue => return None,
            StmtKind::If {
                branches,
                else_body: Some(else_body),
            } if stmt.always_exits() => {
                let kinds: Option<Vec<Exit>> = branches
                    .iter()
                    .map(|b| exit_kind(&b.body))
                    .chain(std::iter::once(exit_kind(else_body)))
                    .collect();
                return kinds.map(|kinds| {
                    if kinds.contains(&Exit::Loop) {
                        Exit::Loop
                    } else {
                        Exit::Function
                    }
                });
            }
            _ => {}
        }
    }
    None
}

/// Most self-calls made on any single path through `block`
fn self_calls(block: &[Stmt], name: &str, in_loop: &mut bool) -> u32 {
    let mut total = 0;
    for (i, stmt) in block.iter().enumerate() {
        let here: u32 = stmt.exprs().iter().map(|e| e.node.calls(name) as u32).sum();
        total += here;
        match &stmt.kind {
            StmtKind::If {
                branches,
                else_body,
            } => {
                let rest = self_calls(&block[i + 1..], name, in_loop);
                let mut arms: Vec<&[Stmt]> = branches.iter().map(|b| b.body.as_slice()).collect();
                arms.push(else_body.as_deref().unwrap_or(&[]));
                let most = arms
                    .into_iter()
                    .map(|arm| {
                        let calls = self_calls(arm, name, in_loop);
                        if block_exits(arm) {
                            calls
                        } else {
                            calls + rest
                        }
                    })
                    .max()
                    .unwrap_or(rest);
                return total + most;
            }
            _ if stmt.is_loop() => {
                let inner: u32 = stmt
                    .blocks()
                    .into_iter()
                    .map(|b| self_calls(b, name, in_loop))
                    .sum();
                if inner > 0 || here > 0 {
                    *in_loop = true;
                }
                total += inner;
            }
            _ => {}
        }
        if stmt.always_exits() {
            break;
        }
    }
    total
}

/// Classify every self-call's arguments; the weakest shape wins
fn recursion_shape(function: &Function) -> Shape {
    let halved = halved_vars(function.body.iter());
    let mut shapes = Vec::new();
    for stmt in &function.body {
        stmt.walk(&mut |s| {
            for e in s.exprs() {
                e.node.walk(&mut |call| {
                    if let Expr::Call { func, args } = call {
                        if *func == function.name {
                            shapes.push(argument_shape(args.iter().map(|a| &a.node), &halved));
                        }
                    }
                });
            }
        });
    }
    if shapes.is_empty() || shapes.contains(&Shape::Unknown) {
        Shape::Unknown
    } else if shapes.iter().all(|s| *s == Shape::Halving) {
        Shape::Halving
    } else {
        Shape::Subtractive
    }
}

fn argument_shape<'a>(args: impl Iterator<Item = &'a Expr>, halved: &HashSet<&str>) -> Shape {
    let mut shape = Shape::Unknown;
    for arg in args {
        let mentions_halved = arg.variables().iter().any(|v| halved.contains(v));
        let modulo = matches!(arg, Expr::Binary { op: BinOp::Mod | BinOp::FloorMod, .. });
        if is_halving(arg) || mentions_halved || modulo {
            return Shape::Halving;
        }
        let shrinks = match arg {
            Expr::Binary {
                left,
                op: BinOp::Sub,
                right,
            } => matches!(left.node, Expr::Var(_))
                && int_literal(&right.node).is_some_and(|c| c > 0),
            Expr::Binary {
                left,
                op: BinOp::Add,
                right,
            } => matches!(left.node, Expr::Var(_))
                && int_literal(&right.node).is_some_and(|c| c > 0),
            Expr::Slice {
                start: Some(start),
                end: None,
                ..
            } => int_literal(&start.node).is_some_and(|c| c > 0),
            _ => false,
        };
        if shrinks {
            shape = Shape::Subtractive;
        }
    }
    shape
}

/// A table written at a parameter-keyed index and consulted by a guard
fn is_memoized(function: &Function) -> bool {
    let params: HashSet<&str> = function.params.iter().map(String::as_str).collect();
    let mut tables: HashSet<&str> = HashSet::new();
    let mut guards: Vec<&Expr> = Vec::new();
    for stmt in &function.body {
        stmt.walk(&mut |s| match &s.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    if let Target::Index { index, .. } = target {
                        if mentions(&index.node, &params) {
                            tables.extend(target.root());
                        }
                    }
                }
            }
            StmtKind::If { branches, .. } => {
                guards.extend(branches.iter().map(|b| &b.cond.expr.node));
            }
            _ => {}
        });
    }
    !tables.is_empty() && guards.iter().any(|g| mentions(g, &tables))
}

/// `T(n) = a T(n / 2) + work`
fn master(calls: u32, work: Growth) -> Growth {
    let critical = match calls {
        1 => 0,
        2 => 1,
        4 => 2,
        8 => 3,
        _ => return Growth::Unknown,
    };
    match work {
        Growth::Bounded { poly, log } => match poly.cmp(&critical) {
            std::cmp::Ordering::Less => Growth::Bounded {
                poly: critical,
                log: 0,
            },
            std::cmp::Ordering::Equal => Growth::Bounded { poly, log: log + 1 },
            std::cmp::Ordering::Greater => work,
        },
        other => other,
    }
}

fn stack_for(shape: Shape) -> Growth {
    match shape {
        Shape::Subtractive => Growth::LINEAR,
        Shape::Halving => Growth::LOG,
        Shape::Unknown => Growth::Unknown,
    }
}

/// Parameters, program inputs, and everything computed from them
fn size_symbols(program: &Program) -> HashSet<&str> {
    let mut sized: HashSet<&str> = HashSet::new();
    for function in &program.functions {
        sized.extend(function.params.iter().map(String::as_str));
    }

    let mut bound: HashSet<&str> = HashSet::new();
    let mut read: Vec<&str> = Vec::new();
    for stmt in &program.body {
        stmt.walk(&mut |s| {
            match &s.kind {
                StmtKind::Assign { targets, .. } => bound.extend(targets.iter().filter_map(Target::root)),
                StmtKind::ForRange { var, .. } | StmtKind::ForEach { var, .. } => {
                    bound.insert(var);
                }
                _ => {}
            }
            for e in s.exprs() {
                read.extend(e.node.variables());
            }
        });
    }
    sized.extend(
        read.into_iter()
            .filter(|name| !bound.contains(name) && program.function(name).is_none()),
    );

    let statements = program.statements();
    loop {
        let before = sized.len();
        for stmt in &statements {
            match &stmt.kind {
                StmtKind::Assign { .. } => {
                    let grown: Vec<&str> = assignment_pairs(stmt)
                        .into_iter()
                        .filter(|(_, _, value)| mentions(value, &sized))
                        .map(|(name, _, _)| name)
                        .collect();
                    sized.extend(grown);
                }
                StmtKind::ForRange {
                    var, start, end, ..
                } if mentions(&start.node, &sized) || mentions(&end.node, &sized) => {
                    sized.insert(var);
                }
                _ => {}
            }
        }
        if sized.len() == before {
            break;
        }
    }
    sized
}

/// Variables holding values read out of collections
fn data_symbols(program: &Program) -> HashSet<&str> {
    let statements = program.statements();
    let mut data: HashSet<&str> = HashSet::new();
    loop {
        let before = data.len();
        for stmt in &statements {
            match &stmt.kind {
                StmtKind::ForEach { var, .. } => {
                    data.insert(var);
                }
                StmtKind::Assign { .. } => {
                    let grown: Vec<&str> = assignment_pairs(stmt)
                        .into_iter()
                        .filter(|(_, _, value)| reads_data(value, &data))
                        .map(|(name, _, _)| name)
                        .collect();
                    data.extend(grown);
                }
                _ => {}
            }
        }
        if data.len() == before {
            break;
        }
    }
    data
}

fn reads_data(expr: &Expr, data: &HashSet<&str>) -> bool {
    let mut found = false;
    expr.walk(&mut |e| match e {
        Expr::Index { .. }
        | Expr::Binary {
            op: BinOp::In | BinOp::NotIn,
            ..
        } => found = true,
        Expr::Var(name) if data.contains(name.as_str()) => found = true,
        _ => {}
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Language;
    use crate::parser::parse;

    fn structure(source: &str) -> Structure {
        analyze(&parse(source, Language::Python).unwrap())
    }

    #[test]
    fn test_iterative_fibonacci() {
        let s = structure(
            "def fib(n):\n    if n <= 1:\n        return n\n    a, b = 0, 1\n    for i in range(2, n + 1):\n        a, b = b, a + b\n    return b\nprint(fib(6))\n",
        );
        assert_eq!(s.best, Growth::CONSTANT);
        assert_eq!(s.worst, Growth::LINEAR);
        assert_eq!(s.stack, Growth::CONSTANT);
        assert_eq!(s.heap, Growth::CONSTANT);
    }

    #[test]
    fn test_linear_recursion() {
        let s = structure(
            "def factorial(n):\n    if n <= 1:\n        return 1\n    return n * factorial(n - 1)\nprint(factorial(5))\n",
        );
        assert_eq!(s.worst, Growth::LINEAR);
        assert_eq!(s.best, Growth::LINEAR);
        assert_eq!(s.stack, Growth::LINEAR);
    }

    #[test]
    fn test_binary_search_is_logarithmic() {
        let s = structure(
            "def search(arr, target):\n    lo = 0\n    hi = len(arr) - 1\n    while lo <= hi:\n        mid = (lo + hi) // 2\n        if arr[mid] == target:\n            return mid\n        if arr[mid] < target:\n            lo = mid + 1\n        else:\n            hi = mid - 1\n    return -1\nprint(search([1, 3, 5, 7], 5))\n",
        );
        assert_eq!(s.worst, Growth::LOG);
        assert_eq!(s.best, Growth::CONSTANT);
        assert!(s.early_exit);
    }

    #[test]
    fn test_nested_loops_are_quadratic() {
        let s = structure(
            "n = 4\ncount = 0\nfor i in range(n):\n    for j in range(n):\n        count += 1\nprint(count)\n",
        );
        assert_eq!(s.worst, Growth::CONSTANT);

        let s = structure(
            "def pairs(n):\n    count = 0\n    for i in range(n):\n        for j in range(i, n):\n            count += 1\n    return count\nprint(pairs(4))\n",
        );
        assert_eq!(s.worst, Growth::QUADRATIC);
        assert_eq!(s.best, Growth::QUADRATIC);
    }

    #[test]
    fn test_tree_recursion_is_exponential() {
        let s = structure(
            "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\nprint(fib(5))\n",
        );
        assert_eq!(s.worst, Growth::Exponential);
        assert_eq!(s.stack, Growth::LINEAR);
    }

    #[test]
    fn test_divide_and_conquer() {
        let s = structure(
            "def total(arr):\n    if len(arr) <= 1:\n        return sum(arr)\n    mid = len(arr) // 2\n    return total(arr[:mid]) + total(arr[mid:])\nprint(total([1, 2, 3, 4]))\n",
        );
        assert_eq!(s.worst, Growth::LINEARITHMIC);
        assert_eq!(s.stack, Growth::LOG);
        assert_eq!(s.heap, Growth::LINEAR);
    }

    #[test]
    fn test_memoised_recursion_is_linear() {
        let s = structure(
            "def fib(n, memo):\n    if memo[n] >= 0:\n        return memo[n]\n    if n < 2:\n        return n\n    memo[n] = fib(n - 1, memo) + fib(n - 2, memo)\n    return memo[n]\nprint(fib(10, [-1] * 11))\n",
        );
        assert_eq!(s.worst, Growth::LINEAR);
    }

    #[test]
    fn test_unbounded_while_is_unknown() {
        let s = structure("x = 0\nwhile True:\n    x += 1\n    if x > 5:\n        break\nprint(x)\n");
        assert_eq!(s.worst, Growth::Unknown);
    }

    #[test]
    fn test_appends_in_loop_take_linear_space() {
        let s = structure(
            "def squares(n):\n    out = []\n    for i in range(n):\n        out.append(i * i)\n    return out\nprint(squares(3))\n",
        );
        assert_eq!(s.heap, Growth::LINEAR);
        assert_eq!(s.worst, Growth::LINEAR);
    }

    #[test]
    fn test_master_theorem_cases() {
        assert_eq!(master(1, Growth::CONSTANT), Growth::LOG);
        assert_eq!(master(2, Growth::CONSTANT), Growth::LINEAR);
        assert_eq!(master(2, Growth::LINEAR), Growth::LINEARITHMIC);
        assert_eq!(master(4, Growth::LINEAR), Growth::QUADRATIC);
        assert_eq!(master(1, Growth::LINEAR), Growth::LINEAR);
        assert_eq!(master(3, Growth::LINEAR), Growth::Unknown);
    }
}
