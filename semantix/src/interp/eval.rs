//! Tracing interpreter
//!
//! A structured-statement walker over the canonical AST. Every executed
//! statement appends exactly one [`TraceStep`]; function calls use the
//! explicit [`CallStack`], and host recursion is guarded with `stacker`.

use super::builtins::{self, BuiltinFn};
use super::frame::CallStack;
use super::ops::{self, MAX_ALLOCATION};
use super::{InterpResult, Limits, Resource, ResourceExceeded, RuntimeError, Value};
use crate::ast::{BinOp, Expr, Function, Language, Program, Spanned, Stmt, StmtKind, Target};
use crate::trace::{Freezer, StepEvent, Trace, TraceStep};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::collections::{BTreeMap, HashMap};
use std::mem::size_of;
use std::time::{Duration, Instant};

/// Stack size threshold for growing (64KB red zone)
const STACK_RED_ZONE: usize = 64 * 1024;
/// Amount to grow stack by (1MB)
const STACK_GROW_SIZE: usize = 1024 * 1024;
/// Trace memory charged for every step, and for every binding it records
const STEP_BYTES: u64 = size_of::<TraceStep>() as u64;
const BINDING_BYTES: u64 = (size_of::<String>() + size_of::<crate::trace::Snapshot>() + 16) as u64;

/// How a statement left its block
#[derive(Debug)]
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Tracing interpreter for one run of one program
pub struct Interpreter<'p> {
    program: &'p Program,
    language: Language,
    functions: HashMap<&'p str, &'p Function>,
    builtins: HashMap<&'static str, BuiltinFn>,
    limits: Limits,
    stack: CallStack,
    trace: Trace,
    freezer: Freezer,
    /// Step and binding overhead charged so far; snapshot data is in `freezer`
    step_bytes: u64,
    /// Line of the statement being executed, used for call steps
    line: u32,
    started: Instant,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, limits: Limits) -> Self {
        Interpreter {
            program,
            language: program.language,
            functions: program
                .functions
                .iter()
                .map(|f| (f.name.as_str(), f))
                .collect(),
            builtins: builtins::registry(),
            limits,
            stack: CallStack::new(),
            trace: Trace::new(),
            freezer: Freezer::default(),
            step_bytes: 0,
            line: 0,
            started: Instant::now(),
        }
    }

    /// Bind the inputs in the global frame and run the program to completion
    pub fn run(mut self, inputs: &[(String, Value)]) -> InterpResult<Trace> {
        for (name, value) in inputs {
            self.stack.define(name.clone(), value.deep_copy());
        }
        self.started = Instant::now();

        let program = self.program;
        self.exec_block(&program.body)?;

        log::debug!(
            "traced {} program: {} step(s), max call depth {}",
            self.language,
            self.trace.len(),
            self.trace.max_call_depth()
        );
        Ok(self.trace)
    }

    // ---- recording ----

    fn record(&mut self, line: u32, event: StepEvent, output: Option<String>) -> InterpResult<()> {
        self.record_with(line, event, output, None)
    }

    /// Append one step; `extra` is a transient binding such as `return`
    fn record_with(
        &mut self,
        line: u32,
        event: StepEvent,
        output: Option<String>,
        extra: Option<(&str, &Value)>,
    ) -> InterpResult<()> {
        if self.trace.len() as u64 >= self.limits.max_steps {
            return Err(ResourceExceeded {
                resource: Resource::Steps,
                limit: self.limits.max_steps,
                line,
            }
            .into());
        }

        let frame = self.stack.current();
        // Unchanged strings are shared with the previous step of the same frame
        let previous = self.trace.steps().last().filter(|s| s.frame == frame.id);
        let mut variables = BTreeMap::new();
        let mut bytes = STEP_BYTES;
        for (name, value) in frame.env.iter() {
            let frozen = self.freezer.freeze(value, previous.and_then(|p| p.var(name)));
            bytes += BINDING_BYTES + name.len() as u64;
            variables.insert(name.clone(), frozen);
        }
        if let Some((name, value)) = extra {
            bytes += BINDING_BYTES + name.len() as u64;
            variables.insert(name.to_string(), self.freezer.freeze(value, None));
        }

        self.step_bytes += bytes;
        if self.step_bytes + self.freezer.allocated() > self.limits.max_trace_bytes {
            return Err(ResourceExceeded {
                resource: Resource::TraceMemory,
                limit: self.limits.max_trace_bytes,
                line,
            }
            .into());
        }

        self.trace.push(TraceStep {
            line,
            variables,
            call_stack: self.stack.path().clone(),
            output,
            event,
            frame: frame.id,
        });
        Ok(())
    }

    fn check_clock(&self, line: u32) -> InterpResult<()> {
        let budget = self.limits.wall_clock_ms;
        if budget > 0 && self.started.elapsed() > Duration::from_millis(budget) {
            return Err(ResourceExceeded {
                resource: Resource::WallClock,
                limit: budget,
                line,
            }
            .into());
        }
        Ok(())
    }

    // ---- statements ----

    fn exec_block(&mut self, block: &'p [Stmt]) -> InterpResult<Flow> {
        for stmt in block {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Execute a statement with automatic stack growth
    fn exec(&mut self, stmt: &'p Stmt) -> InterpResult<Flow> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.exec_inner(stmt))
            .map_err(|e| e.at(stmt.line))
    }

    fn exec_inner(&mut self, stmt: &'p Stmt) -> InterpResult<Flow> {
        self.check_clock(stmt.line)?;
        self.line = stmt.line;

        match &stmt.kind {
            StmtKind::Assign {
                targets,
                op,
                values,
            } => {
                self.assign(targets, *op, values)?;
                self.record(stmt.line, StepEvent::Statement, None)?;
                Ok(Flow::Normal)
            }

            StmtKind::Expr(expr) => {
                self.eval(expr)?;
                self.record(stmt.line, StepEvent::Statement, None)?;
                Ok(Flow::Normal)
            }

            StmtKind::Print { args, separator } => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(self.eval(arg)?.render(self.language));
                }
                let text = parts.join(separator).trim_end_matches('\n').to_string();
                self.record(stmt.line, StepEvent::Statement, Some(text))?;
                Ok(Flow::Normal)
            }

            StmtKind::If {
                branches,
                else_body,
            } => {
                for branch in branches {
                    let taken = self.eval(&branch.cond.expr)?.is_truthy(self.language);
                    self.record(branch.cond.line, StepEvent::Condition { outcome: taken }, None)?;
                    if taken {
                        return self.exec_block(&branch.body);
                    }
                }
                match else_body {
                    Some(body) => self.exec_block(body),
                    None => Ok(Flow::Normal),
                }
            }

            StmtKind::While { cond, body } => {
                let mut iteration = 0;
                loop {
                    self.check_clock(stmt.line)?;
                    self.line = stmt.line;
                    if !self.eval(&cond.expr)?.is_truthy(self.language) {
                        break;
                    }
                    iteration += 1;
                    match self.iterate(stmt.line, iteration, body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::ForRange {
                var,
                start,
                end,
                step,
                body,
            } => {
                let mut i = self.eval_int(start)?;
                let end = self.eval_int(end)?;
                let step = match step {
                    Some(step) => self.eval_int(step)?,
                    None => BigInt::from(1),
                };
                if step.is_zero() {
                    return Err(RuntimeError::invalid_argument("range() step must not be zero").into());
                }

                let mut iteration = 0;
                while (step.is_positive() && i < end) || (step.is_negative() && i > end) {
                    self.check_clock(stmt.line)?;
                    self.stack.define(var.clone(), Value::Int(i.clone()));
                    iteration += 1;
                    match self.iterate(stmt.line, iteration, body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    i += &step;
                }
                Ok(Flow::Normal)
            }

            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                for s in init {
                    self.perform(s)?;
                }
                let mut iteration = 0;
                loop {
                    self.check_clock(stmt.line)?;
                    self.line = stmt.line;
                    if let Some(cond) = cond {
                        if !self.eval(&cond.expr)?.is_truthy(self.language) {
                            break;
                        }
                    }
                    iteration += 1;
                    match self.iterate(stmt.line, iteration, body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    for s in update {
                        self.perform(s)?;
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::ForEach {
                var,
                iterable,
                body,
            } => {
                let items: Vec<Value> = match self.eval(iterable)? {
                    Value::Array(items) => items.borrow().clone(),
                    Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
                    other => {
                        return Err(RuntimeError::type_mismatch("array or string", other.type_name()).into())
                    }
                };
                for (k, item) in items.into_iter().enumerate() {
                    self.check_clock(stmt.line)?;
                    self.stack.define(var.clone(), item);
                    match self.iterate(stmt.line, k as u64 + 1, body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::Break => {
                self.record(stmt.line, StepEvent::Statement, None)?;
                Ok(Flow::Break)
            }
            StmtKind::Continue => {
                self.record(stmt.line, StepEvent::Statement, None)?;
                Ok(Flow::Continue)
            }
            StmtKind::Pass => {
                self.record(stmt.line, StepEvent::Statement, None)?;
                Ok(Flow::Normal)
            }

            StmtKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                self.finish_frame(stmt.line, value.clone())?;
                Ok(Flow::Return(value))
            }
        }
    }

    /// Record the loop header for one iteration, then run the body
    fn iterate(&mut self, line: u32, iteration: u64, body: &'p [Stmt]) -> InterpResult<Flow> {
        self.record(line, StepEvent::LoopHeader { iteration }, None)?;
        self.exec_block(body)
    }

    /// Run a `for` initialiser or update without recording a step of its own
    fn perform(&mut self, stmt: &'p Stmt) -> InterpResult<()> {
        self.line = stmt.line;
        let result = match &stmt.kind {
            StmtKind::Assign {
                targets,
                op,
                values,
            } => self.assign(targets, *op, values),
            StmtKind::Expr(expr) => self.eval(expr).map(drop),
            _ => self.exec(stmt).map(drop),
        };
        result.map_err(|e| e.at(stmt.line))
    }

    /// Store the return value in the active frame and record the return step
    fn finish_frame(&mut self, line: u32, value: Value) -> InterpResult<()> {
        let function = self.stack.current().function.clone();
        self.record_with(
            line,
            StepEvent::Return { function },
            None,
            Some(("return", &value)),
        )?;
        self.stack.current_mut().return_value = Some(value);
        Ok(())
    }

    // ---- assignment ----

    fn assign(
        &mut self,
        targets: &[Target],
        op: Option<BinOp>,
        values: &[Spanned<Expr>],
    ) -> InterpResult<()> {
        let mut evaluated = Vec::with_capacity(values.len());
        for value in values {
            evaluated.push(self.eval(value)?);
        }

        if targets.len() > 1 && evaluated.len() == 1 {
            let items = match &evaluated[0] {
                Value::Array(items) => items.borrow().clone(),
                other => {
                    return Err(RuntimeError::type_mismatch("sequence to unpack", other.type_name()).into())
                }
            };
            evaluated = items;
        }
        if targets.len() != evaluated.len() {
            return Err(RuntimeError::invalid_argument(format!(
                "cannot unpack {} value(s) into {} target(s)",
                evaluated.len(),
                targets.len()
            ))
            .into());
        }

        for (target, value) in targets.iter().zip(evaluated) {
            let value = match op {
                Some(op) => {
                    let current = self.read_target(target)?;
                    ops::binary(op, &current, &value, self.language)?
                }
                None => value,
            };
            self.write_target(target, value)?;
        }
        Ok(())
    }

    fn read_target(&mut self, target: &Target) -> InterpResult<Value> {
        match target {
            Target::Var(name) => self.lookup(name),
            Target::Index { base, index } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                Ok(ops::index(&base, &index, self.language)?)
            }
        }
    }

    fn write_target(&mut self, target: &Target, value: Value) -> InterpResult<()> {
        match target {
            Target::Var(name) => {
                self.stack.define(name.clone(), value);
                Ok(())
            }
            Target::Index { base, index } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                let items = match &base {
                    Value::Array(items) => items,
                    other => {
                        return Err(RuntimeError::type_mismatch("array", other.type_name()).into())
                    }
                };
                self.freezer.invalidate();
                let mut items = items.borrow_mut();
                // JavaScript grows arrays on writes past the end
                if self.language == Language::JavaScript {
                    if let Some(i) = index.as_int().and_then(|i| i.to_usize()) {
                        if i >= items.len() && i < MAX_ALLOCATION {
                            items.resize(i + 1, Value::Null);
                        }
                    }
                }
                let i = ops::resolve_index(&index, items.len(), self.language)?;
                items[i] = value;
                Ok(())
            }
        }
    }

    // ---- expressions ----

    fn lookup(&self, name: &str) -> InterpResult<Value> {
        self.stack
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::unbound_variable(name).into())
    }

    fn eval_int(&mut self, expr: &Spanned<Expr>) -> InterpResult<BigInt> {
        let value = self.eval(expr)?;
        value
            .to_int()
            .ok_or_else(|| RuntimeError::type_mismatch("int", value.type_name()).into())
    }

    /// Evaluate an expression with automatic stack growth
    fn eval(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        let lang = self.language;
        match &expr.node {
            Expr::Int(n) => Ok(Value::Int(n.clone())),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Null => Ok(Value::Null),

            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::array(out))
            }

            Expr::Alloc { fill, count } => {
                let count = self.eval_int(count)?;
                if count.is_negative() {
                    return Err(RuntimeError::invalid_argument(format!("negative array size {count}")).into());
                }
                let n = count
                    .to_usize()
                    .filter(|n| *n <= MAX_ALLOCATION)
                    .ok_or_else(|| {
                        RuntimeError::invalid_argument(format!("array size {count} is too large"))
                    })?;
                let fill = self.eval(fill)?;
                let cells = fill.footprint(MAX_ALLOCATION).and_then(|per| n.checked_mul(per));
                ops::checked_length("array allocation", cells)?;
                Ok(Value::array((0..n).map(|_| fill.deep_copy()).collect()))
            }

            Expr::Var(name) => self.lookup(name),

            Expr::Index { base, index } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                Ok(ops::index(&base, &index, lang)?)
            }

            Expr::Slice { base, start, end } => {
                let base = self.eval(base)?;
                let start = match start {
                    Some(e) => Some(self.eval(e)?),
                    None => None,
                };
                let end = match end {
                    Some(e) => Some(self.eval(e)?),
                    None => None,
                };
                Ok(ops::slice(&base, start.as_ref(), end.as_ref())?)
            }

            Expr::Binary {
                left,
                op: op @ (BinOp::And | BinOp::Or),
                right,
            } => {
                let left = self.eval(left)?;
                let decided = match op {
                    BinOp::And => !left.is_truthy(lang),
                    _ => left.is_truthy(lang),
                };
                // Python and JavaScript yield the deciding operand itself
                let keeps_operands = matches!(lang, Language::Python | Language::JavaScript);
                if decided {
                    return Ok(if keeps_operands {
                        left
                    } else {
                        Value::Bool(left.is_truthy(lang))
                    });
                }
                let right = self.eval(right)?;
                Ok(if keeps_operands {
                    right
                } else {
                    Value::Bool(right.is_truthy(lang))
                })
            }

            Expr::Binary { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(ops::binary(*op, &left, &right, lang)?)
            }

            Expr::Unary { op, expr } => {
                let value = self.eval(expr)?;
                Ok(ops::unary(*op, &value, lang)?)
            }

            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.is_truthy(lang) {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }

            Expr::Call { func, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call(func, values)
            }
        }
    }

    /// Call a user-defined function, else a builtin
    fn call(&mut self, name: &str, args: Vec<Value>) -> InterpResult<Value> {
        if let Some(&function) = self.functions.get(name) {
            return self.call_function(function, args);
        }
        match self.builtins.get(name) {
            Some(builtin) => {
                if builtins::mutates_arguments(name) {
                    self.freezer.invalidate();
                }
                Ok(builtin(&args, self.language)?)
            }
            None => Err(RuntimeError::undefined_function(name).into()),
        }
    }

    /// Push a frame, run the body, pop the frame
    fn call_function(&mut self, function: &'p Function, args: Vec<Value>) -> InterpResult<Value> {
        if function.params.len() != args.len() {
            return Err(
                RuntimeError::arity_mismatch(&function.name, function.params.len(), args.len()).into(),
            );
        }

        let call_line = self.line;
        self.record(
            call_line,
            StepEvent::Call {
                callee: function.name.clone(),
            },
            None,
        )?;

        if self.stack.user_depth() as u64 >= self.limits.max_call_depth {
            return Err(ResourceExceeded {
                resource: Resource::CallDepth,
                limit: self.limits.max_call_depth,
                line: call_line,
            }
            .into());
        }

        let id = self.stack.push(&function.name, &function.params, args);
        log::trace!("enter {} (frame {id}, depth {})", function.name, self.stack.user_depth());

        let result = self.run_body(function);
        let frame = self.stack.pop();
        self.line = call_line;
        result?;

        Ok(frame.and_then(|f| f.return_value).unwrap_or(Value::Null))
    }

    fn run_body(&mut self, function: &'p Function) -> InterpResult<()> {
        self.line = function.line;
        self.record(
            function.line,
            StepEvent::Entry {
                function: function.name.clone(),
            },
            None,
        )?;
        match self.exec_block(&function.body)? {
            Flow::Return(_) => Ok(()),
            // Falling off the end returns null
            Flow::Normal | Flow::Break | Flow::Continue => {
                self.finish_frame(function.line, Value::Null)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{ErrorKind, TraceError};
    use crate::parser::parse;
    use crate::trace::Snapshot;
    use pretty_assertions::assert_eq;

    fn run(source: &str, language: Language) -> InterpResult<Trace> {
        run_with(source, language, Limits::default(), &[])
    }

    fn run_with(
        source: &str,
        language: Language,
        limits: Limits,
        inputs: &[(String, Value)],
    ) -> InterpResult<Trace> {
        let program = parse(source, language).expect("test program parses");
        Interpreter::new(&program, limits).run(inputs)
    }

    fn lines(trace: &Trace) -> Vec<u32> {
        trace.iter().map(|s| s.line).collect()
    }

    fn int(step: &TraceStep, name: &str) -> i64 {
        step.var(name)
            .and_then(|v| v.as_int())
            .and_then(|n| n.to_i64())
            .unwrap_or_else(|| panic!("{name} is not an int at line {}", step.line))
    }

    #[test]
    fn test_straight_line_one_step_per_statement() {
        let trace = run("a = 1\nb = a + 2\nc = a * b\n", Language::Python).unwrap();
        assert_eq!(lines(&trace), vec![1, 2, 3]);
        let last = &trace.steps()[2];
        assert_eq!(int(last, "c"), 3);
        assert_eq!(last.call_stack, vec!["main"]);
    }

    #[test]
    fn test_if_traces_condition_and_taken_branch_only() {
        let src = "x = 5\nif x > 10:\n    y = 1\nelif x > 3:\n    y = 2\nelse:\n    y = 3\n";
        let trace = run(src, Language::Python).unwrap();
        assert_eq!(lines(&trace), vec![1, 2, 4, 5]);
        assert_eq!(trace.steps()[1].event, StepEvent::Condition { outcome: false });
        assert_eq!(trace.steps()[2].event, StepEvent::Condition { outcome: true });
        assert_eq!(int(&trace.steps()[3], "y"), 2);
    }

    #[test]
    fn test_loop_header_once_per_iteration() {
        let src = "total = 0\nfor i in range(3):\n    total += i\nprint(total)\n";
        let trace = run(src, Language::Python).unwrap();
        assert_eq!(lines(&trace), vec![1, 2, 3, 2, 3, 2, 3, 4]);
        let headers = trace.header_snapshots(2);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[2].event, StepEvent::LoopHeader { iteration: 3 });
        assert_eq!(int(headers[2], "i"), 2);
        assert_eq!(trace.outputs(), vec!["3"]);
    }

    #[test]
    fn test_c_style_for_update_runs_after_continue() {
        let src = "let s = 0;\nfor (let i = 0; i < 4; i++) {\n  if (i % 2 == 0) continue;\n  s += i;\n}\nconsole.log(s);\n";
        let trace = run(src, Language::JavaScript).unwrap();
        assert_eq!(trace.header_snapshots(2).len(), 4);
        assert_eq!(trace.outputs(), vec!["4"]);
    }

    #[test]
    fn test_call_entry_and_return_steps() {
        let src = "def sq(n):\n    return n * n\nx = sq(4)\n";
        let trace = run(src, Language::Python).unwrap();
        let events: Vec<&StepEvent> = trace.iter().map(|s| &s.event).collect();
        assert_eq!(
            events,
            vec![
                &StepEvent::Call { callee: "sq".into() },
                &StepEvent::Entry { function: "sq".into() },
                &StepEvent::Return { function: "sq".into() },
                &StepEvent::Statement,
            ]
        );
        assert_eq!(lines(&trace), vec![3, 1, 2, 3]);
        let ret = &trace.steps()[2];
        assert_eq!(ret.call_stack, vec!["main", "sq(4)"]);
        assert_eq!(int(ret, "return"), 16);
        assert_eq!(int(&trace.steps()[3], "x"), 16);
        assert!(trace.steps()[0].var("n").is_none());
    }

    #[test]
    fn test_implicit_return_at_definition_line() {
        let src = "def show(v):\n    print(v)\nshow(1)\n";
        let trace = run(src, Language::Python).unwrap();
        let ret = trace
            .iter()
            .find(|s| matches!(s.event, StepEvent::Return { .. }))
            .unwrap();
        assert_eq!(ret.line, 1);
        assert_eq!(ret.return_value(), Some(&Snapshot::Null));
    }

    #[test]
    fn test_frames_do_not_see_globals() {
        let src = "limit = 3\ndef f():\n    return limit\nf()\n";
        let err = run(src, Language::Python).unwrap_err();
        match err {
            TraceError::Runtime(e) => {
                assert_eq!(e.kind, ErrorKind::UnboundVariable);
                assert_eq!(e.line, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_arrays_alias_through_parameters() {
        let src = "def put(a):\n    a.append(9)\nxs = [1]\nput(xs)\nprint(xs)\n";
        let trace = run(src, Language::Python).unwrap();
        assert_eq!(trace.outputs(), vec!["[1, 9]"]);
    }

    #[test]
    fn test_index_out_of_bounds_line() {
        let src = "int[] a = {1, 2, 3};\nint x = a[1];\nint y = a[3];\n";
        let err = run(src, Language::Java).unwrap_err();
        match err {
            TraceError::Runtime(e) => {
                assert_eq!(e.kind, ErrorKind::IndexOutOfBounds);
                assert_eq!(e.line, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unconditional_recursion_hits_call_depth() {
        let src = "def f(n):\n    return f(n + 1)\nf(0)\n";
        let limits = Limits {
            max_call_depth: 50,
            ..Limits::default()
        };
        let err = run_with(src, Language::Python, limits, &[]).unwrap_err();
        match err {
            TraceError::ResourceExceeded(e) => {
                assert_eq!(e.resource, Resource::CallDepth);
                assert_eq!(e.limit, 50);
                assert_eq!(e.line, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_deep_recursion_does_not_overflow_host_stack() {
        let src = "def f(n):\n    return f(n + 1)\nf(0)\n";
        let limits = Limits {
            max_steps: u64::MAX,
            max_call_depth: 20_000,
            wall_clock_ms: 0,
            ..Limits::default()
        };
        let err = run_with(src, Language::Python, limits, &[]).unwrap_err();
        assert!(matches!(err, TraceError::ResourceExceeded(ref e) if e.resource == Resource::CallDepth));
    }

    #[test]
    fn test_long_loop_under_deep_stack_fits_default_limits() {
        let src = "def down(n):
    if n == 0:
        i = 0
        while i < 30000:
            i += 1
        return i
    return down(n - 1)
print(down(990))
";
        let limits = Limits {
            wall_clock_ms: 0,
            ..Limits::default()
        };
        let trace = run_with(src, Language::Python, limits, &[]).unwrap();
        assert_eq!(trace.outputs(), vec!["30000"]);
        assert_eq!(trace.max_call_depth(), 991);
        let deepest: Vec<&TraceStep> = trace.iter().filter(|s| s.call_stack.len() == 992).collect();
        assert!(deepest.len() > 60_000);
        assert_eq!(deepest[0].call_stack, deepest[deepest.len() - 1].call_stack);
    }

    #[test]
    fn test_unchanged_array_is_not_copied_per_step() {
        let src = "a = [0] * 100000\ntotal = 0\nfor i in range(5000):\n    total += a[i]\nprint(total)\n";
        let limits = Limits {
            max_trace_bytes: 16 << 20,
            wall_clock_ms: 0,
            ..Limits::default()
        };
        let trace = run_with(src, Language::Python, limits, &[]).unwrap();
        assert_eq!(trace.outputs(), vec!["0"]);
    }

    #[test]
    fn test_snapshot_growth_hits_trace_memory() {
        let src = "a = [0] * 20000\ni = 0\nwhile i < 30000:\n    a[i % 20000] = i\n    i += 1\n";
        let limits = Limits {
            max_trace_bytes: 8 << 20,
            wall_clock_ms: 0,
            ..Limits::default()
        };
        let err = run_with(src, Language::Python, limits, &[]).unwrap_err();
        match err {
            TraceError::ResourceExceeded(e) => {
                assert_eq!(e.resource, Resource::TraceMemory);
                assert_eq!(e.limit, 8 << 20);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wall_clock_budget_stops_endless_loop() {
        let limits = Limits {
            max_steps: u64::MAX,
            wall_clock_ms: 50,
            ..Limits::default()
        };
        let err = run_with("while True:\n    pass\n", Language::Python, limits, &[]).unwrap_err();
        match err {
            TraceError::ResourceExceeded(e) => {
                assert_eq!(e.resource, Resource::WallClock);
                assert_eq!(e.limit, 50);
                assert!(e.line == 1 || e.line == 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_oversized_nested_allocation_is_refused() {
        let src = "row = [0] * 1024\ngrid = [row] * 1024\n";
        assert!(run(src, Language::Python).is_ok());
        let src = "grid = [[0] * 4096] * 4096\n";
        let err = run(src, Language::Python).unwrap_err();
        assert!(matches!(err, TraceError::Runtime(ref e)
            if e.kind == ErrorKind::InvalidArgument && e.line == Some(1)));
    }

    #[test]
    fn test_infinite_loop_hits_step_limit() {
        let limits = Limits {
            max_steps: 100,
            ..Limits::default()
        };
        let err = run_with("while (true) {}\n", Language::JavaScript, limits, &[]).unwrap_err();
        assert!(matches!(err, TraceError::ResourceExceeded(ref e) if e.resource == Resource::Steps));
    }

    #[test]
    fn test_inputs_bound_in_global_frame() {
        let inputs = vec![("n".to_string(), Value::int(4))];
        let trace = run_with("m = n * 2\n", Language::Python, Limits::default(), &inputs).unwrap();
        assert_eq!(int(&trace.steps()[0], "n"), 4);
        assert_eq!(int(&trace.steps()[0], "m"), 8);
    }

    #[test]
    fn test_tuple_assignment_is_simultaneous() {
        let trace = run("a, b = 0, 1\na, b = b, a + b\n", Language::Python).unwrap();
        let last = &trace.steps()[1];
        assert_eq!((int(last, "a"), int(last, "b")), (1, 1));
    }

    #[test]
    fn test_division_by_zero_reported() {
        let err = run("x = 0\ny = 3 / x\n", Language::Python).unwrap_err();
        assert!(matches!(err, TraceError::Runtime(ref e)
            if e.kind == ErrorKind::DivisionByZero && e.line == Some(2)));
    }

    #[test]
    fn test_cpp_main_body_and_output() {
        let src = "#include <iostream>\nusing namespace std;\nint main() {\n    int x = 7;\n    cout << x / 2 << endl;\n    return 0;\n}\n";
        let trace = run(src, Language::Cpp).unwrap();
        assert_eq!(trace.outputs(), vec!["3"]);
        assert_eq!(lines(&trace), vec![4, 5, 6]);
    }

    #[test]
    fn test_deterministic_traces() {
        let src = "def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\nprint(fib(5))\n";
        let a = run(src, Language::Python).unwrap();
        let b = run(src, Language::Python).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.outputs(), vec!["5"]);
    }
}
