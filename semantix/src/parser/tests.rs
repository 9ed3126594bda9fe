//! Parser tests for every surface dialect

use crate::ast::{BinOp, Expr, Language, Program, Stmt, StmtKind, Target, UnOp};
use crate::error::SyntaxError;
use crate::parser::{parse, parse_expression};
use num_bigint::BigInt;

/// Helper to parse and expect success
fn parse_ok(source: &str, language: Language) -> Program {
    match parse(source, language) {
        Ok(program) => program,
        Err(e) => panic!("parse should succeed: {e}"),
    }
}

/// Helper to parse and expect failure
fn parse_err(source: &str, language: Language) -> SyntaxError {
    match parse(source, language) {
        Ok(program) => panic!("parse should fail, got {program:?}"),
        Err(e) => e,
    }
}

fn py(source: &str) -> Program {
    parse_ok(source, Language::Python)
}

fn int(n: i64) -> Expr {
    Expr::Int(BigInt::from(n))
}

fn var(name: &str) -> Expr {
    Expr::Var(name.into())
}

fn lines(block: &[Stmt]) -> Vec<u32> {
    block.iter().map(|s| s.line).collect()
}

// ============================================
// Python
// ============================================

#[test]
fn test_parse_python_function_and_call() {
    let prog = py("def double(x):\n    return x * 2\n\nprint(double(4))\n");
    assert_eq!(prog.functions.len(), 1);
    let f = &prog.functions[0];
    assert_eq!(f.name, "double");
    assert_eq!(f.params, vec!["x".to_string()]);
    assert_eq!(f.line, 1);
    assert_eq!(lines(&f.body), vec![2]);
    assert_eq!(prog.body.len(), 1);
    assert_eq!(prog.body[0].line, 4);
    assert!(matches!(prog.body[0].kind, StmtKind::Print { .. }));
}

#[test]
fn test_parse_python_tuple_assignment() {
    let prog = py("a, b = 0, 1\na, b = b, a + b\n");
    let StmtKind::Assign { targets, op, values } = &prog.body[1].kind else {
        panic!("expected assignment");
    };
    assert_eq!(
        targets,
        &vec![Target::Var("a".into()), Target::Var("b".into())]
    );
    assert_eq!(*op, None);
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].node, var("b"));
    assert!(matches!(values[1].node, Expr::Binary { op: BinOp::Add, .. }));
}

#[test]
fn test_parse_python_range_loop() {
    let prog = py("for i in range(2, n + 1):\n    pass\n");
    let StmtKind::ForRange {
        var: name,
        start,
        end,
        step,
        body,
    } = &prog.body[0].kind
    else {
        panic!("expected range loop");
    };
    assert_eq!(name, "i");
    assert_eq!(start.node, int(2));
    assert!(matches!(end.node, Expr::Binary { op: BinOp::Add, .. }));
    assert!(step.is_none());
    assert_eq!(body.len(), 1);
}

#[test]
fn test_parse_python_range_single_argument_starts_at_zero() {
    let prog = py("for i in range(n):\n    pass\n");
    let StmtKind::ForRange { start, end, .. } = &prog.body[0].kind else {
        panic!("expected range loop");
    };
    assert_eq!(start.node, int(0));
    assert_eq!(end.node, var("n"));
}

#[test]
fn test_parse_python_for_each() {
    let prog = py("for x in arr:\n    total += x\n");
    assert!(matches!(
        &prog.body[0].kind,
        StmtKind::ForEach { var, .. } if var == "x"
    ));
}

#[test]
fn test_parse_python_if_elif_else() {
    let src = "if x < 0:\n    s = -1\nelif x == 0:\n    s = 0\nelse:\n    s = 1\n";
    let prog = py(src);
    let StmtKind::If {
        branches,
        else_body,
    } = &prog.body[0].kind
    else {
        panic!("expected if");
    };
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[0].cond.text, "x < 0");
    assert_eq!(branches[0].cond.line, 1);
    assert_eq!(branches[1].cond.text, "x == 0");
    assert_eq!(branches[1].cond.line, 3);
    assert_eq!(else_body.as_ref().map(|b| lines(b)), Some(vec![6]));
}

#[test]
fn test_parse_python_inline_block() {
    let prog = py("def f(n):\n    if n <= 1: return 1\n    return n\n");
    let f = &prog.functions[0];
    assert_eq!(lines(&f.body), vec![2, 3]);
    let StmtKind::If { branches, .. } = &f.body[0].kind else {
        panic!("expected if");
    };
    assert!(matches!(branches[0].body[0].kind, StmtKind::Return(Some(_))));
}

#[test]
fn test_parse_python_operators_by_dialect() {
    let prog = py("a = x / y\nb = x // y\nc = x % y\n");
    let ops: Vec<BinOp> = prog
        .body
        .iter()
        .map(|s| match &s.kind {
            StmtKind::Assign { values, .. } => match &values[0].node {
                Expr::Binary { op, .. } => *op,
                other => panic!("expected binary, got {other:?}"),
            },
            other => panic!("expected assignment, got {other:?}"),
        })
        .collect();
    assert_eq!(ops, vec![BinOp::TrueDiv, BinOp::FloorDiv, BinOp::FloorMod]);
}

#[test]
fn test_parse_python_allocation_forms() {
    let prog = py("a = [0] * (n + 1)\nb = [[0] * m for _ in range(n)]\n");
    for stmt in &prog.body {
        let StmtKind::Assign { values, .. } = &stmt.kind else {
            panic!("expected assignment");
        };
        assert!(matches!(values[0].node, Expr::Alloc { .. }));
    }
}

#[test]
fn test_parse_python_comprehension_over_loop_variable_rejected() {
    let err = parse_err("a = [i * i for i in range(n)]\n", Language::Python);
    assert!(err.message.contains("comprehensions"));
}

#[test]
fn test_parse_python_chained_comparison() {
    let prog = py("ok = 0 <= i < n\n");
    let StmtKind::Assign { values, .. } = &prog.body[0].kind else {
        panic!("expected assignment");
    };
    let Expr::Binary { op, left, right } = &values[0].node else {
        panic!("expected binary");
    };
    assert_eq!(*op, BinOp::And);
    assert!(matches!(left.node, Expr::Binary { op: BinOp::Le, .. }));
    assert!(matches!(right.node, Expr::Binary { op: BinOp::Lt, .. }));
}

#[test]
fn test_parse_python_slice_and_methods() {
    let prog = py("xs.append(3)\nys = xs[1:]\nn = len(xs)\n");
    let StmtKind::Expr(call) = &prog.body[0].kind else {
        panic!("expected expression statement");
    };
    assert!(matches!(&call.node, Expr::Call { func, args } if func == "append" && args.len() == 2));
    let StmtKind::Assign { values, .. } = &prog.body[1].kind else {
        panic!("expected assignment");
    };
    assert!(matches!(
        values[0].node,
        Expr::Slice {
            start: Some(_),
            end: None,
            ..
        }
    ));
}

#[test]
fn test_parse_python_print_separator() {
    let prog = py("print(a, b, sep=\", \")\n");
    assert!(matches!(
        &prog.body[0].kind,
        StmtKind::Print { args, separator } if args.len() == 2 && separator == ", "
    ));
}

#[test]
fn test_parse_python_not_binds_looser_than_comparison() {
    let expr = parse_expression("not a == b", Language::Python).unwrap();
    let Expr::Unary { op, expr } = expr.node else {
        panic!("expected unary");
    };
    assert_eq!(op, UnOp::Not);
    assert!(matches!(expr.node, Expr::Binary { op: BinOp::Eq, .. }));
}

#[test]
fn test_parse_python_power_is_right_associative() {
    let expr = parse_expression("-2 ** 3 ** 2", Language::Python).unwrap();
    let Expr::Unary { op: UnOp::Neg, expr } = expr.node else {
        panic!("expected negation");
    };
    let Expr::Binary { op, right, .. } = expr.node else {
        panic!("expected power");
    };
    assert_eq!(op, BinOp::Pow);
    assert!(matches!(right.node, Expr::Binary { op: BinOp::Pow, .. }));
}

#[test]
fn test_parse_python_conditional_expression() {
    let expr = parse_expression("a if a > b else b", Language::Python).unwrap();
    assert!(matches!(expr.node, Expr::Conditional { .. }));
}

#[test]
fn test_parse_python_missing_indented_block() {
    let err = parse_err("def f(n):\n", Language::Python);
    assert_eq!(err.line, 1);
    assert!(err.message.contains("indented block"));
}

#[test]
fn test_parse_python_nested_def_rejected() {
    let err = parse_err("def f():\n    def g():\n        pass\n", Language::Python);
    assert_eq!(err.line, 2);
}

// ============================================
// JavaScript
// ============================================

#[test]
fn test_parse_javascript_program() {
    let src = "\
function sum(arr) {
  let total = 0;
  for (let i = 0; i < arr.length; i++) {
    total += arr[i];
  }
  return total;
}
console.log(sum([1, 2, 3]));
";
    let prog = parse_ok(src, Language::JavaScript);
    let f = &prog.functions[0];
    assert_eq!(f.params, vec!["arr".to_string()]);
    assert_eq!(lines(&f.body), vec![2, 3, 6]);
    let StmtKind::For {
        init, cond, update, ..
    } = &f.body[1].kind
    else {
        panic!("expected C-style for");
    };
    assert_eq!(init.len(), 1);
    assert_eq!(cond.as_ref().map(|c| c.text.as_str()), Some("i < arr.length"));
    assert_eq!(update.len(), 1);
    assert!(matches!(
        update[0].kind,
        StmtKind::Assign {
            op: Some(BinOp::Add),
            ..
        }
    ));
    assert!(matches!(prog.body[0].kind, StmtKind::Print { .. }));
}

#[test]
fn test_parse_javascript_destructuring_swap() {
    let prog = parse_ok("[a, b] = [b, a + b];", Language::JavaScript);
    let StmtKind::Assign {
        targets, values, ..
    } = &prog.body[0].kind
    else {
        panic!("expected assignment");
    };
    assert_eq!(targets.len(), 2);
    assert_eq!(values.len(), 2);
}

#[test]
fn test_parse_javascript_for_of_and_else_if() {
    let src = "for (const x of xs) {\n  if (x > 0) { p++; } else if (x < 0) { m++; } else { z++; }\n}";
    let prog = parse_ok(src, Language::JavaScript);
    let StmtKind::ForEach { body, .. } = &prog.body[0].kind else {
        panic!("expected for-of");
    };
    let StmtKind::If {
        branches,
        else_body,
    } = &body[0].kind
    else {
        panic!("expected if");
    };
    assert_eq!(branches.len(), 2);
    assert!(else_body.is_some());
}

#[test]
fn test_parse_javascript_division_and_fill() {
    let prog = parse_ok("let q = a / b;\nlet dp = new Array(n + 1).fill(0);", Language::JavaScript);
    let StmtKind::Assign { values, .. } = &prog.body[0].kind else {
        panic!("expected assignment");
    };
    assert!(matches!(values[0].node, Expr::Binary { op: BinOp::NumDiv, .. }));
    let StmtKind::Assign { values, .. } = &prog.body[1].kind else {
        panic!("expected assignment");
    };
    let Expr::Alloc { fill, .. } = &values[0].node else {
        panic!("expected allocation");
    };
    assert_eq!(fill.node, int(0));
}

#[test]
fn test_parse_javascript_unterminated_block() {
    let src = "function f(n) {\n  if (n > 0) {\n    return n;\n}\n";
    let err = parse_err(src, Language::JavaScript);
    assert_eq!(err.line, 1);
    assert!(err.message.contains("never closed"));
}

// ============================================
// Java
// ============================================

#[test]
fn test_parse_java_class_and_main() {
    let src = "\
public class Main {
    static int fact(int n) {
        if (n <= 1) return 1;
        return n * fact(n - 1);
    }

    public static void main(String[] args) {
        int[] arr = new int[5];
        System.out.println(fact(5));
    }
}
";
    let prog = parse_ok(src, Language::Java);
    assert_eq!(prog.functions.len(), 1);
    assert_eq!(prog.functions[0].name, "fact");
    assert_eq!(prog.functions[0].line, 2);
    assert_eq!(lines(&prog.body), vec![8, 9]);
    let StmtKind::Assign { values, .. } = &prog.body[0].kind else {
        panic!("expected declaration");
    };
    assert!(matches!(values[0].node, Expr::Alloc { .. }));
}

#[test]
fn test_parse_java_declarations_and_casts() {
    let src = "class A { public static void main(String[] args) {\n\
               long a = 0, b = 1;\n\
               double avg = (double) a / 2;\n\
               List<Integer> xs = new ArrayList<>();\n\
               boolean done;\n\
               } }";
    let prog = parse_ok(src, Language::Java);
    assert_eq!(prog.body.len(), 4);
    let StmtKind::Assign { targets, .. } = &prog.body[0].kind else {
        panic!("expected declaration");
    };
    assert_eq!(targets.len(), 2);
    let StmtKind::Assign { values, .. } = &prog.body[3].kind else {
        panic!("expected declaration");
    };
    assert_eq!(values[0].node, Expr::Bool(false));
}

#[test]
fn test_parse_java_enhanced_for() {
    let src = "class A { static int s(int[] xs) { int t = 0; for (int x : xs) t += x; return t; } }";
    let prog = parse_ok(src, Language::Java);
    assert!(matches!(prog.functions[0].body[1].kind, StmtKind::ForEach { .. }));
}

// ============================================
// C++
// ============================================

#[test]
fn test_parse_cpp_program() {
    let src = "\
#include <iostream>
#include <vector>
using namespace std;

int fib(int n) {
    vector<long long> dp(n + 1, 0);
    return n;
}

int main() {
    cout << fib(6) << endl;
    return 0;
}
";
    let prog = parse_ok(src, Language::Cpp);
    assert_eq!(prog.functions.len(), 1);
    assert_eq!(prog.functions[0].line, 5);
    let StmtKind::Assign { values, .. } = &prog.functions[0].body[0].kind else {
        panic!("expected declaration");
    };
    assert!(matches!(values[0].node, Expr::Alloc { .. }));
    assert_eq!(lines(&prog.body), vec![11, 12]);
    assert!(matches!(
        &prog.body[0].kind,
        StmtKind::Print { args, .. } if args.len() == 1
    ));
}

#[test]
fn test_parse_cpp_nested_generic_types() {
    let src = "int main() { vector<vector<int>> grid(n, vector<int>(m, 0)); }";
    let prog = parse_ok(src, Language::Cpp);
    let StmtKind::Assign { values, .. } = &prog.body[0].kind else {
        panic!("expected declaration");
    };
    let Expr::Alloc { fill, .. } = &values[0].node else {
        panic!("expected allocation");
    };
    assert!(matches!(fill.node, Expr::Alloc { .. }));
}

#[test]
fn test_parse_cpp_prototype_and_reference_params() {
    let src = "int total(const vector<int>& v);\nint total(const vector<int>& v) { return v.size(); }";
    let prog = parse_ok(src, Language::Cpp);
    assert_eq!(prog.functions.len(), 1);
    assert_eq!(prog.functions[0].params, vec!["v".to_string()]);
}

#[test]
fn test_parse_cpp_c_array_declaration() {
    let prog = parse_ok("int main() { int a[3] = {1, 2, 3}; int b[n]; }", Language::Cpp);
    let StmtKind::Assign { values, .. } = &prog.body[0].kind else {
        panic!("expected declaration");
    };
    assert!(matches!(&values[0].node, Expr::Array(items) if items.len() == 3));
    let StmtKind::Assign { values, .. } = &prog.body[1].kind else {
        panic!("expected declaration");
    };
    assert!(matches!(values[0].node, Expr::Alloc { .. }));
}

// ============================================
// Errors and expressions
// ============================================

#[test]
fn test_parse_duplicate_function() {
    let err = parse_err("def f():\n    pass\ndef f():\n    pass\n", Language::Python);
    assert_eq!(err.line, 3);
    assert!(err.message.contains("more than once"));
}

#[test]
fn test_parse_unexpected_token_position() {
    let err = parse_err("x = 1\ny = * 2\n", Language::Python);
    assert_eq!((err.line, err.column), (2, 5));
    assert!(err.message.contains("expected an expression"));
}

#[test]
fn test_parse_invalid_assignment_target() {
    let err = parse_err("f(x) = 3;", Language::JavaScript);
    assert!(err.message.contains("cannot assign"));
}

#[test]
fn test_parse_expression_literals() {
    let e = parse_expression("[1, -2, \"s\", True, None]", Language::Python).unwrap();
    let Expr::Array(items) = e.node else {
        panic!("expected array");
    };
    assert_eq!(items.len(), 5);
    assert_eq!(items[0].node, int(1));
    assert!(matches!(items[1].node, Expr::Unary { op: UnOp::Neg, .. }));
    assert_eq!(items[4].node, Expr::Null);
}

#[test]
fn test_parse_expression_rejects_trailing_tokens() {
    assert!(parse_expression("1 2", Language::JavaScript).is_err());
}

#[test]
fn test_parse_is_deterministic() {
    let src = "def f(n):\n    return n + 1\nprint(f(2))\n";
    assert_eq!(py(src), py(src));
}
