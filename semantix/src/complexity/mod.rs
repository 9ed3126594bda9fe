//! Complexity estimation
//!
//! The structural pass over the AST is the primary signal. Step counts
//! measured at several input sizes only fill in what the structure could
//! not classify, and otherwise annotate the reasoning.

mod empirical;
mod growth;
mod structural;

pub use empirical::SizedTrace;
pub use growth::Growth;

use crate::ast::Program;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeComplexity {
    pub best: Growth,
    pub average: Growth,
    pub worst: Growth,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceComplexity {
    pub class: Growth,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityResult {
    pub time: TimeComplexity,
    pub space: SpaceComplexity,
}

/// Classify time and space growth. Never fails; anything the model cannot
/// place comes back as `O(unknown)` with the reason in the reasoning text.
pub fn estimate_complexity(program: &Program, traces: &[SizedTrace]) -> ComplexityResult {
    let structure = structural::analyze(program);
    let mut worst = structure.worst;
    let mut best = structure.best;
    let mut stack = structure.stack;
    let mut time_notes = structure.time_notes;
    let mut space_notes = structure.space_notes;

    if let Some(fit) = empirical::fit(traces) {
        log::debug!("empirical fit: time {}, stack {}", fit.time, fit.stack);
        if worst.is_unknown() {
            worst = fit.time;
            time_notes.push(format!(
                "Measured step counts over {} input sizes grow as {}.",
                traces.len(),
                fit.time
            ));
        } else if fit.time == worst {
            time_notes.push(format!("Measured step counts agree with {worst}."));
        } else {
            time_notes.push(format!(
                "Measured step counts over the sampled sizes grow as {}.",
                fit.time
            ));
        }
        if stack.is_unknown() {
            stack = fit.stack;
        }
    }

    if best.is_unknown() || best.max(worst) != worst {
        best = worst;
    }
    if structure.early_exit && best != worst {
        time_notes.push(format!(
            "Average case is {worst}: a typical run stops part-way through the loop, \
             which changes the constant but not the class."
        ));
    }
    if time_notes.is_empty() {
        time_notes.push("Straight-line code with no size-dependent loops or recursion.".into());
    }

    let space = stack.max(structure.heap);
    if space_notes.is_empty() {
        space_notes.push(if space.is_unknown() {
            "Stack depth could not be classified.".to_string()
        } else {
            "No recursion and no size-dependent allocation; extra space is constant.".to_string()
        });
    }

    let result = ComplexityResult {
        time: TimeComplexity {
            best,
            average: worst,
            worst,
            reasoning: time_notes.join(" "),
        },
        space: SpaceComplexity {
            class: space,
            reasoning: space_notes.join(" "),
        },
    };
    log::debug!(
        "complexity: best {}, worst {}, space {}",
        result.time.best,
        result.time.worst,
        result.space.class
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Language;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;
    use test_log::test;

    const FIB: &str = "def fibonacci(n):
    if n <= 1:
        return n
    a, b = 0, 1
    for i in range(2, n + 1):
        a, b = b, a + b
    return b

print(fibonacci(6))
";

    #[test]
    fn test_fibonacci_classes() {
        let program = parse(FIB, Language::Python).unwrap();
        let result = estimate_complexity(&program, &[]);
        assert_eq!(result.time.best, Growth::CONSTANT);
        assert_eq!(result.time.average, Growth::LINEAR);
        assert_eq!(result.time.worst, Growth::LINEAR);
        assert_eq!(result.space.class, Growth::CONSTANT);
        assert!(result.time.reasoning.contains("line 5"));
    }

    #[test]
    fn test_factorial_space_is_stack_depth() {
        let program = parse(
            "function factorial(n) {\n  if (n <= 1) {\n    return 1;\n  }\n  return n * factorial(n - 1);\n}\nconsole.log(factorial(5));\n",
            Language::JavaScript,
        )
        .unwrap();
        let result = estimate_complexity(&program, &[]);
        assert_eq!(result.time.worst, Growth::LINEAR);
        assert_eq!(result.space.class, Growth::LINEAR);
        assert!(result.space.reasoning.contains("call stack"));
    }

    #[test]
    fn test_measurements_fill_unknown_worst_case() {
        let program = parse(
            "def walk(n):\n    i = n\n    while i > 0:\n        i = helper(i)\n    return 0\ndef helper(x):\n    return x - 1\nprint(walk(n))\n",
            Language::Python,
        )
        .unwrap();
        assert_eq!(estimate_complexity(&program, &[]).time.worst, Growth::Unknown);

        let samples: Vec<SizedTrace> = [8u64, 16, 32, 64]
            .iter()
            .map(|&n| SizedTrace {
                size: n,
                steps: 3 * n as usize + 5,
                max_depth: 2,
            })
            .collect();
        let result = estimate_complexity(&program, &samples);
        assert_eq!(result.time.worst, Growth::LINEAR);
        assert!(result.time.reasoning.contains("Measured"));
    }

    #[test]
    fn test_straight_line_is_constant() {
        let program = parse("x = 1\ny = x + 2\nprint(y)\n", Language::Python).unwrap();
        let result = estimate_complexity(&program, &[]);
        assert_eq!(result.time.worst, Growth::CONSTANT);
        assert_eq!(result.space.class, Growth::CONSTANT);
    }

    #[test]
    fn test_serialized_shape() {
        let program = parse(FIB, Language::Python).unwrap();
        let json = serde_json::to_value(estimate_complexity(&program, &[])).unwrap();
        assert_eq!(json["time"]["worst"], "O(n)");
        assert_eq!(json["space"]["class"], "O(1)");
    }
}
