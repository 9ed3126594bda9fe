//! Well-known integer sequences matched against loop variables

use num_bigint::BigInt;
use num_traits::{One, Zero};
use serde::Serialize;

/// Largest index any sequence is evaluated at
const MAX_INDEX: u64 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sequence {
    /// fib(0) = 0, fib(1) = 1
    Fibonacci,
    Factorial,
    PowerOfTwo,
    Square,
    /// m * (m + 1) / 2
    Triangular,
}

impl Sequence {
    /// Tried in this order; earlier entries win ties
    pub const ALL: [Sequence; 5] = [
        Sequence::Fibonacci,
        Sequence::Factorial,
        Sequence::PowerOfTwo,
        Sequence::Square,
        Sequence::Triangular,
    ];

    /// The `m`-th term
    pub fn term(self, m: u64) -> Option<BigInt> {
        if m > MAX_INDEX {
            return None;
        }
        let big = BigInt::from(m);
        Some(match self {
            Sequence::Fibonacci => {
                let (mut a, mut b) = (BigInt::zero(), BigInt::one());
                for _ in 0..m {
                    let next = &a + &b;
                    a = std::mem::replace(&mut b, next);
                }
                a
            }
            Sequence::Factorial => (1..=m).fold(BigInt::one(), |acc, k| acc * k),
            Sequence::PowerOfTwo => BigInt::one() << m,
            Sequence::Square => &big * &big,
            Sequence::Triangular => &big * (&big + 1u32) / 2u32,
        })
    }

    /// Render `var == <term at index>`
    pub fn render(self, var: &str, index: &str) -> String {
        let grouped = if index.contains(' ') {
            format!("({index})")
        } else {
            index.to_string()
        };
        match self {
            Sequence::Fibonacci => format!("{var} == fib({index})"),
            Sequence::Factorial => format!("{var} == factorial({index})"),
            Sequence::PowerOfTwo => format!("{var} == 2 ** {grouped}"),
            Sequence::Square => format!("{var} == {grouped} ** 2"),
            Sequence::Triangular => format!("{var} == {grouped} * ({index} + 1) / 2"),
        }
    }
}

/// `i`, `i + 2`, `i - 1`
pub fn offset_text(var: &str, offset: i64) -> String {
    match offset {
        0 => var.to_string(),
        d if d > 0 => format!("{var} + {d}"),
        d => format!("{var} - {}", -d),
    }
}
