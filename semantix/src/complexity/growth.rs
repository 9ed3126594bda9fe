//! Order-of-growth classes

use serde::{Serialize, Serializer};
use std::fmt;

/// Asymptotic class in terms of the size parameter `n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Growth {
    /// `n^poly * (log n)^log`
    Bounded { poly: u32, log: u32 },
    Exponential,
    /// Not enough structure to classify
    Unknown,
}

impl Growth {
    pub const CONSTANT: Growth = Growth::Bounded { poly: 0, log: 0 };
    pub const LOG: Growth = Growth::Bounded { poly: 0, log: 1 };
    pub const LINEAR: Growth = Growth::Bounded { poly: 1, log: 0 };
    pub const LINEARITHMIC: Growth = Growth::Bounded { poly: 1, log: 1 };
    pub const QUADRATIC: Growth = Growth::Bounded { poly: 2, log: 0 };
    pub const CUBIC: Growth = Growth::Bounded { poly: 3, log: 0 };

    /// Cost of doing `other` once per step of `self`
    pub fn times(self, other: Growth) -> Growth {
        match (self, other) {
            (Growth::Unknown, _) | (_, Growth::Unknown) => Growth::Unknown,
            (Growth::Exponential, _) | (_, Growth::Exponential) => Growth::Exponential,
            (Growth::Bounded { poly: p1, log: l1 }, Growth::Bounded { poly: p2, log: l2 }) => {
                Growth::Bounded {
                    poly: p1 + p2,
                    log: l1 + l2,
                }
            }
        }
    }

    /// Dominant term of `self + other`
    pub fn max(self, other: Growth) -> Growth {
        match (self, other) {
            (Growth::Unknown, _) | (_, Growth::Unknown) => Growth::Unknown,
            (Growth::Exponential, _) | (_, Growth::Exponential) => Growth::Exponential,
            (Growth::Bounded { poly: p1, log: l1 }, Growth::Bounded { poly: p2, log: l2 }) => {
                if (p1, l1) >= (p2, l2) {
                    self
                } else {
                    other
                }
            }
        }
    }

    /// Cheaper of two alternatives; unknown only when both are
    pub fn min(self, other: Growth) -> Growth {
        match (self, other) {
            (Growth::Unknown, x) | (x, Growth::Unknown) => x,
            (Growth::Exponential, x) | (x, Growth::Exponential) => x,
            (Growth::Bounded { poly: p1, log: l1 }, Growth::Bounded { poly: p2, log: l2 }) => {
                if (p1, l1) <= (p2, l2) {
                    self
                } else {
                    other
                }
            }
        }
    }

    pub fn is_constant(self) -> bool {
        self == Growth::CONSTANT
    }

    pub fn is_unknown(self) -> bool {
        self == Growth::Unknown
    }

    /// `f(n)` for empirical fitting; `None` where the class has no shape
    pub fn eval(self, n: f64) -> Option<f64> {
        match self {
            Growth::Bounded { poly, log } => {
                let lg = (n + 1.0).log2().max(1.0);
                Some(n.max(1.0).powi(poly as i32) * lg.powi(log as i32))
            }
            Growth::Exponential if n <= 60.0 => Some(2f64.powf(n)),
            Growth::Exponential | Growth::Unknown => None,
        }
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Growth::Unknown => write!(f, "O(unknown)"),
            Growth::Exponential => write!(f, "O(2^n)"),
            Growth::Bounded { poly: 0, log: 0 } => write!(f, "O(1)"),
            Growth::Bounded { poly, log } => {
                let mut parts = Vec::new();
                match poly {
                    0 => {}
                    1 => parts.push("n".to_string()),
                    p => parts.push(format!("n^{p}")),
                }
                match log {
                    0 => {}
                    1 => parts.push("log n".to_string()),
                    l => parts.push(format!("log^{l} n")),
                }
                write!(f, "O({})", parts.join(" "))
            }
        }
    }
}

impl Serialize for Growth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
