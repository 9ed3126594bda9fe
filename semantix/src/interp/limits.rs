//! Analysis ceilings

use serde::{Deserialize, Serialize};

/// Hard caps that keep the analysis itself terminating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Limits {
    /// Maximum number of recorded trace steps
    #[serde(alias = "max_steps")]
    pub max_steps: u64,
    /// Maximum number of simultaneously active user-function frames
    #[serde(alias = "max_call_depth")]
    pub max_call_depth: u64,
    /// Wall-clock budget in milliseconds; 0 disables the check
    #[serde(alias = "wall_clock_ms")]
    pub wall_clock_ms: u64,
    /// Approximate bytes the recorded steps may hold
    #[serde(alias = "max_trace_bytes")]
    pub max_trace_bytes: u64,
}

impl Limits {
    pub const DEFAULT_MAX_STEPS: u64 = 100_000;
    pub const DEFAULT_MAX_CALL_DEPTH: u64 = 1_000;
    pub const DEFAULT_WALL_CLOCK_MS: u64 = 5_000;
    pub const DEFAULT_MAX_TRACE_BYTES: u64 = 512 << 20;
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_steps: Self::DEFAULT_MAX_STEPS,
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
            wall_clock_ms: Self::DEFAULT_WALL_CLOCK_MS,
            max_trace_bytes: Self::DEFAULT_MAX_TRACE_BYTES,
        }
    }
}
