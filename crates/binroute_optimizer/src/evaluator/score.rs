use std::fmt;

use schemars::JsonSchema;
use serde::Serialize;

/// Weight of one constraint violation when a score is folded into a scalar.
pub const VIOLATION_PENALTY: f64 = 1_000_000.0;

/// Lexicographic score, lower is better. `hard_score` counts constraint
/// violations, `soft_score` is the weighted objective cost.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Score {
    pub hard_score: f64,
    pub soft_score: f64,
}

impl Score {
    pub fn new(hard_score: f64, soft_score: f64) -> Self {
        Score {
            hard_score,
            soft_score,
        }
    }

    pub fn scalar(&self) -> f64 {
        self.hard_score * VIOLATION_PENALTY + self.soft_score
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{:.2}soft", self.hard_score, self.soft_score)
    }
}
