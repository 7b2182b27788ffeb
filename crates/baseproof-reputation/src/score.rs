//! Trust score bounds and clamped arithmetic.

use serde::{Deserialize, Serialize};

/// Trust score limits.
pub mod limits {
    /// Score every new profile starts with.
    pub const TRUST_SCORE_START: u32 = 100;

    /// Maximum trust score.
    pub const TRUST_SCORE_MAX: u32 = 10_000;

    /// Minimum trust score.
    pub const TRUST_SCORE_MIN: u32 = 0;
}

pub use limits::*;

/// Clamp an arbitrary signed value into the trust score range.
#[must_use]
pub fn clamp_score(value: i64) -> u32 {
    value.clamp(i64::from(TRUST_SCORE_MIN), i64::from(TRUST_SCORE_MAX)) as u32
}

/// Outcome of applying a signed delta to a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    /// Score before the delta.
    pub before: u32,
    /// Score after the delta and clamping.
    pub after: u32,
    /// The delta that was requested.
    pub requested: i64,
}

impl ScoreChange {
    /// Apply `delta` to `current`, saturating at the score bounds.
    #[must_use]
    pub fn apply(current: u32, delta: i64) -> Self {
        let after = clamp_score(i64::from(current).saturating_add(delta));
        Self {
            before: current,
            after,
            requested: delta,
        }
    }

    /// The delta that actually landed after clamping.
    #[must_use]
    pub fn effective(&self) -> i64 {
        i64::from(self.after) - i64::from(self.before)
    }

    /// Whether clamping cut the requested delta short.
    #[must_use]
    pub fn was_clamped(&self) -> bool {
        self.effective() != self.requested
    }
}
