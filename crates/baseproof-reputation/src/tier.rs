//! Trust tiers derived from score.
//!
//! Tiers are an ordered table of inclusive lower bounds. A score equal to a
//! tier's minimum belongs to that tier; the next tier's minimum is the
//! exclusive upper bound.
//!
//! | Tier     | Min score |
//! |----------|-----------|
//! | Basic    | 0         |
//! | Silver   | 1000      |
//! | Elite    | 2500      |
//! | Gold     | 5000      |
//! | Platinum | 8000      |

use serde::{Deserialize, Serialize};

/// Reputation tiers, ordered ascending by minimum score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Score 0-999. Every new profile starts here.
    Basic,
    /// Score 1000-2499.
    Silver,
    /// Score 2500-4999.
    Elite,
    /// Score 5000-7999.
    Gold,
    /// Score >= 8000.
    Platinum,
}

/// Tier thresholds, ascending. Classification scans from the top.
pub const TIER_THRESHOLDS: [(u32, Tier); 5] = [
    (0, Tier::Basic),
    (1_000, Tier::Silver),
    (2_500, Tier::Elite),
    (5_000, Tier::Gold),
    (8_000, Tier::Platinum),
];

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 5] = [
        Tier::Basic,
        Tier::Silver,
        Tier::Elite,
        Tier::Gold,
        Tier::Platinum,
    ];

    /// Classify a score. Assumes the caller keeps scores in range.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        TIER_THRESHOLDS
            .iter()
            .rev()
            .find(|(min, _)| score >= *min)
            .map(|(_, tier)| *tier)
            .unwrap_or(Tier::Basic)
    }

    /// Inclusive lower bound of this tier.
    #[must_use]
    pub fn min_score(&self) -> u32 {
        TIER_THRESHOLDS[self.index()].0
    }

    /// The tier above this one, if any.
    #[must_use]
    pub fn next(&self) -> Option<Tier> {
        Tier::ALL.get(self.index() + 1).copied()
    }

    /// Position of this tier in [`Tier::ALL`].
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Tier::Basic => 0,
            Tier::Silver => 1,
            Tier::Elite => 2,
            Tier::Gold => 3,
            Tier::Platinum => 4,
        }
    }

    /// Human-readable tier name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Basic => "Basic",
            Tier::Silver => "Silver",
            Tier::Elite => "Elite",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Classify a trust score.
#[must_use]
pub fn classify(score: u32) -> Tier {
    Tier::from_score(score)
}

/// Points needed to reach the next tier, or `None` at the top tier.
#[must_use]
pub fn points_to_next_tier(score: u32) -> Option<u32> {
    classify(score)
        .next()
        .map(|next| next.min_score().saturating_sub(score))
}
