//! Vouch weights by sender tier.
//!
//! Negative vouches weigh about 2.5x a positive one from the same tier, and a
//! Platinum sender carries 8x the weight of a Basic one.

use serde::{Deserialize, Serialize};

use crate::tier::{classify, Tier};
use crate::vouch::Polarity;

/// Point values a tier's vouches carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierWeights {
    /// Tier these weights apply to.
    pub tier: Tier,
    /// Points added by a positive vouch.
    pub positive: u32,
    /// Points removed by a negative vouch.
    pub negative: u32,
}

/// Weight table, indexed by [`Tier::index`].
pub const WEIGHT_TABLE: [TierWeights; 5] = [
    TierWeights {
        tier: Tier::Basic,
        positive: 10,
        negative: 25,
    },
    TierWeights {
        tier: Tier::Silver,
        positive: 15,
        negative: 37,
    },
    TierWeights {
        tier: Tier::Elite,
        positive: 25,
        negative: 62,
    },
    TierWeights {
        tier: Tier::Gold,
        positive: 50,
        negative: 125,
    },
    TierWeights {
        tier: Tier::Platinum,
        positive: 80,
        negative: 200,
    },
];

impl TierWeights {
    /// Weights for a tier.
    #[must_use]
    pub fn for_tier(tier: Tier) -> Self {
        WEIGHT_TABLE[tier.index()]
    }

    /// Magnitude for the given polarity.
    #[must_use]
    pub fn for_polarity(&self, polarity: Polarity) -> u32 {
        match polarity {
            Polarity::Positive => self.positive,
            Polarity::Negative => self.negative,
        }
    }
}

/// Magnitude of a vouch sent by someone holding `sender_score`.
#[must_use]
pub fn vouch_weight(sender_score: u32, polarity: Polarity) -> u32 {
    TierWeights::for_tier(classify(sender_score)).for_polarity(polarity)
}

/// Signed score delta a vouch applies to its recipient.
#[must_use]
pub fn signed_delta(weight: u32, polarity: Polarity) -> i64 {
    match polarity {
        Polarity::Positive => i64::from(weight),
        Polarity::Negative => -i64::from(weight),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_indexed_by_tier() {
        for tier in Tier::ALL {
            assert_eq!(TierWeights::for_tier(tier).tier, tier);
        }
    }

    #[test]
    fn test_weights_per_tier() {
        assert_eq!(vouch_weight(8_500, Polarity::Positive), 80);
        assert_eq!(vouch_weight(8_500, Polarity::Negative), 200);
        assert_eq!(vouch_weight(5_000, Polarity::Positive), 50);
        assert_eq!(vouch_weight(5_000, Polarity::Negative), 125);
        assert_eq!(vouch_weight(2_500, Polarity::Positive), 25);
        assert_eq!(vouch_weight(2_500, Polarity::Negative), 62);
        assert_eq!(vouch_weight(1_000, Polarity::Positive), 15);
        assert_eq!(vouch_weight(1_000, Polarity::Negative), 37);
        assert_eq!(vouch_weight(50, Polarity::Positive), 10);
        assert_eq!(vouch_weight(50, Polarity::Negative), 25);
    }

    #[test]
    fn test_boundary_uses_upper_tier() {
        assert_eq!(vouch_weight(999, Polarity::Positive), 10);
        assert_eq!(vouch_weight(1_000, Polarity::Positive), 15);
        assert_eq!(vouch_weight(7_999, Polarity::Negative), 125);
        assert_eq!(vouch_weight(8_000, Polarity::Negative), 200);
    }

    #[test]
    fn test_monotonic_in_tier() {
        for pair in Tier::ALL.windows(2) {
            let (low, high) = (pair[0], pair[1]);
            for polarity in [Polarity::Positive, Polarity::Negative] {
                assert!(
                    vouch_weight(low.min_score(), polarity)
                        <= vouch_weight(high.min_score(), polarity)
                );
            }
        }
    }

    #[test]
    fn test_negative_outweighs_positive() {
        for row in WEIGHT_TABLE {
            assert!(row.negative > row.positive);
        }
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(signed_delta(80, Polarity::Positive), 80);
        assert_eq!(signed_delta(25, Polarity::Negative), -25);
    }
}
