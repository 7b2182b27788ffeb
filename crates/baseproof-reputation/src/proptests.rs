//! Property-based tests for scoring and rate limiting.
//!
//! - Tier classification matches the threshold table for every score
//! - Vouch weight never decreases as the sender's tier rises
//! - Scores stay in bounds under arbitrary delta sequences
//! - The rate limiter never hands out more than its limits allow

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use crate::config::RateLimitConfig;
use crate::profile::{Profile, ProfileDelta, ProfileId, ProfileMetadata};
use crate::rate_limiter::{RateLimitState, VouchRateLimiter};
use crate::score::{ScoreChange, TRUST_SCORE_MAX};
use crate::tier::{classify, points_to_next_tier, Tier, TIER_THRESHOLDS};
use crate::vouch::Polarity;
use crate::weight::vouch_weight;

fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_741_600_800, 0).unwrap()
}

fn polarity() -> impl Strategy<Value = Polarity> {
    prop_oneof![Just(Polarity::Positive), Just(Polarity::Negative)]
}

// ==================== Tier Property Tests ====================

proptest! {
    /// The classified tier is the last threshold at or below the score.
    #[test]
    fn classify_matches_threshold_table(score in 0u32..=20_000) {
        let tier = classify(score);
        prop_assert!(score >= tier.min_score());
        if let Some(next) = tier.next() {
            prop_assert!(score < next.min_score());
        }
        let expected = TIER_THRESHOLDS
            .iter()
            .filter(|(min, _)| score >= *min)
            .map(|(_, t)| *t)
            .last();
        prop_assert_eq!(Some(tier), expected);
    }

    /// Points to the next tier land exactly on the next threshold.
    #[test]
    fn points_to_next_tier_reaches_threshold(score in 0u32..8_000) {
        let points = points_to_next_tier(score).unwrap();
        let next = classify(score).next().unwrap();
        prop_assert_eq!(score + points, next.min_score());
    }
}

// ==================== Weight Property Tests ====================

proptest! {
    /// A higher-scored sender never carries less weight.
    #[test]
    fn weight_monotone_in_score(a in 0u32..=10_000, b in 0u32..=10_000, p in polarity()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(vouch_weight(low, p) <= vouch_weight(high, p));
    }

    /// Negative vouches always outweigh positive ones from the same sender.
    #[test]
    fn negative_outweighs_positive(score in 0u32..=10_000) {
        prop_assert!(vouch_weight(score, Polarity::Negative) > vouch_weight(score, Polarity::Positive));
        prop_assert!(vouch_weight(score, Polarity::Positive) > 0);
    }
}

// ==================== Score Property Tests ====================

proptest! {
    /// No sequence of deltas pushes a score out of range.
    #[test]
    fn score_stays_in_bounds(
        start in 0u32..=10_000,
        deltas in prop::collection::vec(-50_000i64..=50_000, 0..64),
    ) {
        let mut profile = Profile::new(
            ProfileId::parse("0xprop").unwrap(),
            ProfileMetadata::default(),
            epoch(),
        );
        profile.trust_score = start;
        for delta in deltas {
            let change = ProfileDelta::received(Polarity::Positive, delta).apply_to(&mut profile, epoch());
            prop_assert!(change.after <= TRUST_SCORE_MAX);
            prop_assert_eq!(profile.trust_score, change.after);
        }
    }

    /// Extreme deltas saturate instead of overflowing.
    #[test]
    fn extreme_deltas_saturate(current in 0u32..=10_000, delta in any::<i64>()) {
        let change = ScoreChange::apply(current, delta);
        prop_assert!(change.after <= TRUST_SCORE_MAX);
        if delta >= 0 {
            prop_assert!(change.after >= current);
        } else {
            prop_assert!(change.after <= current);
        }
    }
}

// ==================== Rate Limiter Property Tests ====================

proptest! {
    /// However requests are spaced, no calendar day sees more than the
    /// daily limit and no weekly window more than the weekly limit.
    #[test]
    fn limiter_never_exceeds_limits(
        daily in 1u32..=6,
        extra_weekly in 0u32..=30,
        gaps in prop::collection::vec(0i64..=36 * 3600, 1..200),
    ) {
        let config = RateLimitConfig {
            daily_limit: daily,
            weekly_limit: daily + extra_weekly,
            ..RateLimitConfig::default()
        };
        let limiter = VouchRateLimiter::new(&config).unwrap();
        let mut now = epoch();
        let mut state = RateLimitState::new(now);

        for gap in gaps {
            now += Duration::seconds(gap);
            let decision = limiter.check_and_reserve(&mut state, now);
            prop_assert!(state.daily_issued() <= daily);
            prop_assert!(state.weekly_issued() <= daily + extra_weekly);
            if decision.allowed {
                prop_assert!(state.daily_issued() >= 1);
            }
            prop_assert_eq!(decision.daily_remaining, daily - state.daily_issued());
        }
    }

    /// Previewing never changes what a real check would decide.
    #[test]
    fn preview_agrees_with_check(
        issued in 0usize..10,
        gap in 0i64..=10 * 86_400,
    ) {
        let limiter = VouchRateLimiter::default();
        let mut state = RateLimitState::new(epoch());
        for _ in 0..issued {
            limiter.check_and_reserve(&mut state, epoch());
        }
        let later = epoch() + Duration::seconds(gap);
        let preview = limiter.preview(&state, later);
        let actual = limiter.check_and_reserve(&mut state, later);
        prop_assert_eq!(preview.allowed, actual.allowed);
        if actual.allowed {
            prop_assert_eq!(preview.daily_remaining, actual.daily_remaining + 1);
        } else {
            prop_assert_eq!(preview.daily_remaining, actual.daily_remaining);
        }
    }
}

#[test]
fn every_tier_reachable() {
    for tier in Tier::ALL {
        assert_eq!(classify(tier.min_score()), tier);
    }
}
