//! Profiles and the deltas the ledger applies to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReputationError, Result};
use crate::score::{ScoreChange, TRUST_SCORE_START};
use crate::tier::{classify, Tier};
use crate::vouch::Polarity;

/// Maximum length of a profile id after normalization.
pub const MAX_PROFILE_ID_LEN: usize = 128;

/// Normalized identity key, usually a wallet address.
///
/// Ids are trimmed and lower-cased on construction so that `0xAbC` and
/// `0xabc` name the same profile. Ordering is lexicographic and is the
/// global lock order for multi-profile commits.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileId(String);

impl ProfileId {
    /// Parse and normalize a raw identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ReputationError::InvalidProfileId(
                "id cannot be empty".to_string(),
            ));
        }
        if normalized.len() > MAX_PROFILE_ID_LEN {
            return Err(ReputationError::InvalidProfileId(format!(
                "id longer than {MAX_PROFILE_ID_LEN} bytes"
            )));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(ReputationError::InvalidProfileId(format!(
                "id contains whitespace: {normalized:?}"
            )));
        }
        Ok(Self(normalized))
    }

    /// The normalized id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProfileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProfileId {
    type Error = ReputationError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ProfileId> for String {
    fn from(id: ProfileId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ProfileId {
    type Err = ReputationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Identity metadata set during profile setup.
///
/// Setup only ever writes these fields. It never touches score or counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    /// Social handle.
    pub username: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
    /// Short bio.
    pub bio: Option<String>,
}

/// One identity's reputation record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable key.
    pub id: ProfileId,
    /// Trust score, always within `0..=10000`.
    pub trust_score: u32,
    /// Positive vouches received.
    pub positive_vouches: u64,
    /// Negative vouches received.
    pub negative_vouches: u64,
    /// All vouches received.
    pub vouches_received: u64,
    /// All vouches given.
    pub vouches_given: u64,
    /// Identity metadata.
    pub metadata: ProfileMetadata,
    /// When the profile was set up.
    pub created_at: DateTime<Utc>,
    /// Last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// A fresh profile at the neutral starting score.
    #[must_use]
    pub fn new(id: ProfileId, metadata: ProfileMetadata, now: DateTime<Utc>) -> Self {
        Self {
            id,
            trust_score: TRUST_SCORE_START,
            positive_vouches: 0,
            negative_vouches: 0,
            vouches_received: 0,
            vouches_given: 0,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current tier.
    #[must_use]
    pub fn tier(&self) -> Tier {
        classify(self.trust_score)
    }
}

/// Counter and score changes applied to one profile as a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDelta {
    /// Signed score change, clamped on apply.
    pub score: i64,
    /// Added to `positive_vouches`.
    pub positive_received: u64,
    /// Added to `negative_vouches`.
    pub negative_received: u64,
    /// Added to `vouches_received`.
    pub received: u64,
    /// Added to `vouches_given`.
    pub given: u64,
}

impl ProfileDelta {
    /// Delta for the recipient of one vouch.
    #[must_use]
    pub fn received(polarity: Polarity, score: i64) -> Self {
        let (positive_received, negative_received) =
            if polarity.is_positive() { (1, 0) } else { (0, 1) };
        Self {
            score,
            positive_received,
            negative_received,
            received: 1,
            given: 0,
        }
    }

    /// Delta for the sender of one vouch.
    #[must_use]
    pub fn given() -> Self {
        Self {
            given: 1,
            ..Self::default()
        }
    }

    /// Apply to a profile in place. Counters saturate; the score clamps.
    pub fn apply_to(&self, profile: &mut Profile, now: DateTime<Utc>) -> ScoreChange {
        let change = ScoreChange::apply(profile.trust_score, self.score);
        profile.trust_score = change.after;
        profile.positive_vouches = profile.positive_vouches.saturating_add(self.positive_received);
        profile.negative_vouches = profile.negative_vouches.saturating_add(self.negative_received);
        profile.vouches_received = profile.vouches_received.saturating_add(self.received);
        profile.vouches_given = profile.vouches_given.saturating_add(self.given);
        profile.updated_at = now;
        change
    }
}
