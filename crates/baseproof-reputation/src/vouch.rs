//! Vouch records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::VouchPolicyConfig;
use crate::error::{ReputationError, Result};
use crate::profile::ProfileId;
use crate::tier::Tier;

/// Direction of an endorsement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Raises the recipient's score.
    Positive,
    /// Lowers the recipient's score.
    Negative,
}

impl Polarity {
    /// `true` for [`Polarity::Positive`].
    #[must_use]
    pub fn is_positive(&self) -> bool {
        matches!(self, Polarity::Positive)
    }

    /// `+` or `-`.
    #[must_use]
    pub fn sign(&self) -> char {
        match self {
            Polarity::Positive => '+',
            Polarity::Negative => '-',
        }
    }
}

/// Identifier assigned by the vouch store on append.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VouchId(pub u64);

impl std::fmt::Display for VouchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vouch-{}", self.0)
    }
}

/// A caller's request to vouch, before weighting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VouchRequest {
    /// Who is vouching.
    pub sender: ProfileId,
    /// Who is being vouched for.
    pub recipient: ProfileId,
    /// Positive or negative.
    pub polarity: Polarity,
    /// Informational role tags.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Free-text comment.
    #[serde(default)]
    pub comment: String,
}

impl VouchRequest {
    /// Build a request with no roles and no comment.
    #[must_use]
    pub fn new(sender: ProfileId, recipient: ProfileId, polarity: Polarity) -> Self {
        Self {
            sender,
            recipient,
            polarity,
            roles: BTreeSet::new(),
            comment: String::new(),
        }
    }

    /// Attach role tags.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Check payload bounds. Identity checks happen in the ledger.
    pub fn validate(&self, policy: &VouchPolicyConfig) -> Result<()> {
        let comment_chars = self.comment.chars().count();
        if comment_chars > policy.max_comment_chars {
            return Err(ReputationError::InvalidVouch(format!(
                "comment is {comment_chars} characters (max {})",
                policy.max_comment_chars
            )));
        }
        if self.roles.len() > policy.max_roles {
            return Err(ReputationError::InvalidVouch(format!(
                "{} roles given (max {})",
                self.roles.len(),
                policy.max_roles
            )));
        }
        if self.roles.iter().any(|role| role.trim().is_empty()) {
            return Err(ReputationError::InvalidVouch(
                "role tags cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// An immutable endorsement as recorded in the vouch log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vouch {
    /// Store-assigned id. `None` until appended.
    pub id: Option<VouchId>,
    /// Sender.
    pub sender: ProfileId,
    /// Recipient.
    pub recipient: ProfileId,
    /// Positive or negative.
    pub polarity: Polarity,
    /// Informational role tags.
    pub roles: BTreeSet<String>,
    /// Free-text comment.
    pub comment: String,
    /// Unclamped magnitude derived from the sender's tier.
    pub weight: u32,
    /// Sender's tier when the vouch was weighed.
    pub sender_tier: Tier,
    /// When the vouch was created.
    pub created_at: DateTime<Utc>,
}

impl Vouch {
    /// Turn a request into a vouch record.
    #[must_use]
    pub fn from_request(
        request: VouchRequest,
        weight: u32,
        sender_tier: Tier,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            sender: request.sender,
            recipient: request.recipient,
            polarity: request.polarity,
            roles: request.roles,
            comment: request.comment,
            weight,
            sender_tier,
            created_at,
        }
    }

    /// Signed delta this vouch requested.
    #[must_use]
    pub fn signed_weight(&self) -> i64 {
        crate::weight::signed_delta(self.weight, self.polarity)
    }
}
