//! The reputation ledger: the single entry point that applies vouches.
//!
//! ## Vouch pipeline
//!
//! 1. Payload bounds (comment length, role tags)
//! 2. Self-vouch check on normalized ids
//! 3. Sender and recipient must exist
//! 4. Atomic rate-limit check-and-reserve for the sender
//! 5. Weigh by the sender's tier and commit vouch plus both deltas as a unit
//!
//! Steps 1-3 and a rejected step 4 leave storage untouched. Once step 4
//! reserves a slot it is kept even if the commit fails.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, LedgerConfig};
use crate::error::{ReputationError, Result, StoreError};
use crate::profile::{Profile, ProfileDelta, ProfileId, ProfileMetadata};
use crate::rate_limiter::{RateLimitDecision, RateLimitState, VouchRateLimiter};
use crate::score::ScoreChange;
use crate::store::{LedgerStore, VouchMutation};
use crate::tier::Tier;
use crate::vouch::{Vouch, VouchRequest};
use crate::weight::{signed_delta, vouch_weight};

/// Outcome of a successfully applied vouch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VouchApplied {
    /// The recorded vouch, with its store-assigned id.
    pub vouch: Vouch,
    /// Recipient after the vouch.
    pub recipient: Profile,
    /// How the recipient's score moved.
    pub score_change: ScoreChange,
    /// Sender's vouches left today.
    pub daily_remaining: u32,
    /// Sender's vouches left this week.
    pub weekly_remaining: u32,
}

impl VouchApplied {
    /// Unclamped weight of the vouch.
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.vouch.weight
    }

    /// Sender's tier when the vouch was weighed.
    #[must_use]
    pub fn sender_tier(&self) -> Tier {
        self.vouch.sender_tier
    }

    /// Recipient's score after clamping.
    #[must_use]
    pub fn new_recipient_score(&self) -> u32 {
        self.score_change.after
    }
}

/// Coordinates profiles, vouches and quotas over a [`LedgerStore`].
///
/// The ledger holds no mutable state of its own and is safe to share
/// across tasks behind an `Arc`.
pub struct ReputationLedger<S: LedgerStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
    limiter: VouchRateLimiter,
}

impl<S: LedgerStore> std::fmt::Debug for ReputationLedger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReputationLedger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: LedgerStore> ReputationLedger<S> {
    /// Create a ledger with default configuration and the system clock.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config: LedgerConfig::default(),
            limiter: VouchRateLimiter::default(),
        }
    }

    /// Create a ledger with explicit configuration and clock.
    pub fn with_config(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let limiter = VouchRateLimiter::new(&config.rate_limits)?;
        Ok(Self {
            store,
            clock,
            config,
            limiter,
        })
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ==================== Profiles ====================

    /// Create or update a profile at the clock's current time.
    pub async fn register_profile(
        &self,
        id: &ProfileId,
        metadata: ProfileMetadata,
    ) -> Result<Profile> {
        self.register_profile_at(id, metadata, self.clock.now()).await
    }

    /// Create a profile at the starting score, or update only the metadata
    /// of an existing one.
    pub async fn register_profile_at(
        &self,
        id: &ProfileId,
        metadata: ProfileMetadata,
        now: DateTime<Utc>,
    ) -> Result<Profile> {
        let (profile, created) = self.store.upsert_metadata(id, metadata, now).await?;
        if created {
            info!(profile = %id, score = profile.trust_score, "Profile created");
        } else {
            debug!(profile = %id, "Profile metadata updated");
        }
        Ok(profile)
    }

    /// Load a profile.
    pub async fn profile(&self, id: &ProfileId) -> Result<Option<Profile>> {
        Ok(self.store.get(id).await?)
    }

    /// Vouches received by `id`, newest first.
    pub async fn vouches_received(&self, id: &ProfileId) -> Result<Vec<Vouch>> {
        Ok(self.store.received_by(id).await?)
    }

    /// Vouches given by `id`, newest first.
    pub async fn vouches_given(&self, id: &ProfileId) -> Result<Vec<Vouch>> {
        Ok(self.store.given_by(id).await?)
    }

    /// Top profiles by score, ties broken by id.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<Profile>> {
        Ok(self.store.top_by_score(limit).await?)
    }

    // ==================== Quotas ====================

    /// Remaining quota for `sender` at the clock's current time.
    pub async fn vouch_quota(&self, sender: &ProfileId) -> Result<RateLimitDecision> {
        self.vouch_quota_at(sender, self.clock.now()).await
    }

    /// Remaining quota for `sender` at `now`.
    ///
    /// Read-only: a sender without rate-limit state is previewed against
    /// fresh counters, and none are stored.
    pub async fn vouch_quota_at(
        &self,
        sender: &ProfileId,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision> {
        if self.store.get(sender).await?.is_none() {
            return Err(ReputationError::SenderNotFound(sender.to_string()));
        }
        let state = self
            .store
            .find_rate_limit(sender)
            .await?
            .unwrap_or_else(|| RateLimitState::new(now));
        Ok(self.limiter.preview(&state, now))
    }

    // ==================== Vouching ====================

    /// Apply a vouch at the clock's current time.
    pub async fn apply_vouch(&self, request: VouchRequest) -> Result<VouchApplied> {
        self.apply_vouch_at(request, self.clock.now()).await
    }

    /// Apply a vouch at `now`.
    ///
    /// Not idempotent: applying the same request twice records two vouches.
    ///
    /// # Errors
    ///
    /// - [`ReputationError::InvalidVouch`] for out-of-bounds payloads.
    /// - [`ReputationError::SelfVouch`] when sender and recipient match.
    /// - [`ReputationError::SenderNotFound`] / [`ReputationError::RecipientNotFound`].
    /// - [`ReputationError::RateLimitExceeded`] when either quota is spent.
    /// - [`ReputationError::StorageConflict`] once commit retries run out.
    pub async fn apply_vouch_at(
        &self,
        request: VouchRequest,
        now: DateTime<Utc>,
    ) -> Result<VouchApplied> {
        request.validate(&self.config.vouch_policy)?;

        if request.sender == request.recipient {
            debug!(sender = %request.sender, "Rejected self-vouch");
            return Err(ReputationError::SelfVouch);
        }

        let sender = self
            .store
            .get(&request.sender)
            .await?
            .ok_or_else(|| ReputationError::SenderNotFound(request.sender.to_string()))?;
        if self.store.get(&request.recipient).await?.is_none() {
            return Err(ReputationError::RecipientNotFound(
                request.recipient.to_string(),
            ));
        }

        let decision = self
            .store
            .atomic_check_and_increment(&request.sender, now, &self.limiter)
            .await?;
        if !decision.is_allowed() {
            warn!(
                sender = %request.sender,
                daily_remaining = decision.daily_remaining,
                weekly_remaining = decision.weekly_remaining,
                "Vouch rate limit exceeded"
            );
            return Err(ReputationError::RateLimitExceeded {
                daily_remaining: decision.daily_remaining,
                weekly_remaining: decision.weekly_remaining,
            });
        }

        let tier = sender.tier();
        let weight = vouch_weight(sender.trust_score, request.polarity);
        let delta = signed_delta(weight, request.polarity);
        debug!(
            sender = %request.sender,
            sender_score = sender.trust_score,
            tier = %tier,
            weight,
            delta,
            "Weighed vouch"
        );

        let polarity = request.polarity;
        let mutation = VouchMutation {
            vouch: Vouch::from_request(request, weight, tier, now),
            recipient_delta: ProfileDelta::received(polarity, delta),
            sender_delta: ProfileDelta::given(),
        };

        let committed = self.commit_with_retry(&mutation, now).await?;
        info!(
            sender = %committed.vouch.sender,
            recipient = %committed.vouch.recipient,
            polarity = %committed.vouch.polarity.sign(),
            weight,
            score_before = committed.score_change.before,
            score_after = committed.score_change.after,
            "Vouch applied"
        );

        Ok(VouchApplied {
            vouch: committed.vouch,
            recipient: committed.recipient,
            score_change: committed.score_change,
            daily_remaining: decision.daily_remaining,
            weekly_remaining: decision.weekly_remaining,
        })
    }

    async fn commit_with_retry(
        &self,
        mutation: &VouchMutation,
        now: DateTime<Utc>,
    ) -> Result<crate::store::CommittedVouch> {
        let max_retries = self.config.max_commit_retries;
        let mut attempt = 0u32;
        loop {
            match self.store.commit_vouch(mutation, now).await {
                Ok(committed) => return Ok(committed),
                Err(StoreError::Conflict(reason)) if attempt < max_retries => {
                    attempt += 1;
                    warn!(
                        sender = %mutation.vouch.sender,
                        recipient = %mutation.vouch.recipient,
                        attempt,
                        max_retries,
                        %reason,
                        "Commit conflict, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
