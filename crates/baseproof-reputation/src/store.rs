//! Storage interfaces for profiles, vouches and rate-limit state.
//!
//! The ledger only talks to storage through these traits. Each trait is
//! async so that database-backed implementations fit behind it; the
//! [`InMemoryStore`] shipped here is used by tests and the replay node.
//!
//! ## Atomicity
//!
//! - [`ProfileStore::apply_delta`] is atomic per profile id.
//! - [`RateLimitStore::atomic_check_and_increment`] rolls windows, checks and
//!   reserves in one step per sender.
//! - [`LedgerStore::commit_vouch`] applies the whole effect of one vouch
//!   (log append plus both profile deltas) or none of it.
//!
//! ## Example
//!
//! ```
//! use baseproof_reputation::store::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! assert_eq!(store.profile_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::profile::{Profile, ProfileDelta, ProfileId, ProfileMetadata};
use crate::rate_limiter::{RateLimitDecision, RateLimitState, VouchRateLimiter};
use crate::score::ScoreChange;
use crate::vouch::{Vouch, VouchId};

/// Profile persistence.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load a profile.
    async fn get(&self, id: &ProfileId) -> StoreResult<Option<Profile>>;

    /// Create the profile at the starting score, or replace the metadata of
    /// an existing one. Returns the profile and whether it was created.
    ///
    /// Never changes score or counters of an existing profile.
    async fn upsert_metadata(
        &self,
        id: &ProfileId,
        metadata: ProfileMetadata,
        now: DateTime<Utc>,
    ) -> StoreResult<(Profile, bool)>;

    /// Apply a delta to one profile atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the profile does not exist.
    async fn apply_delta(
        &self,
        id: &ProfileId,
        delta: &ProfileDelta,
        now: DateTime<Utc>,
    ) -> StoreResult<Profile>;

    /// Profiles by score descending, ties by id ascending.
    async fn top_by_score(&self, limit: usize) -> StoreResult<Vec<Profile>>;
}

/// Append-only vouch log.
#[async_trait]
pub trait VouchStore: Send + Sync {
    /// Append a vouch and assign its id.
    async fn append(&self, vouch: Vouch) -> StoreResult<VouchId>;

    /// Vouches received by `id`, newest first.
    async fn received_by(&self, id: &ProfileId) -> StoreResult<Vec<Vouch>>;

    /// Vouches given by `id`, newest first.
    async fn given_by(&self, id: &ProfileId) -> StoreResult<Vec<Vouch>>;
}

/// Per-sender rate-limit state.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Load the sender's state if it exists. Never creates it.
    async fn find_rate_limit(&self, sender: &ProfileId) -> StoreResult<Option<RateLimitState>>;

    /// Load the sender's state, creating zeroed counters if absent.
    async fn get_or_create(
        &self,
        sender: &ProfileId,
        now: DateTime<Utc>,
    ) -> StoreResult<RateLimitState>;

    /// Roll windows, check and reserve for `sender` as one step.
    async fn atomic_check_and_increment(
        &self,
        sender: &ProfileId,
        now: DateTime<Utc>,
        limiter: &VouchRateLimiter,
    ) -> StoreResult<RateLimitDecision>;
}

/// Everything one vouch changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VouchMutation {
    /// The vouch to append. Its id is assigned on commit.
    pub vouch: Vouch,
    /// Change to the recipient.
    pub recipient_delta: ProfileDelta,
    /// Change to the sender.
    pub sender_delta: ProfileDelta,
}

/// State after a committed vouch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedVouch {
    /// The appended vouch, with its id.
    pub vouch: Vouch,
    /// Recipient after the commit.
    pub recipient: Profile,
    /// Sender after the commit.
    pub sender: Profile,
    /// How the recipient's score moved.
    pub score_change: ScoreChange,
}

/// Storage able to commit a vouch as one unit.
#[async_trait]
pub trait LedgerStore: ProfileStore + VouchStore + RateLimitStore {
    /// Append the vouch and apply both deltas, or change nothing.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if either profile is missing.
    /// - [`StoreError::Conflict`] if isolation could not be guaranteed. No
    ///   state was changed and the commit may be retried.
    async fn commit_vouch(
        &self,
        mutation: &VouchMutation,
        now: DateTime<Utc>,
    ) -> StoreResult<CommittedVouch>;
}

fn poisoned<T>(what: &'static str) -> impl FnOnce(PoisonError<T>) -> StoreError {
    move |_| StoreError::Poisoned(what.to_string())
}

type Slot<T> = Arc<Mutex<T>>;

#[derive(Debug, Default)]
struct VouchLog {
    entries: Vec<Vouch>,
    next_id: u64,
}

impl VouchLog {
    fn push(&mut self, mut vouch: Vouch) -> Vouch {
        let id = VouchId(self.next_id);
        self.next_id += 1;
        vouch.id = Some(id);
        self.entries.push(vouch.clone());
        vouch
    }

    fn newest_first<F>(&self, pred: F) -> Vec<Vouch>
    where
        F: Fn(&Vouch) -> bool,
    {
        self.entries.iter().rev().filter(|v| pred(*v)).cloned().collect()
    }
}

/// In-memory storage backend.
///
/// Every profile and every sender's rate-limit state lives in its own
/// mutex, so unrelated keys never contend. The outer maps are only locked
/// long enough to find or insert a slot.
#[derive(Default)]
pub struct InMemoryStore {
    profiles: RwLock<HashMap<ProfileId, Slot<Profile>>>,
    rate_limits: RwLock<HashMap<ProfileId, Slot<RateLimitState>>>,
    vouches: Mutex<VouchLog>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("profiles", &self.profile_count())
            .field("vouches", &self.vouch_count())
            .finish()
    }
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of profiles.
    pub fn profile_count(&self) -> usize {
        self.profiles.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Number of vouches in the log.
    pub fn vouch_count(&self) -> usize {
        self.vouches.lock().map(|v| v.entries.len()).unwrap_or(0)
    }

    /// Insert a profile as-is, replacing any existing one.
    ///
    /// Bypasses the ledger; meant for seeding fixtures and imports.
    pub fn seed_profile(&self, profile: Profile) -> StoreResult<()> {
        let mut profiles = self.profiles.write().map_err(poisoned("profiles"))?;
        profiles.insert(profile.id.clone(), Arc::new(Mutex::new(profile)));
        Ok(())
    }

    fn profile_slot(&self, id: &ProfileId) -> StoreResult<Option<Slot<Profile>>> {
        let profiles = self.profiles.read().map_err(poisoned("profiles"))?;
        Ok(profiles.get(id).cloned())
    }

    fn require_profile_slot(&self, id: &ProfileId) -> StoreResult<Slot<Profile>> {
        self.profile_slot(id)?
            .ok_or_else(|| StoreError::NotFound(format!("profile {id}")))
    }

    fn rate_limit_slot(
        &self,
        sender: &ProfileId,
        now: DateTime<Utc>,
    ) -> StoreResult<Slot<RateLimitState>> {
        {
            let limits = self.rate_limits.read().map_err(poisoned("rate_limits"))?;
            if let Some(slot) = limits.get(sender) {
                return Ok(Arc::clone(slot));
            }
        }
        let mut limits = self.rate_limits.write().map_err(poisoned("rate_limits"))?;
        let slot = limits
            .entry(sender.clone())
            .or_insert_with(|| Arc::new(Mutex::new(RateLimitState::new(now))));
        Ok(Arc::clone(slot))
    }
}

fn lock_profile(slot: &Slot<Profile>) -> StoreResult<MutexGuard<'_, Profile>> {
    slot.lock().map_err(poisoned("profile"))
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get(&self, id: &ProfileId) -> StoreResult<Option<Profile>> {
        let Some(slot) = self.profile_slot(id)? else {
            return Ok(None);
        };
        let profile = lock_profile(&slot)?.clone();
        Ok(Some(profile))
    }

    async fn upsert_metadata(
        &self,
        id: &ProfileId,
        metadata: ProfileMetadata,
        now: DateTime<Utc>,
    ) -> StoreResult<(Profile, bool)> {
        if let Some(slot) = self.profile_slot(id)? {
            let mut profile = lock_profile(&slot)?;
            profile.metadata = metadata;
            profile.updated_at = now;
            return Ok((profile.clone(), false));
        }

        let mut profiles = self.profiles.write().map_err(poisoned("profiles"))?;
        // Another writer may have created it between the two locks.
        if let Some(slot) = profiles.get(id) {
            let mut profile = lock_profile(slot)?;
            profile.metadata = metadata;
            profile.updated_at = now;
            return Ok((profile.clone(), false));
        }
        let profile = Profile::new(id.clone(), metadata, now);
        profiles.insert(id.clone(), Arc::new(Mutex::new(profile.clone())));
        Ok((profile, true))
    }

    async fn apply_delta(
        &self,
        id: &ProfileId,
        delta: &ProfileDelta,
        now: DateTime<Utc>,
    ) -> StoreResult<Profile> {
        let slot = self.require_profile_slot(id)?;
        let mut profile = lock_profile(&slot)?;
        delta.apply_to(&mut profile, now);
        Ok(profile.clone())
    }

    async fn top_by_score(&self, limit: usize) -> StoreResult<Vec<Profile>> {
        let slots: Vec<Slot<Profile>> = {
            let profiles = self.profiles.read().map_err(poisoned("profiles"))?;
            profiles.values().cloned().collect()
        };

        let mut all = Vec::with_capacity(slots.len());
        for slot in &slots {
            all.push(lock_profile(slot)?.clone());
        }
        all.sort_by(|a, b| {
            b.trust_score
                .cmp(&a.trust_score)
                .then_with(|| a.id.cmp(&b.id))
        });
        all.truncate(limit);
        Ok(all)
    }
}

#[async_trait]
impl VouchStore for InMemoryStore {
    async fn append(&self, vouch: Vouch) -> StoreResult<VouchId> {
        let mut log = self.vouches.lock().map_err(poisoned("vouches"))?;
        let stored = log.push(vouch);
        stored
            .id
            .ok_or_else(|| StoreError::Backend("vouch id not assigned".to_string()))
    }

    async fn received_by(&self, id: &ProfileId) -> StoreResult<Vec<Vouch>> {
        let log = self.vouches.lock().map_err(poisoned("vouches"))?;
        Ok(log.newest_first(|v| &v.recipient == id))
    }

    async fn given_by(&self, id: &ProfileId) -> StoreResult<Vec<Vouch>> {
        let log = self.vouches.lock().map_err(poisoned("vouches"))?;
        Ok(log.newest_first(|v| &v.sender == id))
    }
}

#[async_trait]
impl RateLimitStore for InMemoryStore {
    async fn find_rate_limit(&self, sender: &ProfileId) -> StoreResult<Option<RateLimitState>> {
        let slot = {
            let limits = self.rate_limits.read().map_err(poisoned("rate_limits"))?;
            limits.get(sender).cloned()
        };
        let Some(slot) = slot else {
            return Ok(None);
        };
        let state = slot.lock().map_err(poisoned("rate_limit"))?.clone();
        Ok(Some(state))
    }

    async fn get_or_create(
        &self,
        sender: &ProfileId,
        now: DateTime<Utc>,
    ) -> StoreResult<RateLimitState> {
        let slot = self.rate_limit_slot(sender, now)?;
        let state = slot.lock().map_err(poisoned("rate_limit"))?;
        Ok(state.clone())
    }

    async fn atomic_check_and_increment(
        &self,
        sender: &ProfileId,
        now: DateTime<Utc>,
        limiter: &VouchRateLimiter,
    ) -> StoreResult<RateLimitDecision> {
        let slot = self.rate_limit_slot(sender, now)?;
        let mut state = slot.lock().map_err(poisoned("rate_limit"))?;
        Ok(limiter.check_and_reserve(&mut state, now))
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn commit_vouch(
        &self,
        mutation: &VouchMutation,
        now: DateTime<Utc>,
    ) -> StoreResult<CommittedVouch> {
        let sender_id = &mutation.vouch.sender;
        let recipient_id = &mutation.vouch.recipient;
        if sender_id == recipient_id {
            return Err(StoreError::Backend(format!(
                "commit touches {sender_id} twice"
            )));
        }

        let sender_slot = self.require_profile_slot(sender_id)?;
        let recipient_slot = self.require_profile_slot(recipient_id)?;

        // Fixed global lock order: lexicographic by id.
        let sender_first = sender_id < recipient_id;
        let (first, second) = if sender_first {
            (&sender_slot, &recipient_slot)
        } else {
            (&recipient_slot, &sender_slot)
        };
        let first_guard = lock_profile(first)?;
        let second_guard = lock_profile(second)?;
        let (mut sender_guard, mut recipient_guard) = if sender_first {
            (first_guard, second_guard)
        } else {
            (second_guard, first_guard)
        };

        let mut recipient = recipient_guard.clone();
        let mut sender = sender_guard.clone();
        let score_change = mutation.recipient_delta.apply_to(&mut recipient, now);
        mutation.sender_delta.apply_to(&mut sender, now);

        // The append is the last fallible step; profiles are written after it.
        let vouch = {
            let mut log = self.vouches.lock().map_err(poisoned("vouches"))?;
            log.push(mutation.vouch.clone())
        };

        *recipient_guard = recipient.clone();
        *sender_guard = sender.clone();

        Ok(CommittedVouch {
            vouch,
            recipient,
            sender,
            score_change,
        })
    }
}
