//! # baseproof-reputation
//!
//! Weighted trust scores for BaseProof.
//!
//! This crate provides:
//! - **Tier**: Score bands from Basic to Platinum
//! - **Weight**: Vouch magnitude by sender tier and polarity
//! - **RateLimiter**: Per-sender daily and weekly issuance quotas
//! - **Store**: Async storage traits plus an in-memory backend
//! - **Ledger**: The vouch pipeline tying it all together
//!
//! ## Scoring Rules
//!
//! - Profiles start at 100, scores clamp to 0..=10000
//! - A vouch moves the recipient by the sender's tier weight
//! - Negative vouches weigh roughly 2.5x a positive one
//! - 5 vouches per calendar day, 35 per rolling 7 days
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use baseproof_reputation::{
//!     InMemoryStore, Polarity, ProfileId, ProfileMetadata, ReputationLedger, VouchRequest,
//! };
//!
//! # async fn run() -> baseproof_reputation::Result<()> {
//! let ledger = ReputationLedger::new(Arc::new(InMemoryStore::new()));
//! let alice = ProfileId::parse("0xA11CE")?;
//! let bob = ProfileId::parse("0xB0B")?;
//! ledger.register_profile(&alice, ProfileMetadata::default()).await?;
//! ledger.register_profile(&bob, ProfileMetadata::default()).await?;
//!
//! let applied = ledger
//!     .apply_vouch(VouchRequest::new(alice, bob, Polarity::Positive))
//!     .await?;
//! assert_eq!(applied.new_recipient_score(), 110);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod profile;
pub mod rate_limiter;
pub mod score;
pub mod store;
pub mod tier;
pub mod vouch;
pub mod weight;

#[cfg(test)]
mod proptests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigError, LedgerConfig, LedgerConfigBuilder, RateLimitConfig, VouchPolicyConfig,
};
pub use error::{ReputationError, Result, StoreError, StoreResult};
pub use ledger::{ReputationLedger, VouchApplied};
pub use profile::{Profile, ProfileDelta, ProfileId, ProfileMetadata};
pub use rate_limiter::{RateLimitDecision, RateLimitState, VouchRateLimiter};
pub use score::{clamp_score, ScoreChange, TRUST_SCORE_MAX, TRUST_SCORE_MIN, TRUST_SCORE_START};
pub use store::{
    CommittedVouch, InMemoryStore, LedgerStore, ProfileStore, RateLimitStore, VouchMutation,
    VouchStore,
};
pub use tier::{classify, points_to_next_tier, Tier};
pub use vouch::{Polarity, Vouch, VouchId, VouchRequest};
pub use weight::{vouch_weight, TierWeights};
