//! Newline-delimited JSON commands understood by the replay node.
//!
//! Each input line is one command object tagged by `cmd`:
//!
//! ```text
//! {"cmd":"register","id":"0xabc","username":"alice"}
//! {"cmd":"vouch","sender":"0xabc","recipient":"0xdef","polarity":"positive","roles":["builder"]}
//! {"cmd":"quota","sender":"0xabc"}
//! {"cmd":"profile","id":"0xdef"}
//! {"cmd":"history","id":"0xdef"}
//! {"cmd":"leaderboard","limit":10}
//! {"cmd":"advance_clock","seconds":86400}
//! ```
//!
//! Each produces exactly one [`Reply`] line.

use anyhow::{bail, Context, Result};
use baseproof_reputation::{
    points_to_next_tier, Clock, InMemoryStore, ManualClock, Polarity, ProfileId,
    ProfileMetadata, ReputationError, ReputationLedger, VouchRequest,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Leaderboard size when a command omits `limit`.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 50;

fn default_leaderboard_limit() -> usize {
    DEFAULT_LEADERBOARD_LIMIT
}

/// One replay command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Create a profile or update its metadata.
    Register {
        id: String,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        bio: Option<String>,
    },
    /// Apply a vouch.
    Vouch {
        sender: String,
        recipient: String,
        polarity: Polarity,
        #[serde(default)]
        roles: Vec<String>,
        #[serde(default)]
        comment: String,
    },
    /// Remaining quota for a sender.
    Quota { sender: String },
    /// Show one profile.
    Profile { id: String },
    /// Vouches received and given by a profile.
    History { id: String },
    /// Top profiles by score.
    Leaderboard {
        #[serde(default = "default_leaderboard_limit")]
        limit: usize,
    },
    /// Move the replay clock forward. Negative steps are rejected.
    AdvanceClock { seconds: i64 },
}

/// Result of one command, written as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    /// Whether the command succeeded.
    pub ok: bool,
    /// Command output on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Machine-readable error kind on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    /// Human-readable error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            code: None,
            error: None,
        }
    }

    fn failure(err: &anyhow::Error) -> Self {
        Self {
            ok: false,
            result: None,
            code: Some(error_code(err)),
            error: Some(format!("{err:#}")),
        }
    }
}

/// Stable error kind for a failed command.
pub fn error_code(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<ReputationError>() {
        Some(ReputationError::SelfVouch) => "self_vouch",
        Some(ReputationError::SenderNotFound(_)) => "sender_not_found",
        Some(ReputationError::RecipientNotFound(_)) => "recipient_not_found",
        Some(ReputationError::RateLimitExceeded { .. }) => "rate_limited",
        Some(ReputationError::StorageConflict(_)) => "storage_conflict",
        Some(ReputationError::InvalidProfileId(_)) => "invalid_profile_id",
        Some(ReputationError::InvalidVouch(_)) => "invalid_vouch",
        Some(ReputationError::Storage(_)) => "storage",
        None => "bad_request",
    }
}

/// Parse and execute one input line.
pub async fn handle_line(
    ledger: &ReputationLedger<InMemoryStore>,
    clock: &ManualClock,
    line: &str,
) -> Reply {
    let outcome = match serde_json::from_str::<Command>(line).context("Malformed command") {
        Ok(command) => execute(ledger, clock, command).await,
        Err(err) => Err(err),
    };
    match outcome {
        Ok(value) => Reply::success(value),
        Err(err) => Reply::failure(&err),
    }
}

/// Execute a parsed command against the ledger.
pub async fn execute(
    ledger: &ReputationLedger<InMemoryStore>,
    clock: &ManualClock,
    command: Command,
) -> Result<Value> {
    match command {
        Command::Register {
            id,
            username,
            display_name,
            bio,
        } => {
            let id = ProfileId::parse(&id)?;
            let metadata = ProfileMetadata {
                username,
                display_name,
                bio,
            };
            let profile = ledger.register_profile(&id, metadata).await?;
            Ok(serde_json::to_value(profile)?)
        }
        Command::Vouch {
            sender,
            recipient,
            polarity,
            roles,
            comment,
        } => {
            let request =
                VouchRequest::new(ProfileId::parse(&sender)?, ProfileId::parse(&recipient)?, polarity)
                    .with_roles(roles)
                    .with_comment(comment);
            let applied = ledger.apply_vouch(request).await?;
            Ok(json!({
                "vouch": applied.vouch,
                "delta": format!("{}{}", applied.vouch.polarity.sign(), applied.weight()),
                "weight": applied.weight(),
                "sender_tier": applied.sender_tier(),
                "previous_score": applied.score_change.before,
                "new_score": applied.new_recipient_score(),
                "daily_remaining": applied.daily_remaining,
                "weekly_remaining": applied.weekly_remaining,
            }))
        }
        Command::Quota { sender } => {
            let quota = ledger.vouch_quota(&ProfileId::parse(&sender)?).await?;
            Ok(serde_json::to_value(quota)?)
        }
        Command::Profile { id } => {
            let id = ProfileId::parse(&id)?;
            let Some(profile) = ledger.profile(&id).await? else {
                return Ok(Value::Null);
            };
            let tier = profile.tier();
            Ok(json!({
                "profile": profile,
                "tier": tier,
                "points_to_next_tier": points_to_next_tier(profile.trust_score),
            }))
        }
        Command::History { id } => {
            let id = ProfileId::parse(&id)?;
            Ok(json!({
                "received": ledger.vouches_received(&id).await?,
                "given": ledger.vouches_given(&id).await?,
            }))
        }
        Command::Leaderboard { limit } => {
            Ok(serde_json::to_value(ledger.leaderboard(limit).await?)?)
        }
        Command::AdvanceClock { seconds } => {
            if seconds < 0 {
                bail!("Clock cannot move backward ({seconds}s)");
            }
            let by = Duration::try_seconds(seconds)
                .with_context(|| format!("Clock step out of range: {seconds}s"))?;
            clock.advance(by);
            Ok(json!({ "now": clock.now() }))
        }
    }
}
