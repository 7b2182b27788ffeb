//! Ledger configuration.
//!
//! # Example
//!
//! ```
//! use baseproof_reputation::config::{LedgerConfig, LedgerConfigBuilder};
//!
//! // Defaults: 5 vouches/day, 35 vouches per 7 days, UTC day boundary
//! let config = LedgerConfig::default();
//! assert_eq!(config.rate_limits.daily_limit, 5);
//!
//! // Or customize
//! let config = LedgerConfigBuilder::new()
//!     .with_daily_limit(3)
//!     .with_day_boundary_offset_secs(-5 * 3600)
//!     .build_validated()
//!     .unwrap();
//! assert_eq!(config.rate_limits.daily_limit, 3);
//! ```

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default vouches a sender may issue per calendar day.
pub const DEFAULT_DAILY_LIMIT: u32 = 5;

/// Default vouches a sender may issue per weekly window.
pub const DEFAULT_WEEKLY_LIMIT: u32 = 35;

/// Default weekly window length in days.
pub const DEFAULT_WEEKLY_WINDOW_DAYS: u32 = 7;

/// Default maximum comment length in characters.
pub const DEFAULT_MAX_COMMENT_CHARS: usize = 280;

/// Default maximum role tags per vouch.
pub const DEFAULT_MAX_ROLES: usize = 8;

/// Default number of times a conflicting commit is retried.
pub const DEFAULT_MAX_COMMIT_RETRIES: u32 = 3;

const SECONDS_PER_DAY: i32 = 86_400;

/// Top-level ledger configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Per-sender issuance quotas.
    pub rate_limits: RateLimitConfig,

    /// Bounds on vouch payloads.
    pub vouch_policy: VouchPolicyConfig,

    /// How many times a commit that hit a storage conflict is retried
    /// before the conflict is surfaced.
    pub max_commit_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rate_limits: RateLimitConfig::default(),
            vouch_policy: VouchPolicyConfig::default(),
            max_commit_retries: DEFAULT_MAX_COMMIT_RETRIES,
        }
    }
}

impl LedgerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder.
    pub fn builder() -> LedgerConfigBuilder {
        LedgerConfigBuilder::new()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.rate_limits;
        if limits.daily_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limits.daily_limit".into(),
                reason: "daily limit must be greater than zero".into(),
            });
        }
        if limits.weekly_limit < limits.daily_limit {
            return Err(ConfigError::InvalidValue {
                field: "rate_limits.weekly_limit".into(),
                reason: "weekly limit cannot be below the daily limit".into(),
            });
        }
        if limits.weekly_window_days == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limits.weekly_window_days".into(),
                reason: "weekly window must span at least one day".into(),
            });
        }
        limits.day_boundary()?;

        if self.vouch_policy.max_comment_chars == 0 {
            return Err(ConfigError::InvalidValue {
                field: "vouch_policy.max_comment_chars".into(),
                reason: "comment limit must be greater than zero".into(),
            });
        }

        Ok(())
    }
}

/// Per-sender issuance quotas.
///
/// The daily window resets on calendar-date change in the zone given by
/// `day_boundary_offset_secs`. The weekly window resets once
/// `weekly_window_days` of wall-clock time have elapsed since its last reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Vouches per calendar day.
    pub daily_limit: u32,

    /// Vouches per sliding weekly window.
    pub weekly_limit: u32,

    /// Weekly window length in days.
    pub weekly_window_days: u32,

    /// Offset from UTC, in seconds, of the zone whose midnight ends a day.
    /// Zero means UTC.
    pub day_boundary_offset_secs: i32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            weekly_limit: DEFAULT_WEEKLY_LIMIT,
            weekly_window_days: DEFAULT_WEEKLY_WINDOW_DAYS,
            day_boundary_offset_secs: 0,
        }
    }
}

impl RateLimitConfig {
    /// The fixed zone used for calendar-day comparisons.
    pub fn day_boundary(&self) -> Result<FixedOffset, ConfigError> {
        if self.day_boundary_offset_secs.abs() >= SECONDS_PER_DAY {
            return Err(ConfigError::InvalidValue {
                field: "rate_limits.day_boundary_offset_secs".into(),
                reason: "offset must be strictly within one day of UTC".into(),
            });
        }
        FixedOffset::east_opt(self.day_boundary_offset_secs).ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "rate_limits.day_boundary_offset_secs".into(),
                reason: "offset is not a valid UTC offset".into(),
            }
        })
    }
}

/// Bounds on vouch payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VouchPolicyConfig {
    /// Maximum comment length in characters.
    pub max_comment_chars: usize,

    /// Maximum distinct role tags.
    pub max_roles: usize,
}

impl Default for VouchPolicyConfig {
    fn default() -> Self {
        Self {
            max_comment_chars: DEFAULT_MAX_COMMENT_CHARS,
            max_roles: DEFAULT_MAX_ROLES,
        }
    }
}

/// Builder for [`LedgerConfig`].
#[derive(Clone, Debug, Default)]
pub struct LedgerConfigBuilder {
    config: LedgerConfig,
}

impl LedgerConfigBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: LedgerConfig::default(),
        }
    }

    /// Build the final configuration.
    pub fn build(self) -> LedgerConfig {
        self.config
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<LedgerConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }

    // ===== Rate Limits =====

    /// Set the per-day vouch limit.
    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.config.rate_limits.daily_limit = limit;
        self
    }

    /// Set the per-week vouch limit.
    pub fn with_weekly_limit(mut self, limit: u32) -> Self {
        self.config.rate_limits.weekly_limit = limit;
        self
    }

    /// Set the weekly window length in days.
    pub fn with_weekly_window_days(mut self, days: u32) -> Self {
        self.config.rate_limits.weekly_window_days = days;
        self
    }

    /// Set the UTC offset of the day boundary, in seconds.
    pub fn with_day_boundary_offset_secs(mut self, secs: i32) -> Self {
        self.config.rate_limits.day_boundary_offset_secs = secs;
        self
    }

    // ===== Vouch Policy =====

    /// Set the maximum comment length.
    pub fn with_max_comment_chars(mut self, chars: usize) -> Self {
        self.config.vouch_policy.max_comment_chars = chars;
        self
    }

    /// Set the maximum number of role tags.
    pub fn with_max_roles(mut self, roles: usize) -> Self {
        self.config.vouch_policy.max_roles = roles;
        self
    }

    // ===== Storage =====

    /// Set how many times a conflicting commit is retried.
    pub fn with_max_commit_retries(mut self, retries: u32) -> Self {
        self.config.max_commit_retries = retries;
        self
    }
}

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The field name.
        field: String,
        /// The reason it's invalid.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();

        assert_eq!(config.rate_limits.daily_limit, DEFAULT_DAILY_LIMIT);
        assert_eq!(config.rate_limits.weekly_limit, DEFAULT_WEEKLY_LIMIT);
        assert_eq!(config.rate_limits.weekly_window_days, 7);
        assert_eq!(config.rate_limits.day_boundary_offset_secs, 0);
        assert_eq!(config.vouch_policy.max_comment_chars, 280);
        assert_eq!(config.max_commit_retries, DEFAULT_MAX_COMMIT_RETRIES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = LedgerConfigBuilder::new()
            .with_daily_limit(2)
            .with_weekly_limit(10)
            .with_weekly_window_days(3)
            .with_max_comment_chars(50)
            .with_max_roles(2)
            .with_max_commit_retries(0)
            .build();

        assert_eq!(config.rate_limits.daily_limit, 2);
        assert_eq!(config.rate_limits.weekly_limit, 10);
        assert_eq!(config.rate_limits.weekly_window_days, 3);
        assert_eq!(config.vouch_policy.max_comment_chars, 50);
        assert_eq!(config.vouch_policy.max_roles, 2);
        assert_eq!(config.max_commit_retries, 0);
    }

    #[test]
    fn test_zero_daily_limit_rejected() {
        let result = LedgerConfigBuilder::new().with_daily_limit(0).build_validated();
        assert!(matches!(result, Err(ConfigError::InvalidValue { field, .. }) if field == "rate_limits.daily_limit"));
    }

    #[test]
    fn test_weekly_below_daily_rejected() {
        let result = LedgerConfigBuilder::new()
            .with_daily_limit(10)
            .with_weekly_limit(5)
            .build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_day_boundary_offset_bounds() {
        let ok = RateLimitConfig {
            day_boundary_offset_secs: 9 * 3600,
            ..RateLimitConfig::default()
        };
        assert_eq!(ok.day_boundary().unwrap().local_minus_utc(), 9 * 3600);

        let bad = RateLimitConfig {
            day_boundary_offset_secs: 86_400,
            ..RateLimitConfig::default()
        };
        assert!(bad.day_boundary().is_err());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = LedgerConfigBuilder::new().with_daily_limit(4).build();
        let json = serde_json::to_string(&config).unwrap();
        let back: LedgerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
