//! Per-sender vouch issuance limits.
//!
//! Two windows are tracked per sender and they reset differently:
//!
//! - **Daily**: resets when the calendar date changes, evaluated in one fixed
//!   zone (UTC unless configured otherwise).
//! - **Weekly**: resets once seven days of wall-clock time have elapsed since
//!   its last reset. It is not aligned to calendar weeks.
//!
//! A vouch is allowed only if both windows have room, and an allowed check
//! reserves the slot in both counters in the same step.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, RateLimitConfig};

/// Issuance counters for one sender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    /// Vouches issued in the current daily window.
    daily_issued: u32,
    /// Vouches issued in the current weekly window.
    weekly_issued: u32,
    /// When the daily window last reset.
    daily_window_start: DateTime<Utc>,
    /// When the weekly window last reset.
    weekly_window_start: DateTime<Utc>,
}

impl RateLimitState {
    /// Fresh state with both windows opening at `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            daily_issued: 0,
            weekly_issued: 0,
            daily_window_start: now,
            weekly_window_start: now,
        }
    }

    /// Vouches issued in the current daily window.
    #[must_use]
    pub fn daily_issued(&self) -> u32 {
        self.daily_issued
    }

    /// Vouches issued in the current weekly window.
    #[must_use]
    pub fn weekly_issued(&self) -> u32 {
        self.weekly_issued
    }

    /// When the daily window last reset.
    #[must_use]
    pub fn daily_window_start(&self) -> DateTime<Utc> {
        self.daily_window_start
    }

    /// When the weekly window last reset.
    #[must_use]
    pub fn weekly_window_start(&self) -> DateTime<Utc> {
        self.weekly_window_start
    }
}

/// Result of a rate limit check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the vouch may proceed. When `true` the slot is already taken.
    pub allowed: bool,
    /// Vouches left today, after this one if it was allowed.
    pub daily_remaining: u32,
    /// Vouches left this week, after this one if it was allowed.
    pub weekly_remaining: u32,
}

impl RateLimitDecision {
    /// Check if the vouch is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

/// Window policy applied to [`RateLimitState`].
///
/// The limiter holds no per-sender data. Stores call it while holding the
/// sender's state exclusively, which makes check-and-reserve atomic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VouchRateLimiter {
    daily_limit: u32,
    weekly_limit: u32,
    weekly_window: Duration,
    day_boundary: FixedOffset,
}

impl VouchRateLimiter {
    /// Build a limiter from configuration.
    pub fn new(config: &RateLimitConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            daily_limit: config.daily_limit,
            weekly_limit: config.weekly_limit,
            weekly_window: Duration::days(i64::from(config.weekly_window_days)),
            day_boundary: config.day_boundary()?,
        })
    }

    /// Per-day limit.
    #[must_use]
    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Per-week limit.
    #[must_use]
    pub fn weekly_limit(&self) -> u32 {
        self.weekly_limit
    }

    /// Calendar date of `time` in the reference zone.
    fn calendar_day(&self, time: DateTime<Utc>) -> NaiveDate {
        time.with_timezone(&self.day_boundary).date_naive()
    }

    fn should_reset_daily(&self, state: &RateLimitState, now: DateTime<Utc>) -> bool {
        self.calendar_day(now) != self.calendar_day(state.daily_window_start)
    }

    fn should_reset_weekly(&self, state: &RateLimitState, now: DateTime<Utc>) -> bool {
        now - state.weekly_window_start >= self.weekly_window
    }

    /// Reset whichever windows have expired at `now`.
    pub fn roll_windows(&self, state: &mut RateLimitState, now: DateTime<Utc>) {
        if self.should_reset_daily(state, now) {
            state.daily_issued = 0;
            state.daily_window_start = now;
        }
        if self.should_reset_weekly(state, now) {
            state.weekly_issued = 0;
            state.weekly_window_start = now;
        }
    }

    fn decision(&self, state: &RateLimitState, allowed: bool) -> RateLimitDecision {
        RateLimitDecision {
            allowed,
            daily_remaining: self.daily_limit.saturating_sub(state.daily_issued),
            weekly_remaining: self.weekly_limit.saturating_sub(state.weekly_issued),
        }
    }

    /// Roll windows, then take one slot from both if both have room.
    ///
    /// A rejected check leaves the counters untouched.
    pub fn check_and_reserve(
        &self,
        state: &mut RateLimitState,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        self.roll_windows(state, now);

        let allowed =
            state.daily_issued < self.daily_limit && state.weekly_issued < self.weekly_limit;
        if allowed {
            state.daily_issued += 1;
            state.weekly_issued += 1;
        }

        self.decision(state, allowed)
    }

    /// What a check at `now` would report, without reserving anything.
    #[must_use]
    pub fn preview(&self, state: &RateLimitState, now: DateTime<Utc>) -> RateLimitDecision {
        let mut rolled = state.clone();
        self.roll_windows(&mut rolled, now);
        let allowed =
            rolled.daily_issued < self.daily_limit && rolled.weekly_issued < self.weekly_limit;
        self.decision(&rolled, allowed)
    }
}

impl Default for VouchRateLimiter {
    fn default() -> Self {
        Self {
            daily_limit: crate::config::DEFAULT_DAILY_LIMIT,
            weekly_limit: crate::config::DEFAULT_WEEKLY_LIMIT,
            weekly_window: Duration::days(i64::from(crate::config::DEFAULT_WEEKLY_WINDOW_DAYS)),
            day_boundary: Utc.fix(),
        }
    }
}
