//! Maps a purchase instant to the weekly snapshot that governs it.
//!
//! The snapshot taken at the start of a window governs every purchase inside
//! that window; eligibility is frozen at snapshot time.

use chrono::{DateTime, TimeDelta, Utc};
use vippulse_core::AppError;

/// 1-based week index; [`PRE_ACTIVITY_WEEK`] marks instants before the first snapshot.
pub type WeekNumber = u32;

pub const PRE_ACTIVITY_WEEK: WeekNumber = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotWindow {
    first_snapshot_at: DateTime<Utc>,
    period: TimeDelta,
}

impl SnapshotWindow {
    pub fn new(first_snapshot_at: DateTime<Utc>, period: TimeDelta) -> Result<Self, AppError> {
        // Weeks are resolved at millisecond resolution.
        if period.num_milliseconds() <= 0 {
            return Err(AppError::Config(format!(
                "snapshot period must be at least 1ms, got {period}"
            )));
        }
        Ok(Self { first_snapshot_at, period })
    }

    /// Weekly cadence starting at `first_snapshot_at`.
    pub fn weekly(first_snapshot_at: DateTime<Utc>) -> Self {
        Self { first_snapshot_at, period: TimeDelta::days(7) }
    }

    pub fn first_snapshot_at(&self) -> DateTime<Utc> {
        self.first_snapshot_at
    }

    pub fn period(&self) -> TimeDelta {
        self.period
    }

    /// `floor(elapsed / period) + 1`, or [`PRE_ACTIVITY_WEEK`] before the first snapshot.
    /// No upper bound: weeks past the last extract simply have no snapshot.
    pub fn resolve_week(&self, timestamp: DateTime<Utc>) -> WeekNumber {
        if timestamp < self.first_snapshot_at {
            return PRE_ACTIVITY_WEEK;
        }
        let elapsed = (timestamp - self.first_snapshot_at).num_milliseconds();
        let whole_periods = elapsed / self.period.num_milliseconds();
        WeekNumber::try_from(whole_periods)
            .map(|w| w.saturating_add(1))
            .unwrap_or(WeekNumber::MAX)
    }

    /// Start instant of `week` (week 1 starts at the first snapshot).
    pub fn week_start(&self, week: WeekNumber) -> Option<DateTime<Utc>> {
        if week == PRE_ACTIVITY_WEEK {
            return None;
        }
        self.period
            .checked_mul(i32::try_from(week - 1).ok()?)
            .and_then(|offset| self.first_snapshot_at.checked_add_signed(offset))
    }
}
