//! Daily cycle boundaries.
//!
//! The herd and its dedup set live for one cycle. A cycle boundary is a
//! fixed UTC wall-clock instant each day. Whether a reset is due is a pure
//! function of the current time and the boundary last handled, so tests
//! never wait on real time:
//!
//! ```text
//! due(now)  ⇔  boundary_at_or_before(now) > last_handled
//! ```
//!
//! Handling the same boundary twice is a no-op, and a clock that steps
//! backwards never triggers a reset.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::constants::{RESET_HOUR_UTC, RESET_MINUTE_UTC};
use crate::error::CycleError;

/// The time of day at which each cycle ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSchedule {
    at: NaiveTime,
}

impl CycleSchedule {
    /// Schedule with the boundary at `hour:minute` UTC.
    pub fn new(hour: u32, minute: u32) -> Result<Self, CycleError> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or(CycleError::InvalidResetTime { hour, minute })?;
        Ok(Self { at })
    }

    /// The most recent boundary at or before `now`.
    pub fn boundary_at_or_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today <= now {
            today
        } else {
            today - Duration::days(1)
        }
    }

    /// The first boundary strictly after `now`.
    pub fn next_boundary_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.boundary_at_or_before(now) + Duration::days(1)
    }
}

impl Default for CycleSchedule {
    fn default() -> Self {
        Self {
            at: NaiveTime::from_hms_opt(RESET_HOUR_UTC, RESET_MINUTE_UTC, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Tracks which boundary was last handled.
#[derive(Debug, Clone)]
pub struct CycleTracker {
    schedule: CycleSchedule,
    /// Boundary of the cycle currently running.
    current_boundary: DateTime<Utc>,
    /// When the current cycle's state was last wiped (or first created).
    started_at: DateTime<Utc>,
}

impl CycleTracker {
    /// Start tracking at `now`. The cycle in progress counts as handled, so
    /// the first reset fires at the next boundary.
    pub fn new(schedule: CycleSchedule, now: DateTime<Utc>) -> Self {
        Self {
            schedule,
            current_boundary: schedule.boundary_at_or_before(now),
            started_at: now,
        }
    }

    pub fn schedule(&self) -> CycleSchedule {
        self.schedule
    }

    pub fn current_boundary(&self) -> DateTime<Utc> {
        self.current_boundary
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn next_boundary(&self) -> DateTime<Utc> {
        self.current_boundary + Duration::days(1)
    }

    /// The boundary to handle if a reset is due at `now`.
    pub fn due_boundary(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let boundary = self.schedule.boundary_at_or_before(now);
        (boundary > self.current_boundary).then_some(boundary)
    }

    /// Record that the cycle starting at `boundary` began at `now`.
    pub fn mark_reset(&mut self, boundary: DateTime<Utc>, now: DateTime<Utc>) {
        if boundary > self.current_boundary {
            self.current_boundary = boundary;
        }
        self.started_at = now;
    }
}
