//! Countdown for the current task, derived from absolute timestamps.
//!
//! Nothing here keeps a running counter. Every call recomputes elapsed time
//! from the task's start marker, so a process that was suspended or a tick
//! loop that fell behind still reports the right value on its next call.

use crate::domain::ActiveSession;
use crate::time::{format_timer, seconds_between};
use chrono::{DateTime, Utc};

/// Inputs needed to project one task's countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskClock {
    /// Planned duration in minutes
    pub planned_minutes: u32,
    /// When the task became current
    pub started_at: DateTime<Utc>,
    /// Seconds already spent paused on this task
    pub paused_seconds: i64,
}

impl TaskClock {
    /// Clock for the session's current task, if any
    pub fn for_session(session: &ActiveSession) -> Option<Self> {
        let task = session.current_task()?;
        Some(Self {
            planned_minutes: task.planned(),
            started_at: session.task_started_at,
            paused_seconds: task.paused_duration,
        })
    }
}

/// Result of a projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingTime {
    pub elapsed_seconds: i64,
    /// Negative once the task runs past its plan; there is no lower bound
    pub remaining_seconds: i64,
    pub is_overtime: bool,
}

impl RemainingTime {
    /// Magnitude of the remaining time as "MM:SS" / "HH:MM:SS"
    pub fn display(&self) -> String {
        format_timer(self.remaining_seconds)
    }

    /// Fraction of the planned time used so far (may exceed 1.0)
    pub fn progress_ratio(&self) -> f64 {
        let total = self.elapsed_seconds + self.remaining_seconds;
        if total <= 0 {
            return 1.0;
        }
        self.elapsed_seconds as f64 / total as f64
    }
}

/// Project the countdown for a task at `now`
pub fn project(now: DateTime<Utc>, clock: &TaskClock) -> RemainingTime {
    let elapsed_seconds = seconds_between(&clock.started_at, &now) - clock.paused_seconds;
    let remaining_seconds = i64::from(clock.planned_minutes) * 60 - elapsed_seconds;

    RemainingTime {
        elapsed_seconds,
        remaining_seconds,
        is_overtime: remaining_seconds <= 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn clock(planned_minutes: u32, paused_seconds: i64) -> TaskClock {
        TaskClock {
            planned_minutes,
            started_at: Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap(),
            paused_seconds,
        }
    }

    #[test]
    fn test_projection_before_plan_ends() {
        let c = clock(25, 0);
        let r = project(c.started_at + Duration::minutes(10), &c);
        assert_eq!(r.remaining_seconds, 900);
        assert_eq!(r.elapsed_seconds, 600);
        assert!(!r.is_overtime);
        assert_eq!(r.display(), "15:00");
    }

    #[test]
    fn test_projection_overtime_is_unbounded() {
        let c = clock(25, 0);
        let r = project(c.started_at + Duration::minutes(26), &c);
        assert_eq!(r.remaining_seconds, -60);
        assert!(r.is_overtime);

        let r = project(c.started_at + Duration::hours(5), &c);
        assert_eq!(r.remaining_seconds, -(5 * 3600 - 25 * 60));
    }

    #[test]
    fn test_projection_exactly_at_plan_is_overtime() {
        let c = clock(1, 0);
        let r = project(c.started_at + Duration::minutes(1), &c);
        assert_eq!(r.remaining_seconds, 0);
        assert!(r.is_overtime);
    }

    #[test]
    fn test_paused_seconds_are_excluded() {
        let c = clock(25, 600);
        let r = project(c.started_at + Duration::minutes(16), &c);
        assert_eq!(r.elapsed_seconds, 360);
        assert_eq!(r.remaining_seconds, 25 * 60 - 360);
    }

    #[test]
    fn test_sub_second_drift_floors() {
        let c = clock(1, 0);
        let r = project(c.started_at + Duration::milliseconds(1_500), &c);
        assert_eq!(r.elapsed_seconds, 1);
    }

    #[test]
    fn test_progress_ratio() {
        let c = clock(10, 0);
        let r = project(c.started_at + Duration::minutes(5), &c);
        assert_eq!(r.progress_ratio(), 0.5);
    }
}
